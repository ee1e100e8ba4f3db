//! UI rendering and layout utilities

use crate::classifier::Status;
use crate::constants::ui::{BAR_BORDER_WIDTH, GAUGE_MAX_DB};
use crate::schedule::{Mode, ThresholdProfile};
use crate::state::{Banner, BannerKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Everything the renderer needs for one frame
#[derive(Clone)]
pub struct UiState {
    pub device_name: Option<String>,
    pub running: bool,
    pub db: Option<f32>,
    pub status: Status,
    pub average: Option<f32>,
    pub min_max: Option<(f32, f32)>,
    pub profile: ThresholdProfile,
    pub mode: Mode,
    pub auto_mode: bool,
    pub calibration_db: f32,
    pub ema_alpha: f32,
    pub banner: Option<Banner>,
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Green => Color::Green,
        Status::Amber => Color::Yellow,
        Status::Red => Color::Red,
    }
}

fn banner_color(kind: BannerKind) -> Color {
    match kind {
        BannerKind::Info => Color::Green,
        BannerKind::Warn => Color::Yellow,
        BannerKind::Error => Color::Red,
    }
}

/// Gauge position of a dB value in `0.0..=1.0`
pub fn gauge_ratio(db: f32) -> f64 {
    (db / GAUGE_MAX_DB).clamp(0.0, 1.0) as f64
}

/// Band color for a position on the gauge, following the active thresholds
fn band_color(i: usize, width: usize, profile: ThresholdProfile) -> Color {
    let db = (i as f32 + 0.5) / width.max(1) as f32 * GAUGE_MAX_DB;
    if db <= profile.green_max {
        Color::Green
    } else if db <= profile.amber_max {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Create a gradient bar showing the level, colored by threshold band
pub fn create_gradient_bar(width: usize, ratio: f64, profile: ThresholdProfile) -> Line<'static> {
    let filled = (ratio * width as f64) as usize;
    let partial_fill = (ratio * width as f64) - filled as f64;
    let mut spans = Vec::with_capacity(width);

    for i in 0..width {
        let ch = if i < filled {
            '█'
        } else if i == filled && partial_fill > 0.0 {
            match (partial_fill * 8.0) as usize {
                0..=1 => '░',
                2..=3 => '▒',
                4..=5 => '▓',
                _ => '█',
            }
        } else {
            '░'
        };
        spans.push(Span::styled(
            ch.to_string(),
            Style::default().fg(band_color(i, width, profile)),
        ));
    }

    Line::from(spans)
}

/// Scale labels with markers at the green and amber thresholds
pub fn create_db_labels(width: usize, profile: ThresholdProfile) -> Line<'static> {
    if width == 0 {
        return Line::default();
    }
    let marker = |db: f32| (gauge_ratio(db) * (width - 1) as f64).round() as usize;
    let green_pos = marker(profile.green_max);
    let amber_pos = marker(profile.amber_max);

    let mut spans = Vec::with_capacity(width);
    let mut i = 0;
    while i < width {
        if i == green_pos || i == amber_pos {
            spans.push(Span::styled("▲", Style::default().fg(Color::White)));
            i += 1;
            continue;
        }
        let label = if i == 0 {
            "0".to_string()
        } else if i + 2 == width {
            format!("{}", GAUGE_MAX_DB as i32)
        } else {
            " ".to_string()
        };
        i += label.chars().count();
        spans.push(Span::styled(label, Style::default().fg(band_color(i - 1, width, profile))));
    }

    Line::from(spans)
}

fn format_db(value: Option<f32>) -> String {
    value.map(|v| format!("{:.0} dB", v)).unwrap_or_else(|| "--".to_string())
}

/// Render the complete UI
pub fn render_ui(f: &mut Frame, state: &UiState) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(1),
        ])
        .split(size);

    // Mode and device
    let schedule = if state.auto_mode { "auto" } else { "manual" };
    let device = state.device_name.as_deref().unwrap_or("not capturing");
    let header = Paragraph::new(format!(
        "{} {} ({})   Device: {}",
        state.mode.icon(),
        state.mode,
        schedule,
        device
    ))
    .block(Block::default().title("Mode").borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    // Status pill
    let status_line = if state.running {
        Line::from(vec![
            Span::styled(
                format!(" {} ", state.status.label()),
                Style::default()
                    .fg(Color::Black)
                    .bg(status_color(state.status))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(state.status.legend()),
        ])
    } else {
        Line::from("Stopped. Press 's' to start monitoring.")
    };
    let status = Paragraph::new(status_line)
        .block(Block::default().title("Status").borders(Borders::ALL));
    f.render_widget(status, chunks[1]);

    // Level gauge
    let bar_width = (chunks[2].width as usize).saturating_sub(BAR_BORDER_WIDTH);
    let ratio = state.db.map(gauge_ratio).unwrap_or(0.0);
    let gauge = Paragraph::new(vec![
        create_gradient_bar(bar_width, ratio, state.profile),
        create_db_labels(bar_width, state.profile),
    ])
    .block(
        Block::default()
            .title(format!("Level: {}", format_db(state.db)))
            .borders(Borders::ALL),
    );
    f.render_widget(gauge, chunks[2]);

    // Rolling statistics
    let peaks = match state.min_max {
        Some((min, max)) => format!("min {:.0} dB · max {:.0} dB", min, max),
        None => "--".to_string(),
    };
    let stats = Paragraph::new(vec![
        Line::from(format!("Average: {}", format_db(state.average))),
        Line::from(format!("Peaks: {}", peaks)),
    ])
    .block(Block::default().title("Last 5 minutes").borders(Borders::ALL));
    f.render_widget(stats, chunks[3]);

    // Settings
    let settings = Paragraph::new(vec![
        Line::from(format!(
            "Green ≤ {:.0} dB [g/G]   Amber ≤ {:.0} dB [b/B]",
            state.profile.green_max, state.profile.amber_max
        )),
        Line::from(format!(
            "Calibration +{:.0} dB [[/]]   Smoothing {:.2} [-/=]",
            state.calibration_db, state.ema_alpha
        )),
    ])
    .block(Block::default().title("Settings").borders(Borders::ALL));
    f.render_widget(settings, chunks[4]);

    // Banner and key help
    let mut lines = Vec::new();
    if let Some(banner) = &state.banner {
        lines.push(Line::from(Span::styled(
            banner.message.clone(),
            Style::default().fg(banner_color(banner.kind)),
        )));
    }
    lines.push(Line::from(
        "s start · x stop · m toggle day/night · a auto schedule · q/Esc quit",
    ));
    let footer = Paragraph::new(lines).wrap(Wrap { trim: true });
    f.render_widget(footer, chunks[5]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_gauge_ratio_clamps() {
        assert_eq!(gauge_ratio(-10.0), 0.0);
        assert_eq!(gauge_ratio(40.0), 0.5);
        assert_eq!(gauge_ratio(120.0), 1.0);
    }

    #[test]
    fn test_gradient_bar_fill() {
        let line = create_gradient_bar(10, 0.5, ThresholdProfile::NIGHT);
        let s = text(&line);
        assert_eq!(s.chars().count(), 10);
        assert_eq!(s.chars().filter(|c| *c == '█').count(), 5);
    }

    #[test]
    fn test_bar_colors_follow_thresholds() {
        // 80 cells: one per dB
        let line = create_gradient_bar(80, 1.0, ThresholdProfile::NIGHT);
        assert_eq!(line.spans[10].style.fg, Some(Color::Green));
        assert_eq!(line.spans[40].style.fg, Some(Color::Yellow));
        assert_eq!(line.spans[60].style.fg, Some(Color::Red));
    }

    #[test]
    fn test_labels_fit_width() {
        for width in [0, 5, 20, 80] {
            let line = create_db_labels(width, ThresholdProfile::DAY);
            assert_eq!(text(&line).chars().count(), width);
        }
    }
}
