//! Main application logic and orchestration

use crate::audio;
use crate::config::{Config, ScheduleStore};
use crate::constants::audio::ANALYSIS_WINDOW;
use crate::constants::schedule::TICK_INTERVAL_SECS;
use crate::constants::ui::FRAME_INTERVAL_MS;
use crate::error::{AppError, AppResult};
use crate::monitor::Monitor;
use crate::schedule::{Scheduler, Thresholds};
use crate::state::{AppState, BannerKind, SharedState};
use crate::ui;
use crate::wake::WakeLock;
use crate::weighting::AWeighting;
use cpal::traits::StreamTrait;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Main application struct
pub struct App {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    device_name: Option<String>,
    monitor: Monitor,
    thresholds: Thresholds,
    scheduler: Scheduler,
    store: ScheduleStore,
    shared: SharedState,
    stream: Option<cpal::Stream>,
    wake_lock: WakeLock,
    state: AppState,
    autostart: bool,
    block: Vec<f32>,
}

/// Exit codes for the application
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    UserExit = 1,  // User pressed Escape, q or Ctrl+C
    Error = 2,     // Actual application error
}

/// Result type that includes user exit information
pub type AppRunResult = Result<(), AppError>;

/// Extended result that tracks exit reason
pub struct RunResult {
    pub result: AppRunResult,
    pub exit_code: ExitCode,
}

/// Current wall-clock time of day
fn local_time() -> chrono::NaiveTime {
    chrono::Local::now().time()
}

impl App {
    /// Initialize the application with configuration
    pub fn new_with_config(config: Config) -> AppResult<Self> {
        let store = ScheduleStore::new(config.schedule_path.clone());
        let scheduler = Scheduler::new(store.load());

        let mut thresholds = Thresholds::default();
        scheduler.tick(local_time(), &mut thresholds);
        thresholds.apply_overrides(config.green_max, config.amber_max);
        info!(
            mode = %thresholds.mode(),
            auto = scheduler.config().auto_mode,
            green_max = thresholds.profile().green_max,
            amber_max = thresholds.profile().amber_max,
            "thresholds initialised"
        );

        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(App {
            terminal,
            device_name: config.device_name,
            monitor: Monitor::new(config.settings),
            thresholds,
            scheduler,
            store,
            shared: SharedState::new(ANALYSIS_WINDOW),
            stream: None,
            wake_lock: WakeLock::new(),
            state: AppState::new(),
            autostart: config.autostart,
            block: Vec::with_capacity(ANALYSIS_WINDOW),
        })
    }

    /// Run the main application loop
    pub async fn run(mut self) -> RunResult {
        if self.autostart {
            self.start_monitoring();
        }

        let mut frames = tokio::time::interval(Duration::from_millis(FRAME_INTERVAL_MS));
        let mut schedule = tokio::time::interval(Duration::from_secs(TICK_INTERVAL_SECS));
        let (result, exit_code) = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    break (Ok(()), ExitCode::UserExit);
                }
                _ = schedule.tick() => {
                    self.scheduler.tick(local_time(), &mut self.thresholds);
                }
                _ = frames.tick() => {
                    self.process_frame();
                    if let Err(e) = self.draw() {
                        break (Err(e), ExitCode::Error);
                    }
                }
            }

            // Drain pending keyboard events
            if let Some(code) = self.poll_keys() {
                break (Ok(()), code);
            }
        };

        // Cleanup - ensure graceful exit
        self.stop_stream();
        self.wake_lock.release();
        let _ = self.cleanup(); // Ignore cleanup errors

        RunResult { result, exit_code }
    }

    /// Open the input device and begin a monitoring session.
    /// Failures are reported in the banner; the monitor stays stopped.
    fn start_monitoring(&mut self) {
        if self.monitor.is_running() {
            return;
        }
        match self.open_stream() {
            Ok((stream, device_name, filter_fallback)) => {
                self.stream = Some(stream);
                self.state.device_name = Some(device_name);
                self.monitor.start(Instant::now());
                self.wake_lock.acquire();
                if let Some(rate) = filter_fallback {
                    self.state.set_banner(
                        BannerKind::Warn,
                        format!(
                            "Microphone active at {} Hz. No A-weighting table for this rate; using the 44.1 kHz table as an approximation.",
                            rate
                        ),
                    );
                } else {
                    self.state.set_banner(
                        BannerKind::Info,
                        "Microphone active. Audio is processed locally and never stored.",
                    );
                }
            }
            Err(e) => {
                error!(error = %e, "could not start monitoring");
                self.state.set_banner(BannerKind::Error, e.banner_message());
            }
        }
    }

    /// Returns the stream, the device name and the requested rate when the
    /// filter had to fall back
    fn open_stream(&self) -> AppResult<(cpal::Stream, String, Option<u32>)> {
        let (device, audio_config) = audio::setup_audio_device(self.device_name.as_deref())?;

        let filter = AWeighting::new(audio_config.sample_rate);
        let fallback = filter.table().is_fallback().then_some(audio_config.sample_rate);

        self.shared.reset();
        let callback = audio::create_audio_callback(
            self.shared.analysis.clone(),
            filter,
            audio_config.channels,
        );

        let config = cpal::StreamConfig {
            channels: audio_config.channels,
            sample_rate: cpal::SampleRate(audio_config.sample_rate),
            buffer_size: crate::constants::audio::BUFFER_SIZE,
        };

        let stream = audio::build_audio_stream(&device, &config, callback, &self.shared)?;
        stream.play()?;
        info!(device = %audio_config.device_name, "microphone active");

        Ok((stream, audio_config.device_name, fallback))
    }

    /// Release the device and discard all session state
    fn stop_monitoring(&mut self) {
        if !self.monitor.is_running() {
            return;
        }
        self.stop_stream();
        self.wake_lock.release();
        self.monitor.stop();
        self.shared.reset();
        self.state.clear_session();
        self.state.set_banner(BannerKind::Warn, "Microphone stopped.");
    }

    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }

    /// One pass of the per-frame chain
    fn process_frame(&mut self) {
        if let Some(err) = self.shared.take_stream_error() {
            warn!(error = %err, "stopping after stream error");
            self.stop_monitoring();
            self.state
                .set_banner(BannerKind::Error, format!("Audio stream error: {}. Press 's' to restart.", err));
            return;
        }

        if !self.monitor.is_running() {
            return;
        }
        self.shared.snapshot(&mut self.block);
        // Profile is copied once so the whole frame sees the same thresholds
        let profile = self.thresholds.profile();
        if let Some(reading) = self.monitor.process_block(&self.block, profile, Instant::now()) {
            self.state.apply_reading(reading);
        }
    }

    fn ui_state(&self) -> ui::UiState {
        let settings = self.monitor.settings();
        let reading = self.state.reading;
        ui::UiState {
            device_name: self.state.device_name.clone(),
            running: self.monitor.is_running(),
            db: reading.map(|r| r.db),
            status: self.state.status(),
            average: reading.and_then(|r| r.average),
            min_max: reading.and_then(|r| r.min_max),
            profile: self.thresholds.profile(),
            mode: self.thresholds.mode(),
            auto_mode: self.scheduler.is_active(),
            calibration_db: settings.calibration_db,
            ema_alpha: settings.ema_alpha,
            banner: self.state.banner.clone(),
        }
    }

    fn draw(&mut self) -> AppResult<()> {
        let ui_state = self.ui_state();
        self.terminal.draw(|f| ui::render_ui(f, &ui_state))?;
        Ok(())
    }

    /// Handle queued key presses; returns an exit code when the user quits
    fn poll_keys(&mut self) -> Option<ExitCode> {
        while crossterm::event::poll(Duration::from_millis(0)).unwrap_or(false) {
            match crossterm::event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if let Some(code) = self.handle_key(key) {
                        return Some(code);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "failed to read terminal event");
                    break;
                }
            }
        }
        None
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<ExitCode> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Some(ExitCode::UserExit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(ExitCode::UserExit);
            }
            KeyCode::Char('s') => self.start_monitoring(),
            KeyCode::Char('x') => self.stop_monitoring(),
            KeyCode::Char('m') => {
                self.scheduler.toggle_mode(&mut self.thresholds);
                self.persist_schedule();
            }
            KeyCode::Char('a') => {
                let enable = !self.scheduler.config().auto_mode;
                self.scheduler.set_auto(enable, local_time(), &mut self.thresholds);
                self.persist_schedule();
            }
            KeyCode::Char('[') => self.monitor.settings_mut().adjust_calibration(-1.0),
            KeyCode::Char(']') => self.monitor.settings_mut().adjust_calibration(1.0),
            KeyCode::Char('-') => self.monitor.settings_mut().adjust_ema_alpha(-0.01),
            KeyCode::Char('=') => self.monitor.settings_mut().adjust_ema_alpha(0.01),
            KeyCode::Char('g') => self.thresholds.adjust_green_max(-1.0),
            KeyCode::Char('G') => self.thresholds.adjust_green_max(1.0),
            KeyCode::Char('b') => self.thresholds.adjust_amber_max(-1.0),
            KeyCode::Char('B') => self.thresholds.adjust_amber_max(1.0),
            _ => {}
        }
        None
    }

    fn persist_schedule(&mut self) {
        if let Err(e) = self.store.save(self.scheduler.config()) {
            warn!(error = %e, path = %self.store.path().display(), "could not save schedule");
            self.state
                .set_banner(BannerKind::Warn, format!("Schedule not saved: {}", e));
        }
    }

    /// Clean up terminal state
    fn cleanup(mut self) -> AppResult<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
