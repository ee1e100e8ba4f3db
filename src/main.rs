mod app;
mod audio;
mod classifier;
mod config;
mod constants;
mod error;
mod level;
mod logging;
mod monitor;
mod schedule;
mod smoothing;
mod state;
mod stats;
mod ui;
mod wake;
mod weighting;

use clap::Parser;
use dialoguer::{Select, theme::ColorfulTheme};
use error::AppResult;

fn list_devices() -> AppResult<()> {
    let device_list = audio::input_device_names()?;

    if device_list.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    // Interactive selection
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an audio input device")
        .items(&device_list)
        .default(0)
        .interact()
        .map_err(|e| error::AppError::AudioDevice(format!("Device selection failed: {}", e)))?;

    println!("{}", device_list[selection]);

    Ok(())
}

fn schedule_command(args: config::ScheduleArgs) -> AppResult<()> {
    config::validate_schedule_args(&args)?;

    let path = config::resolve_path(args.config.clone(), constants::files::SCHEDULE_FILE)?;
    let store = config::ScheduleStore::new(path);
    let mut scheduler = schedule::Scheduler::new(store.load());
    let mut thresholds = schedule::Thresholds::default();
    let now = chrono::Local::now().time();

    let changed = args.auto.is_some() || args.night_start.is_some() || args.night_end.is_some();
    if let Some(start) = &args.night_start {
        scheduler.set_night_start(start, now, &mut thresholds)?;
    }
    if let Some(end) = &args.night_end {
        scheduler.set_night_end(end, now, &mut thresholds)?;
    }
    if let Some(auto) = args.auto {
        scheduler.set_auto(auto, now, &mut thresholds);
    }
    if changed {
        store.save(scheduler.config())?;
    }

    let config = scheduler.config();
    let mode = scheduler.mode_at(now)?;
    println!("Schedule file: {}", store.path().display());
    println!("Auto mode:     {}", if config.auto_mode { "on" } else { "off" });
    println!("Night window:  {} - {}", config.night_start, config.night_end);
    println!("{}", describe_now(config.auto_mode, mode, now));

    Ok(())
}

/// What the schedule decides for `now`. With auto mode off the monitor keeps
/// whatever mode it was last set to, so the window's choice is only advisory.
fn describe_now(auto_mode: bool, mode: schedule::Mode, now: chrono::NaiveTime) -> String {
    let profile = mode.default_profile();
    if auto_mode {
        format!(
            "Now ({}):    {} ({:.0}/{:.0} dB)",
            now.format("%H:%M"),
            mode,
            profile.green_max,
            profile.amber_max
        )
    } else {
        format!(
            "Now ({}):    manual (window would select {})",
            now.format("%H:%M"),
            mode
        )
    }
}

#[tokio::main]
async fn main() {
    use app::ExitCode;
    use config::{Args, Commands};

    let args = Args::parse();

    match args.command {
        Commands::Monitor(monitor_args) => {
            // Create config from monitor args
            let config = match config::Config::from_monitor_args(monitor_args) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            };

            if let Err(e) = logging::init_file(&config.log_path) {
                eprintln!("Could not open log file {}: {}", config.log_path.display(), e);
            }

            // Handle exit codes appropriately
            match app::App::new_with_config(config) {
                Ok(app) => {
                    let run_result = app.run().await;
                    match run_result.result {
                        Ok(_) => {
                            std::process::exit(run_result.exit_code as i32);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "application error");
                            eprintln!("Application error: {}", e);
                            std::process::exit(ExitCode::Error as i32);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "setup error");
                    eprintln!("Setup error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            }
        }
        Commands::List(_) => {
            logging::init_stderr();
            if let Err(e) = list_devices() {
                eprintln!("Error listing devices: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }
            std::process::exit(ExitCode::Success as i32);
        }
        Commands::Schedule(schedule_args) => {
            logging::init_stderr();
            if let Err(e) = schedule_command(schedule_args) {
                eprintln!("{}", e);
                std::process::exit(ExitCode::Error as i32);
            }
            std::process::exit(ExitCode::Success as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use schedule::Mode;

    #[test]
    fn test_describe_now_with_auto_mode() {
        let now = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert_eq!(describe_now(true, Mode::Night, now), "Now (23:00):    Night (35/45 dB)");
    }

    #[test]
    fn test_describe_now_in_manual_mode() {
        let now = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        let line = describe_now(false, Mode::Night, now);
        assert_eq!(line, "Now (23:00):    manual (window would select Night)");
        assert!(!line.contains("dB"));
    }
}
