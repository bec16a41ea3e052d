use std::sync::Arc;

use clap::Subcommand;
use fastrack_core::storage::Database;
use fastrack_core::{
    Config, Event, FastState, FastingTracker, NoopNotifier, Notifier, PersistedFast, SystemClock,
    TrackerOptions,
};
use tokio::sync::broadcast::error::RecvError;

#[derive(Subcommand)]
pub enum FastAction {
    /// Start a fast
    Start {
        /// Fast length in hours (defaults to the selected preset)
        #[arg(long)]
        hours: Option<u32>,
        /// Keep running and show progress until the fast completes
        #[arg(long)]
        watch: bool,
    },
    /// Abandon the running fast
    Stop,
    /// Acknowledge a completed fast
    Reset,
    /// Select the preset for the next fast
    Select {
        /// Fast length in hours
        hours: u32,
    },
    /// Print current fasting state as JSON
    Status,
    /// Follow the running fast, printing events as JSON lines
    Watch,
    /// List quick-pick presets
    Presets,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn open_tracker(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    reschedule_on_restore: bool,
) -> Result<FastingTracker, Box<dyn std::error::Error>> {
    let store = Database::open()?;
    let mut options = TrackerOptions::from(config);
    options.reschedule_on_restore = reschedule_on_restore;
    Ok(FastingTracker::new(
        Box::new(store),
        notifier,
        Arc::new(SystemClock),
        options,
    ))
}

fn print_pretty(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

/// Book a finished fast in the history table. History is secondary to the
/// timer, so failures are only logged.
fn record_history(event: &Event) {
    let recorded = Database::open()
        .map_err(|e| e.to_string())
        .and_then(|db| db.record_event(event).map_err(|e| e.to_string()));
    if let Err(e) = recorded {
        tracing::warn!(error = %e, "failed to record fast history");
    }
}

pub async fn run(action: FastAction) -> CliResult {
    let config = Config::load_or_default();

    match action {
        FastAction::Start { hours, watch: true } => {
            start(&config, hours)?;
            return follow(&config).await;
        }
        FastAction::Start { hours, watch: false } => start(&config, hours)?,
        FastAction::Stop => {
            let mut tracker = open_tracker(&config, Arc::new(NoopNotifier), false)?;
            match tracker.stop_fast() {
                Some(event) => {
                    record_history(&event);
                    print_pretty(&event)?;
                }
                None => println!("{{\"type\": \"no_active_fast\"}}"),
            }
            tracker.shutdown().await;
        }
        FastAction::Reset => {
            let mut tracker = open_tracker(&config, Arc::new(NoopNotifier), false)?;
            tracker.tick();
            match tracker.reset_after_complete() {
                Some(event) => {
                    record_history(&event);
                    print_pretty(&event)?;
                }
                None => {
                    let state = tracker.state();
                    tracker.shutdown().await;
                    return Err(format!(
                        "nothing to reset: fast is {} (use `fast stop` to abandon a running fast)",
                        state.as_str()
                    )
                    .into());
                }
            }
            tracker.shutdown().await;
        }
        FastAction::Select { hours } => {
            let mut tracker = open_tracker(&config, Arc::new(NoopNotifier), false)?;
            let event = tracker.select_hours(hours)?;
            tracker.shutdown().await;

            let mut config = config;
            config.set("fasting.default_hours", &hours.to_string())?;
            print_pretty(&event)?;
        }
        FastAction::Status => {
            let mut tracker = open_tracker(&config, Arc::new(NoopNotifier), false)?;
            let completed = tracker.tick();
            print_pretty(&tracker.snapshot())?;
            if let Some(event) = completed {
                print_pretty(&event)?;
            }
            tracker.shutdown().await;
        }
        FastAction::Watch => return follow(&config).await,
        FastAction::Presets => {
            let presets = serde_json::json!({
                "presets": config.fasting.presets,
                "selected": config.fasting.default_hours,
            });
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
    }
    Ok(())
}

fn start(config: &Config, hours: Option<u32>) -> CliResult {
    // Short-lived process: the completion alert is scheduled by `watch`.
    let mut tracker = open_tracker(config, Arc::new(NoopNotifier), false)?;
    match tracker.state() {
        FastState::Idle => {}
        FastState::Active => {
            return Err("a fast is already running (use `fast stop` first)".into());
        }
        FastState::Complete => {
            return Err("the last fast is complete (use `fast reset` to acknowledge it)".into());
        }
    }
    let event = match hours {
        Some(hours) => tracker.start_fast(hours)?,
        None => tracker.start_selected()?,
    };
    print_pretty(&event)?;
    Ok(())
}

/// Follow the persisted fast until it completes, is stopped elsewhere, or
/// the user hits Ctrl-C.
async fn follow(config: &Config) -> CliResult {
    #[cfg(feature = "notifications")]
    let desktop = Arc::new(crate::notifier::DesktopNotifier::new());
    #[cfg(feature = "notifications")]
    let notifier: Arc<dyn Notifier> = desktop.clone();
    #[cfg(not(feature = "notifications"))]
    let notifier: Arc<dyn Notifier> = Arc::new(NoopNotifier);

    let mut tracker = open_tracker(config, notifier, true)?;
    let monitor = Database::open()?;
    let mut events = tracker.subscribe();

    if let Some(restored) = tracker.restored() {
        println!("{}", serde_json::to_string(restored)?);
    }
    let snapshot = tracker.snapshot();
    println!("{}", serde_json::to_string(&snapshot)?);
    let Some(start_time) = tracker.session().start_time() else {
        tracker.shutdown().await;
        return Err("no fast is running (use `fast start`)".into());
    };
    if tracker.state() == FastState::Complete {
        tracker.shutdown().await;
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    match event {
                        Event::FastCompleted { .. } => {
                            #[cfg(feature = "notifications")]
                            desktop.settle().await;
                            break;
                        }
                        Event::FastProgress { .. } => {
                            // Another invocation may have stopped this fast.
                            let still_running = matches!(
                                PersistedFast::load(&monitor),
                                Ok(Some(p)) if p.start_time == start_time
                            );
                            // Leave the store alone: it may already hold a newer fast.
                            if !still_running {
                                println!("{{\"type\": \"fast_ended_elsewhere\"}}");
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "watch output lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracker.shutdown().await;
    Ok(())
}
