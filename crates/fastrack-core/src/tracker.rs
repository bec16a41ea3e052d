//! Live fasting tracker.
//!
//! [`FastingTracker`] is the single owner of a [`FastingSession`]. It wires
//! the pure state machine to its collaborators:
//!
//! - a [`KeyValueStore`] holding the running fast across restarts,
//! - a [`Notifier`] for the completion alert,
//! - a [`Clock`] as the only time source,
//! - a ticker task that recomputes progress while a fast is active.
//!
//! Observers subscribe to a broadcast channel of [`Event`]s.
//!
//! Must be created inside a tokio runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;
use crate::fasting::{FastState, FastingSession};
use crate::notify::{Notifier, FASTING_COMPLETE_ID};
use crate::storage::{Config, KeyValueStore, NotificationsConfig, PersistedFast};

const EVENT_CAPACITY: usize = 64;

/// Tracker settings, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Preset selected when no fast is persisted.
    pub default_hours: u32,
    pub tick_interval: Duration,
    /// Whether and how to announce the completed fast.
    pub notifications: NotificationsConfig,
    /// Schedule the completion alert again for a fast restored as active.
    /// For hosts whose pending notifications don't outlive the process.
    pub reschedule_on_restore: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TrackerOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_hours: config.fasting.default_hours,
            tick_interval: config.tick_interval(),
            notifications: config.notifications.clone(),
            reschedule_on_restore: false,
        }
    }
}

enum NotifyCommand {
    Schedule {
        fire_after: Duration,
        title: String,
        body: String,
    },
    Cancel,
}

pub struct FastingTracker {
    session: Arc<Mutex<FastingSession>>,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Event>,
    ticker: Option<JoinHandle<()>>,
    notify_tx: Option<mpsc::UnboundedSender<NotifyCommand>>,
    notify_worker: Option<JoinHandle<()>>,
    permission: Arc<AtomicBool>,
    /// `FastRestored` for a fast picked up from the store at construction.
    restored: Option<Event>,
    options: TrackerOptions,
}

impl FastingTracker {
    /// Build a tracker, picking up any fast persisted in `store`.
    ///
    /// A fast still short of its target resumes as active and the ticker
    /// starts; one already past it comes back as complete with no new
    /// notification. Unreadable persisted state starts idle. The pickup is
    /// reported by [`FastingTracker::restored`].
    pub fn new(
        store: Box<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        options: TrackerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let permission = Arc::new(AtomicBool::new(false));
        let notify_worker = tokio::spawn(run_notifications(
            notifier,
            notify_rx,
            Arc::clone(&permission),
        ));

        let now = clock.now();
        let persisted = match PersistedFast::load(&*store) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted fast, starting idle");
                None
            }
        };
        let session = persisted
            .and_then(|p| FastingSession::restore(p.start_time, p.hours, now))
            .unwrap_or_else(|| FastingSession::new(options.default_hours));

        let restored = session.restored_event(now);
        let mut tracker = Self {
            session: Arc::new(Mutex::new(session)),
            store,
            clock,
            events,
            ticker: None,
            notify_tx: Some(notify_tx),
            notify_worker: Some(notify_worker),
            permission,
            restored,
            options,
        };

        if let Some(Event::FastRestored {
            state,
            hours,
            elapsed_ms,
            ..
        }) = tracker.restored.clone()
        {
            tracing::info!(state = state.as_str(), hours, elapsed_ms, "restored persisted fast");
            if state == FastState::Active {
                tracker.spawn_ticker();
                if tracker.options.reschedule_on_restore {
                    tracker.schedule_completion();
                }
            }
        }
        tracker
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Copy of the current session.
    pub fn session(&self) -> FastingSession {
        self.lock().clone()
    }

    pub fn state(&self) -> FastState {
        self.lock().state()
    }

    /// The `FastRestored` event, if construction picked up a persisted fast.
    ///
    /// It is produced before anyone can subscribe, so it is kept here rather
    /// than broadcast.
    pub fn restored(&self) -> Option<&Event> {
        self.restored.as_ref()
    }

    /// Current state with display values recomputed as of now.
    pub fn snapshot(&self) -> Event {
        let now = self.clock.now();
        self.lock().snapshot(now)
    }

    /// Whether the ticker task is still running.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Last answer to the notification permission request.
    pub fn notifications_permitted(&self) -> bool {
        self.permission.load(Ordering::Relaxed)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fast of `hours` now.
    ///
    /// # Errors
    /// Rejects hours outside `1..=MAX_HOURS`; the tracker is left untouched.
    pub fn start_fast(&mut self, hours: u32) -> Result<Event, ValidationError> {
        let now = self.clock.now();
        let event = self.lock().start(hours, now)?;

        let persisted = PersistedFast {
            start_time: now,
            hours,
        };
        if let Err(e) = persisted.save(&mut *self.store) {
            tracing::warn!(error = %e, "failed to persist fast");
        }

        self.schedule_completion();
        self.spawn_ticker();
        tracing::info!(hours, start_time = %now, "fast started");
        self.publish(event.clone());
        Ok(event)
    }

    /// Start a fast with the currently selected preset.
    pub fn start_selected(&mut self) -> Result<Event, ValidationError> {
        let hours = self.lock().selected_hours();
        self.start_fast(hours)
    }

    /// Recompute progress now. Returns `Some(Event::FastCompleted)` if this
    /// observation reached the target.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let completed = self.lock().tick(now)?;
        self.cancel_ticker();
        tracing::info!("fast complete");
        self.publish(completed.clone());
        Some(completed)
    }

    /// Abandon the current fast. Returns `None` (and touches nothing) when
    /// already idle.
    pub fn stop_fast(&mut self) -> Option<Event> {
        self.cancel_ticker();
        let now = self.clock.now();
        let event = self.lock().stop(now)?;
        self.clear_persisted();
        self.send_notify(NotifyCommand::Cancel);
        tracing::info!("fast stopped");
        self.publish(event.clone());
        Some(event)
    }

    /// Acknowledge a complete fast. Returns `None` unless the state is
    /// complete.
    pub fn reset_after_complete(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let event = self.lock().reset_after_complete(now)?;
        self.cancel_ticker();
        self.clear_persisted();
        tracing::info!("fast acknowledged");
        self.publish(event.clone());
        Some(event)
    }

    /// Change the preset for the next fast.
    ///
    /// # Errors
    /// Rejects hours outside `1..=MAX_HOURS` and changes while a fast is
    /// running or complete.
    pub fn select_hours(&mut self, hours: u32) -> Result<Event, ValidationError> {
        let now = self.clock.now();
        let event = self.lock().select_hours(hours, now)?;
        self.publish(event.clone());
        Ok(event)
    }

    /// Stop the ticker and wait until queued notification work has finished.
    pub async fn shutdown(mut self) {
        self.cancel_ticker();
        self.notify_tx.take();
        if let Some(worker) = self.notify_worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "notification worker ended abnormally");
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, FastingSession> {
        lock_session(&self.session)
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn clear_persisted(&mut self) {
        if let Err(e) = PersistedFast::clear(&mut *self.store) {
            tracing::warn!(error = %e, "failed to clear persisted fast");
        }
    }

    fn schedule_completion(&self) {
        if !self.options.notifications.enabled {
            return;
        }
        let (hours, target_at) = {
            let session = self.lock();
            (session.selected_hours(), session.target_at())
        };
        let Some(target_at) = target_at else {
            return;
        };
        let fire_after = (target_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.send_notify(NotifyCommand::Schedule {
            fire_after,
            title: self.options.notifications.title.clone(),
            body: self.options.notifications.body_for(hours),
        });
    }

    fn send_notify(&self, command: NotifyCommand) {
        if let Some(tx) = &self.notify_tx {
            if tx.send(command).is_err() {
                tracing::debug!("notification worker gone, dropping command");
            }
        }
    }

    fn spawn_ticker(&mut self) {
        self.cancel_ticker();

        let session = Arc::clone(&self.session);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let period = self.options.tick_interval;
        let generation = lock_session(&session).generation();

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let now = clock.now();
                let (progress, completed) = {
                    let mut guard = lock_session(&session);
                    // A stale ticker from an earlier fast must not touch this one.
                    if guard.generation() != generation || !guard.is_active() {
                        break;
                    }
                    let completed = guard.tick(now);
                    (guard.progress_event(now), completed)
                };
                let _ = events.send(progress);
                if let Some(done) = completed {
                    tracing::info!("fast complete");
                    let _ = events.send(done);
                    break;
                }
            }
            tracing::debug!("ticker stopped");
        }));
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for FastingTracker {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

fn lock_session(session: &Mutex<FastingSession>) -> MutexGuard<'_, FastingSession> {
    // Transitions never panic halfway; a poisoned session is still coherent.
    session.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_notifications(
    notifier: Arc<dyn Notifier>,
    mut commands: mpsc::UnboundedReceiver<NotifyCommand>,
    permission: Arc<AtomicBool>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            NotifyCommand::Schedule {
                fire_after,
                title,
                body,
            } => {
                let granted = notifier.request_permission().await;
                permission.store(granted, Ordering::Relaxed);
                if !granted {
                    tracing::debug!("notification permission not granted");
                    continue;
                }
                if let Err(e) = notifier
                    .schedule_one_shot(FASTING_COMPLETE_ID, fire_after, &title, &body)
                    .await
                {
                    tracing::warn!(error = %e, "failed to schedule completion notification");
                }
            }
            NotifyCommand::Cancel => {
                if let Err(e) = notifier.cancel(FASTING_COMPLETE_ID).await {
                    tracing::warn!(error = %e, "failed to cancel completion notification");
                }
            }
        }
    }
}
