//! Exam countdown controller
//!
//! Drives a 1 Hz countdown that survives reloads through a persisted
//! deadline, warns once when time runs low, and fires expiry exactly once.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    ports::{
        Clock, DisplaySink, HostForm, KeyValueStore, NotificationPermission, Notifier, Scheduler,
        TaskHandle,
    },
    state::TimerState,
    utils::format_time,
};

/// Store key holding the deadline as epoch milliseconds
pub const DEFAULT_DEADLINE_KEY: &str = "exam_timer_end";
/// Hidden field added to the form when the timer submits it
pub const AUTO_SUBMIT_FIELD: &str = "auto_submitted";
/// Shown once time is up, before the form is submitted
pub const TIME_UP_MESSAGE: &str = "Time's up! Submitting your exam...";

/// Called once when the countdown expires
pub type ExpireHook = Box<dyn FnOnce() + Send + 'static>;
/// Called once when the warning threshold is reached
pub type WarningHook = Box<dyn FnOnce() + Send + 'static>;

/// Fixed timing constants of the countdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub deadline_key: String,
    pub tick_period: Duration,
    /// Delay between showing the time-up message and submitting
    pub grace_delay: Duration,
    /// Under this many seconds the display blinks
    pub blink_threshold_seconds: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            deadline_key: DEFAULT_DEADLINE_KEY.to_string(),
            tick_period: Duration::from_secs(1),
            grace_delay: Duration::from_millis(1500),
            blink_threshold_seconds: 60,
        }
    }
}

/// Everything the countdown needs from its host
#[derive(Clone)]
pub struct TimerPorts {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub display: Option<Arc<dyn DisplaySink>>,
    pub form: Option<Arc<dyn HostForm>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Text used for the low-time warning and notification
pub fn warning_message(threshold_seconds: u64) -> String {
    match threshold_seconds {
        60 => "1 minute remaining!".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes remaining!", s / 60),
        s => format!("{} remaining!", format_time(s)),
    }
}

/// Expiry behaviour of the exam page: flag the form as auto-submitted, show
/// the time-up message, then submit after the grace delay.
pub fn auto_submit_hook(
    form: Arc<dyn HostForm>,
    display: Arc<dyn DisplaySink>,
    scheduler: Arc<dyn Scheduler>,
    grace_delay: Duration,
) -> ExpireHook {
    Box::new(move || {
        form.append_hidden_field(AUTO_SUBMIT_FIELD, "true");
        display.set_text(TIME_UP_MESSAGE);
        info!("Exam time expired, submitting in {}ms", grace_delay.as_millis());

        scheduler.after(
            grace_delay,
            Box::new(move || {
                info!("Auto-submitting exam form");
                form.submit();
            }),
        );
    })
}

/// Starts countdown runs against a fixed set of ports
#[derive(Clone)]
pub struct CountdownController {
    ports: TimerPorts,
    settings: TimerSettings,
}

impl CountdownController {
    pub fn new(ports: TimerPorts, settings: TimerSettings) -> Self {
        Self { ports, settings }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Begin a countdown.
    ///
    /// A stored deadline still in the future overrides `duration_seconds`; a
    /// stored deadline already past expires the run before this returns.
    /// Returns `None`, doing nothing, when the display or the form is missing.
    pub fn start<E, W>(
        &self,
        duration_seconds: u64,
        warning_threshold_seconds: u64,
        on_expire: E,
        on_warning: W,
    ) -> Option<CountdownHandle>
    where
        E: FnOnce() + Send + 'static,
        W: FnOnce() + Send + 'static,
    {
        let (Some(display), Some(_)) = (self.ports.display.clone(), self.ports.form.as_ref())
        else {
            debug!("Timer element or exam form missing, countdown not started");
            return None;
        };

        let now = self.ports.clock.now_ms();
        let (seconds_remaining, deadline_passed) = match self.stored_deadline() {
            Some(deadline) if deadline > now => {
                let seconds = deadline.abs_diff(now).div_ceil(1000);
                info!("Resuming countdown from stored deadline, {}s remaining", seconds);
                (seconds, false)
            }
            Some(deadline) => {
                info!("Stored deadline passed {}ms ago", now.saturating_sub(deadline));
                (0, true)
            }
            None => {
                info!("Starting countdown for {}s", duration_seconds);
                (duration_seconds, false)
            }
        };

        let shared = Arc::new(Shared {
            run: Mutex::new(Run {
                state: TimerState::new(seconds_remaining),
                blink: false,
                on_expire: Some(Box::new(on_expire) as ExpireHook),
                on_warning: Some(Box::new(on_warning) as WarningHook),
            }),
            tick: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            warning_threshold: warning_threshold_seconds,
            blink_threshold: self.settings.blink_threshold_seconds,
            deadline_key: self.settings.deadline_key.clone(),
            store: Arc::clone(&self.ports.store),
            clock: Arc::clone(&self.ports.clock),
            display,
            notifier: self.ports.notifier.clone(),
        });

        shared.display.set_text(&format_time(seconds_remaining));

        if deadline_passed {
            shared.force_expire();
            return Some(CountdownHandle { shared });
        }

        let ticker = Arc::clone(&shared);
        let tick = self
            .ports
            .scheduler
            .every(self.settings.tick_period, Box::new(move || ticker.on_tick()));
        if let Ok(mut slot) = shared.tick.lock() {
            *slot = Some(tick);
        }

        Some(CountdownHandle { shared })
    }

    /// Start with the exam page's own hooks: auto-submit on expiry and a
    /// logged warning.
    pub fn start_exam(
        &self,
        duration_seconds: u64,
        warning_threshold_seconds: u64,
    ) -> Option<CountdownHandle> {
        let (Some(display), Some(form)) = (self.ports.display.clone(), self.ports.form.clone())
        else {
            debug!("Timer element or exam form missing, countdown not started");
            return None;
        };

        let on_expire = auto_submit_hook(
            form,
            display,
            Arc::clone(&self.ports.scheduler),
            self.settings.grace_delay,
        );
        let message = warning_message(warning_threshold_seconds);

        self.start(duration_seconds, warning_threshold_seconds, on_expire, move || {
            warn!("{}", message);
        })
    }

    /// Forget any stored deadline so the next start uses its configured duration
    pub fn clear_deadline(&self) {
        match self.ports.store.remove(&self.settings.deadline_key) {
            Ok(()) => info!("Cleared stored exam deadline"),
            Err(e) => warn!("Failed to clear stored deadline: {}", e),
        }
    }

    fn stored_deadline(&self) -> Option<i64> {
        let raw = self.ports.store.get(&self.settings.deadline_key)?;
        match raw.trim().parse::<i64>() {
            Ok(deadline) if deadline > 0 => Some(deadline),
            Ok(deadline) => {
                warn!("Ignoring implausible stored deadline {}", deadline);
                None
            }
            Err(e) => {
                warn!("Ignoring malformed stored deadline {:?}: {}", raw, e);
                None
            }
        }
    }
}

struct Run {
    state: TimerState,
    blink: bool,
    on_expire: Option<ExpireHook>,
    on_warning: Option<WarningHook>,
}

struct Shared {
    run: Mutex<Run>,
    tick: Mutex<Option<TaskHandle>>,
    cancelled: AtomicBool,
    warning_threshold: u64,
    blink_threshold: u64,
    deadline_key: String,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    display: Arc<dyn DisplaySink>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Shared {
    fn on_tick(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }

        let (events, blink) = {
            let Ok(mut run) = self.run.lock() else {
                return;
            };
            if self.cancelled.load(Ordering::SeqCst) || !run.state.is_active() {
                return;
            }

            let events = run.state.tick(self.warning_threshold);
            let blink = if events.low_time && events.seconds_remaining <= self.blink_threshold {
                run.blink = !run.blink;
                Some(run.blink)
            } else {
                None
            };
            (events, blink)
        };

        debug!("Countdown tick: {}s remaining", events.seconds_remaining);
        self.display.set_text(&format_time(events.seconds_remaining));

        if events.low_time {
            self.display.set_urgent(true);
            if let Some(on) = blink {
                self.display.set_blink(on);
            }
        }

        if events.warn {
            info!("Warning threshold reached: {}s remaining", events.seconds_remaining);
            self.send_notification();
            if let Some(hook) = self.take_hook(|run| run.on_warning.take()) {
                hook();
            }
        }

        if events.expire {
            self.stop_ticking();
            info!("Countdown expired");
            if let Some(hook) = self.take_hook(|run| run.on_expire.take()) {
                hook();
            }
        }
    }

    /// Take a hook unless the run was cancelled. Hooks run after the lock is
    /// released so they may use the handle.
    fn take_hook<F>(&self, pick: F) -> Option<Box<dyn FnOnce() + Send>>
    where
        F: FnOnce(&mut Run) -> Option<Box<dyn FnOnce() + Send>>,
    {
        let mut run = self.run.lock().ok()?;
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        pick(&mut run)
    }

    fn force_expire(&self) {
        {
            let Ok(mut run) = self.run.lock() else {
                return;
            };
            if !run.state.expire() {
                return;
            }
        }

        self.stop_ticking();
        info!("Countdown expired without ticking");
        if let Some(hook) = self.take_hook(|run| run.on_expire.take()) {
            hook();
        }
    }

    fn send_notification(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if notifier.permission() != NotificationPermission::Granted {
            debug!("Notification permission not granted, skipping");
            return;
        }
        if let Err(e) = notifier.notify("Exam Timer", &warning_message(self.warning_threshold)) {
            warn!("Failed to send warning notification: {}", e);
        }
    }

    fn stop_ticking(&self) {
        if let Ok(slot) = self.tick.lock() {
            if let Some(tick) = slot.as_ref() {
                tick.cancel();
            }
        }
    }
}

/// Handle to a running (or finished) countdown
#[derive(Clone)]
pub struct CountdownHandle {
    shared: Arc<Shared>,
}

impl CountdownHandle {
    /// Snapshot of the current state
    pub fn state(&self) -> TimerState {
        self.shared
            .run
            .lock()
            .map(|run| run.state)
            .unwrap_or_default()
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.state().seconds_remaining
    }

    pub fn is_expired(&self) -> bool {
        self.state().expired
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Stop the countdown. No hook fires afterwards. Idempotent.
    pub fn cancel(&self) {
        // Flag and hooks change under the run lock so a tick in flight on
        // another thread cannot pick up a hook afterwards
        if let Ok(mut run) = self.shared.run.lock() {
            if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
                info!("Countdown cancelled with {}s remaining", run.state.seconds_remaining);
            }
            run.on_expire = None;
            run.on_warning = None;
        } else {
            self.shared.cancelled.store(true, Ordering::SeqCst);
        }
        self.shared.stop_ticking();
    }

    /// Persist the deadline so a restart resumes instead of resetting.
    /// Called when the page is torn down; writes unconditionally.
    /// Skipped, with a warning, if the deadline does not fit in epoch millis.
    pub fn unload(&self) {
        let seconds_remaining = self.seconds_remaining();
        let now = self.shared.clock.now_ms();
        let Some(deadline) = i64::try_from(seconds_remaining)
            .ok()
            .and_then(|seconds| seconds.checked_mul(1000))
            .and_then(|ms| now.checked_add(ms))
        else {
            warn!(
                "Deadline for {}s remaining is out of range, not persisting it",
                seconds_remaining
            );
            return;
        };

        match self
            .shared
            .store
            .set(&self.shared.deadline_key, &deadline.to_string())
        {
            Ok(()) => info!("Persisted exam deadline {} ({}s remaining)", deadline, seconds_remaining),
            Err(e) => warn!("Failed to persist exam deadline: {}", e),
        }
    }
}
