//! Exam Timer - reload-safe exam countdown with auto-submit
//!
//! Runs one exam session in the terminal. The store file plays the part of
//! browser local storage: stop the process and start it again and the
//! countdown resumes where it was.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use exam_timer::{
    config::Config,
    ports::{
        DisplaySink, FormField, HostForm, JsonFileStore, KeyValueStore, LogNotifier, MemoryForm,
        Notifier, SystemClock, TerminalDisplay, TokioScheduler,
    },
    services::{show_exam_availability, LogNoticeSink, NoticeSink},
    tasks::{Autosave, CountdownController, TimerPorts},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("exam_timer={}", config.log_level()))
        .init();

    info!("Starting exam-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: duration={}min, warning={}min, store={}",
        config.duration,
        config.warning,
        config.store.display()
    );

    let notices: &dyn NoticeSink = &LogNoticeSink;
    if !show_exam_availability(Some(notices), Utc::now(), config.start, config.end) {
        info!("Exam is not open, nothing to do");
        return Ok(());
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open_or_reset(&config.store)?);
    let scheduler = Arc::new(TokioScheduler::current());
    let display: Arc<dyn DisplaySink> = Arc::new(TerminalDisplay::new());
    let form = Arc::new(MemoryForm::new(
        config
            .fields
            .iter()
            .map(|(name, value)| FormField::text(name.as_str(), value.as_str()))
            .collect(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new(config.notify));
    let host_form: Arc<dyn HostForm> = form.clone();

    let autosave = Autosave::start(
        Some(Arc::clone(&host_form)),
        Arc::clone(&store),
        scheduler.as_ref(),
        config.save_key.as_str(),
        config.autosave_interval(),
    );

    let controller = CountdownController::new(
        TimerPorts {
            store,
            clock: Arc::new(SystemClock),
            scheduler,
            display: Some(display),
            form: Some(host_form),
            notifier: Some(notifier),
        },
        config.timer_settings(),
    );
    if config.reset {
        controller.clear_deadline();
    }

    let countdown = controller
        .start_exam(config.duration_seconds(), config.warning_seconds())
        .ok_or_else(|| anyhow::anyhow!("countdown did not start"))?;

    let mut submissions = form.subscribe();

    tokio::select! {
        changed = submissions.changed() => {
            println!();
            if changed.is_ok() {
                for field in form.fields() {
                    info!("Submitted {}={}", field.name, field.value);
                }
            }
        }
        result = shutdown_signal() => {
            println!();
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signals: {}", e);
            }
            if let Some(autosave) = &autosave {
                autosave.save_now();
            }
        }
    }

    // Leaving the session is a teardown whichever way it ended
    countdown.unload();

    info!("Exam session closed");
    Ok(())
}
