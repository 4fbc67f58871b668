//! Periodic form autosave

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    ports::{FormField, HostForm, KeyValueStore, Scheduler, TaskHandle},
    state::FormSnapshot,
};

/// Default time between snapshots
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Collect every named control into a snapshot. Later controls with the same
/// name overwrite earlier ones.
pub fn snapshot_fields(fields: &[FormField]) -> FormSnapshot {
    fields
        .iter()
        .filter(|field| !field.name.is_empty())
        .map(|field| (field.name.clone(), field.saved_value()))
        .collect()
}

struct Saver {
    form: Arc<dyn HostForm>,
    store: Arc<dyn KeyValueStore>,
    save_key: String,
}

impl Saver {
    fn restore(&self) -> usize {
        let Some(raw) = self.store.get(&self.save_key) else {
            return 0;
        };

        let snapshot: FormSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable saved form data under {}: {}", self.save_key, e);
                return 0;
            }
        };

        let restored = snapshot
            .iter()
            .filter(|(name, value)| self.form.restore_field(name, value))
            .count();
        info!(
            "Restored {}/{} saved fields from {}",
            restored,
            snapshot.len(),
            self.save_key
        );
        restored
    }

    fn save(&self) {
        let snapshot = snapshot_fields(&self.form.fields());
        let result = serde_json::to_string(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.store
                    .set(&self.save_key, &raw)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => debug!("Autosaved {} fields to {}", snapshot.len(), self.save_key),
            Err(e) => warn!("Autosave to {} failed: {}", self.save_key, e),
        }
    }
}

/// Form autosave entry point
pub struct Autosave;

impl Autosave {
    /// Restore saved values into `form`, then snapshot it every `interval`.
    /// Returns `None`, doing nothing, when the form is missing.
    pub fn start(
        form: Option<Arc<dyn HostForm>>,
        store: Arc<dyn KeyValueStore>,
        scheduler: &dyn Scheduler,
        save_key: impl Into<String>,
        interval: Duration,
    ) -> Option<AutosaveHandle> {
        let Some(form) = form else {
            debug!("Form missing, autosave not started");
            return None;
        };

        let saver = Arc::new(Saver {
            form,
            store,
            save_key: save_key.into(),
        });
        let restored = saver.restore();

        let periodic = Arc::clone(&saver);
        let task = scheduler.every(interval, Box::new(move || periodic.save()));
        info!(
            "Autosaving form to {} every {}s",
            saver.save_key,
            interval.as_secs_f64()
        );

        Some(AutosaveHandle {
            saver,
            task,
            restored,
        })
    }
}

/// Handle to a running autosave
pub struct AutosaveHandle {
    saver: Arc<Saver>,
    task: TaskHandle,
    restored: usize,
}

impl AutosaveHandle {
    /// Number of fields restored when autosave started
    pub fn restored_fields(&self) -> usize {
        self.restored
    }

    /// Take a snapshot right away
    pub fn save_now(&self) {
        self.saver.save();
    }

    /// The form was submitted: drop the saved data and stop saving
    pub fn on_submit(&self) {
        self.task.cancel();
        match self.saver.store.remove(&self.saver.save_key) {
            Ok(()) => info!("Cleared saved form data under {}", self.saver.save_key),
            Err(e) => warn!("Failed to clear saved form data: {}", e),
        }
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }
}
