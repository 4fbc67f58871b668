//! A countdown that outlives its page: unload, reopen the store, resume.

use std::{sync::Arc, time::Duration};

use exam_timer::{
    ports::{
        DisplaySink, ElementDisplay, FormField, HostForm, JsonFileStore, KeyValueStore,
        ManualClock, ManualScheduler, MemoryForm,
    },
    tasks::{
        Autosave, CountdownController, TimerPorts, TimerSettings, AUTO_SUBMIT_FIELD,
        DEFAULT_AUTOSAVE_INTERVAL, TIME_UP_MESSAGE,
    },
};

const OPENED_AT: i64 = 1_780_000_000_000;

struct Page {
    store: Arc<JsonFileStore>,
    scheduler: ManualScheduler,
    display: Arc<ElementDisplay>,
    form: Arc<MemoryForm>,
    controller: CountdownController,
}

/// Load the exam page against the store file at `path`
fn load_page(path: &std::path::Path, clock: &ManualClock) -> Page {
    let store = Arc::new(JsonFileStore::open(path).unwrap());
    let scheduler = ManualScheduler::new(clock.clone());
    let display = Arc::new(ElementDisplay::default());
    let form = Arc::new(MemoryForm::new(vec![
        FormField::text("q1", ""),
        FormField::checkbox("q2_confident", false),
    ]));

    let controller = CountdownController::new(
        TimerPorts {
            store: store.clone(),
            clock: Arc::new(clock.clone()),
            scheduler: Arc::new(scheduler.clone()),
            display: Some(display.clone() as Arc<dyn DisplaySink>),
            form: Some(form.clone() as Arc<dyn HostForm>),
            notifier: None,
        },
        TimerSettings::default(),
    );

    Page {
        store,
        scheduler,
        display,
        form,
        controller,
    }
}

#[test]
fn reload_resumes_countdown_and_expires_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let clock = ManualClock::new(OPENED_AT);

    let first = load_page(&path, &clock);
    let handle = first.controller.start_exam(120, 30).unwrap();
    assert_eq!(first.display.text(), "00:02:00");

    first.scheduler.advance(Duration::from_secs(50));
    assert_eq!(handle.seconds_remaining(), 70);
    handle.unload();
    drop(first);

    // Two seconds pass while the page reloads
    clock.advance_ms(2_000);

    let second = load_page(&path, &clock);
    let resumed = second.controller.start_exam(120, 30).unwrap();
    assert_eq!(resumed.seconds_remaining(), 68);

    second.scheduler.advance(Duration::from_secs(68));
    assert!(resumed.is_expired());
    assert_eq!(second.display.text(), TIME_UP_MESSAGE);

    second.scheduler.advance(Duration::from_millis(1500));
    assert_eq!(second.form.submission_count(), 1);
    assert_eq!(second.form.field(AUTO_SUBMIT_FIELD).unwrap().value, "true");

    second.scheduler.advance(Duration::from_secs(60));
    assert_eq!(second.form.submission_count(), 1);
}

#[test]
fn reload_after_deadline_submits_without_ticking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let clock = ManualClock::new(OPENED_AT);

    let first = load_page(&path, &clock);
    first.controller.start_exam(60, 10).unwrap().unload();
    drop(first);

    clock.advance_ms(5 * 60 * 1000);

    let second = load_page(&path, &clock);
    let handle = second.controller.start_exam(60, 10).unwrap();
    assert!(handle.is_expired());
    assert_eq!(second.display.text(), TIME_UP_MESSAGE);

    second.scheduler.advance(Duration::from_millis(1500));
    assert_eq!(second.form.submission_count(), 1);
}

#[test]
fn answers_survive_reload_until_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let clock = ManualClock::new(OPENED_AT);

    let first = load_page(&path, &clock);
    let autosave = Autosave::start(
        Some(first.form.clone() as Arc<dyn HostForm>),
        first.store.clone(),
        &first.scheduler,
        "exam_7_answers",
        DEFAULT_AUTOSAVE_INTERVAL,
    )
    .unwrap();
    first.form.edit("q1", |field| field.value = "42".into());
    first.form.edit("q2_confident", |field| field.checked = true);
    first.scheduler.advance(DEFAULT_AUTOSAVE_INTERVAL);
    drop(autosave);
    drop(first);

    let second = load_page(&path, &clock);
    let autosave = Autosave::start(
        Some(second.form.clone() as Arc<dyn HostForm>),
        second.store.clone(),
        &second.scheduler,
        "exam_7_answers",
        DEFAULT_AUTOSAVE_INTERVAL,
    )
    .unwrap();
    assert_eq!(autosave.restored_fields(), 2);
    assert_eq!(second.form.field("q1").unwrap().value, "42");
    assert!(second.form.field("q2_confident").unwrap().checked);

    autosave.on_submit();
    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.get("exam_7_answers"), None);
}

#[test]
fn session_closed_after_auto_submit_stays_expired_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let clock = ManualClock::new(OPENED_AT);

    let first = load_page(&path, &clock);
    let handle = first.controller.start_exam(30, 10).unwrap();
    first.scheduler.advance(Duration::from_secs(30) + Duration::from_millis(1500));
    assert_eq!(first.form.submission_count(), 1);

    // Navigation after the submission tears the page down
    handle.unload();
    assert_eq!(
        first.store.get("exam_timer_end"),
        Some((OPENED_AT + 31_500).to_string())
    );
    drop(first);

    clock.advance_ms(10_000);
    let second = load_page(&path, &clock);
    let reopened = second.controller.start_exam(30, 10).unwrap();
    assert!(reopened.is_expired());
    assert_eq!(reopened.seconds_remaining(), 0);
}
