//! Timer display surfaces

use std::{
    collections::BTreeSet,
    io::Write,
    sync::Mutex,
};

/// Element id of the timer on the exam page
pub const TIMER_ELEMENT_ID: &str = "exam-timer";
/// Classes applied while time is running low
pub const URGENT_CLASSES: [&str; 2] = ["text-danger", "fw-bold"];
/// Class toggled on and off in the final minute
pub const BLINK_CLASS: &str = "opacity-50";

/// Narrow rendering interface the countdown writes into
pub trait DisplaySink: Send + Sync {
    fn set_text(&self, text: &str);
    fn set_urgent(&self, urgent: bool);
    fn set_blink(&self, on: bool);
}

#[derive(Debug, Default)]
struct ElementContent {
    text: String,
    classes: BTreeSet<String>,
}

/// Model of the timer element: text content plus a class list
#[derive(Debug)]
pub struct ElementDisplay {
    id: String,
    content: Mutex<ElementContent>,
}

impl ElementDisplay {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Mutex::new(ElementContent::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> String {
        self.content
            .lock()
            .map(|content| content.text.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.content
            .lock()
            .map(|content| content.classes.contains(class))
            .unwrap_or(false)
    }

    /// Current classes, sorted
    pub fn classes(&self) -> Vec<String> {
        self.content
            .lock()
            .map(|content| content.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn toggle(&self, class: &str, on: bool) {
        if let Ok(mut content) = self.content.lock() {
            if on {
                content.classes.insert(class.to_string());
            } else {
                content.classes.remove(class);
            }
        }
    }
}

impl Default for ElementDisplay {
    fn default() -> Self {
        Self::new(TIMER_ELEMENT_ID)
    }
}

impl DisplaySink for ElementDisplay {
    fn set_text(&self, text: &str) {
        if let Ok(mut content) = self.content.lock() {
            content.text = text.to_string();
        }
    }

    fn set_urgent(&self, urgent: bool) {
        for class in URGENT_CLASSES {
            self.toggle(class, urgent);
        }
    }

    fn set_blink(&self, on: bool) {
        self.toggle(BLINK_CLASS, on);
    }
}

/// Renders the timer element on a single terminal line
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    element: ElementDisplay,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn redraw(&self) {
        let classes = self.element.classes();
        let line = if classes.is_empty() {
            self.element.text()
        } else {
            format!("{} [{}]", self.element.text(), classes.join(" "))
        };

        let mut stdout = std::io::stdout().lock();
        // A closed stdout only loses the redraw
        let _ = write!(stdout, "\r\x1b[2K{line}");
        let _ = stdout.flush();
    }
}

impl DisplaySink for TerminalDisplay {
    fn set_text(&self, text: &str) {
        self.element.set_text(text);
        self.redraw();
    }

    fn set_urgent(&self, urgent: bool) {
        self.element.set_urgent(urgent);
        self.redraw();
    }

    fn set_blink(&self, on: bool) {
        self.element.set_blink(on);
        self.redraw();
    }
}
