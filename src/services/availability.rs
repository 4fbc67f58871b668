//! Exam availability window

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

/// Where `now` falls relative to an exam's availability window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    NotYetAvailable { starts_at: DateTime<Utc> },
    Ended { ended_at: DateTime<Utc> },
    /// Open, closing in under a day
    ClosingSoon { hours_remaining: i64 },
    Available,
}

/// Severity of an availability notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Danger,
}

/// Where availability notices are shown
pub trait NoticeSink {
    fn show(&self, level: NoticeLevel, message: &str);
}

/// Notice sink that writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn show(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => info!("{}", message),
            NoticeLevel::Warning => warn!("{}", message),
            NoticeLevel::Danger => error!("{}", message),
        }
    }
}

impl Availability {
    /// Whether the exam can be taken
    pub fn is_usable(&self) -> bool {
        !matches!(
            self,
            Availability::NotYetAvailable { .. } | Availability::Ended { .. }
        )
    }

    /// Notice to show, if any
    pub fn notice(&self) -> Option<(NoticeLevel, String)> {
        match self {
            Availability::NotYetAvailable { starts_at } => Some((
                NoticeLevel::Warning,
                format!(
                    "This exam is not available yet. It will be available from {}.",
                    starts_at.format("%Y-%m-%d %H:%M UTC")
                ),
            )),
            Availability::Ended { ended_at } => Some((
                NoticeLevel::Danger,
                format!(
                    "This exam ended on {}.",
                    ended_at.format("%Y-%m-%d %H:%M UTC")
                ),
            )),
            Availability::ClosingSoon { hours_remaining: 0 } => Some((
                NoticeLevel::Info,
                "This exam closes in less than an hour.".to_string(),
            )),
            Availability::ClosingSoon { hours_remaining: 1 } => Some((
                NoticeLevel::Info,
                "This exam closes in 1 hour.".to_string(),
            )),
            Availability::ClosingSoon { hours_remaining } => Some((
                NoticeLevel::Info,
                format!("This exam closes in {} hours.", hours_remaining),
            )),
            Availability::Available => None,
        }
    }
}

/// Classify `now` against an optional start and end
pub fn check_exam_availability(
    now: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Availability {
    if let Some(starts_at) = start.filter(|start| now < *start) {
        return Availability::NotYetAvailable { starts_at };
    }

    match end {
        Some(ended_at) if now >= ended_at => Availability::Ended { ended_at },
        Some(end) if end - now < Duration::hours(24) => Availability::ClosingSoon {
            hours_remaining: (end - now).num_hours(),
        },
        _ => Availability::Available,
    }
}

/// Check availability, show the notice through `sink` if there is one, and
/// return whether the exam can be taken
pub fn show_exam_availability(
    sink: Option<&dyn NoticeSink>,
    now: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    let availability = check_exam_availability(now, start, end);
    debug!("Exam availability: {:?}", availability);

    if let (Some(sink), Some((level, message))) = (sink, availability.notice()) {
        sink.show(level, &message);
    }
    availability.is_usable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct Notices(RefCell<Vec<(NoticeLevel, String)>>);

    impl NoticeSink for Notices {
        fn show(&self, level: NoticeLevel, message: &str) {
            self.0.borrow_mut().push((level, message.to_string()));
        }
    }

    #[test]
    fn future_start_is_not_yet_available() {
        let starts_at = now() + Duration::hours(2);
        let result = check_exam_availability(now(), Some(starts_at), None);
        assert_eq!(result, Availability::NotYetAvailable { starts_at });
        assert!(!result.is_usable());
    }

    #[test]
    fn past_end_has_ended() {
        let ended_at = now() - Duration::minutes(1);
        let result = check_exam_availability(now(), None, Some(ended_at));
        assert_eq!(result, Availability::Ended { ended_at });
        assert!(!result.is_usable());

        assert!(!check_exam_availability(now(), None, Some(now())).is_usable());
    }

    #[test]
    fn open_window_is_available() {
        assert_eq!(check_exam_availability(now(), None, None), Availability::Available);
        assert_eq!(
            check_exam_availability(
                now(),
                Some(now() - Duration::days(1)),
                Some(now() + Duration::days(3))
            ),
            Availability::Available
        );
    }

    #[test]
    fn under_a_day_left_is_closing_soon() {
        let result = check_exam_availability(now(), None, Some(now() + Duration::minutes(150)));
        assert_eq!(result, Availability::ClosingSoon { hours_remaining: 2 });
        assert!(result.is_usable());

        assert_eq!(
            check_exam_availability(now(), None, Some(now() + Duration::hours(24))),
            Availability::Available
        );
    }

    #[test]
    fn show_renders_notice_and_returns_usability() {
        let notices = Notices::default();
        let sink: &dyn NoticeSink = &notices;

        assert!(!show_exam_availability(
            Some(sink),
            now(),
            Some(now() + Duration::hours(1)),
            None
        ));
        assert!(show_exam_availability(
            Some(sink),
            now(),
            None,
            Some(now() + Duration::minutes(30))
        ));
        assert!(show_exam_availability(Some(sink), now(), None, None));
        assert!(show_exam_availability(None, now(), None, None));

        let shown = notices.0.borrow();
        assert_eq!(shown.len(), 2);
        assert_eq!(
            shown[0],
            (
                NoticeLevel::Warning,
                "This exam is not available yet. It will be available from 2026-05-04 10:00 UTC."
                    .to_string()
            )
        );
        assert_eq!(
            shown[1],
            (
                NoticeLevel::Info,
                "This exam closes in less than an hour.".to_string()
            )
        );
    }
}
