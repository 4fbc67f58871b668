//! Timer text formatting

/// Format seconds as `HH:MM:SS`, each part zero-padded to two digits.
/// Hours are not capped.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
