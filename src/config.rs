//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use clap::Parser;

use crate::tasks::{TimerSettings, DEFAULT_DEADLINE_KEY};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "exam-timer")]
#[command(about = "Exam countdown that survives restarts and auto-submits when time is up")]
#[command(version)]
pub struct Config {
    /// Exam duration in minutes
    #[arg(short, long, default_value = "60")]
    pub duration: u64,

    /// Warn when this many minutes remain
    #[arg(short, long, default_value = "5")]
    pub warning: u64,

    /// File holding the persisted deadline and autosaved answers
    #[arg(short, long, default_value = "exam-store.json")]
    pub store: PathBuf,

    /// Store key for the exam deadline
    #[arg(long, default_value = DEFAULT_DEADLINE_KEY)]
    pub deadline_key: String,

    /// Store key for autosaved answers
    #[arg(long, default_value = "exam_answers")]
    pub save_key: String,

    /// Seconds between answer autosaves
    #[arg(long, default_value = "30")]
    pub autosave_interval: u64,

    /// Answer field as NAME=VALUE, may be repeated
    #[arg(short, long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Exam opens at this RFC 3339 time
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Exam closes at this RFC 3339 time
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Treat notification permission as granted
    #[arg(long)]
    pub notify: bool,

    /// Discard any persisted deadline before starting
    #[arg(long)]
    pub reset: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration.saturating_mul(60)
    }

    pub fn warning_seconds(&self) -> u64 {
        self.warning.saturating_mul(60)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval.max(1))
    }

    /// Timer settings with the configured deadline key
    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            deadline_key: self.deadline_key.clone(),
            ..TimerSettings::default()
        }
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {:?}", raw))?;
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}
