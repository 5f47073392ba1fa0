use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deploy log files are named `deploy-<timestamp>.log`.
pub const LOG_PREFIX: &str = "deploy-";
pub const LOG_EXTENSION: &str = ".log";

/// Substring git prints when a commit is attempted on a clean tree.
pub const NOTHING_TO_COMMIT: &str = "nothing to commit";

/// The timestamp format sorts lexicographically in chronological order, as
/// long as callers stamp in UTC.
pub fn log_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("{LOG_PREFIX}{}{LOG_EXTENSION}", at.format("%Y%m%d-%H%M%S-%3f"))
}

/// Name used when `base` is already taken: `deploy-<ts>-<nn>.log`.
pub fn log_file_name_with_sequence(base: &str, sequence: u32) -> String {
    format!("{}-{sequence:02}{LOG_EXTENSION}", log_stem(base))
}

pub fn is_log_file_name(name: &str) -> bool {
    name.starts_with(LOG_PREFIX) && name.ends_with(LOG_EXTENSION)
}

/// Sort key for log names. Comparing stems keeps `<ts>.log` ahead of the
/// collision names `<ts>-<nn>.log` written after it.
pub fn log_stem(name: &str) -> &str {
    name.strip_suffix(LOG_EXTENSION).unwrap_or(name)
}

pub fn commit_message<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("feat: content update {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Which environment the server runs in. Manual pushes are development-only,
/// so an unconfigured server is treated as production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn allows_manual_push(self) -> bool {
        self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

/// Returned once the deploy script has been spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReceipt {
    pub log_file: String,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub commit_message: String,
    /// False when the tree was clean and the commit step was skipped.
    pub committed: bool,
    pub output: String,
}
