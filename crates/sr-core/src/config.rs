use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// How the spreadsheet is located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpreadsheetTarget {
    Id(String),
    /// Looked up by title through the Drive API.
    Name(String),
}

/// When the poller re-establishes the store connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPolicy {
    EveryCycle,
    Interval(Duration),
    Disabled,
}

/// Typed configuration for the relay.
#[derive(Clone, Debug)]
pub struct Config {
    // Transport
    pub telegram_bot_token: String,
    pub telegram_safe_limit: usize,

    // Store
    pub credentials_path: PathBuf,
    pub spreadsheet: SpreadsheetTarget,

    // Poller
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub refresh_policy: RefreshPolicy,
    pub shutdown_timeout: Duration,

    // Commands
    pub recent_count: usize,
    pub search_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let credentials_path = env_path("GOOGLE_CREDENTIALS_PATH")
            .unwrap_or_else(|| PathBuf::from("credentials.json"));
        if !credentials_path.is_file() {
            return Err(Error::Config(format!(
                "credentials file not found: {} (set GOOGLE_CREDENTIALS_PATH)",
                credentials_path.display()
            )));
        }

        let spreadsheet = parse_spreadsheet_target(
            env_str("SPREADSHEET_ID").and_then(non_empty),
            env_str("SPREADSHEET_NAME").and_then(non_empty),
        )?;

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(30).max(1));
        let error_backoff = Duration::from_secs(env_u64("ERROR_BACKOFF_SECS").unwrap_or(60).max(1));
        let refresh_policy = parse_refresh_policy(env_str("SHEETS_REFRESH_SECS"))?;
        let shutdown_timeout =
            Duration::from_secs(env_u64("SHUTDOWN_TIMEOUT_SECS").unwrap_or(10));

        let recent_count = env_usize("RECENT_RECORDS_COUNT").unwrap_or(5).max(1);
        let search_limit = env_usize("SEARCH_RESULTS_LIMIT").unwrap_or(10).max(1);
        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000).max(200);

        Ok(Self {
            telegram_bot_token,
            telegram_safe_limit,
            credentials_path,
            spreadsheet,
            poll_interval,
            error_backoff,
            refresh_policy,
            shutdown_timeout,
            recent_count,
            search_limit,
        })
    }
}

fn parse_spreadsheet_target(
    id: Option<String>,
    name: Option<String>,
) -> Result<SpreadsheetTarget> {
    match (id, name) {
        (Some(id), _) => Ok(SpreadsheetTarget::Id(id.trim().to_string())),
        (None, Some(name)) => Ok(SpreadsheetTarget::Name(name.trim().to_string())),
        (None, None) => Err(Error::Config(
            "SPREADSHEET_ID or SPREADSHEET_NAME environment variable is required".to_string(),
        )),
    }
}

/// Unset or `0` refreshes every cycle, `off` disables refresh, `N` refreshes every N seconds.
fn parse_refresh_policy(v: Option<String>) -> Result<RefreshPolicy> {
    let Some(raw) = v.and_then(non_empty) else {
        return Ok(RefreshPolicy::EveryCycle);
    };
    let raw = raw.trim().to_lowercase();
    if matches!(raw.as_str(), "off" | "never" | "disabled") {
        return Ok(RefreshPolicy::Disabled);
    }
    match raw.parse::<u64>() {
        Ok(0) => Ok(RefreshPolicy::EveryCycle),
        Ok(secs) => Ok(RefreshPolicy::Interval(Duration::from_secs(secs))),
        Err(_) => Err(Error::Config(format!(
            "SHEETS_REFRESH_SECS must be a number of seconds or 'off', got {raw:?}"
        ))),
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
