use crate::analytics::RetirementPolicy;
use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;

/// Process configuration, read from the environment
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// SQLite connection string; `None` disables persistence
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// Spreadsheet loaded at startup when present
    pub data_file: PathBuf,
    pub page_size: usize,
    pub retirement: RetirementPolicy,
    pub bootstrap_admin_id: String,
    /// `None` means a random credential is generated at startup
    pub bootstrap_admin_password: Option<String>,
    pub session_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            bind_addr: "127.0.0.1:3000".to_string(),
            data_file: PathBuf::from("data/employees.xlsx"),
            page_size: DEFAULT_PAGE_SIZE,
            retirement: RetirementPolicy::default(),
            bootstrap_admin_id: "admin".to_string(),
            bootstrap_admin_password: None,
            session_hours: 24,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let mut page_size = parsed(&get, "PAGE_SIZE", defaults.page_size);
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            warn!(
                "PAGE_SIZE {} outside {}..={}, using {}",
                page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE
            );
            page_size = DEFAULT_PAGE_SIZE;
        }

        let mut retirement = RetirementPolicy {
            retirement_age: parsed(&get, "RETIREMENT_AGE", defaults.retirement.retirement_age),
            warning_age: parsed(&get, "RETIREMENT_WARNING_AGE", defaults.retirement.warning_age),
        };
        if retirement.warning_age > retirement.retirement_age {
            warn!(
                "RETIREMENT_WARNING_AGE {} is above RETIREMENT_AGE {}, using the retirement age",
                retirement.warning_age, retirement.retirement_age
            );
            retirement.warning_age = retirement.retirement_age;
        }

        Config {
            database_url: get("DATABASE_URL"),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            data_file: get("DATA_FILE").map(PathBuf::from).unwrap_or(defaults.data_file),
            page_size,
            retirement,
            bootstrap_admin_id: get("BOOTSTRAP_ADMIN_ID").unwrap_or(defaults.bootstrap_admin_id),
            bootstrap_admin_password: get("BOOTSTRAP_ADMIN_PASSWORD"),
            session_hours: parsed(&get, "SESSION_HOURS", defaults.session_hours).max(1),
        }
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}={:?}, using {}", key, raw, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn malformed_and_out_of_range_values_fall_back() {
        let c = config(&[
            ("PAGE_SIZE", "500"),
            ("RETIREMENT_AGE", "sixty"),
            ("SESSION_HOURS", "2"),
            ("DATABASE_URL", "  "),
        ]);
        assert_eq!(c.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(c.retirement.retirement_age, 65);
        assert_eq!(c.session_hours, 2);
        assert_eq!(c.database_url, None);
    }
}
