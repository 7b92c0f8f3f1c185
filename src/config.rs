use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub log_format: LogFormat,
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let max_connections = match lookup("INSIGHTS_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("INSIGHTS_DB_MAX_CONNECTIONS is not a number: {raw:?}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections,
            log_format: LogFormat::parse(lookup("INSIGHTS_LOG_FORMAT").as_deref()),
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance (or pass --demo)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).expect("config");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/savra"),
            ("INSIGHTS_DB_MAX_CONNECTIONS", "12"),
            ("INSIGHTS_LOG_FORMAT", "JSON"),
        ])
        .expect("config");
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.require_database_url().ok(), Some("postgres://localhost/savra"));
    }

    #[test]
    fn rejects_bad_pool_size() {
        assert!(config(&[("INSIGHTS_DB_MAX_CONNECTIONS", "many")]).is_err());
    }
}
