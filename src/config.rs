use anyhow::{bail, Context};

use crate::stats::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub default_threshold: f64,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads settings from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a local `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match lookup("GRADES_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("GRADES_MAX_CONNECTIONS is not a count: {raw}"))?,
            None => 5,
        };
        if max_connections == 0 {
            bail!("GRADES_MAX_CONNECTIONS must be at least 1");
        }

        let default_threshold = match lookup("GRADES_DEFAULT_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .with_context(|| format!("GRADES_DEFAULT_THRESHOLD is not a number: {raw}"))?,
            None => DEFAULT_THRESHOLD,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be `pretty` or `json`, got `{other}`"),
        };

        Ok(Self {
            database_url,
            max_connections,
            default_threshold,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/grades")]).unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.default_threshold, 70.0);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn database_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/grades"),
            ("GRADES_MAX_CONNECTIONS", "12"),
            ("GRADES_DEFAULT_THRESHOLD", "65.5"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.default_threshold, 65.5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let url = ("DATABASE_URL", "postgres://db/grades");
        assert!(load(&[url, ("GRADES_MAX_CONNECTIONS", "many")]).is_err());
        assert!(load(&[url, ("GRADES_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[url, ("GRADES_DEFAULT_THRESHOLD", "NaN")]).is_err());
        assert!(load(&[url, ("LOG_FORMAT", "xml")]).is_err());
    }
}
