use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Connection settings handed to a backend adapter at construction time.
///
/// Unset fields fall back to the adapter's own defaults (empty password,
/// database 0, the backend's well-known port).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub database: i64,
    /// Deadline applied to every remote call made by the adapter.
    pub timeout: Option<Duration>,
}

impl Config {
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(Self::DEFAULT_HOST)
    }

    /// `host:port`, using `default_port` when no port was configured.
    pub fn addr(&self, default_port: u16) -> String {
        format!(
            "{}:{}",
            self.host_or_default(),
            self.port.unwrap_or(default_port)
        )
    }

    /// Password, treating an empty string as unset.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("CACHE_HOST").filter(|h| !h.is_empty()),
            port: parse_var(&lookup, "CACHE_PORT"),
            password: lookup("CACHE_PASSWORD"),
            database: parse_var(&lookup, "CACHE_DATABASE").unwrap_or(0),
            timeout: parse_var::<u64>(&lookup, "CACHE_TIMEOUT_MS").map(Duration::from_millis),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{name}={raw:?} is not valid, ignoring it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_options() {
        let cfg = Config::new()
            .with_host("host")
            .with_port(123)
            .with_password("pass")
            .with_database(1)
            .with_timeout(Duration::from_millis(250));

        assert_eq!(cfg.host.as_deref(), Some("host"));
        assert_eq!(cfg.port, Some(123));
        assert_eq!(cfg.password(), Some("pass"));
        assert_eq!(cfg.database, 1);
        assert_eq!(cfg.timeout, Some(Duration::from_millis(250)));
        assert_eq!(cfg.addr(6379), "host:123");
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::new();
        assert_eq!(cfg.addr(11211), "127.0.0.1:11211");
        assert_eq!(cfg.password(), None);
        assert_eq!(cfg.database, 0);
        assert_eq!(cfg.timeout, None);

        let cfg = Config::new().with_password("");
        assert_eq!(cfg.password(), None);
    }

    #[test]
    fn test_from_env_vars() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("CACHE_HOST", "cache.internal"),
            ("CACHE_PORT", "6380"),
            ("CACHE_PASSWORD", "s3cret"),
            ("CACHE_DATABASE", "2"),
            ("CACHE_TIMEOUT_MS", "1500"),
        ]));

        assert_eq!(
            cfg,
            Config::new()
                .with_host("cache.internal")
                .with_port(6380)
                .with_password("s3cret")
                .with_database(2)
                .with_timeout(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_from_env_ignores_invalid_numbers() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("CACHE_PORT", "not-a-port"),
            ("CACHE_DATABASE", "x"),
            ("CACHE_TIMEOUT_MS", "-5"),
        ]));

        assert_eq!(cfg.port, None);
        assert_eq!(cfg.database, 0);
        assert_eq!(cfg.timeout, None);
    }
}
