use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::net;

pub const DEFAULT_SERVER_URL: &str = "https://api.blockhub.dev";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const DATABASE_FILE: &str = "bk.db";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Non-blank value of `key`, trimmed.
    pub(crate) fn non_empty(&self, key: &str) -> Option<&str> {
        self.var(key).map(str::trim).filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Settings of one client invocation.
#[derive(Debug, Clone)]
pub struct Config {
    server_url: Url,
    home: PathBuf,
    network: NetworkConfig,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub timeout: Duration,
    /// Explicit proxy for every scheme.
    pub proxy: Option<String>,
    /// Honor the standard `*_PROXY` variables.
    pub keep_proxies: bool,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is malformed or no home directory can
    /// be resolved.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let raw_url = snapshot
            .non_empty("BK_SERVER_URL")
            .unwrap_or(DEFAULT_SERVER_URL);
        let server_url = Url::parse(raw_url.trim_end_matches('/'))
            .with_context(|| format!("BK_SERVER_URL is not a valid URL: {raw_url}"))?;
        let home = match snapshot.non_empty("BK_HOME") {
            Some(path) => PathBuf::from(path),
            None => dirs_next::home_dir()
                .map(|home| home.join(".bk"))
                .ok_or_else(|| anyhow!("cannot resolve a home directory; set BK_HOME"))?,
        };
        let timeout = match snapshot.non_empty("BK_HTTP_TIMEOUT") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("BK_HTTP_TIMEOUT must be whole seconds, got {raw}"))?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_HTTP_TIMEOUT,
        };
        Ok(Self {
            server_url,
            home,
            network: NetworkConfig {
                timeout,
                proxy: snapshot.non_empty("BK_PROXY").map(ToOwned::to_owned),
                keep_proxies: net::keep_proxies(snapshot),
            },
        })
    }

    /// Configuration pointing at an explicit server and home, for embedding
    /// and tests.
    #[must_use]
    pub fn new(server_url: Url, home: PathBuf) -> Self {
        Self {
            server_url,
            home,
            network: NetworkConfig {
                timeout: DEFAULT_HTTP_TIMEOUT,
                proxy: None,
                keep_proxies: false,
            },
        }
    }

    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.home.join(DATABASE_FILE)
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_apply_without_overrides() -> Result<()> {
        let snapshot = EnvSnapshot::testing(&[("BK_HOME", "/tmp/bk-home")]);
        let config = Config::from_snapshot(&snapshot)?;
        assert_eq!(config.server_url().as_str(), "https://api.blockhub.dev/");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/bk-home/bk.db"));
        assert_eq!(config.network().timeout, DEFAULT_HTTP_TIMEOUT);
        assert!(config.network().proxy.is_none());
        assert!(!config.network().keep_proxies);
        Ok(())
    }

    #[test]
    fn overrides_are_read_from_the_snapshot() -> Result<()> {
        let snapshot = EnvSnapshot::testing(&[
            ("BK_SERVER_URL", "http://localhost:9000/"),
            ("BK_HOME", "/srv/bk"),
            ("BK_HTTP_TIMEOUT", "3"),
            ("BK_PROXY", "http://proxy.internal:3128"),
            ("BK_KEEP_PROXIES", "yes"),
        ]);
        let config = Config::from_snapshot(&snapshot)?;
        assert_eq!(config.server_url().as_str(), "http://localhost:9000/");
        assert_eq!(config.home(), Path::new("/srv/bk"));
        assert_eq!(config.network().timeout, Duration::from_secs(3));
        assert_eq!(
            config.network().proxy.as_deref(),
            Some("http://proxy.internal:3128")
        );
        assert!(config.network().keep_proxies);
        Ok(())
    }

    #[test]
    fn malformed_values_are_rejected() {
        let bad_url = EnvSnapshot::testing(&[("BK_SERVER_URL", "not a url"), ("BK_HOME", "/x")]);
        assert!(Config::from_snapshot(&bad_url).is_err());
        let bad_timeout =
            EnvSnapshot::testing(&[("BK_HTTP_TIMEOUT", "soon"), ("BK_HOME", "/x")]);
        assert!(Config::from_snapshot(&bad_timeout).is_err());
    }

    #[test]
    #[serial]
    fn from_env_reads_the_process_environment() -> Result<()> {
        let previous = env::var("BK_HOME").ok();
        env::set_var("BK_HOME", "/tmp/bk-from-env");
        let config = Config::from_env();
        match previous {
            Some(value) => env::set_var("BK_HOME", value),
            None => env::remove_var("BK_HOME"),
        }
        assert_eq!(config?.home(), Path::new("/tmp/bk-from-env"));
        Ok(())
    }
}
