use reqwest::blocking::Client;
use reqwest::Proxy;

use crate::config::{EnvSnapshot, NetworkConfig};
use crate::error::{ApiError, ErrorKind};

const USER_AGENT: &str = concat!("bk/", env!("CARGO_PKG_VERSION"));

const PROXY_VARS: [&str; 4] = ["HTTP_PROXY", "HTTPS_PROXY", "ALL_PROXY", "NO_PROXY"];

/// Whether the registry client may pick up the system proxy settings.
///
/// `BK_KEEP_PROXIES` wins when present (empty or a false-ish word disables
/// it); otherwise any proxy variable in either case turns them on.
pub(crate) fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    if let Some(raw) = snapshot.var("BK_KEEP_PROXIES") {
        let value = raw.trim().to_ascii_lowercase();
        return !matches!(value.as_str(), "" | "0" | "false" | "no" | "off");
    }
    PROXY_VARS.iter().any(|name| {
        snapshot.non_empty(name).is_some()
            || snapshot.non_empty(&name.to_ascii_lowercase()).is_some()
    })
}

/// Blocking HTTP client honoring the configured timeout and proxy policy.
pub(crate) fn build_http_client(network: &NetworkConfig) -> Result<Client, ApiError> {
    let builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(network.timeout);
    let builder = match &network.proxy {
        Some(url) => {
            let proxy = Proxy::all(url.as_str()).map_err(|err| {
                ApiError::new(ErrorKind::InvalidUrl, format!("invalid proxy {url}: {err}"))
            })?;
            builder.proxy(proxy)
        }
        None if network.keep_proxies => builder,
        None => builder.no_proxy(),
    };
    builder.build().map_err(|err| {
        ApiError::new(
            ErrorKind::Service,
            format!("failed to build HTTP client: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HTTP_TIMEOUT;

    #[test]
    fn system_proxies_follow_the_environment() {
        let lower = EnvSnapshot::testing(&[("https_proxy", "http://proxy.maya.test")]);
        assert!(keep_proxies(&lower));
        let blank = EnvSnapshot::testing(&[("HTTPS_PROXY", "  ")]);
        assert!(!keep_proxies(&blank));
    }

    #[test]
    fn explicit_switch_overrides_proxy_variables() {
        let forced_on = EnvSnapshot::testing(&[("BK_KEEP_PROXIES", "on")]);
        assert!(keep_proxies(&forced_on));
        let forced_off = EnvSnapshot::testing(&[
            ("BK_KEEP_PROXIES", "0"),
            ("HTTP_PROXY", "http://proxy.maya.test"),
        ]);
        assert!(!keep_proxies(&forced_off));
    }

    #[test]
    fn invalid_proxy_is_reported_as_invalid_url() {
        let network = NetworkConfig {
            timeout: DEFAULT_HTTP_TIMEOUT,
            proxy: Some("::not a proxy::".into()),
            keep_proxies: false,
        };
        let err = build_http_client(&network).expect_err("proxy must be rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }
}
