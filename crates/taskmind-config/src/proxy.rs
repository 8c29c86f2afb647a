//! Network proxy settings for the browser transport.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Proxy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyScheme {
    Http,
    Https,
    Socks,
}

impl ProxyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks => "socks",
        }
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyScheme::Http),
            "https" => Ok(ProxyScheme::Https),
            "socks" | "socks5" | "socks5h" => Ok(ProxyScheme::Socks),
            other => Err(ConfigError::invalid(
                "proxy.scheme",
                format!("unsupported scheme '{}', expected http, https or socks", other),
            )),
        }
    }
}

/// Username/password pair presented to the proxy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Validated proxy configuration.
///
/// Built once from configuration and consumed by the transport at connect
/// time. Construction (including deserialization) rejects schemes outside
/// `http`/`https`/`socks` and ports outside `1..=65535`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProxyConfig", into = "RawProxyConfig")]
pub struct ProxyConfig {
    scheme: ProxyScheme,
    host: String,
    port: u16,
    credentials: Option<ProxyCredentials>,
}

impl ProxyConfig {
    /// Create a proxy configuration, checking every invariant.
    pub fn new(
        scheme: &str,
        host: impl Into<String>,
        port: i64,
        credentials: Option<ProxyCredentials>,
    ) -> Result<Self, ConfigError> {
        let scheme = scheme.parse::<ProxyScheme>()?;
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ConfigError::invalid("proxy.host", "host cannot be empty"));
        }
        if !(1..=65535).contains(&port) {
            return Err(ConfigError::invalid(
                "proxy.port",
                format!("port {} is outside 1..=65535", port),
            ));
        }
        if let Some(creds) = &credentials {
            if creds.username.is_empty() {
                return Err(ConfigError::invalid(
                    "proxy.username",
                    "username cannot be empty when credentials are given",
                ));
            }
        }

        Ok(Self {
            scheme,
            host,
            port: port as u16,
            credentials,
        })
    }

    pub fn scheme(&self) -> ProxyScheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&ProxyCredentials> {
        self.credentials.as_ref()
    }

    /// Proxy URL without credentials, in the form HTTP clients expect.
    pub fn url(&self) -> String {
        let scheme = match self.scheme {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks => "socks5h",
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// `host:port` of the proxy itself.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Serialize, Deserialize)]
struct RawProxyConfig {
    scheme: String,
    host: String,
    port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl TryFrom<RawProxyConfig> for ProxyConfig {
    type Error = ConfigError;

    fn try_from(raw: RawProxyConfig) -> Result<Self, Self::Error> {
        let credentials = match (raw.username, raw.password) {
            (Some(username), password) => Some(ProxyCredentials {
                username,
                password: password.unwrap_or_default(),
            }),
            (None, Some(_)) => {
                return Err(ConfigError::MissingField("proxy.username".to_string()));
            }
            (None, None) => None,
        };
        ProxyConfig::new(&raw.scheme, raw.host, raw.port, credentials)
    }
}

impl From<ProxyConfig> for RawProxyConfig {
    fn from(config: ProxyConfig) -> Self {
        let (username, password) = match config.credentials {
            Some(c) => (Some(c.username), Some(c.password)),
            None => (None, None),
        };
        Self {
            scheme: config.scheme.as_str().to_string(),
            host: config.host,
            port: config.port as i64,
            username,
            password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_schemes() {
        for scheme in ["http", "https", "socks", "SOCKS5"] {
            assert!(ProxyConfig::new(scheme, "proxy.local", 8080, None).is_ok(), "{}", scheme);
        }
    }

    #[test]
    fn test_rejects_disallowed_schemes() {
        for scheme in ["ftp", "", "ws", "socks4"] {
            let err = ProxyConfig::new(scheme, "proxy.local", 8080, None).unwrap_err();
            assert!(err.to_string().contains("proxy.scheme"), "{}", scheme);
        }
    }

    #[test]
    fn test_rejects_ports_outside_range() {
        for port in [0, -1, 65536, 100_000] {
            let err = ProxyConfig::new("http", "proxy.local", port, None).unwrap_err();
            assert!(err.to_string().contains("proxy.port"), "{}", port);
        }
        assert!(ProxyConfig::new("http", "proxy.local", 1, None).is_ok());
        assert!(ProxyConfig::new("http", "proxy.local", 65535, None).is_ok());
    }

    #[test]
    fn test_rejects_empty_host() {
        assert!(ProxyConfig::new("http", "  ", 8080, None).is_err());
    }

    #[test]
    fn test_url_for_socks_uses_remote_dns() {
        let proxy = ProxyConfig::new("socks", "10.0.0.1", 1080, None).unwrap();
        assert_eq!(proxy.url(), "socks5h://10.0.0.1:1080");
        assert_eq!(proxy.address(), "10.0.0.1:1080");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<ProxyConfig, _> = toml::from_str(
            r#"
            scheme = "http"
            host = "corp-proxy"
            port = 3128
            username = "alice"
            password = "secret"
            "#,
        );
        let proxy = ok.unwrap();
        assert_eq!(proxy.credentials().unwrap().username, "alice");

        let bad: Result<ProxyConfig, _> = toml::from_str(
            r#"
            scheme = "gopher"
            host = "corp-proxy"
            port = 3128
            "#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = ProxyCredentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
    }
}
