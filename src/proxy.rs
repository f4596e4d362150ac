//! HTTP proxy support.
//!
//! The proxy is read once from the environment at startup and then routes
//! every outbound request, both to the station service and to the track
//! stream hosts.
//!
//! # Example
//!
//! ```rust
//! use fmtuner::proxy::Http;
//!
//! // From environment
//! if let Some(proxy) = Http::from_env() {
//!     println!("using proxy {proxy}");
//! }
//!
//! // Manual configuration; the scheme may be left out.
//! let proxy: Http = "user:pass@proxy:8080".parse()?;
//! ```

use std::{env, fmt::Display, str::FromStr};

use url::Url;
use veil::Redact;

use crate::error::{Error, Result};

/// HTTP proxy configuration.
///
/// Credentials are redacted in debug output and never part of the
/// [`Display`] form.
#[derive(Redact, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Http {
    /// Proxy server address without credentials.
    ///
    /// Format: `schema://host:port`
    url: Url,

    /// User name for basic authentication; empty when not set.
    username: String,

    /// Password for basic authentication.
    #[redact]
    password: Option<String>,
}

impl Http {
    /// Environment variables checked for a proxy address, in order.
    const ENV_VARS: [&'static str; 2] = ["http_proxy", "HTTP_PROXY"];

    /// Creates proxy configuration from environment.
    ///
    /// An unparseable proxy address is logged and ignored so that requests
    /// go out directly instead.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let proxy = Self::ENV_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()))?;

        match proxy.parse() {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!("ignoring proxy {proxy}: {e}");
                None
            }
        }
    }

    /// Converts into a proxy for every scheme of a `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if `reqwest` rejects the proxy address.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let mut proxy = reqwest::Proxy::all(self.url.clone())?;
        if let Some(ref password) = self.password {
            proxy = proxy.basic_auth(&self.username, password);
        }

        Ok(proxy)
    }
}

/// Parses proxy configuration from URL string.
///
/// Format: `[http|https]://[user:pass@]host:port`. A bare `host:port` is
/// taken to be an HTTP proxy.
impl FromStr for Http {
    type Err = Error;

    fn from_str(proxy_str: &str) -> std::result::Result<Self, Self::Err> {
        let proxy_str = proxy_str.trim();
        let mut url = if proxy_str.contains("://") {
            Url::parse(proxy_str)?
        } else {
            Url::parse(&format!("http://{proxy_str}"))?
        };

        let scheme = url.scheme().to_owned();
        match scheme.as_str() {
            "http" | "https" => {
                if url.host_str().is_none() {
                    return Err(Error::invalid_argument(format!(
                        "proxy {proxy_str} has no host"
                    )));
                }

                let username = url.username().to_owned();
                let password = url.password().map(ToOwned::to_owned);

                // Keep credentials out of the address that gets logged.
                if url.set_username("").is_err() || url.set_password(None).is_err() {
                    return Err(Error::invalid_argument(format!(
                        "proxy {proxy_str} cannot carry credentials"
                    )));
                }

                Ok(Self {
                    url,
                    username,
                    password,
                })
            }

            _ => Err(Error::unimplemented(format!(
                "unsupported proxy schema {scheme}"
            ))),
        }
    }
}

/// Formats proxy as its address without credentials.
impl Display for Http {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
