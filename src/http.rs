//! HTTP client with rate limiting and cookie management for the station
//! service.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting, so a user hammering keys does not flood the
//!   station service
//! * The tracking cookie on every request
//! * Consistent timeouts, user agent and proxy
//!
//! # Example
//!
//! ```rust
//! use fmtuner::http::Client;
//!
//! let client = Client::new(&config)?;
//! let request = client.get(url);
//! let body = client.text(request).await?;
//! ```

use std::{future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{cookie::Jar, multipart, Method, Url};

use crate::{config::Config, error::Result};

/// HTTP client with built-in rate limiting and cookie support.
pub struct Client {
    /// Unlimited request client for special cases.
    ///
    /// Direct access to underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    /// Rate limiter for station service requests.
    rate_limiter: DefaultDirectRateLimiter,

    /// Cookie storage, pre-seeded with the tracking cookie.
    pub cookie_jar: Arc<Jar>,
}

impl Client {
    /// Rolling window for the rate limit.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

    /// Maximum allowed calls per interval.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 10;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a client for station service requests. Every request is
    /// bounded by the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the proxy or the HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        Self::build(config, |builder| builder.timeout(config.request_timeout))
    }

    /// Creates a client for streaming track data. Downloads run for as long
    /// as a track lasts, so only individual reads are bounded by the
    /// configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the proxy or the HTTP client cannot be built.
    pub fn streaming(config: &Config) -> Result<Self> {
        Self::build(config, |builder| builder.read_timeout(config.request_timeout))
    }

    fn build<F>(config: &Config, timeouts: F) -> Result<Self>
    where
        F: FnOnce(reqwest::ClientBuilder) -> reqwest::ClientBuilder,
    {
        // Host-only cookies for every endpoint, so that the cookie follows
        // endpoints to whatever host they are configured on.
        let cookie_jar = Arc::new(Jar::default());
        for origin in config.endpoints.all() {
            cookie_jar.add_cookie_str(&format!("{}; Path=/", config.tracking_cookie), origin);
        }

        let mut http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .cookie_provider(Arc::clone(&cookie_jar))
            .user_agent(&config.user_agent);
        http_client = timeouts(http_client);

        if let Some(ref proxy) = config.proxy {
            http_client = http_client.proxy(proxy.to_reqwest()?);
        }

        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
            cookie_jar,
        })
    }

    /// Builds a request with specified method and URL.
    pub fn request(&self, method: Method, url: Url) -> reqwest::Request {
        reqwest::Request::new(method, url)
    }

    /// Builds a GET request.
    pub fn get(&self, url: Url) -> reqwest::Request {
        self.request(Method::GET, url)
    }

    /// Builds a POST request with a `multipart/form-data` body.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be built.
    pub fn post_form(&self, url: Url, form: multipart::Form) -> Result<reqwest::Request> {
        self.unlimited
            .post(url)
            .multipart(form)
            .build()
            .map_err(Into::into)
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails on the network level.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// Executes a request with rate limiting and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the server responds with a
    /// non-success status or the body cannot be read.
    pub async fn text(&self, request: reqwest::Request) -> Result<String> {
        let response = self.execute(request).await?.error_for_status()?;
        response.text().await.map_err(Into::into)
    }
}
