//! Station service API.
//!
//! The [`Api`] trait is the seam between the playback engine and the
//! station service. [`Gateway`] implements it over HTTP:
//!
//! * Refills are GET requests with a query string
//! * Logins are `multipart/form-data` POST requests
//! * Channel listings are plain GET requests
//!
//! All responses are JSON. See the [`protocol`](crate::protocol) module for
//! the wire formats.

use async_trait::async_trait;
use reqwest::multipart;
use url::Url;

use crate::{
    config::{Config, Endpoints},
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        channel::{Channel, ChannelList, LoginChannels},
        playlist::{self, Response as PlaylistResponse},
        song::Track,
        user::{LoginResponse, User},
    },
    refill::Request,
};

/// Operations of the station service.
#[async_trait]
pub trait Api: Send {
    /// Asks for tracks to play after something happened to the current one.
    async fn playlist(&mut self, request: &Request) -> Result<Vec<Track>>;

    /// Fetches the public channel list.
    async fn channels(&mut self) -> Result<Vec<Channel>>;

    /// Exchanges credentials for a user token.
    async fn login(&mut self, email: &str, password: &str) -> Result<User>;

    /// Fetches favorite and recommended channels of a logged in user.
    async fn login_channels(&mut self, user: &User) -> Result<LoginChannels>;
}

pub struct Gateway {
    http_client: HttpClient,
    endpoints: Endpoints,
    app_name: String,
    app_version: String,
    kbps: u32,
}

impl Gateway {
    /// Value of the `from` parameter of refill requests.
    const FROM: &'static str = "mainsite";

    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            endpoints: config.endpoints.clone(),
            app_name: config.app_name.clone(),
            app_version: config.app_version.clone(),
            kbps: config.kbps,
        })
    }

    /// Builds the refill URL. Parameters are appended in a fixed order.
    fn playlist_url(&self, request: &Request) -> Url {
        let mut url = self.endpoints.playlist.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("app_name", &self.app_name)
                .append_pair("version", &self.app_version)
                .append_pair("kbps", &self.kbps.to_string())
                .append_pair("type", request.operation.code())
                .append_pair("channel", &request.channel)
                .append_pair("from", Self::FROM)
                .append_pair("pt", &request.elapsed.as_secs().to_string())
                .append_pair("sid", &request.track_id)
                .append_pair("r", &playlist::random_token());

            if let Some(ref user) = request.user {
                query
                    .append_pair("user_id", &user.user_id)
                    .append_pair("token", &user.token)
                    .append_pair("expire", &user.expire);
            }
        }
        url
    }
}

#[async_trait]
impl Api for Gateway {
    async fn playlist(&mut self, request: &Request) -> Result<Vec<Track>> {
        let url = self.playlist_url(request);
        let body = self.http_client.text(self.http_client.get(url)).await?;
        protocol::json::<PlaylistResponse>(&body, "playlist")?.into_result()
    }

    async fn channels(&mut self) -> Result<Vec<Channel>> {
        let url = self.endpoints.channels.clone();
        let body = self.http_client.text(self.http_client.get(url)).await?;
        protocol::json::<ChannelList>(&body, "channels").map(|list| list.channels)
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let form = multipart::Form::new()
            .text("app_name", self.app_name.clone())
            .text("version", self.app_version.clone())
            .text("email", email.to_owned())
            .text("password", password.to_owned());

        let request = self
            .http_client
            .post_form(self.endpoints.login.clone(), form)?;
        let body = self.http_client.text(request).await?;

        // The body carries the token, so only the redacted form is logged.
        let response: LoginResponse = serde_json::from_str(&body).inspect_err(|e| {
            error!("login: failed parsing response ({e})");
        })?;
        trace!("login: {:#?}", response.user);

        if response.r != 0 {
            return Err(Error::unauthenticated(format!(
                "login refused (r = {}): {}",
                response.r, response.err
            )));
        }
        if response.user.user_id.is_empty() {
            return Err(Error::unauthenticated("login response has no user id"));
        }

        Ok(response.user)
    }

    async fn login_channels(&mut self, user: &User) -> Result<LoginChannels> {
        let mut url = self.endpoints.login_channels.clone();
        url.query_pairs_mut().append_pair("uk", &user.user_id);

        let body = self.http_client.text(self.http_client.get(url)).await?;
        protocol::json(&body, "login channels")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::refill::Operation;

    fn gateway() -> Gateway {
        let mut config = Config::new();
        config.proxy = None;
        Gateway::new(&config).unwrap()
    }

    #[test]
    fn anonymous_playlist_url() {
        let request = Request {
            operation: Operation::Skip,
            channel: "61".to_owned(),
            track_id: "1395452".to_owned(),
            elapsed: Duration::from_millis(42_900),
            user: None,
        };
        let url = gateway().playlist_url(&request);
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(url.path(), "/j/app/radio/people");
        assert_eq!(get("type"), Some("s"));
        assert_eq!(get("channel"), Some("61"));
        assert_eq!(get("from"), Some("mainsite"));
        assert_eq!(get("pt"), Some("42"));
        assert_eq!(get("sid"), Some("1395452"));
        assert_eq!(get("app_name"), Some("radio_desktop_win"));
        assert_eq!(get("version"), Some("100"));
        assert_eq!(get("kbps"), Some("192"));
        assert_eq!(get("r").map(str::len), Some(10));
        assert_eq!(get("user_id"), None);
        assert_eq!(get("token"), None);
    }

    #[test]
    fn logged_in_playlist_url() {
        let request = Request {
            operation: Operation::New,
            channel: "0".to_owned(),
            track_id: Request::NO_TRACK.to_owned(),
            elapsed: Duration::ZERO,
            user: Some(User {
                user_id: "7".to_owned(),
                token: "abc".to_owned(),
                expire: "1400000000".to_owned(),
                ..User::default()
            }),
        };
        let url = gateway().playlist_url(&request);
        let query = url.query().unwrap();

        assert!(query.contains("user_id=7"));
        assert!(query.contains("token=abc"));
        assert!(query.contains("expire=1400000000"));
        assert!(query.contains("sid=0"));
    }
}
