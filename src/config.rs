use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::{error::Result, proxy};

/// Station service endpoints.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Endpoints {
    /// Refill requests.
    pub playlist: Url,
    /// Public channel list.
    pub channels: Url,
    /// Credential exchange.
    pub login: Url,
    /// Favorite and recommended channels of a logged in user.
    pub login_channels: Url,
}

impl Endpoints {
    const APP_HOST: &'static str = "https://www.douban.com";
    const EXPLORE_HOST: &'static str = "https://douban.fm";

    const PLAYLIST_PATH: &'static str = "/j/app/radio/people";
    const CHANNELS_PATH: &'static str = "/j/app/radio/channels";
    const LOGIN_PATH: &'static str = "/j/app/login";
    const LOGIN_CHANNELS_PATH: &'static str = "/j/explore/get_login_chls";

    /// Resolves every endpoint against one base URL, e.g. a local mirror or
    /// a test server.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` cannot be joined with the endpoint paths.
    pub fn with_base(base: &Url) -> Result<Self> {
        Ok(Self {
            playlist: base.join(Self::PLAYLIST_PATH)?,
            channels: base.join(Self::CHANNELS_PATH)?,
            login: base.join(Self::LOGIN_PATH)?,
            login_channels: base.join(Self::LOGIN_CHANNELS_PATH)?,
        })
    }

    /// Every endpoint, for seeding per-origin state like cookies.
    #[must_use]
    pub fn all(&self) -> [&Url; 4] {
        [
            &self.playlist,
            &self.channels,
            &self.login,
            &self.login_channels,
        ]
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let join = |host: &str, path: &str| {
            Url::parse(host)
                .and_then(|base| base.join(path))
                .expect("invalid built-in endpoint")
        };

        Self {
            playlist: join(Self::APP_HOST, Self::PLAYLIST_PATH),
            channels: join(Self::APP_HOST, Self::CHANNELS_PATH),
            login: join(Self::APP_HOST, Self::LOGIN_PATH),
            login_channels: join(Self::EXPLORE_HOST, Self::LOGIN_CHANNELS_PATH),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Config {
    /// Application name as the station service knows it.
    pub app_name: String,
    /// Application protocol version as the station service knows it.
    pub app_version: String,

    pub user_agent: String,

    pub endpoints: Endpoints,

    /// Requested stream bitrate in kbps.
    pub kbps: u32,

    /// Tracking cookie attached to every request.
    pub tracking_cookie: String,

    /// Timeout of a complete station service request, and of individual
    /// reads when streaming.
    pub request_timeout: Duration,

    pub proxy: Option<proxy::Http>,

    /// Per-user directory holding the log file.
    pub state_dir: PathBuf,
}

impl Config {
    const APP_NAME: &'static str = "radio_desktop_win";
    const APP_VERSION: &'static str = "100";
    const KBPS: u32 = 192;
    const TRACKING_COOKIE: &'static str = "bid=8UK9DSCWDws";
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    const LOG_FILE: &'static str = "log.txt";

    #[must_use]
    pub fn new() -> Self {
        let pkg_name = env!("CARGO_PKG_NAME");
        let pkg_version = env!("CARGO_PKG_VERSION");

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));
        let user_agent = format!("{pkg_name}/{pkg_version} (Rust; {os_name}/{os_version})");
        trace!("user agent: {user_agent}");

        let proxy = proxy::Http::from_env();
        if let Some(ref proxy) = proxy {
            debug!("proxy: {proxy}");
        }

        Self {
            app_name: Self::APP_NAME.to_owned(),
            app_version: Self::APP_VERSION.to_owned(),
            user_agent,
            endpoints: Endpoints::default(),
            kbps: Self::KBPS,
            tracking_cookie: Self::TRACKING_COOKIE.to_owned(),
            request_timeout: Self::REQUEST_TIMEOUT,
            proxy,
            state_dir: Self::default_state_dir(),
        }
    }

    /// `~/.fmtuner`, or a directory under the system temporary directory
    /// when there is no home directory.
    fn default_state_dir() -> PathBuf {
        let dir = concat!(".", env!("CARGO_PKG_NAME"));
        dirs::home_dir().map_or_else(|| env::temp_dir().join(dir), |home| home.join(dir))
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join(Self::LOG_FILE)
    }

    /// Creates the state directory if it does not exist yet.
    pub fn create_state_dir(&self) -> io::Result<&Path> {
        fs::create_dir_all(&self.state_dir)?;
        Ok(&self.state_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
