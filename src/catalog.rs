//! Channels to tune to.
//!
//! The catalog is fetched from the station service on first use. Until a
//! fetch succeeds with at least one channel, the personal channel is the
//! only entry. Channels are addressed by 1-based index.

use crate::{
    error::Result,
    gateway::Api,
    protocol::channel::{Channel, ChannelId},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    channels: Vec<Channel>,
    fetched: bool,
    /// Favorites and recommendations of the logged in user, merged again
    /// whenever the channel list is refreshed.
    login: Option<(Vec<Channel>, Vec<Channel>)>,
}

impl Catalog {
    const PERSONAL_ID: i64 = 0;
    const PERSONAL_NAME: &'static str = "Personal";

    const EXCLUSIVE_ID: i64 = -3;
    const EXCLUSIVE_NAME: &'static str = "Red Star MHz";

    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: vec![Self::personal()],
            fetched: false,
            login: None,
        }
    }

    /// The channel the catalog falls back on.
    #[must_use]
    pub fn personal() -> Channel {
        Channel::new(Self::PERSONAL_ID, Self::PERSONAL_NAME, "")
    }

    /// The channel only logged in users can listen to.
    #[must_use]
    pub fn exclusive() -> Channel {
        Channel::new(Self::EXCLUSIVE_ID, Self::EXCLUSIVE_NAME, "")
    }

    #[must_use]
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Fetches the channel list unless that succeeded before.
    ///
    /// # Errors
    ///
    /// Returns the error of the fetch. The catalog is left unchanged and the
    /// next call tries again.
    pub async fn ensure_fetched(&mut self, api: &mut dyn Api) -> Result<()> {
        if self.fetched {
            return Ok(());
        }
        self.refresh(api).await
    }

    /// Replaces the channel list with a fresh one. An empty list leaves the
    /// personal channel as the sole entry.
    ///
    /// # Errors
    ///
    /// Returns the error of the fetch. The catalog is left unchanged.
    pub async fn refresh(&mut self, api: &mut dyn Api) -> Result<()> {
        let channels = api.channels().await?;
        if channels.is_empty() {
            warn!("station service returned no channels");
            self.channels = vec![Self::personal()];
        } else {
            debug!("fetched {} channels", channels.len());
            self.channels = channels;
        }
        self.fetched = true;

        if let Some((favorites, recommendations)) = self.login.take() {
            self.merge_login(&favorites, &recommendations);
        }
        Ok(())
    }

    /// Channels, fetching them first if needed.
    ///
    /// A failed fetch is logged; the channels known so far are returned.
    pub async fn channels(&mut self, api: &mut dyn Api) -> &[Channel] {
        if let Err(e) = self.ensure_fetched(api).await {
            warn!("failed to fetch channels: {e}");
        }
        &self.channels
    }

    /// Channels known so far, without fetching.
    #[must_use]
    pub fn as_slice(&self) -> &[Channel] {
        &self.channels
    }

    /// The channel at a 1-based index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Channel> {
        index.checked_sub(1).and_then(|i| self.channels.get(i))
    }

    #[must_use]
    pub fn contains_index(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Normalized identifier of the channel at a 1-based index, or
    /// [`ChannelId::UNRESOLVED`] when there is no such channel.
    #[must_use]
    pub fn channel_id(&self, index: usize) -> String {
        self.get(index).map_or_else(
            || ChannelId::UNRESOLVED.to_owned(),
            |channel| channel.id.normalize(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Merges the channels of a freshly logged in user.
    ///
    /// The exclusive channel is prepended. Favorites and recommendations
    /// that are in the catalog already mark that entry as favorite; others
    /// are appended, with favorites flagged as such.
    ///
    /// Returns how many channels were prepended, so that indexes into the
    /// catalog taken before the merge can be shifted.
    pub fn merge_login(&mut self, favorites: &[Channel], recommendations: &[Channel]) -> usize {
        self.login = Some((favorites.to_vec(), recommendations.to_vec()));

        let exclusive = Self::exclusive();
        let prepended = if self.channels.iter().any(|c| c.id == exclusive.id) {
            0
        } else {
            self.channels.insert(0, exclusive);
            1
        };

        let candidates = favorites
            .iter()
            .map(|channel| (channel, true))
            .chain(recommendations.iter().map(|channel| (channel, false)));

        for (channel, favorite) in candidates {
            if let Some(known) = self.channels.iter_mut().find(|c| c.id == channel.id) {
                known.favorite = true;
            } else {
                let mut channel = channel.clone();
                channel.favorite = favorite;
                self.channels.push(channel);
            }
        }

        prepended
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
