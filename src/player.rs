//! Playback engine.
//!
//! The [`Player`] owns the session, the channel catalog, the queue and the
//! audio output. It runs as a single task that takes one [`Message`] at a
//! time from a [mailbox](crate::mailbox) and processes it to completion
//! before taking the next. Nothing else mutates playback state.
//!
//! # Messages
//!
//! | Command          | Effect                                                        |
//! |------------------|---------------------------------------------------------------|
//! | `Stop`           | stop output, pause                                            |
//! | `PlayPause`      | toggle pause, reloading the current track after a stop        |
//! | `Next`           | play the next queued track                                    |
//! | `ToggleLoop`     | toggle replaying the current track when it ends               |
//! | `Skip`, `Trash`  | report to the station service, then play the next track       |
//! | `Like`, `Unlike` | report to the station service, then rate the current track    |
//! | `Tune(n)`        | switch to channel `n` and play its first track                |
//! | `Login`          | log in and merge the user's channels into the catalog          |
//!
//! Audio output events arrive through the same mailbox. An end of stream
//! moves on to the next track (or replays the current one when looping);
//! an error stops playback. Events of a load other than the latest one are
//! dropped: a track may drain while a command is loading its successor.
//!
//! Whenever playing a track leaves the queue empty, the engine asks the
//! station service for more.
//!
//! # Failures
//!
//! Failures never escape the engine. They are logged, kept as the last
//! error in the published [`Status`], and leave state as it was.

use std::fmt;

use tokio::{sync::watch, task::JoinHandle};
use url::Url;

use crate::{
    audio::AudioEngine,
    catalog::Catalog,
    error::Error,
    events::{Event, Generation},
    gateway::Api,
    mailbox::Receiver,
    protocol::{channel::Channel, song::Track},
    queue::Queue,
    refill::{self, Operation, Request},
    secrets::Credentials,
    session::Session,
    util::Stopwatch,
};

/// User commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Stop,
    PlayPause,
    Next,
    ToggleLoop,
    Skip,
    Like,
    Unlike,
    Trash,
    /// Switch to the channel at a 1-based catalog index.
    Tune(usize),
    Login(Credentials),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::PlayPause => write!(f, "play/pause"),
            Self::Next => write!(f, "next"),
            Self::ToggleLoop => write!(f, "toggle loop"),
            Self::Skip => write!(f, "skip"),
            Self::Like => write!(f, "like"),
            Self::Unlike => write!(f, "unlike"),
            Self::Trash => write!(f, "trash"),
            Self::Tune(index) => write!(f, "tune to channel {index}"),
            Self::Login(credentials) => write!(f, "login as {}", credentials.email),
        }
    }
}

/// Everything the engine takes from its mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Command(Command),
    Event(Event),
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// Snapshot of the engine, published after every message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Status {
    /// 1-based index of the current channel.
    pub channel: usize,
    pub channels: Vec<Channel>,
    pub now_playing: Option<Track>,
    /// Tracks lined up after the one playing now.
    pub queue: Vec<Track>,
    pub paused: bool,
    pub looping: bool,
    /// Name of the logged in user.
    pub user: Option<String>,
    pub last_error: Option<String>,
}

impl Status {
    /// The current channel.
    #[must_use]
    pub fn current_channel(&self) -> Option<&Channel> {
        self.channel.checked_sub(1).and_then(|i| self.channels.get(i))
    }
}

pub struct Player {
    api: Box<dyn Api>,
    audio: Box<dyn AudioEngine>,

    session: Session,
    catalog: Catalog,
    queue: Queue,

    /// 1-based index into the catalog.
    channel: usize,
    paused: bool,
    looping: bool,

    /// Number of the latest load handed to the audio output.
    generation: Generation,
    /// Whether the output holds the track of `generation`.
    loaded: bool,

    /// Playing time of the current track.
    stopwatch: Stopwatch,
    last_error: Option<String>,

    status: watch::Sender<Status>,
}

impl Player {
    /// Catalog index of the channel until tuned elsewhere.
    const DEFAULT_CHANNEL: usize = 1;

    #[must_use]
    pub fn new(api: Box<dyn Api>, audio: Box<dyn AudioEngine>) -> Self {
        let (status, _) = watch::channel(Status::default());
        let player = Self {
            api,
            audio,
            session: Session::new(),
            catalog: Catalog::new(),
            queue: Queue::new(),
            channel: Self::DEFAULT_CHANNEL,
            paused: true,
            looping: false,
            generation: 0,
            loaded: false,
            stopwatch: Stopwatch::default(),
            last_error: None,
            status,
        };
        player.publish();
        player
    }

    /// Receives a [`Status`] after every processed message.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Runs the engine on its own task.
    pub fn spawn(self, mailbox: Receiver<Message>) -> JoinHandle<()> {
        tokio::spawn(self.run(mailbox))
    }

    /// Processes messages until every sender of the mailbox is gone.
    pub async fn run(mut self, mut mailbox: Receiver<Message>) {
        debug!("playback engine started");
        while let Some(message) = mailbox.recv().await {
            self.handle(message).await;
        }
        if let Err(e) = self.audio.stop() {
            warn!("failed to stop audio output: {e}");
        }
        debug!("playback engine stopped");
    }

    /// Processes a single message to completion and publishes the new
    /// status.
    pub async fn handle(&mut self, message: Message) {
        trace!("handling {message:?}");
        match message {
            Message::Command(command) => self.handle_command(command).await,
            Message::Event(event) => self.handle_event(event).await,
        }
        self.publish();
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("command: {command}");
        match command {
            Command::Stop => self.halt(),

            Command::PlayPause if self.paused && !self.loaded => {
                debug!("nothing loaded, restarting current track");
                self.load_and_play().await;
            }

            Command::PlayPause => {
                let result = if self.paused {
                    self.audio.play()
                } else {
                    self.audio.pause()
                };
                match result {
                    Ok(()) => {
                        self.paused = !self.paused;
                        if self.paused {
                            self.stopwatch.pause();
                        } else {
                            self.stopwatch.resume();
                        }
                    }
                    Err(e) => self.fail("failed to toggle playback", &e),
                }
            }

            Command::Next => self.advance().await,

            Command::ToggleLoop => {
                self.looping = !self.looping;
                info!("looping {}", if self.looping { "on" } else { "off" });
            }

            Command::Skip => {
                self.refill(Operation::Skip).await;
                self.advance().await;
            }

            Command::Trash => {
                self.refill(Operation::Trash).await;
                self.advance().await;
            }

            Command::Like => self.rate(true).await,
            Command::Unlike => self.rate(false).await,

            Command::Tune(index) => self.tune(index).await,

            Command::Login(credentials) => self.login(&credentials).await,
        }
    }

    async fn handle_event(&mut self, event: Event) {
        if !self.loaded || event.generation() != self.generation {
            debug!("dropping stale {event:?}");
            return;
        }

        match event {
            Event::EndOfStream(_) => {
                if self.looping {
                    debug!("replaying current track");
                    self.load_and_play().await;
                } else {
                    self.refill(Operation::End).await;
                    self.advance().await;
                }
            }

            Event::Error(_, e) => {
                let e = Error::data_loss(e);
                self.fail("audio output failed", &e);
                self.halt();
            }
        }
    }

    /// Stops output and pauses.
    fn halt(&mut self) {
        if let Err(e) = self.audio.stop() {
            self.fail("failed to stop audio output", &e);
        }
        self.loaded = false;
        self.paused = true;
        self.stopwatch.pause();
    }

    /// Plays the next queued track, asking the station service for more if
    /// that empties the queue. Loads at most one track.
    async fn advance(&mut self) {
        if self.queue.dequeue_next().is_some() {
            self.load_and_play().await;
            if self.queue.is_empty() {
                self.refill(Operation::LastNeedsMore).await;
            }
        } else {
            debug!("nothing queued");
            let received = self.refill(Operation::LastNeedsMore).await;
            if received.is_some_and(|count| count > 0) && self.queue.dequeue_next().is_some() {
                self.load_and_play().await;
            }
        }
    }

    /// Hands the track playing now to the audio output.
    async fn load_and_play(&mut self) {
        let Some(track) = self.queue.now_playing() else {
            debug!("no track to play");
            return;
        };
        let title = track.to_string();
        let url = Url::parse(&track.url);

        self.generation += 1;
        let result = match url {
            Ok(url) => self.audio.load_and_play(&url, self.generation).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => {
                info!("playing {title}");
                self.loaded = true;
                self.paused = false;
                self.stopwatch.start();
            }
            Err(e) => {
                self.fail(&format!("failed to play {title}"), &e);
                self.halt();
            }
        }
    }

    /// Asks the station service for tracks and merges them into the queue.
    ///
    /// Returns the number of tracks received, or `None` if the refill
    /// failed.
    async fn refill(&mut self, operation: Operation) -> Option<usize> {
        if let Err(e) = self.catalog.ensure_fetched(self.api.as_mut()).await {
            self.fail("failed to fetch channels", &e);
        }

        let request = Request {
            operation,
            channel: self.catalog.channel_id(self.channel),
            track_id: self
                .queue
                .now_playing()
                .map_or_else(|| Request::NO_TRACK.to_owned(), |track| track.id.clone()),
            elapsed: self.stopwatch.elapsed(),
            user: self.session.user().cloned(),
        };

        match refill::refill(self.api.as_mut(), &mut self.queue, &request).await {
            Ok(count) => Some(count),
            Err(e) => {
                self.fail(&format!("refill ({operation}) failed"), &e);
                None
            }
        }
    }

    async fn rate(&mut self, liked: bool) {
        let operation = if liked {
            Operation::Like
        } else {
            Operation::Unlike
        };
        if self.refill(operation).await.is_some() && !self.queue.set_liked(liked) {
            debug!("rated without a track playing");
        }
    }

    async fn tune(&mut self, index: usize) {
        let known = self.catalog.channels(self.api.as_mut()).await.len();
        trace!("{known} channels known");

        let Some(channel) = self.catalog.get(index) else {
            warn!("ignoring tune to channel {index}: no such channel");
            return;
        };
        info!("tuning to {}", channel.name);

        self.channel = index;
        self.refill(Operation::New).await;
        self.advance().await;
    }

    async fn login(&mut self, credentials: &Credentials) {
        if let Some(user) = self.session.user() {
            info!("already logged in as {} ({})", user.name, user.user_id);
            return;
        }

        let result = self
            .session
            .login(self.api.as_mut(), &credentials.email, &credentials.password)
            .await
            .cloned();
        let user = match result {
            Ok(user) => user,
            Err(e) => {
                self.fail("login failed", &e);
                return;
            }
        };

        // Merge into the public list, not into a list that a later fetch
        // would replace.
        if let Err(e) = self.catalog.ensure_fetched(self.api.as_mut()).await {
            self.fail("failed to fetch channels", &e);
        }

        let prepended = match self.api.login_channels(&user).await {
            Ok(channels) => self
                .catalog
                .merge_login(channels.favorites(), channels.recommendations()),
            Err(e) => {
                self.fail("failed to fetch channels of user", &e);
                self.catalog.merge_login(&[], &[])
            }
        };
        self.channel += prepended;
    }

    /// Logs a failure and keeps it for the status.
    fn fail(&mut self, context: &str, e: &Error) {
        error!("{context}: {e}");
        self.last_error = Some(format!("{context}: {e}"));
    }

    fn publish(&self) {
        self.status.send_replace(Status {
            channel: self.channel,
            channels: self.catalog.as_slice().to_vec(),
            now_playing: self.queue.now_playing().cloned(),
            queue: self.queue.pending().cloned().collect(),
            paused: self.paused,
            looping: self.looping,
            user: self.session.user().map(|user| user.name.clone()),
            last_error: self.last_error.clone(),
        });
    }

    #[must_use]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn channel(&self) -> usize {
        self.channel
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::Result,
        mailbox::{mailbox, SubmitError},
        protocol::{channel::LoginChannels, user::User},
    };

    /// Replies of the station service, and the refill requests it saw.
    #[derive(Default)]
    struct Script {
        channels: Vec<Channel>,
        playlists: VecDeque<Result<Vec<Track>>>,
        login: Option<Result<User>>,
        login_channels: LoginChannels,
        requests: Vec<Request>,
    }

    #[derive(Clone, Default)]
    struct MockApi(Arc<Mutex<Script>>);

    impl MockApi {
        fn with_channels(channels: Vec<Channel>) -> Self {
            let api = Self::default();
            api.0.lock().unwrap().channels = channels;
            api
        }

        fn reply(&self, reply: Result<Vec<Track>>) {
            self.0.lock().unwrap().playlists.push_back(reply);
        }

        fn requests(&self) -> Vec<Request> {
            self.0.lock().unwrap().requests.clone()
        }
    }

    #[async_trait]
    impl Api for MockApi {
        async fn playlist(&mut self, request: &Request) -> Result<Vec<Track>> {
            let mut script = self.0.lock().unwrap();
            script.requests.push(request.clone());
            script.playlists.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn channels(&mut self) -> Result<Vec<Channel>> {
            Ok(self.0.lock().unwrap().channels.clone())
        }

        async fn login(&mut self, _email: &str, _password: &str) -> Result<User> {
            self.0
                .lock()
                .unwrap()
                .login
                .take()
                .unwrap_or_else(|| Err(Error::unauthenticated("no login scripted")))
        }

        async fn login_channels(&mut self, _user: &User) -> Result<LoginChannels> {
            Ok(self.0.lock().unwrap().login_channels.clone())
        }
    }

    /// Records what the engine told the audio output.
    #[derive(Clone, Default)]
    struct MockAudio {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl MockAudio {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn loads(&self) -> Vec<String> {
            self.log()
                .into_iter()
                .filter(|entry| entry.starts_with("load "))
                .collect()
        }
    }

    #[async_trait]
    impl AudioEngine for MockAudio {
        fn play(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("play".to_owned());
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("pause".to_owned());
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("stop".to_owned());
            Ok(())
        }

        async fn load_and_play(&mut self, url: &Url, _generation: Generation) -> Result<()> {
            self.log.lock().unwrap().push(format!("load {url}"));
            Ok(())
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_owned(),
            title: format!("Track {id}"),
            url: format!("https://mr.example/{id}.mp3"),
            ..Track::default()
        }
    }

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| track(id)).collect()
    }

    fn channels() -> Vec<Channel> {
        vec![
            Channel::new(0, "Personal", ""),
            Channel::new("61", "New", ""),
            Channel::new(1, "Chinese", ""),
        ]
    }

    fn player() -> (Player, MockApi, MockAudio) {
        let api = MockApi::with_channels(channels());
        let audio = MockAudio::default();
        let player = Player::new(Box::new(api.clone()), Box::new(audio.clone()));
        (player, api, audio)
    }

    fn now_playing(player: &Player) -> Option<&str> {
        player.queue().now_playing().map(|track| track.id.as_str())
    }

    fn end_of_stream(player: &Player) -> Message {
        Event::EndOfStream(player.generation).into()
    }

    async fn tuned(ids: &[&str]) -> (Player, MockApi, MockAudio) {
        let (mut player, api, audio) = player();
        api.reply(Ok(tracks(ids)));
        player.handle(Command::Tune(2).into()).await;
        (player, api, audio)
    }

    #[tokio::test]
    async fn starts_paused_on_the_default_channel() {
        let (player, _, _) = player();
        assert!(player.is_paused());
        assert_eq!(player.channel(), 1);
        assert!(player.queue().is_empty());
        assert_eq!(player.subscribe().borrow().channel, 1);
    }

    #[tokio::test]
    async fn tune_refills_and_plays_the_first_track() {
        let (player, api, audio) = tuned(&["1", "2", "3"]).await;

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].operation, Operation::New);
        assert_eq!(requests[0].channel, "61");
        assert_eq!(requests[0].track_id, Request::NO_TRACK);
        assert_eq!(requests[0].user, None);

        assert_eq!(now_playing(&player), Some("1"));
        assert_eq!(player.queue().len(), 2);
        assert_eq!(audio.loads(), ["load https://mr.example/1.mp3"]);
        assert!(!player.is_paused());
        assert_eq!(player.channel(), 2);
    }

    #[tokio::test]
    async fn tune_out_of_range_is_ignored() {
        let (mut player, api, audio) = player();
        player.handle(Command::Tune(0).into()).await;
        player.handle(Command::Tune(4).into()).await;

        assert!(api.requests().is_empty());
        assert!(audio.log().is_empty());
        assert_eq!(player.channel(), 1);
        assert_eq!(player.last_error(), None);
    }

    #[tokio::test]
    async fn empty_channel_list_keeps_the_personal_channel() {
        let api = MockApi::default();
        let mut player = Player::new(Box::new(api.clone()), Box::new(MockAudio::default()));

        player.handle(Command::Tune(2).into()).await;
        assert!(api.requests().is_empty());
        assert_eq!(player.catalog().len(), 1);

        player.handle(Command::Tune(1).into()).await;
        assert_eq!(api.requests()[0].channel, "0");
    }

    #[tokio::test]
    async fn next_on_last_track_asks_for_more() {
        let (mut player, api, audio) = tuned(&["1", "2"]).await;
        api.reply(Ok(tracks(&["3", "4"])));

        player.handle(Command::Next.into()).await;

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].operation, Operation::LastNeedsMore);
        assert_eq!(requests[1].track_id, "2");

        let playlist: Vec<_> = player.queue().playlist().map(|t| t.id.as_str()).collect();
        assert_eq!(playlist, ["2", "3", "4"]);
        assert_eq!(player.queue().len(), 2);
        assert_eq!(audio.loads().len(), 2);
    }

    #[tokio::test]
    async fn next_with_nothing_queued_plays_the_refill() {
        let (mut player, api, audio) = player();
        api.reply(Ok(tracks(&["1"])));

        player.handle(Command::Next.into()).await;

        assert_eq!(now_playing(&player), Some("1"));
        assert_eq!(audio.loads(), ["load https://mr.example/1.mp3"]);
        assert_eq!(api.requests()[0].operation, Operation::LastNeedsMore);
    }

    #[tokio::test]
    async fn skip_replaces_the_queue() {
        let (mut player, api, _) = tuned(&["1", "2", "3"]).await;
        api.reply(Ok(tracks(&["a", "b"])));

        player.handle(Command::Skip.into()).await;

        assert_eq!(api.requests()[1].operation, Operation::Skip);
        assert_eq!(api.requests()[1].track_id, "1");
        assert_eq!(now_playing(&player), Some("a"));
        assert_eq!(player.queue().pending().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["b"]);
    }

    #[tokio::test]
    async fn failed_refill_keeps_the_queue() {
        let (mut player, api, _) = tuned(&["1", "2", "3"]).await;
        api.reply(Err(Error::unavailable("network down")));

        player.handle(Command::Trash.into()).await;

        assert_eq!(now_playing(&player), Some("2"));
        assert_eq!(player.queue().len(), 1);
        assert!(player.last_error().unwrap().contains("network down"));
    }

    #[tokio::test]
    async fn like_keeps_now_playing_first() {
        let (mut player, api, _) = tuned(&["1", "2"]).await;
        api.reply(Ok(tracks(&["3"])));

        player.handle(Command::Like.into()).await;

        assert_eq!(api.requests()[1].operation, Operation::Like);
        let playlist: Vec<_> = player.queue().playlist().map(|t| t.id.as_str()).collect();
        assert_eq!(playlist, ["1", "2", "3"]);
        assert_eq!(player.queue().now_playing().unwrap().liked, Some(true));

        player.handle(Command::Unlike.into()).await;
        assert_eq!(player.queue().now_playing().unwrap().liked, Some(false));
    }

    #[tokio::test]
    async fn failed_like_leaves_the_rating() {
        let (mut player, api, _) = tuned(&["1", "2"]).await;
        api.reply(Err(Error::deadline_exceeded("timed out")));

        player.handle(Command::Like.into()).await;

        let requests = api.requests();
        assert_eq!(requests[1].operation, Operation::Like);
        assert_eq!(requests[1].user, None);
        assert_eq!(player.queue().now_playing().unwrap().liked, None);
        assert!(player.last_error().is_some());
    }

    #[tokio::test]
    async fn audio_error_stops_without_advancing() {
        let (mut player, api, audio) = tuned(&["1", "2", "3"]).await;
        let queue = player.queue().clone();

        player
            .handle(Event::Error(player.generation, "decoder gave up".to_owned()).into())
            .await;

        assert!(player.is_paused());
        assert_eq!(player.queue(), &queue);
        assert_eq!(audio.log().last().map(String::as_str), Some("stop"));
        assert_eq!(api.requests().len(), 1);
        assert!(player.last_error().unwrap().contains("decoder gave up"));
    }

    #[tokio::test]
    async fn end_of_stream_reports_and_advances() {
        let (mut player, api, audio) = tuned(&["1", "2", "3"]).await;
        api.reply(Ok(Vec::new()));

        player.handle(end_of_stream(&player)).await;

        assert_eq!(api.requests()[1].operation, Operation::End);
        assert_eq!(now_playing(&player), Some("2"));
        assert_eq!(audio.loads().len(), 2);
    }

    #[tokio::test]
    async fn end_of_last_track_asks_for_more() {
        let (mut player, api, _) = tuned(&["1", "2"]).await;
        api.reply(Ok(Vec::new()));
        api.reply(Ok(tracks(&["3", "4"])));

        player.handle(end_of_stream(&player)).await;

        let operations: Vec<_> = api.requests().iter().map(|r| r.operation).collect();
        assert_eq!(
            operations,
            [Operation::New, Operation::End, Operation::LastNeedsMore]
        );
        assert_eq!(now_playing(&player), Some("2"));
        let playlist: Vec<_> = player.queue().playlist().map(|t| t.id.as_str()).collect();
        assert_eq!(playlist, ["2", "3", "4"]);
    }

    #[tokio::test]
    async fn end_of_a_replaced_track_is_dropped() {
        let (mut player, api, audio) = tuned(&["1", "2", "3"]).await;
        let drained = end_of_stream(&player);
        api.reply(Ok(tracks(&["a", "b"])));

        player.handle(Command::Skip.into()).await;
        player.handle(drained).await;

        assert_eq!(now_playing(&player), Some("a"));
        let operations: Vec<_> = api.requests().iter().map(|r| r.operation).collect();
        assert_eq!(operations, [Operation::New, Operation::Skip]);
        assert_eq!(audio.loads().len(), 2);
        assert!(!player.is_paused());
    }

    #[tokio::test]
    async fn end_of_stream_after_stop_is_dropped() {
        let (mut player, api, audio) = tuned(&["1", "2"]).await;
        let drained = end_of_stream(&player);

        player.handle(Command::Stop.into()).await;
        player.handle(drained).await;

        assert_eq!(now_playing(&player), Some("1"));
        assert_eq!(api.requests().len(), 1);
        assert_eq!(audio.loads().len(), 1);
    }

    #[tokio::test]
    async fn looping_replays_the_track() {
        let (mut player, api, audio) = tuned(&["1", "2"]).await;

        player.handle(Command::ToggleLoop.into()).await;
        assert!(player.is_looping());
        player.handle(end_of_stream(&player)).await;

        assert_eq!(api.requests().len(), 1);
        assert_eq!(now_playing(&player), Some("1"));
        assert_eq!(
            audio.loads(),
            ["load https://mr.example/1.mp3", "load https://mr.example/1.mp3"]
        );
    }

    #[tokio::test]
    async fn play_pause_toggles() {
        let (mut player, _, audio) = tuned(&["1", "2"]).await;

        player.handle(Command::PlayPause.into()).await;
        assert!(player.is_paused());
        player.handle(Command::PlayPause.into()).await;
        assert!(!player.is_paused());
        player.handle(Command::Stop.into()).await;
        assert!(player.is_paused());

        assert_eq!(audio.log()[1..], ["pause", "play", "stop"]);
    }

    #[tokio::test]
    async fn play_after_stop_reloads_the_track() {
        let (mut player, _, audio) = tuned(&["1", "2"]).await;

        player.handle(Command::Stop.into()).await;
        player.handle(Command::PlayPause.into()).await;

        assert!(!player.is_paused());
        assert_eq!(
            audio.log(),
            [
                "load https://mr.example/1.mp3",
                "stop",
                "load https://mr.example/1.mp3"
            ]
        );
        assert_eq!(now_playing(&player), Some("1"));
    }

    #[tokio::test]
    async fn play_after_audio_error_retries_the_track() {
        let (mut player, _, audio) = tuned(&["1", "2"]).await;

        player
            .handle(Event::Error(player.generation, "device lost".to_owned()).into())
            .await;
        player.handle(Command::PlayPause.into()).await;

        assert!(!player.is_paused());
        assert_eq!(audio.loads().len(), 2);
    }

    #[tokio::test]
    async fn play_with_nothing_to_play_stays_paused() {
        let (mut player, _, audio) = player();

        player.handle(Command::PlayPause.into()).await;

        assert!(player.is_paused());
        assert!(audio.log().is_empty());
    }

    #[tokio::test]
    async fn login_merges_channels() {
        let (mut player, api, _) = player();
        {
            let mut script = api.0.lock().unwrap();
            script.login = Some(Ok(User {
                user_id: "7".to_owned(),
                name: "listener".to_owned(),
                token: "abc".to_owned(),
                ..User::default()
            }));
            script.login_channels = LoginChannels::new(
                vec![Channel::new(61, "New", ""), Channel::new(153, "Fav", "")],
                vec![Channel::new("76", "Rec", "")],
            );
        }
        api.reply(Ok(tracks(&["1"])));
        player.handle(Command::Tune(2).into()).await;

        player
            .handle(Command::Login(Credentials::new("me@example.com", "secret")).into())
            .await;

        assert!(player.session().user().is_some());
        assert_eq!(player.channel(), 3);
        let catalog: Vec<_> = player
            .catalog()
            .as_slice()
            .iter()
            .map(|c| (c.id.normalize(), c.favorite))
            .collect();
        assert_eq!(
            catalog,
            [
                ("-3".to_owned(), false),
                ("0".to_owned(), false),
                ("61".to_owned(), true),
                ("1".to_owned(), false),
                ("153".to_owned(), true),
                ("76".to_owned(), false),
            ]
        );

        player.handle(Command::Skip.into()).await;
        let request = api.requests().pop().unwrap();
        assert_eq!(request.channel, "61");
        assert_eq!(request.user.map(|user| user.user_id), Some("7".to_owned()));
        assert_eq!(
            player.subscribe().borrow().user.as_deref(),
            Some("listener")
        );
    }

    #[tokio::test]
    async fn failed_login_changes_nothing() {
        let (mut player, _, _) = player();
        player
            .handle(Command::Login(Credentials::new("me@example.com", "wrong")).into())
            .await;

        assert!(player.session().user().is_none());
        assert_eq!(player.catalog().len(), 1);
        assert_eq!(player.channel(), 1);
        assert!(player.last_error().unwrap().contains("login failed"));
    }

    #[tokio::test]
    async fn commands_submitted_while_busy_are_dropped() {
        let (player, api, _) = player();
        api.reply(Ok(tracks(&["1", "2", "3"])));
        let status = player.subscribe();

        let (mailbox, receiver) = mailbox();
        assert_eq!(mailbox.submit(Message::from(Command::Tune(2))), Ok(()));
        assert_eq!(
            mailbox.submit(Message::from(Command::Tune(3))),
            Err(SubmitError::Busy)
        );
        drop(mailbox);

        player.spawn(receiver).await.unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].channel, "61");
        let status = status.borrow();
        assert_eq!(status.channel, 2);
        assert_eq!(status.now_playing.as_ref().map(|t| t.id.as_str()), Some("1"));
        assert_eq!(status.queue.len(), 2);
    }
}
