//! Audio output.
//!
//! The [`AudioEngine`] trait is what the playback engine drives. [`Output`]
//! implements it with `rodio` for decoding and output, and `stream-download`
//! for progressive HTTP download into temporary storage.
//!
//! # Threading
//!
//! The `rodio` output stream must stay on the thread that opened it. It
//! lives on a dedicated thread that takes [instructions](Instruction) over a
//! channel. That thread polls the sink to tell when a loaded track drained,
//! and reports it as [`Event::EndOfStream`] tagged with the generation the
//! track was loaded with.
//!
//! Downloads are started on the async side, so that a slow server does not
//! hold up the output thread.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use stream_download::{
    http::HttpStream, source::SourceStream, storage::temp::TempStorageProvider, Settings,
    StreamDownload,
};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    events::{Event, Generation},
    http::Client as HttpClient,
};

/// Operations of the audio output.
#[async_trait]
pub trait AudioEngine: Send {
    /// Resumes the loaded track.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Stops and unloads the loaded track. No end of stream follows.
    fn stop(&mut self) -> Result<()>;

    /// Replaces the loaded track with the one at `url` and plays it.
    /// Events about this track carry `generation`.
    async fn load_and_play(&mut self, url: &Url, generation: Generation) -> Result<()>;
}

/// Instructions for the output thread.
enum Instruction {
    Load(Generation, StreamDownload<TempStorageProvider>),
    Play,
    Pause,
    Stop,
}

pub struct Output {
    instructions: mpsc::Sender<Instruction>,
    http_client: HttpClient,
    thread: Option<JoinHandle<()>>,
}

impl Output {
    /// How often the output thread checks whether the loaded track drained.
    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Bytes to download before decoding starts.
    const PREFETCH_BYTES: u64 = 64 * 1024;

    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built, or no output device
    /// can be opened.
    pub fn new(config: &Config, events: UnboundedSender<Event>) -> Result<Self> {
        let http_client = HttpClient::streaming(config)?;

        let (instructions, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread = thread::Builder::new()
            .name("audio output".to_owned())
            .spawn(move || Self::run(&rx, &ready_tx, &events))?;

        ready_rx
            .recv()
            .map_err(|_| Error::internal("audio output thread quit"))??;
        info!("audio output opened");

        Ok(Self {
            instructions,
            http_client,
            thread: Some(thread),
        })
    }

    fn open() -> Result<(OutputStream, Sink)> {
        let (stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;
        Ok((stream, sink))
    }

    /// Output thread. Runs until [`Output`] is dropped.
    fn run(
        instructions: &mpsc::Receiver<Instruction>,
        ready: &mpsc::SyncSender<Result<()>>,
        events: &UnboundedSender<Event>,
    ) {
        // Keep the stream alive for as long as the sink is used.
        let (_stream, sink) = match Self::open() {
            Ok(output) => {
                let _ = ready.send(Ok(()));
                output
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        // Generation of the track in the sink.
        let mut loaded: Option<Generation> = None;
        loop {
            match instructions.recv_timeout(Self::POLL_INTERVAL) {
                Ok(Instruction::Load(generation, download)) => {
                    sink.stop();
                    loaded = None;
                    match Decoder::new(download) {
                        Ok(source) => {
                            sink.append(source);
                            sink.play();
                            loaded = Some(generation);
                        }
                        Err(e) => {
                            error!("failed to decode track: {e}");
                            let e = Error::from(e).to_string();
                            let _ = events.send(Event::Error(generation, e));
                        }
                    }
                }
                Ok(Instruction::Play) => sink.play(),
                Ok(Instruction::Pause) => sink.pause(),
                Ok(Instruction::Stop) => {
                    sink.stop();
                    loaded = None;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Some(generation) = loaded.filter(|_| sink.empty()) {
                loaded = None;
                trace!("track {generation} drained");
                if events.send(Event::EndOfStream(generation)).is_err() {
                    break;
                }
            }
        }

        sink.stop();
        debug!("audio output closed");
    }

    fn send(&self, instruction: Instruction) -> Result<()> {
        self.instructions.send(instruction).map_err(Into::into)
    }
}

#[async_trait]
impl AudioEngine for Output {
    fn play(&mut self) -> Result<()> {
        self.send(Instruction::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(Instruction::Pause)
    }

    fn stop(&mut self) -> Result<()> {
        self.send(Instruction::Stop)
    }

    async fn load_and_play(&mut self, url: &Url, generation: Generation) -> Result<()> {
        // Silence the old track first so it cannot report a stale end of
        // stream while the new one is downloading.
        self.send(Instruction::Stop)?;

        let stream = HttpStream::new(self.http_client.unlimited.clone(), url.clone()).await?;
        match stream.content_length() {
            Some(file_size) => debug!("downloading {file_size} bytes from {url}"),
            None => debug!("downloading from {url} with unknown file size"),
        }

        // Returns once prefetching is done; the download continues in the
        // background.
        let download = StreamDownload::from_stream(
            stream,
            TempStorageProvider::default(),
            Settings::default().prefetch_bytes(Self::PREFETCH_BYTES),
        )
        .await?;

        self.send(Instruction::Load(generation, download))
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        // Hang up, so the output thread quits.
        let (closed, _) = mpsc::channel();
        self.instructions = closed;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
