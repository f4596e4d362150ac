use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, Write},
    path::PathBuf,
    process,
    time::Duration,
};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::{mpsc, watch},
};

use fmtuner::{
    audio::Output,
    config::Config,
    gateway::Gateway,
    mailbox::{self, Mailbox, SubmitError},
    player::{Command, Message, Player, Status},
    secrets::Credentials,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

const PROMPT: &str = "fmtuner> ";

const HELP: &str = "\
p      play/pause
n      next track
x      toggle loop
s      skip track
t      trash track (never play again)
r      like track
u      unlike track
c      current track
l      playlist
0      channel list
<N>    tune to channel N
z      login
h      help
q      quit";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Secrets file
    ///
    /// TOML file with `email` and `password` to log in with at startup.
    /// Ensure that this file is kept secure and not shared publicly.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Channel to tune to at startup, by index in the channel list
    #[arg(short, long, default_value_t = 1)]
    channel: usize,

    /// Timeout of station service requests in seconds
    ///
    /// [default: 10]
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Directory holding the log file
    ///
    /// [default: ~/.fmtuner]
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    state_dir: Option<PathBuf>,

    /// Log to standard error instead of the log file
    #[arg(long, default_value_t = false)]
    log_stderr: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// The prompt owns the terminal, so logs go to the log file in the state
/// directory unless `--log-stderr` is given.
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(args: &Args, config: &Config) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if args.quiet || args.verbose > 0 {
        let level = match args.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    if !args.log_stderr {
        let log_file = config.create_state_dir().and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(config.log_file())
        });
        match log_file {
            Ok(file) => {
                logger
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .write_style(env_logger::WriteStyle::Never);
            }
            Err(e) => eprintln!(
                "cannot open {}, logging to standard error: {e}",
                config.log_file().display()
            ),
        }
    }

    logger.init();
}

/// Loads credentials from the secrets file, if there is one.
fn load_credentials(secrets_file: &str) -> Option<Credentials> {
    match Credentials::from_file(secrets_file) {
        Ok(credentials) => Some(credentials),
        Err(e) if e.kind == fmtuner::error::ErrorKind::NotFound => {
            debug!("no secrets file at {secrets_file}");
            None
        }
        Err(e) => {
            warn!("ignoring {secrets_file}: {e}");
            None
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}

/// Reads one line from standard input after a prompt.
async fn ask(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> io::Result<Option<String>> {
    prompt(question);
    Ok(lines.next_line().await?.map(|line| line.trim().to_owned()))
}

fn print_current(status: &Status) {
    match status.now_playing {
        Some(ref track) => println!("{}", track.details()),
        None => println!("nothing playing"),
    }

    let mut flags = Vec::new();
    if status.paused {
        flags.push("paused");
    }
    if status.looping {
        flags.push("looping");
    }
    if !flags.is_empty() {
        println!("[{}]", flags.join("] ["));
    }
    if let Some(ref e) = status.last_error {
        println!("last error: {e}");
    }
}

fn print_playlist(status: &Status) {
    for track in status.now_playing.iter().chain(status.queue.iter()) {
        println!("{track}");
    }
}

fn print_channels(status: &Status) {
    for (i, channel) in status.channels.iter().enumerate() {
        let index = i + 1;
        let marker = if index == status.channel { '+' } else { '-' };
        println!("{index:2} {marker} {channel}");
    }
    if let Some(ref user) = status.user {
        println!("logged in as {user}");
    }
}

/// Hands a command to the playback engine. Returns `false` once the engine
/// is gone.
fn submit(mailbox: &Mailbox<Message>, command: Command) -> bool {
    match mailbox.submit(command.into()) {
        Ok(()) => true,
        Err(SubmitError::Busy) => {
            println!("busy, command dropped");
            true
        }
        Err(SubmitError::Closed) => false,
    }
}

/// What a line typed at the prompt asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Quit,
    Help,
    Current,
    Playlist,
    Channels,
    Login,
    Command(Command),
    Unknown,
}

impl Input {
    /// Parses a trimmed prompt line. Letters match in either case.
    fn parse(line: &str) -> Self {
        match line.to_lowercase().as_str() {
            "" => Self::Empty,
            "q" => Self::Quit,
            "h" => Self::Help,
            "c" => Self::Current,
            "l" => Self::Playlist,
            "0" => Self::Channels,
            "z" => Self::Login,
            "p" => Self::Command(Command::PlayPause),
            "n" => Self::Command(Command::Next),
            "x" => Self::Command(Command::ToggleLoop),
            "s" => Self::Command(Command::Skip),
            "t" => Self::Command(Command::Trash),
            "r" => Self::Command(Command::Like),
            "u" => Self::Command(Command::Unlike),
            other => other
                .parse()
                .map_or(Self::Unknown, |index| Self::Command(Command::Tune(index))),
        }
    }
}

/// Interactive prompt. Returns when the user quits or standard input ends.
async fn prompt_loop(
    args: &Args,
    mailbox: &Mailbox<Message>,
    status: &watch::Receiver<Status>,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = ask(&mut lines, PROMPT).await? else {
            return Ok(());
        };

        let command = match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => return Ok(()),
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Current => {
                print_current(&status.borrow());
                continue;
            }
            Input::Playlist => {
                print_playlist(&status.borrow());
                continue;
            }
            Input::Channels => {
                print_channels(&status.borrow());
                continue;
            }
            Input::Command(command) => command,
            Input::Login => {
                if let Some(user) = status.borrow().user.as_deref() {
                    println!("logged in as {user}");
                    continue;
                }

                let credentials = match load_credentials(&args.secrets_file) {
                    Some(credentials) => credentials,
                    None => {
                        let Some(email) = ask(&mut lines, "Email: ").await? else {
                            return Ok(());
                        };
                        let Some(password) = ask(&mut lines, "Password: ").await? else {
                            return Ok(());
                        };
                        if email.is_empty() || password.is_empty() {
                            continue;
                        }
                        Credentials::new(&email, &password)
                    }
                };
                Command::Login(credentials)
            }
            Input::Unknown => {
                println!("unknown command {line:?}, h for help");
                continue;
            }
        };

        if !submit(mailbox, command) {
            return Ok(());
        }
    }
}

/// Main application.
///
/// # Errors
///
/// Returns an error when the station service client or the audio output
/// cannot be set up, or standard input fails.
async fn run(args: Args, config: Config) -> Result<(), Box<dyn Error>> {
    let (mailbox, receiver) = mailbox::mailbox::<Message>();

    // Forward audio output events into the mailbox. Events are delivered,
    // never dropped.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let output = Output::new(&config, events_tx)?;
    let forward = mailbox.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if forward.deliver(Message::Event(event)).await.is_err() {
                break;
            }
        }
    });

    let gateway = Gateway::new(&config)?;
    let player = Player::new(Box::new(gateway), Box::new(output));
    let status = player.subscribe();
    let engine = player.spawn(receiver);

    mailbox
        .deliver(Command::Tune(args.channel).into())
        .await?;
    if let Some(credentials) = load_credentials(&args.secrets_file) {
        mailbox.deliver(Command::Login(credentials).into()).await?;
    }

    println!("h for help");
    tokio::select! {
        // Prioritize shutdown signals.
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("shutting down gracefully");
        }

        result = prompt_loop(&args, &mailbox, &status) => {
            result?;
            info!("shutting down");
        }
    }

    if engine.is_finished() {
        error!("playback engine quit unexpectedly");
    }
    Ok(())
}

/// Main entry point of the application.
///
/// This function parses the command line arguments, initializes the logger
/// facade, and starts the interactive prompt.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();

    let mut config = Config::new();
    if let Some(timeout) = args.timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref state_dir) = args.state_dir {
        config.state_dir.clone_from(state_dir);
    }

    init_logger(&args, &config);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args, config).await {
        error!("{e}");
        eprintln!("{e}");
        process::exit(1);
    }
}
