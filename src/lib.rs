//! Internet radio client for a station service that hands out short
//! playlists per channel.
//!
//! The heart of the crate is the [playback engine](player), which takes
//! user commands and audio output events through a single-slot
//! [mailbox], refills its [queue] from the [station service](gateway) and
//! drives the [audio output](audio).
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod http;
pub mod mailbox;
pub mod player;
pub mod protocol;
pub mod proxy;
pub mod queue;
pub mod refill;
pub mod secrets;
pub mod session;
pub mod util;
