//! motd server
//!
//! Keeps a local cache of images and comics fresh from remote providers and
//! writes one random entry, as a terminal inline-image escape sequence, to
//! every TCP client that connects.

pub mod app;
pub mod config;
pub mod error;
pub mod listener;
pub mod workers;

pub use app::{App, RunningApp};
pub use config::{MotdConfig, TagQuery};
pub use error::{Result, ServerError};
pub use listener::TcpServer;
pub use workers::{IngestionWorker, RetentionWorker, SweepReport};
