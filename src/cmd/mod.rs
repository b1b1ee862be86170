//! Command-line subcommands other than the long-running relay.

pub mod ping;

pub use ping::{PingArgs, PingError};
