//! Command-line interface for tilerace.

use crate::protocol::DEFAULT_PORT;
use clap::{Parser, Subcommand};

/// Tilerace - multiplayer sliding-tile puzzle over TCP
#[derive(Parser, Debug)]
#[command(name = "tilerace")]
#[command(about = "Race to solve the same sliding-tile puzzle", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host a session: run the relay and join it as participant 0
    Host {
        /// Number of participants the game waits for (1-3)
        #[arg(short, long, default_value_t = 2)]
        players: u8,

        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Board width in tiles
        #[arg(long, default_value_t = 3)]
        width: u32,

        /// Board height in tiles
        #[arg(long, default_value_t = 3)]
        height: u32,
    },

    /// Join a hosted session
    Join {
        /// Relay address, e.g. 192.168.1.10:8001
        addr: String,
    },

    /// Play alone on a loopback session
    Solo {
        /// Board width in tiles
        #[arg(long, default_value_t = 3)]
        width: u32,

        /// Board height in tiles
        #[arg(long, default_value_t = 3)]
        height: u32,

        /// Port for the loopback relay
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}
