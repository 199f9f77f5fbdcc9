pub mod archive;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod list;
pub mod load_config;
pub mod logger;
pub mod pull;
pub mod push;

pub use cli::{run, Cli, CommandOutcome, Commands};
