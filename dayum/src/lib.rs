pub mod cli;
pub mod firestore;
pub mod load_config;
pub mod seed;

pub use cli::{run, Cli, Commands};
