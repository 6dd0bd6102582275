pub mod cli;
pub mod config;
pub mod filesystem;
pub mod logging;
pub mod shelf;
pub mod tui;
