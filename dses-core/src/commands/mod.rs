// src/commands/mod.rs
pub mod init;
mod api;

pub use api::{function, Commands};

pub use init::{default_root, ensure_initialized, InitReport};
