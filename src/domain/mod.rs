//! Core domain types shared across modules.

pub mod config;
pub mod message;

pub use config::Config;
pub use message::Message;
