//! Command implementations for the minechat CLI.
//!
//! - `chat` - terminal chat session (default command)
//! - `register` - account registration
//! - `config` - configuration file management

pub(crate) mod chat;
pub(crate) mod config;
pub(crate) mod register;

pub(crate) use chat::*;
pub(crate) use config::*;
pub(crate) use register::*;
