//! Command implementations.
//!
//! - [`init`]: creating a `.rapport/` workspace
//! - [`parse`]: recognising chat-style commands such as `-connect <@1> <@2>`
//! - [`dispatch`]: running them against a [`GraphService`] with admin gating
//!   and user-facing replies
//!
//! [`GraphService`]: crate::service::GraphService

pub mod dispatch;
pub mod init;
pub mod parse;

pub use dispatch::{Dispatcher, GENERIC_FAILURE, Outbox, Response};
pub use parse::{Command, parse_command, parse_mentions};
