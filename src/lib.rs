//! dmpilot library
//!
//! Direct-message automation for social platform accounts: a background
//! auto-reply loop that polls monitored inboxes, checks per-account reply
//! conditions and answers with stored templates or AI-generated text, bulk
//! template campaigns to uploaded recipient lists, account management, and
//! the HTTP control surface and CLI around it.

pub mod accounts;
pub mod ai;
pub mod autoreply;
pub mod campaigns;
pub mod channels;
pub mod cli;
pub mod config;
pub mod imports;
pub mod logging;
pub mod server;
pub mod storage;
pub mod templates;
