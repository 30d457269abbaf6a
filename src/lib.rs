//! Polls a Fronius data logger's Solar API and turns its responses into
//! line-protocol records.

pub mod archive;
pub mod cli;
pub mod client;
pub mod config;
pub mod head;
pub mod realtime;
pub mod record;
