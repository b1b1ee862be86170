#![warn(missing_docs)]
//! fault-relay receives error reports from applications over an authenticated
//! webhook and relays them to a Telegram chat, with deduplication, rate
//! limiting and retrying delivery.

pub mod cmd;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod http_server;
pub mod models;
pub mod notification;
pub mod supervisor;
pub mod test_helpers;
