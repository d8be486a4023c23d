//! Types shared between the quadpong server and its web client.

pub mod config;
pub mod protocol;
