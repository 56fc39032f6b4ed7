#[macro_use]
extern crate log;

pub mod client;
pub mod common;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod executor;
pub mod migrate;
pub mod repair;
pub mod sql;
pub mod verify;
