//! manifestctl library: manifest decoding and typed create/list/delete
//! against a Kubernetes API server.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod manifest;
pub mod ops;
pub mod resource;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, ErrorKind, Result};
