//! Reputation list registry for community radar clients
//!
//! Public lists are mirrored from remote JSON documents, private lists are
//! kept on disk, and player names are resolved to account identities before
//! any list lookup. [`RadarService`] ties the pieces together.

pub mod config;
pub mod host;
pub mod http;
pub mod identity;
pub mod logging;
pub mod radar;
pub mod service;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use http::{HttpFetch, ReqwestFetcher};
pub use identity::IdentityResolver;
pub use logging::{init_logging, LogLevel};
pub use radar::{ListEntry, ListRegistry, RadarError, RadarList, RadarResult, Visibility};
pub use service::{CheckOutcome, PlayerOutcome, RadarService};
