//! # GameDex Common Library
//!
//! Shared code for GameDex services including:
//! - Game records returned by the metadata provider
//! - API request/response types (section metadata, cache statistics)
//! - Shared-secret authentication helpers
//! - Configuration file loading and platform default paths
//! - Monthly subscription catalogue records
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod error;
pub mod games;
pub mod monthly;
pub mod time;

pub use error::{Error, Result};
pub use games::GameResult;
