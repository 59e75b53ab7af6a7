//! # roomprobe core
//!
//! Shared building blocks for the roomprobe diagnostic harness: the error
//! taxonomy, process configuration, capability-token issuance and the room
//! admin client used to guarantee the probed room exists before joining.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod admin;
pub mod config;
pub mod error;
pub mod token;

// Re-export main types
pub use admin::{HttpRoomDirectory, RoomAdmin, RoomDirectory, RoomIdentity, RoomInfo};
pub use config::ProbeConfig;
pub use error::ProbeError;
pub use token::{GrantSet, TokenClaims, TokenIssuer};
