//! # tokenjam-core
//!
//! Domain types and pure logic for the shared token puzzle.
//!
//! - [`token`]: tokens and puzzles
//! - [`catalog`]: the immutable, ordered puzzle list
//! - [`arrangement`]: reading-order reconstruction of a token layout
//! - [`clear`]: sustained-match level-clear detection
//! - [`assignment`]: subscriber ↔ token binding with randomized reassignment
//! - [`protocol`]: inbound/outbound wire messages and control commands

#![deny(unsafe_code)]

pub mod arrangement;
pub mod assignment;
pub mod catalog;
pub mod clear;
pub mod errors;
pub mod ids;
pub mod protocol;
pub mod token;

pub use arrangement::{arrange, expression, is_reading_order};
pub use assignment::Assignment;
pub use catalog::Catalog;
pub use clear::ClearDetector;
pub use errors::CatalogError;
pub use ids::SubscriberId;
pub use protocol::{ControlCommand, PlayerView, PositionUpdate, SessionSnapshot};
pub use token::{Puzzle, Token};
