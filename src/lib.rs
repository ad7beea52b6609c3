//! Scenemend library crate
//!
//! Exposes the repair pipeline and session workflow so tests and external
//! tooling can exercise them without going through CLI startup.

pub mod config;
pub mod error;
pub mod render;
pub mod repair;
pub mod request;
pub mod upload;
pub mod util;
pub mod workflow;
