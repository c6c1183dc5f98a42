//! # talond Common Library
//!
//! Shared types for the talond workspace: the talon shared-memory layout,
//! pointing/focus state enumerations, numeric command result codes, and the
//! daemon configuration.
//!
//! The daemon and any client tooling must agree on the wire values in
//! [`state`] and [`status`]; keeping them in one crate is what guarantees
//! that.

pub mod config;
pub mod consts;
pub mod state;
pub mod status;
