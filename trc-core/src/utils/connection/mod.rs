//! Module Exports
//!
//! This file exports the chassis connection layer.
//!
//! # Modules
//! - `client`: direction vocabulary, the `ChassisLink` transport seam and the
//!   logging `CommandMapper`.

/// Module for mapping panel intents onto chassis REST calls.
pub mod client;
