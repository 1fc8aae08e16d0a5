//! Math utilities for the tracked chassis remote.
//!
//! This module provides the slider position mapping and spring-back decay.

pub mod drag;
