//! Gesture-to-command core for the tracked chassis remote, on no-std + alloc.
//!
//! For a runnable shell, see the `trc-app/console` crate.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod utils;
