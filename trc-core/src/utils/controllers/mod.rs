//! Module Exports
//!
//! Panel-side controllers for the tracked chassis remote.
//!
//! - `dispatcher`: throttle and forwarding task for movement commands.
//! - `log`: bounded request log.
//! - `panel`: event routing and the spring-back frame loop.
//! - `session`: per-axis state, speed cap and power flag.
//! - `surface`: drag state machine for one slider.

pub mod dispatcher;
pub mod log;
pub mod panel;
pub mod session;
pub mod surface;

use serde::{Deserialize, Serialize};

pub use dispatcher::{
    forward_commands, ChassisCommand, CommandQueue, ShutdownSignal, ThrottledDispatcher,
};
pub use log::{LogEntry, SharedLog, TimeOfDay};
pub use panel::{spring_back, toggle_power, FrameSignal, Panel, PanelLayout, PanelLinks, SharedPanel};
pub use session::Session;

use crate::utils::math::drag::Axis;

/// Panel events as they arrive from the shell.
///
/// Serialized as JSON with tag `"ev"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "ev", rename_all = "snake_case")] // ev = event
pub enum PanelEvent {
    /// Pointer down on a slider.
    Press { axis: Axis, at: f32 },
    /// Pointer move while a slider is held.
    Move { axis: Axis, at: f32 },
    /// Pointer up.
    Release { axis: Axis },
    /// Pick a speed cap directly (presets).
    MaxSpeed { value: u16 },
    /// Pick a speed cap on the progress bar.
    SpeedBar { at: f32 },
    /// Toggle chassis power.
    Power,
    ClearLog,
    Status,
    ShowLog,
}

/// Reasons a panel event is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("panel is powered off")]
    PoweredOff,
    #[error("max speed cannot change while a slider is held")]
    MaxSpeedLocked,
    #[error("max speed {0} is outside 0..=100")]
    OutOfRange(u16),
}
