//! Drag math for the chassis sliders.
//!
//! A slider track maps a pointer coordinate onto a normalized signed position
//! in `[-1, 1]`. From that position the axis derives a speed (scaled by the
//! current cap) and a named direction, and a released slider follows an
//! exponential spring-back toward the center.
//!
//! # Example
//! ```rust
//! use trc_core::utils::math::drag::{Axis, Track};
//! let track = Track::new(0.0, 320.0, 64.0);
//! // 64 units above center on a vertical track is half travel, pointing up.
//! assert_eq!(track.position(Axis::Vertical, 96.0), 0.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::connection::client::Direction;

/// Positions with a magnitude at or below this resolve to [`Direction::Stop`].
pub const DEADBAND: f32 = 0.05;
/// Per-frame multiplier applied to a released slider.
pub const DECAY_FACTOR: f32 = 0.8;
/// Once a decaying position drops below this it snaps to zero.
pub const SETTLE_THRESHOLD: f32 = 0.01;

/// The two independent slider axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Forward / backward slider; up is positive.
    Vertical,
    /// Left / right slider; right is positive.
    Horizontal,
}

impl Axis {
    /// Resolve a normalized position to this axis' named direction.
    pub fn direction_for(
        self,
        position: f32,
    ) -> Direction {
        if libm::fabsf(position) <= DEADBAND {
            return Direction::Stop;
        }
        match (self, position > 0.0) {
            (Axis::Vertical, true) => Direction::Forward,
            (Axis::Vertical, false) => Direction::Backward,
            (Axis::Horizontal, true) => Direction::Right,
            (Axis::Horizontal, false) => Direction::Left,
        }
    }

    /// Speed and direction for `position` under the given cap.
    pub fn sample(
        self,
        position: f32,
        max_speed: u8,
    ) -> AxisSample {
        AxisSample {
            speed: libm::fabsf(position) * f32::from(max_speed),
            direction: self.direction_for(position),
        }
    }
}

/// A (speed, direction) pair produced by one slider recomputation.
///
/// `speed` is left unrounded; rounding and clamping happen at the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub speed: f32,
    pub direction: Direction,
}

impl AxisSample {
    pub const STOP: AxisSample = AxisSample {
        speed: 0.0,
        direction: Direction::Stop,
    };
}

impl Default for AxisSample {
    fn default() -> Self {
        Self::STOP
    }
}

/// Geometry of a slider track along its own axis, in pointer units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    /// Pointer coordinate of the track's leading edge (top or left).
    pub start: f32,
    /// Full track length.
    pub length: f32,
    /// Handle length along the same axis.
    pub handle: f32,
}

impl Track {
    pub const fn new(
        start: f32,
        length: f32,
        handle: f32,
    ) -> Self {
        Self {
            start,
            length,
            handle,
        }
    }

    pub fn center(&self) -> f32 {
        self.start + self.length / 2.0
    }

    /// Normalized position of `pointer` on this track.
    ///
    /// Travel is limited to half of `length - handle` on each side of the
    /// center. A track with no travel always reports `0.0`.
    pub fn position(
        &self,
        axis: Axis,
        pointer: f32,
    ) -> f32 {
        let max_offset = (self.length - self.handle) / 2.0;
        if !(max_offset > 0.0) {
            return 0.0;
        }
        let position = ((pointer - self.center()) / max_offset).clamp(-1.0, 1.0);
        match axis {
            // screen y grows downward
            Axis::Vertical => -position,
            Axis::Horizontal => position,
        }
    }
}

/// Spring-back sequence of a released slider.
///
/// Each step multiplies the position by [`DECAY_FACTOR`] and yields the
/// resulting sample. The step that would fall below [`SETTLE_THRESHOLD`]
/// instead yields [`AxisSample::STOP`] and ends the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Decay {
    axis: Axis,
    position: f32,
    max_speed: u8,
    settled: bool,
}

impl Decay {
    /// Start a decay from `position`, scaling speeds by the cap captured at
    /// release time.
    pub fn new(
        axis: Axis,
        position: f32,
        max_speed: u8,
    ) -> Self {
        Self {
            axis,
            position,
            max_speed,
            settled: false,
        }
    }

    /// Position after the latest step.
    pub fn current(&self) -> f32 {
        self.position
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl Iterator for Decay {
    type Item = AxisSample;

    fn next(&mut self) -> Option<AxisSample> {
        if self.settled {
            return None;
        }
        let step = self.position * DECAY_FACTOR;
        if libm::fabsf(step) < SETTLE_THRESHOLD {
            self.position = 0.0;
            self.settled = true;
            return Some(AxisSample::STOP);
        }
        self.position = step;
        Some(self.axis.sample(step, self.max_speed))
    }
}

/// Horizontal progress bar used to pick the speed cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBar {
    pub start: f32,
    pub width: f32,
}

impl SpeedBar {
    pub const fn new(
        start: f32,
        width: f32,
    ) -> Self {
        Self { start, width }
    }

    /// Percentage under `pointer`, rounded and clamped to `0..=100`.
    pub fn value_at(
        &self,
        pointer: f32,
    ) -> u8 {
        if !(self.width > 0.0) {
            return 0;
        }
        let percentage = ((pointer - self.start) / self.width * 100.0).clamp(0.0, 100.0);
        libm::roundf(percentage) as u8
    }
}
