//! Session state for one panel: per-axis samples, speed cap, power flag and
//! the request log.

use core::fmt;

use crate::utils::{
    connection::client::{clamp_speed, Direction},
    controllers::{log::SharedLog, PanelError},
    math::drag::{Axis, AxisSample},
};

pub const DEFAULT_MAX_SPEED: u8 = 50;
/// Quick-select values offered next to the speed bar.
pub const SPEED_PRESETS: [u8; 4] = [30, 50, 70, 100];

pub struct Session<'a> {
    longitudinal: AxisSample,
    lateral: AxisSample,
    max_speed: u8,
    powered: bool,
    log: &'a SharedLog,
}

impl<'a> Session<'a> {
    /// Fresh session, powered off, caps above 100 lowered to 100.
    pub fn new(
        log: &'a SharedLog,
        max_speed: u8,
    ) -> Self {
        Self {
            longitudinal: AxisSample::STOP,
            lateral: AxisSample::STOP,
            max_speed: max_speed.min(100),
            powered: false,
            log,
        }
    }

    pub fn record(
        &mut self,
        axis: Axis,
        sample: AxisSample,
    ) {
        match axis {
            Axis::Vertical => self.longitudinal = sample,
            Axis::Horizontal => self.lateral = sample,
        }
    }

    pub fn axis(
        &self,
        axis: Axis,
    ) -> AxisSample {
        match axis {
            Axis::Vertical => self.longitudinal,
            Axis::Horizontal => self.lateral,
        }
    }

    /// Longitudinal direction wins whenever it is not `Stop`.
    pub fn current_direction(&self) -> Direction {
        if !self.longitudinal.direction.is_stop() {
            self.longitudinal.direction
        } else if !self.lateral.direction.is_stop() {
            self.lateral.direction
        } else {
            Direction::Stop
        }
    }

    pub fn current_speed(&self) -> f32 {
        self.longitudinal.speed.max(self.lateral.speed)
    }

    pub fn max_speed(&self) -> u8 {
        self.max_speed
    }

    pub(crate) fn set_max_speed(
        &mut self,
        value: u16,
    ) -> Result<(), PanelError> {
        let value = u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or(PanelError::OutOfRange(value))?;
        self.max_speed = value;
        Ok(())
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Flip the power flag. Only called once the chassis has confirmed.
    pub(crate) fn confirm_power(
        &mut self,
        on: bool,
    ) {
        self.powered = on;
    }

    pub fn log(&self) -> &'a SharedLog {
        self.log
    }

    pub fn status(&self) -> Status {
        Status {
            direction: self.current_direction(),
            speed: clamp_speed(self.current_speed()),
            max_speed: self.max_speed,
            powered: self.powered,
        }
    }
}

/// Readout shown above the sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub direction: Direction,
    pub speed: u8,
    pub max_speed: u8,
    pub powered: bool,
}

impl fmt::Display for Status {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "direction {} | speed {} / {} | power {}",
            self.direction,
            self.speed,
            self.max_speed,
            if self.powered { "on" } else { "off" }
        )
    }
}
