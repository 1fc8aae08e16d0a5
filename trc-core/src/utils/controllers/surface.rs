//! Drag input surface for one slider axis.
//!
//! `Idle -> Dragging -> Releasing -> Idle`. While dragging, every pointer move
//! produces a sample; after release, every frame step produces one until the
//! spring-back settles with a final stop.

use crate::utils::{
    controllers::PanelError,
    math::drag::{Axis, AxisSample, Decay, Track},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceState {
    Idle,
    Dragging,
    Releasing(Decay),
}

#[derive(Debug, Clone)]
pub struct DragSurface {
    axis: Axis,
    track: Track,
    state: SurfaceState,
    position: f32,
}

impl DragSurface {
    pub const fn new(
        axis: Axis,
        track: Track,
    ) -> Self {
        Self {
            axis,
            track,
            state: SurfaceState::Idle,
            position: 0.0,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SurfaceState::Dragging)
    }

    pub fn is_releasing(&self) -> bool {
        matches!(self.state, SurfaceState::Releasing(_))
    }

    /// Start a drag at `pointer`. A pending spring-back is abandoned.
    pub fn press(
        &mut self,
        pointer: f32,
        max_speed: u8,
        enabled: bool,
    ) -> Result<AxisSample, PanelError> {
        if !enabled {
            return Err(PanelError::PoweredOff);
        }
        self.state = SurfaceState::Dragging;
        Ok(self.track_to(pointer, max_speed))
    }

    /// Follow the pointer. `None` unless a drag is in progress.
    pub fn drag_to(
        &mut self,
        pointer: f32,
        max_speed: u8,
    ) -> Option<AxisSample> {
        if !self.is_dragging() {
            return None;
        }
        Some(self.track_to(pointer, max_speed))
    }

    fn track_to(
        &mut self,
        pointer: f32,
        max_speed: u8,
    ) -> AxisSample {
        self.position = self.track.position(self.axis, pointer);
        self.axis.sample(self.position, max_speed)
    }

    /// End the drag and begin the spring-back with the cap in force now.
    pub fn release(
        &mut self,
        max_speed: u8,
    ) -> bool {
        if !self.is_dragging() {
            return false;
        }
        self.state = SurfaceState::Releasing(Decay::new(self.axis, self.position, max_speed));
        true
    }

    /// Advance the spring-back by one frame.
    ///
    /// Returns the sample for this frame, `None` when not releasing. The
    /// settling step yields [`AxisSample::STOP`] and returns to `Idle`.
    pub fn step(&mut self) -> Option<AxisSample> {
        let SurfaceState::Releasing(decay) = &mut self.state else {
            return None;
        };
        let sample = decay.next()?;
        self.position = decay.current();
        if decay.is_settled() {
            self.state = SurfaceState::Idle;
        }
        Some(sample)
    }

    /// Drop any drag or spring-back without emitting anything.
    pub fn cancel(&mut self) {
        self.state = SurfaceState::Idle;
        self.position = 0.0;
    }
}
