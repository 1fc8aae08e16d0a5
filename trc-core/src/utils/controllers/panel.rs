//! Panel event routing.
//!
//! The [`Panel`] owns both slider surfaces, the session and the dispatcher
//! front. All of its methods are synchronous and run inside the shared
//! panel mutex; the only awaiting paths are [`toggle_power`] and the
//! [`spring_back`] frame loop, which never hold the lock across an await.

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};
use embassy_time::{Duration, Instant, Ticker};

use crate::utils::{
    connection::client::{ChassisError, ChassisLink, CommandMapper},
    controllers::{
        dispatcher::{ChassisCommand, CommandQueue, ThrottledDispatcher},
        log::SharedLog,
        session::{Session, Status},
        surface::DragSurface,
        PanelError,
        PanelEvent,
    },
    math::drag::{Axis, AxisSample, SpeedBar, Track},
};

/// Spring-back frame period (about 60 Hz).
pub const FRAME_PERIOD: Duration = Duration::from_millis(16);

pub type SharedPanel<'a> = Mutex<CriticalSectionRawMutex, RefCell<Panel<'a>>>;
pub type FrameSignal = Signal<CriticalSectionRawMutex, ()>;

/// Pointer geometry of the panel controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    pub vertical: Track,
    pub horizontal: Track,
    pub speed_bar: SpeedBar,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            vertical: Track::new(0.0, 320.0, 64.0),
            horizontal: Track::new(0.0, 320.0, 64.0),
            speed_bar: SpeedBar::new(0.0, 200.0),
        }
    }
}

/// Shared pieces the panel writes into.
#[derive(Clone, Copy)]
pub struct PanelLinks<'a> {
    pub log: &'a SharedLog,
    pub queue: &'a CommandQueue,
    /// Raised whenever a slider starts springing back.
    pub frames: &'a FrameSignal,
}

pub struct Panel<'a> {
    session: Session<'a>,
    vertical: DragSurface,
    horizontal: DragSurface,
    speed_bar: SpeedBar,
    dispatcher: ThrottledDispatcher<'a>,
    frames: &'a FrameSignal,
}

impl<'a> Panel<'a> {
    pub fn new(
        layout: PanelLayout,
        max_speed: u8,
        links: PanelLinks<'a>,
    ) -> Self {
        Self {
            session: Session::new(links.log, max_speed),
            vertical: DragSurface::new(Axis::Vertical, layout.vertical),
            horizontal: DragSurface::new(Axis::Horizontal, layout.horizontal),
            speed_bar: layout.speed_bar,
            dispatcher: ThrottledDispatcher::new(links.queue),
            frames: links.frames,
        }
    }

    pub fn session(&self) -> &Session<'a> {
        &self.session
    }

    pub fn status(&self) -> Status {
        self.session.status()
    }

    pub fn surface(
        &self,
        axis: Axis,
    ) -> &DragSurface {
        match axis {
            Axis::Vertical => &self.vertical,
            Axis::Horizontal => &self.horizontal,
        }
    }

    fn surface_mut(
        &mut self,
        axis: Axis,
    ) -> &mut DragSurface {
        match axis {
            Axis::Vertical => &mut self.vertical,
            Axis::Horizontal => &mut self.horizontal,
        }
    }

    /// Apply a synchronous event. `Power`, `Status` and `ShowLog` belong to
    /// the shell and are accepted as no-ops here.
    pub fn apply(
        &mut self,
        event: PanelEvent,
        now: Instant,
    ) -> Result<(), PanelError> {
        match event {
            PanelEvent::Press { axis, at } => self.press(axis, at, now),
            PanelEvent::Move { axis, at } => {
                self.drag(axis, at, now);
                Ok(())
            }
            PanelEvent::Release { axis } => {
                self.release(axis);
                Ok(())
            }
            PanelEvent::MaxSpeed { value } => self.set_max_speed(value),
            PanelEvent::SpeedBar { at } => self.pick_on_speed_bar(at).map(|_| ()),
            PanelEvent::ClearLog => {
                self.clear_log();
                Ok(())
            }
            PanelEvent::Power | PanelEvent::Status | PanelEvent::ShowLog => Ok(()),
        }
    }

    pub fn press(
        &mut self,
        axis: Axis,
        at: f32,
        now: Instant,
    ) -> Result<(), PanelError> {
        let max_speed = self.session.max_speed();
        let enabled = self.session.is_powered();
        let sample = self.surface_mut(axis).press(at, max_speed, enabled)?;
        self.emit(axis, sample, now);
        Ok(())
    }

    pub fn drag(
        &mut self,
        axis: Axis,
        at: f32,
        now: Instant,
    ) -> bool {
        let max_speed = self.session.max_speed();
        match self.surface_mut(axis).drag_to(at, max_speed) {
            Some(sample) => self.emit(axis, sample, now),
            None => false,
        }
    }

    pub fn release(
        &mut self,
        axis: Axis,
    ) -> bool {
        let max_speed = self.session.max_speed();
        let released = self.surface_mut(axis).release(max_speed);
        if released {
            self.frames.signal(());
        }
        released
    }

    /// Advance every releasing slider by one frame.
    ///
    /// Returns `true` while any slider is still springing back.
    pub fn frame(
        &mut self,
        now: Instant,
    ) -> bool {
        for axis in [Axis::Vertical, Axis::Horizontal] {
            let surface = self.surface_mut(axis);
            let Some(sample) = surface.step() else {
                continue;
            };
            if surface.is_releasing() {
                self.emit(axis, sample, now);
            } else {
                self.session.record(axis, sample);
                self.dispatcher.force(ChassisCommand::from(sample), now);
                tracing::debug!(?axis, "slider settled");
            }
        }
        self.is_settling()
    }

    pub fn is_settling(&self) -> bool {
        self.vertical.is_releasing() || self.horizontal.is_releasing()
    }

    /// Abandon spring-backs in progress, e.g. on teardown.
    pub fn cancel_settling(&mut self) {
        for axis in [Axis::Vertical, Axis::Horizontal] {
            let surface = self.surface_mut(axis);
            if surface.is_releasing() {
                surface.cancel();
            }
        }
    }

    pub fn set_max_speed(
        &mut self,
        value: u16,
    ) -> Result<(), PanelError> {
        if !self.session.is_powered() {
            return Err(PanelError::PoweredOff);
        }
        if self.vertical.is_dragging() || self.horizontal.is_dragging() {
            return Err(PanelError::MaxSpeedLocked);
        }
        self.session.set_max_speed(value)?;
        tracing::info!(max_speed = value, "speed cap changed");
        Ok(())
    }

    pub fn pick_on_speed_bar(
        &mut self,
        at: f32,
    ) -> Result<u8, PanelError> {
        let value = self.speed_bar.value_at(at);
        self.set_max_speed(u16::from(value))?;
        Ok(value)
    }

    pub fn clear_log(&self) {
        self.session.log().clear();
    }

    fn emit(
        &mut self,
        axis: Axis,
        sample: AxisSample,
        now: Instant,
    ) -> bool {
        self.session.record(axis, sample);
        self.dispatcher.offer(ChassisCommand::from(sample), now)
    }
}

/// Toggle chassis power. The flag only flips once the chassis has accepted
/// the change; on failure the error is returned and the flag is untouched.
pub async fn toggle_power<L: ChassisLink>(
    panel: &SharedPanel<'_>,
    mapper: &CommandMapper<'_, L>,
) -> Result<bool, ChassisError> {
    let target = !panel.lock(|p| p.borrow().session.is_powered());
    mapper.set_power(target).await?;
    panel.lock(|p| p.borrow_mut().session.confirm_power(target));
    tracing::info!(powered = target, "power state changed");
    Ok(target)
}

/// Spring-back frame loop.
///
/// Sleeps until `frames` is raised, then steps the panel once per
/// [`FRAME_PERIOD`] until every slider has settled. Raising `teardown`
/// abandons any spring-back in progress and ends the loop.
pub async fn spring_back(
    panel: &SharedPanel<'_>,
    frames: &FrameSignal,
    teardown: &FrameSignal,
) {
    loop {
        if let Either::Second(()) = select(frames.wait(), teardown.wait()).await {
            return;
        }

        let mut ticker = Ticker::every(FRAME_PERIOD);
        loop {
            match select(ticker.next(), teardown.wait()).await {
                Either::First(()) => {
                    if !panel.lock(|p| p.borrow_mut().frame(Instant::now())) {
                        break;
                    }
                }
                Either::Second(()) => {
                    panel.lock(|p| p.borrow_mut().cancel_settling());
                    tracing::debug!("spring-back torn down");
                    return;
                }
            }
        }
    }
}
