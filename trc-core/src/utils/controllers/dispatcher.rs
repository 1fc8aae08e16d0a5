//! Throttled command dispatch.
//!
//! Gesture handlers offer every recomputed sample; at most one per
//! [`THROTTLE_WINDOW`] is admitted, measured from the last admitted command.
//! Anything offered inside the window is dropped for good. Admitted commands
//! go through a [`CommandQueue`] to [`forward_commands`], which performs the
//! network call and keeps failures away from the input side.

use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, TrySendError},
    signal::Signal,
};
use embassy_time::{Duration, Instant};

use crate::utils::{
    connection::client::{ChassisLink, CommandMapper, Direction},
    math::drag::AxisSample,
};

/// Minimum spacing between two dispatched commands.
pub const THROTTLE_WINDOW: Duration = Duration::from_millis(100);
/// Admitted commands waiting for the forwarding task.
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// Channel between the dispatcher and [`forward_commands`].
pub type CommandQueue = Channel<CriticalSectionRawMutex, ChassisCommand, COMMAND_QUEUE_DEPTH>;

/// Raised once to stop [`forward_commands`].
pub type ShutdownSignal = Signal<CriticalSectionRawMutex, ()>;

/// A movement intent as handed to the command mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisCommand {
    pub direction: Direction,
    pub speed: f32,
}

impl From<AxisSample> for ChassisCommand {
    fn from(sample: AxisSample) -> Self {
        Self {
            direction: sample.direction,
            speed: sample.speed,
        }
    }
}

/// Dropping throttle keyed on the last admitted instant.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub const fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Admit `now` if the window since the last admission has elapsed.
    pub fn admit(
        &mut self,
        now: Instant,
    ) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    /// Record `now` as an admission regardless of the window.
    pub fn stamp(
        &mut self,
        now: Instant,
    ) {
        self.last = Some(now);
    }
}

/// Front half of the dispatch path, owned by the panel.
pub struct ThrottledDispatcher<'a> {
    throttle: Throttle,
    queue: &'a CommandQueue,
}

impl<'a> ThrottledDispatcher<'a> {
    pub const fn new(queue: &'a CommandQueue) -> Self {
        Self {
            throttle: Throttle::new(THROTTLE_WINDOW),
            queue,
        }
    }

    /// Offer a command at `now`. Returns `true` if it was queued.
    pub fn offer(
        &mut self,
        command: ChassisCommand,
        now: Instant,
    ) -> bool {
        if !self.throttle.admit(now) {
            tracing::debug!(?command, "throttled");
            return false;
        }
        self.enqueue(command)
    }

    /// Queue a command without consulting the window. The window restarts at
    /// `now`.
    ///
    /// Used for the terminal stop of a spring-back so a released slider
    /// always leaves the chassis paused. A full queue gives up its oldest
    /// command to make room.
    pub fn force(
        &mut self,
        command: ChassisCommand,
        now: Instant,
    ) -> bool {
        self.throttle.stamp(now);
        if let Err(TrySendError::Full(command)) = self.queue.try_send(command) {
            if let Ok(evicted) = self.queue.try_receive() {
                tracing::warn!(?evicted, "command queue full, evicting oldest");
            }
            return self.enqueue(command);
        }
        true
    }

    fn enqueue(
        &mut self,
        command: ChassisCommand,
    ) -> bool {
        match self.queue.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                tracing::warn!(?command, "command queue full, dropping");
                false
            }
        }
    }
}

/// Forward one queued command. Returns whether the chassis accepted it.
///
/// Errors are already on the request log by the time they reach here; this
/// is where they stop.
pub async fn forward_next<L: ChassisLink>(
    queue: &CommandQueue,
    mapper: &CommandMapper<'_, L>,
) -> bool {
    let command = queue.receive().await;
    forward(command, mapper).await
}

async fn forward<L: ChassisLink>(
    command: ChassisCommand,
    mapper: &CommandMapper<'_, L>,
) -> bool {
    match mapper.send(command.direction, command.speed).await {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(%error, ?command, "chassis command dropped");
            false
        }
    }
}

/// Forwarding task: drains the queue in admission order until `shutdown` is
/// raised.
///
/// A request in flight always completes. After shutdown, whatever is still
/// queued is forwarded before returning.
pub async fn forward_commands<L: ChassisLink>(
    queue: &CommandQueue,
    mapper: &CommandMapper<'_, L>,
    shutdown: &ShutdownSignal,
) {
    loop {
        match select(queue.receive(), shutdown.wait()).await {
            Either::First(command) => {
                forward(command, mapper).await;
            }
            Either::Second(()) => break,
        }
    }

    let mut flushed = 0usize;
    while let Ok(command) = queue.try_receive() {
        forward(command, mapper).await;
        flushed += 1;
    }
    tracing::info!(flushed, "command forwarding stopped");
}
