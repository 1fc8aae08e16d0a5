//! Chassis Control Client
//!
//! Translates panel intents into the chassis REST vocabulary and performs the
//! call over a [`ChassisLink`]. Every call leaves a "sent" line and exactly one
//! outcome line on the attached log observer, and every failure is returned to
//! the caller after it has been logged.

extern crate alloc;

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{cell::Cell, fmt};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::controllers::log::{LogMarker, LogSink};

/// Direction as the panel understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Direction {
    pub const fn is_stop(self) -> bool {
        matches!(self, Direction::Stop)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Stop => "stop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction segment of the `/robot/{direction}/{speed}` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiDirection {
    Forward,
    Reverse,
    TurnLeft,
    TurnRight,
    Start,
    Pause,
    Stop,
}

impl ApiDirection {
    /// Power endpoint direction. Power-off is a literal `stop`.
    pub const fn power(on: bool) -> Self {
        if on {
            ApiDirection::Start
        } else {
            ApiDirection::Stop
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ApiDirection::Forward => "forward",
            ApiDirection::Reverse => "reverse",
            ApiDirection::TurnLeft => "turn_left",
            ApiDirection::TurnRight => "turn_right",
            ApiDirection::Start => "start",
            ApiDirection::Pause => "pause",
            ApiDirection::Stop => "stop",
        }
    }
}

impl From<Direction> for ApiDirection {
    /// Movement mapping. A zeroed slider pauses the chassis instead of
    /// stopping it, so power stays on.
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ApiDirection::Forward,
            Direction::Backward => ApiDirection::Reverse,
            Direction::Left => ApiDirection::TurnLeft,
            Direction::Right => ApiDirection::TurnRight,
            Direction::Stop => ApiDirection::Pause,
        }
    }
}

impl fmt::Display for ApiDirection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to the nearest integer and clamp to the wire range `0..=100`.
///
/// NaN maps to `0`.
pub fn clamp_speed(speed: f32) -> u8 {
    if speed.is_nan() {
        return 0;
    }
    libm::roundf(speed).clamp(0.0, 100.0) as u8
}

/// Request target for a command.
pub fn command_path(
    direction: ApiDirection,
    speed: u8,
) -> String {
    format!("/robot/{direction}/{speed}")
}

/// Raw HTTP outcome reported by a [`ChassisLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResponse {
    /// `true` for a 2xx status.
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

/// Errors surfaced by [`CommandMapper`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChassisError {
    /// The chassis answered with a non-success status.
    #[error("{action} failed: {status_text}")]
    Request {
        action: &'static str,
        status: u16,
        status_text: String,
    },
    /// The request never completed, or the body was not JSON.
    #[error("{0}")]
    Transport(String),
}

/// Transport performing a single `GET` against the chassis API.
///
/// `path` is always of the form `/robot/{direction}/{speed}`; the link owns
/// the base URL. `Err` carries the transport's own message.
#[allow(async_fn_in_trait)]
pub trait ChassisLink {
    async fn get(
        &self,
        path: &str,
    ) -> Result<LinkResponse, String>;
}

const MOVE_ACTION: &str = "chassis control command";
const POWER_ACTION: &str = "power state change";

/// Maps panel intents to chassis calls.
///
/// Holds a single optional log observer. Attaching replaces the previous one;
/// with no observer attached logging is a no-op.
pub struct CommandMapper<'a, L> {
    link: L,
    observer: Mutex<CriticalSectionRawMutex, Cell<Option<&'a dyn LogSink>>>,
}

impl<'a, L: ChassisLink> CommandMapper<'a, L> {
    pub const fn new(link: L) -> Self {
        Self {
            link,
            observer: Mutex::new(Cell::new(None)),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn attach_observer(
        &self,
        sink: &'a dyn LogSink,
    ) {
        self.observer.lock(|slot| slot.set(Some(sink)));
    }

    pub fn detach_observer(&self) {
        self.observer.lock(|slot| slot.set(None));
    }

    fn note(
        &self,
        marker: LogMarker,
        text: &str,
    ) {
        if let Some(sink) = self.observer.lock(|slot| slot.get()) {
            sink.record(marker, text);
        }
    }

    /// Send a movement command.
    ///
    /// `speed` is rounded and clamped before it reaches the path.
    pub async fn send(
        &self,
        direction: Direction,
        speed: f32,
    ) -> Result<Value, ChassisError> {
        let api = ApiDirection::from(direction);
        let speed = clamp_speed(speed);
        let path = command_path(api, speed);

        self.note(LogMarker::Sent, &format!("request: GET {path}"));
        tracing::debug!(direction = %api, speed, "sending chassis control command");

        self.exchange(&path, MOVE_ACTION).await
    }

    /// Switch chassis power with `start` / `stop` at speed 0.
    pub async fn set_power(
        &self,
        on: bool,
    ) -> Result<Value, ChassisError> {
        let api = ApiDirection::power(on);
        let path = command_path(api, 0);
        let label = if on { "power on" } else { "power off" };

        self.note(LogMarker::Sent, &format!("request: GET {path} ({label})"));
        tracing::debug!(direction = %api, "setting power state");

        self.exchange(&path, POWER_ACTION).await
    }

    async fn exchange(
        &self,
        path: &str,
        action: &'static str,
    ) -> Result<Value, ChassisError> {
        let result = self.fetch(path, action).await;
        match &result {
            Ok(body) => self.note(LogMarker::Ok, &format!("response: {body}")),
            Err(error) => {
                tracing::error!(%error, path, "chassis request failed");
                self.note(LogMarker::Error, &format!("error: {error}"));
            }
        }
        result
    }

    async fn fetch(
        &self,
        path: &str,
        action: &'static str,
    ) -> Result<Value, ChassisError> {
        let response = self
            .link
            .get(path)
            .await
            .map_err(ChassisError::Transport)?;

        if !response.ok {
            return Err(ChassisError::Request {
                action,
                status: response.status,
                status_text: response.status_text,
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| ChassisError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::controllers::log::{SharedLog, TimeOfDay};
    use core::cell::RefCell;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    struct ScriptedLink {
        replies: RefCell<VecDeque<Result<LinkResponse, String>>>,
        paths: RefCell<Vec<String>>,
    }

    impl ScriptedLink {
        fn new(replies: Vec<Result<LinkResponse, String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                paths: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChassisLink for ScriptedLink {
        async fn get(
            &self,
            path: &str,
        ) -> Result<LinkResponse, String> {
            self.paths.borrow_mut().push(path.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted reply".into()))
        }
    }

    fn json(body: &str) -> Result<LinkResponse, String> {
        Ok(LinkResponse {
            ok: true,
            status: 200,
            status_text: "OK".into(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn status(code: u16, text: &str) -> Result<LinkResponse, String> {
        Ok(LinkResponse {
            ok: false,
            status: code,
            status_text: text.into(),
            body: Vec::new(),
        })
    }

    fn noon() -> TimeOfDay {
        TimeOfDay::new(12, 0, 5)
    }

    #[test]
    fn test_direction_mapping_is_total() {
        let table = [
            (Direction::Forward, "forward"),
            (Direction::Backward, "reverse"),
            (Direction::Left, "turn_left"),
            (Direction::Right, "turn_right"),
            (Direction::Stop, "pause"),
        ];
        for (page, wire) in table {
            assert_eq!(ApiDirection::from(page).as_str(), wire);
        }
        assert_eq!(ApiDirection::power(true), ApiDirection::Start);
        assert_eq!(ApiDirection::power(false), ApiDirection::Stop);
    }

    #[test]
    fn test_clamp_speed_bounds_and_monotonic() {
        assert_eq!(clamp_speed(-12.0), 0);
        assert_eq!(clamp_speed(0.4), 0);
        assert_eq!(clamp_speed(0.5), 1);
        assert_eq!(clamp_speed(24.6), 25);
        assert_eq!(clamp_speed(100.4), 100);
        assert_eq!(clamp_speed(1.0e9), 100);
        assert_eq!(clamp_speed(f32::NAN), 0);
        assert_eq!(clamp_speed(f32::INFINITY), 100);

        let mut previous = 0;
        let mut s = -20.0f32;
        while s < 130.0 {
            let clamped = clamp_speed(s);
            assert!(clamped <= 100);
            assert!(clamped >= previous, "not monotonic at {s}");
            previous = clamped;
            s += 0.25;
        }
    }

    #[test]
    fn test_send_builds_path_and_logs_response() {
        let log = SharedLog::new(noon);
        let mapper = CommandMapper::new(ScriptedLink::new(vec![json(r#"{"code":0}"#)]));
        mapper.attach_observer(&log);

        let body = block_on(mapper.send(Direction::Stop, 24.6)).unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(mapper.link().paths.borrow().as_slice(), ["/robot/pause/25"]);

        let lines: Vec<String> = log.entries().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            lines,
            [
                r#"[12:00:05] ✅ response: {"code":0}"#,
                "[12:00:05] 📤 request: GET /robot/pause/25",
            ]
        );
    }

    #[test]
    fn test_non_success_status_is_logged_and_returned() {
        let log = SharedLog::new(noon);
        let mapper = CommandMapper::new(ScriptedLink::new(vec![status(503, "Service Unavailable")]));
        mapper.attach_observer(&log);

        let err = block_on(mapper.send(Direction::Forward, 40.0)).unwrap_err();
        assert_eq!(
            err,
            ChassisError::Request {
                action: "chassis control command",
                status: 503,
                status_text: "Service Unavailable".into(),
            }
        );
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].marker, LogMarker::Error);
        assert!(entries[0].text.contains("Service Unavailable"));
    }

    #[test]
    fn test_transport_and_parse_failures_share_a_path() {
        let log = SharedLog::new(noon);
        let mapper = CommandMapper::new(ScriptedLink::new(vec![
            Err("connection refused".into()),
            json("not json"),
        ]));
        mapper.attach_observer(&log);

        let err = block_on(mapper.send(Direction::Left, 10.0)).unwrap_err();
        assert_eq!(err, ChassisError::Transport("connection refused".into()));

        let err = block_on(mapper.send(Direction::Left, 10.0)).unwrap_err();
        assert!(matches!(err, ChassisError::Transport(_)));

        let markers: Vec<LogMarker> = log.entries().iter().map(|e| e.marker).collect();
        assert_eq!(
            markers,
            [LogMarker::Error, LogMarker::Sent, LogMarker::Error, LogMarker::Sent]
        );
    }

    #[test]
    fn test_power_uses_start_and_literal_stop() {
        let log = SharedLog::new(noon);
        let mapper = CommandMapper::new(ScriptedLink::new(vec![json("{}"), json("{}")]));
        mapper.attach_observer(&log);

        block_on(mapper.set_power(true)).unwrap();
        block_on(mapper.set_power(false)).unwrap();
        assert_eq!(
            mapper.link().paths.borrow().as_slice(),
            ["/robot/start/0", "/robot/stop/0"]
        );
        assert_eq!(
            log.entries()[1].text,
            "request: GET /robot/stop/0 (power off)"
        );
    }

    #[test]
    fn test_detached_observer_is_silent() {
        let log = SharedLog::new(noon);
        let mapper = CommandMapper::new(ScriptedLink::new(vec![json("{}")]));
        mapper.attach_observer(&log);
        mapper.detach_observer();

        block_on(mapper.send(Direction::Right, 5.0)).unwrap();
        assert!(log.is_empty());
    }
}
