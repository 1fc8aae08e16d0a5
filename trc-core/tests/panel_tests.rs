use core::cell::RefCell;
use std::collections::VecDeque;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use trc_core::utils::{
    connection::client::{ChassisError, ChassisLink, CommandMapper, Direction, LinkResponse},
    controllers::{
        dispatcher::{forward_commands, forward_next, ChassisCommand, CommandQueue, ShutdownSignal},
        log::{LogMarker, TimeOfDay, LOG_CAPACITY},
        toggle_power,
        FrameSignal,
        Panel,
        PanelEvent,
        PanelLayout,
        PanelLinks,
        SharedLog,
        SharedPanel,
    },
    math::drag::{Axis, AxisSample},
};

/// In-memory chassis answering from a script, recording every path.
pub struct ScriptedLink {
    replies: RefCell<VecDeque<Result<LinkResponse, String>>>,
    paths: RefCell<Vec<String>>,
}

impl ScriptedLink {
    pub fn new(replies: Vec<Result<LinkResponse, String>>) -> Self {
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

/// A `200 OK` with a small JSON body.
pub fn ok() -> Result<LinkResponse, String> {
    Ok(LinkResponse {
        ok: true,
        status: 200,
        status_text: "OK".into(),
        body: br#"{"result":"ok"}"#.to_vec(),
    })
}

/// A non-success status.
pub fn failed(text: &str) -> Result<LinkResponse, String> {
    Ok(LinkResponse {
        ok: false,
        status: 500,
        status_text: text.into(),
        body: Vec::new(),
    })
}

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn noon() -> TimeOfDay {
    TimeOfDay::new(12, 30, 0)
}

fn drain(queue: &CommandQueue) -> Vec<ChassisCommand> {
    let mut out = Vec::new();
    while let Ok(command) = queue.try_receive() {
        out.push(command);
    }
    out
}

#[test]
fn vertical_drag_scenario_end_to_end() {
    let log = SharedLog::new(noon);
    let queue = CommandQueue::new();
    let frames = FrameSignal::new();
    let mapper = CommandMapper::new(ScriptedLink::new(vec![ok(), ok(), ok(), ok()]));
    mapper.attach_observer(&log);

    let panel: SharedPanel<'_> = Mutex::new(RefCell::new(Panel::new(
        PanelLayout::default(),
        50,
        PanelLinks {
            log: &log,
            queue: &queue,
            frames: &frames,
        },
    )));

    assert_eq!(block_on(toggle_power(&panel, &mapper)), Ok(true));

    // half travel up on a 320 / 64 track is pointer 96
    panel.lock(|p| {
        let mut p = p.borrow_mut();
        p.apply(
            PanelEvent::Press {
                axis: Axis::Vertical,
                at: 96.0,
            },
            at(1_000),
        )
        .unwrap();
        assert!(!p.drag(Axis::Vertical, 100.0, at(1_040)));
        assert_eq!(p.status().speed, 23);
    });

    let first = drain(&queue);
    assert_eq!(
        first,
        [ChassisCommand {
            direction: Direction::Forward,
            speed: 25.0
        }]
    );

    panel.lock(|p| {
        let mut p = p.borrow_mut();
        assert!(p.release(Axis::Vertical));
        let mut t = 1_050;
        while p.frame(at(t)) {
            t += 16;
        }
        assert_eq!(p.session().axis(Axis::Vertical), AxisSample::STOP);
    });

    let tail = drain(&queue);
    assert_eq!(
        tail.last(),
        Some(&ChassisCommand {
            direction: Direction::Stop,
            speed: 0.0
        })
    );

    // push the last one through the forwarding half and check the wire path
    queue.try_send(*tail.last().unwrap()).unwrap();
    assert!(block_on(forward_next(&queue, &mapper)));
    assert_eq!(
        mapper.link().paths.borrow().last().map(String::as_str),
        Some("/robot/pause/0")
    );
}

#[test]
fn failed_power_toggle_leaves_flag_unchanged() {
    let log = SharedLog::new(noon);
    let queue = CommandQueue::new();
    let frames = FrameSignal::new();
    let mapper = CommandMapper::new(ScriptedLink::new(vec![failed("Internal Server Error")]));
    mapper.attach_observer(&log);

    let panel: SharedPanel<'_> = Mutex::new(RefCell::new(Panel::new(
        PanelLayout::default(),
        50,
        PanelLinks {
            log: &log,
            queue: &queue,
            frames: &frames,
        },
    )));

    let err = block_on(toggle_power(&panel, &mapper)).unwrap_err();
    assert!(matches!(err, ChassisError::Request { status: 500, .. }));
    assert!(!panel.lock(|p| p.borrow().session().is_powered()));

    let entries = log.entries();
    assert_eq!(entries[0].marker, LogMarker::Error);
    assert_eq!(
        entries[0].to_string(),
        "[12:30:00] ❌ error: power state change failed: Internal Server Error"
    );
    assert_eq!(
        entries[1].to_string(),
        "[12:30:00] 📤 request: GET /robot/start/0 (power on)"
    );
}

#[test]
fn forwarding_swallows_failures_and_keeps_order() {
    let log = SharedLog::new(noon);
    let queue = CommandQueue::new();
    let mapper = CommandMapper::new(ScriptedLink::new(vec![
        Err("connection reset".into()),
        ok(),
    ]));
    mapper.attach_observer(&log);

    queue
        .try_send(ChassisCommand {
            direction: Direction::Left,
            speed: 12.4,
        })
        .unwrap();
    queue
        .try_send(ChassisCommand {
            direction: Direction::Backward,
            speed: 140.0,
        })
        .unwrap();

    assert!(!block_on(forward_next(&queue, &mapper)));
    assert!(block_on(forward_next(&queue, &mapper)));
    assert_eq!(
        mapper.link().paths.borrow().as_slice(),
        ["/robot/turn_left/12", "/robot/reverse/100"]
    );
    assert_eq!(log.len(), 4);
}

#[test]
fn shutdown_flushes_queued_commands_in_order() {
    let queue = CommandQueue::new();
    let shutdown = ShutdownSignal::new();
    let mapper = CommandMapper::new(ScriptedLink::new(vec![ok(), failed("busy"), ok()]));

    for (direction, speed) in [
        (Direction::Forward, 25.0),
        (Direction::Right, 40.0),
        (Direction::Stop, 0.0),
    ] {
        queue.try_send(ChassisCommand { direction, speed }).unwrap();
    }
    shutdown.signal(());

    block_on(forward_commands(&queue, &mapper, &shutdown));
    assert!(queue.is_empty());
    assert_eq!(
        mapper.link().paths.borrow().as_slice(),
        ["/robot/forward/25", "/robot/turn_right/40", "/robot/pause/0"]
    );
}

#[test]
fn request_log_is_bounded_newest_first() {
    let log = SharedLog::new(noon);
    let replies = (0..20).map(|_| ok()).collect();
    let mapper = CommandMapper::new(ScriptedLink::new(replies));
    mapper.attach_observer(&log);

    for speed in 0..20 {
        block_on(mapper.send(Direction::Forward, speed as f32)).unwrap();
    }

    let entries = log.entries();
    assert_eq!(entries.len(), LOG_CAPACITY);
    assert_eq!(entries[0].marker, LogMarker::Ok);
    assert_eq!(entries[1].text, "request: GET /robot/forward/19");
    assert_eq!(entries[LOG_CAPACITY - 1].text, "request: GET /robot/forward/5");
}
