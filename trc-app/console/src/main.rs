use chrono::Timelike;
use clap::Parser;
use core::cell::RefCell;
use embassy_executor::{Executor, Spawner};
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::Channel,
};
use static_cell::StaticCell;
use std::io::BufRead;
use tracing::{error, info, warn};
use trc_core::mk_static;
use trc_core::utils::controllers::{
    forward_commands, log::HIGHLIGHTED_ENTRIES, session::SPEED_PRESETS, spring_back, toggle_power,
    CommandQueue, FrameSignal, Panel, PanelLayout, PanelLinks, SharedLog, SharedPanel,
    ShutdownSignal, TimeOfDay,
};
use trc_core::utils::math::drag::{SpeedBar, Track};
use trc_core::utils::{CommandMapper, Instant, PanelEvent};

mod link;
use link::HttpLink;

type Mapper = CommandMapper<'static, HttpLink>;

/// Raw console lines; `None` once stdin is closed.
static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, Option<String>, 4> = Channel::new();

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// chassis API root
    #[clap(long, default_value = "http://192.168.8.179:8080")]
    base_url: String,
    /// initial speed cap
    #[clap(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    max_speed: u8,
    /// pointer coordinate where both slider tracks begin
    #[clap(long, default_value_t = 0.0)]
    track_start: f32,
    /// slider track length in pointer units
    #[clap(long, default_value_t = 320.0)]
    track_length: f32,
    /// slider handle length in pointer units
    #[clap(long, default_value_t = 64.0)]
    handle_length: f32,
    /// pointer coordinate where the speed cap bar begins
    #[clap(long, default_value_t = 0.0)]
    speed_bar_start: f32,
    /// width of the speed cap bar in pointer units
    #[clap(long, default_value_t = 200.0)]
    speed_bar_width: f32,
}

impl Opts
{
    fn layout(&self) -> PanelLayout {
        let track = Track::new(self.track_start, self.track_length, self.handle_length);
        PanelLayout {
            vertical: track,
            horizontal: track,
            speed_bar: SpeedBar::new(self.speed_bar_start, self.speed_bar_width),
        }
    }
}

fn local_time() -> TimeOfDay {
    let now = chrono::Local::now();
    TimeOfDay::new(now.hour() as u8, now.minute() as u8, now.second() as u8)
}

#[embassy_executor::task]
async fn forward_task(
    queue: &'static CommandQueue,
    mapper: &'static Mapper,
    shutdown: &'static ShutdownSignal,
    idle: &'static ShutdownSignal,
) {
    forward_commands(queue, mapper, shutdown).await;
    idle.signal(());
}

#[embassy_executor::task]
async fn frame_task(
    panel: &'static SharedPanel<'static>,
    frames: &'static FrameSignal,
    teardown: &'static FrameSignal,
) {
    spring_back(panel, frames, teardown).await;
    info!("frame loop stopped");
}

fn print_log(log: &SharedLog) {
    let entries = log.entries();
    if entries.is_empty() {
        println!("(no log entries)");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let mark = if i < HIGHLIGHTED_ENTRIES { '>' } else { ' ' };
        println!("{mark} {entry}");
    }
}

async fn handle_line(
    line: &str,
    panel: &'static SharedPanel<'static>,
    mapper: &'static Mapper,
    log: &'static SharedLog,
) {
    let event = match serde_json::from_str::<PanelEvent>(line) {
        Ok(event) => event,
        Err(error) => {
            warn!(?error, "invalid panel event");
            return;
        }
    };

    match event {
        PanelEvent::Power => match toggle_power(panel, mapper).await {
            Ok(on) => info!("power {}", if on { "on" } else { "off" }),
            Err(error) => error!(%error, "power toggle failed"),
        },
        PanelEvent::Status => println!("{}", panel.lock(|p| p.borrow().status())),
        PanelEvent::ShowLog => print_log(log),
        other => {
            if let Err(error) = panel.lock(|p| p.borrow_mut().apply(other, Instant::now())) {
                warn!(%error, ?other, "event rejected");
            }
        }
    }
}

fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => embassy_futures::block_on(INPUT_CHANNEL.send(Some(line))),
                Err(error) => {
                    error!(?error, "stdin read failed");
                    break;
                }
            }
        }
        embassy_futures::block_on(INPUT_CHANNEL.send(None));
    });
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();

    let log: &'static SharedLog = mk_static!(SharedLog, SharedLog::new(local_time));
    let queue: &'static CommandQueue = mk_static!(CommandQueue, CommandQueue::new());
    let frames: &'static FrameSignal = mk_static!(FrameSignal, FrameSignal::new());
    let teardown: &'static FrameSignal = mk_static!(FrameSignal, FrameSignal::new());
    let shutdown: &'static ShutdownSignal = mk_static!(ShutdownSignal, ShutdownSignal::new());
    let idle: &'static ShutdownSignal = mk_static!(ShutdownSignal, ShutdownSignal::new());
    let mapper: &'static Mapper =
        mk_static!(Mapper, CommandMapper::new(HttpLink::new(&opts.base_url)));
    mapper.attach_observer(log);

    let panel: &'static SharedPanel<'static> = mk_static!(
        SharedPanel<'static>,
        Mutex::new(RefCell::new(Panel::new(
            opts.layout(),
            opts.max_speed,
            PanelLinks { log, queue, frames },
        )))
    );

    if let Err(e) = spawner.spawn(forward_task(queue, mapper, shutdown, idle)) {
        error!("failed to spawn forwarding task: {:?}", e);
        return;
    }
    if let Err(e) = spawner.spawn(frame_task(panel, frames, teardown)) {
        error!("failed to spawn frame task: {:?}", e);
        return;
    }

    spawn_stdin_reader();
    info!("Panel ready, sending to {}", opts.base_url);
    info!("speed presets: {:?}", SPEED_PRESETS);

    while let Some(line) = INPUT_CHANNEL.receive().await {
        handle_line(line.trim(), panel, mapper, log).await;
    }

    info!("input closed, tearing down");
    teardown.signal(());
    embassy_futures::yield_now().await;
    shutdown.signal(());
    idle.wait().await;
    mapper.detach_observer();
    print_log(log);
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        if let Err(e) = spawner.spawn(main_task(spawner)) {
            error!("failed to spawn main task: {:?}", e);
        }
    });
}
