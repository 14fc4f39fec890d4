use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::config::settings::Settings;
use crate::monitoring::cycle_report::{CycleReport, SourceReport};
use crate::monitoring::error::MonitorError;
use crate::monitoring::monitoring_session::SessionStatus;
use crate::monitoring::orchestrator::{Orchestrator, SourceStatus};
use crate::shared::timestamp::Clock;

/// Something subscribers hear about without asking.
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    Cycle(CycleReport),
    SessionChanged(SessionStatus),
}

enum Command {
    Start(Sender<bool>),
    Stop(Sender<bool>),
    AnalyzeNow(String, Sender<Result<SourceReport, MonitorError>>),
    CaptureNow(String, Sender<Result<PathBuf, MonitorError>>),
    UpdateSettings(Box<Settings>, Sender<Result<(), MonitorError>>),
    Statuses(Sender<Vec<SourceStatus>>),
    Subscribe(Sender<MonitorEvent>),
    Shutdown,
}

/// Drives an [`Orchestrator`] on a dedicated thread.
///
/// Layout: `timer tick | handle commands → loop thread [orchestrator] → subscribers`
///
/// The orchestrator is only ever touched from the loop thread, so timer
/// ticks and manual operations never interleave mid-cycle. A tick that is
/// not due is a no-op.
pub struct MonitorLoop {
    handle: MonitorHandle,
    thread: std::thread::JoinHandle<Orchestrator>,
}

impl MonitorLoop {
    pub fn spawn(orchestrator: Orchestrator, clock: Box<dyn Clock>, tick_interval: Duration) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let ticker = crossbeam_channel::tick(tick_interval);
        let thread =
            std::thread::spawn(move || run_loop(orchestrator, clock, ticker, command_rx));
        Self {
            handle: MonitorHandle {
                commands: command_tx,
            },
            thread,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Stops the loop after any in-flight cycle and returns the orchestrator.
    pub fn shutdown(self) -> Result<Orchestrator, MonitorError> {
        // The thread may already be gone; join reports how it ended.
        let _ = self.handle.commands.send(Command::Shutdown);
        self.thread.join().map_err(|_| MonitorError::LoopPanicked)
    }
}

/// Cloneable control surface for a running [`MonitorLoop`].
#[derive(Clone)]
pub struct MonitorHandle {
    commands: Sender<Command>,
}

impl MonitorHandle {
    /// Returns `true` if the session was inactive.
    pub fn start(&self) -> Result<bool, MonitorError> {
        self.request(Command::Start)
    }

    /// Returns `true` if the session was active. No cycle starts after this returns.
    pub fn stop(&self) -> Result<bool, MonitorError> {
        self.request(Command::Stop)
    }

    pub fn analyze_now(&self, source: &str) -> Result<SourceReport, MonitorError> {
        self.request(|reply| Command::AnalyzeNow(source.to_string(), reply))?
    }

    pub fn capture_now(&self, source: &str) -> Result<PathBuf, MonitorError> {
        self.request(|reply| Command::CaptureNow(source.to_string(), reply))?
    }

    pub fn update_settings(&self, settings: Settings) -> Result<(), MonitorError> {
        self.request(|reply| Command::UpdateSettings(Box::new(settings), reply))?
    }

    pub fn statuses(&self) -> Result<Vec<SourceStatus>, MonitorError> {
        self.request(Command::Statuses)
    }

    /// Events published after this call. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Result<Receiver<MonitorEvent>, MonitorError> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        self.commands
            .send(Command::Subscribe(event_tx))
            .map_err(|_| MonitorError::LoopClosed)?;
        Ok(event_rx)
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> Command) -> Result<T, MonitorError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(command(reply_tx))
            .map_err(|_| MonitorError::LoopClosed)?;
        reply_rx.recv().map_err(|_| MonitorError::LoopClosed)
    }
}

fn run_loop(
    mut orchestrator: Orchestrator,
    clock: Box<dyn Clock>,
    ticker: Receiver<std::time::Instant>,
    commands: Receiver<Command>,
) -> Orchestrator {
    let mut subscribers: Vec<Sender<MonitorEvent>> = Vec::new();
    loop {
        let running = crossbeam_channel::select! {
            recv(ticker) -> _ => {
                if let Some(report) = orchestrator.poll_all_sources(clock.now()) {
                    publish(&mut subscribers, MonitorEvent::Cycle(report));
                }
                true
            }
            recv(commands) -> command => match command {
                Ok(Command::Shutdown) | Err(_) => false,
                Ok(command) => {
                    handle_command(&mut orchestrator, clock.as_ref(), &mut subscribers, command);
                    true
                }
            },
        };
        if !running {
            break;
        }
    }
    if orchestrator.stop_monitoring() {
        publish(&mut subscribers, MonitorEvent::SessionChanged(SessionStatus::Inactive));
    }
    orchestrator
}

fn handle_command(
    orchestrator: &mut Orchestrator,
    clock: &dyn Clock,
    subscribers: &mut Vec<Sender<MonitorEvent>>,
    command: Command,
) {
    // Reply send errors mean the caller stopped waiting; nothing to do.
    match command {
        Command::Start(reply) => {
            let changed = orchestrator.start_monitoring();
            if changed {
                publish(subscribers, MonitorEvent::SessionChanged(SessionStatus::Active));
            }
            let _ = reply.send(changed);
        }
        Command::Stop(reply) => {
            let changed = orchestrator.stop_monitoring();
            if changed {
                publish(subscribers, MonitorEvent::SessionChanged(SessionStatus::Inactive));
            }
            let _ = reply.send(changed);
        }
        Command::AnalyzeNow(source, reply) => {
            let _ = reply.send(orchestrator.analyze_source_now(&source, clock.now()));
        }
        Command::CaptureNow(source, reply) => {
            let _ = reply.send(orchestrator.capture_and_save(&source, clock.now()));
        }
        Command::UpdateSettings(settings, reply) => {
            let _ = reply.send(orchestrator.update_settings(&settings));
        }
        Command::Statuses(reply) => {
            let _ = reply.send(orchestrator.source_statuses(clock.now()));
        }
        Command::Subscribe(events) => subscribers.push(events),
        Command::Shutdown => {}
    }
}

fn publish(subscribers: &mut Vec<Sender<MonitorEvent>>, event: MonitorEvent) {
    subscribers.retain(|s| s.send(event.clone()).is_ok());
}
