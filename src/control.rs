//! Operator commands: text parsing and fan-out to a sync group.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::capture::{CaptureSession, MemberOutcome, SessionStatus, SyncGroup};

/// One operator action, applied to every member of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Snapshot,
    Status,
    /// Stop whatever is running and leave the command loop.
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "snap" | "s" | "photo" => Ok(Self::Snapshot),
            "status" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!(
                "unknown command '{other}' (expected start, stop, snap, status or quit)"
            )),
        }
    }
}

/// Apply `command` to every member and render one report line per member.
pub fn dispatch(group: &SyncGroup, command: Command) -> String {
    match command {
        Command::Start => render(&group.start_all(), |_| "started".to_string()),
        Command::Stop => render(&group.stop_all(), |_| "stopped".to_string()),
        Command::Snapshot => render(&group.snapshot_all(), |record| {
            format!(
                "saved #{} ({})",
                record.sequence,
                record.color_path.display()
            )
        }),
        Command::Status => {
            let mut report = String::new();
            for session in group.sessions() {
                let _ = writeln!(report, "{}: {}", session.name(), describe_status(session));
            }
            report
        }
        Command::Quit => {
            let mut report = String::new();
            for session in group.sessions() {
                let line = if session.is_running() {
                    match session.stop() {
                        Ok(()) => "stopped".to_string(),
                        Err(e) => format!("error: {e}"),
                    }
                } else {
                    "idle".to_string()
                };
                let _ = writeln!(report, "{}: {line}", session.name());
            }
            report
        }
    }
}

fn render<T>(outcomes: &[MemberOutcome<T>], ok: impl Fn(&T) -> String) -> String {
    let mut report = String::new();
    for outcome in outcomes {
        let line = match &outcome.result {
            Ok(value) => ok(value),
            Err(e) => format!("error: {e}"),
        };
        let _ = writeln!(report, "{}: {line}", outcome.session);
    }
    report
}

fn describe_status(session: &CaptureSession) -> String {
    let stats = session.diagnostics();
    match session.status() {
        SessionStatus::Idle => format!(
            "idle, next #{} ({})",
            session.next_sequence(),
            session.source_description()
        ),
        SessionStatus::Running => format!(
            "running, {} frames ({:.1} fps, {:.0}% misses), {} buffered, {} saved, next #{}",
            stats.frame_count,
            stats.fps,
            stats.miss_rate,
            session.buffered_depth_frames(),
            stats.snapshot_count,
            session.next_sequence()
        ),
    }
}
