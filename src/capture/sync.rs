//! Fan-out of operator commands to several independent sessions.
//!
//! Members share the command, never the data: each keeps its own source,
//! depth window, store and sequence counter. Commands run on every member
//! concurrently and each member's outcome is reported separately, so one
//! sensor failing or stalling never prevents the others from completing.

use super::error::{Result, SessionError};
use super::session::{CaptureSession, SessionStatus};
use crate::store::SnapshotRecord;

/// Per-member result of a fanned-out command.
#[derive(Debug)]
pub struct MemberOutcome<T> {
    pub session: String,
    pub result: Result<T>,
}

impl<T> MemberOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Ordered set of capture sessions driven by one trigger.
pub struct SyncGroup {
    sessions: Vec<CaptureSession>,
}

impl SyncGroup {
    /// Build a group. Returns `None` for an empty list.
    pub fn new(sessions: Vec<CaptureSession>) -> Option<Self> {
        if sessions.is_empty() {
            return None;
        }
        Some(Self { sessions })
    }

    /// A group of exactly one session.
    pub fn single(session: CaptureSession) -> Self {
        Self {
            sessions: vec![session],
        }
    }

    pub fn sessions(&self) -> &[CaptureSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look a member up by name.
    pub fn get(&self, name: &str) -> Option<&CaptureSession> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    pub fn statuses(&self) -> Vec<(String, SessionStatus)> {
        self.sessions
            .iter()
            .map(|s| (s.name().to_string(), s.status()))
            .collect()
    }

    pub fn start_all(&self) -> Vec<MemberOutcome<()>> {
        self.fan_out(CaptureSession::start)
    }

    pub fn stop_all(&self) -> Vec<MemberOutcome<()>> {
        self.fan_out(CaptureSession::stop)
    }

    pub fn snapshot_all(&self) -> Vec<MemberOutcome<SnapshotRecord>> {
        self.fan_out(CaptureSession::snapshot)
    }

    /// Run `op` on every member concurrently, outcomes in member order.
    fn fan_out<T, F>(&self, op: F) -> Vec<MemberOutcome<T>>
    where
        T: Send,
        F: Fn(&CaptureSession) -> Result<T> + Sync,
    {
        let op = &op;
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .sessions
                .iter()
                .map(|session| (session.name(), scope.spawn(move || op(session))))
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| MemberOutcome {
                    session: name.to_string(),
                    result: handle
                        .join()
                        .unwrap_or_else(|_| Err(SessionError::SourceLost(name.to_string()))),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::dummy::SyntheticSensor;
    use crate::sensor::source::LiveSource;
    use crate::store::{FrameStore, IdPolicy, StoreLayout};
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn member(name: &str, output: &Path) -> CaptureSession {
        let source = LiveSource::new(SyntheticSensor::new(16, 12));
        let store = FrameStore::prepare(StoreLayout::split(output, 30), IdPolicy::Sequence, 90);
        CaptureSession::new(name, Box::new(source), store, 30)
    }

    fn wait_for_first_frames(group: &SyncGroup) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while group
            .sessions()
            .iter()
            .any(|s| s.diagnostics().frame_count == 0)
        {
            assert!(Instant::now() < deadline, "timed out waiting for frames");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(SyncGroup::new(Vec::new()).is_none());
    }

    #[test]
    fn start_all_and_stop_all_cover_every_member() {
        let dir = TempDir::new().unwrap();
        let group = SyncGroup::new(vec![
            member("master", &dir.path().join("frames_master")),
            member("sub", &dir.path().join("frames_sub")),
        ])
        .unwrap();

        assert!(group.start_all().iter().all(MemberOutcome::is_ok));
        assert!(group
            .statuses()
            .iter()
            .all(|(_, status)| *status == SessionStatus::Running));

        assert!(group.stop_all().iter().all(MemberOutcome::is_ok));
        assert!(group
            .statuses()
            .iter()
            .all(|(_, status)| *status == SessionStatus::Idle));
    }

    #[test]
    fn snapshot_all_numbers_each_store_independently() {
        let dir = TempDir::new().unwrap();
        let group = SyncGroup::new(vec![
            member("master", &dir.path().join("frames_master")),
            member("sub", &dir.path().join("frames_sub")),
        ])
        .unwrap();
        group.start_all();
        wait_for_first_frames(&group);

        let outcomes = group.snapshot_all();
        group.stop_all();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].session, "master");
        assert_eq!(outcomes[1].session, "sub");
        for outcome in &outcomes {
            assert_eq!(outcome.result.as_ref().unwrap().sequence, 1);
        }
        assert!(dir.path().join("frames_master/color/1.jpg").is_file());
        assert!(dir.path().join("frames_sub/color/1.jpg").is_file());
    }

    #[test]
    fn failing_member_does_not_block_the_other() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("frames_master");
        std::fs::write(&blocked, b"occupied").unwrap();
        let group = SyncGroup::new(vec![
            member("master", &blocked),
            member("sub", &dir.path().join("frames_sub")),
        ])
        .unwrap();
        group.start_all();
        wait_for_first_frames(&group);

        let outcomes = group.snapshot_all();
        assert!(matches!(outcomes[0].result, Err(SessionError::Store(_))));
        assert_eq!(outcomes[1].result.as_ref().unwrap().sequence, 1);

        let sub = group.get("sub").unwrap();
        assert_eq!(sub.next_sequence(), 2);
        assert!(group.get("master").unwrap().is_running());
        group.stop_all();
    }

    #[test]
    fn stop_all_reports_idle_members_individually() {
        let dir = TempDir::new().unwrap();
        let group = SyncGroup::new(vec![
            member("master", &dir.path().join("a")),
            member("sub", &dir.path().join("b")),
        ])
        .unwrap();
        group.get("sub").unwrap().start().unwrap();

        let outcomes = group.stop_all();
        assert!(matches!(outcomes[0].result, Err(SessionError::NotRunning(_))));
        assert!(outcomes[1].is_ok());
    }

    #[test]
    fn single_group_has_one_member() {
        let dir = TempDir::new().unwrap();
        let group = SyncGroup::single(member("only", dir.path()));
        assert_eq!(group.len(), 1);
        assert!(!group.is_empty());
        assert!(group.get("only").is_some());
        assert!(group.get("missing").is_none());
    }
}
