//! Full path: streamer -> transport directory -> polling session -> store,
//! for a master/sub pair driven by one trigger.

use std::path::Path;
use std::time::{Duration, Instant};

use rgbd_recorder::capture::{SessionError, SyncGroup};
use rgbd_recorder::config::{RecorderConfig, SourceConfig};
use rgbd_recorder::sensor::publisher::StreamPublisher;
use rgbd_recorder::sensor::types::Frame;
use tempfile::TempDir;

fn uniform_frame(depth_mm: u16) -> Frame {
    Frame::from_raw(16, 12, vec![90; 16 * 12 * 3], vec![depth_mm; 16 * 12], 0).unwrap()
}

fn sync_config(root: &Path) -> RecorderConfig {
    let mut config = RecorderConfig::sync_preset();
    config.buffer_capacity = 5;
    for session in &mut config.sessions {
        if let SourceConfig::Polling { dir, .. } = &mut session.source {
            *dir = root.join(&*dir);
        }
        session.output = root.join(&session.output);
    }
    config
}

fn publish(root: &Path, depth_mm: u16) {
    for transport in ["camera_stream_master", "camera_stream_sub"] {
        let publisher = StreamPublisher::new(root.join(transport), 90);
        publisher.prepare().unwrap();
        publisher.publish(&uniform_frame(depth_mm)).unwrap();
    }
}

fn wait_for_full_window(group: &SyncGroup, capacity: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while group
        .sessions()
        .iter()
        .any(|s| s.buffered_depth_frames() < capacity)
    {
        assert!(Instant::now() < deadline, "timed out waiting for frames");
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn read_depth(path: &Path) -> Vec<u16> {
    image::open(path).unwrap().into_luma16().into_raw()
}

#[test]
fn snapshot_all_writes_both_trees() {
    let root = TempDir::new().unwrap();
    publish(root.path(), 1200);
    let config = sync_config(root.path());

    let group = rgbd_recorder::build_sync_group(&config).unwrap();
    assert!(group.start_all().iter().all(|o| o.is_ok()));
    wait_for_full_window(&group, 5);

    let outcomes = group.snapshot_all();
    assert!(group.stop_all().iter().all(|o| o.is_ok()));

    for (outcome, tree) in outcomes.iter().zip(["frames_master", "frames_sub"]) {
        let record = outcome.result.as_ref().unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.id, "1");

        let base = root.path().join(tree);
        assert!(base.join("color/1.jpg").is_file());
        assert_eq!(read_depth(&base.join("depth/raw/1.png")), vec![1200; 16 * 12]);
        assert_eq!(
            read_depth(&base.join("depth/mean_5/1.png")),
            vec![1200; 16 * 12]
        );
    }
}

#[test]
fn numbering_resumes_after_restart() {
    let root = TempDir::new().unwrap();
    publish(root.path(), 800);
    let config = sync_config(root.path());

    {
        let group = rgbd_recorder::build_sync_group(&config).unwrap();
        group.start_all();
        wait_for_full_window(&group, 5);
        group.snapshot_all();
        group.snapshot_all();
        group.stop_all();
    }

    let group = rgbd_recorder::build_sync_group(&config).unwrap();
    for session in group.sessions() {
        assert_eq!(session.next_sequence(), 3);
    }
    group.start_all();
    wait_for_full_window(&group, 5);
    let outcomes = group.snapshot_all();
    group.stop_all();

    for outcome in &outcomes {
        assert_eq!(outcome.result.as_ref().unwrap().sequence, 3);
    }
    assert!(root.path().join("frames_sub/color/3.jpg").is_file());
}

#[test]
fn missing_transport_keeps_member_waiting() {
    let root = TempDir::new().unwrap();
    let master = StreamPublisher::new(root.path().join("camera_stream_master"), 90);
    master.prepare().unwrap();
    master.publish(&uniform_frame(1500)).unwrap();
    let config = sync_config(root.path());

    let group = rgbd_recorder::build_sync_group(&config).unwrap();
    group.start_all();
    let master_session = group.get("master").unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while master_session.latest_frame().is_none() {
        assert!(Instant::now() < deadline, "timed out waiting for master");
        std::thread::sleep(Duration::from_millis(2));
    }

    let outcomes = group.snapshot_all();
    group.stop_all();

    assert_eq!(outcomes[0].result.as_ref().unwrap().sequence, 1);
    assert!(matches!(outcomes[1].result, Err(SessionError::Buffer(_))));
    assert!(group.get("sub").unwrap().diagnostics().miss_count > 0);
}
