pub mod capture;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod preview;
pub mod sensor;
pub mod store;

use capture::{CaptureSession, SyncGroup};
use config::{DisplayConfig, RecorderConfig, SessionConfig, SourceConfig};
use sensor::dummy::SyntheticSensor;
use sensor::polling::PollingSource;
use preview::feed::PreviewFeed;
use sensor::source::{FrameSource, LiveSource};
use store::FrameStore;

/// Install the `log` backend that `tracing` events are forwarded to.
///
/// Defaults to `info` (`debug` when `verbose`); `RUST_LOG` still wins.
pub fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// Create the frame source for a session.
///
/// When `DUMMY_CAMERA=1` is set, a synthetic sensor is used instead of
/// whatever the config asks for.
pub fn build_source(source: &SourceConfig) -> Box<dyn FrameSource> {
    if SyntheticSensor::is_enabled() {
        let (width, height) = match source {
            SourceConfig::Dummy { width, height } => (*width, *height),
            SourceConfig::Polling { .. } => (1280, 720),
        };
        return Box::new(LiveSource::new(SyntheticSensor::new(width, height)));
    }

    match source {
        SourceConfig::Polling {
            dir,
            color_file,
            depth_file,
        } => Box::new(PollingSource::with_files(dir, color_file, depth_file)),
        SourceConfig::Dummy { width, height } => {
            Box::new(LiveSource::new(SyntheticSensor::new(*width, *height)))
        }
    }
}

/// Create an idle session with its output tree prepared.
///
/// Output directory problems are logged and kept on the store; the session
/// is still built so acquisition and display work without a writable disk.
pub fn build_session(config: &RecorderConfig, session: &SessionConfig) -> CaptureSession {
    let layout = session.layout(config.buffer_capacity);
    let store = FrameStore::prepare(layout, config.identifier, config.jpeg_quality);
    if !store.setup_errors().is_empty() {
        tracing::warn!(
            "{}: {} output directory problem(s), snapshots will fail until fixed",
            session.name,
            store.setup_errors().len()
        );
    }
    CaptureSession::new(
        session.name.clone(),
        build_source(&session.source),
        store,
        config.buffer_capacity,
    )
}

/// Build one session per configured entry. `None` when none are configured.
pub fn build_sync_group(config: &RecorderConfig) -> Option<SyncGroup> {
    let sessions = config
        .sessions
        .iter()
        .map(|session| build_session(config, session))
        .collect();
    SyncGroup::new(sessions)
}

/// Display feed for `session`, scaled to fit the configured display area.
pub fn preview_feed(session: &CaptureSession, display: &DisplayConfig) -> PreviewFeed {
    PreviewFeed::new(session.subscribe(), display.width, display.height)
}
