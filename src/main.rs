use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use rgbd_recorder::config::{ConfigStore, RecorderConfig, DEFAULT_CONFIG_FILE};
use rgbd_recorder::control::{dispatch, Command};
use rgbd_recorder::sensor::dummy::SyntheticSensor;
use rgbd_recorder::sensor::polling::PollingSource;
use rgbd_recorder::sensor::publisher::StreamPublisher;
use rgbd_recorder::sensor::source::{FrameSource, LiveSource};
use rgbd_recorder::store::frame_store::DEFAULT_JPEG_QUALITY;

#[derive(Parser, Debug)]
#[command(name = "rgbd-recorder", about = "RGB-D capture with rolling depth averaging")]
struct Args {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cli,
}

#[derive(Subcommand, Debug)]
enum Cli {
    /// Run the configured sessions; commands are read from stdin
    Record {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Use the master/sub preset when no config file exists
        #[arg(long)]
        sync: bool,
    },

    /// Publish frames into a transport directory until stdin closes
    Stream {
        #[arg(long, default_value = "camera_stream")]
        dir: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
        #[arg(long, default_value_t = 30)]
        fps: u32,
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,
        /// Re-publish frames read from another transport directory
        #[arg(long)]
        relay_from: Option<PathBuf>,
    },

    /// Write a config file with default values
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Two sessions (master/sub) instead of one
        #[arg(long)]
        sync: bool,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    rgbd_recorder::init_logging(args.verbose);

    let result = match args.command {
        Cli::Record { config, sync } => cmd_record(config, sync),
        Cli::Stream {
            dir,
            width,
            height,
            fps,
            quality,
            relay_from,
        } => cmd_stream(dir, width, height, fps, quality, relay_from),
        Cli::InitConfig {
            config,
            sync,
            force,
        } => cmd_init_config(config, sync, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_record(path: PathBuf, sync: bool) -> Result<(), String> {
    let store = ConfigStore::new(path);
    let config = if sync && !store.path().exists() {
        RecorderConfig::sync_preset()
    } else {
        store.load()?
    };

    let group = rgbd_recorder::build_sync_group(&config)
        .ok_or_else(|| "no sessions configured".to_string())?;
    for session in group.sessions() {
        tracing::info!("{}: {}", session.name(), session.source_description());
    }

    print!("{}", dispatch(&group, Command::Start));
    println!("commands: snap (s), start, stop, status, quit (q)");

    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|e| format!("stdin: {e}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => print!("{}", dispatch(&group, command)),
            Err(e) => println!("{e}"),
        }
    }

    print!("{}", dispatch(&group, Command::Quit));
    Ok(())
}

fn cmd_stream(
    dir: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    quality: u8,
    relay_from: Option<PathBuf>,
) -> Result<(), String> {
    let publisher = StreamPublisher::new(dir, quality);
    publisher.prepare().map_err(|e| e.to_string())?;

    let mut source: Box<dyn FrameSource> = match relay_from {
        Some(upstream) => Box::new(PollingSource::new(upstream)),
        None => {
            let interval = Duration::from_secs(1) / fps.max(1);
            Box::new(LiveSource::new(
                SyntheticSensor::new(width, height).with_frame_interval(interval),
            ))
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("stream-stdin".to_string())
            .spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().lock().read_line(&mut line);
                running.store(false, Ordering::Release);
            })
            .map_err(|e| format!("failed to spawn stdin watcher: {e}"))?;
    }

    println!("streaming into {}, press Enter to stop", publisher.dir().display());
    let published = publisher.run(source.as_mut(), &running);
    println!("published {published} frames");
    Ok(())
}

fn cmd_init_config(path: PathBuf, sync: bool, force: bool) -> Result<(), String> {
    let store = ConfigStore::new(path);
    if store.path().exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        ));
    }
    let config = if sync {
        RecorderConfig::sync_preset()
    } else {
        RecorderConfig::default()
    };
    store.save(&config)?;
    println!("wrote {}", store.path().display());
    Ok(())
}
