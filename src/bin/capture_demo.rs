//! capture_demo - guided three-pose face capture and registration
//!
//! Pulls frames from the configured source (the synthetic camera by default),
//! runs the capture session until front, left and right poses are captured,
//! stores the photos and prints the issued login code.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use marivor_capture::ui;
use marivor_capture::{
    drive, CameraSource, CaptureConfig, CaptureSession, RegistrationStore,
    SqliteRegistrationStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "MARIVOR_CAPTURE_CONFIG")]
    config: Option<PathBuf>,
    /// Registration database path (overrides config).
    #[arg(long)]
    db: Option<String>,
    /// Frame source: stub://face, stub://empty, or an image directory.
    #[arg(long)]
    source: Option<String>,
    /// Seed for quality jitter, user ids and login codes.
    #[arg(long)]
    seed: Option<u64>,
    /// Give up after this many frames.
    #[arg(long, default_value_t = 600)]
    max_frames: u64,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty);

    let mut cfg = match &args.config {
        Some(path) => CaptureConfig::load_from(path)?,
        None => CaptureConfig::load()?,
    };
    if let Some(db) = args.db {
        cfg.db_path = db;
    }
    if let Some(source) = args.source {
        cfg.source.url = source;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    let mut session = CaptureSession::with_heuristic(cfg.session_config()?);
    let mut source = CameraSource::new(cfg.source_config())?;
    {
        let _stage = ui.stage("Load face detector");
        session.initialize()?;
    }
    {
        let _stage = ui.stage("Connect camera");
        source.connect()?;
    }

    let report = {
        let mut stage = ui.stage("Capture poses");
        drive(
            &mut session,
            &mut source,
            Some(args.max_frames),
            &cancel,
            |outcome| stage.frame(outcome),
        )?
    };
    log::info!(
        "capture finished: {} frames read, {} skipped",
        report.frames_read,
        report.frames_skipped
    );

    if report.cancelled {
        return Err(anyhow!("capture cancelled"));
    }
    if !report.completed {
        let feedback = session.feedback();
        return Err(anyhow!(
            "no complete capture after {} frames (stuck at {}: {})",
            report.frames_read,
            feedback.step.title(),
            feedback.instruction
        ));
    }

    let captures = session.into_capture_set()?;
    let registration = {
        let _stage = ui.stage("Register face");
        let mut store = SqliteRegistrationStore::open_with(&cfg.db_path, cfg.seed)?;
        store.register(&captures)?
    };

    for photo in &registration.photos {
        log::info!(
            "stored {} ({} bytes, sha256 {})",
            photo.path,
            photo.byte_len,
            photo.sha256
        );
    }
    println!("username: {}", registration.username);
    println!("login code: {}", registration.login_code);
    Ok(())
}
