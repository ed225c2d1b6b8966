//! face_login - look up a face-registered account by its 6-digit code

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use marivor_capture::{validate_login_code, CaptureConfig, RegistrationStore, SqliteRegistrationStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Six-digit login code issued at registration.
    code: String,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "MARIVOR_CAPTURE_CONFIG")]
    config: Option<PathBuf>,
    /// Registration database path (overrides config).
    #[arg(long)]
    db: Option<String>,
    /// Print the account as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let code = args.code.trim();
    validate_login_code(code)?;

    let db_path = match args.db {
        Some(db) => db,
        None => match &args.config {
            Some(path) => CaptureConfig::load_from(path)?.db_path,
            None => CaptureConfig::load()?.db_path,
        },
    };

    let store = SqliteRegistrationStore::open(&db_path)?;
    let registration = store
        .find_by_login_code(code)?
        .ok_or_else(|| anyhow!("invalid face login code"))?;
    log::info!("face login for {}", registration.username);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&registration)?);
    } else {
        println!("username: {}", registration.username);
        println!("user id: {}", registration.user_id);
        for photo in &registration.photos {
            println!("  {}: {}", photo.direction, photo.path);
        }
    }
    Ok(())
}
