use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::{
    AcceptGate, SessionConfig, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_QUALITY, DEFAULT_MIN_STABILITY,
};
use crate::detect::DEFAULT_DWELL;
use crate::ingest::SourceConfig;

pub const CONFIG_ENV: &str = "MARIVOR_CAPTURE_CONFIG";

const DEFAULT_DB_PATH: &str = "marivor_faces.db";
const DEFAULT_SOURCE_URL: &str = "stub://face";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    db_path: Option<String>,
    source: Option<SourceConfigFile>,
    gate: Option<GateConfigFile>,
    dwell_ms: Option<u64>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    fail_after: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GateConfigFile {
    min_confidence: Option<f32>,
    min_quality: Option<f32>,
    min_stability: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub db_path: String,
    pub source: SourceConfig,
    pub gate: GateSettings,
    pub dwell: Duration,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSettings {
    pub min_confidence: f32,
    pub min_quality: f32,
    pub min_stability: f32,
}

impl CaptureConfig {
    /// Defaults, then the file named by `MARIVOR_CAPTURE_CONFIG`, then
    /// `MARIVOR_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit file, still honoring env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let gate = file.gate.unwrap_or_default();
        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            source: SourceConfig {
                url: source
                    .url
                    .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                target_fps: source.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
                width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
                height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
                fail_after: source.fail_after,
            },
            gate: GateSettings {
                min_confidence: gate.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
                min_quality: gate.min_quality.unwrap_or(DEFAULT_MIN_QUALITY),
                min_stability: gate.min_stability.unwrap_or(DEFAULT_MIN_STABILITY),
            },
            dwell: file
                .dwell_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DWELL),
            seed: file.seed,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("MARIVOR_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(url) = std::env::var("MARIVOR_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(dwell) = std::env::var("MARIVOR_DWELL_MS") {
            let ms: u64 = dwell
                .parse()
                .map_err(|_| anyhow!("MARIVOR_DWELL_MS must be an integer number of milliseconds"))?;
            self.dwell = Duration::from_millis(ms);
        }
        if let Ok(seed) = std::env::var("MARIVOR_SEED") {
            let seed: u64 = seed
                .parse()
                .map_err(|_| anyhow!("MARIVOR_SEED must be an unsigned integer"))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        // AcceptGate::new range-checks each threshold.
        self.accept_gate()?;
        if self.dwell.is_zero() {
            return Err(anyhow!("dwell must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source.target_fps must be greater than zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        if self.db_path.trim().is_empty() {
            return Err(anyhow!("db_path must not be empty"));
        }
        Ok(())
    }

    pub fn accept_gate(&self) -> Result<AcceptGate> {
        AcceptGate::new(
            self.gate.min_confidence,
            self.gate.min_quality,
            self.gate.min_stability,
        )
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            dwell: self.dwell,
            gate: self.accept_gate()?,
            seed: self.seed,
        })
    }

    pub fn source_config(&self) -> SourceConfig {
        self.source.clone()
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
