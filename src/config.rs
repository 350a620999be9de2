use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Engine configuration loaded from `~/.config/rxfer/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of transfers running at once (clamped to 1..=5).
    #[serde(default = "default_max_task_size")]
    pub max_task_size: usize,
    /// Number of segments a fresh download is split into (clamped to 1..=5).
    #[serde(default = "default_segment_threads")]
    pub segment_threads: usize,
}

fn default_max_task_size() -> usize {
    3
}

/// Derived from available parallelism: `max(3, min(cpus - 1, 5))`.
fn default_segment_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_sub(1).min(5).max(3)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_task_size: default_max_task_size(),
            segment_threads: default_segment_threads(),
        }
    }
}

impl EngineConfig {
    /// Returns a copy with both limits clamped into their valid ranges.
    pub fn normalized(&self) -> Self {
        Self {
            max_task_size: self.max_task_size.clamp(1, 5),
            segment_threads: self.segment_threads.clamp(1, 5),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rxfer")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}
