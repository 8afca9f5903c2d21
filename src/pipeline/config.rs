// Engine settings, read once at startup from <dir>/.gridseq/config.json.
// A missing file means defaults; a file that exists but doesn't parse is an error.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::sequencer::timing::validate_bpm;
use crate::shared::{DEFAULT_ACCENT_MULTIPLIER, DEFAULT_BPM};

const GRIDSEQ_DIR: &str = ".gridseq";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "gridseq.log";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
    pub lookahead_ms: u64,
    pub max_voices: usize,
    pub accent_multiplier: f32,
    pub bpm: f64,
    pub looping: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            lookahead_ms: 100,
            max_voices: 64,
            accent_multiplier: DEFAULT_ACCENT_MULTIPLIER,
            bpm: DEFAULT_BPM,
            looping: true,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn lookahead_seconds(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }

    // the window has to cover a full polling interval or cells get dispatched late
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        anyhow::ensure!(
            self.lookahead_ms > self.tick_interval_ms,
            "lookahead_ms ({}) must exceed tick_interval_ms ({})",
            self.lookahead_ms,
            self.tick_interval_ms
        );
        anyhow::ensure!(self.max_voices > 0, "max_voices must be positive");
        anyhow::ensure!(
            self.accent_multiplier.is_finite() && self.accent_multiplier > 0.0,
            "accent_multiplier must be positive"
        );
        validate_bpm(self.bpm)?;
        Ok(())
    }
}

// <project_dir>/.gridseq/config.json
pub fn config_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(GRIDSEQ_DIR).join(CONFIG_FILE)
}

// <project_dir>/.gridseq/gridseq.log, creating .gridseq/ if needed
pub fn log_file_path(project_dir: &Path) -> anyhow::Result<PathBuf> {
    let dir = project_dir.join(GRIDSEQ_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(dir.join(LOG_FILE))
}

pub fn load_config(project_dir: &Path) -> anyhow::Result<EngineConfig> {
    let path = config_file_path(project_dir);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&data)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_project(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridseq-config-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join(GRIDSEQ_DIR)).unwrap();
        dir
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_config(Path::new("/no/such/project")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.tick_interval(), Duration::from_millis(50));
        assert_eq!(cfg.lookahead_seconds(), 0.1);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = temp_project("partial");
        std::fs::write(config_file_path(&dir), r#"{ "bpm": 90.0, "looping": false }"#).unwrap();
        let cfg = load_config(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(cfg.bpm, 90.0);
        assert!(!cfg.looping);
        assert_eq!(cfg.lookahead_ms, 100);
    }

    #[test]
    fn lookahead_must_exceed_tick_interval() {
        let dir = temp_project("window");
        std::fs::write(
            config_file_path(&dir),
            r#"{ "tick_interval_ms": 50, "lookahead_ms": 40 }"#,
        )
        .unwrap();
        let err = load_config(&dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();
        assert!(err.to_string().contains("lookahead_ms"));
    }

    #[test]
    fn unusable_bpm_is_rejected() {
        let cfg = EngineConfig { bpm: 1e17, ..EngineConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
