use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use roulette::{Layout, LayoutError, Part, PartLabel, PartSize, SpeedPreset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TICK_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartConfig {
    pub label: PartLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<f64>,
}

impl PartConfig {
    /// A fixed width wins over a weight; a part with neither gets weight 1.
    pub fn to_part(&self) -> Part {
        let size = match (self.degrees, self.flex) {
            (Some(degrees), _) => PartSize::Degrees(degrees),
            (None, Some(weight)) => PartSize::Flex(weight),
            (None, None) => PartSize::Flex(1.0),
        };
        Part {
            label: self.label.clone(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_parts")]
    pub parts: Vec<PartConfig>,
    #[serde(default)]
    pub speed: Option<SpeedPreset>,
    #[serde(default)]
    pub auto_stop_secs: Option<f64>,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parts: default_parts(),
            speed: None,
            auto_stop_secs: None,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl Config {
    pub fn layout(&self) -> Result<Layout, LayoutError> {
        Layout::new(self.parts.iter().map(PartConfig::to_part).collect())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn auto_stop(&self) -> Option<Duration> {
        self.auto_stop_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|d| !d.is_zero())
    }
}

fn default_parts() -> Vec<PartConfig> {
    ["Yes", "No", "Maybe"]
        .into_iter()
        .map(|label| PartConfig {
            label: PartLabel::from(label),
            degrees: None,
            flex: Some(1.0),
        })
        .collect()
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "troia", "wheel").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("WHEEL"))
        .build()?;

    Ok(s.try_deserialize()?)
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&get_config_path()?)
}

pub fn load_or_default() -> Config {
    match load_config() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Using the built-in wheel: {}", e);
            Config::default()
        }
    }
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

use crate::events::AppEvent;
use async_channel::Sender;

fn watch(
    dir: &Path,
    bridge_tx: Sender<notify::Result<notify::Event>>,
) -> Result<RecommendedWatcher, ConfigError> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Events closer together than this collapse into one reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

fn touches(event: &notify::Event, path: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p == path)
}

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };
    let Some(config_dir) = config_path.parent().map(Path::to_path_buf) else {
        return;
    };
    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();
    let _watcher = match watch(&config_dir, bridge_tx) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to watch config directory: {}", e);
            return;
        }
    };

    loop {
        match bridge_rx.recv().await {
            Ok(Ok(event)) if touches(&event, &config_path) => {}
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                log::error!("Watch error: {}", e);
                continue;
            }
            Err(_) => break,
        }

        // swallow the rest of the burst
        while let Ok(Ok(_)) = tokio::time::timeout(RELOAD_DEBOUNCE, bridge_rx.recv()).await {}

        log::debug!("{} changed", config_path.display());
        if tx.send(AppEvent::ConfigReload).await.is_err() {
            break;
        }
    }
}
