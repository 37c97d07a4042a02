use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rewind::{ConfigError, RewindConfig, RewindCoordinator};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{RoomConfig, RoomScene};
use super::input::{default_script, InputScript, ScriptedInput};
use super::loop_runner::LoopConfig;

pub(crate) const CONFIG_ENV_VAR: &str = "ONE_ROOM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) rewind: RewindConfig,
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) room: RoomConfig,
    pub(crate) script: Vec<ScriptedInput>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rewind: RewindConfig::default(),
            loop_config: LoopConfig::default(),
            room: RoomConfig::default(),
            script: default_script(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    ParseConfig { path: PathBuf, message: String },
    #[error("invalid rewind settings: {0}")]
    Rewind(#[from] ConfigError),
    #[error("a rewind coordinator is already running in this process")]
    CoordinatorBusy,
}

pub(crate) struct AppWiring {
    pub(crate) config: GameConfig,
    pub(crate) coordinator: RewindCoordinator,
    pub(crate) scene: RoomScene,
    pub(crate) script: InputScript,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== One Room Startup ===");

    let config = load_config_from_env()?;
    wire(config)
}

pub(crate) fn wire(config: GameConfig) -> Result<AppWiring, StartupError> {
    let mut coordinator =
        RewindCoordinator::acquire(config.rewind)?.ok_or(StartupError::CoordinatorBusy)?;
    let mut scene = RoomScene::new(config.room);
    scene.load(&mut coordinator);
    let script = InputScript::new(config.script.clone());

    Ok(AppWiring {
        config,
        coordinator,
        scene,
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_config_from_env() -> Result<GameConfig, StartupError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(value) => load_config_file(Path::new(value.trim())),
        Err(env::VarError::NotPresent) => {
            info!(env_var = CONFIG_ENV_VAR, "config_defaults");
            Ok(GameConfig::default())
        }
        Err(source) => Err(StartupError::EnvVar {
            var: CONFIG_ENV_VAR,
            source,
        }),
    }
}

pub(crate) fn load_config_file(path: &Path) -> Result<GameConfig, StartupError> {
    let raw = fs::read_to_string(path).map_err(|source| StartupError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_json(&raw).map_err(|message| StartupError::ParseConfig {
        path: path.to_path_buf(),
        message,
    })?;
    config.rewind.validate()?;
    info!(
        path = %path.display(),
        snaps_per_second = config.rewind.snaps_per_second,
        seconds_saved = config.rewind.seconds_saved,
        scripted_inputs = config.script.len(),
        "config_loaded"
    );
    Ok(config)
}

fn parse_config_json(raw: &str) -> Result<GameConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}
