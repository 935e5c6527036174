// 配置管理
use crate::cli::Cli;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub args: Vec<String>,
    pub quiet: bool,
    pub engine: PathBuf,
    pub remote_engine: String,
    pub parent_flags: Vec<String>,
    pub destinations: ServiceDestinations,
    pub tmpdir: PathBuf,
}

/// A named remote endpoint from the connection store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destination {
    pub uri: String,
    #[serde(default)]
    pub identity: Option<String>,
}

impl Destination {
    pub fn identity_path(&self) -> Option<PathBuf> {
        self.identity
            .as_deref()
            .filter(|identity| !identity.is_empty())
            .map(PathBuf::from)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContainersConf {
    #[serde(default)]
    engine: EngineSection,
}

#[derive(Debug, Default, Deserialize)]
struct EngineSection {
    #[serde(default)]
    service_destinations: HashMap<String, Destination>,
}

/// Read-only mapping of connection alias to destination.
#[derive(Debug, Clone, Default)]
pub struct ServiceDestinations {
    destinations: HashMap<String, Destination>,
}

impl ServiceDestinations {
    pub fn from_toml(content: &str) -> Result<Self> {
        let conf: ContainersConf = toml::from_str(content).context("Failed to parse connection configuration")?;
        Ok(Self { destinations: conf.engine.service_destinations })
    }

    /// Loads the store from `path`; a missing file is an empty store.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No connection configuration at {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&Destination> {
        self.destinations.get(name)
    }

    pub fn insert(&mut self, name: &str, destination: Destination) {
        self.destinations.insert(name.to_string(), destination);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let connections_path = match &cli.connections {
            Some(path) => path.clone(),
            None => Self::default_connections_path()?,
        };
        let destinations = ServiceDestinations::load(&connections_path)?;

        Ok(Config {
            args: cli.args.clone(),
            quiet: cli.quiet,
            engine: Self::resolve_engine(&cli.engine),
            remote_engine: cli.remote_engine.clone(),
            parent_flags: cli.engine_flags.clone(),
            destinations,
            tmpdir: cli.tmpdir.clone().unwrap_or_else(std::env::temp_dir),
        })
    }

    // 登录 shell 会重置 PATH，所以解析为绝对路径
    fn resolve_engine(engine: &Path) -> PathBuf {
        match which::which(engine) {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not locate {} on PATH: {}", engine.display(), e);
                engine.to_path_buf()
            }
        }
    }

    fn default_connections_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("CONTAINERS_CONF").filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = home::home_dir().context("Cannot determine home directory")?;
        Ok(home.join(".config").join("containers").join("containers.conf"))
    }
}
