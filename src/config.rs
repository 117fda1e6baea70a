//! Site configuration.
//!
//! An optional `config.yaml` at the source root holds site-wide metadata: a
//! `sitename` for templates, default `bibliography`/`csl` paths for citation
//! processing, and any other keys an author wants available in every
//! template context. Configuration is a free-form mapping rather than a
//! fixed struct — unknown keys flow through to templates untouched.
//!
//! Per page, front matter overlays the site config through [`ScopedConfig`]:
//! a front-matter key wins over the same config key, and relative path
//! values resolve against the directory the value was written in (the source
//! file's directory for front matter, the config file's directory for
//! `config.yaml`).

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Site config file name, looked up in the source root.
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("metadata conversion error: {0}")]
    Convert(#[from] serde_json::Error),
    #[error("{0} is not a key-value mapping")]
    NotAMapping(PathBuf),
}

/// Site-wide configuration loaded from [`CONFIG_FILE`].
#[derive(Debug, Clone)]
pub struct SiteConfig {
    base_dir: PathBuf,
    metadata: Map<String, Value>,
}

impl SiteConfig {
    /// Load `config.yaml` from `source_root`. A missing file is an empty
    /// config, not an error.
    pub fn load(source_root: &Path) -> Result<Self, ConfigError> {
        let path = source_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::empty(source_root));
        }

        let text = fs::read_to_string(&path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
        let metadata = match serde_json::to_value(value)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ConfigError::NotAMapping(path)),
        };

        Ok(Self {
            base_dir: source_root.to_path_buf(),
            metadata,
        })
    }

    /// An empty config anchored at `base_dir`.
    pub fn empty(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            metadata: Map::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.metadata.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).and_then(Value::as_str)
    }

    /// Resolve a string value as a path relative to the config file's
    /// directory.
    pub fn fullpath(&self, name: &str) -> Option<PathBuf> {
        self.get_str(name).map(|v| self.base_dir.join(v))
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// One page's view of configuration: front matter first, site config second.
pub struct ScopedConfig<'a> {
    local: &'a Map<String, Value>,
    local_dir: &'a Path,
    global: &'a SiteConfig,
}

impl<'a> ScopedConfig<'a> {
    pub fn new(local: &'a Map<String, Value>, local_dir: &'a Path, global: &'a SiteConfig) -> Self {
        Self {
            local,
            local_dir,
            global,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.local.get(name).or_else(|| self.global.get(name))
    }

    /// Resolve a path value: front-matter paths are relative to the source
    /// file, config paths to the config file.
    pub fn fullpath(&self, name: &str) -> Option<PathBuf> {
        match self.local.get(name).and_then(Value::as_str) {
            Some(v) => Some(self.local_dir.join(v)),
            None => self.global.fullpath(name),
        }
    }
}
