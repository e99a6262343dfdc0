//! YAML configuration file.
//!
//! ```yaml
//! server:
//!   listen: "[::]:8080"
//! templates:
//!   vm:
//!     id: vm-template-1
//!     name: Basic VM Template
//!     file: templates/vm-template.tmpl
//!   kubernetes:
//!     id: k8s-template-1
//!     name: Basic Kubernetes Template
//!     file: templates/kubernetes-template.tmpl
//! audit: true
//! ```
//!
//! Every key is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub templates: TemplatesConfig,
    /// Record mutations on the `audit` log target.
    pub audit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            templates: TemplatesConfig::default(),
            audit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the REST API.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "[::]:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub vm: TemplateFileConfig,
    pub kubernetes: TemplateFileConfig,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            vm: TemplateFileConfig {
                id: "vm-template-1".to_string(),
                name: "Basic VM Template".to_string(),
                file: PathBuf::from("templates/vm-template.tmpl"),
            },
            kubernetes: TemplateFileConfig {
                id: "k8s-template-1".to_string(),
                name: "Basic Kubernetes Template".to_string(),
                file: PathBuf::from("templates/kubernetes-template.tmpl"),
            },
        }
    }
}

/// A template loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateFileConfig {
    pub id: String,
    pub name: String,
    pub file: PathBuf,
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen, "[::]:8080");
        assert_eq!(config.templates.vm.id, "vm-template-1");
        assert_eq!(config.templates.kubernetes.name, "Basic Kubernetes Template");
        assert!(config.audit);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse("server:\n  listen: 127.0.0.1:9090\naudit: false\n").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9090");
        assert!(!config.audit);
        assert_eq!(config.templates, TemplatesConfig::default());
    }

    #[test]
    fn test_template_section() {
        let yaml = "templates:\n  vm:\n    id: small\n    name: Small VM\n    file: /etc/small.tmpl\n";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.templates.vm.id, "small");
        assert_eq!(config.templates.vm.file, PathBuf::from("/etc/small.tmpl"));
        assert_eq!(config.templates.kubernetes.id, "k8s-template-1");
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  listen: \"[::1]:8181\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.listen, "[::1]:8181");
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [unclosed").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
