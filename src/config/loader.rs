use crate::config::schema::{ConfigLayer, ConfigOverrides, ReplayConfig};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates a complete configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ReplayConfig> {
        let mut visited = HashSet::new();
        let layer = Self::load_with_inheritance(path.as_ref(), &mut visited)?;
        Self::finish(layer.into_config())
    }

    /// Builds the run configuration from an optional file plus command-line
    /// overrides. Only the merged result has to be valid.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<ReplayConfig> {
        let base = match path {
            Some(path) => {
                let mut visited = HashSet::new();
                Self::load_with_inheritance(path, &mut visited)?.into_config()
            }
            None => ReplayConfig::default(),
        };
        Self::finish(Self::apply_overrides(base, overrides))
    }

    fn finish(mut config: ReplayConfig) -> Result<ReplayConfig> {
        config.filters.retain(|f| !f.is_empty());
        config.validate().map_err(Error::Validation)?;
        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<ConfigLayer> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let mut layer = Self::anchor_log_file(Self::load_file(&path)?, &path);

        let Some(parent_path_str) = layer.extends.take() else {
            return Ok(layer);
        };

        let parent_path = path
            .parent()
            .ok_or_else(|| {
                Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                ))
            })?
            .join(parent_path_str);

        let parent = Self::load_with_inheritance(&parent_path, visited)?;
        Ok(layer.over(parent))
    }

    fn load_file(path: &Path) -> Result<ConfigLayer> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    // Relative log paths in a config file are relative to that file.
    fn anchor_log_file(mut layer: ConfigLayer, config_path: &Path) -> ConfigLayer {
        if let (Some(log_file), Some(dir)) = (&layer.log_file, config_path.parent()) {
            if !log_file.as_os_str().is_empty() && log_file.is_relative() {
                layer.log_file = Some(dir.join(log_file));
            }
        }
        layer
    }

    fn apply_overrides(mut config: ReplayConfig, overrides: ConfigOverrides) -> ReplayConfig {
        if let Some(log_file) = overrides.log_file {
            config.log_file = log_file;
        }
        if let Some(concurrency) = overrides.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(filters) = overrides.filters {
            config.filters = filters;
        }
        if let Some(interval) = overrides.report_interval {
            config.report_interval = interval;
        }
        if let Some(base_url) = overrides.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = overrides.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(queue_size) = overrides.queue_size {
            config.queue_size = queue_size;
        }

        config.keep_cookies |= overrides.keep_cookies;
        config.verbose |= overrides.verbose;
        config.suppress_errors |= overrides.suppress_errors;
        config.repeat |= overrides.repeat;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_yaml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "replay.yaml", "log_file: access.log\nbase_url: http://svc\n");

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.report_interval, 1);
        assert_eq!(config.queue_size, 1);
        assert_eq!(config.base_url, "http://svc");
        assert!(config.log_file.ends_with("access.log"));
        assert!(config.log_file.is_absolute());
        assert!(!config.keep_cookies);
    }

    #[test]
    fn loads_toml_and_json() {
        let dir = TempDir::new().unwrap();
        let toml_path = write(
            &dir,
            "replay.toml",
            "log_file = \"/var/log/access.log\"\nconcurrency = 8\nfilters = [\"/admin\"]\n",
        );
        let json_path = write(
            &dir,
            "replay.json",
            r#"{"log_file": "/var/log/access.log", "repeat": true, "report_interval": 5}"#,
        );

        let from_toml = ConfigLoader::load(&toml_path).unwrap();
        assert_eq!(from_toml.concurrency, 8);
        assert_eq!(from_toml.filters, vec!["/admin".to_string()]);

        let from_json = ConfigLoader::load(&json_path).unwrap();
        assert!(from_json.repeat);
        assert_eq!(from_json.report_interval, 5);
    }

    #[test]
    fn child_inherits_and_overrides_parent() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "base.yaml",
            "log_file: /var/log/access.log\nbase_url: http://parent\nconcurrency: 4\nfilters: [\"/admin\"]\n",
        );
        let child = write(
            &dir,
            "child.yaml",
            "extends: base.yaml\nbase_url: http://child\nfilters: [\"/static\"]\nkeep_cookies: true\n",
        );

        let config = ConfigLoader::load(&child).unwrap();
        assert_eq!(config.base_url, "http://child");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.filters, vec!["/admin".to_string(), "/static".to_string()]);
        assert!(config.keep_cookies);
    }

    #[test]
    fn child_filters_are_appended_even_when_repeated() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "base.yaml",
            "log_file: /var/log/access.log\nfilters: [\"/admin\", \"/health\"]\n",
        );
        let child = write(
            &dir,
            "child.yaml",
            "extends: base.yaml\nfilters: [\"/admin\", \"/static\"]\n",
        );

        let config = ConfigLoader::load(&child).unwrap();
        assert_eq!(
            config.filters,
            vec!["/admin", "/health", "/admin", "/static"]
        );
    }

    #[test]
    fn child_can_reset_values_to_their_defaults() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "base.toml",
            "log_file = \"/var/log/access.log\"\nconcurrency = 8\nreport_interval = 5\nrepeat = true\nverbose = true\n",
        );
        let child = write(
            &dir,
            "child.toml",
            "extends = \"base.toml\"\nconcurrency = 2\nreport_interval = 1\nrepeat = false\n",
        );

        let config = ConfigLoader::load(&child).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.report_interval, 1);
        assert!(!config.repeat);
        assert!(config.verbose, "keys the child leaves out are inherited");
    }

    #[test]
    fn circular_inheritance_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", "extends: b.yaml\n");
        let a = dir.path().join("a.yaml");
        write(&dir, "b.yaml", "extends: a.yaml\n");

        match ConfigLoader::load(&a) {
            Err(Error::Config(msg)) => assert!(msg.contains("Circular")),
            other => panic!("expected circular error, got {:?}", other),
        }
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "replay.ini", "log_file=x");
        assert!(matches!(ConfigLoader::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn resolve_applies_overrides_without_file() {
        let overrides = ConfigOverrides {
            log_file: Some(PathBuf::from("access.log")),
            concurrency: Some(16),
            filters: Some(vec!["/admin".into(), String::new()]),
            verbose: true,
            ..Default::default()
        };

        let config = ConfigLoader::resolve(None, overrides).unwrap();
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.filters, vec!["/admin".to_string()]);
        assert!(config.verbose);
        assert_eq!(config.log_file, PathBuf::from("access.log"));
    }

    #[test]
    fn resolve_lets_flags_complete_a_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "partial.toml", "base_url = \"http://svc\"\n");
        let overrides = ConfigOverrides {
            log_file: Some(PathBuf::from("/tmp/access.log")),
            ..Default::default()
        };

        let config = ConfigLoader::resolve(Some(&path), overrides).unwrap();
        assert_eq!(config.base_url, "http://svc");
        assert_eq!(config.log_file, PathBuf::from("/tmp/access.log"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let missing_log = ConfigLoader::resolve(None, ConfigOverrides::default());
        assert!(matches!(missing_log, Err(Error::Validation(_))));

        let zero_workers = ConfigLoader::resolve(
            None,
            ConfigOverrides {
                log_file: Some(PathBuf::from("access.log")),
                concurrency: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(zero_workers, Err(Error::Validation(_))));

        let bad_base = ConfigLoader::resolve(
            None,
            ConfigOverrides {
                log_file: Some(PathBuf::from("access.log")),
                base_url: Some("not a url".into()),
                ..Default::default()
            },
        );
        assert!(matches!(bad_base, Err(Error::Validation(_))));
    }
}
