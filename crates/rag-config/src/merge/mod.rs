//! Configuration layering, fallback logic, and environment overrides
//!
//! Precedence, lowest first: built-in defaults, `~/.rag/config.toml`, the
//! project `rag.toml`, `RAG_*` environment variables, command-line flags.

use camino::{Utf8Path, Utf8PathBuf};
use rag_core::error::RagError;
use std::collections::HashMap;

use crate::toml::{self as rag_toml, LogFormat, RagToml, StoreBackend};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "rag.toml";

/// Default cap on enumerated cycles
pub const DEFAULT_MAX_CYCLES: usize = 10_000;

/// Default graph file, relative to the project root
pub const DEFAULT_STORE_PATH: &str = ".rag/graph.json";

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    pub max_cycles: usize,
    pub deadline_ms: Option<u64>,
    pub store_backend: StoreBackend,
    /// Absolute path of the graph file
    pub store_path: Utf8PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Layers that contributed, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project rag.toml, found by walking up or given explicitly
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Global config file location, if the home directory is known
    global_path: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setting {
    MaxCycles,
    DeadlineMs,
    StoreBackend,
    StorePath,
    LogLevel,
    LogFormat,
}

impl Setting {
    fn from_env_key(key: &str) -> Option<Self> {
        match key {
            "RAG_MAX_CYCLES" => Some(Setting::MaxCycles),
            "RAG_DEADLINE_MS" => Some(Setting::DeadlineMs),
            "RAG_STORE_BACKEND" => Some(Setting::StoreBackend),
            "RAG_STORE_PATH" => Some(Setting::StorePath),
            "RAG_LOG_LEVEL" => Some(Setting::LogLevel),
            "RAG_LOG_FORMAT" => Some(Setting::LogFormat),
            _ => None,
        }
    }

    fn from_cli_key(key: &str) -> Option<Self> {
        match key {
            "max-cycles" => Some(Setting::MaxCycles),
            "deadline-ms" => Some(Setting::DeadlineMs),
            "store-backend" => Some(Setting::StoreBackend),
            "store-path" => Some(Setting::StorePath),
            "log-level" => Some(Setting::LogLevel),
            "log-format" => Some(Setting::LogFormat),
            _ => None,
        }
    }
}

impl RagConfig {
    /// Fill unset values with defaults; a relative store path resolves against `base_dir`
    pub fn resolve(config: RagToml, base_dir: &Utf8Path) -> ConfigResult<Self> {
        rag_toml::validate_config(&config)?;

        let store_path = config
            .store
            .path
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_STORE_PATH));
        let store_path = if store_path.is_relative() {
            base_dir.join(store_path)
        } else {
            store_path
        };

        Ok(Self {
            max_cycles: config.detection.max_cycles.unwrap_or(DEFAULT_MAX_CYCLES),
            deadline_ms: config.detection.deadline_ms,
            store_backend: config.store.backend.unwrap_or_default(),
            store_path,
            log_level: config
                .log
                .level
                .map(|level| level.to_ascii_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            log_format: config.log.format.unwrap_or_default(),
            sources: Vec::new(),
        })
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global_path: default_global_config_path(),
        }
    }

    /// Use a specific global config file, or none at all
    pub fn with_global_path(mut self, global_path: Option<Utf8PathBuf>) -> Self {
        self.global_path = global_path;
        self
    }

    /// Find rag.toml in the working directory or one of its parents
    pub fn find_project_config(&self) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Load the project file, either `explicit` or the one found by walking up
    pub fn load_project_config(
        &self,
        explicit: Option<&Utf8Path>,
    ) -> ConfigResult<Option<(RagToml, Utf8PathBuf)>> {
        let path = match explicit {
            Some(path) if path.is_relative() => Some(self.cwd.join(path)),
            Some(path) => Some(path.to_path_buf()),
            None => self.find_project_config(),
        };

        match path {
            Some(path) => {
                let config = rag_toml::load_from_file(&path)?;
                Ok(Some((config, path)))
            },
            None => Ok(None),
        }
    }

    /// Load global configuration
    pub fn load_global_config(&self) -> ConfigResult<Option<(RagToml, Utf8PathBuf)>> {
        match &self.global_path {
            Some(path) if path.is_file() => {
                let config = rag_toml::load_from_file(path)?;
                Ok(Some((config, path.clone())))
            },
            _ => Ok(None),
        }
    }

    /// Resolve the effective configuration from every layer
    pub fn load(
        &self,
        explicit: Option<&Utf8Path>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<RagConfig> {
        let mut sources = Vec::new();

        // A store path written in a file is relative to that file's directory
        let global = self.load_global_config()?.map(|(mut config, path)| {
            anchor_store_path(&mut config, &path);
            sources.push(ConfigSource::Global(path));
            config
        });

        let mut base_dir = self.cwd.clone();
        let project = self.load_project_config(explicit)?.map(|(mut config, path)| {
            anchor_store_path(&mut config, &path);
            if let Some(parent) = path.parent() {
                base_dir = parent.to_path_buf();
            }
            sources.push(ConfigSource::Project(path));
            config
        });

        for key in env_overrides.keys() {
            if Setting::from_env_key(key).is_some() {
                sources.push(ConfigSource::Environment(key.clone()));
            }
        }
        if cli_overrides.keys().any(|key| Setting::from_cli_key(key).is_some()) {
            sources.push(ConfigSource::CommandLine);
        }

        // Paths given on the command line or in the environment are relative to cwd
        let env_overrides = self.absolutize(env_overrides, "RAG_STORE_PATH");
        let cli_overrides = self.absolutize(cli_overrides, "store-path");

        let merged = ConfigLayering::merge_configs(global, project, env_overrides, cli_overrides)?;
        let mut config = RagConfig::resolve(merged, &base_dir)?;
        config.sources = sources;
        Ok(config)
    }

    fn absolutize(&self, mut overrides: HashMap<String, String>, key: &str) -> HashMap<String, String> {
        if let Some(value) = overrides.get_mut(key) {
            let path = Utf8Path::new(value.as_str());
            if path.is_relative() {
                *value = self.cwd.join(path).into_string();
            }
        }
        overrides
    }
}

impl ConfigLayering {
    /// Merge multiple configuration layers
    pub fn merge_configs(
        global_config: Option<RagToml>,
        project_config: Option<RagToml>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<RagToml> {
        let mut merged = project_config.unwrap_or_default();

        // Global values only fill what the project left unset
        if let Some(global) = global_config {
            let detection = &mut merged.detection;
            detection.max_cycles = detection.max_cycles.or(global.detection.max_cycles);
            detection.deadline_ms = detection.deadline_ms.or(global.detection.deadline_ms);

            let store = &mut merged.store;
            store.backend = store.backend.or(global.store.backend);
            store.path = store.path.take().or(global.store.path);

            let log = &mut merged.log;
            log.level = log.level.take().or(global.log.level);
            log.format = log.format.or(global.log.format);
        }

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut RagToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            if let Some(setting) = Setting::from_env_key(key) {
                apply_setting(config, setting, key, value)?;
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut RagToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            if let Some(setting) = Setting::from_cli_key(key) {
                apply_setting(config, setting, &format!("--{}", key), value)?;
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("RAG_"))
            .collect()
    }
}

fn apply_setting(config: &mut RagToml, setting: Setting, field: &str, value: &str) -> ConfigResult<()> {
    let invalid = |reason: String| RagError::ConfigValidation {
        field: field.to_string(),
        reason,
    };

    match setting {
        Setting::MaxCycles => {
            let max_cycles = value
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("'{}' is not a cycle count: {}", value, e)))?;
            config.detection.max_cycles = Some(max_cycles);
        },
        Setting::DeadlineMs => {
            let deadline_ms = value
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(format!("'{}' is not a number of milliseconds: {}", value, e)))?;
            config.detection.deadline_ms = Some(deadline_ms);
        },
        Setting::StoreBackend => {
            config.store.backend = Some(value.parse().map_err(invalid)?);
        },
        Setting::StorePath => {
            if value.trim().is_empty() {
                return Err(invalid("path must not be empty".to_string()));
            }
            config.store.path = Some(Utf8PathBuf::from(value));
        },
        Setting::LogLevel => {
            rag_toml::validate_log_level(field, value)?;
            config.log.level = Some(value.to_string());
        },
        Setting::LogFormat => {
            config.log.format = Some(value.parse().map_err(invalid)?);
        },
    }

    Ok(())
}

fn anchor_store_path(config: &mut RagToml, file: &Utf8Path) {
    let (Some(path), Some(dir)) = (config.store.path.as_mut(), file.parent()) else {
        return;
    };
    if path.is_relative() {
        *path = dir.join(&*path);
    }
}

fn default_global_config_path() -> Option<Utf8PathBuf> {
    let home_dir = dirs::home_dir()?;
    let home_dir = Utf8PathBuf::try_from(home_dir).ok()?;
    Some(home_dir.join(".rag").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, root)
    }

    fn loader(cwd: Utf8PathBuf) -> ConfigLoader {
        ConfigLoader::new(cwd).with_global_path(None)
    }

    #[test]
    fn test_defaults_without_any_file() {
        let (_temp_dir, root) = temp_root();

        let config = loader(root.clone())
            .load(None, HashMap::new(), HashMap::new())
            .unwrap();
        assert_eq!(config.max_cycles, DEFAULT_MAX_CYCLES);
        assert_eq!(config.deadline_ms, None);
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert_eq!(config.store_path, root.join(".rag").join("graph.json"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_find_project_config_walks_up() {
        let (_temp_dir, root) = temp_root();
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(CONFIG_FILE), "[detection]\nmax-cycles = 7\n").unwrap();

        let loader = loader(nested);
        assert_eq!(loader.find_project_config(), Some(root.join(CONFIG_FILE)));

        let config = loader.load(None, HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(config.max_cycles, 7);
        // Relative store paths are anchored at the project root
        assert_eq!(config.store_path, root.join(DEFAULT_STORE_PATH));
        assert_eq!(config.sources, vec![ConfigSource::Project(root.join(CONFIG_FILE))]);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let (_temp_dir, root) = temp_root();

        let err = loader(root)
            .load(Some(Utf8Path::new("missing.toml")), HashMap::new(), HashMap::new())
            .unwrap_err();
        assert!(matches!(err, RagError::Io { .. }));
    }

    #[test]
    fn test_parse_error_reports_file() {
        let (_temp_dir, root) = temp_root();
        fs::write(root.join(CONFIG_FILE), "[store\n").unwrap();

        let err = loader(root.clone()).load(None, HashMap::new(), HashMap::new()).unwrap_err();
        match err {
            RagError::ConfigParse { message, line, .. } => {
                assert!(message.contains(root.join(CONFIG_FILE).as_str()));
                assert_eq!(line, 1);
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_global_fills_unset_values() {
        let (_temp_dir, root) = temp_root();
        let global_path = root.join("global.toml");
        fs::write(
            &global_path,
            "[detection]\nmax-cycles = 3\ndeadline-ms = 100\n\n[log]\nformat = \"json\"\n",
        )
        .unwrap();
        fs::write(root.join(CONFIG_FILE), "[detection]\nmax-cycles = 50\n").unwrap();

        let config = ConfigLoader::new(root.clone())
            .with_global_path(Some(global_path.clone()))
            .load(None, HashMap::new(), HashMap::new())
            .unwrap();
        assert_eq!(config.max_cycles, 50);
        assert_eq!(config.deadline_ms, Some(100));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.sources,
            vec![
                ConfigSource::Global(global_path),
                ConfigSource::Project(root.join(CONFIG_FILE)),
            ]
        );
    }

    #[test]
    fn test_global_store_path_is_relative_to_global_file() {
        let (_temp_dir, root) = temp_root();
        let home = root.join("home").join(".rag");
        let project = root.join("project");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&project).unwrap();
        let global_path = home.join("config.toml");
        fs::write(&global_path, "[store]\npath = \"shared.json\"\n").unwrap();
        fs::write(project.join(CONFIG_FILE), "[detection]\nmax-cycles = 5\n").unwrap();

        let config = ConfigLoader::new(project.clone())
            .with_global_path(Some(global_path))
            .load(None, HashMap::new(), HashMap::new())
            .unwrap();
        assert_eq!(config.store_path, home.join("shared.json"));

        // A project path still wins and stays anchored at the project
        fs::write(project.join(CONFIG_FILE), "[store]\npath = \"local.json\"\n").unwrap();
        let config = ConfigLoader::new(project.join("nested"))
            .with_global_path(Some(home.join("config.toml")))
            .load(None, HashMap::new(), HashMap::new())
            .unwrap();
        assert_eq!(config.store_path, project.join("local.json"));
    }

    #[test]
    fn test_merge_configs() {
        let mut global_config = RagToml::default();
        global_config.log.level = Some("warn".to_string());
        global_config.store.backend = Some(StoreBackend::Memory);

        let mut project_config = RagToml::default();
        project_config.detection.max_cycles = Some(10);
        project_config.store.backend = Some(StoreBackend::Json);

        let env_overrides = HashMap::from([
            ("RAG_MAX_CYCLES".to_string(), "20".to_string()),
            ("RAG_LOG_FORMAT".to_string(), "json".to_string()),
            ("RAG_UNRELATED".to_string(), "ignored".to_string()),
        ]);

        let cli_overrides = HashMap::from([("max-cycles".to_string(), "30".to_string())]);

        let merged = ConfigLayering::merge_configs(
            Some(global_config),
            Some(project_config),
            env_overrides,
            cli_overrides,
        )
        .unwrap();

        // Project config should take precedence over global
        assert_eq!(merged.store.backend, Some(StoreBackend::Json));

        // Global value fills the gap
        assert_eq!(merged.log.level.as_deref(), Some("warn"));

        // Environment override should be applied
        assert_eq!(merged.log.format, Some(LogFormat::Json));

        // CLI override should be applied (highest priority)
        assert_eq!(merged.detection.max_cycles, Some(30));
    }

    #[test]
    fn test_invalid_env_value() {
        let env_overrides = HashMap::from([("RAG_MAX_CYCLES".to_string(), "lots".to_string())]);

        let err = ConfigLayering::merge_configs(None, None, env_overrides, HashMap::new()).unwrap_err();
        assert!(matches!(err, RagError::ConfigValidation { ref field, .. } if field == "RAG_MAX_CYCLES"));

        let env_overrides = HashMap::from([("RAG_STORE_BACKEND".to_string(), "sqlite".to_string())]);
        assert!(ConfigLayering::merge_configs(None, None, env_overrides, HashMap::new()).is_err());
    }

    #[test]
    fn test_invalid_cli_value() {
        let cli_overrides = HashMap::from([("log-level".to_string(), "chatty".to_string())]);

        let err = ConfigLayering::merge_configs(None, None, HashMap::new(), cli_overrides).unwrap_err();
        assert!(matches!(err, RagError::ConfigValidation { ref field, .. } if field == "--log-level"));
    }

    #[test]
    fn test_override_paths_are_relative_to_cwd() {
        let (_temp_dir, root) = temp_root();
        let nested = root.join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(CONFIG_FILE), "[store]\npath = \"from-file.json\"\n").unwrap();

        let loader = loader(nested.clone());
        let config = loader.load(None, HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(config.store_path, root.join("from-file.json"));

        let cli_overrides = HashMap::from([("store-path".to_string(), "cli.json".to_string())]);
        let config = loader.load(None, HashMap::new(), cli_overrides).unwrap();
        assert_eq!(config.store_path, nested.join("cli.json"));
        assert!(config.sources.contains(&ConfigSource::CommandLine));
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("RAG_TEST_COLLECT", "1");
        std::env::set_var("NOT_RAG_TEST_COLLECT", "ignored");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("RAG_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_RAG_TEST_COLLECT"));

        // Clean up
        std::env::remove_var("RAG_TEST_COLLECT");
        std::env::remove_var("NOT_RAG_TEST_COLLECT");
    }
}
