//! rag.toml parsing and serialization
//!
//! Every field is optional so that a project file only overrides what it
//! names and the global file can fill in the rest.

use camino::Utf8PathBuf;
use rag_core::error::RagError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigResult;

/// Log levels accepted in `[log] level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete rag.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagToml {
    /// Cycle enumeration limits
    #[serde(default)]
    pub detection: DetectionSection,

    /// Durable graph storage
    #[serde(default)]
    pub store: StoreSection,

    /// Logging output
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetectionSection {
    /// Maximum number of cycles to enumerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<usize>,

    /// Wall-clock budget for one enumeration, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StoreBackend>,

    /// Graph file, relative paths resolve against the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

/// Where the graph is kept between runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Memory,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Json => "json",
            StoreBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{}', expected \"json\" or \"memory\"", other)),
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected \"text\" or \"json\"", other)),
        }
    }
}

/// Parse TOML string to RagToml configuration
pub fn parse_rag_toml(content: &str) -> ConfigResult<RagToml> {
    let config: RagToml = ::toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_column(content, span.start))
            .unwrap_or((0, 0));
        RagError::ConfigParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize RagToml to TOML string
pub fn serialize_rag_toml(config: &RagToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| RagError::ConfigValidation {
        field: "rag.toml".to_string(),
        reason: format!("serialization failed: {}", e),
    })
}

/// Reject values that parse but cannot be used
pub fn validate_config(config: &RagToml) -> ConfigResult<()> {
    if let Some(level) = &config.log.level {
        validate_log_level("log.level", level)?;
    }

    if let Some(path) = &config.store.path {
        if path.as_str().trim().is_empty() {
            return Err(RagError::ConfigValidation {
                field: "store.path".to_string(),
                reason: "path must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

pub(crate) fn validate_log_level(field: &str, level: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(RagError::ConfigValidation {
            field: field.to_string(),
            reason: format!("unknown level '{}', expected one of {}", level, LOG_LEVELS.join(", ")),
        })
    }
}

/// Load and parse rag.toml from file path
pub fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<RagToml> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RagError::io(format!("Failed to read {}", path), e))?;

    parse_rag_toml(&content).map_err(|e| match e {
        RagError::ConfigParse { message, line, column } => RagError::ConfigParse {
            message: format!("{} (in {})", message, path),
            line,
            column,
        },
        RagError::ConfigValidation { field, reason } => RagError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    })
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}
