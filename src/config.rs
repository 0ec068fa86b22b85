//! Build configuration.
//!
//! Values come from three layers: built-in defaults, an optional
//! `exbook.toml` in the source directory, and CLI flags. Later layers win.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the optional per-book config inside the source directory.
pub const CONFIG_FILE_NAME: &str = "exbook.toml";
pub const DEFAULT_ENGINE: &str = "computo";
pub const DEFAULT_SOURCE_DIR: &str = "book-source";
pub const DEFAULT_OUTPUT_DIR: &str = "build";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONVERTER: &str = "pandoc --standalone";
const MAX_TIMEOUT_SECS: u64 = 3600;
const MAX_JOBS: usize = 256;

/// Whether failing examples block publication of themselves.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Only passing examples are expanded and packaged.
    #[default]
    Required,
    /// Everything is published; non-passing examples carry an unverified marker.
    Advisory,
}

/// How strictly a declared failure must match the engine's behavior.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMatch {
    /// Any nonzero exit satisfies a declared failure.
    #[default]
    Any,
    /// A declared `contains` text must also appear on stderr.
    Message,
}

/// On-disk shape of `exbook.toml`. Every field is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub validate: Option<bool>,
    #[serde(default)]
    pub validation_mode: Option<ValidationMode>,
    #[serde(default)]
    pub failure_match: Option<FailureMatch>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub expand: Option<bool>,
    #[serde(default)]
    pub package: Option<bool>,
    #[serde(default)]
    pub include_descriptions: Option<bool>,
    #[serde(default)]
    pub html: Option<HtmlConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HtmlConfigFile {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub converter: Option<String>,
}

/// CLI-level overrides. `None` means "not given on the command line".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub engine: Option<String>,
    pub validate: Option<bool>,
    pub advisory: bool,
    pub html: Option<bool>,
    pub expand: Option<bool>,
    pub package: Option<bool>,
    pub jobs: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Fully resolved settings for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub engine: String,
    pub validate: bool,
    pub validation_mode: ValidationMode,
    pub failure_match: FailureMatch,
    pub timeout: Duration,
    pub jobs: usize,
    pub expand: bool,
    pub package: bool,
    pub include_descriptions: bool,
    pub html: bool,
    pub converter: String,
}

impl BuildConfig {
    /// Defaults used when neither a config file nor flags say otherwise.
    pub fn defaults(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            engine: DEFAULT_ENGINE.to_string(),
            validate: true,
            validation_mode: ValidationMode::Required,
            failure_match: FailureMatch::Any,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            jobs: default_jobs(),
            expand: true,
            package: true,
            include_descriptions: true,
            html: false,
            converter: DEFAULT_CONVERTER.to_string(),
        }
    }

    /// Skipping validation leaves nothing verified, so publication is advisory.
    pub fn effective_mode(&self) -> ValidationMode {
        if self.validate {
            self.validation_mode
        } else {
            ValidationMode::Advisory
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Load `exbook.toml` (explicit path, or the source directory's copy if present).
pub fn load_config_file(
    source_dir: &Path,
    explicit: Option<&Path>,
) -> Result<Option<ConfigFile>, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = source_dir.join(CONFIG_FILE_NAME);
            if !candidate.is_file() {
                return Ok(None);
            }
            candidate
        }
    };
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.clone(),
        message: err.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "loaded build config");
    Ok(Some(file))
}

/// Merge defaults, the optional config file, and CLI overrides.
pub fn resolve_config(
    source_dir: PathBuf,
    file: Option<ConfigFile>,
    overrides: &Overrides,
) -> Result<BuildConfig, ConfigError> {
    let mut config = BuildConfig::defaults(source_dir);
    if let Some(file) = file {
        if let Some(engine) = file.engine {
            config.engine = engine;
        }
        if let Some(output_dir) = file.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(validate) = file.validate {
            config.validate = validate;
        }
        if let Some(mode) = file.validation_mode {
            config.validation_mode = mode;
        }
        if let Some(failure_match) = file.failure_match {
            config.failure_match = failure_match;
        }
        if let Some(secs) = file.timeout_seconds {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(jobs) = file.jobs {
            config.jobs = jobs;
        }
        if let Some(expand) = file.expand {
            config.expand = expand;
        }
        if let Some(package) = file.package {
            config.package = package;
        }
        if let Some(include) = file.include_descriptions {
            config.include_descriptions = include;
        }
        if let Some(html) = file.html {
            if let Some(enabled) = html.enabled {
                config.html = enabled;
            }
            if let Some(converter) = html.converter {
                config.converter = converter;
            }
        }
    }

    if let Some(output_dir) = &overrides.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(engine) = &overrides.engine {
        config.engine = engine.clone();
    }
    if let Some(validate) = overrides.validate {
        config.validate = validate;
    }
    if overrides.advisory {
        config.validation_mode = ValidationMode::Advisory;
    }
    if let Some(html) = overrides.html {
        config.html = html;
    }
    if let Some(expand) = overrides.expand {
        config.expand = expand;
    }
    if let Some(package) = overrides.package {
        config.package = package;
    }
    if let Some(jobs) = overrides.jobs {
        config.jobs = jobs;
    }
    if let Some(secs) = overrides.timeout_seconds {
        config.timeout = Duration::from_secs(secs);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Reject settings that would make the build meaningless or unbounded.
pub fn validate_config(config: &BuildConfig) -> Result<(), ConfigError> {
    if config.engine.trim().is_empty() {
        return Err(ConfigError::Invalid("engine must be non-empty".to_string()));
    }
    if config.jobs == 0 || config.jobs > MAX_JOBS {
        return Err(ConfigError::Invalid(format!(
            "jobs must be between 1 and {MAX_JOBS} (got {})",
            config.jobs
        )));
    }
    let secs = config.timeout.as_secs();
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Invalid(format!(
            "timeout_seconds must be between 1 and {MAX_TIMEOUT_SECS} (got {secs})"
        )));
    }
    if config.html && config.converter.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "html.converter must be non-empty when html is enabled".to_string(),
        ));
    }
    if config.output_dir == config.source_dir {
        return Err(ConfigError::Invalid(
            "output directory must differ from the source directory".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_and_file_overrides_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
engine = "/opt/computo"
timeout_seconds = 5
jobs = 2
validation_mode = "advisory"

[html]
enabled = true
"#,
        )
        .unwrap();
        let overrides = Overrides {
            jobs: Some(4),
            html: Some(false),
            ..Overrides::default()
        };
        let config = resolve_config(PathBuf::from("src-book"), Some(file), &overrides).unwrap();
        assert_eq!(config.engine, "/opt/computo");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.jobs, 4);
        assert!(!config.html);
        assert_eq!(config.validation_mode, ValidationMode::Advisory);
    }

    #[test]
    fn skipping_validation_forces_advisory() {
        let overrides = Overrides {
            validate: Some(false),
            ..Overrides::default()
        };
        let config = resolve_config(PathBuf::from("src-book"), None, &overrides).unwrap();
        assert_eq!(config.validation_mode, ValidationMode::Required);
        assert_eq!(config.effective_mode(), ValidationMode::Advisory);
    }

    #[test]
    fn rejects_zero_jobs_and_unknown_keys() {
        let overrides = Overrides {
            jobs: Some(0),
            ..Overrides::default()
        };
        let err = resolve_config(PathBuf::from("src-book"), None, &overrides).unwrap_err();
        assert!(err.to_string().contains("jobs"));

        let parsed: Result<ConfigFile, _> = toml::from_str("bogus = 1");
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_file(dir.path(), None).unwrap().is_none());
    }
}
