//! Configuration management for mopac-driver.
//!
//! Settings come from INI files, loaded in layers so that the most local file
//! wins:
//!
//! 1. Local configuration (`./mopac_driver.cfg`)
//! 2. User configuration (`~/.config/mopac_driver/mopac_driver.cfg`)
//! 3. System configuration (`/etc/mopac_driver/mopac_driver.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [engine]
//! # Explicit command; when empty it is built from install_dir_var + executable
//! command =
//! install_dir_var = MOPAC_LICENSE
//! executable = MOPAC2012.exe
//! default_method = PM6-D3H4
//! job_name = input
//!
//! [logging]
//! level = info
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mopac_driver::settings::{init_logging, SettingsManager};
//!
//! let settings = SettingsManager::load().unwrap();
//! init_logging(settings.logging());
//! println!("MOPAC command: {}", settings.engine().resolve_command());
//! ```

use crate::calculation::DEFAULT_METHOD;
use crate::naming::DEFAULT_JOB_NAME;
use configparser::ini::Ini;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file at every level
pub const CONFIG_FILE_NAME: &str = "mopac_driver.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading or writing configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// How to find and drive the engine
    pub engine: EngineSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Engine location and runner defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    /// Explicit engine command; takes precedence when set
    pub command: Option<String>,
    /// Environment variable naming the MOPAC installation directory
    pub install_dir_var: String,
    /// Executable file name inside the installation directory
    pub executable: String,
    /// Method used when a calculation names none MOPAC knows
    pub default_method: String,
    /// Job base name used until the caller sets one
    pub job_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: None,
            install_dir_var: "MOPAC_LICENSE".to_string(),
            executable: "MOPAC2012.exe".to_string(),
            default_method: DEFAULT_METHOD.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
        }
    }
}

impl EngineSettings {
    /// Works out the engine command.
    ///
    /// An explicit `command` wins. Otherwise the executable is joined to the
    /// directory named by `install_dir_var`; when that variable is unset the
    /// bare executable name is returned and looked up on `PATH` at launch.
    pub fn resolve_command(&self) -> String {
        if let Some(command) = self.command.as_deref().filter(|c| !c.trim().is_empty()) {
            return command.to_string();
        }
        match env::var_os(&self.install_dir_var).filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir)
                .join(&self.executable)
                .to_string_lossy()
                .into_owned(),
            None => {
                debug!(
                    "{} is not set, expecting {} on PATH",
                    self.install_dir_var, self.executable
                );
                self.executable.clone()
            }
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: off, error, warn, info, debug, trace (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// The configured level, falling back to `Info` for unknown names
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Installs an `env_logger` logger at the configured level.
///
/// `RUST_LOG` still refines the filter. Calling this more than once, or after
/// another logger was installed, does nothing.
pub fn init_logging(logging: &LoggingSettings) {
    let result = env_logger::Builder::new()
        .filter_level(logging.level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if result.is_ok() {
        debug!("Logging initialized at level {}", logging.level_filter());
    }
}

/// Configuration manager that loads and exposes settings.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the system, user and local files, in that
    /// order, on top of the built-in defaults.
    ///
    /// A file that fails to parse is skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(CONFIG_FILE_NAME))),
        ];
        for (label, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            match Self::read_layer(&path) {
                Ok(layer) => {
                    layer.apply(&mut settings)?;
                    config_source = format!("{} config ({})", label, path.display());
                    debug!("Loaded {} configuration from: {}", label, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} config from {}: {}",
                        label,
                        path.display(),
                        e
                    );
                }
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads a single file on top of the built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::read_layer(path)?.apply(&mut settings)?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
        })
    }

    /// Wraps already-built settings.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            config_source: "programmatic".to_string(),
        }
    }

    /// Returns where the configuration came from.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the engine settings.
    pub fn engine(&self) -> &EngineSettings {
        &self.settings.engine
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    fn read_layer(path: &Path) -> Result<Layer, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;
        Ok(Layer {
            sections: ini.get_map_ref().clone(),
        })
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/mopac_driver").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("mopac_driver").join(CONFIG_FILE_NAME))
        }
        #[cfg(not(any(unix, windows)))]
        {
            None
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("mopac_driver")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("mopac_driver").join(CONFIG_FILE_NAME))
        }
        #[cfg(not(any(unix, windows)))]
        {
            None
        }
    }

    /// Writes a commented configuration template to `path`.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let engine = EngineSettings::default();
        format!(
            r#"# mopac-driver configuration file
#
# Files are read in this order, later ones overriding earlier ones:
#   /etc/mopac_driver/{file}
#   ~/.config/mopac_driver/{file}
#   ./{file}
# Missing sections or keys keep their built-in defaults.

[engine]
# Full path to the MOPAC executable. Leave empty to build it from
# install_dir_var and executable below.
command =

# Environment variable holding the MOPAC installation directory
install_dir_var = {var}

# Executable name inside that directory (looked up on PATH if the
# variable is unset)
executable = {exe}

# Method used when a calculation does not name PM3, PM6, PM7 or AM1
default_method = {method}

# Job base name until one is set: decks are <job_name>.mop
job_name = {job}

[logging]
# off, error, warn, info, debug or trace. RUST_LOG refines this.
level = {level}
"#,
            file = CONFIG_FILE_NAME,
            var = engine.install_dir_var,
            exe = engine.executable,
            method = engine.default_method,
            job = engine.job_name,
            level = LoggingSettings::default().level,
        )
    }
}

/// One parsed INI file, applied on top of lower layers.
struct Layer {
    sections: HashMap<String, HashMap<String, Option<String>>>,
}

impl Layer {
    fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_deref())
            .map(str::trim)
    }

    fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        let engine = &mut settings.engine;
        if let Some(command) = self.value("engine", "command") {
            engine.command = (!command.is_empty()).then(|| command.to_string());
        }
        if let Some(var) = self.value("engine", "install_dir_var").filter(|v| !v.is_empty()) {
            engine.install_dir_var = var.to_string();
        }
        if let Some(exe) = self.value("engine", "executable").filter(|v| !v.is_empty()) {
            engine.executable = exe.to_string();
        }
        if let Some(method) = self.value("engine", "default_method").filter(|v| !v.is_empty()) {
            if !crate::calculation::is_valid_method(method) {
                return Err(ConfigError::InvalidValue(format!(
                    "default_method {} is not a MOPAC method",
                    method
                )));
            }
            engine.default_method = method.to_string();
        }
        if let Some(job) = self.value("engine", "job_name").filter(|v| !v.is_empty()) {
            engine.job_name = job.to_string();
        }

        if let Some(level) = self.value("logging", "level").filter(|v| !v.is_empty()) {
            if level.parse::<LevelFilter>().is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid logging level: {}",
                    level
                )));
            }
            settings.logging.level = level.to_lowercase();
        }
        Ok(())
    }
}
