//! Configuration for sitemap cache instances and logging.
//!
//! Settings are read from an INI file:
//!
//! ```ini
//! [sitemap_cache]
//! name = offline
//! mode = offline
//! entry_point_property = ADE.sitemap
//! sitemap_property = sitemap
//! sitemap_type = sitemap
//! schema_path = /system/modules/org.opencms.ade.sitemap/schemas/sitemap.xsd
//!
//! [logging]
//! level = debug
//! directory = /var/log/sitemap-cache
//! ```
//!
//! Missing keys keep their defaults.

use std::path::{Path, PathBuf};

use ini::{Ini, Properties};

use crate::error::{Result, SitemapError};
use crate::model::RepositoryMode;

/// Property on entry point folders naming their root sitemap.
pub const DEFAULT_ENTRY_POINT_PROPERTY: &str = "ADE.sitemap";

/// Entry property naming a sub-sitemap by structure id.
pub const DEFAULT_SITEMAP_PROPERTY: &str = "sitemap";

/// Resource type name of sitemap documents.
pub const DEFAULT_SITEMAP_TYPE: &str = "sitemap";

/// Root path of the sitemap schema definition.
pub const DEFAULT_SCHEMA_PATH: &str = "/system/modules/org.opencms.ade.sitemap/schemas/sitemap.xsd";

/// Default log level when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CACHE_SECTION: &str = "sitemap_cache";
const LOGGING_SECTION: &str = "logging";

/// Configuration of one sitemap structure cache instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SitemapCacheConfig {
    /// Name used in logs and diagnostics.
    pub name: String,

    /// Repository mode the cache reads and listens to.
    pub mode: RepositoryMode,

    /// Folder property marking sitemap entry points.
    pub entry_point_property: String,

    /// Entry property referencing a sub-sitemap.
    pub sitemap_property: String,

    /// Resource type of sitemap documents.
    pub sitemap_type: String,

    /// Root path of the sitemap schema.
    pub schema_path: String,
}

impl Default for SitemapCacheConfig {
    fn default() -> Self {
        Self::new(RepositoryMode::Offline)
    }
}

impl SitemapCacheConfig {
    /// Create a config for the given mode with default property names.
    pub fn new(mode: RepositoryMode) -> Self {
        Self {
            name: mode.to_string(),
            mode,
            entry_point_property: DEFAULT_ENTRY_POINT_PROPERTY.to_string(),
            sitemap_property: DEFAULT_SITEMAP_PROPERTY.to_string(),
            sitemap_type: DEFAULT_SITEMAP_TYPE.to_string(),
            schema_path: DEFAULT_SCHEMA_PATH.to_string(),
        }
    }

    /// Set the cache name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the repository mode.
    ///
    /// A name still derived from the previous mode follows the new mode.
    pub fn with_mode(mut self, mode: RepositoryMode) -> Self {
        if self.name == self.mode.to_string() {
            self.name = mode.to_string();
        }
        self.mode = mode;
        self
    }

    /// Set the entry point property name.
    pub fn with_entry_point_property(mut self, property: impl Into<String>) -> Self {
        self.entry_point_property = property.into();
        self
    }

    /// Set the sub-sitemap property name.
    pub fn with_sitemap_property(mut self, property: impl Into<String>) -> Self {
        self.sitemap_property = property.into();
        self
    }

    /// Set the sitemap schema path.
    pub fn with_schema_path(mut self, path: impl Into<String>) -> Self {
        self.schema_path = path.into();
        self
    }

    /// Read the `[sitemap_cache]` section from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| SitemapError::Config(format!("invalid INI: {}", e)))?;
        Self::from_ini(&ini)
    }

    /// Read the `[sitemap_cache]` section from an INI file.
    pub fn from_ini_file(path: &Path) -> Result<Self> {
        let ini = load_ini_file(path)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let Some(section) = ini.section(Some(CACHE_SECTION)) else {
            return Ok(Self::default());
        };

        let mode = match non_empty(section, "mode") {
            Some(value) => value.parse::<RepositoryMode>()?,
            None => RepositoryMode::Offline,
        };
        let mut config = Self::new(mode);

        if let Some(name) = non_empty(section, "name") {
            config.name = name.to_string();
        }
        if let Some(value) = non_empty(section, "entry_point_property") {
            config.entry_point_property = value.to_string();
        }
        if let Some(value) = non_empty(section, "sitemap_property") {
            config.sitemap_property = value.to_string();
        }
        if let Some(value) = non_empty(section, "sitemap_type") {
            config.sitemap_type = value.to_string();
        }
        if let Some(value) = non_empty(section, "schema_path") {
            config.schema_path = value.to_string();
        }
        Ok(config)
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    /// Directory for a log file; stderr only when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Read the `[logging]` section from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| SitemapError::Config(format!("invalid INI: {}", e)))?;
        Ok(Self::from_ini(&ini))
    }

    /// Read the `[logging]` section from an INI file.
    pub fn from_ini_file(path: &Path) -> Result<Self> {
        let ini = load_ini_file(path)?;
        Ok(Self::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut config = Self::default();
        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            if let Some(level) = non_empty(section, "level") {
                config.level = level.to_string();
            }
            config.directory = non_empty(section, "directory").map(PathBuf::from);
        }
        config
    }
}

/// Default configuration file location (`<config dir>/sitemap-cache/config.ini`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sitemap-cache").join("config.ini"))
}

fn load_ini_file(path: &Path) -> Result<Ini> {
    Ini::load_from_file(path)
        .map_err(|e| SitemapError::Config(format!("cannot load {}: {}", path.display(), e)))
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}
