//! Configuration loading.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `maxkit.{profile}.toml` next to the main file
//! 3. `maxkit.toml` (or `.yaml`/`.yml` with `yaml-config`)
//! 4. `MAXKIT_*` environment variables, `__` separating sections:
//!    `MAXKIT_BOT__TOKEN`, `MAXKIT_POLLING__LIMIT=50`,
//!    `MAXKIT_DISPATCH__MAX_IN_FLIGHT=16`
//! 5. [`ConfigLoader::merge`]
//!
//! Files are looked up in the search paths in order; the first directory
//! holding a main or profile file is the only one read. `MAXKIT_PROFILE`
//! picks the profile when [`ConfigLoader::profile`] is not called.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .search_path("/etc/maxkit")
//!     .profile("prod")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format as _;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::MaxkitConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MAXKIT_";

/// Environment variable selecting the profile.
pub const PROFILE_VAR: &str = "MAXKIT_PROFILE";

const FILE_STEM: &str = "maxkit";

/// A configuration profile, such as `development` or `production`.
///
/// `dev` and `prod` are accepted as aliases; other names are kept as
/// given, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile(String);

impl Profile {
    /// The profile used when none is selected.
    pub const DEFAULT: &'static str = "development";

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self(match name.as_str() {
            "dev" => "development".to_string(),
            "prod" => "production".to_string(),
            _ => name,
        })
    }

    /// Reads [`PROFILE_VAR`], falling back to [`Profile::DEFAULT`].
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .map_or_else(Self::default, |name| Self::parse(&name))
    }

    /// Returns the profile name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// File formats enabled by crate features.
#[derive(Debug, Clone, Copy)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [Self] = &[
        #[cfg(feature = "toml-config")]
        Self::Toml,
        #[cfg(feature = "yaml-config")]
        Self::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

/// Layered configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
    overrides: Vec<MaxkitConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader reading the environment and, unless search paths
    /// are added, the current and user config directories.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            env: true,
            overrides: Vec::new(),
        }
    }

    /// Selects the profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Appends a directory to search for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Appends the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Appends the user config directory (`~/.config/maxkit` on Linux).
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Reads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `MAXKIT_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers `config` above every other source.
    pub fn merge(mut self, config: MaxkitConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads the configuration without validating it; see
    /// [`validate_config`](super::validate_config).
    pub fn load(self) -> ConfigResult<MaxkitConfig> {
        let mut figment = Figment::from(Serialized::defaults(MaxkitConfig::default()));

        figment = match &self.file {
            Some(path) => Self::merge_file(figment, path)?,
            None => self.merge_discovered(figment),
        };

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        for config in self.overrides {
            figment = figment.merge(Serialized::globals(config));
        }

        let config: MaxkitConfig = figment.extract()?;
        debug!(profile = %self.profile, "Configuration loaded");
        Ok(config)
    }

    fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::ParseError(format!(
                "unsupported or disabled configuration format: {}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "Loading configuration file");
        Ok(format.merge_into(figment, path))
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        Self::new()
            .with_current_dir()
            .with_user_config_dir()
            .search_paths
    }

    /// Files of the first directory holding any, lowest priority first.
    fn discover(&self) -> Vec<(FileFormat, PathBuf)> {
        for dir in self.search_paths() {
            let mut found = Vec::new();
            for &format in FileFormat::ENABLED {
                for ext in format.extensions() {
                    let profile_file = dir.join(format!("{FILE_STEM}.{}.{ext}", self.profile));
                    let main_file = dir.join(format!("{FILE_STEM}.{ext}"));
                    found.extend(
                        [profile_file, main_file]
                            .into_iter()
                            .filter(|path| path.is_file())
                            .map(|path| (format, path)),
                    );
                }
            }
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    fn merge_discovered(&self, figment: Figment) -> Figment {
        let files = self.discover();
        if files.is_empty() {
            warn!("No configuration file found, using defaults");
        }
        files.into_iter().fold(figment, |figment, (format, path)| {
            info!(path = %path.display(), "Loading configuration file");
            format.merge_into(figment, &path)
        })
    }
}

/// Loads configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<MaxkitConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MaxkitConfig> {
    ConfigLoader::new().file(path).load()
}
