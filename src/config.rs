use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use confique::Config as _;

use crate::prelude::*;


/// The locations where we look for a configuration file. The first existing
/// file in this list is used.
const DEFAULT_PATHS: &[&str] = &[
    // For better DX, we include this special path here, but just in debug mode.
    #[cfg(debug_assertions)]
    "util/dev-config/config.toml",

    "config.toml",
    "/etc/groupgate/config.toml",
];

const CONFIG_PATH_ENV: &str = "GROUPGATE_CONFIG_PATH";

/// Configuration for groupgate.
///
/// All relative paths are relative to the location of this configuration file.
#[derive(Debug, confique::Config)]
pub(crate) struct Config {
    #[config(nested)]
    pub(crate) http: crate::http::HttpConfig,

    #[config(nested)]
    pub(crate) container: crate::auth::ContainerConfig,

    #[config(nested)]
    pub(crate) groups: crate::auth::GroupsConfig,

    #[config(nested)]
    pub(crate) log: crate::logger::LogConfig,
}

impl Config {
    /// Tries to find a config file by checking `GROUPGATE_CONFIG_PATH` and a
    /// list of default locations. The first config file is loaded via
    /// [`Self::load_from`]. Returns the loaded config and its path.
    pub(crate) fn from_env_or_default_locations() -> Result<(Self, PathBuf)> {
        let path = if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            PathBuf::from(path)
        } else {
            DEFAULT_PATHS.iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!(
                    "no configuration file found. Note: we checked the following paths: {}",
                    DEFAULT_PATHS.join(", "),
                ))?
        };

        let config = Self::load_from(&path)
            .with_context(|| format!("failed to load configuration from '{}'", path.display()))?;

        Ok((config, path))
    }

    /// Loads the configuration from a specific TOML file and validates it.
    pub(crate) fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Config::from_file(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;

        config.fix_paths(path)?;
        config.validate()?;

        Ok(config)
    }

    /// Checks the config for values that cannot work.
    pub(crate) fn validate(&self) -> Result<()> {
        crate::auth::HeaderPrincipalMapping::from_config(&self.groups)
            .context("invalid 'groups' configuration")?;
        self.container.validate().context("invalid 'container' configuration")?;

        if self.groups.header.eq_ignore_ascii_case(&self.container.key_header) {
            bail!("'groups.header' and 'container.key_header' must be different headers");
        }

        Ok(())
    }

    /// Checks the config for problematic things that deserve a warning, but
    /// should not stop us.
    pub(crate) fn lint(&self) {
        self.container.lint();
    }

    /// Goes through all paths in the configuration and changes relative paths
    /// to be absolute based on the path of the configuration file itself.
    fn fix_paths(&mut self, config_path: &Path) -> Result<()> {
        fn fix_path(base_path: &Path, path: &mut PathBuf) {
            if path.is_relative() {
                *path = base_path.join(&path);
            }
        }

        let absolute_config_path = config_path.canonicalize()
            .context("failed to canonicalize config path")?;
        let base = absolute_config_path.parent()
            .ok_or_else(|| anyhow!("config file path has no parent"))?;

        if let Some(p) = &mut self.http.unix_socket {
            fix_path(base, p);
        }

        if let Some(p) = &mut self.log.file {
            fix_path(base, p);
        }

        Ok(())
    }
}

/// Writes the generated TOML config template file to the given destination or
/// stdout.
pub(crate) fn write_template(path: Option<&PathBuf>) -> Result<()> {
    use confique::toml::FormatOptions;

    let mut options = FormatOptions::default();
    options.general.nested_field_gap = 2;
    let template = confique::toml::template::<Config>(options);
    match path {
        Some(path) => fs::write(path, template)
            .with_context(|| format!("failed to write template to '{}'", path.display()))?,
        None => io::stdout().write_all(template.as_bytes())?,
    }

    Ok(())
}
