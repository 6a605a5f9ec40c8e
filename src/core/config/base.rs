use super::{constant::*, ConfigEntity};
use crate::{logging, utils, Error, Result};
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

/// Loads the general configuration from the YAML file under the provided
/// path, then overrides items from the process environment.
/// Priority: system environment > YAML file > default config.
pub fn load_config_with_yaml(config_path: &str) -> Result<ConfigEntity> {
    let mut config_path = config_path.to_owned();
    if utils::is_blank(&config_path) {
        // If the config file path is absent, try to resolve it from the system env.
        config_path = env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_else(|_| CONFIG_FILENAME.into());
    }
    let mut entity = load_config_from_yaml_file(&config_path)?;
    override_items_from_system_env(&mut entity)?;
    entity.check()?;
    Ok(entity)
}

fn load_config_from_yaml_file(path_str: &str) -> Result<ConfigEntity> {
    if path_str == CONFIG_FILENAME {
        // use the default config
        return Ok(ConfigEntity::new());
    }
    let path = Path::new(path_str);
    if !path.exists() {
        return Err(Error::msg("gateway-flow YAML configuration file does not exist!"));
    }
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let entity: ConfigEntity = serde_yaml::from_str(&content)?;
    logging::info!(
        "[Config] Resolving gateway flow config from file, file {}",
        path_str
    );
    Ok(entity)
}

fn override_items_from_system_env(entity: &mut ConfigEntity) -> Result<()> {
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            entity.config.app.app_name = app_name;
        }
    }
    if let Ok(app_type) = env::var(APP_TYPE_ENV_KEY) {
        entity.config.app.app_type = app_type.parse::<u8>().unwrap_or(DEFAULT_APP_TYPE).into();
    }
    if let Ok(server) = env::var(STORE_SERVER_ENV_KEY) {
        if !utils::is_blank(&server) {
            entity.config.cluster.server = server;
        }
    }
    if let Ok(auth) = env::var(STORE_AUTH_ENV_KEY) {
        if !utils::is_blank(&auth) {
            entity.config.cluster.auth = Some(auth);
        }
    }
    Ok(())
}

#[cfg(any(feature = "logger_env", feature = "logger_log4rs"))]
pub fn init_log(entity: &ConfigEntity) -> Result<()> {
    logging::logger_init(entity.config.log.config_file.clone());
    logging::info!(
        "[Config] App name resolved, appName {}",
        entity.config.app.app_name
    );
    Ok(())
}
