use super::constant::*;
use crate::base::ResourceType;
use crate::{utils, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug)]
pub struct AppConfig {
    // app_name represents the name of current running service.
    pub app_name: String,
    // app_type indicates the entry type of the service (e.g. web service, API gateway).
    pub app_type: ResourceType,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: DEFAULT_APP_NAME.into(),
            app_type: DEFAULT_APP_TYPE.into(),
        }
    }
}

/// ClusterConfig represents the connection settings of the shared remote
/// counter store. When `enabled` is false, counters are kept in process
/// memory and the admission decisions are local to this gateway instance.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClusterConfig {
    pub enabled: bool,
    // server address, `<host>:<port>`
    pub server: String,
    pub auth: Option<String>,
    // every key written by this process is namespaced under the prefix
    pub key_prefix: String,
    // deadline applied to connect and to each blocking command round trip
    pub timeout_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            enabled: false,
            server: String::default(),
            auth: None,
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }
}

/// TriggerStrategy selects how a request is recognized as eligible for the
/// priority fallback rule set. `Marker` checks the configured trailing
/// argument, `ArgCount` keeps the legacy heuristic comparing argument and
/// rule counts, `Any` accepts either signal.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggerStrategy {
    Marker,
    ArgCount,
    Any,
}

impl Default for TriggerStrategy {
    fn default() -> Self {
        TriggerStrategy::Marker
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PriorityConfig {
    pub enabled: bool,
    // appended to a resource name to derive its backup resource
    pub resource_suffix: String,
    // trailing argument value marking a request as fallback-eligible
    pub trigger_marker: String,
    pub trigger_strategy: TriggerStrategy,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        PriorityConfig {
            enabled: false,
            resource_suffix: DEFAULT_RESOURCE_SUFFIX.into(),
            trigger_marker: DEFAULT_TRIGGER_MARKER.into(),
            trigger_strategy: TriggerStrategy::default(),
        }
    }
}

// LogConfig represent the configuration of logging.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LogConfig {
    pub config_file: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GatewayConfig {
    pub app: AppConfig,
    pub cluster: ClusterConfig,
    pub priority: PriorityConfig,
    pub log: LogConfig,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigEntity {
    pub version: String,
    pub config: GatewayConfig,
}

impl Default for ConfigEntity {
    fn default() -> Self {
        ConfigEntity {
            version: GATEWAY_FLOW_VERSION.into(),
            config: GatewayConfig::default(),
        }
    }
}

impl ConfigEntity {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn check(&self) -> Result<()> {
        if utils::is_blank(&self.config.app.app_name) {
            return Err(Error::msg("app name cannot be blank"));
        }
        if self.config.cluster.enabled {
            let server = &self.config.cluster.server;
            if utils::is_blank(server) || !server.contains(':') {
                return Err(Error::msg(
                    "remote counter store server not set. Format - <host>:<port>",
                ));
            }
            if self.config.cluster.timeout_ms == 0 {
                return Err(Error::msg("remote counter store timeout cannot be zero"));
            }
        }
        if self.config.priority.enabled && self.config.priority.resource_suffix.is_empty() {
            return Err(Error::msg("backup resource suffix cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Display for ConfigEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).unwrap();
        write!(f, "{}", fmtted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_valid() {
        let entity = ConfigEntity::new();
        entity.check().unwrap();
    }

    #[test]
    #[should_panic(expected = "remote counter store server not set")]
    fn cluster_without_server() {
        let mut entity = ConfigEntity::new();
        entity.config.cluster.enabled = true;
        entity.check().unwrap();
    }

    #[test]
    #[should_panic(expected = "remote counter store server not set")]
    fn cluster_server_without_port() {
        let mut entity = ConfigEntity::new();
        entity.config.cluster.enabled = true;
        entity.config.cluster.server = "redis.internal".into();
        entity.check().unwrap();
    }

    #[test]
    #[should_panic(expected = "backup resource suffix cannot be empty")]
    fn priority_without_suffix() {
        let mut entity = ConfigEntity::new();
        entity.config.priority.enabled = true;
        entity.config.priority.resource_suffix = "".into();
        entity.check().unwrap();
    }

    #[test]
    fn cluster_entity() {
        let mut entity = ConfigEntity::new();
        entity.config.cluster.enabled = true;
        entity.config.cluster.server = "127.0.0.1:6379".into();
        entity.config.priority.enabled = true;
        entity.check().unwrap();
        assert_eq!(TriggerStrategy::Marker, entity.config.priority.trigger_strategy);
        assert_eq!("$", entity.config.priority.resource_suffix);
        assert_eq!("RAP", entity.config.priority.trigger_marker);
    }
}
