use crate::base::ResourceType;

// default app settings
pub const GATEWAY_FLOW_VERSION: &str = "v1";
pub const DEFAULT_APP_NAME: &str = "unknown_service";
pub const DEFAULT_APP_TYPE: u8 = ResourceType::APIGateway as _;
pub const APP_NAME_ENV_KEY: &str = "GATEWAY_FLOW_APP_NAME";
pub const APP_TYPE_ENV_KEY: &str = "GATEWAY_FLOW_APP_TYPE";
pub const CONF_FILE_PATH_ENV_KEY: &str = "GATEWAY_FLOW_CONFIG_FILE_PATH";
pub const CONFIG_FILENAME: &str = "USE_DEFAULT_CONFIGURATION";

// remote counter store settings
pub const STORE_SERVER_ENV_KEY: &str = "GATEWAY_FLOW_REDIS_SERVER";
pub const STORE_AUTH_ENV_KEY: &str = "GATEWAY_FLOW_REDIS_AUTH";
pub const DEFAULT_KEY_PREFIX: &str = "gateway-flow:";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

// priority fallback settings
pub const DEFAULT_RESOURCE_SUFFIX: &str = "$";
pub const DEFAULT_TRIGGER_MARKER: &str = "RAP";

// default log settings
pub const DEFAULT_LOG_LEVEL: &str = "warn";
