use crate::error::{Result, SensorError};
use crate::http::{UrlProperty, UrlSpec};
use crate::state::extractor::{self, DEFAULT_GROUP};
use crate::state::CacheTtl;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let mut value = value.trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key.trim(), value));
        }
    }

    pairs
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("http-contact-sensor")
        .join("config.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub accessory: AccessoryConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

/// Accessory configuration, using the same keys as the homebridge accessory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub get_url: Option<UrlProperty>,
    /// Milliseconds, -1 for infinite.
    #[serde(default)]
    pub status_cache: Option<i64>,
    #[serde(default)]
    pub status_pattern: Option<String>,
    /// Kept loosely typed, a wrong type only produces a warning.
    #[serde(default)]
    pub pattern_group_to_extract: Option<Value>,
    /// Milliseconds.
    #[serde(default)]
    pub pull_interval: Option<u64>,
    #[serde(rename = "notificationID", default)]
    pub notification_id: Option<String>,
    #[serde(default)]
    pub notification_password: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

fn default_name() -> String {
    "Contact Sensor".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            get_url: None,
            status_cache: None,
            status_pattern: None,
            pattern_group_to_extract: None,
            pull_interval: None,
            notification_id: None,
            notification_password: None,
            debug: false,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "http-contact-sensor".to_string(),
            username: None,
            password: None,
        }
    }
}

impl AccessoryConfig {
    /// Validated `getUrl`. Missing or invalid is fatal for the accessory.
    pub fn url_spec(&self) -> Result<UrlSpec> {
        let property = self.get_url.as_ref().ok_or_else(|| {
            SensorError::Configuration("Property 'getUrl' is required!".to_string())
        })?;
        UrlSpec::try_from(property).map_err(|e| match e {
            SensorError::Configuration(msg) => SensorError::Configuration(format!(
                "Error occurred while parsing 'getUrl': {}",
                msg
            )),
            other => other,
        })
    }

    pub fn cache_ttl(&self) -> Result<CacheTtl> {
        match self.status_cache {
            Some(millis) => CacheTtl::from_millis(millis),
            None => Ok(CacheTtl::default()),
        }
    }

    /// Compiled `statusPattern`, falling back to the default on error.
    pub fn status_pattern(&self) -> Regex {
        match &self.status_pattern {
            Some(pattern) => Regex::new(pattern).unwrap_or_else(|e| {
                warn!(
                    "Property 'statusPattern' is not a valid pattern ({}). Using default one!",
                    e
                );
                extractor::default_pattern()
            }),
            None => extractor::default_pattern(),
        }
    }

    pub fn pattern_group(&self) -> usize {
        let group = match &self.pattern_group_to_extract {
            None => return DEFAULT_GROUP,
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        match group.and_then(|g| usize::try_from(g).ok()) {
            Some(g) => g,
            None => {
                warn!("Property 'patternGroupToExtract' must be a number! Using default value!");
                DEFAULT_GROUP
            }
        }
    }

    /// `None` disables the pull timer.
    pub fn pull_interval(&self) -> Option<Duration> {
        self.pull_interval
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }
}

impl Config {
    /// Read a JSON config file and overlay environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config.with_env())
    }

    /// Read `path` if it exists, otherwise fall back to [`Config::from_env`].
    /// `None` means [`default_config_path`].
    pub fn load_or_env(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(default_config_path, Path::to_path_buf);
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::load(&path)
        } else {
            info!("No configuration file at {}, using environment", path.display());
            Ok(Self::from_env())
        }
    }

    /// Default configuration overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    pub fn with_env(mut self) -> Self {
        if let Ok(name) = std::env::var("CONTACT_SENSOR_NAME") {
            self.accessory.name = name;
        }
        if let Ok(url) = std::env::var("CONTACT_SENSOR_GET_URL") {
            self.accessory.get_url = Some(UrlProperty::Plain(url));
        }
        if let Ok(cache) = std::env::var("CONTACT_SENSOR_STATUS_CACHE")
            && let Ok(c) = cache.parse()
        {
            self.accessory.status_cache = Some(c);
        }
        if let Ok(pattern) = std::env::var("CONTACT_SENSOR_STATUS_PATTERN") {
            self.accessory.status_pattern = Some(pattern);
        }
        if let Ok(interval) = std::env::var("CONTACT_SENSOR_PULL_INTERVAL")
            && let Ok(i) = interval.parse()
        {
            self.accessory.pull_interval = Some(i);
        }
        if let Ok(id) = std::env::var("CONTACT_SENSOR_NOTIFICATION_ID") {
            self.accessory.notification_id = Some(id);
        }
        if let Ok(password) = std::env::var("CONTACT_SENSOR_NOTIFICATION_PASSWORD") {
            self.accessory.notification_password = Some(password);
        }
        if let Ok(debug) = std::env::var("CONTACT_SENSOR_DEBUG") {
            self.accessory.debug = matches!(debug.as_str(), "1" | "true" | "yes");
        }

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            self.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            self.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            self.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            self.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accessory(value: Value) -> AccessoryConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_accessory_config() {
        let config: Config = serde_json::from_value(json!({
            "name": "Garage",
            "getUrl": "http://10.0.0.9/door",
            "statusCache": 5000,
            "statusPattern": "door: (opened|closed)",
            "patternGroupToExtract": 1,
            "pullInterval": 10000,
            "notificationID": "garage",
            "notificationPassword": "secret",
            "debug": true,
            "mqtt": {"brokerHost": "10.0.0.2", "brokerPort": 1884, "clientId": "garage-sensor"}
        }))
        .unwrap();

        let accessory = &config.accessory;
        assert_eq!(accessory.name, "Garage");
        assert_eq!(
            accessory.url_spec().unwrap().url.as_str(),
            "http://10.0.0.9/door"
        );
        assert_eq!(
            accessory.cache_ttl().unwrap(),
            CacheTtl::For(Duration::from_secs(5))
        );
        assert_eq!(accessory.status_pattern().as_str(), "door: (opened|closed)");
        assert_eq!(accessory.pattern_group(), 1);
        assert_eq!(accessory.pull_interval(), Some(Duration::from_secs(10)));
        assert_eq!(accessory.notification_id.as_deref(), Some("garage"));
        assert!(accessory.debug);
        assert_eq!(config.mqtt.broker_port, 1884);
    }

    #[test]
    fn test_defaults() {
        let config = accessory(json!({"getUrl": "http://sensor/"}));
        assert_eq!(config.name, "Contact Sensor");
        assert_eq!(config.cache_ttl().unwrap(), CacheTtl::default());
        assert_eq!(config.status_pattern().as_str(), extractor::DEFAULT_PATTERN);
        assert_eq!(config.pattern_group(), DEFAULT_GROUP);
        assert_eq!(config.pull_interval(), None);
        assert!(!config.debug);
    }

    #[test]
    fn test_missing_get_url() {
        let config = accessory(json!({"name": "No Url"}));
        assert!(matches!(
            config.url_spec(),
            Err(SensorError::Configuration(_))
        ));
    }

    #[test]
    fn test_infinite_cache() {
        let config = accessory(json!({"statusCache": -1}));
        assert_eq!(config.cache_ttl().unwrap(), CacheTtl::Infinite);
    }

    #[test]
    fn test_invalid_pattern_falls_back() {
        let config = accessory(json!({"statusPattern": "(unclosed"}));
        assert_eq!(config.status_pattern().as_str(), extractor::DEFAULT_PATTERN);
    }

    #[test]
    fn test_pattern_group_types() {
        assert_eq!(accessory(json!({"patternGroupToExtract": 2})).pattern_group(), 2);
        assert_eq!(accessory(json!({"patternGroupToExtract": "3"})).pattern_group(), 3);
        assert_eq!(
            accessory(json!({"patternGroupToExtract": true})).pattern_group(),
            DEFAULT_GROUP
        );
        assert_eq!(
            accessory(json!({"patternGroupToExtract": -2})).pattern_group(),
            DEFAULT_GROUP
        );
    }

    #[test]
    fn test_zero_pull_interval_disables_timer() {
        assert_eq!(accessory(json!({"pullInterval": 0})).pull_interval(), None);
    }

    #[test]
    fn test_load_or_env_reads_file() {
        let path =
            std::env::temp_dir().join(format!("contact-sensor-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"getUrl": "http://10.0.0.9/door", "mqtt": {"brokerHost": "broker.lan"}}"#,
        )
        .unwrap();

        let config = Config::load_or_env(Some(&path));
        fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert!(config.accessory.get_url.is_some());
        assert_eq!(config.mqtt.broker_port, 1883);
        if std::env::var("MQTT_BROKER_HOST").is_err() {
            assert_eq!(config.mqtt.broker_host, "broker.lan");
        }
    }

    #[test]
    fn test_load_or_env_without_file() {
        let path = std::env::temp_dir().join("contact-sensor-missing/config.json");
        assert!(Config::load_or_env(Some(&path)).is_ok());
    }

    #[test]
    fn test_parse_dotenv() {
        let pairs = parse_dotenv(
            "# comment\n\nCONTACT_SENSOR_NAME = Back Door\nMQTT_PASSWORD=\"p w\"\ninvalid line\n",
        );
        assert_eq!(
            pairs,
            vec![("CONTACT_SENSOR_NAME", "Back Door"), ("MQTT_PASSWORD", "p w")]
        );
    }
}
