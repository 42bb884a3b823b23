use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

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

    for (key, value) in unset_pairs(&content, |key| std::env::var(key).is_ok()) {
        // SAFETY: main calls this before it builds the tokio runtime, while the
        // process has a single thread.
        unsafe { std::env::set_var(key, value) };
    }
}

/// Pairs from `.env` content whose keys are not set yet. Variables already
/// in the environment take precedence.
fn unset_pairs(content: &str, is_set: impl Fn(&str) -> bool) -> Vec<(String, String)> {
    parse_dotenv(content)
        .into_iter()
        .filter(|(key, _)| !is_set(key))
        .collect()
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub tree: TreeConfig,
    pub access: AccessConfig,
    pub account: AccountConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Topic prefix under which the realtime tree is mirrored.
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Shared household PIN. Plain comparison, not per-user.
    pub pin: String,
    pub success_bucket: String,
    pub failure_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Key that father/mother accounts must present at registration.
    pub family_key: String,
    pub default_avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for the file-backed document and blob stores.
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "10.0.0.2".to_string(),
                broker_port: 1883,
                client_id: "home-shadow".to_string(),
                username: None,
                password: None,
            },
            tree: TreeConfig {
                prefix: "home".to_string(),
            },
            access: AccessConfig {
                pin: "123456".to_string(),
                success_bucket: "entries/success/".to_string(),
                failure_bucket: "entries/failure/".to_string(),
            },
            account: AccountConfig {
                family_key: "12345".to_string(),
                default_avatar_url: "avatars/unknown.jpg".to_string(),
            },
            storage: StorageConfig {
                data_dir: dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("home-shadow"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from defaults plus whatever `lookup` resolves.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // MQTT configuration
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }

        if let Some(prefix) = lookup("SHADOW_TREE_PREFIX") {
            config.tree.prefix = prefix.trim_matches('/').to_string();
        }

        if let Some(pin) = lookup("HOME_ACCESS_PIN") {
            config.access.pin = pin;
        }
        if let Some(key) = lookup("HOME_FAMILY_KEY") {
            config.account.family_key = key;
        }
        if let Some(url) = lookup("HOME_DEFAULT_AVATAR") {
            config.account.default_avatar_url = url;
        }
        if let Some(dir) = lookup("HOME_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        config
    }
}
