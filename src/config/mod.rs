//! # Configuration Management Module
//!
//! Type-safe configuration for the bot, game economy, storage, HTTP API, and
//! logging, loaded from a TOML file with sensible defaults.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - Telegram token and the URLs rendered into keyboards
//! - [`GameConfig`] - Economy constants (referral bonus, starting stats)
//! - [`StorageConfig`] - User store location
//! - [`ApiConfig`] - HTTP bind address, port, and optional auth secret
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! token = ""
//! game_url = "http://t.me/CloverMinerBot/ClovrMaster/"
//!
//! [api]
//! bind = "0.0.0.0"
//! port = 5000
//! ```
//!
//! ## Environment Integration
//!
//! Secrets and deployment knobs follow the precedence: environment > config
//! file > defaults. `TELEGRAM_BOT_TOKEN` overrides `bot.token` and `PORT`
//! overrides `api.port`; both are applied by [`Config::apply_env_overrides`].

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub game: GameConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot API token. Usually left empty in the file and supplied
    /// through the `TELEGRAM_BOT_TOKEN` environment variable.
    #[serde(default)]
    pub token: String,
    /// Mini-app URL the "Start Mining" button points at; the player's id is
    /// appended as `?userId=`.
    pub game_url: String,
    /// Deep-link base used to build each player's referral link
    /// (`{referral_base_url}?start={id}`).
    pub referral_base_url: String,
    /// Static announcement-channel invite rendered under the welcome message.
    pub channel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Balance credit granted to both sides of a successful referral.
    pub referral_bonus: i64,
    pub starting_level: i64,
    pub tap_per_click: i64,
    pub starting_energy: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            referral_bonus: 5000,
            starting_level: 1,
            tap_per_click: 2,
            starting_energy: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind: String,
    pub port: u16,
    /// When set, coin-update requests must carry a per-user token derived
    /// from this secret (see `http::ApiAuth`). Unset disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            auth_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Apply environment overrides: `TELEGRAM_BOT_TOKEN` and `PORT`.
    /// A malformed `PORT` is ignored with a warning rather than failing startup.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.bot.token = token.trim().to_string();
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.api.port = p,
                Err(_) => log::warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                token: String::new(),
                game_url: "http://t.me/CloverMinerBot/ClovrMaster/".to_string(),
                referral_base_url: "http://t.me/CloverMinerBot".to_string(),
                channel_url: "https://t.me/+vMBFR8eRy8w2OGY8".to_string(),
            },
            game: GameConfig::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            api: ApiConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("clovertap.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_game_economy_matches_product_constants() {
        let game = GameConfig::default();
        assert_eq!(game.referral_bonus, 5000);
        assert_eq!(game.starting_level, 1);
        assert_eq!(game.tap_per_click, 2);
        assert_eq!(game.starting_energy, 1000);
    }

    #[test]
    fn default_api_listens_on_5000() {
        let api = ApiConfig::default();
        assert_eq!(api.port, 5000);
        assert_eq!(api.bind, "0.0.0.0");
        assert!(api.auth_secret.is_none());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.bot.game_url, config.bot.game_url);
        assert_eq!(parsed.game.referral_bonus, config.game.referral_bonus);
        assert_eq!(parsed.api.port, config.api.port);
        assert_eq!(parsed.logging.level, config.logging.level);
    }

    #[test]
    fn minimal_config_fills_defaulted_sections() {
        let toml_src = r#"
            [bot]
            game_url = "https://example.test/app"
            referral_base_url = "https://t.me/ExampleBot"
            channel_url = "https://t.me/example"

            [storage]
            data_dir = "./data"

            [logging]
            level = "debug"
        "#;
        let parsed: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(parsed.game.referral_bonus, 5000);
        assert_eq!(parsed.api.port, 5000);
        assert!(parsed.bot.token.is_empty());
    }
}
