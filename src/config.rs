use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Minimum length of a signing secret accepted for session cookies.
pub const MIN_SECRET_LEN: usize = 64;

/// Upper bound for `session.expiry_minutes` (one year).
pub const MAX_EXPIRY_MINUTES: i64 = 525_600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub session: SessionConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,

    /// Where this config came from; filled in by [`Config::load`].
    #[serde(skip)]
    pub sources: ConfigSources,
}

/// Files read while loading, reported once logging is up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    pub env_file: Option<PathBuf>,

    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/members.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Off by default because the server speaks plain HTTP.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie signing secret. When empty a random key is generated at startup,
    /// which invalidates every session on restart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    pub cookie_name: String,

    pub expiry_minutes: i64,

    /// `false`: the session dies `expiry_minutes` after login.
    /// `true`: the window restarts on every request.
    pub rolling: bool,

    /// Re-read name and role from the users table on every guarded request
    /// instead of trusting the login-time snapshot.
    pub live_identity: bool,

    /// How often expired session rows are purged from the store.
    pub cleanup_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            cookie_name: "members.sid".to_string(),
            expiry_minutes: 60,
            rolling: false,
            live_identity: false,
            cleanup_interval_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub min_password_length: usize,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            min_password_length: 6,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Loads `.env`, the first config file found, then environment overrides.
    ///
    /// Runs before tracing is initialised; call [`Config::log_sources`]
    /// afterwards.
    pub fn load() -> Result<Self> {
        let env_file = dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.sources.env_file = env_file;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.sources.config_file = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn log_sources(&self) {
        if let Some(path) = &self.sources.env_file {
            info!("Loaded environment from: {}", path.display());
        }

        match &self.sources.config_file {
            Some(path) => info!("Loaded config from: {}", path.display()),
            None => info!("No config file found, using defaults"),
        }
    }

    /// `DATABASE_URL`, `SESSION_SECRET` and `PORT` take precedence over the file.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.general.database_path = url;
        }

        if let Some(secret) = var("SESSION_SECRET").filter(|v| !v.is_empty()) {
            self.session.secret = Some(secret);
        }

        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }

        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("members").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".members").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.expiry_minutes <= 0 {
            anyhow::bail!("session.expiry_minutes must be > 0");
        }

        if self.session.expiry_minutes > MAX_EXPIRY_MINUTES {
            anyhow::bail!("session.expiry_minutes must be at most {MAX_EXPIRY_MINUTES}");
        }

        if self.session.cookie_name.is_empty() {
            anyhow::bail!("session.cookie_name cannot be empty");
        }

        if let Some(secret) = &self.session.secret
            && secret.len() < MIN_SECRET_LEN
        {
            anyhow::bail!("session secret must be at least {MIN_SECRET_LEN} bytes");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("security.min_password_length must be > 0");
        }

        argon2::Params::new(
            self.security.argon2_memory_cost_kib,
            self.security.argon2_time_cost,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.expiry_minutes, 60);
        assert!(!config.session.rolling);
        assert!(!config.session.live_identity);
        assert_eq!(config.security.min_password_length, 6);
        assert_eq!(config.server.port, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [session]
            expiry_minutes = 15
            rolling = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.session.expiry_minutes, 15);
        assert!(config.session.rolling);

        assert_eq!(config.session.cookie_name, "members.sid");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", "sqlite:/tmp/other.db".to_string()),
            ("SESSION_SECRET", "s".repeat(64)),
            ("PORT", "8081".to_string()),
        ]);

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| vars.get(key).cloned())
            .unwrap();

        assert_eq!(config.general.database_path, "sqlite:/tmp/other.db");
        assert_eq!(config.server.port, 8081);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| (key == "PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = Config::default();
        config.session.secret = Some("too-short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_expiry() {
        let mut config = Config::default();
        config.session.expiry_minutes = 1_000_000_000_000;
        assert!(config.validate().is_err());

        config.session.expiry_minutes = MAX_EXPIRY_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_path_records_source() {
        let path =
            std::env::temp_dir().join(format!("members-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.sources.config_file.as_deref(), Some(path.as_path()));
        assert!(config.sources.env_file.is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_saved_config_omits_sources() {
        let mut config = Config::default();
        config.sources.config_file = Some(PathBuf::from("config.toml"));

        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(!toml.contains("sources"));
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let mut config = Config::default();
        config.session.expiry_minutes = 0;
        assert!(config.validate().is_err());
    }
}
