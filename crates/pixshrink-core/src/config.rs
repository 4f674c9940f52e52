//! Configuration module
//!
//! Server, authentication and optimizer settings, loaded from the environment
//! (and an optional `.env` file).

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FORMAT, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_WIDTH,
    DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY, SUPPORTED_CONTENT_TYPES, SUPPORTED_INPUT_FORMATS,
};
use crate::models::OutputFormat;

const SERVER_PORT: u16 = 5000;
const FRONTEND_URL: &str = "http://localhost:3000";
const UPLOAD_PATH: &str = "./uploads";
const RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// Server level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub environment: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub log_format: String,
}

/// Optimizer configuration
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    pub base: BaseConfig,
    pub upload_path: PathBuf,
    pub max_file_size_bytes: usize,
    pub max_files: usize,
    pub default_quality: u8,
    pub default_format: OutputFormat,
    pub max_width: u32,
    pub supported_input_formats: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<OptimizerConfig>);

impl Config {
    fn as_optimizer(&self) -> &OptimizerConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_optimizer().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = OptimizerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_optimizer().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_optimizer().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.as_optimizer().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_optimizer().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_optimizer().base.environment
    }

    pub fn rate_limit_max_requests(&self) -> u32 {
        self.as_optimizer().base.rate_limit_max_requests
    }

    pub fn rate_limit_window_secs(&self) -> u64 {
        self.as_optimizer().base.rate_limit_window_secs
    }

    pub fn log_format(&self) -> &str {
        &self.as_optimizer().base.log_format
    }

    pub fn upload_path(&self) -> &PathBuf {
        &self.as_optimizer().upload_path
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_optimizer().max_file_size_bytes
    }

    pub fn max_files(&self) -> usize {
        self.as_optimizer().max_files
    }

    pub fn default_quality(&self) -> u8 {
        self.as_optimizer().default_quality
    }

    pub fn default_format(&self) -> OutputFormat {
        self.as_optimizer().default_format
    }

    pub fn max_width(&self) -> u32 {
        self.as_optimizer().max_width
    }

    pub fn supported_input_formats(&self) -> &[String] {
        &self.as_optimizer().supported_input_formats
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_optimizer().allowed_content_types
    }

    /// Upper bound for a whole multipart request body.
    pub fn max_request_body_bytes(&self) -> usize {
        // Room for multipart boundaries and the small text fields.
        const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
        self.max_files()
            .saturating_mul(self.max_file_size_bytes())
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

impl OptimizerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS")
            .or_else(|_| env::var("FRONTEND_URL"))
            .unwrap_or_else(|_| FRONTEND_URL.to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_format_str =
            env::var("DEFAULT_FORMAT").unwrap_or_else(|_| DEFAULT_FORMAT.to_string());
        let default_format = OutputFormat::parse(&default_format_str).ok_or_else(|| {
            anyhow::anyhow!(
                "DEFAULT_FORMAT must be one of webp, jpeg, png, avif (got '{}')",
                default_format_str
            )
        })?;

        let supported_input_formats = env::var("SUPPORTED_INPUT_FORMATS")
            .map(|s| {
                s.split(',')
                    .map(|f| f.trim().to_lowercase())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                SUPPORTED_INPUT_FORMATS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                SUPPORTED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let config = OptimizerConfig {
            base: BaseConfig {
                server_port: env::var("PORT")
                    .unwrap_or_else(|_| SERVER_PORT.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                cors_origins,
                jwt_secret: env::var("JWT_SECRET")
                    .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
                environment,
                rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|_| RATE_LIMIT_MAX_REQUESTS.to_string())
                    .parse()
                    .unwrap_or(RATE_LIMIT_MAX_REQUESTS),
                rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| RATE_LIMIT_WINDOW_SECS.to_string())
                    .parse()
                    .unwrap_or(RATE_LIMIT_WINDOW_SECS),
                log_format: env::var("LOG_FORMAT")
                    .unwrap_or_else(|_| "text".to_string())
                    .to_lowercase(),
            },
            upload_path: PathBuf::from(
                env::var("UPLOAD_PATH").unwrap_or_else(|_| UPLOAD_PATH.to_string()),
            ),
            max_file_size_bytes: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
            max_files: env::var("MAX_FILES")
                .unwrap_or_else(|_| DEFAULT_MAX_FILES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILES),
            default_quality: env::var("DEFAULT_QUALITY")
                .unwrap_or_else(|_| DEFAULT_QUALITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_QUALITY),
            default_format,
            max_width: env::var("MAX_WIDTH")
                .unwrap_or_else(|_| DEFAULT_MAX_WIDTH.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_WIDTH),
            supported_input_formats,
            allowed_content_types,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        let is_production = matches!(
            self.base.environment.to_lowercase().as_str(),
            "production" | "prod"
        );
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.default_quality) {
            return Err(anyhow::anyhow!(
                "DEFAULT_QUALITY must be between {} and {}",
                MIN_QUALITY,
                MAX_QUALITY
            ));
        }

        if self.max_width == 0 {
            return Err(anyhow::anyhow!("MAX_WIDTH must be greater than 0"));
        }

        if self.max_files == 0 {
            return Err(anyhow::anyhow!("MAX_FILES must be greater than 0"));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than 0"));
        }

        if self.base.rate_limit_window_secs == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OptimizerConfig {
        OptimizerConfig {
            base: BaseConfig {
                server_port: 5000,
                cors_origins: vec!["http://localhost:3000".to_string()],
                jwt_secret: "a".repeat(32),
                environment: "development".to_string(),
                rate_limit_max_requests: 100,
                rate_limit_window_secs: 900,
                log_format: "text".to_string(),
            },
            upload_path: PathBuf::from("./uploads"),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            default_quality: DEFAULT_QUALITY,
            default_format: OutputFormat::Webp,
            max_width: DEFAULT_MAX_WIDTH,
            supported_input_formats: vec!["jpeg".to_string()],
            allowed_content_types: vec!["image/jpeg".to_string()],
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = sample();
        config.base.jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let mut config = sample();
        config.base.environment = "production".to_string();
        config.base.cors_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_default_quality() {
        let mut config = sample();
        config.default_quality = 0;
        assert!(config.validate().is_err());
        config.default_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_request_body_bytes_covers_all_files() {
        let config = Config(Box::new(sample()));
        assert!(config.max_request_body_bytes() > DEFAULT_MAX_FILES * DEFAULT_MAX_FILE_SIZE_BYTES);
    }

    #[test]
    fn test_is_production() {
        let mut inner = sample();
        inner.base.environment = "PROD".to_string();
        assert!(Config(Box::new(inner)).is_production());
        assert!(!Config(Box::new(sample())).is_production());
    }
}
