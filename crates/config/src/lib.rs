//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务器监听地址
//! - 定时投递扫描节奏
//! - 日志过滤

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 定时投递配置
    pub scheduler: SchedulerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 定时投递配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 到期扫描间隔（毫秒）。只影响投递的及时性，不影响正确性。
    pub sweep_interval_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 未设置 RUST_LOG 时使用的过滤指令。
    pub filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
            },
            scheduler: SchedulerConfig {
                sweep_interval_ms: 3_000,
            },
            logging: LoggingConfig {
                filter: "info".into(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置，优先级从低到高：内置默认值 -> 可选的 YAML 文件
    /// （CLASSCHAT_CONFIG_FILE 指定路径）-> CLASSCHAT_ 前缀的环境
    /// 变量（节与字段用双下划线分隔，如 CLASSCHAT_SERVER__PORT）。
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("CLASSCHAT_CONFIG_FILE") {
            fig = fig.merge(Yaml::file(path));
        }
        fig = fig.merge(Env::prefixed("CLASSCHAT_").split("__"));

        let config: AppConfig = fig.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "host cannot be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "port must be non-zero".to_string(),
            ));
        }
        if self.scheduler.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidSchedulerConfig(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidLoggingConfig(
                "log filter cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 服务器监听地址。
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid scheduler configuration: {0}")]
    InvalidSchedulerConfig(String),
    #[error("Invalid logging configuration: {0}")]
    InvalidLoggingConfig(String),
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}
