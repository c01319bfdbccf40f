//! 客户端层错误类型定义

use balance_driver::DriverError;
use thiserror::Error;

/// 客户端层错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 协作者错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 配置文件读取失败
    #[error("Failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置值非法
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
