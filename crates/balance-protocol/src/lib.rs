//! # Balance Protocol
//!
//! 操作员指令 / 遥测帧协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 入站指令（标签字节 + 负载）
//! - `telemetry`: 出站遥测帧
//! - `text`: 串口文本协议（每行一条指令）
//!
//! ## 字节序
//!
//! 无线帧中的浮点数使用小端字节序（IEEE-754 f32）。

pub mod command;
pub mod telemetry;
pub mod text;

// 重新导出常用类型
pub use command::*;
pub use telemetry::*;
pub use text::{format_telemetry_line, parse_command_line};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown command tag: 0x{tag:02X}")]
    UnknownTag { tag: u8 },

    #[error("Invalid frame header: 0x{header:02X}")]
    InvalidHeader { header: u8 },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ProtocolError {
    /// 是否为未知标签（调用方应静默忽略）
    pub fn is_unknown_tag(&self) -> bool {
        matches!(self, ProtocolError::UnknownTag { .. })
    }
}
