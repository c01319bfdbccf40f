//! 驱动层错误类型定义

use balance_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 操作超时（执行器使能握手未在时限内完成）
    #[error("Operation timeout: {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// 传感器校准失败
    #[error("Calibration failed: {0}")]
    CalibrationFailed(String),

    /// 执行器拒绝指令
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// 传感器读取失败
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// 链路通道已关闭
    #[error("Link channel closed")]
    ChannelClosed,
}

impl DriverError {
    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use balance_protocol::ProtocolError;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Timeout { timeout_ms: 500 };
        assert_eq!(format!("{}", err), "Operation timeout: 500ms");
        assert!(err.is_timeout());

        let err = DriverError::CalibrationFailed("gyro".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Calibration failed") && msg.contains("gyro"));
        assert!(!err.is_timeout());

        assert_eq!(format!("{}", DriverError::ChannelClosed), "Link channel closed");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::UnknownTag { tag: 9 }.into();
        match err {
            DriverError::Protocol(e) => assert!(e.is_unknown_tag()),
            _ => panic!("Expected Protocol variant"),
        }
    }
}
