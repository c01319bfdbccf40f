//! 出站遥测帧
//!
//! 每个控制周期结束后发送一次，与当前状态无关。
//!
//! 二进制布局（31 字节）：
//!
//! ```text
//! Byte 0      : 帧头 0x0D
//! Byte 1      : 帧长度
//! Byte 2      : 状态码
//! Byte 3..31  : lean, steer, lean_rate, steer_rate, speed, torque, timestamp（f32 小端）
//! ```

use crate::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// 遥测帧头
pub const TELEMETRY_HEADER: u8 = 0x0D;

/// 遥测帧长度
pub const TELEMETRY_FRAME_LEN: usize = 3 + 7 * 4;

/// 遥测数据
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    /// 状态码（见 `VehicleState::code()`）
    pub state: u8,
    /// 侧倾角（rad）
    pub lean_angle: f64,
    /// 转向角（rad）
    pub steer_angle: f64,
    /// 侧倾角速度（rad/s）
    pub lean_rate: f64,
    /// 转向角速度（rad/s）
    pub steer_rate: f64,
    /// 车速（m/s）
    pub speed: f64,
    /// 执行器力矩（N·m）
    pub torque: f64,
    /// 启动以来的时间（s）
    pub timestamp: f64,
}

impl TelemetryFrame {
    /// 编码为二进制帧
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TELEMETRY_FRAME_LEN);
        buf.put_u8(TELEMETRY_HEADER);
        buf.put_u8(TELEMETRY_FRAME_LEN as u8);
        buf.put_u8(self.state);
        for value in [
            self.lean_angle,
            self.steer_angle,
            self.lean_rate,
            self.steer_rate,
            self.speed,
            self.torque,
            self.timestamp,
        ] {
            buf.put_f32_le(value as f32);
        }
        buf.freeze()
    }

    /// 从二进制帧解析
    pub fn from_bytes(mut data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < TELEMETRY_FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: TELEMETRY_FRAME_LEN,
                actual: data.len(),
            });
        }

        let header = data.get_u8();
        if header != TELEMETRY_HEADER {
            return Err(ProtocolError::InvalidHeader { header });
        }
        let _len = data.get_u8();
        let state = data.get_u8();

        Ok(Self {
            state,
            lean_angle: data.get_f32_le() as f64,
            steer_angle: data.get_f32_le() as f64,
            lean_rate: data.get_f32_le() as f64,
            steer_rate: data.get_f32_le() as f64,
            speed: data.get_f32_le() as f64,
            torque: data.get_f32_le() as f64,
            timestamp: data.get_f32_le() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetryFrame {
        TelemetryFrame {
            state: 4,
            lean_angle: 0.125,
            steer_angle: -0.5,
            lean_rate: 0.25,
            steer_rate: 1.0,
            speed: 3.0,
            torque: -1.5,
            timestamp: 12.5,
        }
    }

    #[test]
    fn test_telemetry_frame_layout() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), TELEMETRY_FRAME_LEN);
        assert_eq!(bytes[0], TELEMETRY_HEADER);
        assert_eq!(bytes[1] as usize, TELEMETRY_FRAME_LEN);
        assert_eq!(bytes[2], 4);
        assert_eq!(&bytes[3..7], &0.125f32.to_le_bytes());
        assert_eq!(&bytes[27..31], &12.5f32.to_le_bytes());
    }

    #[test]
    fn test_telemetry_frame_decode() {
        let frame = sample();
        let decoded = TelemetryFrame::from_bytes(&frame.to_bytes()).unwrap();
        // 样例值均可被 f32 精确表示
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_telemetry_invalid_header() {
        let mut bytes = sample().to_bytes().to_vec();
        bytes[0] = 0xAA;
        let err = TelemetryFrame::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidHeader { header: 0xAA });
    }

    #[test]
    fn test_telemetry_short_frame() {
        let err = TelemetryFrame::from_bytes(&[TELEMETRY_HEADER, 31, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidLength { .. }));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_telemetry_serde_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"state\":4"));
    }
}
