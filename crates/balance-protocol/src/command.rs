//! 入站指令帧
//!
//! 无线帧布局（固定 32 字节负载）：
//!
//! ```text
//! Byte 0     : 标签（CommandTag）
//! Byte 1     : 有效负载长度
//! Byte 2..   : 负载（f32 小端 / 请求位域）
//! ```

use crate::ProtocolError;
use bilge::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 无线帧固定长度
pub const COMMAND_FRAME_LEN: usize = 32;

/// 负载起始偏移
const PAYLOAD_OFFSET: usize = 2;

/// 指令标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CommandTag {
    /// 设置车速（m/s）
    SetSpeed = 0x01,
    /// 设置转向参考角（rad）
    SetSteerReference = 0x02,
    /// 设置请求标志
    SetRequestFlags = 0x03,
}

impl CommandTag {
    /// 负载长度（字节）
    pub fn payload_len(self) -> usize {
        match self {
            CommandTag::SetSpeed | CommandTag::SetSteerReference => 4,
            CommandTag::SetRequestFlags => 1,
        }
    }
}

/// 操作员请求位域（8 位）
///
/// 协议定义：
/// - Bit 0: 请求校准
/// - Bit 1: 请求手动模式
/// - Bit 2: 请求停车（急停）
/// - Bit 3: 请求恢复
/// - Bit 4-7: 保留
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    pub calibrate: bool, // Bit 0
    pub manual: bool,    // Bit 1
    pub stop: bool,      // Bit 2
    pub resume: bool,    // Bit 3
    pub reserved: u4,    // Bit 4-7: 保留
}

impl RequestFlags {
    pub const CALIBRATE: u8 = 0b0000_0001;
    pub const MANUAL: u8 = 0b0000_0010;
    pub const STOP: u8 = 0b0000_0100;
    pub const RESUME: u8 = 0b0000_1000;

    /// 从原始字节构建（保留位被丢弃）
    pub fn from_bits(bits: u8) -> Self {
        RequestFlags::from(u8::new(bits & 0x0F))
    }

    /// 转换为原始字节
    pub fn bits(self) -> u8 {
        u8::from(self).value()
    }

    /// 是否没有任何请求
    pub fn is_empty(self) -> bool {
        self.bits() == 0
    }

    /// 合并（按位或）
    pub fn union(self, other: RequestFlags) -> Self {
        Self::from_bits(self.bits() | other.bits())
    }

    /// 清除 `other` 中置位的请求
    pub fn difference(self, other: RequestFlags) -> Self {
        Self::from_bits(self.bits() & !other.bits())
    }
}

/// 操作员指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    /// 设置车速参考（m/s）
    SetSpeed(f64),
    /// 设置转向参考角（rad）
    SetSteerReference(f64),
    /// 置位请求标志
    SetRequestFlags(RequestFlags),
}

impl OperatorCommand {
    /// 对应的标签
    pub fn tag(&self) -> CommandTag {
        match self {
            OperatorCommand::SetSpeed(_) => CommandTag::SetSpeed,
            OperatorCommand::SetSteerReference(_) => CommandTag::SetSteerReference,
            OperatorCommand::SetRequestFlags(_) => CommandTag::SetRequestFlags,
        }
    }

    /// 编码为无线帧
    pub fn to_frame(&self) -> [u8; COMMAND_FRAME_LEN] {
        let mut frame = [0u8; COMMAND_FRAME_LEN];
        let tag = self.tag();
        frame[0] = tag.into();
        frame[1] = tag.payload_len() as u8;

        match *self {
            OperatorCommand::SetSpeed(value) | OperatorCommand::SetSteerReference(value) => {
                frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 4]
                    .copy_from_slice(&(value as f32).to_le_bytes());
            },
            OperatorCommand::SetRequestFlags(flags) => {
                frame[PAYLOAD_OFFSET] = flags.bits();
            },
        }
        frame
    }
}

impl TryFrom<&[u8]> for OperatorCommand {
    type Error = ProtocolError;

    /// 从无线帧解析
    ///
    /// 长度字节仅作参考，负载长度由标签决定。
    fn try_from(frame: &[u8]) -> Result<Self, Self::Error> {
        if frame.is_empty() {
            return Err(ProtocolError::InvalidLength {
                expected: PAYLOAD_OFFSET,
                actual: 0,
            });
        }

        let tag = CommandTag::try_from(frame[0])
            .map_err(|_| ProtocolError::UnknownTag { tag: frame[0] })?;

        let needed = PAYLOAD_OFFSET + tag.payload_len();
        if frame.len() < needed {
            return Err(ProtocolError::InvalidLength {
                expected: needed,
                actual: frame.len(),
            });
        }

        let payload = &frame[PAYLOAD_OFFSET..needed];
        let command = match tag {
            CommandTag::SetSpeed => OperatorCommand::SetSpeed(read_f32_le(payload)?),
            CommandTag::SetSteerReference => {
                OperatorCommand::SetSteerReference(read_f32_le(payload)?)
            },
            CommandTag::SetRequestFlags => {
                OperatorCommand::SetRequestFlags(RequestFlags::from_bits(payload[0]))
            },
        };
        Ok(command)
    }
}

/// 读取小端 f32 负载，拒绝 NaN / 无穷大
fn read_f32_le(bytes: &[u8]) -> Result<f64, ProtocolError> {
    let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if !value.is_finite() {
        return Err(ProtocolError::ParseError(format!(
            "non-finite float payload: {}",
            value
        )));
    }
    Ok(f64::from(value))
}
