//! 串口文本协议
//!
//! 入站：每行一条指令，首字符为标签：
//!
//! - `s<float>`: 设置车速
//! - `d<float>`: 设置转向参考角
//! - `c<u8>`: 置位请求标志（十进制）
//!
//! 出站：制表符分隔的遥测行。

use crate::ProtocolError;
use crate::command::{OperatorCommand, RequestFlags};
use crate::telemetry::TelemetryFrame;

/// 解析一行文本指令
///
/// 空行返回 `Ok(None)`。
pub fn parse_command_line(line: &str) -> Result<Option<OperatorCommand>, ProtocolError> {
    let line = line.trim();
    let mut chars = line.chars();
    let Some(tag) = chars.next() else {
        return Ok(None);
    };
    let payload = chars.as_str().trim();

    let command = match tag {
        's' => OperatorCommand::SetSpeed(parse_float(payload)?),
        'd' => OperatorCommand::SetSteerReference(parse_float(payload)?),
        'c' => {
            let bits = payload
                .parse::<u8>()
                .map_err(|e| ProtocolError::ParseError(format!("request flags '{}': {}", payload, e)))?;
            OperatorCommand::SetRequestFlags(RequestFlags::from_bits(bits))
        },
        other => {
            return Err(ProtocolError::UnknownTag {
                tag: u8::try_from(u32::from(other)).unwrap_or(0xFF),
            });
        },
    };
    Ok(Some(command))
}

fn parse_float(payload: &str) -> Result<f64, ProtocolError> {
    let value = payload
        .parse::<f64>()
        .map_err(|e| ProtocolError::ParseError(format!("float '{}': {}", payload, e)))?;
    if !value.is_finite() {
        return Err(ProtocolError::ParseError(format!(
            "float '{}': not finite",
            payload
        )));
    }
    Ok(value)
}

/// 格式化遥测行
///
/// 字段顺序：state, lean, steer, lean_rate, steer_rate, speed, torque, timestamp
pub fn format_telemetry_line(frame: &TelemetryFrame) -> String {
    format!(
        "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
        frame.state,
        frame.lean_angle,
        frame.steer_angle,
        frame.lean_rate,
        frame.steer_rate,
        frame.speed,
        frame.torque,
        frame.timestamp
    )
}
