//! 操作员链路的标准输入 / 输出线程
//!
//! - 读线程：逐行解析 stdin，推入指令通道
//! - 写线程：从遥测通道取帧，按格式写到 stdout

use balance_protocol::{
    OperatorCommand, ProtocolError, TelemetryFrame, format_telemetry_line, parse_command_line,
};
use clap::ValueEnum;
use crossbeam_channel::{Receiver, Sender};
use std::io::{BufRead, Write};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// 入站指令格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// 串口文本（`s1.5`, `d-0.1`, `c4`）
    Text,
    /// 十六进制编码的 32 字节无线帧
    BinaryHex,
}

/// 遥测输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// 制表符分隔文本
    Text,
    /// 十六进制编码的二进制帧
    BinaryHex,
    /// 每行一个 JSON 对象
    Json,
}

/// 解析一行入站数据
pub fn parse_line(line: &str, format: InputFormat) -> Result<Option<OperatorCommand>, ProtocolError> {
    match format {
        InputFormat::Text => parse_command_line(line),
        InputFormat::BinaryHex => {
            let line = line.trim();
            if line.is_empty() {
                return Ok(None);
            }
            let bytes = hex::decode(line)
                .map_err(|e| ProtocolError::ParseError(format!("hex frame: {}", e)))?;
            OperatorCommand::try_from(bytes.as_slice()).map(Some)
        },
    }
}

/// 渲染一帧遥测
pub fn render(frame: &TelemetryFrame, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_telemetry_line(frame),
        OutputFormat::BinaryHex => hex::encode(frame.to_bytes()),
        OutputFormat::Json => match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode telemetry as JSON: {}", e);
                String::new()
            },
        },
    }
}

/// 启动 stdin 读线程
///
/// 线程在 stdin 结束或通道关闭时退出。
pub fn spawn_reader(
    format: InputFormat,
    commands: Sender<Result<OperatorCommand, ProtocolError>>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("balance-sim-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    },
                };
                let parsed = match parse_line(&line, format) {
                    Ok(Some(command)) => Ok(command),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                };
                if commands.send(parsed).is_err() {
                    break;
                }
            }
            debug!("stdin reader finished");
        })
}

/// 启动 stdout 写线程
///
/// 线程在遥测通道的所有发送端释放后退出。
pub fn spawn_writer(
    format: OutputFormat,
    telemetry: Receiver<TelemetryFrame>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("balance-sim-stdout".to_string())
        .spawn(move || {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for frame in telemetry.iter() {
                if let Err(e) = writeln!(out, "{}", render(&frame, format)) {
                    warn!("stdout write failed: {}", e);
                    break;
                }
            }
            let _ = out.flush();
        })
}
