//! 操作员链路
//!
//! 入站指令在控制周期末尾同步排空；出站遥测每周期发送一次。
//! 具体传输（无线 / 串口）由实现方决定。

use crate::DriverError;
use balance_protocol::{OperatorCommand, ProtocolError, TelemetryFrame};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// 操作员指令 / 遥测链路
pub trait CommandLink {
    /// 非阻塞读取一条指令
    ///
    /// - `Ok(Some(cmd))`: 收到指令
    /// - `Ok(None)`: 当前无待处理指令
    /// - `Err(DriverError::Protocol(..))`: 收到无法解析的帧（调用方应忽略）
    fn poll_command(&mut self) -> Result<Option<OperatorCommand>, DriverError>;

    /// 发送遥测
    fn send_telemetry(&mut self, frame: &TelemetryFrame) -> Result<(), DriverError>;
}

/// 基于 crossbeam 通道的链路
///
/// 读线程解析传输层数据后推入 `commands`，遥测推入 `telemetry` 由写线程输出。
pub struct ChannelLink {
    commands: Receiver<Result<OperatorCommand, ProtocolError>>,
    telemetry: Sender<TelemetryFrame>,
}

impl ChannelLink {
    pub fn new(
        commands: Receiver<Result<OperatorCommand, ProtocolError>>,
        telemetry: Sender<TelemetryFrame>,
    ) -> Self {
        Self {
            commands,
            telemetry,
        }
    }
}

impl CommandLink for ChannelLink {
    fn poll_command(&mut self) -> Result<Option<OperatorCommand>, DriverError> {
        match self.commands.try_recv() {
            Ok(Ok(cmd)) => Ok(Some(cmd)),
            Ok(Err(e)) => Err(DriverError::Protocol(e)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    fn send_telemetry(&mut self, frame: &TelemetryFrame) -> Result<(), DriverError> {
        self.telemetry.send(*frame).map_err(|_| DriverError::ChannelClosed)
    }
}
