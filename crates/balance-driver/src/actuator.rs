//! 执行器接口
//!
//! - `BalanceActuator`: 转向 / 平衡电机，支持位置跟踪与力矩跟踪两种模式
//! - `DriveActuator`: 驱动电机，仅暴露速度设定

use crate::{ActuatorMode, DriverError};

/// 平衡执行器
///
/// Getter 返回最近一次 `update()` 缓存的值，不会失败。
pub trait BalanceActuator {
    /// 刷新位置 / 速度 / 力矩反馈
    fn update(&mut self) -> Result<(), DriverError>;

    /// 转向角（rad）
    fn position(&self) -> f64;

    /// 转向角速度（rad/s）
    fn velocity(&self) -> f64;

    /// 实际输出力矩（N·m）
    fn torque(&self) -> f64;

    /// 最近一次请求的工作模式
    fn mode(&self) -> ActuatorMode;

    /// 请求切换工作模式
    ///
    /// 切换后需通过 `enable_operation()` 轮询确认。
    fn set_mode(&mut self, mode: ActuatorMode) -> Result<(), DriverError>;

    /// 请求使能并返回是否已使能
    fn enable_operation(&mut self) -> Result<bool, DriverError>;

    /// 失能（输出零力矩）
    fn disable_operation(&mut self) -> Result<(), DriverError>;

    /// 位置设定（rad），仅在位置跟踪模式下有效
    fn set_position(&mut self, angle: f64) -> Result<(), DriverError>;

    /// 力矩设定（N·m），仅在力矩跟踪模式下有效
    ///
    /// 实现方负责按配置的最大变化率做斜坡限制。
    fn set_torque(&mut self, torque: f64) -> Result<(), DriverError>;
}

/// 驱动执行器
pub trait DriveActuator {
    /// 当前车速（m/s）
    fn speed(&self) -> f64;

    /// 速度设定（m/s）
    fn set_speed(&mut self, speed: f64) -> Result<(), DriverError>;
}
