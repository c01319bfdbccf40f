//! StabilityController trait - 稳定控制器接口
//!
//! 自主状态下，控制器根据侧倾 / 转向状态与参考值计算平衡执行器力矩。
//!
//! # 时间跳变处理
//!
//! 当两次调用间隔超过 `max_dt` 时，调度器先调用 `on_time_jump()`，
//! 再以钳位后的 `dt` 调用 `tick()`。

use std::time::Duration;

/// 稳定控制器输入
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilityInput {
    pub lean_angle: f64,
    pub steer_angle: f64,
    pub lean_rate: f64,
    pub steer_rate: f64,
    pub lean_angle_ref: f64,
    pub steer_angle_ref: f64,
}

/// 稳定控制器接口
pub trait StabilityController: Send {
    /// 计算一步力矩输出（N·m）
    ///
    /// `dt` 可能已被钳位，不一定等于实际经过时间。
    fn tick(&mut self, input: &StabilityInput, dt: Duration) -> f64;

    /// 处理时间跳变
    ///
    /// `dt` 为钳位前的实际间隔。默认不做任何处理。
    fn on_time_jump(&mut self, _dt: Duration) {}

    /// 重置内部状态
    ///
    /// 每次进入自主状态时调用。
    fn reset(&mut self);
}
