//! PID 稳定控制器
//!
//! ```text
//! torque = Kp * e + Ki * ∫e dt + Kd * lean_rate + Ks * (steer_ref - steer) - Kds * steer_rate
//! ```
//!
//! 其中 `e = lean - lean_ref`。微分项直接使用测量的侧倾角速度，
//! 因此时间跳变不会产生导数尖峰。

use super::controller::{StabilityController, StabilityInput};
use crate::config::StabilitySettings;
use std::time::Duration;

/// PID 稳定控制器
#[derive(Debug, Clone)]
pub struct PidStabilityController {
    kp: f64,
    ki: f64,
    kd: f64,
    steer_kp: f64,
    steer_kd: f64,

    /// 积分项累积值
    integral: f64,

    /// 积分项限制（防止积分饱和）
    integral_limit: f64,

    /// 输出力矩限制
    output_limit: f64,
}

impl PidStabilityController {
    /// 创建控制器（默认增益 Kp=10, Kd=0.5，限幅 5 N·m）
    pub fn new() -> Self {
        Self::from_settings(&StabilitySettings::default())
    }

    pub fn from_settings(settings: &StabilitySettings) -> Self {
        Self {
            kp: settings.kp,
            ki: settings.ki,
            kd: settings.kd,
            steer_kp: settings.steer_kp,
            steer_kd: settings.steer_kd,
            integral: 0.0,
            integral_limit: settings.integral_limit.abs(),
            output_limit: settings.output_limit.abs(),
        }
    }

    /// 设置侧倾 PID 增益
    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// 设置转向反馈增益
    pub fn with_steer_gains(mut self, kp: f64, kd: f64) -> Self {
        self.steer_kp = kp;
        self.steer_kd = kd;
        self
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit.abs();
        self
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit.abs();
        self
    }

    /// 当前积分值
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

impl Default for PidStabilityController {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilityController for PidStabilityController {
    fn tick(&mut self, input: &StabilityInput, dt: Duration) -> f64 {
        let error = input.lean_angle - input.lean_angle_ref;

        self.integral = (self.integral + error * dt.as_secs_f64())
            .clamp(-self.integral_limit, self.integral_limit);

        let output = self.kp * error
            + self.ki * self.integral
            + self.kd * input.lean_rate
            + self.steer_kp * (input.steer_angle_ref - input.steer_angle)
            - self.steer_kd * input.steer_rate;

        output.clamp(-self.output_limit, self.output_limit)
    }

    fn reset(&mut self) {
        self.integral = 0.0;
    }
}
