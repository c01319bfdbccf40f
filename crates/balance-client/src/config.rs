//! 监督层配置
//!
//! 所有字段都有默认值，TOML 文件只需覆盖需要修改的项：
//!
//! ```toml
//! loop_rate_hz = 200.0
//!
//! [thresholds]
//! fall_angle = 0.7
//!
//! [stability]
//! kp = 12.0
//! ```

use crate::ClientError;
use balance_driver::EnableConfig;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

/// 监督层配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// 转换守卫阈值
    pub thresholds: Thresholds,
    /// 执行器使能握手
    pub enable: EnableSettings,
    /// 稳定控制器参数
    pub stability: StabilitySettings,
    /// 校准参数
    pub calibration: CalibrationSettings,
    /// 控制循环频率（Hz）
    pub loop_rate_hz: f64,
    /// 侧倾参考角（rad）
    pub lean_angle_ref: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            enable: EnableSettings::default(),
            stability: StabilitySettings::default(),
            calibration: CalibrationSettings::default(),
            loop_rate_hz: 100.0,
            lean_angle_ref: 0.0,
        }
    }
}

impl SupervisorConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ClientError> {
        let t = &self.thresholds;
        if !(t.upright_angle > 0.0 && t.upright_angle < t.fall_angle) {
            return Err(ClientError::InvalidConfig(format!(
                "upright_angle ({}) must be in (0, fall_angle = {})",
                t.upright_angle, t.fall_angle
            )));
        }
        if t.low_speed > t.high_speed {
            return Err(ClientError::InvalidConfig(format!(
                "low_speed ({}) exceeds high_speed ({})",
                t.low_speed, t.high_speed
            )));
        }
        if t.stop_speed > t.start_speed {
            return Err(ClientError::InvalidConfig(format!(
                "stop_speed ({}) exceeds start_speed ({})",
                t.stop_speed, t.start_speed
            )));
        }
        if !(self.loop_rate_hz.is_finite() && self.loop_rate_hz > 0.0) {
            return Err(ClientError::InvalidConfig(format!(
                "loop_rate_hz must be positive, got {}",
                self.loop_rate_hz
            )));
        }
        let e = &self.enable;
        if e.timeout_ms == 0 || e.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(format!(
                "enable.timeout_ms ({}) and enable.poll_interval_ms ({}) must be > 0",
                e.timeout_ms, e.poll_interval_ms
            )));
        }
        if e.poll_interval_ms > e.timeout_ms {
            return Err(ClientError::InvalidConfig(format!(
                "enable.poll_interval_ms ({}) exceeds enable.timeout_ms ({})",
                e.poll_interval_ms, e.timeout_ms
            )));
        }
        if self.stability.max_dt_ms == 0 {
            return Err(ClientError::InvalidConfig("stability.max_dt_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// 控制周期
    pub fn loop_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.loop_rate_hz)
    }
}

/// 守卫阈值
///
/// 所有比较都是严格不等式，恰好等于阈值时守卫不成立。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// 倾倒角（rad）：|lean| 超过即判定倾倒
    pub fall_angle: f64,
    /// 直立角（rad）：|lean| 低于即判定已扶正
    pub upright_angle: f64,
    /// 辅助 → 自主 的车速（m/s）
    pub high_speed: f64,
    /// 自主 → 辅助 的车速（m/s）
    pub low_speed: f64,
    /// 空闲 → 辅助 的车速（m/s）
    pub start_speed: f64,
    /// 辅助 → 空闲 的车速（m/s）
    pub stop_speed: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fall_angle: PI / 4.0,
            upright_angle: PI / 20.0,
            high_speed: 2.5,
            low_speed: 2.0,
            start_speed: 1.0,
            stop_speed: 0.5,
        }
    }
}

/// 使能握手参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnableSettings {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub debounce_threshold: usize,
}

impl Default for EnableSettings {
    fn default() -> Self {
        let defaults = EnableConfig::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            debounce_threshold: defaults.debounce_threshold,
        }
    }
}

impl From<&EnableSettings> for EnableConfig {
    fn from(settings: &EnableSettings) -> Self {
        EnableConfig {
            timeout: Duration::from_millis(settings.timeout_ms),
            debounce_threshold: settings.debounce_threshold,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// 稳定控制器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    /// 侧倾角比例增益
    pub kp: f64,
    /// 侧倾角积分增益
    pub ki: f64,
    /// 侧倾角速度增益
    pub kd: f64,
    /// 转向角误差增益
    pub steer_kp: f64,
    /// 转向角速度增益
    pub steer_kd: f64,
    /// 输出力矩限幅（N·m）
    pub output_limit: f64,
    /// 积分项限幅
    pub integral_limit: f64,
    /// dt 上限（ms），超过即视为时间跳变
    pub max_dt_ms: u64,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            kp: 10.0,
            ki: 0.0,
            kd: 0.5,
            steer_kp: 0.0,
            steer_kd: 0.0,
            output_limit: 5.0,
            integral_limit: 1.0,
            max_dt_ms: 50,
        }
    }
}

impl StabilitySettings {
    pub fn max_dt(&self) -> Duration {
        Duration::from_millis(self.max_dt_ms)
    }
}

/// 校准参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// 静止时加速度计参考读数（m/s²）
    pub accel_reference: [f64; 3],
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            accel_reference: [0.0, 0.0, 9.80665],
        }
    }
}
