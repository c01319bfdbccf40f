//! IMU 接口
//!
//! 滤波与校准状态归 IMU 驱动所有，监督层只读取校准后的缓存值。

use crate::DriverError;

/// 惯性测量单元
pub trait Imu {
    /// 刷新缓存读数
    fn update(&mut self) -> Result<(), DriverError>;

    /// 侧倾角（rad，已校准）
    fn lean_angle(&self) -> f64;

    /// 侧倾角速度（rad/s）
    fn lean_rate(&self) -> f64;

    /// 陀螺仪零偏校准
    fn calibrate_gyros(&mut self) -> Result<(), DriverError>;

    /// 加速度计偏移校准
    ///
    /// `(x, y, z)` 为静止时期望的加速度向量（m/s²）。
    fn calibrate_accel(&mut self, x: f64, y: f64, z: f64) -> Result<(), DriverError>;
}
