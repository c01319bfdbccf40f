//! 驱动层模块
//!
//! 本模块定义监督控制循环所依赖的外部协作者接口，包括：
//! - IMU（侧倾角 / 角速度、校准）
//! - 平衡执行器（位置 / 力矩跟踪模式、使能握手）
//! - 驱动执行器（速度设定）
//! - 指示器（颜色、脉冲、蜂鸣）
//! - 操作员链路（指令入站、遥测出站）
//!
//! 以及执行器模式协调（有界使能等待）。
//!
//! # 使用场景
//!
//! 硬件驱动实现这些 trait；测试使用 `mock` feature 提供的模拟实现。

pub mod actuator;
mod error;
pub mod imu;
pub mod indicator;
pub mod link;
pub mod mode;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use actuator::{BalanceActuator, DriveActuator};
pub use error::DriverError;
pub use imu::Imu;
pub use indicator::{Indicator, Rgb};
pub use link::{ChannelLink, CommandLink};
pub use mode::{ActuatorMode, EnableConfig, ModeCoordinator};
