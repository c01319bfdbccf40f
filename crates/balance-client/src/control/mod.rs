//! 控制律模块
//!
//! - `StabilityController`: 自主状态下的稳定控制器接口
//! - `PidStabilityController`: 默认的侧倾 / 转向 PID 实现
//! - `ControlDispatch`: 按状态选择并执行控制律

pub mod controller;
pub mod dispatch;
pub mod pid;

pub use controller::{StabilityController, StabilityInput};
pub use dispatch::{CalibrationReport, ControlDispatch, ControlLaw, ControlOutput, StabilityContext};
pub use pid::PidStabilityController;
