//! 监督控制层模块
//!
//! 自平衡转向电动车的监督控制循环，包括：
//! - 状态机（转换表 + 每周期转换 / 动作协议）
//! - 执行器模式协调（进入状态前切换平衡执行器模式）
//! - 控制律分派（每个状态对应一种控制律）
//! - 遥测上报
//!
//! # 单周期顺序
//!
//! ```text
//! 传感器读取 → 转换评估 → 执行器模式切换 → 控制律 → 上报 → 排空指令
//! ```
//!
//! 所有步骤在单线程内严格顺序执行，不需要加锁。

pub mod clock;
pub mod config;
pub mod control;
mod error;
pub mod loop_runner;
pub mod report;
pub mod state;
pub mod types;

// 重新导出常用类型
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::SupervisorConfig;
pub use control::{ControlLaw, ControlOutput, PidStabilityController, StabilityController};
pub use error::ClientError;
pub use loop_runner::{LoopConfig, LoopStats, run_supervisor};
pub use state::{Supervisor, TickOutcome, Vehicle, VehicleState};
pub use types::*;
