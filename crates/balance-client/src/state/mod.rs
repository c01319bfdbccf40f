//! 状态机模块
//!
//! - `VehicleState`: 车辆状态（封闭枚举，含终止故障态）
//! - `transitions`: 按状态排列的有序守卫表
//! - `Supervisor`: 每周期评估守卫、执行进入副作用、调用控制律

pub mod machine;
pub mod transitions;
mod vehicle_state;

pub use machine::{Supervisor, TickOutcome, Vehicle};
pub use transitions::{Guard, Transition};
pub use vehicle_state::{IndicatorPattern, STARTUP_PATTERN, VehicleState};
