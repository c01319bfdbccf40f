//! 监督层数据类型
//!
//! - `MeasurementSnapshot`: 周期开始时读取的一组不可变测量值
//! - `CommandRegister`: 操作员请求位（锁存）与参考值

mod command;
mod measurement;

pub use command::{CommandRegister, References, Request};
pub use measurement::MeasurementSnapshot;
