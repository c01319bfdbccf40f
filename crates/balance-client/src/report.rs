//! 遥测上报
//!
//! 纯输出：把本周期的状态和测量快照渲染为遥测帧，不包含任何决策逻辑。

use crate::state::VehicleState;
use crate::types::MeasurementSnapshot;
use balance_protocol::TelemetryFrame;
use std::time::Duration;

/// 构建本周期的遥测帧
pub fn telemetry_frame(
    state: VehicleState,
    snapshot: &MeasurementSnapshot,
    now: Duration,
) -> TelemetryFrame {
    TelemetryFrame {
        state: state.code(),
        lean_angle: snapshot.lean_angle,
        steer_angle: snapshot.steer_angle,
        lean_rate: snapshot.lean_rate,
        steer_rate: snapshot.steer_rate,
        speed: snapshot.speed,
        torque: snapshot.torque,
        timestamp: now.as_secs_f64(),
    }
}
