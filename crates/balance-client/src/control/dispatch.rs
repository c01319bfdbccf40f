//! 控制律分派
//!
//! 每个周期对当前状态恰好执行一种控制律：
//!
//! | 状态 | 控制律 |
//! |---|---|
//! | Idle, Manual | 无指令 |
//! | Calibrating | IMU 陀螺仪 / 加速度计校准 |
//! | Assisted | 位置保持：`setpoint = steer - steer_ref` |
//! | Autonomous | 稳定控制器输出力矩 |
//! | Fallen, EmergencyStop | 安全：驱动速度置零，力矩模式下力矩置零 |
//! | Fault | 禁用：驱动速度置零 |
//!
//! 控制律中的执行器错误只在本周期内记录，不会跨周期传播。

use super::controller::{StabilityController, StabilityInput};
use super::pid::PidStabilityController;
use crate::config::SupervisorConfig;
use crate::state::{Vehicle, VehicleState};
use crate::types::{MeasurementSnapshot, References};
use balance_driver::{BalanceActuator, DriveActuator, Imu, Indicator};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 陀螺仪校准成功提示音
pub const BEEP_GYRO_OK: u8 = 0b0111_0111;
/// 陀螺仪校准失败提示音
pub const BEEP_GYRO_FAILED: u8 = 0b1000_1000;
/// 加速度计校准成功提示音
pub const BEEP_ACCEL_OK: u8 = 0b1010_1010;
/// 加速度计校准失败提示音
pub const BEEP_ACCEL_FAILED: u8 = 0b0011_0011;

/// 控制律
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLaw {
    /// 不下发指令
    None,
    /// 传感器校准
    Calibration,
    /// 转向位置保持
    PositionHold,
    /// 完整稳定控制
    Stability,
    /// 安全（零速 / 零力矩）
    Safing,
    /// 故障禁用
    Disabled,
}

impl ControlLaw {
    /// 状态对应的控制律
    pub fn for_state(state: VehicleState) -> Self {
        match state {
            VehicleState::Idle | VehicleState::Manual => ControlLaw::None,
            VehicleState::Calibrating => ControlLaw::Calibration,
            VehicleState::Assisted => ControlLaw::PositionHold,
            VehicleState::Autonomous => ControlLaw::Stability,
            VehicleState::Fallen | VehicleState::EmergencyStop => ControlLaw::Safing,
            VehicleState::Fault => ControlLaw::Disabled,
        }
    }
}

/// 校准结果（两项独立）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReport {
    pub gyro_ok: bool,
    pub accel_ok: bool,
}

/// 控制律输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlOutput {
    /// 未下发指令
    None,
    /// 已执行校准
    Calibration(CalibrationReport),
    /// 已下发位置设定（rad）
    Position(f64),
    /// 已下发力矩（N·m）及使用的 dt
    Torque { torque: f64, dt: Duration },
    /// 已下发零速 / 零力矩
    Safing,
    /// 故障禁用
    Disabled,
}

/// 稳定控制律的时间上下文
///
/// 每次进入自主状态时重新初始化，首个 dt 从进入时刻算起。
#[derive(Debug, Clone)]
pub struct StabilityContext {
    last_call: Option<Duration>,
    max_dt: Duration,
}

impl StabilityContext {
    pub fn new(max_dt: Duration) -> Self {
        Self {
            last_call: None,
            max_dt,
        }
    }

    /// 以 `now` 为起点重新初始化
    pub fn reset(&mut self, now: Duration) {
        self.last_call = Some(now);
    }

    /// 计算自上次调用以来的 dt
    ///
    /// 返回 `(dt, jump)`：`dt` 已钳位到 `max_dt`，
    /// 发生钳位时 `jump` 为钳位前的实际间隔。
    pub fn advance(&mut self, now: Duration) -> (Duration, Option<Duration>) {
        let elapsed = match self.last_call {
            Some(last) => now.saturating_sub(last),
            None => Duration::ZERO,
        };
        self.last_call = Some(now);

        if elapsed > self.max_dt {
            (self.max_dt, Some(elapsed))
        } else {
            (elapsed, None)
        }
    }

    pub fn last_call(&self) -> Option<Duration> {
        self.last_call
    }
}

/// 控制律分派器
pub struct ControlDispatch {
    controller: Box<dyn StabilityController>,
    context: StabilityContext,
    accel_reference: [f64; 3],
}

impl ControlDispatch {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self::with_controller(
            config,
            Box::new(PidStabilityController::from_settings(&config.stability)),
        )
    }

    /// 使用自定义稳定控制器
    pub fn with_controller(config: &SupervisorConfig, controller: Box<dyn StabilityController>) -> Self {
        Self {
            controller,
            context: StabilityContext::new(config.stability.max_dt()),
            accel_reference: config.calibration.accel_reference,
        }
    }

    pub fn context(&self) -> &StabilityContext {
        &self.context
    }

    /// 状态进入通知
    pub fn on_enter(&mut self, state: VehicleState, now: Duration) {
        if state == VehicleState::Autonomous {
            self.context.reset(now);
            self.controller.reset();
        }
    }

    /// 执行控制律
    pub fn execute<I, A, D, L>(
        &mut self,
        law: ControlLaw,
        snapshot: &MeasurementSnapshot,
        references: &References,
        now: Duration,
        vehicle: &mut Vehicle<I, A, D, L>,
    ) -> ControlOutput
    where
        I: Imu,
        A: BalanceActuator,
        D: DriveActuator,
        L: Indicator,
    {
        match law {
            ControlLaw::None => ControlOutput::None,
            ControlLaw::Calibration => ControlOutput::Calibration(self.calibrate(vehicle)),
            ControlLaw::PositionHold => {
                let setpoint = snapshot.steer_angle - references.steer_angle;
                if let Err(e) = vehicle.balance.set_position(setpoint) {
                    warn!("Position setpoint rejected: {}", e);
                }
                ControlOutput::Position(setpoint)
            },
            ControlLaw::Stability => {
                let (dt, jump) = self.context.advance(now);
                if let Some(actual) = jump {
                    debug!(
                        "Stability law time jump: {:?} clamped to {:?}",
                        actual, dt
                    );
                    self.controller.on_time_jump(actual);
                }
                let input = StabilityInput {
                    lean_angle: snapshot.lean_angle,
                    steer_angle: snapshot.steer_angle,
                    lean_rate: snapshot.lean_rate,
                    steer_rate: snapshot.steer_rate,
                    lean_angle_ref: references.lean_angle,
                    steer_angle_ref: references.steer_angle,
                };
                let torque = self.controller.tick(&input, dt);
                if let Err(e) = vehicle.balance.set_torque(torque) {
                    warn!("Torque command rejected: {}", e);
                }
                ControlOutput::Torque { torque, dt }
            },
            ControlLaw::Safing => {
                safe_outputs(vehicle);
                ControlOutput::Safing
            },
            ControlLaw::Disabled => {
                if let Err(e) = vehicle.drive.set_speed(0.0) {
                    warn!("Failed to stop drive in fault state: {}", e);
                }
                ControlOutput::Disabled
            },
        }
    }

    fn calibrate<I, A, D, L>(&mut self, vehicle: &mut Vehicle<I, A, D, L>) -> CalibrationReport
    where
        I: Imu,
        A: BalanceActuator,
        D: DriveActuator,
        L: Indicator,
    {
        let gyro_ok = match vehicle.imu.calibrate_gyros() {
            Ok(()) => true,
            Err(e) => {
                warn!("Gyro calibration failed: {}", e);
                false
            },
        };
        report_pattern(
            &mut vehicle.indicator,
            if gyro_ok { BEEP_GYRO_OK } else { BEEP_GYRO_FAILED },
        );

        let [x, y, z] = self.accel_reference;
        let accel_ok = match vehicle.imu.calibrate_accel(x, y, z) {
            Ok(()) => true,
            Err(e) => {
                warn!("Accelerometer calibration failed: {}", e);
                false
            },
        };
        report_pattern(
            &mut vehicle.indicator,
            if accel_ok { BEEP_ACCEL_OK } else { BEEP_ACCEL_FAILED },
        );

        info!("Calibration finished: gyro_ok={}, accel_ok={}", gyro_ok, accel_ok);
        CalibrationReport { gyro_ok, accel_ok }
    }
}

impl std::fmt::Debug for ControlDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlDispatch")
            .field("context", &self.context)
            .field("accel_reference", &self.accel_reference)
            .finish_non_exhaustive()
    }
}

/// 驱动与力矩各自独立归零，一路失败不影响另一路
fn safe_outputs<I, A, D, L>(vehicle: &mut Vehicle<I, A, D, L>)
where
    A: BalanceActuator,
    D: DriveActuator,
{
    if let Err(e) = vehicle.drive.set_speed(0.0) {
        warn!("Failed to stop drive while safing: {}", e);
    }
    if vehicle.balance.mode().is_torque()
        && let Err(e) = vehicle.balance.set_torque(0.0)
    {
        warn!("Failed to zero balance torque while safing: {}", e);
    }
}

fn report_pattern<L: Indicator>(indicator: &mut L, bits: u8) {
    if let Err(e) = indicator.beep_pattern(bits) {
        warn!("Failed to play beep pattern {:#010b}: {}", bits, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_driver::ActuatorMode;
    use balance_driver::mock::{MockBalanceActuator, MockDriveActuator, MockImu, MockIndicator};

    type MockVehicle = Vehicle<MockImu, MockBalanceActuator, MockDriveActuator, MockIndicator>;

    fn vehicle() -> MockVehicle {
        Vehicle {
            imu: MockImu::new(),
            balance: MockBalanceActuator::new(),
            drive: MockDriveActuator::new(),
            indicator: MockIndicator::new(),
        }
    }

    fn dispatch() -> ControlDispatch {
        ControlDispatch::new(&SupervisorConfig::default())
    }

    #[test]
    fn test_law_for_each_state() {
        assert_eq!(ControlLaw::for_state(VehicleState::Idle), ControlLaw::None);
        assert_eq!(ControlLaw::for_state(VehicleState::Manual), ControlLaw::None);
        assert_eq!(ControlLaw::for_state(VehicleState::Calibrating), ControlLaw::Calibration);
        assert_eq!(ControlLaw::for_state(VehicleState::Assisted), ControlLaw::PositionHold);
        assert_eq!(ControlLaw::for_state(VehicleState::Autonomous), ControlLaw::Stability);
        assert_eq!(ControlLaw::for_state(VehicleState::Fallen), ControlLaw::Safing);
        assert_eq!(ControlLaw::for_state(VehicleState::EmergencyStop), ControlLaw::Safing);
        assert_eq!(ControlLaw::for_state(VehicleState::Fault), ControlLaw::Disabled);
    }

    #[test]
    fn test_position_hold_error() {
        let mut v = vehicle();
        let snapshot = MeasurementSnapshot {
            steer_angle: 0.3,
            ..Default::default()
        };
        let refs = References {
            steer_angle: 0.1,
            ..Default::default()
        };

        let out = dispatch().execute(ControlLaw::PositionHold, &snapshot, &refs, Duration::ZERO, &mut v);
        let ControlOutput::Position(setpoint) = out else {
            panic!("Expected position output, got {:?}", out);
        };
        approx::assert_relative_eq!(setpoint, 0.2, epsilon = 1e-12);
        assert_eq!(v.balance.handle().lock().position_commands, vec![setpoint]);
    }

    #[test]
    fn test_calibration_reports_each_result() {
        let mut v = vehicle();
        v.imu.handle().lock().gyro_ok = false;

        let out = dispatch().execute(
            ControlLaw::Calibration,
            &MeasurementSnapshot::default(),
            &References::default(),
            Duration::ZERO,
            &mut v,
        );

        assert_eq!(
            out,
            ControlOutput::Calibration(CalibrationReport {
                gyro_ok: false,
                accel_ok: true
            })
        );
        assert_eq!(
            v.indicator.handle().lock().patterns,
            vec![BEEP_GYRO_FAILED, BEEP_ACCEL_OK]
        );
        assert_eq!(
            v.imu.handle().lock().accel_calibrations,
            vec![(0.0, 0.0, 9.80665)]
        );
    }

    #[test]
    fn test_stability_dt_measured_from_entry() {
        let mut v = vehicle();
        let mut d = dispatch();
        let snapshot = MeasurementSnapshot::default();
        let refs = References::default();

        d.on_enter(VehicleState::Autonomous, Duration::from_secs(10));
        let out = d.execute(
            ControlLaw::Stability,
            &snapshot,
            &refs,
            Duration::from_millis(10_010),
            &mut v,
        );
        assert_eq!(
            out,
            ControlOutput::Torque {
                torque: 0.0,
                dt: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn test_stability_reentry_does_not_reuse_stale_timestamp() {
        let mut v = vehicle();
        let mut d = dispatch();
        let snapshot = MeasurementSnapshot {
            lean_angle: 0.1,
            ..Default::default()
        };
        let refs = References::default();

        d.on_enter(VehicleState::Autonomous, Duration::ZERO);
        d.execute(ControlLaw::Stability, &snapshot, &refs, Duration::from_millis(10), &mut v);

        // 离开 5 秒后重新进入
        d.on_enter(VehicleState::Autonomous, Duration::from_secs(5));
        let out = d.execute(
            ControlLaw::Stability,
            &snapshot,
            &refs,
            Duration::from_millis(5_010),
            &mut v,
        );
        let ControlOutput::Torque { dt, torque } = out else {
            panic!("Expected torque output, got {:?}", out);
        };
        assert_eq!(dt, Duration::from_millis(10));
        approx::assert_relative_eq!(torque, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stability_dt_clamped() {
        let mut context = StabilityContext::new(Duration::from_millis(50));
        context.reset(Duration::ZERO);

        let (dt, jump) = context.advance(Duration::from_millis(20));
        assert_eq!(dt, Duration::from_millis(20));
        assert_eq!(jump, None);

        let (dt, jump) = context.advance(Duration::from_millis(520));
        assert_eq!(dt, Duration::from_millis(50));
        assert_eq!(jump, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_safing_zeroes_drive_and_torque() {
        let mut v = vehicle();
        v.balance.handle().lock().mode = ActuatorMode::TorqueTracking;

        let out = dispatch().execute(
            ControlLaw::Safing,
            &MeasurementSnapshot::default(),
            &References::default(),
            Duration::ZERO,
            &mut v,
        );
        assert_eq!(out, ControlOutput::Safing);
        assert_eq!(v.drive.handle().lock().speed_commands, vec![0.0]);
        assert_eq!(v.balance.handle().lock().torque_commands, vec![0.0]);
    }

    #[test]
    fn test_safing_in_position_mode_leaves_torque_alone() {
        let mut v = vehicle();
        dispatch().execute(
            ControlLaw::Safing,
            &MeasurementSnapshot::default(),
            &References::default(),
            Duration::ZERO,
            &mut v,
        );
        assert!(v.balance.handle().lock().torque_commands.is_empty());
    }
}
