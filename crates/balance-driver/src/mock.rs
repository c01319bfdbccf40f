//! Mock 协作者
//!
//! 用于测试的模拟 IMU、执行器、指示器和操作员链路。
//! 每个 mock 的内部状态通过 `Arc<Mutex<..>>` 共享，
//! 测试持有 `handle()` 即可编排传感器读数并检查执行器收到的指令。

use crate::{
    ActuatorMode, BalanceActuator, CommandLink, DriveActuator, DriverError, Imu, Indicator, Rgb,
};
use balance_protocol::{OperatorCommand, ProtocolError, TelemetryFrame};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// 共享状态句柄
pub type Shared<T> = Arc<Mutex<T>>;

// ==================== IMU ====================

/// 模拟 IMU 状态
#[derive(Debug, Clone)]
pub struct MockImuState {
    pub lean_angle: f64,
    pub lean_rate: f64,
    /// 陀螺仪校准是否成功
    pub gyro_ok: bool,
    /// 加速度计校准是否成功
    pub accel_ok: bool,
    /// 是否模拟刷新失败
    pub fail_update: bool,
    pub update_count: usize,
    pub gyro_calibrations: usize,
    pub accel_calibrations: Vec<(f64, f64, f64)>,
}

impl Default for MockImuState {
    fn default() -> Self {
        Self {
            lean_angle: 0.0,
            lean_rate: 0.0,
            gyro_ok: true,
            accel_ok: true,
            fail_update: false,
            update_count: 0,
            gyro_calibrations: 0,
            accel_calibrations: Vec::new(),
        }
    }
}

/// 模拟 IMU
#[derive(Debug, Clone, Default)]
pub struct MockImu {
    state: Shared<MockImuState>,
}

impl MockImu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Shared<MockImuState> {
        Arc::clone(&self.state)
    }
}

impl Imu for MockImu {
    fn update(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.update_count += 1;
        if state.fail_update {
            return Err(DriverError::Sensor("mock imu update failure".to_string()));
        }
        Ok(())
    }

    fn lean_angle(&self) -> f64 {
        self.state.lock().lean_angle
    }

    fn lean_rate(&self) -> f64 {
        self.state.lock().lean_rate
    }

    fn calibrate_gyros(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.gyro_calibrations += 1;
        if state.gyro_ok {
            Ok(())
        } else {
            Err(DriverError::CalibrationFailed("gyro bias".to_string()))
        }
    }

    fn calibrate_accel(&mut self, x: f64, y: f64, z: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.accel_calibrations.push((x, y, z));
        if state.accel_ok {
            Ok(())
        } else {
            Err(DriverError::CalibrationFailed("accel offset".to_string()))
        }
    }
}

// ==================== 平衡执行器 ====================

/// 模拟平衡执行器状态
#[derive(Debug, Clone)]
pub struct MockBalanceActuatorState {
    pub position: f64,
    pub velocity: f64,
    pub torque: f64,
    pub mode: ActuatorMode,
    pub enabled: bool,
    /// 第 N 次轮询后报告已使能；`None` 表示永不使能
    pub enable_after_polls: Option<usize>,
    /// 自上次 `set_mode` 以来的轮询次数
    pub enable_polls: usize,
    pub fail_set_mode: bool,
    pub fail_set_torque: bool,
    pub fail_update: bool,
    pub mode_history: Vec<ActuatorMode>,
    pub position_commands: Vec<f64>,
    pub torque_commands: Vec<f64>,
    pub disable_count: usize,
}

impl Default for MockBalanceActuatorState {
    fn default() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            torque: 0.0,
            mode: ActuatorMode::PositionTracking,
            enabled: false,
            enable_after_polls: Some(1),
            enable_polls: 0,
            fail_set_mode: false,
            fail_set_torque: false,
            fail_update: false,
            mode_history: Vec::new(),
            position_commands: Vec::new(),
            torque_commands: Vec::new(),
            disable_count: 0,
        }
    }
}

/// 模拟平衡执行器
#[derive(Debug, Clone, Default)]
pub struct MockBalanceActuator {
    state: Shared<MockBalanceActuatorState>,
}

impl MockBalanceActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Shared<MockBalanceActuatorState> {
        Arc::clone(&self.state)
    }
}

impl BalanceActuator for MockBalanceActuator {
    fn update(&mut self) -> Result<(), DriverError> {
        if self.state.lock().fail_update {
            return Err(DriverError::Actuator("mock actuator update failure".to_string()));
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn velocity(&self) -> f64 {
        self.state.lock().velocity
    }

    fn torque(&self) -> f64 {
        self.state.lock().torque
    }

    fn mode(&self) -> ActuatorMode {
        self.state.lock().mode
    }

    fn set_mode(&mut self, mode: ActuatorMode) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.fail_set_mode {
            return Err(DriverError::Actuator("mode change rejected".to_string()));
        }
        state.mode = mode;
        state.enabled = false;
        state.enable_polls = 0;
        state.mode_history.push(mode);
        Ok(())
    }

    fn enable_operation(&mut self) -> Result<bool, DriverError> {
        let mut state = self.state.lock();
        state.enable_polls += 1;
        state.enabled = match state.enable_after_polls {
            Some(n) => state.enable_polls >= n,
            None => false,
        };
        Ok(state.enabled)
    }

    fn disable_operation(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.enabled = false;
        state.torque = 0.0;
        state.disable_count += 1;
        Ok(())
    }

    fn set_position(&mut self, angle: f64) -> Result<(), DriverError> {
        self.state.lock().position_commands.push(angle);
        Ok(())
    }

    fn set_torque(&mut self, torque: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.fail_set_torque {
            return Err(DriverError::Actuator("torque command rejected".to_string()));
        }
        state.torque = torque;
        state.torque_commands.push(torque);
        Ok(())
    }
}

// ==================== 驱动执行器 ====================

/// 模拟驱动执行器状态
#[derive(Debug, Clone, Default)]
pub struct MockDriveState {
    pub speed: f64,
    /// 设定速度后实际速度立即跟随
    pub follow_setpoint: bool,
    /// 是否模拟设速失败（失败的指令不记录）
    pub fail_set_speed: bool,
    pub speed_commands: Vec<f64>,
}

/// 模拟驱动执行器
#[derive(Debug, Clone, Default)]
pub struct MockDriveActuator {
    state: Shared<MockDriveState>,
}

impl MockDriveActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Shared<MockDriveState> {
        Arc::clone(&self.state)
    }
}

impl DriveActuator for MockDriveActuator {
    fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.fail_set_speed {
            return Err(DriverError::Actuator("drive rejected speed".to_string()));
        }
        state.speed_commands.push(speed);
        if state.follow_setpoint {
            state.speed = speed;
        }
        Ok(())
    }
}

// ==================== 指示器 ====================

/// 模拟指示器状态
#[derive(Debug, Clone, Default)]
pub struct MockIndicatorState {
    pub passive: Rgb,
    pub blink: Rgb,
    pub pulse: Option<(u32, u32)>,
    pub beeps: Vec<u32>,
    pub patterns: Vec<u8>,
    pub update_count: usize,
}

/// 模拟指示器
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    state: Shared<MockIndicatorState>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Shared<MockIndicatorState> {
        Arc::clone(&self.state)
    }
}

impl Indicator for MockIndicator {
    fn update(&mut self) -> Result<(), DriverError> {
        self.state.lock().update_count += 1;
        Ok(())
    }

    fn set_passive_color(&mut self, color: Rgb) -> Result<(), DriverError> {
        self.state.lock().passive = color;
        Ok(())
    }

    fn set_blink_color(&mut self, color: Rgb) -> Result<(), DriverError> {
        self.state.lock().blink = color;
        Ok(())
    }

    fn set_pulse(&mut self, on_ms: u32, off_ms: u32) -> Result<(), DriverError> {
        self.state.lock().pulse = Some((on_ms, off_ms));
        Ok(())
    }

    fn disable_pulse(&mut self) -> Result<(), DriverError> {
        self.state.lock().pulse = None;
        Ok(())
    }

    fn beep(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        self.state.lock().beeps.push(duration_ms);
        Ok(())
    }

    fn beep_pattern(&mut self, bits: u8) -> Result<(), DriverError> {
        self.state.lock().patterns.push(bits);
        Ok(())
    }
}

// ==================== 操作员链路 ====================

/// 模拟链路状态
#[derive(Debug, Clone, Default)]
pub struct MockLinkState {
    pub inbound: VecDeque<Result<OperatorCommand, ProtocolError>>,
    pub sent: Vec<TelemetryFrame>,
}

/// 模拟操作员链路
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    state: Shared<MockLinkState>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Shared<MockLinkState> {
        Arc::clone(&self.state)
    }

    /// 排队一条入站指令
    pub fn push_command(&self, command: OperatorCommand) {
        self.state.lock().inbound.push_back(Ok(command));
    }

    /// 排队一条无法解析的入站帧
    pub fn push_malformed(&self, error: ProtocolError) {
        self.state.lock().inbound.push_back(Err(error));
    }
}

impl CommandLink for MockLink {
    fn poll_command(&mut self) -> Result<Option<OperatorCommand>, DriverError> {
        match self.state.lock().inbound.pop_front() {
            Some(Ok(cmd)) => Ok(Some(cmd)),
            Some(Err(e)) => Err(DriverError::Protocol(e)),
            None => Ok(None),
        }
    }

    fn send_telemetry(&mut self, frame: &TelemetryFrame) -> Result<(), DriverError> {
        self.state.lock().sent.push(*frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_imu_scripted_readings() {
        let mut imu = MockImu::new();
        let handle = imu.handle();
        handle.lock().lean_angle = 0.3;

        imu.update().unwrap();
        assert_eq!(imu.lean_angle(), 0.3);

        handle.lock().gyro_ok = false;
        assert!(imu.calibrate_gyros().is_err());
        assert!(imu.calibrate_accel(0.0, 0.0, 9.8).is_ok());
        assert_eq!(handle.lock().accel_calibrations.len(), 1);
    }

    #[test]
    fn test_mock_actuator_never_enables() {
        let mut actuator = MockBalanceActuator::new();
        actuator.handle().lock().enable_after_polls = None;
        actuator.set_mode(ActuatorMode::TorqueTracking).unwrap();
        for _ in 0..5 {
            assert!(!actuator.enable_operation().unwrap());
        }
    }

    #[test]
    fn test_mock_drive_follow_setpoint() {
        let mut drive = MockDriveActuator::new();
        drive.set_speed(1.0).unwrap();
        assert_eq!(drive.speed(), 0.0);

        drive.handle().lock().follow_setpoint = true;
        drive.set_speed(2.0).unwrap();
        assert_eq!(drive.speed(), 2.0);
        assert_eq!(drive.handle().lock().speed_commands, vec![1.0, 2.0]);

        drive.handle().lock().fail_set_speed = true;
        assert!(drive.set_speed(3.0).is_err());
        assert_eq!(drive.speed(), 2.0);
    }
}
