//! 集成测试共享工具

#![allow(dead_code)]

use balance_client::{ManualClock, Supervisor, SupervisorConfig, TickOutcome, Vehicle, VehicleState};
use balance_driver::mock::{
    MockBalanceActuator, MockBalanceActuatorState, MockDriveActuator, MockDriveState, MockImu,
    MockImuState, MockIndicator, MockIndicatorState, MockLink, Shared,
};
use balance_protocol::{OperatorCommand, RequestFlags};
use std::sync::Arc;
use std::time::Duration;

pub type MockSupervisor = Supervisor<MockImu, MockBalanceActuator, MockDriveActuator, MockIndicator>;

/// 监督器 + 所有 mock 句柄
pub struct Harness {
    pub supervisor: MockSupervisor,
    pub imu: Shared<MockImuState>,
    pub balance: Shared<MockBalanceActuatorState>,
    pub drive: Shared<MockDriveState>,
    pub indicator: Shared<MockIndicatorState>,
    pub clock: ManualClock,
}

/// 使能超时很短的测试配置
pub fn test_config() -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.enable.timeout_ms = 20;
    config.enable.poll_interval_ms = 1;
    config
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SupervisorConfig) -> Self {
        let imu = MockImu::new();
        let balance = MockBalanceActuator::new();
        let drive = MockDriveActuator::new();
        let indicator = MockIndicator::new();
        let clock = ManualClock::new();

        let handles = (imu.handle(), balance.handle(), drive.handle(), indicator.handle());
        let supervisor = Supervisor::new(
            Vehicle {
                imu,
                balance,
                drive,
                indicator,
            },
            config,
        )
        .with_clock(Arc::new(clock.clone()));

        Self {
            supervisor,
            imu: handles.0,
            balance: handles.1,
            drive: handles.2,
            indicator: handles.3,
            clock,
        }
    }

    /// 以指定状态开始，并清空进入过程产生的记录
    pub fn in_state(state: VehicleState) -> Self {
        let mut harness = Self::new();
        harness.supervisor = harness.supervisor.with_initial_state(state);
        assert_eq!(harness.supervisor.state(), state);
        harness.clear_records();
        harness
    }

    pub fn clear_records(&self) {
        {
            let mut b = self.balance.lock();
            b.mode_history.clear();
            b.position_commands.clear();
            b.torque_commands.clear();
        }
        self.drive.lock().speed_commands.clear();
        {
            let mut i = self.indicator.lock();
            i.beeps.clear();
            i.patterns.clear();
        }
    }

    pub fn set_lean(&self, lean: f64) {
        self.imu.lock().lean_angle = lean;
    }

    pub fn set_speed(&self, speed: f64) {
        self.drive.lock().speed = speed;
    }

    pub fn request(&mut self, bits: u8) {
        self.supervisor
            .apply_command(OperatorCommand::SetRequestFlags(RequestFlags::from_bits(bits)));
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.clock.advance(Duration::from_millis(10));
        self.supervisor.tick()
    }

    pub fn step(&mut self, link: &mut MockLink) -> TickOutcome {
        self.clock.advance(Duration::from_millis(10));
        self.supervisor.step(link)
    }

    pub fn pending(&self) -> u8 {
        self.supervisor.register().requests().bits()
    }
}
