//! 监督状态机
//!
//! 单周期协议：
//!
//! 1. 刷新协作者缓存（失败只记录，沿用上次的值）
//! 2. 读取测量快照
//! 3. 按当前状态的守卫表依次评估，成立的守卫执行转换副作用
//!    （执行器模式切换、请求位清除、指示灯）
//! 4. 对最终状态执行恰好一种控制律
//! 5. 生成遥测帧
//!
//! 指令排空和遥测发送由 `step()` 在周期末尾完成。
//!
//! # 故障
//!
//! 任一执行器模式切换失败（包括使能超时）立即进入 `Fault`：
//! 跳过该守卫余下的副作用和后续所有守卫，禁用执行器、驱动置零、指示灯熄灭。
//! `Fault` 为终止态。

use super::transitions::{Transition, transitions_from};
use super::vehicle_state::{IndicatorPattern, STARTUP_PATTERN, VehicleState};
use crate::clock::{Clock, MonotonicClock};
use crate::config::SupervisorConfig;
use crate::control::{ControlDispatch, ControlLaw, ControlOutput, StabilityController};
use crate::report;
use crate::types::{CommandRegister, MeasurementSnapshot, References};
use crate::ClientError;
use balance_driver::{
    ActuatorMode, BalanceActuator, CommandLink, DriveActuator, DriverError, EnableConfig, Imu,
    Indicator, ModeCoordinator,
};
use balance_protocol::{OperatorCommand, TelemetryFrame};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// 上电提示音时长（ms）
const STARTUP_BEEP_MS: u32 = 100;

/// 单周期最多处理的入站指令数
const MAX_COMMANDS_PER_TICK: usize = 64;

/// 车辆协作者集合
#[derive(Debug)]
pub struct Vehicle<I, A, D, L> {
    pub imu: I,
    pub balance: A,
    pub drive: D,
    pub indicator: L,
}

/// 单周期结果
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// 周期开始时的状态
    pub previous: VehicleState,
    /// 周期结束时的状态
    pub state: VehicleState,
    /// 本周期的测量快照
    pub snapshot: MeasurementSnapshot,
    /// 控制律输出
    pub output: ControlOutput,
    /// 遥测帧
    pub telemetry: TelemetryFrame,
    /// 本周期触发的故障
    pub fault: Option<DriverError>,
}

impl TickOutcome {
    /// 本周期是否发生状态变化
    pub fn transitioned(&self) -> bool {
        self.previous != self.state
    }
}

/// 监督器
///
/// 独占车辆状态的所有写入；请求寄存器只由 `apply_command` 写入，
/// 由消费请求的转换清除。
pub struct Supervisor<I, A, D, L> {
    vehicle: Vehicle<I, A, D, L>,
    state: VehicleState,
    register: CommandRegister,
    config: SupervisorConfig,
    coordinator: ModeCoordinator,
    dispatch: ControlDispatch,
    clock: Arc<dyn Clock>,
    fault: Option<DriverError>,
}

impl<I, A, D, L> Supervisor<I, A, D, L>
where
    I: Imu,
    A: BalanceActuator,
    D: DriveActuator,
    L: Indicator,
{
    /// 创建监督器（初始状态 Idle）
    pub fn new(vehicle: Vehicle<I, A, D, L>, config: SupervisorConfig) -> Self {
        let coordinator = ModeCoordinator::new(EnableConfig::from(&config.enable));
        let dispatch = ControlDispatch::new(&config);
        let register = CommandRegister::new(References {
            lean_angle: config.lean_angle_ref,
            ..Default::default()
        });

        Self {
            vehicle,
            state: VehicleState::Idle,
            register,
            config,
            coordinator,
            dispatch,
            clock: Arc::new(MonotonicClock::new()),
            fault: None,
        }
    }

    /// 使用指定时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 使用自定义稳定控制器
    pub fn with_controller(mut self, controller: Box<dyn StabilityController>) -> Self {
        self.dispatch = ControlDispatch::with_controller(&self.config, controller);
        self
    }

    /// 从指定状态开始（执行该状态的进入副作用）
    pub fn with_initial_state(mut self, state: VehicleState) -> Self {
        if state.is_terminal() {
            self.enter_fault(DriverError::Actuator(
                "supervisor initialised in fault state".to_string(),
            ));
            return self;
        }
        match self.enter(state, 0, false) {
            Ok(()) => {
                self.state = state;
                self.dispatch.on_enter(state, self.clock.now());
            },
            Err(e) => self.enter_fault(e),
        }
        self
    }

    /// 上电流程
    ///
    /// 提示音和上电配色，平衡执行器切换到位置跟踪，然后显示空闲配色。
    ///
    /// # 错误
    ///
    /// 模式切换失败时进入 `Fault` 并返回错误。
    pub fn start(&mut self) -> Result<(), ClientError> {
        info!("Starting supervisor");
        let indicator = &mut self.vehicle.indicator;
        if let Err(e) = indicator.beep(STARTUP_BEEP_MS) {
            warn!("Startup beep failed: {}", e);
        }
        show_pattern(indicator, STARTUP_PATTERN);

        if let Err(e) = self
            .coordinator
            .switch_mode(&mut self.vehicle.balance, ActuatorMode::PositionTracking)
        {
            self.enter_fault(e.clone());
            return Err(e.into());
        }

        show_pattern(&mut self.vehicle.indicator, self.state.indicator_pattern());
        info!("Supervisor ready in {}", self.state);
        Ok(())
    }

    /// 当前状态
    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// 请求寄存器
    pub fn register(&self) -> &CommandRegister {
        &self.register
    }

    /// 操作员参考值
    pub fn references(&self) -> &References {
        &self.register.references
    }

    /// 进入故障态的原因
    pub fn fault(&self) -> Option<&DriverError> {
        self.fault.as_ref()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn vehicle(&self) -> &Vehicle<I, A, D, L> {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut Vehicle<I, A, D, L> {
        &mut self.vehicle
    }

    pub fn dispatch(&self) -> &ControlDispatch {
        &self.dispatch
    }

    /// 执行一个控制周期
    pub fn tick(&mut self) -> TickOutcome {
        self.refresh_collaborators();
        let snapshot = MeasurementSnapshot::capture(
            &self.vehicle.imu,
            &self.vehicle.balance,
            &self.vehicle.drive,
        );

        let previous = self.state;
        let fault = self.evaluate_transitions(&snapshot);

        let now = self.clock.now();
        if self.state != previous {
            info!("State transition: {} -> {}", previous, self.state);
            self.dispatch.on_enter(self.state, now);
        }

        let law = ControlLaw::for_state(self.state);
        let output = self.dispatch.execute(
            law,
            &snapshot,
            &self.register.references,
            now,
            &mut self.vehicle,
        );
        trace!("Tick in {}: {:?}", self.state, output);

        TickOutcome {
            previous,
            state: self.state,
            snapshot,
            output,
            telemetry: report::telemetry_frame(self.state, &snapshot, now),
            fault,
        }
    }

    /// 完整周期：控制周期 → 发送遥测 → 排空入站指令
    pub fn step<K>(&mut self, link: &mut K) -> TickOutcome
    where
        K: CommandLink + ?Sized,
    {
        let outcome = self.tick();
        if let Err(e) = link.send_telemetry(&outcome.telemetry) {
            warn!("Failed to send telemetry: {}", e);
        }
        self.drain_commands(link);
        outcome
    }

    /// 应用一条操作员指令
    pub fn apply_command(&mut self, command: OperatorCommand) {
        if let OperatorCommand::SetSpeed(value) | OperatorCommand::SetSteerReference(value) =
            command
            && !value.is_finite()
        {
            warn!("Ignoring non-finite command {:?}", command);
            return;
        }
        match command {
            OperatorCommand::SetSpeed(speed) => {
                self.register.references.speed = speed;
                if self.state.holds_drive_stopped() {
                    debug!("Holding drive stopped in {}, speed {} stored only", self.state, speed);
                } else if let Err(e) = self.vehicle.drive.set_speed(speed) {
                    warn!("Failed to set drive speed: {}", e);
                }
            },
            OperatorCommand::SetSteerReference(angle) => {
                self.register.references.steer_angle = angle;
            },
            OperatorCommand::SetRequestFlags(flags) => {
                self.register.merge(flags);
                debug!("Request flags now {:#06b}", self.register.requests().bits());
            },
        }
    }

    /// 排空链路中的入站指令
    ///
    /// 无法解析的帧被忽略。返回已应用的指令数。
    pub fn drain_commands<K>(&mut self, link: &mut K) -> usize
    where
        K: CommandLink + ?Sized,
    {
        let mut applied = 0;
        for _ in 0..MAX_COMMANDS_PER_TICK {
            match link.poll_command() {
                Ok(Some(command)) => {
                    self.apply_command(command);
                    applied += 1;
                },
                Ok(None) => break,
                Err(DriverError::Protocol(e)) if e.is_unknown_tag() => {
                    debug!("Ignoring command with {}", e);
                },
                Err(DriverError::Protocol(e)) => {
                    warn!("Ignoring malformed command: {}", e);
                },
                Err(e) => {
                    warn!("Command link error: {}", e);
                    break;
                },
            }
        }
        applied
    }

    fn refresh_collaborators(&mut self) {
        if let Err(e) = self.vehicle.imu.update() {
            warn!("IMU update failed, using cached readings: {}", e);
        }
        if let Err(e) = self.vehicle.balance.update() {
            warn!("Balance actuator update failed, using cached readings: {}", e);
        }
        if let Err(e) = self.vehicle.indicator.update() {
            warn!("Indicator update failed: {}", e);
        }
    }

    /// 依次评估当前状态的所有守卫
    ///
    /// 返回本周期触发的故障。
    fn evaluate_transitions(&mut self, snapshot: &MeasurementSnapshot) -> Option<DriverError> {
        let mut next = self.state;
        for transition in transitions_from(self.state) {
            if !transition
                .guard
                .holds(snapshot, &self.config.thresholds, &self.register)
            {
                continue;
            }
            debug!("Guard {:?} matched in {}", transition.guard, self.state);

            if let Err(e) = self.fire(transition) {
                self.enter_fault(e.clone());
                return Some(e);
            }
            next = transition.to;
        }
        self.state = next;
        None
    }

    fn fire(&mut self, transition: &Transition) -> Result<(), DriverError> {
        self.enter(transition.to, transition.clears, transition.disables_pulse)
    }

    /// 进入状态的副作用
    ///
    /// 只有执行器模式切换失败会返回错误；驱动和指示灯错误仅记录。
    fn enter(
        &mut self,
        state: VehicleState,
        clears: u8,
        disables_pulse: bool,
    ) -> Result<(), DriverError> {
        if let Some(mode) = state.commanded_mode() {
            self.coordinator
                .switch_mode(&mut self.vehicle.balance, mode)?;
        }

        self.register.clear(clears);

        if state == VehicleState::EmergencyStop
            && let Err(e) = self.vehicle.drive.set_speed(0.0)
        {
            warn!("Failed to stop drive on emergency stop: {}", e);
        }

        let indicator = &mut self.vehicle.indicator;
        show_pattern(indicator, state.indicator_pattern());
        if let Some((on_ms, off_ms)) = state.entry_pulse() {
            if let Err(e) = indicator.set_pulse(on_ms, off_ms) {
                warn!("Failed to arm indicator pulse: {}", e);
            }
        } else if disables_pulse && let Err(e) = indicator.disable_pulse() {
            warn!("Failed to disable indicator pulse: {}", e);
        }
        Ok(())
    }

    fn enter_fault(&mut self, cause: DriverError) {
        error!("Entering fault state from {}: {}", self.state, cause);

        if let Err(e) = self.vehicle.balance.disable_operation() {
            error!("Failed to disable balance actuator: {}", e);
        }
        if let Err(e) = self.vehicle.drive.set_speed(0.0) {
            error!("Failed to stop drive: {}", e);
        }
        let indicator = &mut self.vehicle.indicator;
        show_pattern(indicator, VehicleState::Fault.indicator_pattern());
        if let Err(e) = indicator.disable_pulse() {
            warn!("Failed to disable indicator pulse: {}", e);
        }

        self.state = VehicleState::Fault;
        self.fault = Some(cause);
    }
}

impl<I, A, D, L> std::fmt::Debug for Supervisor<I, A, D, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state)
            .field("register", &self.register)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

fn show_pattern<L: Indicator + ?Sized>(indicator: &mut L, pattern: IndicatorPattern) {
    if let Err(e) = indicator.set_passive_color(pattern.passive) {
        warn!("Failed to set passive color: {}", e);
    }
    if let Err(e) = indicator.set_blink_color(pattern.blink) {
        warn!("Failed to set blink color: {}", e);
    }
}
