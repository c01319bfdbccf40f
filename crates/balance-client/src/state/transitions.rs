//! 转换表
//!
//! 每个状态一张有序守卫表。每周期按顺序评估**所有**守卫，
//! 每个成立的守卫都会执行其转换及副作用，后成立的守卫覆盖先成立的目标状态。
//! 因此顺序本身就是行为的一部分，例如 Idle 中倾倒守卫排在车速守卫之前，
//! 两者同时成立时结果为 Assisted。
//!
//! 守卫读取的是周期开始时的测量快照和实时请求寄存器。

use super::VehicleState;
use crate::config::Thresholds;
use crate::types::{CommandRegister, MeasurementSnapshot, Request};

/// 转换守卫
///
/// 所有比较均为严格不等式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// 无条件
    Always,
    /// `|lean| > fall_angle`
    Fallen,
    /// `|lean| < upright_angle`
    Upright,
    /// `speed > start_speed`
    Rolling,
    /// `speed < stop_speed`
    Stopped,
    /// `speed > high_speed`
    HighSpeed,
    /// `speed < low_speed`
    LowSpeed,
    /// 请求位已置位
    Requested(Request),
}

impl Guard {
    /// 评估守卫
    pub fn holds(
        self,
        snapshot: &MeasurementSnapshot,
        thresholds: &Thresholds,
        register: &CommandRegister,
    ) -> bool {
        match self {
            Guard::Always => true,
            Guard::Fallen => snapshot.lean_magnitude() > thresholds.fall_angle,
            Guard::Upright => snapshot.lean_magnitude() < thresholds.upright_angle,
            Guard::Rolling => snapshot.speed > thresholds.start_speed,
            Guard::Stopped => snapshot.speed < thresholds.stop_speed,
            Guard::HighSpeed => snapshot.speed > thresholds.high_speed,
            Guard::LowSpeed => snapshot.speed < thresholds.low_speed,
            Guard::Requested(request) => register.is_pending(request),
        }
    }
}

/// 单条转换
///
/// 进入目标状态的通用副作用（执行器模式、配色、脉冲、急停）由目标状态决定；
/// 这里只记录与来源相关的副作用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub guard: Guard,
    pub to: VehicleState,
    /// 消费的请求位
    pub clears: u8,
    /// 是否关闭脉冲
    pub disables_pulse: bool,
}

impl Transition {
    const fn new(guard: Guard, to: VehicleState) -> Self {
        Self {
            guard,
            to,
            clears: 0,
            disables_pulse: false,
        }
    }

    const fn clearing(mut self, bits: u8) -> Self {
        self.clears = bits;
        self
    }

    const fn disabling_pulse(mut self) -> Self {
        self.disables_pulse = true;
        self
    }
}

const CALIBRATE: u8 = Request::Calibrate.bit();
const MANUAL: u8 = Request::Manual.bit();
const STOP: u8 = Request::Stop.bit();
const RESUME: u8 = Request::Resume.bit();

static IDLE: [Transition; 4] = [
    Transition::new(Guard::Fallen, VehicleState::Fallen),
    Transition::new(Guard::Rolling, VehicleState::Assisted),
    Transition::new(Guard::Requested(Request::Calibrate), VehicleState::Calibrating),
    Transition::new(Guard::Requested(Request::Manual), VehicleState::Manual),
];

static CALIBRATING: [Transition; 1] = [Transition::new(Guard::Always, VehicleState::Idle)
    .clearing(CALIBRATE)
    .disabling_pulse()];

static MANUAL_STATE: [Transition; 1] = [
    Transition::new(Guard::Requested(Request::Resume), VehicleState::Idle).clearing(RESUME | MANUAL),
];

static ASSISTED: [Transition; 4] = [
    Transition::new(Guard::Fallen, VehicleState::Fallen),
    Transition::new(Guard::HighSpeed, VehicleState::Autonomous),
    Transition::new(Guard::Stopped, VehicleState::Idle),
    Transition::new(Guard::Requested(Request::Stop), VehicleState::EmergencyStop),
];

static AUTONOMOUS: [Transition; 3] = [
    Transition::new(Guard::Fallen, VehicleState::Fallen),
    Transition::new(Guard::LowSpeed, VehicleState::Assisted),
    Transition::new(Guard::Requested(Request::Stop), VehicleState::EmergencyStop),
];

static FALLEN: [Transition; 1] =
    [Transition::new(Guard::Upright, VehicleState::Idle).disabling_pulse()];

static EMERGENCY_STOP: [Transition; 2] = [
    Transition::new(Guard::Fallen, VehicleState::Fallen),
    Transition::new(Guard::Requested(Request::Resume), VehicleState::Idle).clearing(RESUME | STOP),
];

/// 状态的有序守卫表
///
/// `Fault` 为终止态，返回空表。
pub fn transitions_from(state: VehicleState) -> &'static [Transition] {
    match state {
        VehicleState::Idle => &IDLE,
        VehicleState::Calibrating => &CALIBRATING,
        VehicleState::Manual => &MANUAL_STATE,
        VehicleState::Assisted => &ASSISTED,
        VehicleState::Autonomous => &AUTONOMOUS,
        VehicleState::Fallen => &FALLEN,
        VehicleState::EmergencyStop => &EMERGENCY_STOP,
        VehicleState::Fault => &[],
    }
}
