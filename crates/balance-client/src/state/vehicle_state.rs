//! 车辆状态定义

use balance_driver::{ActuatorMode, Rgb};

/// 指示灯配色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPattern {
    pub passive: Rgb,
    pub blink: Rgb,
}

/// 上电提示配色
pub const STARTUP_PATTERN: IndicatorPattern = IndicatorPattern {
    passive: Rgb::new(255, 255, 255),
    blink: Rgb::new(0, 0, 255),
};

/// 车辆状态
///
/// 任意时刻恰好一个状态有效。`Fault` 为终止态：进入后不再评估任何守卫，需要重启。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VehicleState {
    #[default]
    Idle,
    Calibrating,
    Manual,
    Assisted,
    Autonomous,
    Fallen,
    EmergencyStop,
    Fault,
}

impl VehicleState {
    /// 所有状态
    pub const ALL: [VehicleState; 8] = [
        VehicleState::Idle,
        VehicleState::Calibrating,
        VehicleState::Manual,
        VehicleState::Assisted,
        VehicleState::Autonomous,
        VehicleState::Fallen,
        VehicleState::EmergencyStop,
        VehicleState::Fault,
    ];

    /// 遥测状态码
    pub fn code(self) -> u8 {
        match self {
            VehicleState::Idle => 0,
            VehicleState::Calibrating => 1,
            VehicleState::Manual => 2,
            VehicleState::Assisted => 3,
            VehicleState::Autonomous => 4,
            VehicleState::Fallen => 5,
            VehicleState::EmergencyStop => 6,
            VehicleState::Fault => 0xFF,
        }
    }

    /// 从遥测状态码解析
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// 进入该状态前平衡执行器必须切换到的模式
    ///
    /// 只有会向平衡执行器下发指令的状态才有要求；
    /// 其余状态保持执行器上一次的模式。
    pub fn commanded_mode(self) -> Option<ActuatorMode> {
        match self {
            VehicleState::Manual | VehicleState::Assisted => Some(ActuatorMode::PositionTracking),
            VehicleState::Autonomous => Some(ActuatorMode::TorqueTracking),
            _ => None,
        }
    }

    /// 驱动是否必须保持静止
    pub fn holds_drive_stopped(self) -> bool {
        matches!(
            self,
            VehicleState::Fallen | VehicleState::EmergencyStop | VehicleState::Fault
        )
    }

    /// 是否为终止态
    pub fn is_terminal(self) -> bool {
        self == VehicleState::Fault
    }

    /// 指示灯配色
    pub fn indicator_pattern(self) -> IndicatorPattern {
        let (passive, blink) = match self {
            VehicleState::Idle => (Rgb::new(255, 255, 0), Rgb::new(0, 0, 255)),
            VehicleState::Calibrating => (Rgb::new(128, 0, 128), Rgb::new(128, 255, 128)),
            VehicleState::Manual => (Rgb::new(255, 165, 0), Rgb::new(0, 89, 255)),
            VehicleState::Assisted => (Rgb::new(34, 139, 34), Rgb::new(140, 34, 140)),
            VehicleState::Autonomous => (Rgb::new(0, 255, 0), Rgb::new(255, 0, 255)),
            VehicleState::Fallen => (Rgb::new(255, 140, 0), Rgb::new(255, 0, 0)),
            VehicleState::EmergencyStop => (Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)),
            VehicleState::Fault => (Rgb::OFF, Rgb::OFF),
        };
        IndicatorPattern { passive, blink }
    }

    /// 进入该状态时启用的脉冲（亮 ms, 灭 ms）
    pub fn entry_pulse(self) -> Option<(u32, u32)> {
        match self {
            VehicleState::Fallen => Some((500, 1500)),
            VehicleState::Calibrating => Some((250, 250)),
            _ => None,
        }
    }
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VehicleState::Idle => "Idle",
            VehicleState::Calibrating => "Calibrating",
            VehicleState::Manual => "Manual",
            VehicleState::Assisted => "Assisted",
            VehicleState::Autonomous => "Autonomous",
            VehicleState::Fallen => "Fallen",
            VehicleState::EmergencyStop => "EmergencyStop",
            VehicleState::Fault => "Fault",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_unique_and_reversible() {
        for state in VehicleState::ALL {
            assert_eq!(VehicleState::from_code(state.code()), Some(state));
        }
        assert_eq!(VehicleState::from_code(7), None);
    }

    #[test]
    fn test_commanded_modes() {
        assert_eq!(
            VehicleState::Autonomous.commanded_mode(),
            Some(ActuatorMode::TorqueTracking)
        );
        assert_eq!(
            VehicleState::Manual.commanded_mode(),
            Some(ActuatorMode::PositionTracking)
        );
        assert_eq!(VehicleState::Fallen.commanded_mode(), None);
        assert_eq!(VehicleState::Idle.commanded_mode(), None);
    }

    #[test]
    fn test_fault_pattern_is_dark() {
        let pattern = VehicleState::Fault.indicator_pattern();
        assert_eq!(pattern.passive, Rgb::OFF);
        assert_eq!(pattern.blink, Rgb::OFF);
        assert!(VehicleState::Fault.is_terminal());
    }
}
