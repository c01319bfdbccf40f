//! 自行车动力学模型与模拟协作者
//!
//! 线性化自行车侧倾模型：
//!
//! ```text
//! φ̈ = (g/h)·φ − (v²/(h·b))·δ − (a·v/(h·b))·δ̇
//! ```
//!
//! 转向执行器在位置模式下一阶跟踪设定角，在力矩模式下按转动惯量积分，
//! 力矩指令按最大变化率限幅。驱动速度一阶跟踪设定值。
//!
//! 模型在 IMU `update()` 中按固定步长推进，因此每个控制周期恰好推进一次。

use balance_driver::{
    ActuatorMode, BalanceActuator, DriveActuator, DriverError, Imu, Indicator, Rgb,
};
use parking_lot::Mutex;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use tracing::{debug, info};

/// 积分子步数
const SUBSTEPS: usize = 10;

/// 模型参数
#[derive(Debug, Clone)]
pub struct PlantParams {
    /// 重力加速度（m/s²）
    pub gravity: f64,
    /// 质心高度（m）
    pub com_height: f64,
    /// 轴距（m）
    pub wheelbase: f64,
    /// 质心到后轮接地点的水平距离（m）
    pub com_offset: f64,
    /// 转向转动惯量（kg·m²）
    pub steer_inertia: f64,
    /// 转向阻尼（N·m·s/rad）
    pub steer_damping: f64,
    /// 位置模式时间常数（s）
    pub position_time_constant: f64,
    /// 驱动速度时间常数（s）
    pub drive_time_constant: f64,
    /// 力矩最大变化率（N·m/s）
    pub torque_slope: f64,
    /// 转向角限位（rad）
    pub steer_limit: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            gravity: 9.80665,
            com_height: 0.6,
            wheelbase: 1.0,
            com_offset: 0.3,
            steer_inertia: 0.05,
            steer_damping: 0.5,
            position_time_constant: 0.05,
            drive_time_constant: 0.8,
            torque_slope: 50.0,
            steer_limit: 0.8,
        }
    }
}

/// 车辆状态
#[derive(Debug, Clone)]
pub struct Plant {
    params: PlantParams,
    dt: f64,
    pub lean: f64,
    pub lean_rate: f64,
    pub steer: f64,
    pub steer_rate: f64,
    pub speed: f64,
    pub mode: ActuatorMode,
    pub enabled: bool,
    pub position_setpoint: f64,
    pub torque_command: f64,
    pub torque: f64,
    pub speed_setpoint: f64,
    pub steps: u64,
}

/// 共享模型句柄
pub type SharedPlant = Arc<Mutex<Plant>>;

impl Plant {
    pub fn new(params: PlantParams, dt: f64, lean: f64, speed: f64) -> Self {
        Self {
            params,
            dt,
            lean,
            lean_rate: 0.0,
            steer: 0.0,
            steer_rate: 0.0,
            speed,
            mode: ActuatorMode::PositionTracking,
            enabled: false,
            position_setpoint: 0.0,
            torque_command: 0.0,
            torque: 0.0,
            speed_setpoint: speed,
            steps: 0,
        }
    }

    pub fn shared(self) -> SharedPlant {
        Arc::new(Mutex::new(self))
    }

    /// 推进一个控制周期
    pub fn step(&mut self) {
        let h = self.dt / SUBSTEPS as f64;
        for _ in 0..SUBSTEPS {
            self.substep(h);
        }
        self.steps += 1;
    }

    fn substep(&mut self, h: f64) {
        let p = &self.params;

        // 驱动
        self.speed += (self.speed_setpoint - self.speed) / p.drive_time_constant * h;
        self.speed = self.speed.max(0.0);

        // 转向
        let torque_target = if self.enabled && self.mode.is_torque() {
            self.torque_command
        } else {
            0.0
        };
        let max_delta = p.torque_slope * h;
        self.torque += (torque_target - self.torque).clamp(-max_delta, max_delta);

        match (self.enabled, self.mode) {
            (true, ActuatorMode::PositionTracking) => {
                let target = self.position_setpoint.clamp(-p.steer_limit, p.steer_limit);
                self.steer_rate = (target - self.steer) / p.position_time_constant;
            },
            (true, ActuatorMode::TorqueTracking) => {
                let accel = (self.torque - p.steer_damping * self.steer_rate) / p.steer_inertia;
                self.steer_rate += accel * h;
            },
            (false, _) => {
                self.steer_rate -= p.steer_damping * self.steer_rate / p.steer_inertia * h;
            },
        }
        self.steer = (self.steer + self.steer_rate * h).clamp(-p.steer_limit, p.steer_limit);

        // 侧倾
        let hb = p.com_height * p.wheelbase;
        let lean_accel = p.gravity / p.com_height * self.lean
            - self.speed * self.speed / hb * self.steer
            - p.com_offset * self.speed / hb * self.steer_rate;
        self.lean_rate += lean_accel * h;
        self.lean += self.lean_rate * h;

        // 倒地
        if self.lean.abs() >= FRAC_PI_2 {
            self.lean = FRAC_PI_2.copysign(self.lean);
            self.lean_rate = 0.0;
        }
    }
}

/// 模拟 IMU（每次 `update()` 推进模型）
pub struct SimImu {
    plant: SharedPlant,
}

impl SimImu {
    pub fn new(plant: SharedPlant) -> Self {
        Self { plant }
    }
}

impl Imu for SimImu {
    fn update(&mut self) -> Result<(), DriverError> {
        self.plant.lock().step();
        Ok(())
    }

    fn lean_angle(&self) -> f64 {
        self.plant.lock().lean
    }

    fn lean_rate(&self) -> f64 {
        self.plant.lock().lean_rate
    }

    fn calibrate_gyros(&mut self) -> Result<(), DriverError> {
        info!("Simulated gyro calibration");
        Ok(())
    }

    fn calibrate_accel(&mut self, x: f64, y: f64, z: f64) -> Result<(), DriverError> {
        info!("Simulated accelerometer calibration against ({}, {}, {})", x, y, z);
        Ok(())
    }
}

/// 模拟平衡执行器
pub struct SimBalanceActuator {
    plant: SharedPlant,
}

impl SimBalanceActuator {
    pub fn new(plant: SharedPlant) -> Self {
        Self { plant }
    }
}

impl BalanceActuator for SimBalanceActuator {
    fn update(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn position(&self) -> f64 {
        self.plant.lock().steer
    }

    fn velocity(&self) -> f64 {
        self.plant.lock().steer_rate
    }

    fn torque(&self) -> f64 {
        self.plant.lock().torque
    }

    fn mode(&self) -> ActuatorMode {
        self.plant.lock().mode
    }

    fn set_mode(&mut self, mode: ActuatorMode) -> Result<(), DriverError> {
        let mut plant = self.plant.lock();
        plant.mode = mode;
        plant.enabled = false;
        plant.torque_command = 0.0;
        plant.position_setpoint = plant.steer;
        Ok(())
    }

    fn enable_operation(&mut self) -> Result<bool, DriverError> {
        self.plant.lock().enabled = true;
        Ok(true)
    }

    fn disable_operation(&mut self) -> Result<(), DriverError> {
        let mut plant = self.plant.lock();
        plant.enabled = false;
        plant.torque_command = 0.0;
        Ok(())
    }

    fn set_position(&mut self, angle: f64) -> Result<(), DriverError> {
        self.plant.lock().position_setpoint = angle;
        Ok(())
    }

    fn set_torque(&mut self, torque: f64) -> Result<(), DriverError> {
        self.plant.lock().torque_command = torque;
        Ok(())
    }
}

/// 模拟驱动执行器
pub struct SimDrive {
    plant: SharedPlant,
}

impl SimDrive {
    pub fn new(plant: SharedPlant) -> Self {
        Self { plant }
    }
}

impl DriveActuator for SimDrive {
    fn speed(&self) -> f64 {
        self.plant.lock().speed
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), DriverError> {
        self.plant.lock().speed_setpoint = speed.max(0.0);
        Ok(())
    }
}

/// 日志指示器
#[derive(Debug, Default)]
pub struct LogIndicator {
    passive: Rgb,
    blink: Rgb,
}

impl Indicator for LogIndicator {
    fn update(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn set_passive_color(&mut self, color: Rgb) -> Result<(), DriverError> {
        if color != self.passive {
            debug!("Indicator passive color ({}, {}, {})", color.r, color.g, color.b);
            self.passive = color;
        }
        Ok(())
    }

    fn set_blink_color(&mut self, color: Rgb) -> Result<(), DriverError> {
        if color != self.blink {
            debug!("Indicator blink color ({}, {}, {})", color.r, color.g, color.b);
            self.blink = color;
        }
        Ok(())
    }

    fn set_pulse(&mut self, on_ms: u32, off_ms: u32) -> Result<(), DriverError> {
        debug!("Indicator pulse {}ms on / {}ms off", on_ms, off_ms);
        Ok(())
    }

    fn disable_pulse(&mut self) -> Result<(), DriverError> {
        debug!("Indicator pulse disabled");
        Ok(())
    }

    fn beep(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        debug!("Beep {}ms", duration_ms);
        Ok(())
    }

    fn beep_pattern(&mut self, bits: u8) -> Result<(), DriverError> {
        info!("Beep pattern {:#010b}", bits);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upright_at_rest_stays_upright() {
        let mut plant = Plant::new(PlantParams::default(), 0.01, 0.0, 0.0);
        for _ in 0..100 {
            plant.step();
        }
        assert_eq!(plant.lean, 0.0);
        assert_eq!(plant.steps, 100);
    }

    #[test]
    fn leaning_at_rest_falls_over() {
        let mut plant = Plant::new(PlantParams::default(), 0.01, 0.05, 0.0);
        for _ in 0..300 {
            plant.step();
        }
        assert_eq!(plant.lean, FRAC_PI_2);
    }

    #[test]
    fn torque_is_slope_limited() {
        let plant = Plant::new(PlantParams::default(), 0.01, 0.0, 0.0).shared();
        let mut actuator = SimBalanceActuator::new(plant.clone());
        actuator.set_mode(ActuatorMode::TorqueTracking).unwrap();
        assert!(actuator.enable_operation().unwrap());
        actuator.set_torque(5.0).unwrap();

        plant.lock().step();
        // 50 N·m/s × 10ms
        assert!((actuator.torque() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn drive_tracks_setpoint() {
        let plant = Plant::new(PlantParams::default(), 0.01, 0.0, 0.0).shared();
        let mut drive = SimDrive::new(plant.clone());
        drive.set_speed(2.0).unwrap();
        for _ in 0..500 {
            plant.lock().step();
        }
        assert!((drive.speed() - 2.0).abs() < 0.01);
    }
}
