//! 测量快照

use balance_driver::{BalanceActuator, DriveActuator, Imu};

/// 单个周期的测量快照
///
/// 在转换评估之前一次性读取，本周期内所有守卫与控制律看到同一组值。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementSnapshot {
    /// 侧倾角（rad），0 为直立
    pub lean_angle: f64,
    /// 侧倾角速度（rad/s）
    pub lean_rate: f64,
    /// 转向角（rad）
    pub steer_angle: f64,
    /// 转向角速度（rad/s）
    pub steer_rate: f64,
    /// 平衡执行器力矩（N·m）
    pub torque: f64,
    /// 车速（m/s）
    pub speed: f64,
}

impl MeasurementSnapshot {
    /// 从协作者的缓存值读取
    pub fn capture<I, A, D>(imu: &I, balance: &A, drive: &D) -> Self
    where
        I: Imu + ?Sized,
        A: BalanceActuator + ?Sized,
        D: DriveActuator + ?Sized,
    {
        Self {
            lean_angle: imu.lean_angle(),
            lean_rate: imu.lean_rate(),
            steer_angle: balance.position(),
            steer_rate: balance.velocity(),
            torque: balance.torque(),
            speed: drive.speed(),
        }
    }

    /// 侧倾角绝对值
    pub fn lean_magnitude(&self) -> f64 {
        self.lean_angle.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_driver::mock::{MockBalanceActuator, MockDriveActuator, MockImu};

    #[test]
    fn test_capture_reads_all_collaborators() {
        let imu = MockImu::new();
        let balance = MockBalanceActuator::new();
        let drive = MockDriveActuator::new();
        {
            let handle = imu.handle();
            let mut s = handle.lock();
            s.lean_angle = -0.2;
            s.lean_rate = 0.5;
        }
        {
            let handle = balance.handle();
            let mut s = handle.lock();
            s.position = 0.1;
            s.velocity = -0.3;
            s.torque = 1.2;
        }
        drive.handle().lock().speed = 2.0;

        let snapshot = MeasurementSnapshot::capture(&imu, &balance, &drive);
        assert_eq!(
            snapshot,
            MeasurementSnapshot {
                lean_angle: -0.2,
                lean_rate: 0.5,
                steer_angle: 0.1,
                steer_rate: -0.3,
                torque: 1.2,
                speed: 2.0,
            }
        );
        assert_eq!(snapshot.lean_magnitude(), 0.2);
    }
}
