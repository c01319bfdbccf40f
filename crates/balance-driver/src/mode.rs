//! 执行器模式定义与模式协调
//!
//! 平衡执行器在进入新状态前必须处于该状态要求的工作模式：
//! 切换模式后轮询使能确认，确认前不允许任何控制律下发指令。

use crate::{BalanceActuator, DriverError};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 平衡执行器工作模式
///
/// # 模式说明
///
/// - **PositionTracking**: 位置跟踪，伺服到设定角度
/// - **TorqueTracking**: 力矩跟踪，直接输出设定力矩
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ActuatorMode {
    /// 位置跟踪模式（默认）
    #[default]
    PositionTracking = 0,

    /// 力矩跟踪模式
    TorqueTracking = 1,
}

impl ActuatorMode {
    /// 从 u8 转换
    ///
    /// 无效值返回 `None`。
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::PositionTracking),
            1 => Some(Self::TorqueTracking),
            _ => None,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否为力矩跟踪模式
    pub fn is_torque(self) -> bool {
        self == Self::TorqueTracking
    }
}

/// 使能握手配置（带 Debounce 参数）
#[derive(Debug, Clone)]
pub struct EnableConfig {
    /// 使能超时
    pub timeout: Duration,
    /// Debounce 阈值：连续 N 次读到已使能才认为成功
    pub debounce_threshold: usize,
    /// 轮询间隔
    pub poll_interval: Duration,
}

impl Default for EnableConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            debounce_threshold: 1,
            poll_interval: Duration::from_millis(2),
        }
    }
}

/// 执行器模式协调器
///
/// 以有界等待替代无限忙等：超时返回 `DriverError::Timeout`，
/// 由监督层转换为故障状态。
#[derive(Debug, Clone, Default)]
pub struct ModeCoordinator {
    config: EnableConfig,
}

impl ModeCoordinator {
    pub fn new(config: EnableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnableConfig {
        &self.config
    }

    /// 切换到指定模式并等待使能确认
    ///
    /// # 阻塞行为
    ///
    /// 此方法是**阻塞的**，最长阻塞 `timeout`。控制循环在此期间停顿，
    /// 不会对半配置状态的执行器下发指令。
    ///
    /// # 错误
    ///
    /// - `DriverError::Timeout`: 使能确认超时
    /// - 执行器返回的其他错误原样传播
    pub fn switch_mode<A>(&self, actuator: &mut A, mode: ActuatorMode) -> Result<(), DriverError>
    where
        A: BalanceActuator + ?Sized,
    {
        debug!("Switching balance actuator to {:?}", mode);
        actuator.set_mode(mode)?;
        self.wait_for_enabled(actuator)
    }

    fn wait_for_enabled<A>(&self, actuator: &mut A) -> Result<(), DriverError>
    where
        A: BalanceActuator + ?Sized,
    {
        let timeout = self.config.timeout;
        let start = Instant::now();
        let mut stable_count = 0;
        let mut polls = 0usize;

        loop {
            polls += 1;
            if actuator.enable_operation()? {
                stable_count += 1;
                if stable_count >= self.config.debounce_threshold.max(1) {
                    trace!("Actuator enabled after {} polls", polls);
                    return Ok(());
                }
            } else {
                // 状态跳变，重置计数器
                stable_count = 0;
            }

            // 截止判断与轮询间隔无关，间隔为 0 时退化为忙等
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                warn!(
                    "Actuator enable not confirmed within {}ms ({} polls)",
                    timeout.as_millis(),
                    polls
                );
                return Err(DriverError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            std::thread::sleep(self.config.poll_interval.min(remaining));
        }
    }
}
