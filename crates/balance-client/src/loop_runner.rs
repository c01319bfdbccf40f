//! Loop Runner - 监督循环包装器
//!
//! 以固定频率驱动 `Supervisor::step()`，使用 `spin_sleep` 实现低抖动延时。
//!
//! # 停止条件
//!
//! - 达到 `max_iterations`
//! - `stop` 标志被置位（如 Ctrl-C 处理器）
//!
//! 进入故障态后循环不会自行退出：故障态每周期仍保持驱动为零并发送遥测。

use crate::ClientError;
use crate::state::{Supervisor, VehicleState};
use balance_driver::{BalanceActuator, CommandLink, DriveActuator, Imu, Indicator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// 最大迭代次数（`None` 表示无限循环）
    pub max_iterations: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 100.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    fn validate(&self) -> Result<Duration, ClientError> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(ClientError::InvalidConfig(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 10_000.0 {
            warn!(
                "Very high control frequency: {} Hz. This may cause overruns.",
                self.frequency_hz
            );
        }
        Ok(Duration::from_secs_f64(1.0 / self.frequency_hz))
    }
}

/// 循环统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// 已执行周期数
    pub iterations: usize,
    /// 超时周期数（周期耗时超过标称周期）
    pub overruns: usize,
    /// 状态变化次数
    pub transitions: usize,
    /// 结束时的状态
    pub final_state: VehicleState,
}

/// 运行监督循环
///
/// 每个周期：控制周期 → 发送遥测 → 排空入站指令，然后休眠到下一个周期起点。
/// 超时周期不补偿，下一周期从当前时刻重新计时。
///
/// # 错误
///
/// 仅在配置非法时返回错误；周期内的协作者错误在周期内处理。
pub fn run_supervisor<I, A, D, L, K>(
    supervisor: &mut Supervisor<I, A, D, L>,
    link: &mut K,
    config: &LoopConfig,
    stop: &AtomicBool,
) -> Result<LoopStats, ClientError>
where
    I: Imu,
    A: BalanceActuator,
    D: DriveActuator,
    L: Indicator,
    K: CommandLink + ?Sized,
{
    let period = config.validate()?;
    info!(
        "Supervisor loop starting at {} Hz (period {:?})",
        config.frequency_hz, period
    );

    let mut stats = LoopStats {
        iterations: 0,
        overruns: 0,
        transitions: 0,
        final_state: supervisor.state(),
    };
    let mut deadline = Instant::now() + period;

    loop {
        if let Some(max_iter) = config.max_iterations
            && stats.iterations >= max_iter
        {
            break;
        }
        if stop.load(Ordering::Relaxed) {
            info!("Stop requested");
            break;
        }

        let outcome = supervisor.step(link);
        stats.iterations += 1;
        if outcome.transitioned() {
            stats.transitions += 1;
        }

        let now = Instant::now();
        if now > deadline {
            stats.overruns += 1;
            deadline = now + period;
        } else {
            spin_sleep::sleep(deadline - now);
            deadline += period;
        }
    }

    stats.final_state = supervisor.state();
    info!(
        "Supervisor loop finished: {} iterations, {} overruns, {} transitions, final state {}",
        stats.iterations, stats.overruns, stats.transitions, stats.final_state
    );
    Ok(stats)
}
