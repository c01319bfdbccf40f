//! # Balance Sim
//!
//! 在主机上用自行车动力学模型运行监督控制循环。
//!
//! ```bash
//! # 以 3 m/s 起步，运行 500 个周期，输出文本遥测
//! balance-sim --initial-speed 3.0 --ticks 500
//!
//! # 运行中通过 stdin 发送指令
//! echo "c4" | balance-sim --ticks 200 --format json
//! ```
//!
//! 遥测写到 stdout，日志写到 stderr（`RUST_LOG` 可覆盖默认过滤器）。

use anyhow::{Context, Result};
use balance_client::{LoopConfig, Supervisor, SupervisorConfig, Vehicle, run_supervisor};
use balance_driver::ChannelLink;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod io;
mod plant;

use io::{InputFormat, OutputFormat};
use plant::{LogIndicator, Plant, PlantParams, SimBalanceActuator, SimDrive, SimImu};

/// Balance Sim - 自平衡车监督循环模拟器
#[derive(Parser, Debug)]
#[command(name = "balance-sim")]
#[command(about = "Run the balance supervisor against a simulated bicycle", long_about = None)]
#[command(version)]
struct Cli {
    /// 监督层配置文件（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 控制频率（Hz），覆盖配置文件
    #[arg(short, long)]
    rate: Option<f64>,

    /// 运行周期数（缺省为一直运行到 Ctrl-C）
    #[arg(short, long)]
    ticks: Option<usize>,

    /// 遥测输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// 指令输入格式
    #[arg(long, value_enum, default_value_t = InputFormat::Text)]
    input: InputFormat,

    /// 初始车速（m/s）
    #[arg(long, default_value_t = 0.0)]
    initial_speed: f64,

    /// 初始侧倾角（rad）
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    initial_lean: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志（stdout 留给遥测）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("balance_sim=info,balance_client=info")),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => SupervisorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SupervisorConfig::default(),
    };
    if let Some(rate) = cli.rate {
        config.loop_rate_hz = rate;
        config.validate().context("Invalid --rate")?;
    }

    let plant = Plant::new(
        PlantParams::default(),
        config.loop_period().as_secs_f64(),
        cli.initial_lean,
        cli.initial_speed,
    )
    .shared();

    let vehicle = Vehicle {
        imu: SimImu::new(plant.clone()),
        balance: SimBalanceActuator::new(plant.clone()),
        drive: SimDrive::new(plant.clone()),
        indicator: LogIndicator::default(),
    };
    let loop_config = LoopConfig {
        frequency_hz: config.loop_rate_hz,
        max_iterations: cli.ticks,
    };
    let mut supervisor = Supervisor::new(vehicle, config);
    supervisor.start().context("Supervisor startup failed")?;

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (telemetry_tx, telemetry_rx) = crossbeam_channel::unbounded();
    // stdin 结束不应关闭链路，主线程持有一个发送端
    let _command_tx = command_tx.clone();
    io::spawn_reader(cli.input, command_tx).context("Failed to spawn stdin reader")?;
    let writer = io::spawn_writer(cli.format, telemetry_rx).context("Failed to spawn stdout writer")?;
    let mut link = ChannelLink::new(command_rx, telemetry_tx);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let stats = run_supervisor(&mut supervisor, &mut link, &loop_config, &stop)?;

    drop(link);
    if writer.join().is_err() {
        warn!("stdout writer panicked");
    }

    let plant = plant.lock();
    info!(
        "Finished after {} ticks in {} (lean {:.3} rad, speed {:.2} m/s, {} overruns)",
        stats.iterations, stats.final_state, plant.lean, plant.speed, stats.overruns
    );
    if let Some(fault) = supervisor.fault() {
        warn!("Supervisor faulted: {}", fault);
    }
    Ok(())
}
