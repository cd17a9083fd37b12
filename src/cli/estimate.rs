use anyhow::Result;

use pipegov::freq::{self, CpuClass};
use pipegov::{log_warn, partition};
use pipegov::{ConfigError, PipelineConfig, PowerModel, StageOrder, TOTAL_LAYERS};

use super::print_config;

// OFFLINE: MODEL FIGURES FOR ONE CONFIG, NO BOARD NEEDED
pub fn run_estimate(
    pp1: u32,
    pp2: u32,
    big_khz: u32,
    little_khz: u32,
    order: &str,
) -> Result<()> {
    let mut config = PipelineConfig {
        order: order.parse::<StageOrder>()?,
        ..PipelineConfig::ROOT
    };
    config.set_frequency(big_khz, CpuClass::Big)?;
    config.set_frequency(little_khz, CpuClass::Little)?;
    for (point, value) in [(1u8, pp1), (2, pp2)] {
        if value < 1 || value > TOTAL_LAYERS {
            return Err(ConfigError::PartitionOutOfRange { point, value, max: TOTAL_LAYERS }.into());
        }
    }
    config.partition_point1 = pp1;
    config.partition_point2 = pp2;
    partition::enforce(&mut config);
    if (config.partition_point1, config.partition_point2) != (pp1, pp2) {
        log_warn!("pp1={} pp2={} LEAVES A 1-LAYER STAGE, ENFORCED TO pp1={} pp2={}",
            pp1, pp2, config.partition_point1, config.partition_point2);
    }

    let model = PowerModel::default();
    let shares = model.weighted_fractions(&config);

    println!("PIPEGOV ESTIMATE");
    println!();
    print_config("CONFIG:", &config);
    println!("{:<18} GPU={:.2} BIG={:.2} LITTLE={:.2}", "WEIGHT SHARE:", shares.gpu, shares.big, shares.little);
    println!("{:<18} {:.3} W", "EST. POWER:", model.estimate_power(&config));
    println!();

    println!("{:<8} {:<10} {:<10} {:<12} {:<10} {:<20}", "CPU", "KHZ", "POWER_W", "LATENCY_MS", "FPS", "TABLE NEIGHBORS");
    println!("{}", "-".repeat(74));
    for cpu in [CpuClass::Big, CpuClass::Little] {
        let khz = config.frequency(cpu) as f64;
        let (lo, hi) = freq::get_frequency_neighbors(khz, cpu);
        println!("{:<8} {:<10} {:<10.3} {:<12.2} {:<10.3} {}..{}",
            cpu, khz, model.power(cpu, khz), model.latency(cpu, khz), model.fps(cpu, khz), lo, hi);
    }
    Ok(())
}

// INVERSE MODEL: WHAT FREQUENCY EACH CLUSTER NEEDS FOR THE TARGETS
pub fn run_inverse(target_fps: f64, target_latency: f64, watts: Option<f64>) -> Result<()> {
    let model = PowerModel::default();
    println!("PIPEGOV INVERSE MODEL (fps={} latency={}ms)", target_fps, target_latency);
    println!();
    println!("{:<8} {:<16} {:<16} {:<16}", "CPU", "FOR_LATENCY", "FOR_FPS", "FOR_POWER");
    println!("{}", "-".repeat(58));
    for cpu in [CpuClass::Big, CpuClass::Little] {
        let by_lat = freq::snap_to_valid_frequency(model.frequency_for_latency(cpu, target_latency) as u32, cpu);
        let by_fps = freq::snap_to_valid_frequency(model.frequency_for_fps(cpu, target_fps) as u32, cpu);
        let by_power = match watts {
            Some(w) => freq::snap_to_valid_frequency(model.frequency_for_power(cpu, w) as u32, cpu).to_string(),
            None => "-".to_string(),
        };
        println!("{:<8} {:<16} {:<16} {:<16}", cpu, by_lat, by_fps, by_power);
    }
    Ok(())
}
