pub mod approximate;
pub mod check;
pub mod estimate;
pub mod run;

use anyhow::{bail, Result};

use pipegov::PipelineConfig;

// TARGETS DIVIDE EVERY MARGIN: ZERO, NEGATIVE OR NaN IS A USAGE ERROR
pub fn validate_targets(target_fps: f64, target_latency: f64) -> Result<()> {
    if !(target_fps > 0.0) || !target_fps.is_finite() {
        bail!("TARGET FPS MUST BE A POSITIVE NUMBER (GOT {})", target_fps);
    }
    if !(target_latency > 0.0) || !target_latency.is_finite() {
        bail!("TARGET LATENCY MUST BE A POSITIVE NUMBER (GOT {})", target_latency);
    }
    Ok(())
}

pub fn print_config(label: &str, c: &PipelineConfig) {
    let layers = c.processor_layers();
    println!("{:<18} {}", label, c);
    println!("{:<18} GPU={} BIG={} LITTLE={}", "", layers.gpu, layers.big, layers.little);
}
