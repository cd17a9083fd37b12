use anyhow::{bail, Result};

use pipegov::MeasurementGrid;

use super::validate_targets;

// OFFLINE: WHERE WOULD A SESSION START FOR THESE TARGETS
pub fn run_approximate(target_fps: f64, target_latency: f64) -> Result<()> {
    validate_targets(target_fps, target_latency)?;
    let grid = MeasurementGrid::embedded();

    let Some(a) = grid.approximate(target_fps, target_latency) else {
        bail!("NO GRID CELL MATCHES fps={} latency={}", target_fps, target_latency);
    };

    let (fps_lo, fps_hi) = grid.fps_range();
    let (lat_lo, lat_hi) = grid.latency_range();
    let (rows, cols) = grid.dims();

    println!("PIPEGOV GRID APPROXIMATION");
    println!();
    println!("  GRID:              {} BIG x {} LITTLE", rows, cols);
    println!("  FPS RANGE:         {:.3} .. {:.3}", fps_lo, fps_hi);
    println!("  LATENCY RANGE:     {:.2} .. {:.2} ms", lat_lo, lat_hi);
    println!("  TARGET:            fps={} latency={}ms", target_fps, target_latency);
    println!();
    println!("  BIG FREQ:          {} kHz", a.big_frequency);
    println!("  LITTLE FREQ:       {} kHz", a.little_frequency);
    println!("  MEASURED:          fps={:.3} latency={:.2}ms", a.point.fps, a.point.latency);
    println!("  ERROR:             {:.6}", a.error);
    if a.error > 0.0 {
        println!("  (NO CELL MEETS BOTH TARGETS -- CLOSEST SHORTFALL SHOWN)");
    }
    Ok(())
}
