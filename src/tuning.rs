// PIPEGOV TUNING CONSTANTS
// PURE DATA: EVERY THRESHOLD THE GOVERNOR BRANCHES ON LIVES HERE.
// SHARED BETWEEN THE LIBRARY (governor.rs, reduce.rs) AND THE BINARY (cli).

// NUMERICS

pub const EPSILON: f64 = 1e-12;           // FLOAT TIE TOLERANCE
pub const PID_DT: f64 = 1.0;              // ONE ITERATION PER PID TICK

// PID GAINS
// FPS LOOP LEANS HARDER ON INTEGRAL: THROUGHPUT DEFICITS ARE STICKY.

pub const FPS_KP: f64 = 2.0;
pub const FPS_KI: f64 = 0.5;
pub const FPS_KD: f64 = 0.0;
pub const LATENCY_KP: f64 = 2.0;
pub const LATENCY_KI: f64 = 0.3;
pub const LATENCY_KD: f64 = 0.0;
pub const PID_OUTPUT_MIN: f64 = -2.0;     // AT MOST 2 TABLE STEPS PER LOOP
pub const PID_OUTPUT_MAX: f64 = 2.0;

// ITERATION CONTROL

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const STAGNATION_STREAK: u32 = 4;     // IDENTICAL CONFIGS BEFORE FORCED STOP
pub const LATENCY_NOISE_MS: f64 = 1.0;    // RISE BELOW THIS IS NOT "WORSENED"

// PARTITION COOLDOWNS (ITERATIONS)

pub const PARTITION_COOLDOWN: u32 = 3;    // AFTER ANY DEFICIT OR REDUCE MOVE
pub const REBALANCE_COOLDOWN: u32 = 2;    // AFTER A STRUCTURAL POWER-SAVING MOVE

// DEFICIT-DRIVEN PARTITION THRESHOLDS (FRACTION OF TARGET)

pub const DEFICIT_SHIFT_PP1: f64 = 0.20;  // > THIS: PUSH LAYERS ONTO THE GPU
pub const DEFICIT_SHIFT_BOTH: f64 = 0.15; // > THIS: SHIFT BOTH POINTS UP
pub const DEFICIT_SHIFT_PP2: f64 = 0.10;  // > THIS: GROW THE BIG STAGE
pub const FORCED_DEFICIT_BOTH: f64 = 0.15;

// POWER-REDUCTION THRESHOLDS (FRACTION OF TARGET)

pub const POWER_REDUCTION_RATE: f64 = 0.05;     // FRACTION OF CURRENT FREQ PER CUT
pub const TARGETED_CUT_SCALE: f64 = 0.5;        // TARGETED CUTS ARE HALF-SIZE
pub const CUT_BIG_MARGIN: f64 = 0.05;
pub const CUT_LITTLE_MARGIN: f64 = 0.10;
pub const CUT_PARTITION_MARGIN: f64 = 0.15;
pub const REDUCE_PP1_MARGIN: f64 = 0.20;        // PULL WORK OFF THE GPU
pub const REDUCE_PP2_MARGIN: f64 = 0.15;        // SHRINK THE BIG STAGE
pub const TIGHT_MARGIN: f64 = 0.05;             // "BARELY MET"
pub const SLACK_MARGIN: f64 = 0.10;             // "COMFORTABLY MET"
pub const REBALANCE_MIN_MARGIN: f64 = 0.10;

// IMBALANCE DETECTION
// ONE OBJECTIVE HAS FAR MORE SLACK THAN THE OTHER.

pub const IMBALANCE_RATIO: f64 = 3.0;
pub const IMBALANCE_ABS: f64 = 0.25;
pub const IMBALANCE_FLOOR: f64 = 0.10;

// BOTTLENECK DETECTION

pub const BOTTLENECK_RATIO_THRESHOLD: f64 = 0.45; // SHARE OF SUMMED STAGE TIME

// GOVERNOR TUNING
// THE HANDFUL OF KNOBS A CALLER MAY WANT TO OVERRIDE PER RUN.
// THRESHOLDS ABOVE STAY COMPILE-TIME.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GovernorTuning {
    pub fps_gains: (f64, f64, f64),
    pub latency_gains: (f64, f64, f64),
    pub output_min: f64,
    pub output_max: f64,
    pub power_reduction_rate: f64,
    pub stagnation_streak: u32,
    pub partition_cooldown: u32,
    pub rebalance_cooldown: u32,
}

impl Default for GovernorTuning {
    fn default() -> Self {
        Self {
            fps_gains: (FPS_KP, FPS_KI, FPS_KD),
            latency_gains: (LATENCY_KP, LATENCY_KI, LATENCY_KD),
            output_min: PID_OUTPUT_MIN,
            output_max: PID_OUTPUT_MAX,
            power_reduction_rate: POWER_REDUCTION_RATE,
            stagnation_streak: STAGNATION_STREAK,
            partition_cooldown: PARTITION_COOLDOWN,
            rebalance_cooldown: REBALANCE_COOLDOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_ordered() {
        assert!(DEFICIT_SHIFT_PP2 < DEFICIT_SHIFT_BOTH && DEFICIT_SHIFT_BOTH < DEFICIT_SHIFT_PP1);
        assert!(CUT_BIG_MARGIN < CUT_LITTLE_MARGIN && CUT_LITTLE_MARGIN < CUT_PARTITION_MARGIN);
        assert!(REDUCE_PP2_MARGIN < REDUCE_PP1_MARGIN);
        assert!(TIGHT_MARGIN < SLACK_MARGIN);
        assert!(PID_OUTPUT_MIN < PID_OUTPUT_MAX);
    }

    #[test]
    fn default_tuning_matches_consts() {
        let t = GovernorTuning::default();
        assert_eq!(t.fps_gains, (2.0, 0.5, 0.0));
        assert_eq!(t.latency_gains, (2.0, 0.3, 0.0));
        assert_eq!(t.stagnation_streak, 4);
        assert_eq!(t.power_reduction_rate, 0.05);
    }
}
