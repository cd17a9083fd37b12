// PIPEGOV BOTTLENECK DETECTOR
// NAMES THE STAGE THAT DOMINATES SUMMED COMPUTE TIME, IF ANY.
// STAGE POSITIONS ARE READ AS 1=GPU, 2=BIG, 3=LITTLE.

use std::fmt;

use crate::measure::Measurement;
use crate::tuning::BOTTLENECK_RATIO_THRESHOLD;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bottleneck {
    None,
    Gpu,
    Big,
    Little,
}

impl Bottleneck {
    pub fn from_stage(idx: usize) -> Self {
        match idx {
            0 => Self::Gpu,
            1 => Self::Big,
            2 => Self::Little,
            _ => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Gpu => "GPU",
            Self::Big => "BIG",
            Self::Little => "LITTLE",
        }
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// INDEX OF THE LONGEST STAGE. STRICT >, SO THE EARLIER STAGE WINS A TIE.
pub fn dominant_stage(stage_times: &[f64; 3]) -> usize {
    let mut idx = 0;
    for i in 1..3 {
        if stage_times[i] > stage_times[idx] {
            idx = i;
        }
    }
    idx
}

// (STAGE, SHARE OF TOTAL). ZERO OR NEGATIVE TOTAL IS "NO DATA": (NONE, 0.0).
// A STAGE BELOW THE THRESHOLD SHARE IS NOT WORTH TARGETING: (NONE, SHARE).
pub fn detect_bottleneck(m: &Measurement) -> (Bottleneck, f64) {
    let total = m.total_stage_time();
    if !(total > 0.0) {
        return (Bottleneck::None, 0.0);
    }
    let idx = dominant_stage(&m.stage_times);
    let ratio = m.stage_times[idx] / total;
    if ratio < BOTTLENECK_RATIO_THRESHOLD {
        return (Bottleneck::None, ratio);
    }
    (Bottleneck::from_stage(idx), ratio)
}
