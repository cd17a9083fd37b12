// PIPEGOV POWER REDUCTION
// BOTH TARGETS ARE MET: SPEND THE SPARE MARGIN ON LOWER POWER.
//
// ORDER OF ATTEMPTS (ALL ON A SCRATCH COPY, COMMITTED ONLY IF SOMETHING MOVED):
//   TARGETED   ONE OBJECTIVE TIGHT, THE OTHER SLACK: ACT ON THE BOTTLENECK STAGE
//   GENERAL    PROPORTIONAL FREQUENCY CUTS, THEN A POWER-MOTIVATED PARTITION MOVE
//   REBALANCE  NOTHING MOVED BUT THE MARGINS ARE LOPSIDED: MOVE A PARTITION POINT

use crate::bottleneck::{self, Bottleneck};
use crate::config::{PipelineConfig, TOTAL_LAYERS};
use crate::freq::{self, CpuClass};
use crate::governor::PidGovernor;
use crate::measure::Measurement;
use crate::partition::PartitionPair;
use crate::trace::{CutKind, Decision, MoveCause};
use crate::tuning;

impl PidGovernor {
    // RETURNS WHETHER config CHANGED. FALSE MEANS THE OPERATING POINT IS AS
    // CHEAP AS THIS HEURISTIC CAN MAKE IT: THE CALLER TREATS THAT AS CONVERGED.
    pub(crate) fn try_reduce_power(
        &mut self,
        config: &mut PipelineConfig,
        m: &Measurement,
        trace: &mut Vec<Decision>,
    ) -> bool {
        let fps_margin = m.fps - self.target_fps;
        let latency_margin = self.target_latency - m.latency;
        if fps_margin <= 0.0 && latency_margin <= 0.0 {
            trace.push(Decision::NoUsableMargin);
            return false;
        }

        let mut test = *config;
        let rate = self.tuning.power_reduction_rate;

        let (stage, ratio) = bottleneck::detect_bottleneck(m);
        trace.push(Decision::Bottleneck { stage, ratio });
        // NO DOMINANT STAGE: FALL BACK TO WHICHEVER IS LONGEST
        let target_stage = match stage {
            Bottleneck::None => Bottleneck::from_stage(bottleneck::dominant_stage(&m.stage_times)),
            s => s,
        };

        let rel_fps = fps_margin / self.target_fps;
        let rel_lat = latency_margin / self.target_latency;
        let usable = rel_fps.min(rel_lat);
        let widest = rel_fps.max(rel_lat);
        let imbalance = if usable > 1e-6 { widest / usable } else { 0.0 };
        let imbalanced = (imbalance > tuning::IMBALANCE_RATIO || widest > tuning::IMBALANCE_ABS)
            && widest > tuning::IMBALANCE_FLOOR;

        let mut reduced = false;

        if rel_lat > 0.0 && rel_fps > rel_lat && rel_lat < tuning::TIGHT_MARGIN && rel_fps > tuning::SLACK_MARGIN {
            // LATENCY IS THE TIGHT AXIS: OFFLOAD THE BIG STAGE ONTO THE GPU
            if target_stage == Bottleneck::Big
                && test.partition_point1 < TOTAL_LAYERS
                && self.shift(&mut test, 1, 0, MoveCause::Structural, trace)
            {
                *config = test;
                self.partition_cooldown = self.tuning.rebalance_cooldown;
                self.enforce(config, trace);
                return true;
            }
        } else if rel_fps > 0.0 && rel_lat > rel_fps && rel_fps < tuning::TIGHT_MARGIN && rel_lat > tuning::SLACK_MARGIN {
            // FPS IS THE TIGHT AXIS: HALF-SIZE CUT ON THE DOMINANT CPU ONLY
            let cut = rate * tuning::TARGETED_CUT_SCALE;
            let cpu = match target_stage {
                Bottleneck::Big => Some(CpuClass::Big),
                Bottleneck::Little => Some(CpuClass::Little),
                _ => None,
            };
            if let Some(cpu) = cpu {
                reduced |= cut_frequency(&mut test, config.frequency(cpu), cpu, cut, CutKind::Targeted, trace);
            }
        }

        // GENERAL CUTS ARE SIZED FROM THE COMMITTED FREQUENCY AND OVERRIDE A
        // TARGETED CUT ON THE SAME CLUSTER
        if usable > tuning::CUT_BIG_MARGIN {
            reduced |= cut_frequency(&mut test, config.big_frequency, CpuClass::Big, rate, CutKind::General, trace);
        }
        if usable > tuning::CUT_LITTLE_MARGIN {
            reduced |= cut_frequency(&mut test, config.little_frequency, CpuClass::Little, rate, CutKind::General, trace);
        }
        if usable > tuning::CUT_PARTITION_MARGIN {
            reduced |= self.adjust_partition_points(&mut test, fps_margin, latency_margin, true, false, trace);
        }

        if reduced {
            *config = test;
            self.enforce(config, trace);
            return true;
        }

        if imbalanced && usable >= tuning::REBALANCE_MIN_MARGIN {
            return self.rebalance(config, rel_fps > rel_lat, trace);
        }
        false
    }

    // FPS SURPLUS: PULL LAYERS OFF THE GPU. LATENCY SURPLUS: PUSH THEM BACK.
    fn rebalance(&mut self, config: &mut PipelineConfig, fps_surplus: bool, trace: &mut Vec<Decision>) -> bool {
        let mut test = *config;
        let (pp1, pp2) = (test.partition_point1, test.partition_point2);
        let cause = MoveCause::Rebalance;

        let moved = if fps_surplus {
            if pp1 > 1 {
                self.shift(&mut test, -1, 0, cause, trace) || self.shift(&mut test, 0, -1, cause, trace)
            } else if pp2 > pp1 {
                self.shift(&mut test, 0, -1, cause, trace)
            } else {
                false
            }
        } else if pp2 < TOTAL_LAYERS {
            self.shift(&mut test, 0, 1, cause, trace)
        } else if pp1 < TOTAL_LAYERS {
            self.shift(&mut test, 1, 0, cause, trace)
        } else {
            false
        };

        if !moved {
            return false;
        }
        debug_assert_ne!(PartitionPair::of(&test), PartitionPair::of(config));
        *config = test;
        self.partition_cooldown = self.tuning.rebalance_cooldown;
        true
    }
}

// LOWER cpu BY fraction OF base, SNAPPED TO THE TABLE. APPLIED ONLY IF THE
// SNAPPED VALUE IS STRICTLY BELOW base (SMALL CUTS CAN SNAP BACK UP).
fn cut_frequency(
    test: &mut PipelineConfig,
    base: u32,
    cpu: CpuClass,
    fraction: f64,
    kind: CutKind,
    trace: &mut Vec<Decision>,
) -> bool {
    if base <= cpu.min_khz() {
        return false;
    }
    let step = ((base as f64 * fraction) as u32).max(1);
    let to = freq::snap_to_valid_frequency(base.saturating_sub(step), cpu);
    if to >= base {
        return false;
    }
    match cpu {
        CpuClass::Big => test.big_frequency = to,
        CpuClass::Little => test.little_frequency = to,
    }
    trace.push(Decision::FrequencyCut { kind, cpu, from: base, to });
    true
}
