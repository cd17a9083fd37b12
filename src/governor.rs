// PIPEGOV PID GOVERNOR
// CLOSED-LOOP MULTI-OBJECTIVE CONTROLLER.
//
// ONE step() PER MEASUREMENT. EACH STEP:
//   1. SNAP THE INCOMING CONFIG TO A VALID PARTITION
//   2. STAGNATION CHECK (IDENTICAL CONFIG N TIMES -> CONVERGED)
//   3. ESTIMATE POWER, UPDATE THE BEST-CANDIDATE RECORD
//   4. ITERATION CAP -> MAX_ITERATIONS WITH THE BEST CANDIDATE
//   5. BOTH TARGETS MET -> TRADE MARGIN FOR POWER (reduce.rs), ELSE CONVERGED
//   6. OTHERWISE PID -> FREQUENCY STEPS, THEN THE PARTITION DEFICIT POLICY
//
// FREQUENCY REACTS EVERY ITERATION. PARTITION MOVES ARE COARSER AND GATED
// BY A COOLDOWN SO THE TWO LOOPS DO NOT FIGHT.

use std::fmt;

use crate::config::{PipelineConfig, TOTAL_LAYERS};
use crate::freq::{self, CpuClass};
use crate::measure::Measurement;
use crate::model::PowerModel;
use crate::partition::{self, PartitionPair};
use crate::pid::Pid;
use crate::trace::{Decision, HoldReason, MoveCause, Objective};
use crate::tuning::{self, GovernorTuning, EPSILON};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    Continue,
    Converged,
    MaxIterations,
}

impl StepOutcome {
    pub fn is_terminal(self) -> bool {
        self != Self::Continue
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Continue => "CONTINUE",
            Self::Converged => "CONVERGED",
            Self::MaxIterations => "MAX_ITERATIONS",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub estimated_power: f64,
    pub trace: Vec<Decision>,
}

// LOWEST-VIOLATION CONFIG SEEN SO FAR. LOWER POWER BREAKS VIOLATION TIES.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestCandidate {
    pub config: PipelineConfig,
    pub estimated_power: f64,
    pub violation: f64,
    pub meets_targets: bool,
}

// max(FPS SHORTFALL, LATENCY EXCESS) AS FRACTIONS OF TARGET. 0.0 WHEN MET.
pub fn violation_score(m: &Measurement, target_fps: f64, target_latency: f64) -> f64 {
    let fps_short = if m.fps < target_fps { (target_fps - m.fps) / target_fps } else { 0.0 };
    let lat_excess = if m.latency > target_latency {
        (m.latency - target_latency) / target_latency
    } else {
        0.0
    };
    fps_short.max(lat_excess)
}

pub struct PidGovernor {
    pub(crate) target_fps: f64,
    pub(crate) target_latency: f64,
    max_iterations: u32,
    pub(crate) tuning: GovernorTuning,
    pub(crate) model: PowerModel,
    fps_pid: Pid,
    latency_pid: Pid,
    iteration: u32,
    last_config: Option<PipelineConfig>,
    streak: u32,
    prev_latency: Option<f64>,
    pub(crate) partition_cooldown: u32,
    best: Option<BestCandidate>,
    converged: bool,
    estimated_power: f64,
}

impl PidGovernor {
    // TARGETS MUST BE POSITIVE: EVERY MARGIN IS A FRACTION OF ITS TARGET
    pub fn new(target_fps: f64, target_latency: f64, max_iterations: u32) -> Self {
        Self::with_tuning(target_fps, target_latency, max_iterations, GovernorTuning::default())
    }

    pub fn with_tuning(
        target_fps: f64,
        target_latency: f64,
        max_iterations: u32,
        tuning: GovernorTuning,
    ) -> Self {
        Self {
            target_fps,
            target_latency,
            max_iterations,
            tuning,
            model: PowerModel::default(),
            fps_pid: Pid::with_gains(tuning.fps_gains, tuning.output_min, tuning.output_max),
            latency_pid: Pid::with_gains(tuning.latency_gains, tuning.output_min, tuning.output_max),
            iteration: 0,
            last_config: None,
            streak: 0,
            prev_latency: None,
            partition_cooldown: 0,
            best: None,
            converged: false,
            estimated_power: 0.0,
        }
    }

    pub fn with_model(mut self, model: PowerModel) -> Self {
        self.model = model;
        self
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    pub fn target_latency(&self) -> f64 {
        self.target_latency
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn model(&self) -> &PowerModel {
        &self.model
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn estimated_power(&self) -> f64 {
        self.estimated_power
    }

    pub fn best(&self) -> Option<BestCandidate> {
        self.best
    }

    pub fn reset_best(&mut self) {
        self.best = None;
    }

    pub fn step(&mut self, config: &mut PipelineConfig, m: &Measurement) -> StepReport {
        let mut trace = Vec::new();
        self.iteration += 1;
        self.enforce(config, &mut trace);

        // STAGNATION
        if self.last_config == Some(*config) {
            self.streak += 1;
        } else {
            self.last_config = Some(*config);
            self.streak = 1;
        }
        if self.streak >= self.tuning.stagnation_streak {
            trace.push(Decision::Stagnated { streak: self.streak });
            let power = self.model.estimate_power(config);
            self.update_best(config, power, m, &mut trace);
            self.restore_best(config, &mut trace);
            self.converged = true;
            trace.push(Decision::Converged);
            let power = self.model.estimate_power(config);
            return self.finish(StepOutcome::Converged, power, trace);
        }

        let power = self.model.estimate_power(config);
        self.update_best(config, power, m, &mut trace);

        if self.iteration > self.max_iterations {
            trace.push(Decision::MaxIterations { iteration: self.iteration });
            let power = self.restore_best(config, &mut trace).unwrap_or(power);
            return self.finish(StepOutcome::MaxIterations, power, trace);
        }

        // LATENCY WORSENED: SUPPRESS FREQUENCY CHANGES FOR ONE ITERATION
        let latency_worsened = match self.prev_latency {
            Some(prev) if m.latency > prev + tuning::LATENCY_NOISE_MS => {
                trace.push(Decision::LatencyWorsened { prev, now: m.latency });
                true
            }
            _ => false,
        };
        self.prev_latency = Some(m.latency);

        let fps_met = m.fps >= self.target_fps;
        let latency_met = m.latency <= self.target_latency;
        let fps_margin = m.fps - self.target_fps;
        let latency_margin = self.target_latency - m.latency;

        if fps_met && latency_met {
            self.reset_pid(Objective::Fps, &mut trace);
            self.reset_pid(Objective::Latency, &mut trace);
            if !self.try_reduce_power(config, m, &mut trace) {
                self.converged = true;
                trace.push(Decision::Converged);
                let power = self.model.estimate_power(config);
                self.update_best(config, power, m, &mut trace);
                return self.finish(StepOutcome::Converged, power, trace);
            }
        } else {
            let both_at_max = config.big_frequency == CpuClass::Big.max_khz()
                && config.little_frequency == CpuClass::Little.max_khz();

            let fps_error = (self.target_fps - m.fps) / self.target_fps;
            let latency_error = (m.latency - self.target_latency) / self.target_latency;
            let fps_adj = self.objective_output(Objective::Fps, fps_met, fps_error, both_at_max, &mut trace);
            let latency_adj =
                self.objective_output(Objective::Latency, latency_met, latency_error, both_at_max, &mut trace);

            if both_at_max || latency_worsened {
                let reason = if both_at_max { HoldReason::BothAtMax } else { HoldReason::LatencyWorsened };
                trace.push(Decision::FrequencyHeld { reason });
                self.partition_cooldown = 0;
            } else {
                adjust_frequencies(config, fps_adj + latency_adj, fps_met, latency_met, &mut trace);
            }

            self.adjust_partition_points(config, fps_margin, latency_margin, false, both_at_max, &mut trace);
        }

        self.enforce(config, &mut trace);
        let power = self.model.estimate_power(config);
        self.finish(StepOutcome::Continue, power, trace)
    }

    fn finish(&mut self, outcome: StepOutcome, power: f64, trace: Vec<Decision>) -> StepReport {
        self.estimated_power = power;
        StepReport { outcome, estimated_power: power, trace }
    }

    fn pid_mut(&mut self, objective: Objective) -> &mut Pid {
        match objective {
            Objective::Fps => &mut self.fps_pid,
            Objective::Latency => &mut self.latency_pid,
        }
    }

    fn reset_pid(&mut self, objective: Objective, trace: &mut Vec<Decision>) {
        self.pid_mut(objective).reset();
        trace.push(Decision::PidReset { objective });
    }

    // PID OUTPUT FOR ONE OBJECTIVE. MET -> RESET AND 0. SATURATED -> 0.
    fn objective_output(
        &mut self,
        objective: Objective,
        met: bool,
        error: f64,
        both_at_max: bool,
        trace: &mut Vec<Decision>,
    ) -> f64 {
        if met {
            self.reset_pid(objective, trace);
            return 0.0;
        }
        if both_at_max {
            return 0.0;
        }
        let terms = self.pid_mut(objective).update(error, tuning::PID_DT);
        trace.push(Decision::PidUpdate { objective, error, output: terms.output });
        terms.output
    }

    fn update_best(
        &mut self,
        config: &PipelineConfig,
        power: f64,
        m: &Measurement,
        trace: &mut Vec<Decision>,
    ) {
        let violation = violation_score(m, self.target_fps, self.target_latency);
        let better = match &self.best {
            None => true,
            Some(b) => {
                violation < b.violation - EPSILON
                    || ((violation - b.violation).abs() <= EPSILON && power < b.estimated_power - EPSILON)
            }
        };
        if better {
            self.best = Some(BestCandidate {
                config: *config,
                estimated_power: power,
                violation,
                meets_targets: m.meets(self.target_fps, self.target_latency),
            });
            trace.push(Decision::BestUpdated { violation, power });
        }
    }

    // WRITE THE BEST CANDIDATE BACK INTO config. RETURNS ITS POWER.
    fn restore_best(&self, config: &mut PipelineConfig, trace: &mut Vec<Decision>) -> Option<f64> {
        let best = self.best?;
        *config = best.config;
        trace.push(Decision::BestRestored { power: best.estimated_power });
        Some(best.estimated_power)
    }

    pub(crate) fn enforce(&self, config: &mut PipelineConfig, trace: &mut Vec<Decision>) {
        if let Some((from, to)) = partition::enforce(config) {
            trace.push(Decision::PartitionFixed { from, to });
        }
    }

    // DIRECTIONAL MOVE, TRACED WHEN THE PAIR ACTUALLY CHANGED
    pub(crate) fn shift(
        &self,
        config: &mut PipelineConfig,
        dpp1: i32,
        dpp2: i32,
        cause: MoveCause,
        trace: &mut Vec<Decision>,
    ) -> bool {
        let from = PartitionPair::of(config);
        partition::directional_move(config, dpp1, dpp2);
        let to = PartitionPair::of(config);
        if from == to {
            return false;
        }
        trace.push(Decision::PartitionMove { cause, from, to });
        true
    }

    // PARTITION POLICY. DEFICIT MODE PUSHES LAYERS TOWARD THE GPU;
    // REDUCE MODE PULLS THEM BACK ONTO THE CPUS WHEN MARGIN ALLOWS.
    // A PENDING COOLDOWN CONSUMES THE CALL. RETURNS WHETHER THE PAIR MOVED.
    pub(crate) fn adjust_partition_points(
        &mut self,
        config: &mut PipelineConfig,
        fps_margin: f64,
        latency_margin: f64,
        reduce_power: bool,
        force: bool,
        trace: &mut Vec<Decision>,
    ) -> bool {
        if self.partition_cooldown > 0 {
            self.partition_cooldown -= 1;
            trace.push(Decision::PartitionCooldown { remaining: self.partition_cooldown });
            return false;
        }

        let before = PartitionPair::of(config);
        let cooldown = self.tuning.partition_cooldown;
        let (pp1, pp2) = (config.partition_point1, config.partition_point2);

        if reduce_power {
            let rel = (fps_margin / self.target_fps).min(latency_margin / self.target_latency);
            let cause = MoveCause::PowerReduction;
            if rel > tuning::REDUCE_PP1_MARGIN && pp1 > 1 {
                if !self.shift(config, -1, 0, cause, trace) {
                    self.shift(config, 0, -1, cause, trace);
                }
                self.partition_cooldown = cooldown;
            } else if rel > tuning::REDUCE_PP2_MARGIN && pp2 > pp1 {
                self.shift(config, 0, -1, cause, trace);
                self.partition_cooldown = cooldown;
            }
            self.enforce(config, trace);
            return PartitionPair::of(config) != before;
        }

        let deficit = (-fps_margin / self.target_fps).max(-latency_margin / self.target_latency);

        if force {
            let cause = MoveCause::ForcedDeficit;
            if deficit > tuning::FORCED_DEFICIT_BOTH && pp1 < TOTAL_LAYERS && pp2 < TOTAL_LAYERS {
                self.shift(config, 1, 1, cause, trace);
            } else if pp2 < TOTAL_LAYERS {
                self.shift(config, 0, 1, cause, trace);
            } else if pp1 < TOTAL_LAYERS {
                self.shift(config, 1, 0, cause, trace);
            } else {
                return false;
            }
            self.enforce(config, trace);
            self.partition_cooldown = cooldown;
            return PartitionPair::of(config) != before;
        }

        let cause = MoveCause::Deficit;
        if deficit > tuning::DEFICIT_SHIFT_PP1 && pp1 < TOTAL_LAYERS {
            self.shift(config, 1, 0, cause, trace);
            self.partition_cooldown = cooldown;
        } else if deficit > tuning::DEFICIT_SHIFT_BOTH && (pp1 < TOTAL_LAYERS || pp2 < TOTAL_LAYERS) {
            self.shift(config, 1, 1, cause, trace);
            self.partition_cooldown = cooldown;
        } else if deficit > tuning::DEFICIT_SHIFT_PP2 && pp2 < TOTAL_LAYERS {
            self.shift(config, 0, 1, cause, trace);
            self.partition_cooldown = cooldown;
        }
        self.enforce(config, trace);
        PartitionPair::of(config) != before
    }
}

// COMBINED PID OUTPUT -> TABLE STEPS. LATENCY UNMET: BIG FIRST, LITTLE IF BIG
// IS PINNED. ONLY FPS UNMET: BOTH CLUSTERS MOVE TOGETHER.
fn adjust_frequencies(
    config: &mut PipelineConfig,
    adjustment: f64,
    fps_met: bool,
    latency_met: bool,
    trace: &mut Vec<Decision>,
) {
    let steps = adjustment.round() as i32;
    if !latency_met {
        if !step_frequency(config, CpuClass::Big, steps, trace) {
            step_frequency(config, CpuClass::Little, steps, trace);
        }
    } else if !fps_met {
        step_frequency(config, CpuClass::Big, steps, trace);
        step_frequency(config, CpuClass::Little, steps, trace);
    }
}

fn step_frequency(config: &mut PipelineConfig, cpu: CpuClass, steps: i32, trace: &mut Vec<Decision>) -> bool {
    let from = config.frequency(cpu);
    let to = freq::frequency_step(from, steps, cpu);
    if to == from {
        return false;
    }
    match cpu {
        CpuClass::Big => config.big_frequency = to,
        CpuClass::Little => config.little_frequency = to,
    }
    trace.push(Decision::FrequencyStep { cpu, from, to });
    true
}
