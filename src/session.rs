// PIPEGOV SESSION
// HOST LOOP: RUN THE PIPELINE, FEED THE GOVERNOR, REPEAT UNTIL TERMINAL.
//
// CANCELLATION IS COOPERATIVE AT ITERATION BOUNDARIES. AN INTERRUPTED OR
// SHUT-DOWN SESSION REPORTS THE BEST CANDIDATE, NOT WHATEVER CONFIG WAS
// IN FLIGHT WHEN IT STOPPED.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::config::PipelineConfig;
use crate::event::EventLog;
use crate::freq::CpuClass;
use crate::governor::{BestCandidate, PidGovernor, StepOutcome};
use crate::grid::MeasurementGrid;
use crate::runner::PipelineRunner;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StopReason {
    Converged,
    MaxIterations,
    Interrupted,
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "CONVERGED",
            Self::MaxIterations => "MAX_ITERATIONS",
            Self::Interrupted => "INTERRUPTED",
            Self::Shutdown => "SHUTDOWN",
        })
    }
}

#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub reason: StopReason,
    pub final_config: PipelineConfig,
    pub estimated_power: f64,
    pub best: Option<BestCandidate>,
    pub iterations: u32,
}

pub struct Session<R: PipelineRunner> {
    governor: PidGovernor,
    config: PipelineConfig,
    grid: Option<MeasurementGrid>,
    runner: R,
    pub log: EventLog,
}

impl<R: PipelineRunner> Session<R> {
    pub fn new(governor: PidGovernor, runner: R) -> Self {
        Self {
            governor,
            config: PipelineConfig::ROOT,
            grid: None,
            runner,
            log: EventLog::new(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    // SEED THE STARTING FREQUENCIES FROM THE GRID BEFORE THE FIRST RUN
    pub fn with_grid(mut self, grid: MeasurementGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn governor(&self) -> &PidGovernor {
        &self.governor
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn seed_from_grid(&mut self) {
        let Some(grid) = &self.grid else {
            return;
        };
        let (fps, latency) = (self.governor.target_fps(), self.governor.target_latency());
        let Some(a) = grid.approximate(fps, latency) else {
            log_warn!("GRID APPROXIMATION FAILED FOR fps={} latency={}, KEEPING {}", fps, latency, self.config);
            return;
        };
        for (cpu, khz) in [(CpuClass::Big, a.big_frequency), (CpuClass::Little, a.little_frequency)] {
            if let Err(e) = self.config.set_frequency(khz, cpu) {
                log_warn!("GRID SEED REJECTED: {}", e);
            }
        }
        log_info!("SEEDED FROM GRID: big={} little={} (error {:.4})",
            self.config.big_frequency, self.config.little_frequency, a.error);
    }

    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<SessionOutcome> {
        self.seed_from_grid();
        log_info!("START: {}", self.config);

        let reason = loop {
            if shutdown.load(Ordering::Relaxed) {
                break StopReason::Shutdown;
            }

            let Some(m) = self.runner.execute(&self.config)? else {
                log_warn!("RUN PRODUCED NO NEW OUTPUT, STOPPING");
                break StopReason::Interrupted;
            };
            log_info!("ITER {}: fps={:.3} latency={:.2}ms stages=[{:.2}, {:.2}, {:.2}]",
                self.governor.iteration() + 1, m.fps, m.latency,
                m.stage_times[0], m.stage_times[1], m.stage_times[2]);

            let report = self.governor.step(&mut self.config, &m);
            for d in &report.trace {
                log_debug!("  {}", d);
            }
            self.log.snapshot(
                self.governor.iteration(), &m, &self.config, report.estimated_power, report.outcome,
            );
            log_info!("  {} -> {} power={:.3}W", report.outcome, self.config, report.estimated_power);

            match report.outcome {
                StepOutcome::Continue => {}
                StepOutcome::Converged => break StopReason::Converged,
                StepOutcome::MaxIterations => break StopReason::MaxIterations,
            }
        };

        let best = self.governor.best();
        let (final_config, estimated_power) = match (reason, best) {
            (StopReason::Interrupted | StopReason::Shutdown, Some(b)) => (b.config, b.estimated_power),
            _ => (self.config, self.governor.estimated_power()),
        };

        Ok(SessionOutcome {
            reason,
            final_config,
            estimated_power,
            best,
            iterations: self.governor.iteration(),
        })
    }
}
