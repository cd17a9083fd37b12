// PIPEGOV PIPELINE RUNNER
// THE ONE BLOCKING BOUNDARY: APPLY A CONFIG TO THE BOARD, RUN N FRAMES,
// READ BACK A MEASUREMENT. EVERYTHING ON THE OTHER SIDE IS SHELL SCRIPTS.
//
// Ok(None) MEANS THE RUN PRODUCED NO NEW OUTPUT (INTERRUPTED). THE SESSION
// STOPS ON IT INSTEAD OF FEEDING A STALE OR ZERO MEASUREMENT TO THE GOVERNOR.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};

use crate::config::PipelineConfig;
use crate::freq::CpuClass;
use crate::measure::{self, Measurement};

pub trait PipelineRunner {
    fn execute(&mut self, config: &PipelineConfig) -> Result<Option<Measurement>>;
}

pub const SET_FREQ_SCRIPT: &str = "./set_freq.sh";
pub const RUN_INFERENCE_SCRIPT: &str = "./run_inference.sh";
pub const SET_FAN_SCRIPT: &str = "./set_fan.sh";
pub const RUN_OUTPUT_FILE: &str = "last_run_output.txt";
pub const CONSOLE_OUTPUT_FILE: &str = "output.txt";

// CPUFREQ POLICIES FOR THE LITTLE (0) AND BIG (2) CLUSTERS
const GOVERNOR_PATHS: [&str; 2] = [
    "/sys/devices/system/cpu/cpufreq/policy0/scaling_governor",
    "/sys/devices/system/cpu/cpufreq/policy2/scaling_governor",
];

pub struct ScriptRunner {
    work_dir: PathBuf,
    graph: String,
    frames: u32,
}

impl ScriptRunner {
    pub fn new(work_dir: impl Into<PathBuf>, graph: impl Into<String>, frames: u32) -> Self {
        Self { work_dir: work_dir.into(), graph: graph.into(), frames }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn script(&self, name: &str) -> Command {
        let mut cmd = Command::new(name);
        cmd.current_dir(&self.work_dir);
        cmd
    }

    fn set_frequency(&self, cpu: CpuClass, khz: u32) -> Result<()> {
        let status = self.script(SET_FREQ_SCRIPT)
            .arg(cpu.script_arg())
            .arg(khz.to_string())
            .status()
            .with_context(|| format!("spawning {SET_FREQ_SCRIPT}"))?;
        if !status.success() {
            log_warn!("{} {} {} EXITED {}", SET_FREQ_SCRIPT, cpu.script_arg(), khz, status);
        }
        Ok(())
    }

    fn output_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(self.work_dir.join(RUN_OUTPUT_FILE))
            .and_then(|m| m.modified())
            .ok()
    }

    fn set_fan(&self, on: bool) -> Result<()> {
        let status = self.script(SET_FAN_SCRIPT)
            .args(["1", "0", if on { "1" } else { "0" }])
            .status()
            .with_context(|| format!("spawning {SET_FAN_SCRIPT}"))?;
        if !status.success() {
            log_warn!("{} EXITED {}", SET_FAN_SCRIPT, status);
        }
        Ok(())
    }

    // ROOT ON THE BOARD, PIN BOTH CLUSTERS TO THE PERFORMANCE GOVERNOR SO
    // set_freq.sh CONTROLS THE CLOCK, FAN ON.
    pub fn prepare_board(&self) -> Result<()> {
        let status = Command::new("adb").args(["-d", "root"]).status()
            .context("spawning adb")?;
        if !status.success() {
            bail!("adb -d root FAILED ({status})");
        }
        for path in GOVERNOR_PATHS {
            let status = Command::new("adb")
                .args(["-d", "shell"])
                .arg(format!("echo performance > {path}"))
                .status()
                .context("spawning adb shell")?;
            if !status.success() {
                log_warn!("SETTING PERFORMANCE GOVERNOR ON {} FAILED", path);
            }
        }
        self.set_fan(true)
    }

    pub fn release_board(&self) -> Result<()> {
        self.set_fan(false)
    }
}

impl PipelineRunner for ScriptRunner {
    fn execute(&mut self, config: &PipelineConfig) -> Result<Option<Measurement>> {
        let before = self.output_mtime();

        self.set_frequency(CpuClass::Little, config.little_frequency)?;
        self.set_frequency(CpuClass::Big, config.big_frequency)?;

        let console = File::create(self.work_dir.join(CONSOLE_OUTPUT_FILE))
            .with_context(|| format!("creating {CONSOLE_OUTPUT_FILE}"))?;
        let console_err = console.try_clone()?;
        let status = self.script(RUN_INFERENCE_SCRIPT)
            .args([
                self.graph.clone(),
                self.frames.to_string(),
                config.partition_point1.to_string(),
                config.partition_point2.to_string(),
                config.order.to_string(),
            ])
            .stdout(Stdio::from(console))
            .stderr(Stdio::from(console_err))
            .status()
            .with_context(|| format!("spawning {RUN_INFERENCE_SCRIPT}"))?;
        log_debug!("{} EXITED {}", RUN_INFERENCE_SCRIPT, status);

        let after = self.output_mtime();
        if after.is_none() || after == before {
            return Ok(None);
        }

        let path = self.work_dir.join(RUN_OUTPUT_FILE);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let m = measure::parse_run_log(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(m))
    }
}
