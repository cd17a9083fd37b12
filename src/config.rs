// PIPEGOV PIPELINE CONFIGURATION
// ONE CANDIDATE OPERATING POINT: TWO PARTITION POINTS, TWO CPU FREQUENCIES,
// AND THE PHYSICAL STAGE ORDER.
//
// STAGES ARE 1-INDEXED LAYER BOUNDARIES:
//   STAGE 1 = LAYERS [0, pp1)   STAGE 2 = [pp1, pp2)   STAGE 3 = [pp2, TOTAL_LAYERS)
// THE CONTROLLER TREATS STAGE 1/2/3 AS GPU/BIG/LITTLE. THE ORDER LABEL ONLY
// DECIDES WHICH PROCESSOR ACTUALLY RUNS EACH STAGE WHEN APPORTIONING WORK.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::freq::{self, CpuClass};
use crate::partition;

pub const TOTAL_LAYERS: u32 = 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Processor {
    Gpu,
    Big,
    Little,
}

impl Processor {
    pub fn letter(self) -> char {
        match self {
            Self::Gpu => 'G',
            Self::Big => 'B',
            Self::Little => 'L',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'G' => Some(Self::Gpu),
            'B' => Some(Self::Big),
            'L' => Some(Self::Little),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gpu => "GPU",
            Self::Big => "BIG",
            Self::Little => "LITTLE",
        }
    }
}

// PERMUTATION OF {GPU, BIG, LITTLE}. WRITTEN "G-B-L" ON THE WIRE.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StageOrder([Processor; 3]);

impl StageOrder {
    pub const GBL: Self = Self([Processor::Gpu, Processor::Big, Processor::Little]);

    pub fn new(stages: [Processor; 3]) -> Option<Self> {
        let distinct = stages[0] != stages[1] && stages[1] != stages[2] && stages[0] != stages[2];
        distinct.then_some(Self(stages))
    }

    pub fn stages(&self) -> [Processor; 3] {
        self.0
    }
}

impl Default for StageOrder {
    fn default() -> Self {
        Self::GBL
    }
}

impl FromStr for StageOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::InvalidOrder(s.to_string());
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 {
            return Err(bad());
        }
        let mut stages = [Processor::Gpu; 3];
        for (slot, part) in stages.iter_mut().zip(&parts) {
            let mut chars = part.chars();
            let c = chars.next().ok_or_else(bad)?;
            if chars.next().is_some() {
                return Err(bad());
            }
            *slot = Processor::from_letter(c).ok_or_else(bad)?;
        }
        Self::new(stages).ok_or_else(bad)
    }
}

impl fmt::Display for StageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}-{}-{}", a.letter(), b.letter(), c.letter())
    }
}

// LAYER COUNT PER PROCESSOR AFTER APPLYING THE STAGE ORDER
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ProcessorLayers {
    pub gpu: u32,
    pub big: u32,
    pub little: u32,
}

// EQUALITY IS OVER ALL FIVE SEMANTIC FIELDS. THE GOVERNOR'S STAGNATION
// DETECTOR RELIES ON IT.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PipelineConfig {
    pub partition_point1: u32,
    pub partition_point2: u32,
    pub big_frequency: u32,
    pub little_frequency: u32,
    pub order: StageOrder,
}

impl PipelineConfig {
    // KNOWN-GOOD STARTING POINT FOR ALEXNET ON THE BOARD
    pub const ROOT: Self = Self {
        partition_point1: 4,
        partition_point2: 6,
        big_frequency: 1_800_000,
        little_frequency: 1_200_000,
        order: StageOrder::GBL,
    };

    pub fn stage_sizes(&self) -> [u32; 3] {
        [
            self.partition_point1,
            self.partition_point2.saturating_sub(self.partition_point1),
            TOTAL_LAYERS.saturating_sub(self.partition_point2),
        ]
    }

    pub fn processor_layers(&self) -> ProcessorLayers {
        let mut out = ProcessorLayers::default();
        for (proc, size) in self.order.stages().into_iter().zip(self.stage_sizes()) {
            match proc {
                Processor::Gpu => out.gpu = size,
                Processor::Big => out.big = size,
                Processor::Little => out.little = size,
            }
        }
        out
    }

    pub fn frequency(&self, cpu: CpuClass) -> u32 {
        match cpu {
            CpuClass::Big => self.big_frequency,
            CpuClass::Little => self.little_frequency,
        }
    }

    fn frequency_mut(&mut self, cpu: CpuClass) -> &mut u32 {
        match cpu {
            CpuClass::Big => &mut self.big_frequency,
            CpuClass::Little => &mut self.little_frequency,
        }
    }

    pub fn set_partition_point1(&mut self, value: u32) -> Result<(), ConfigError> {
        check_partition(1, value)?;
        self.partition_point1 = value;
        partition::enforce(self);
        Ok(())
    }

    pub fn set_partition_point2(&mut self, value: u32) -> Result<(), ConfigError> {
        check_partition(2, value)?;
        self.partition_point2 = value;
        partition::enforce(self);
        Ok(())
    }

    pub fn set_order(&mut self, order: &str) -> Result<(), ConfigError> {
        self.order = order.parse()?;
        Ok(())
    }

    pub fn set_frequency(&mut self, khz: u32, cpu: CpuClass) -> Result<(), ConfigError> {
        if !freq::is_valid_frequency(khz, cpu) {
            return Err(ConfigError::InvalidFrequency { cpu, khz });
        }
        *self.frequency_mut(cpu) = khz;
        Ok(())
    }

    // ONE TABLE STEP UP. FALSE AT THE TOP (OR IF THE CURRENT VALUE IS NOT A MEMBER).
    pub fn increment_frequency(&mut self, cpu: CpuClass) -> bool {
        self.step_member(cpu, 1)
    }

    pub fn decrement_frequency(&mut self, cpu: CpuClass) -> bool {
        self.step_member(cpu, -1)
    }

    fn step_member(&mut self, cpu: CpuClass, dir: i32) -> bool {
        let current = self.frequency(cpu);
        if !freq::is_valid_frequency(current, cpu) {
            return false;
        }
        let next = freq::frequency_step(current, dir, cpu);
        *self.frequency_mut(cpu) = next;
        next != current
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::ROOT
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "big_freq={} little_freq={} pp1={} pp2={} order={}",
            self.big_frequency, self.little_frequency,
            self.partition_point1, self.partition_point2, self.order,
        )
    }
}

fn check_partition(point: u8, value: u32) -> Result<(), ConfigError> {
    if value < 1 || value > TOTAL_LAYERS {
        return Err(ConfigError::PartitionOutOfRange { point, value, max: TOTAL_LAYERS });
    }
    Ok(())
}
