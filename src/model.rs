// PIPEGOV POWER / PERFORMANCE MODEL
// EVERY CONSTANT HERE WAS FITTED FROM BOARD SWEEPS (KHZ, MS, W).
// THEY ARE PLAIN DATA ON PowerModel AND CpuFit: A RE-FIT DROPS IN
// WITHOUT TOUCHING THE GOVERNOR.

use crate::config::{PipelineConfig, Processor, TOTAL_LAYERS};
use crate::freq::CpuClass;

// PER-LAYER SHARE OF PIPELINE COST (ALEXNET, 8 LAYERS).
// EARLY CONVOLUTIONS DOMINATE, THE CLASSIFIER TAIL IS NEARLY FREE.
pub const LAYER_WEIGHTS: [f64; TOTAL_LAYERS as usize] =
    [0.20, 0.25, 0.15, 0.15, 0.10, 0.08, 0.05, 0.02];

// FITTED CURVES FOR ONE CPU CLUSTER
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuFit {
    // W = a*f^2 + b*f + c
    pub power: [f64; 3],
    // MS = scale / GHZ + floor
    pub latency_scale: f64,
    pub latency_floor: f64,
    // FPS = 1 / (scale / GHZ + floor)
    pub fps_scale: f64,
    pub fps_floor: f64,
    // KHZ = a*W^2 + b*W + c
    pub power_inverse: [f64; 3],
}

pub const BIG_FIT: CpuFit = CpuFit {
    power: [6.998e-13, -7.705e-7, 2.523],
    latency_scale: 1.986e2,
    latency_floor: 12.009,
    fps_scale: 1.882e-1,
    fps_floor: 0.019,
    power_inverse: [-3.409e5, 2.991e6, -4.385e6],
};

pub const LITTLE_FIT: CpuFit = CpuFit {
    power: [4.827e-14, 2.292e-7, 1.855],
    latency_scale: 3.902e2,
    latency_floor: 153.954,
    fps_scale: 3.287e-1,
    fps_floor: 0.202,
    power_inverse: [-1.74e6, 1.042e7, -1.329e7],
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProcessorShares {
    pub gpu: f64,
    pub big: f64,
    pub little: f64,
}

impl ProcessorShares {
    pub fn active_stages(&self) -> u32 {
        [self.gpu, self.big, self.little].iter().filter(|&&w| w > 0.0).count() as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerModel {
    pub big: CpuFit,
    pub little: CpuFit,
    // GPU DRAW IS FLAT ACROSS THE OPERATING RANGE
    pub gpu_power: f64,
    // HAND-OFF OVERHEAD: (base + scale * (big_coeff*big + little_coeff*little)) * (active-1)/2
    pub sync_big_coeff: f64,
    pub sync_little_coeff: f64,
    pub sync_scale: f64,
    pub sync_base: f64,
    pub layer_weights: [f64; TOTAL_LAYERS as usize],
}

impl Default for PowerModel {
    fn default() -> Self {
        Self {
            big: BIG_FIT,
            little: LITTLE_FIT,
            gpu_power: 3.0,
            sync_big_coeff: 9.412e-7,
            sync_little_coeff: -3.230e-8,
            // OBSERVED 0.63W SPREAD OVER A 1.57W RAW-FIT SPREAD
            sync_scale: 0.63 / 1.57,
            sync_base: 0.47,
            layer_weights: LAYER_WEIGHTS,
        }
    }
}

impl PowerModel {
    pub fn fit(&self, cpu: CpuClass) -> &CpuFit {
        match cpu {
            CpuClass::Big => &self.big,
            CpuClass::Little => &self.little,
        }
    }

    pub fn power(&self, cpu: CpuClass, khz: f64) -> f64 {
        let [a, b, c] = self.fit(cpu).power;
        a * khz * khz + b * khz + c
    }

    pub fn latency(&self, cpu: CpuClass, khz: f64) -> f64 {
        let fit = self.fit(cpu);
        fit.latency_scale / (khz / 1e6) + fit.latency_floor
    }

    pub fn fps(&self, cpu: CpuClass, khz: f64) -> f64 {
        let fit = self.fit(cpu);
        1.0 / (fit.fps_scale / (khz / 1e6) + fit.fps_floor)
    }

    // TARGETS AT OR BELOW THE ASYMPTOTE ARE UNREACHABLE: TABLE MAXIMUM
    pub fn frequency_for_latency(&self, cpu: CpuClass, latency_ms: f64) -> f64 {
        let fit = self.fit(cpu);
        let denom = latency_ms - fit.latency_floor;
        if !(denom > 0.0) {
            return cpu.max_khz() as f64;
        }
        fit.latency_scale / denom * 1e6
    }

    pub fn frequency_for_fps(&self, cpu: CpuClass, fps: f64) -> f64 {
        let fit = self.fit(cpu);
        let denom = 1.0 / fps - fit.fps_floor;
        if !(denom > 0.0) || !denom.is_finite() {
            return cpu.max_khz() as f64;
        }
        fit.fps_scale / denom * 1e6
    }

    // BUDGETS THE FIT MAPS TO A NON-POSITIVE FREQUENCY GET THE TABLE MAXIMUM
    pub fn frequency_for_power(&self, cpu: CpuClass, watts: f64) -> f64 {
        let [a, b, c] = self.fit(cpu).power_inverse;
        let khz = a * watts * watts + b * watts + c;
        if !(khz > 0.0) || !khz.is_finite() {
            return cpu.max_khz() as f64;
        }
        khz
    }

    fn weight_sum(&self, start: u32, end: u32) -> f64 {
        let end = end.min(TOTAL_LAYERS) as usize;
        let start = (start as usize).min(end);
        self.layer_weights[start..end].iter().sum()
    }

    // STAGE POSITIONS MAP TO PROCESSORS THROUGH THE STAGE ORDER
    pub fn weighted_fractions(&self, config: &PipelineConfig) -> ProcessorShares {
        let pp1 = config.partition_point1;
        let pp2 = config.partition_point2.max(pp1);
        let slots = [
            self.weight_sum(0, pp1),
            self.weight_sum(pp1, pp2),
            self.weight_sum(pp2, TOTAL_LAYERS),
        ];
        let mut out = ProcessorShares::default();
        for (proc, w) in config.order.stages().into_iter().zip(slots) {
            match proc {
                Processor::Gpu => out.gpu = w,
                Processor::Big => out.big = w,
                Processor::Little => out.little = w,
            }
        }
        out
    }

    pub fn estimate_power(&self, config: &PipelineConfig) -> f64 {
        let shares = self.weighted_fractions(config);
        let big = config.big_frequency as f64;
        let little = config.little_frequency as f64;

        let mut power = 0.0;
        if shares.gpu > 0.0 {
            power += self.gpu_power * shares.gpu;
        }
        if shares.big > 0.0 {
            power += self.power(CpuClass::Big, big) * shares.big;
        }
        if shares.little > 0.0 {
            power += self.power(CpuClass::Little, little) * shares.little;
        }

        let active = shares.active_stages();
        if active > 1 {
            let raw = self.sync_big_coeff * big + self.sync_little_coeff * little;
            let stage_factor = (active - 1) as f64 / 2.0;
            power += (self.sync_base + self.sync_scale * raw) * stage_factor;
        }
        power
    }
}
