// PIPEGOV DECISION TRACE
// EVERY BRANCH THE GOVERNOR TAKES IS RECORDED AS A VALUE. THE GOVERNOR
// NEVER LOGS; THE HOST DECIDES WHAT TO PRINT.

use std::fmt;

use crate::bottleneck::Bottleneck;
use crate::freq::CpuClass;
use crate::partition::PartitionPair;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Objective {
    Fps,
    Latency,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fps => "fps",
            Self::Latency => "latency",
        })
    }
}

// WHY A FREQUENCY CHANGE WAS SKIPPED
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HoldReason {
    BothAtMax,
    LatencyWorsened,
}

// WHAT MOTIVATED A PARTITION MOVE
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveCause {
    Deficit,
    ForcedDeficit,
    PowerReduction,
    Structural,
    Rebalance,
}

impl MoveCause {
    fn label(self) -> &'static str {
        match self {
            Self::Deficit => "deficit",
            Self::ForcedDeficit => "forced deficit",
            Self::PowerReduction => "power reduction",
            Self::Structural => "structural",
            Self::Rebalance => "rebalance",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CutKind {
    Targeted,
    General,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    PartitionFixed { from: PartitionPair, to: PartitionPair },
    Stagnated { streak: u32 },
    BestUpdated { violation: f64, power: f64 },
    BestRestored { power: f64 },
    MaxIterations { iteration: u32 },
    LatencyWorsened { prev: f64, now: f64 },
    PidUpdate { objective: Objective, error: f64, output: f64 },
    PidReset { objective: Objective },
    FrequencyStep { cpu: CpuClass, from: u32, to: u32 },
    FrequencyHeld { reason: HoldReason },
    PartitionCooldown { remaining: u32 },
    PartitionMove { cause: MoveCause, from: PartitionPair, to: PartitionPair },
    Bottleneck { stage: Bottleneck, ratio: f64 },
    FrequencyCut { kind: CutKind, cpu: CpuClass, from: u32, to: u32 },
    NoUsableMargin,
    Converged,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitionFixed { from, to } => write!(
                f, "partition fixed: pp1={} pp2={} -> pp1={} pp2={}",
                from.pp1, from.pp2, to.pp1, to.pp2,
            ),
            Self::Stagnated { streak } => write!(f, "config unchanged for {streak} iterations, stopping"),
            Self::BestUpdated { violation, power } => {
                write!(f, "best updated: violation={violation:.4} power={power:.3}W")
            }
            Self::BestRestored { power } => write!(f, "restored best config ({power:.3}W)"),
            Self::MaxIterations { iteration } => write!(f, "iteration {iteration} exceeds cap"),
            Self::LatencyWorsened { prev, now } => {
                write!(f, "latency worsened {prev:.2}ms -> {now:.2}ms")
            }
            Self::PidUpdate { objective, error, output } => {
                write!(f, "{objective} pid: error={error:+.4} output={output:+.4}")
            }
            Self::PidReset { objective } => write!(f, "{objective} met, pid reset"),
            Self::FrequencyStep { cpu, from, to } => write!(f, "{cpu} freq {from} -> {to} kHz"),
            Self::FrequencyHeld { reason } => match reason {
                HoldReason::BothAtMax => f.write_str("both cpus at max freq, frequency held"),
                HoldReason::LatencyWorsened => f.write_str("latency worsened, frequency held"),
            },
            Self::PartitionCooldown { remaining } => {
                write!(f, "partition cooldown, {remaining} left")
            }
            Self::PartitionMove { cause, from, to } => write!(
                f, "{} move: pp1={} pp2={} -> pp1={} pp2={}",
                cause.label(), from.pp1, from.pp2, to.pp1, to.pp2,
            ),
            Self::Bottleneck { stage, ratio } => {
                write!(f, "bottleneck {stage} ({:.1}%)", ratio * 100.0)
            }
            Self::FrequencyCut { kind, cpu, from, to } => {
                let k = match kind {
                    CutKind::Targeted => "targeted",
                    CutKind::General => "general",
                };
                write!(f, "{k} {cpu} freq reduction {from} -> {to} kHz")
            }
            Self::NoUsableMargin => f.write_str("no usable margin"),
            Self::Converged => f.write_str("converged"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_like_a_log_line() {
        let d = Decision::FrequencyCut {
            kind: CutKind::Targeted,
            cpu: CpuClass::Big,
            from: 1_200_000,
            to: 1_000_000,
        };
        assert_eq!(d.to_string(), "targeted BIG freq reduction 1200000 -> 1000000 kHz");

        let m = Decision::PartitionMove {
            cause: MoveCause::Deficit,
            from: PartitionPair { pp1: 4, pp2: 6 },
            to: PartitionPair { pp1: 5, pp2: 5 },
        };
        assert_eq!(m.to_string(), "deficit move: pp1=4 pp2=6 -> pp1=5 pp2=5");
    }
}
