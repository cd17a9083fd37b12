// PIPEGOV PARTITION CONSTRAINT SOLVER
// TWO PARTITION POINTS SPLIT THE LAYER SEQUENCE INTO THREE CONTIGUOUS STAGES.
// NO STAGE MAY HOLD EXACTLY ONE LAYER (EMPTY STAGES ARE FINE).
//
// THE SEARCH SPACE IS TINY (TOTAL^2 / 2 PAIRS), SO EVERY QUERY IS A FULL
// BRUTE-FORCE SCAN IN ASCENDING (pp1, pp2) ORDER. FIRST MINIMUM WINS TIES.

use crate::config::{PipelineConfig, TOTAL_LAYERS};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PartitionPair {
    pub pp1: u32,
    pub pp2: u32,
}

impl PartitionPair {
    pub fn of(config: &PipelineConfig) -> Self {
        Self { pp1: config.partition_point1, pp2: config.partition_point2 }
    }

    fn write(self, config: &mut PipelineConfig) {
        config.partition_point1 = self.pp1;
        config.partition_point2 = self.pp2;
    }

    fn distance(self, x1: i64, x2: i64) -> i64 {
        (self.pp1 as i64 - x1).abs() + (self.pp2 as i64 - x2).abs()
    }
}

pub fn is_valid_pair(pp1: u32, pp2: u32, total: u32) -> bool {
    if pp1 < 1 || pp1 > pp2 || pp2 > total {
        return false;
    }
    pp1 != 1 && pp2 - pp1 != 1 && total - pp2 != 1
}

// ALL VALID PAIRS IN SCAN ORDER
pub fn valid_pairs(total: u32) -> impl Iterator<Item = PartitionPair> {
    (1..=total).flat_map(move |pp1| {
        (pp1..=total)
            .filter(move |&pp2| is_valid_pair(pp1, pp2, total))
            .map(move |pp2| PartitionPair { pp1, pp2 })
    })
}

// CLAMP A RAW (POSSIBLY NEGATIVE OR INVERTED) POINT INTO 1 <= pp1 <= pp2 <= total
fn clamp_raw(pp1: i64, pp2: i64, total: u32) -> (i64, i64) {
    let t = total as i64;
    let p1 = pp1.clamp(1, t);
    let p2 = pp2.clamp(1, t).max(p1);
    (p1, p2)
}

// NEAREST VALID PAIR (MANHATTAN) TO A RAW POINT. TOTAL MUST BE >= 6,
// WHICH GUARANTEES AT LEAST ONE VALID PAIR EXISTS.
pub fn nearest_valid(pp1: i64, pp2: i64, total: u32) -> PartitionPair {
    let (c1, c2) = clamp_raw(pp1, pp2, total);
    let mut best = PartitionPair { pp1: c1 as u32, pp2: c2 as u32 };
    let mut best_cost = i64::MAX;
    for cand in valid_pairs(total) {
        let cost = cand.distance(c1, c2);
        if cost < best_cost {
            best_cost = cost;
            best = cand;
        }
    }
    best
}

// DIRECTION-PRESERVING MOVE. A NONZERO DELTA REQUIRES THE RESULT TO HAVE
// MOVED STRICTLY IN THAT DIRECTION ON THAT AXIS. MINIMIZE DISTANCE TO THE
// RAW TARGET, THEN DISTANCE TO THE ORIGIN. NONE IF NO CANDIDATE QUALIFIES.
pub fn directional_target(
    orig: PartitionPair,
    dpp1: i32,
    dpp2: i32,
    total: u32,
) -> Option<PartitionPair> {
    let (t1, t2) = clamp_raw(orig.pp1 as i64 + dpp1 as i64, orig.pp2 as i64 + dpp2 as i64, total);
    let respects = |now: u32, was: u32, d: i32| match d.signum() {
        1 => now > was,
        -1 => now < was,
        _ => true,
    };

    let mut best: Option<(PartitionPair, i64, i64)> = None;
    for cand in valid_pairs(total) {
        if !respects(cand.pp1, orig.pp1, dpp1) || !respects(cand.pp2, orig.pp2, dpp2) {
            continue;
        }
        let cost = cand.distance(t1, t2);
        let orig_cost = cand.distance(orig.pp1 as i64, orig.pp2 as i64);
        let better = match best {
            None => true,
            Some((_, bc, boc)) => cost < bc || (cost == bc && orig_cost < boc),
        };
        if better {
            best = Some((cand, cost, orig_cost));
        }
    }
    best.map(|(p, _, _)| p)
}

// SNAP THE CONFIG TO THE NEAREST VALID PAIR. RETURNS THE (FROM, TO) PAIRS
// WHEN SOMETHING MOVED, SO THE CALLER CAN TRACE THE FIX.
pub fn enforce(config: &mut PipelineConfig) -> Option<(PartitionPair, PartitionPair)> {
    let from = PartitionPair::of(config);
    let to = nearest_valid(from.pp1 as i64, from.pp2 as i64, TOTAL_LAYERS);
    to.write(config);
    (from != to).then_some((from, to))
}

// SHIFT PARTITION POINTS BY (dpp1, dpp2) WITHOUT REVERSING THE REQUESTED
// DIRECTION. WHEN NO DIRECTION-RESPECTING VALID PAIR EXISTS, THE CLAMPED
// RAW TARGET IS WRITTEN AND THEN ENFORCED.
pub fn directional_move(config: &mut PipelineConfig, dpp1: i32, dpp2: i32) {
    let orig = PartitionPair::of(config);
    match directional_target(orig, dpp1, dpp2, TOTAL_LAYERS) {
        Some(p) => p.write(config),
        None => {
            let (t1, t2) = clamp_raw(
                orig.pp1 as i64 + dpp1 as i64,
                orig.pp2 as i64 + dpp2 as i64,
                TOTAL_LAYERS,
            );
            PartitionPair { pp1: t1 as u32, pp2: t2 as u32 }.write(config);
            enforce(config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(pp1: u32, pp2: u32) -> PipelineConfig {
        PipelineConfig { partition_point1: pp1, partition_point2: pp2, ..PipelineConfig::ROOT }
    }

    #[test]
    fn valid_pair_rules() {
        assert!(is_valid_pair(4, 6, 8));
        assert!(is_valid_pair(8, 8, 8)); // GPU ONLY
        assert!(is_valid_pair(2, 2, 8)); // EMPTY MIDDLE STAGE
        assert!(!is_valid_pair(1, 4, 8));
        assert!(!is_valid_pair(4, 5, 8));
        assert!(!is_valid_pair(4, 7, 8));
        assert!(!is_valid_pair(5, 4, 8));
        assert!(!is_valid_pair(0, 4, 8));
    }

    #[test]
    fn enforce_single_layer_front() {
        // (1,1,6) -> NEAREST VALID BY SCAN ORDER
        let mut c = cfg(1, 2);
        let fix = enforce(&mut c);
        assert!(fix.is_some());
        assert_eq!((c.partition_point1, c.partition_point2), (2, 2));
        assert!(c.stage_sizes().iter().all(|&s| s != 1));
    }

    #[test]
    fn enforce_leaves_valid_config_alone() {
        let mut c = cfg(4, 6);
        assert!(enforce(&mut c).is_none());
        assert_eq!((c.partition_point1, c.partition_point2), (4, 6));
    }

    #[test]
    fn enforce_clamps_out_of_range() {
        let mut c = cfg(0, 12);
        enforce(&mut c);
        assert!(is_valid_pair(c.partition_point1, c.partition_point2, TOTAL_LAYERS));
        let mut c = cfg(7, 3);
        enforce(&mut c);
        assert!(is_valid_pair(c.partition_point1, c.partition_point2, TOTAL_LAYERS));
    }

    #[test]
    fn directional_move_up_skips_invalid() {
        // (4,6) +1 ON pp1 -> (5,6) HAS A 1-LAYER MIDDLE STAGE.
        // (5,5) AND (6,6) TIE ON BOTH DISTANCES, SCAN ORDER PICKS (5,5)
        let mut c = cfg(4, 6);
        directional_move(&mut c, 1, 0);
        assert!(c.partition_point1 > 4);
        assert!(is_valid_pair(c.partition_point1, c.partition_point2, TOTAL_LAYERS));
        assert_eq!((c.partition_point1, c.partition_point2), (5, 5));
    }

    #[test]
    fn directional_move_zero_delta_unconstrained() {
        let mut c = cfg(4, 6);
        directional_move(&mut c, 0, 1);
        assert!(c.partition_point2 > 6);
        assert_eq!((c.partition_point1, c.partition_point2), (4, 8));
    }

    #[test]
    fn directional_move_infeasible_falls_back_to_enforce() {
        // pp1 CANNOT GO ABOVE 8
        let mut c = cfg(8, 8);
        directional_move(&mut c, 1, 1);
        assert_eq!((c.partition_point1, c.partition_point2), (8, 8));
    }

    #[test]
    fn directional_move_down() {
        let mut c = cfg(4, 6);
        directional_move(&mut c, -1, 0);
        assert_eq!((c.partition_point1, c.partition_point2), (3, 6));
        directional_move(&mut c, 0, -1);
        // (3,5)? MIDDLE=2, LAST=3 -> VALID
        assert_eq!((c.partition_point1, c.partition_point2), (3, 5));
    }
}
