// PIPEGOV FREQUENCY TABLES
// DISCRETE DVFS LEVELS PER CPU CLUSTER, IN KHZ, STRICTLY ASCENDING.
// EVERY FREQUENCY THE GOVERNOR EMITS IS A MEMBER OF ONE OF THESE TABLES.

use std::fmt;

pub const BIG_FREQUENCY_TABLE: [u32; 13] = [
    500_000, 667_000, 1_000_000, 1_200_000, 1_398_000, 1_512_000, 1_608_000,
    1_704_000, 1_800_000, 1_908_000, 2_016_000, 2_100_000, 2_208_000,
];

pub const LITTLE_FREQUENCY_TABLE: [u32; 9] = [
    500_000, 667_000, 1_000_000, 1_200_000, 1_398_000, 1_512_000, 1_608_000,
    1_704_000, 1_800_000,
];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CpuClass {
    Big,
    Little,
}

impl CpuClass {
    pub fn table(self) -> &'static [u32] {
        match self {
            Self::Big => &BIG_FREQUENCY_TABLE,
            Self::Little => &LITTLE_FREQUENCY_TABLE,
        }
    }

    pub fn min_khz(self) -> u32 {
        self.table()[0]
    }

    pub fn max_khz(self) -> u32 {
        let t = self.table();
        t[t.len() - 1]
    }

    // ARGUMENT NAME USED BY set_freq.sh
    pub fn script_arg(self) -> &'static str {
        match self {
            Self::Big => "big",
            Self::Little => "little",
        }
    }
}

impl fmt::Display for CpuClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Big => "BIG",
            Self::Little => "LITTLE",
        })
    }
}

pub fn is_valid_frequency(khz: u32, cpu: CpuClass) -> bool {
    cpu.table().binary_search(&khz).is_ok()
}

// TABLE INDEX OF khz. NON-MEMBERS MAP TO THE NEAREST ENTRY, LOWER INDEX ON A TIE.
pub fn frequency_index(khz: u32, cpu: CpuClass) -> usize {
    let table = cpu.table();
    if let Ok(i) = table.binary_search(&khz) {
        return i;
    }
    let mut best = 0;
    let mut best_diff = table[0].abs_diff(khz);
    for (i, &f) in table.iter().enumerate().skip(1) {
        let diff = f.abs_diff(khz);
        if diff < best_diff {
            best_diff = diff;
            best = i;
        }
    }
    best
}

// MOVE steps TABLE ENTRIES FROM current (NEGATIVE = DOWN). CLAMPED TO THE TABLE.
pub fn frequency_step(current: u32, steps: i32, cpu: CpuClass) -> u32 {
    let table = cpu.table();
    let idx = frequency_index(current, cpu) as i64 + steps as i64;
    let idx = idx.clamp(0, table.len() as i64 - 1) as usize;
    table[idx]
}

// NEAREST TABLE MEMBER. EXACT MIDPOINTS ROUND UP. IDEMPOTENT ON MEMBERS.
pub fn snap_to_valid_frequency(khz: u32, cpu: CpuClass) -> u32 {
    let table = cpu.table();
    if khz <= table[0] {
        return table[0];
    }
    if khz >= cpu.max_khz() {
        return cpu.max_khz();
    }
    for pair in table.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if khz >= lo && khz <= hi {
            return if khz - lo < hi - khz { lo } else { hi };
        }
    }
    cpu.max_khz()
}

// BRACKETING TABLE ENTRIES FOR AN ARBITRARY (E.G. MODEL-DERIVED) FREQUENCY.
// A MEMBER STRICTLY INSIDE THE TABLE IS BRACKETED BY ITS TWO NEIGHBORS.
// AT OR ABOVE THE TOP BOTH SIDES ARE THE MAXIMUM, AT OR BELOW THE BOTTOM
// BOTH SIDES ARE THE MINIMUM. NEVER EXTRAPOLATES.
pub fn get_frequency_neighbors(khz: f64, cpu: CpuClass) -> (u32, u32) {
    let table = cpu.table();
    let max = cpu.max_khz();
    let min = cpu.min_khz();
    if khz.is_nan() || khz >= max as f64 {
        return (max, max);
    }
    if khz <= min as f64 {
        return (min, min);
    }
    for i in 1..table.len() - 1 {
        if khz > table[i - 1] as f64 && khz < table[i + 1] as f64 {
            let f = table[i] as f64;
            return if khz < f {
                (table[i - 1], table[i])
            } else if khz > f {
                (table[i], table[i + 1])
            } else {
                (table[i - 1], table[i + 1])
            };
        }
    }
    (max, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_strictly_ascending() {
        for cpu in [CpuClass::Big, CpuClass::Little] {
            assert!(cpu.table().windows(2).all(|w| w[0] < w[1]), "{cpu} table not ascending");
        }
    }

    #[test]
    fn frequency_index_exact_and_nearest() {
        assert_eq!(frequency_index(1_200_000, CpuClass::Big), 3);
        assert_eq!(frequency_index(1_210_000, CpuClass::Big), 3);
        assert_eq!(frequency_index(9_999_999, CpuClass::Little), 8);
        assert_eq!(frequency_index(0, CpuClass::Little), 0);
    }

    #[test]
    fn frequency_step_clamps() {
        assert_eq!(frequency_step(2_100_000, 5, CpuClass::Big), 2_208_000);
        assert_eq!(frequency_step(667_000, -3, CpuClass::Little), 500_000);
        assert_eq!(frequency_step(1_000_000, 2, CpuClass::Little), 1_398_000);
        assert_eq!(frequency_step(1_000_000, 0, CpuClass::Big), 1_000_000);
    }

    #[test]
    fn snap_rounds_to_nearest() {
        assert_eq!(snap_to_valid_frequency(1_710_000, CpuClass::Big), 1_704_000);
        assert_eq!(snap_to_valid_frequency(1_790_000, CpuClass::Big), 1_800_000);
        // MIDPOINT OF 1200000 AND 1398000 ROUNDS UP
        assert_eq!(snap_to_valid_frequency(1_299_000, CpuClass::Little), 1_398_000);
        assert_eq!(snap_to_valid_frequency(1, CpuClass::Big), 500_000);
        assert_eq!(snap_to_valid_frequency(5_000_000, CpuClass::Little), 1_800_000);
    }

    #[test]
    fn neighbors_bracket_and_clamp() {
        assert_eq!(get_frequency_neighbors(1_100_000.0, CpuClass::Big), (1_000_000, 1_200_000));
        assert_eq!(get_frequency_neighbors(1_200_000.0, CpuClass::Big), (1_000_000, 1_398_000));
        assert_eq!(get_frequency_neighbors(3_000_000.0, CpuClass::Big), (2_208_000, 2_208_000));
        assert_eq!(get_frequency_neighbors(1_800_000.0, CpuClass::Little), (1_800_000, 1_800_000));
        assert_eq!(get_frequency_neighbors(100.0, CpuClass::Little), (500_000, 500_000));
    }
}
