// PIPEGOV EVENT LOG
// ONE SNAPSHOT PER GOVERNOR ITERATION: WHAT WAS MEASURED, WHAT WAS CHOSEN.
// PRE-ALLOCATED RING BUFFER. NO HEAP ALLOCATION WHILE THE SESSION RUNS.
// WRAPS AROUND AT CAPACITY -- OLDEST ENTRIES OVERWRITTEN.

use crate::config::PipelineConfig;
use crate::governor::StepOutcome;
use crate::measure::Measurement;

pub const MAX_SNAPSHOTS: usize = 8192;

#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub ts_ns:     u64,
    pub iteration: u32,
    pub fps:       f64,
    pub latency:   f64,
    pub power:     f64,
    pub pp1:       u32,
    pub pp2:       u32,
    pub big_khz:   u32,
    pub little_khz: u32,
    pub outcome:   StepOutcome,
}

const EMPTY: Snapshot = Snapshot {
    ts_ns: 0, iteration: 0, fps: 0.0, latency: 0.0, power: 0.0,
    pp1: 0, pp2: 0, big_khz: 0, little_khz: 0, outcome: StepOutcome::Continue,
};

pub struct EventLog {
    snapshots: Vec<Snapshot>,
    head:      usize,
    len:       usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            snapshots: vec![EMPTY; MAX_SNAPSHOTS],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // RECORD ONE ITERATION. m IS WHAT THE PIPELINE REPORTED FOR THE CONFIG
    // THAT WAS RUN; config IS WHAT THE GOVERNOR ASKED FOR NEXT.
    pub fn snapshot(
        &mut self,
        iteration: u32,
        m: &Measurement,
        config: &PipelineConfig,
        power: f64,
        outcome: StepOutcome,
    ) {
        self.snapshots[self.head] = Snapshot {
            ts_ns: now_ns(),
            iteration,
            fps: m.fps,
            latency: m.latency,
            power,
            pp1: config.partition_point1,
            pp2: config.partition_point2,
            big_khz: config.big_frequency,
            little_khz: config.little_frequency,
            outcome,
        };
        self.head = (self.head + 1) % MAX_SNAPSHOTS;
        if self.len < MAX_SNAPSHOTS {
            self.len += 1;
        }
    }

    // ITERATE SNAPSHOTS IN CHRONOLOGICAL ORDER
    pub fn iter_chronological(&self) -> impl Iterator<Item = &Snapshot> {
        let start = if self.len < MAX_SNAPSHOTS { 0 } else { self.head };
        (0..self.len).map(move |i| {
            &self.snapshots[(start + i) % MAX_SNAPSHOTS]
        })
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.iter_chronological().last()
    }

    // DUMP THE ITERATION SERIES AFTER THE SESSION
    pub fn dump(&self) {
        let mut iter = self.iter_chronological();
        let Some(first) = iter.next() else {
            return;
        };
        let base_ts = first.ts_ns;

        println!("\n{:<8} {:<6} {:<9} {:<10} {:<8} {:<4} {:<4} {:<9} {:<9} {:<14}",
            "TIME_S", "ITER", "FPS", "LAT_MS", "POWER_W", "PP1", "PP2", "BIG_KHZ", "LIT_KHZ", "OUTCOME");
        println!("{}", "-".repeat(88));

        for s in std::iter::once(first).chain(iter) {
            let elapsed_s = (s.ts_ns - base_ts) as f64 / 1_000_000_000.0;
            println!("{:<8.1} {:<6} {:<9.3} {:<10.2} {:<8.3} {:<4} {:<4} {:<9} {:<9} {:<14}",
                elapsed_s, s.iteration, s.fps, s.latency, s.power,
                s.pp1, s.pp2, s.big_khz, s.little_khz, s.outcome.label());
        }

        if self.len == MAX_SNAPSHOTS {
            println!("\n(RING BUFFER WRAPPED -- SHOWING MOST RECENT {} SNAPSHOTS)", MAX_SNAPSHOTS);
        }
        println!("TOTAL SNAPSHOTS: {}", self.len);
    }

    // SUMMARY STATISTICS
    pub fn summary(&self) {
        if self.len < 2 {
            return;
        }

        let snapshots: Vec<&Snapshot> = self.iter_chronological().collect();
        let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
            return;
        };

        let n = snapshots.len() as f64;
        let avg_fps = snapshots.iter().map(|s| s.fps).sum::<f64>() / n;
        let avg_lat = snapshots.iter().map(|s| s.latency).sum::<f64>() / n;
        let peak_fps = snapshots.iter().map(|s| s.fps).fold(f64::MIN, f64::max);
        let min_power = snapshots.iter().map(|s| s.power).fold(f64::MAX, f64::min);
        let partition_moves = snapshots.windows(2)
            .filter(|w| w[0].pp1 != w[1].pp1 || w[0].pp2 != w[1].pp2)
            .count();

        let elapsed_s = (last.ts_ns - first.ts_ns) as f64 / 1_000_000_000.0;

        println!("\n{}", "=".repeat(50));
        println!("PIPEGOV SUMMARY");
        println!("{}", "=".repeat(50));
        println!("  ITERATIONS:        {}", self.len);
        println!("  AVG FPS:           {:.3}", avg_fps);
        println!("  PEAK FPS:          {:.3}", peak_fps);
        println!("  AVG LATENCY:       {:.2}ms", avg_lat);
        println!("  MIN EST. POWER:    {:.3}W", min_power);
        println!("  FINAL EST. POWER:  {:.3}W", last.power);
        println!("  PARTITION MOVES:   {}", partition_moves);
        println!("  FINAL OUTCOME:     {}", last.outcome.label());
        println!("  ELAPSED:           {:.1}s", elapsed_s);
    }
}

fn now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(log: &mut EventLog, iteration: u32) {
        let m = Measurement::new(10.0 + iteration as f64, 180.0, [0.0; 3]);
        log.snapshot(iteration, &m, &PipelineConfig::ROOT, 4.0, StepOutcome::Continue);
    }

    #[test]
    fn snapshot_records() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        let m = Measurement::new(12.5, 190.0, [1.0, 2.0, 3.0]);
        log.snapshot(1, &m, &PipelineConfig::ROOT, 4.25, StepOutcome::Converged);
        assert_eq!(log.len(), 1);
        let s = log.snapshots[0];
        assert_eq!(s.iteration, 1);
        assert_eq!(s.fps, 12.5);
        assert_eq!(s.latency, 190.0);
        assert_eq!(s.power, 4.25);
        assert_eq!((s.pp1, s.pp2), (4, 6));
        assert_eq!((s.big_khz, s.little_khz), (1_800_000, 1_200_000));
        assert_eq!(s.outcome, StepOutcome::Converged);
        assert!(s.ts_ns > 0);
    }

    #[test]
    fn ring_buffer_wraps() {
        let mut log = EventLog::new();

        // FILL TO CAPACITY
        for i in 0..MAX_SNAPSHOTS {
            record(&mut log, i as u32);
        }
        assert_eq!(log.len(), MAX_SNAPSHOTS);
        assert_eq!(log.head, 0); // WRAPPED BACK TO START

        // WRITE ONE MORE -- OVERWRITES OLDEST
        record(&mut log, 9999);
        assert_eq!(log.len(), MAX_SNAPSHOTS);
        assert_eq!(log.head, 1);
        assert_eq!(log.snapshots[0].iteration, 9999);

        // CHRONOLOGICAL ITERATION STARTS FROM OLDEST (INDEX 1)
        let ordered: Vec<u32> = log.iter_chronological()
            .map(|s| s.iteration)
            .collect();
        assert_eq!(ordered[0], 1); // OLDEST SURVIVING ENTRY
        assert_eq!(*ordered.last().unwrap(), 9999); // NEWEST
        assert_eq!(ordered.len(), MAX_SNAPSHOTS);
        assert_eq!(log.last().unwrap().iteration, 9999);
    }

    #[test]
    fn summary_no_panic_empty() {
        let log = EventLog::new();
        log.summary(); // SHOULD NOT PANIC WITH 0 SNAPSHOTS
        log.dump();
    }

    #[test]
    fn summary_no_panic_one() {
        let mut log = EventLog::new();
        record(&mut log, 1);
        log.summary(); // SHOULD NOT PANIC WITH 1 SNAPSHOT
    }

    #[test]
    fn dump_and_summary_no_panic() {
        let mut log = EventLog::new();
        record(&mut log, 1);
        record(&mut log, 2);
        log.dump();
        log.summary();
    }
}
