// PIPEGOV MEASUREMENT GRID
// EMPIRICAL (FPS, LATENCY) AT EVERY (BIG, LITTLE) FREQUENCY PAIR, MEASURED
// AT THE ROOT PARTITION (4, 6, G-B-L). USED ONCE, BEFORE THE CONTROL LOOP,
// TO PICK A GOOD STARTING FREQUENCY PAIR.
//
// CONSTRUCTION IS THE ONLY "LOAD" STEP: A GRID VALUE ALWAYS HAS ITS
// NORMALIZATION BOUNDS, SO THERE IS NO LOAD-BEFORE-USE STATE TO CHECK.

use crate::error::GridError;
use crate::freq::{BIG_FREQUENCY_TABLE, LITTLE_FREQUENCY_TABLE};
use crate::tuning::EPSILON;

const BIG_N: usize = BIG_FREQUENCY_TABLE.len();
const LITTLE_N: usize = LITTLE_FREQUENCY_TABLE.len();

// ROWS: BIG FREQUENCY INDEX. COLUMNS: LITTLE FREQUENCY INDEX.
const FPS_LUT: [[f64; LITTLE_N]; BIG_N] = [
    [3.346040, 4.377780, 4.232640, 4.188820, 4.164900, 4.196390, 4.166370, 4.184710, 4.185660],
    [6.569120, 6.577360, 6.575900, 6.575030, 6.582240, 6.579170, 6.574160, 6.576520, 6.570770],
    [9.877850, 9.931090, 9.963640, 9.928120, 9.766520, 9.966470, 9.956640, 9.933330, 9.764850],
    [9.938270, 11.743700, 11.755700, 11.762500, 11.772200, 11.766100, 11.571500, 11.776600, 11.771600],
    [9.861600, 12.761500, 13.409400, 13.448400, 13.471400, 13.465500, 13.474800, 13.495300, 13.230400],
    [9.783870, 12.748500, 14.389800, 14.358400, 14.379900, 14.384800, 14.369200, 14.383900, 14.360500],
    [9.737340, 12.719600, 14.874200, 14.869000, 14.875300, 14.874200, 14.879500, 14.899700, 14.911800],
    [9.812670, 12.559400, 15.526300, 15.591400, 15.598100, 15.609200, 15.804800, 15.560600, 15.654300],
    [9.776630, 12.600500, 16.281500, 16.207100, 16.253500, 16.310500, 16.250000, 16.313600, 16.280000],
    [9.789500, 12.658100, 16.992300, 17.015500, 17.040700, 16.994200, 16.981700, 16.995000, 17.030200],
    [9.714770, 12.694000, 16.849700, 17.660300, 17.640500, 17.657800, 17.713800, 17.665300, 17.661800],
    [9.785530, 12.613700, 16.769600, 18.169300, 18.154200, 18.102600, 18.195500, 18.174000, 18.246400],
    [9.619060, 12.620400, 17.003200, 18.552900, 18.821400, 18.744800, 18.802800, 18.734700, 18.857800],
];

const LATENCY_LUT: [[f64; LITTLE_N]; BIG_N] = [
    [651.768, 510.188, 525.308, 530.112, 532.572, 528.319, 531.156, 529.349, 529.002],
    [355.303, 354.730, 355.089, 355.080, 353.552, 354.020, 352.801, 353.841, 354.739],
    [250.991, 247.759, 246.918, 246.894, 250.285, 246.503, 245.870, 246.674, 250.765],
    [234.940, 216.349, 215.716, 212.617, 212.502, 211.894, 214.453, 212.208, 214.084],
    [228.154, 198.901, 191.970, 190.714, 190.310, 190.088, 190.168, 189.635, 192.677],
    [222.743, 194.187, 182.428, 182.818, 180.735, 180.848, 180.997, 180.607, 181.011],
    [221.628, 192.198, 176.529, 176.542, 176.410, 176.402, 176.320, 175.850, 175.317],
    [218.008, 190.353, 171.368, 170.386, 169.927, 170.118, 168.280, 170.506, 168.967],
    [214.374, 187.621, 165.345, 165.826, 165.090, 164.170, 164.868, 164.178, 164.775],
    [212.481, 183.785, 160.459, 159.896, 159.471, 159.666, 159.882, 159.626, 159.237],
    [211.987, 182.962, 159.399, 156.075, 156.037, 155.831, 155.094, 155.601, 155.644],
    [210.192, 179.552, 157.880, 152.843, 153.066, 153.402, 152.695, 152.450, 151.823],
    [211.836, 178.035, 155.403, 150.661, 149.117, 149.765, 149.291, 149.708, 149.143],
];

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GridPoint {
    pub fps: f64,
    pub latency: f64,
}

// RESULT OF A TARGET-SPACE APPROXIMATION
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Approximation {
    pub big_frequency: u32,
    pub little_frequency: u32,
    pub error: f64,
    pub point: GridPoint,
}

#[derive(Clone, Debug)]
pub struct MeasurementGrid {
    big_axis: Vec<u32>,
    little_axis: Vec<u32>,
    points: Vec<GridPoint>, // ROW-MAJOR BY BIG INDEX
    fps_range: (f64, f64),
    latency_range: (f64, f64),
}

impl MeasurementGrid {
    // THE BOARD SWEEP BAKED INTO THE BINARY
    pub fn embedded() -> Self {
        let points: Vec<GridPoint> = FPS_LUT.iter().zip(LATENCY_LUT.iter())
            .flat_map(|(f_row, l_row)| {
                f_row.iter().zip(l_row.iter())
                    .map(|(&fps, &latency)| GridPoint { fps, latency })
            })
            .collect();
        let (fps_range, latency_range) = bounds(&points);
        Self {
            big_axis: BIG_FREQUENCY_TABLE.to_vec(),
            little_axis: LITTLE_FREQUENCY_TABLE.to_vec(),
            points,
            fps_range,
            latency_range,
        }
    }

    pub fn new(
        big_axis: Vec<u32>,
        little_axis: Vec<u32>,
        points: Vec<GridPoint>,
    ) -> Result<Self, GridError> {
        if big_axis.is_empty() || little_axis.is_empty() || points.is_empty() {
            return Err(GridError::Empty);
        }
        if big_axis.len() * little_axis.len() != points.len() {
            return Err(GridError::ShapeMismatch {
                big: big_axis.len(),
                little: little_axis.len(),
                cells: points.len(),
            });
        }
        if let Some(i) = points.iter().position(|p| !p.fps.is_finite() || !p.latency.is_finite()) {
            return Err(GridError::NonFinite {
                big_idx: i / little_axis.len(),
                little_idx: i % little_axis.len(),
            });
        }
        let (fps_range, latency_range) = bounds(&points);
        Ok(Self { big_axis, little_axis, points, fps_range, latency_range })
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.big_axis.len(), self.little_axis.len())
    }

    pub fn point(&self, big_idx: usize, little_idx: usize) -> Option<GridPoint> {
        if big_idx >= self.big_axis.len() || little_idx >= self.little_axis.len() {
            return None;
        }
        self.points.get(big_idx * self.little_axis.len() + little_idx).copied()
    }

    pub fn fps_range(&self) -> (f64, f64) {
        self.fps_range
    }

    pub fn latency_range(&self) -> (f64, f64) {
        self.latency_range
    }

    // ONE-SIDED SQUARED ERROR SCAN. OVERSHOOTING A TARGET IN THE GOOD
    // DIRECTION (MORE FPS, LESS LATENCY) COSTS NOTHING. FIRST MINIMUM WINS.
    // NONE FOR NaN TARGETS: THE CALLER MUST NOT SEED FROM THEM.
    pub fn approximate(&self, target_fps: f64, target_latency: f64) -> Option<Approximation> {
        if target_fps.is_nan() || target_latency.is_nan() {
            return None;
        }
        let t_fps = normalize(target_fps, self.fps_range).clamp(0.0, 1.0);
        let t_lat = normalize(target_latency, self.latency_range).clamp(0.0, 1.0);

        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let fps_err = (t_fps - normalize(p.fps, self.fps_range)).max(0.0);
            let lat_err = (normalize(p.latency, self.latency_range) - t_lat).max(0.0);
            let err = fps_err * fps_err + lat_err * lat_err;
            if best.map_or(err.is_finite(), |(_, e)| err < e) {
                best = Some((i, err));
            }
        }

        let (i, error) = best?;
        let cols = self.little_axis.len();
        Some(Approximation {
            big_frequency: self.big_axis[i / cols],
            little_frequency: self.little_axis[i % cols],
            error,
            point: self.points[i],
        })
    }
}

fn bounds(points: &[GridPoint]) -> ((f64, f64), (f64, f64)) {
    let mut fps = (f64::INFINITY, f64::NEG_INFINITY);
    let mut lat = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        fps = (fps.0.min(p.fps), fps.1.max(p.fps));
        lat = (lat.0.min(p.latency), lat.1.max(p.latency));
    }
    (fps, lat)
}

// A DEGENERATE RANGE (SINGLE CELL, FLAT METRIC) NORMALIZES EVERYTHING TO 0
fn normalize(v: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if span.abs() <= EPSILON {
        return 0.0;
    }
    (v - min) / span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_bounds() {
        let g = MeasurementGrid::embedded();
        assert_eq!(g.dims(), (13, 9));
        assert_eq!(g.fps_range(), (3.346040, 18.857800));
        assert_eq!(g.latency_range(), (149.117, 651.768));
        assert_eq!(g.point(0, 0), Some(GridPoint { fps: 3.346040, latency: 651.768 }));
        assert_eq!(g.point(13, 0), None);
    }

    #[test]
    fn easy_targets_pick_first_zero_error_cell() {
        // EVERY CELL MEETS fps>=0 AND latency<=1000 -> ERROR 0 EVERYWHERE
        let g = MeasurementGrid::embedded();
        let a = g.approximate(0.0, 1000.0).unwrap();
        assert_eq!((a.big_frequency, a.little_frequency), (500_000, 500_000));
        assert_eq!(a.error, 0.0);
    }

    #[test]
    fn demanding_targets_pick_fastest_cell() {
        let g = MeasurementGrid::embedded();
        let a = g.approximate(100.0, 1.0).unwrap();
        // BEST OF fps=18.8578 / latency=149.143 AT (2208000, 1800000)
        // VS latency=149.117 AT (2208000, 1398000): FPS SHORTFALL DOMINATES
        assert_eq!(a.big_frequency, 2_208_000);
        assert!(a.point.fps >= 18.8);
    }

    #[test]
    fn moderate_target_meets_both() {
        let g = MeasurementGrid::embedded();
        let a = g.approximate(12.0, 250.0).unwrap();
        assert!(a.point.fps >= 12.0);
        assert!(a.point.latency <= 250.0);
        assert_eq!(a.error, 0.0);
    }

    #[test]
    fn new_rejects_bad_shapes() {
        assert_eq!(MeasurementGrid::new(vec![], vec![1], vec![]).unwrap_err(), GridError::Empty);
        let p = GridPoint { fps: 1.0, latency: 1.0 };
        assert!(matches!(
            MeasurementGrid::new(vec![1, 2], vec![1], vec![p]),
            Err(GridError::ShapeMismatch { .. })
        ));
        let nan = GridPoint { fps: f64::NAN, latency: 1.0 };
        assert!(matches!(
            MeasurementGrid::new(vec![1], vec![1], vec![nan]),
            Err(GridError::NonFinite { big_idx: 0, little_idx: 0 })
        ));
    }

    #[test]
    fn single_cell_grid_is_degenerate_but_safe() {
        let g = MeasurementGrid::new(
            vec![1_200_000],
            vec![1_000_000],
            vec![GridPoint { fps: 10.0, latency: 200.0 }],
        ).unwrap();
        let a = g.approximate(500.0, 0.5).unwrap();
        assert_eq!((a.big_frequency, a.little_frequency), (1_200_000, 1_000_000));
        assert_eq!(a.error, 0.0);
    }

    #[test]
    fn nan_target_yields_none() {
        let g = MeasurementGrid::embedded();
        assert!(g.approximate(f64::NAN, 200.0).is_none());
    }
}
