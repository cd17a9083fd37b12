// PIPEGOV MEASUREMENTS
// ONE ITERATION OF FEEDBACK FROM THE PIPELINE, AND THE PARSER THAT EXTRACTS
// IT FROM THE RUNTIME'S HUMAN-READABLE RUN LOG.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;

// STAGE TIMES ARE COMPUTE TIME PER STAGE. THEIR SUM NEED NOT MATCH latency,
// WHICH IS PIPELINE-LEVEL DELAY INCLUDING HAND-OFFS.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Measurement {
    pub fps: f64,
    pub latency: f64,
    pub stage_times: [f64; 3],
}

impl Measurement {
    pub fn new(fps: f64, latency: f64, stage_times: [f64; 3]) -> Self {
        Self { fps, latency, stage_times }
    }

    pub fn total_stage_time(&self) -> f64 {
        self.stage_times.iter().sum()
    }

    pub fn meets(&self, target_fps: f64, target_latency: f64) -> bool {
        self.fps >= target_fps && self.latency <= target_latency
    }
}

struct LogPatterns {
    fps: Regex,
    latency: Regex,
    stages: [Regex; 3],
}

fn compile() -> Result<LogPatterns, regex::Error> {
    let num = r"([-+]?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?)";
    let re = |p: String| Regex::new(&p);
    Ok(LogPatterns {
        fps: re(format!(r"Frame rate is:\s*{num}"))?,
        latency: re(format!(r"Frame latency is:\s*{num}"))?,
        stages: [
            re(format!(r"stage1_inference_time:\s*{num}"))?,
            re(format!(r"stage2_inference_time:\s*{num}"))?,
            re(format!(r"stage3_inference_time:\s*{num}"))?,
        ],
    })
}

fn patterns() -> Result<&'static LogPatterns, ParseError> {
    static PATTERNS: OnceLock<Result<LogPatterns, regex::Error>> = OnceLock::new();
    PATTERNS.get_or_init(compile).as_ref().map_err(|e| ParseError::Pattern(e.clone()))
}

fn capture(re: &Regex, text: &str, field: &'static str) -> Result<Option<f64>, ParseError> {
    // LAST OCCURRENCE WINS (THE RUNTIME MAY PRINT WARM-UP FIGURES FIRST)
    let Some(raw) = re.captures_iter(text).last().and_then(|c| c.get(1)) else {
        return Ok(None);
    };
    raw.as_str()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseError::BadNumber { field, raw: raw.as_str().to_string() })
}

// FPS AND LATENCY ARE REQUIRED. A MISSING STAGE TIME READS AS 0.0, WHICH THE
// BOTTLENECK DETECTOR TREATS AS "NO DATA".
pub fn parse_run_log(text: &str) -> Result<Measurement, ParseError> {
    let p = patterns()?;
    let fps = capture(&p.fps, text, "Frame rate is:")?
        .ok_or(ParseError::MissingField("Frame rate is:"))?;
    let latency = capture(&p.latency, text, "Frame latency is:")?
        .ok_or(ParseError::MissingField("Frame latency is:"))?;

    const STAGE_FIELDS: [&str; 3] = [
        "stage1_inference_time:",
        "stage2_inference_time:",
        "stage3_inference_time:",
    ];
    let mut stage_times = [0.0; 3];
    for (i, re) in p.stages.iter().enumerate() {
        stage_times[i] = capture(re, text, STAGE_FIELDS[i])?.unwrap_or(0.0);
    }

    Ok(Measurement { fps, latency, stage_times })
}
