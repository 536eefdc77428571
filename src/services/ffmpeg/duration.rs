use once_cell::sync::Lazy;
use regex::Regex;

/// Trimmed from the probed duration so the transform never asks for more
/// output than the source holds.
pub const DURATION_SAFETY_MARGIN_SECS: f64 = 0.5;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration: (\d+):(\d+):(\d+\.\d+)").expect("duration pattern is valid")
});

/// Parsed `Duration: H:MM:SS.ss` token from ffmpeg's diagnostic output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbedDuration {
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl ProbedDuration {
    /// Total seconds minus the safety margin
    pub fn bounded_secs(&self) -> f64 {
        self.hours * 3600.0 + self.minutes * 60.0 + self.seconds - DURATION_SAFETY_MARGIN_SECS
    }
}

/// Find the first duration token in `stderr`.
pub fn parse_duration(stderr: &str) -> Option<ProbedDuration> {
    let caps = DURATION_RE.captures(stderr)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());

    Some(ProbedDuration {
        hours: field(1)?,
        minutes: field(2)?,
        seconds: field(3)?,
    })
}
