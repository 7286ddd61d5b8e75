use super::RationalTime;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimecodeError {
    #[error("Invalid timecode format: '{timecode}' ({reason})")]
    Malformed { timecode: String, reason: &'static str },
    #[error("Invalid frame rate: {0}")]
    InvalidRate(f64),
}

/// A parsed timecode, independent of any frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timecode {
    seconds: f64,
}

impl Timecode {
    /// Parse exactly three `:`-separated non-negative decimal fields.
    pub fn parse(text: &str) -> Result<Self, TimecodeError> {
        let fields: Vec<&str> = text.split(':').collect();
        if fields.len() != 3 {
            return Err(malformed(text, "expected three fields, HH:MM:SS"));
        }

        let hours = parse_field(text, fields[0])?;
        let minutes = parse_field(text, fields[1])?;
        let seconds = parse_field(text, fields[2])?;

        Ok(Self {
            seconds: hours * 3600.0 + minutes * 60.0 + seconds,
        })
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Truncates (`floor(seconds * rate)`), never rounds.
    pub fn to_frames(&self, rate: f64) -> Result<i64, TimecodeError> {
        check_rate(rate)?;
        Ok((self.seconds * rate).floor() as i64)
    }

    pub fn to_rational(&self, rate: f64) -> Result<RationalTime, TimecodeError> {
        Ok(RationalTime::from_frames(self.to_frames(rate)?, rate))
    }
}

/// Convert a timecode string to a whole-frame `RationalTime` at `rate`.
pub fn parse(timecode: &str, rate: f64) -> Result<RationalTime, TimecodeError> {
    Timecode::parse(timecode)?.to_rational(rate)
}

/// Render the timecode at the centre of frame `frames`.
///
/// Pointing at the centre keeps `parse(format_frames(n, r), r)` on frame `n`
/// despite the nine-digit fraction and truncating conversion.
pub fn format_frames(frames: u64, rate: f64) -> Result<String, TimecodeError> {
    check_rate(rate)?;
    let total = (frames as f64 + 0.5) / rate;
    // Clamped so float error at an hour or minute boundary never yields a
    // negative field.
    let hours = (total / 3600.0).floor().max(0.0);
    let minutes = ((total - hours * 3600.0) / 60.0).floor().max(0.0);
    let seconds = (total - hours * 3600.0 - minutes * 60.0).max(0.0);
    Ok(format!(
        "{:02}:{:02}:{:012.9}",
        hours as u64, minutes as u64, seconds
    ))
}

fn check_rate(rate: f64) -> Result<(), TimecodeError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(TimecodeError::InvalidRate(rate))
    }
}

fn parse_field(timecode: &str, field: &str) -> Result<f64, TimecodeError> {
    let field = field.trim();
    if field.is_empty() {
        return Err(malformed(timecode, "empty field"));
    }
    // Digits and a decimal point only: no signs, exponents, inf or NaN.
    if !field.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(malformed(timecode, "non-numeric field"));
    }
    field
        .parse::<f64>()
        .map_err(|_| malformed(timecode, "non-numeric field"))
}

fn malformed(timecode: &str, reason: &'static str) -> TimecodeError {
    TimecodeError::Malformed {
        timecode: timecode.to_string(),
        reason,
    }
}
