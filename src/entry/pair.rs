use std::fmt;

use super::scalar::{check_finite, parse_float, quantize, DEFAULT_PRECISION};
use super::EntryState;
use crate::error::UstError;

/// Start point of a mode-2 pitch-bend curve: a time offset (ms) and a
/// height (tenths of a semitone).
///
/// Text is `time;height`, `time,height` or just `time`, in which case the
/// height is 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchBendStart {
    time: f64,
    height: f64,
    state: EntryState,
}

impl PitchBendStart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, time: f64, height: f64) -> Result<(), UstError> {
        self.store(time, height)?;
        self.state.loaded();
        Ok(())
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let (time, height) = Self::parse(text)?;
        self.init(time, height)
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let (time, height) = Self::parse(text)?;
        self.store(time, height)?;
        self.state.updated();
        Ok(())
    }

    pub fn set_time(&mut self, time: f64) -> Result<(), UstError> {
        self.store(time, self.height)?;
        self.state.updated();
        Ok(())
    }

    pub fn set_height(&mut self, height: f64) -> Result<(), UstError> {
        self.store(self.time, height)?;
        self.state.updated();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
        self.height = 0.0;
        self.state.cleared();
    }

    fn store(&mut self, time: f64, height: f64) -> Result<(), UstError> {
        let time = quantize(check_finite(time)?, DEFAULT_PRECISION);
        let height = quantize(check_finite(height)?, DEFAULT_PRECISION);
        self.time = time;
        self.height = height;
        Ok(())
    }

    fn parse(text: &str) -> Result<(f64, f64), UstError> {
        let normalized = text.replace(',', ";");
        let parts: Vec<&str> = normalized.split(';').collect();
        match parts.as_slice() {
            [time] => Ok((parse_float(time)?, 0.0)),
            [time, height] => Ok((parse_float(time)?, parse_float(height)?)),
            _ => Err(UstError::format(format!("{} is not time;height", text))),
        }
    }
}

impl fmt::Display for PitchBendStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.height == 0.0 {
            write!(f, "{:.*}", DEFAULT_PRECISION, self.time)
        } else {
            write!(
                f,
                "{:.*};{:.*}",
                DEFAULT_PRECISION, self.time, DEFAULT_PRECISION, self.height
            )
        }
    }
}
