//! Scalar entries: boolean, integer, floating-point, string and flag strings.

use std::fmt;

use super::EntryState;
use crate::error::UstError;

/// Decimal places used by float entries unless told otherwise.
pub const DEFAULT_PRECISION: usize = 3;

/// Decimal places used by tempo entries.
pub const TEMPO_PRECISION: usize = 2;

/// Tempo returned by an unset tempo entry.
pub const DEFAULT_TEMPO: f64 = 120.0;

pub(crate) fn parse_int(text: &str) -> Result<i32, UstError> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| UstError::format(format!("{} is not int", text)))
}

pub(crate) fn parse_float(text: &str) -> Result<f64, UstError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(UstError::format(format!("{} is not float", text))),
    }
}

pub(crate) fn check_finite(value: f64) -> Result<f64, UstError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(UstError::format(format!("{} is not float", value)))
    }
}

/// Round `value` to `precision` decimal places.
///
/// A quantized value prints at `precision` and parses back to the same `f64`.
pub(crate) fn quantize(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let q = (value * scale).round() / scale;
    // -0.0 would print as "-0.000"
    if q == 0.0 {
        0.0
    } else {
        q
    }
}

/// Round up to `precision` decimal places.
pub(crate) fn quantize_up(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let q = (value * scale).ceil() / scale;
    if q == 0.0 {
        0.0
    } else {
        q
    }
}

pub(crate) fn parse_bool(text: &str) -> Result<bool, UstError> {
    match text.trim() {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        _ => Err(UstError::format(format!("{} is not bool", text))),
    }
}

/// Boolean entry, formatted as `True`/`False`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolEntry {
    value: bool,
    state: EntryState,
}

impl BoolEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> bool {
        self.state.has_value && self.value
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, value: bool) {
        self.value = value;
        self.state.loaded();
    }

    pub fn set(&mut self, value: bool) {
        self.value = value;
        self.state.updated();
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_bool(text)?;
        self.init(value);
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_bool(text)?;
        self.set(value);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.value = false;
        self.state.cleared();
    }
}

impl fmt::Display for BoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.value() { "True" } else { "False" })
    }
}

/// Integer entry with an optional default reported while unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntEntry {
    value: i32,
    default: i32,
    state: EntryState,
}

impl IntEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(default: i32) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    pub fn value(&self) -> i32 {
        if self.state.has_value {
            self.value
        } else {
            self.default
        }
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, value: i32) {
        self.value = value;
        self.state.loaded();
    }

    pub fn set(&mut self, value: i32) {
        self.value = value;
        self.state.updated();
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_int(text)?;
        self.init(value);
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_int(text)?;
        self.set(value);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.state.cleared();
    }
}

impl fmt::Display for IntEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Floating-point entry with a fixed output precision.
///
/// Values are stored already rounded to `precision` decimals, so the
/// formatted text always parses back to the identical value.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatEntry {
    value: f64,
    default: f64,
    precision: usize,
    state: EntryState,
}

impl Default for FloatEntry {
    fn default() -> Self {
        Self {
            value: 0.0,
            default: 0.0,
            precision: DEFAULT_PRECISION,
            state: EntryState::default(),
        }
    }
}

impl FloatEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(precision: usize) -> Self {
        Self {
            precision,
            ..Self::default()
        }
    }

    /// Tempo entry: two decimals, reads as 120 while unset.
    pub fn tempo() -> Self {
        Self {
            default: DEFAULT_TEMPO,
            precision: TEMPO_PRECISION,
            ..Self::default()
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn value(&self) -> f64 {
        if self.state.has_value {
            self.value
        } else {
            self.default
        }
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, value: f64) -> Result<(), UstError> {
        self.value = quantize(check_finite(value)?, self.precision);
        self.state.loaded();
        Ok(())
    }

    pub fn set(&mut self, value: f64) -> Result<(), UstError> {
        self.value = quantize(check_finite(value)?, self.precision);
        self.state.updated();
        Ok(())
    }

    /// Store `value` rounded up at the entry's precision.
    pub(crate) fn set_rounding_up(&mut self, value: f64) -> Result<(), UstError> {
        self.value = quantize_up(check_finite(value)?, self.precision);
        self.state.updated();
        Ok(())
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_float(text)?;
        self.init(value)
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = parse_float(text)?;
        self.set(value)
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.state.cleared();
    }
}

impl fmt::Display for FloatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.precision, self.value())
    }
}

/// Plain string entry; any text is valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringEntry {
    value: String,
    state: EntryState,
}

impl StringEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.state.loaded();
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.state.updated();
    }

    pub fn reset(&mut self) {
        self.value.clear();
        self.state.cleared();
    }
}

impl fmt::Display for StringEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Resampler flag string. Holds a value exactly when the string is non-empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlagsEntry {
    value: String,
    is_updated: bool,
}

impl FlagsEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    pub fn is_updated(&self) -> bool {
        self.is_updated
    }

    pub fn init(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.is_updated = true;
    }

    pub fn reset(&mut self) {
        self.value.clear();
        self.is_updated = true;
    }
}

impl fmt::Display for FlagsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_init_does_not_mark_updated() {
        let mut e = IntEntry::new();
        assert!(!e.has_value());
        e.init_from_str("1").unwrap();
        assert_eq!(e.value(), 1);
        assert!(e.has_value());
        assert!(!e.is_updated());
        e.set(3);
        assert_eq!(e.to_string(), "3");
        assert!(e.is_updated());
    }

    #[test]
    fn test_int_rejects_non_numeric() {
        let mut e = IntEntry::new();
        let err = e.init_from_str("a").unwrap_err();
        assert_eq!(err.to_string(), "Format error at line 0: a is not int");
        assert!(!e.has_value());
        assert!(!e.is_updated());

        assert!(e.init_from_str("1.5").is_err());
    }

    #[test]
    fn test_int_default_while_unset() {
        let e = IntEntry::with_default(480);
        assert_eq!(e.value(), 480);
        assert!(!e.has_value());
    }

    #[test]
    fn test_float_formats_at_precision() {
        let mut e = FloatEntry::new();
        e.init_from_str("1").unwrap();
        assert_eq!(e.to_string(), "1.000");
        e.set(3.0).unwrap();
        assert_eq!(e.to_string(), "3.000");
        assert!(e.is_updated());
    }

    #[test]
    fn test_float_quantized_value_reparses_identically() {
        let mut e = FloatEntry::new();
        e.init_from_str("1.23456").unwrap();
        assert_eq!(e.value(), 1.235);

        let mut again = FloatEntry::new();
        again.init_from_str(&e.to_string()).unwrap();
        assert_eq!(again.value(), e.value());
    }

    #[test]
    fn test_float_rejects_bad_text_and_non_finite() {
        let mut e = FloatEntry::new();
        assert!(e.init_from_str("a").is_err());
        assert!(e.init_from_str("nan").is_err());
        assert!(e.set(f64::INFINITY).is_err());
        assert!(!e.has_value());
    }

    #[test]
    fn test_tempo_default_is_displayed_but_unset() {
        let mut e = FloatEntry::tempo();
        assert_eq!(e.value(), 120.0);
        assert!(!e.has_value());
        assert_eq!(e.to_string(), "120.00");
        e.init_from_str("150.00").unwrap();
        assert!(e.has_value());
        assert_eq!(e.to_string(), "150.00");
    }

    #[test]
    fn test_bool_parse_and_format() {
        let mut e = BoolEntry::new();
        e.init_from_str("True").unwrap();
        assert!(e.value());
        assert_eq!(e.to_string(), "True");
        e.set(false);
        assert_eq!(e.to_string(), "False");
        assert!(e.set_from_str("maybe").is_err());
        assert!(!e.value());
    }

    #[test]
    fn test_flags_has_value_only_when_non_empty() {
        let mut e = FlagsEntry::new();
        assert!(!e.has_value());
        e.init("");
        assert!(!e.has_value());
        e.init("B50");
        assert!(e.has_value());
        assert!(!e.is_updated());
        e.set("");
        assert!(!e.has_value());
        assert!(e.is_updated());
    }

    #[test]
    fn test_string_reset() {
        let mut e = StringEntry::new();
        e.init("test");
        assert_eq!(e.value(), "test");
        e.reset();
        assert!(!e.has_value());
        assert_eq!(e.value(), "");
    }
}
