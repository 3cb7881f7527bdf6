//! Fixed and variable arity tuple entries: vibrato and envelope.
//!
//! Both are comma-separated and project named fields onto positional slots.
//! Slots the text leaves out keep their documented defaults.

use std::fmt;

use super::scalar::{check_finite, parse_float, parse_int, quantize};
use super::EntryState;
use crate::error::UstError;

/// Decimal places for vibrato slots and envelope points.
pub const TUPLE_PRECISION: usize = 2;

/// Number of vibrato slots.
pub const VIBRATO_SLOTS: usize = 8;

pub const VIBRATO_LENGTH: usize = 0;
pub const VIBRATO_CYCLE: usize = 1;
pub const VIBRATO_DEPTH: usize = 2;
pub const VIBRATO_FADE_IN: usize = 3;
pub const VIBRATO_FADE_OUT: usize = 4;
pub const VIBRATO_PHASE: usize = 5;
pub const VIBRATO_HEIGHT: usize = 6;

/// Vibrato: length (% of note), cycle (ms), depth (cent), fade-in and
/// fade-out (% of vibrato), phase (% of a cycle), height (%) and a reserved
/// eighth slot. Seven or eight values may be supplied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VibratoEntry {
    slots: [f64; VIBRATO_SLOTS],
    state: EntryState,
}

impl VibratoEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> [f64; VIBRATO_SLOTS] {
        self.slots
    }

    pub fn length(&self) -> f64 {
        self.slots[VIBRATO_LENGTH]
    }

    pub fn cycle(&self) -> f64 {
        self.slots[VIBRATO_CYCLE]
    }

    pub fn depth(&self) -> f64 {
        self.slots[VIBRATO_DEPTH]
    }

    pub fn fade_in(&self) -> f64 {
        self.slots[VIBRATO_FADE_IN]
    }

    pub fn fade_out(&self) -> f64 {
        self.slots[VIBRATO_FADE_OUT]
    }

    pub fn phase(&self) -> f64 {
        self.slots[VIBRATO_PHASE]
    }

    pub fn height(&self) -> f64 {
        self.slots[VIBRATO_HEIGHT]
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        self.slots = Self::parse(text)?;
        self.state.loaded();
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        self.slots = Self::parse(text)?;
        self.state.updated();
        Ok(())
    }

    /// Overwrite one slot; see the `VIBRATO_*` offsets.
    pub fn set_slot(&mut self, index: usize, value: f64) -> Result<(), UstError> {
        if index >= VIBRATO_SLOTS {
            return Err(UstError::BoundsError {
                index,
                len: VIBRATO_SLOTS,
            });
        }
        self.slots[index] = quantize(check_finite(value)?, TUPLE_PRECISION);
        self.state.updated();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.slots = [0.0; VIBRATO_SLOTS];
        self.state.cleared();
    }

    fn parse(text: &str) -> Result<[f64; VIBRATO_SLOTS], UstError> {
        let tokens: Vec<&str> = text.split(',').collect();
        if tokens.len() != VIBRATO_SLOTS && tokens.len() != VIBRATO_SLOTS - 1 {
            return Err(UstError::format(format!("{} is not vibrato pattern", text)));
        }
        let mut slots = [0.0; VIBRATO_SLOTS];
        for (slot, token) in slots.iter_mut().zip(tokens) {
            *slot = quantize(parse_float(token)?, TUPLE_PRECISION);
        }
        Ok(slots)
    }
}

impl fmt::Display for VibratoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:.*}", TUPLE_PRECISION, slot)?;
        }
        Ok(())
    }
}

/// Canonical slot order: p1,p2,p3,v1,v2,v3,v4,%,p4,p5,v5.
#[derive(Debug, Clone, Copy)]
enum EnvelopeSlot {
    Point(usize),
    Volume(usize),
    Marker,
}

const ENVELOPE_LAYOUT: [EnvelopeSlot; 11] = [
    EnvelopeSlot::Point(0),
    EnvelopeSlot::Point(1),
    EnvelopeSlot::Point(2),
    EnvelopeSlot::Volume(0),
    EnvelopeSlot::Volume(1),
    EnvelopeSlot::Volume(2),
    EnvelopeSlot::Volume(3),
    EnvelopeSlot::Marker,
    EnvelopeSlot::Point(3),
    EnvelopeSlot::Point(4),
    EnvelopeSlot::Volume(4),
];

/// Supplied value counts the envelope accepts.
pub const ENVELOPE_ARITIES: [usize; 4] = [5, 7, 9, 11];

pub const DEFAULT_ENVELOPE_POINTS: [f64; 5] = [0.0, 5.0, 35.0, 0.0, 0.0];
pub const DEFAULT_ENVELOPE_VOLUMES: [i32; 5] = [0, 100, 100, 0, 100];

/// Volume envelope.
///
/// `p` slots are times in ms (p1 from the note head, p2 from p1, p3 back
/// from p4, p4 back from the note end, p5 from p2); `v` slots are volumes
/// in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeEntry {
    points: [f64; 5],
    volumes: [i32; 5],
    arity: usize,
    state: EntryState,
}

impl Default for EnvelopeEntry {
    fn default() -> Self {
        Self {
            points: DEFAULT_ENVELOPE_POINTS,
            volumes: DEFAULT_ENVELOPE_VOLUMES,
            arity: 7,
            state: EntryState::default(),
        }
    }
}

impl EnvelopeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values the current text form carries (5, 7, 9 or 11).
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn points(&self) -> [f64; 5] {
        self.points
    }

    pub fn volumes(&self) -> [i32; 5] {
        self.volumes
    }

    pub fn p(&self, index: usize) -> Result<f64, UstError> {
        self.points
            .get(index)
            .copied()
            .ok_or(UstError::BoundsError { index, len: 5 })
    }

    pub fn v(&self, index: usize) -> Result<i32, UstError> {
        self.volumes
            .get(index)
            .copied()
            .ok_or(UstError::BoundsError { index, len: 5 })
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let (points, volumes, arity) = Self::parse(text)?;
        self.points = points;
        self.volumes = volumes;
        self.arity = arity;
        self.state.loaded();
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let (points, volumes, arity) = Self::parse(text)?;
        self.points = points;
        self.volumes = volumes;
        self.arity = arity;
        self.state.updated();
        Ok(())
    }

    /// Overwrite a point supplied by the current text form.
    pub fn set_p(&mut self, index: usize, value: f64) -> Result<(), UstError> {
        let len = self.supplied_points();
        if index >= len {
            return Err(UstError::BoundsError { index, len });
        }
        self.points[index] = quantize(check_finite(value)?, TUPLE_PRECISION);
        self.state.updated();
        Ok(())
    }

    /// Overwrite a volume supplied by the current text form.
    pub fn set_v(&mut self, index: usize, value: i32) -> Result<(), UstError> {
        let len = self.supplied_volumes();
        if index >= len {
            return Err(UstError::BoundsError { index, len });
        }
        self.volumes[index] = value;
        self.state.updated();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.points = DEFAULT_ENVELOPE_POINTS;
        self.volumes = DEFAULT_ENVELOPE_VOLUMES;
        self.arity = 7;
        self.state.cleared();
    }

    fn supplied_points(&self) -> usize {
        ENVELOPE_LAYOUT[..self.arity]
            .iter()
            .filter(|slot| matches!(slot, EnvelopeSlot::Point(_)))
            .count()
    }

    fn supplied_volumes(&self) -> usize {
        ENVELOPE_LAYOUT[..self.arity]
            .iter()
            .filter(|slot| matches!(slot, EnvelopeSlot::Volume(_)))
            .count()
    }

    fn parse(text: &str) -> Result<([f64; 5], [i32; 5], usize), UstError> {
        let bad = || UstError::format(format!("{} is not envelope pattern", text));
        let tokens: Vec<&str> = text.split(',').collect();
        if !ENVELOPE_ARITIES.contains(&tokens.len()) {
            return Err(bad());
        }

        let mut points = DEFAULT_ENVELOPE_POINTS;
        let mut volumes = DEFAULT_ENVELOPE_VOLUMES;
        for (slot, token) in ENVELOPE_LAYOUT.iter().zip(&tokens) {
            match *slot {
                EnvelopeSlot::Point(i) => {
                    let value = parse_float(token).map_err(|_| bad())?;
                    points[i] = quantize(value, TUPLE_PRECISION);
                }
                EnvelopeSlot::Volume(i) => {
                    volumes[i] = parse_int(token).map_err(|_| bad())?;
                }
                EnvelopeSlot::Marker => {
                    if token.trim() != "%" {
                        return Err(bad());
                    }
                }
            }
        }
        Ok((points, volumes, tokens.len()))
    }
}

impl fmt::Display for EnvelopeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in ENVELOPE_LAYOUT[..self.arity].iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match *slot {
                EnvelopeSlot::Point(p) => write!(f, "{:.*}", TUPLE_PRECISION, self.points[p])?,
                EnvelopeSlot::Volume(v) => write!(f, "{}", self.volumes[v])?,
                EnvelopeSlot::Marker => f.write_str("%")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vibrato_seven_values() {
        let mut e = VibratoEntry::new();
        e.init_from_str("1,2,3,4,5,6,7").unwrap();
        assert_eq!(e.length(), 1.0);
        assert_eq!(e.cycle(), 2.0);
        assert_eq!(e.depth(), 3.0);
        assert_eq!(e.fade_in(), 4.0);
        assert_eq!(e.fade_out(), 5.0);
        assert_eq!(e.phase(), 6.0);
        assert_eq!(e.height(), 7.0);
        assert!(e.has_value());
        assert!(!e.is_updated());
        assert_eq!(e.to_string(), "1.00,2.00,3.00,4.00,5.00,6.00,7.00,0.00");
    }

    #[test]
    fn test_vibrato_eight_values_and_slot_update() {
        let mut e = VibratoEntry::new();
        e.init_from_str("65,180,35,20,20,0,0,0").unwrap();
        e.set_slot(VIBRATO_DEPTH, 50.0).unwrap();
        assert_eq!(e.depth(), 50.0);
        assert!(e.is_updated());
        assert!(matches!(
            e.set_slot(8, 1.0),
            Err(UstError::BoundsError { index: 8, len: 8 })
        ));
    }

    #[test]
    fn test_vibrato_rejects_bad_values() {
        let mut e = VibratoEntry::new();
        let good: Vec<&str> = "1,2,3,4,5,6,7".split(',').collect();
        for i in 0..good.len() {
            let mut tokens = good.clone();
            tokens[i] = "a";
            let err = e.init_from_str(&tokens.join(",")).unwrap_err();
            assert_eq!(err.to_string(), "Format error at line 0: a is not float");
        }
        assert!(e.init_from_str("1,2,3").is_err());
        assert!(!e.has_value());
    }

    #[test]
    fn test_envelope_arities() {
        let mut e = EnvelopeEntry::new();
        e.init_from_str("1,2,3,4,5,6,7").unwrap();
        assert_eq!(e.to_string(), "1.00,2.00,3.00,4,5,6,7");
        assert_eq!(e.arity(), 7);

        e.init_from_str("1,2,3,4,5,6,7,%,8").unwrap();
        assert_eq!(e.to_string(), "1.00,2.00,3.00,4,5,6,7,%,8.00");

        e.init_from_str("1,2,3,4,5,6,7,%,8,10,11").unwrap();
        assert_eq!(e.to_string(), "1.00,2.00,3.00,4,5,6,7,%,8.00,10.00,11");
        assert_eq!(e.p(4).unwrap(), 10.0);
        assert_eq!(e.v(4).unwrap(), 11);
        assert!(!e.is_updated());
    }

    #[test]
    fn test_envelope_short_form_takes_defaults() {
        let mut e = EnvelopeEntry::new();
        e.init_from_str("0,10,30,0,80").unwrap();
        assert_eq!(e.volumes(), [0, 80, 100, 0, 100]);
        assert_eq!(e.to_string(), "0.00,10.00,30.00,0,80");
    }

    #[test]
    fn test_envelope_rejects_bad_patterns() {
        let mut e = EnvelopeEntry::new();
        let tokens: Vec<&str> = "1,2,3,4,5,6,7,%,8,10,11".split(',').collect();
        for i in 0..tokens.len() {
            let mut bad = tokens.clone();
            bad[i] = "a";
            let text = bad.join(",");
            let err = e.init_from_str(&text).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Format error at line 0: {} is not envelope pattern", text)
            );
        }
        assert!(e.init_from_str("1,2,3,4,5,6").is_err());
        assert!(e.init_from_str("1,2,3,4,5,6,7,8").is_err());
        assert!(!e.has_value());
    }

    #[test]
    fn test_envelope_set_p_and_v() {
        let mut e = EnvelopeEntry::new();
        e.init_from_str("1,2,3,4,5,6,7").unwrap();
        e.set_p(0, 10.0).unwrap();
        assert_eq!(e.to_string(), "10.00,2.00,3.00,4,5,6,7");
        e.set_v(0, 10).unwrap();
        assert_eq!(e.to_string(), "10.00,2.00,3.00,10,5,6,7");
        assert!(e.is_updated());

        assert!(matches!(
            e.set_p(3, 1.0),
            Err(UstError::BoundsError { index: 3, len: 3 })
        ));
        assert!(matches!(
            e.set_v(10, 1),
            Err(UstError::BoundsError { index: 10, len: 4 })
        ));
    }
}
