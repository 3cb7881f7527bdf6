//! Note numbers and note names.
//!
//! Note numbers follow MIDI numbering (`C4 = 60`). Names are a letter, an
//! optional accidental (`#`, `♯`, `b`, `♭`) and a single octave digit. Only
//! names in the voicebank range `C1`..`B7` (24..=107) are accepted.

use std::fmt;

use super::scalar::IntEntry;
use crate::error::UstError;

/// Lowest note number a note name may denote (`C1`).
pub const LOWEST_NAMED: i32 = 24;

/// Highest note number a note name may denote (`B7`).
pub const HIGHEST_NAMED: i32 = 107;

/// Note number of an unset pitch entry (`C4`).
pub const DEFAULT_NOTE_NUM: i32 = 60;

/// How semitones are spelled when converting numbers to names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccidentalStyle {
    #[default]
    Sharp,
    SharpSign,
    Flat,
    FlatSign,
}

impl AccidentalStyle {
    fn names(&self) -> [&'static str; 12] {
        match self {
            AccidentalStyle::Sharp => ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"],
            AccidentalStyle::SharpSign => ["C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B"],
            AccidentalStyle::Flat => ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"],
            AccidentalStyle::FlatSign => ["C", "D♭", "D", "E♭", "E", "F", "G♭", "G", "A♭", "A", "B♭", "B"],
        }
    }
}

fn pitch_class(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let shift = match chars.next() {
        None => 0,
        Some('#') | Some('♯') => 1,
        Some('b') | Some('♭') => -1,
        Some(_) => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    // Cb and B# are not spelled by any table
    let pc = base + shift;
    if !(0..12).contains(&pc) {
        return None;
    }
    Some(pc)
}

/// Convert a note name such as `C4`, `C#4` or `Db3` to its note number.
pub fn name_to_number(name: &str) -> Result<i32, UstError> {
    let invalid = || UstError::ValueError(format!("{} is not tone-name.", name));
    let trimmed = name.trim();
    let octave_char = trimmed.chars().last().ok_or_else(invalid)?;
    let octave = octave_char.to_digit(10).ok_or_else(invalid)? as i32;
    let letters = &trimmed[..trimmed.len() - octave_char.len_utf8()];
    let pc = pitch_class(letters).ok_or_else(invalid)?;

    let number = pc + (octave + 1) * 12;
    if !(LOWEST_NAMED..=HIGHEST_NAMED).contains(&number) {
        return Err(UstError::ValueError(format!(
            "{} is outside {}..={}",
            name, LOWEST_NAMED, HIGHEST_NAMED
        )));
    }
    Ok(number)
}

/// Convert a note number to a name spelled with `style`.
pub fn number_to_name(number: i32, style: AccidentalStyle) -> String {
    let names = style.names();
    let octave = number.div_euclid(12) - 1;
    format!("{}{}", names[number.rem_euclid(12) as usize], octave)
}

/// Integer pitch entry that also reads and produces note names.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteNumEntry {
    inner: IntEntry,
}

impl Default for NoteNumEntry {
    fn default() -> Self {
        Self {
            inner: IntEntry::with_default(DEFAULT_NOTE_NUM),
        }
    }
}

impl NoteNumEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i32 {
        self.inner.value()
    }

    pub fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    pub fn is_updated(&self) -> bool {
        self.inner.is_updated()
    }

    pub fn init(&mut self, value: i32) {
        self.inner.init(value);
    }

    pub fn set(&mut self, value: i32) {
        self.inner.set(value);
    }

    /// Accepts either a number (`60`) or a note name (`C4`).
    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = Self::parse(text)?;
        self.inner.init(value);
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let value = Self::parse(text)?;
        self.inner.set(value);
        Ok(())
    }

    pub fn set_from_name(&mut self, name: &str) -> Result<(), UstError> {
        let value = name_to_number(name)?;
        self.inner.set(value);
        Ok(())
    }

    pub fn tone_name(&self) -> String {
        number_to_name(self.value(), AccidentalStyle::Sharp)
    }

    pub fn tone_name_with(&self, style: AccidentalStyle) -> String {
        number_to_name(self.value(), style)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    fn parse(text: &str) -> Result<i32, UstError> {
        match text.trim().parse::<i32>() {
            Ok(v) => Ok(v),
            Err(_) => name_to_number(text),
        }
    }
}

impl fmt::Display for NoteNumEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
