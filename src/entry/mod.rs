//! # Value Entries
//!
//! Every field of a note or of the project header is a typed entry. An entry
//! validates its own text form, formats itself for output and tracks two
//! flags:
//!
//! - `has_value`: the entry was explicitly given a value (by load or by a
//!   setter). While unset, the value getter returns a documented default.
//! - `is_updated`: the entry was changed through a setter after
//!   construction. Loading never marks an entry updated.
//!
//! ## Entry Kinds
//! - [`scalar`]: boolean, integer, float, string and flag strings
//! - [`pitch`]: note numbers that also accept note names
//! - [`list`]: placeholder-compressed lists
//! - [`pair`]: the pitch-bend start pair
//! - [`tuple`]: vibrato and envelope
//!
//! ## Dispatch
//! Code that handles fields generically (the document parser and writer)
//! works through [`EntryRef`] and [`EntryMut`], closed tagged views over the
//! concrete entry types.
//!
//! ## Related Modules
//! - `note` - owns one entry per field
//! - `document` - the project header entries

pub mod list;
pub mod pair;
pub mod pitch;
pub mod scalar;
pub mod tuple;

use std::fmt;

use crate::error::UstError;

pub use list::{CurveShape, ListEntry, ListItem};
pub use pair::PitchBendStart;
pub use pitch::{AccidentalStyle, NoteNumEntry};
pub use scalar::{BoolEntry, FlagsEntry, FloatEntry, IntEntry, StringEntry};
pub use tuple::{EnvelopeEntry, VibratoEntry};

/// The `has_value`/`is_updated` pair shared by every entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct EntryState {
    pub(crate) has_value: bool,
    pub(crate) is_updated: bool,
}

impl EntryState {
    /// Value came from a document.
    pub(crate) fn loaded(&mut self) {
        self.has_value = true;
    }

    /// Value came from a setter.
    pub(crate) fn updated(&mut self) {
        self.has_value = true;
        self.is_updated = true;
    }

    /// Value was removed through `reset`.
    pub(crate) fn cleared(&mut self) {
        self.has_value = false;
        self.is_updated = true;
    }
}

/// Shared view of an entry, tagged by kind.
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    Bool(&'a BoolEntry),
    Int(&'a IntEntry),
    Float(&'a FloatEntry),
    Str(&'a StringEntry),
    Flags(&'a FlagsEntry),
    NoteNum(&'a NoteNumEntry),
    IntList(&'a ListEntry<i32>),
    FloatList(&'a ListEntry<f64>),
    ShapeList(&'a ListEntry<CurveShape>),
    PitchBendStart(&'a PitchBendStart),
    Vibrato(&'a VibratoEntry),
    Envelope(&'a EnvelopeEntry),
}

impl EntryRef<'_> {
    pub fn has_value(&self) -> bool {
        match self {
            EntryRef::Bool(e) => e.has_value(),
            EntryRef::Int(e) => e.has_value(),
            EntryRef::Float(e) => e.has_value(),
            EntryRef::Str(e) => e.has_value(),
            EntryRef::Flags(e) => e.has_value(),
            EntryRef::NoteNum(e) => e.has_value(),
            EntryRef::IntList(e) => e.has_value(),
            EntryRef::FloatList(e) => e.has_value(),
            EntryRef::ShapeList(e) => e.has_value(),
            EntryRef::PitchBendStart(e) => e.has_value(),
            EntryRef::Vibrato(e) => e.has_value(),
            EntryRef::Envelope(e) => e.has_value(),
        }
    }

    pub fn is_updated(&self) -> bool {
        match self {
            EntryRef::Bool(e) => e.is_updated(),
            EntryRef::Int(e) => e.is_updated(),
            EntryRef::Float(e) => e.is_updated(),
            EntryRef::Str(e) => e.is_updated(),
            EntryRef::Flags(e) => e.is_updated(),
            EntryRef::NoteNum(e) => e.is_updated(),
            EntryRef::IntList(e) => e.is_updated(),
            EntryRef::FloatList(e) => e.is_updated(),
            EntryRef::ShapeList(e) => e.is_updated(),
            EntryRef::PitchBendStart(e) => e.is_updated(),
            EntryRef::Vibrato(e) => e.is_updated(),
            EntryRef::Envelope(e) => e.is_updated(),
        }
    }

    /// Whether an empty value in a document is a valid value for this kind.
    /// An empty curve-shape list is a single S-curve.
    pub fn accepts_empty(&self) -> bool {
        matches!(
            self,
            EntryRef::Str(_) | EntryRef::Flags(_) | EntryRef::ShapeList(_)
        )
    }
}

impl fmt::Display for EntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRef::Bool(e) => fmt::Display::fmt(e, f),
            EntryRef::Int(e) => fmt::Display::fmt(e, f),
            EntryRef::Float(e) => fmt::Display::fmt(e, f),
            EntryRef::Str(e) => fmt::Display::fmt(e, f),
            EntryRef::Flags(e) => fmt::Display::fmt(e, f),
            EntryRef::NoteNum(e) => fmt::Display::fmt(e, f),
            EntryRef::IntList(e) => fmt::Display::fmt(e, f),
            EntryRef::FloatList(e) => fmt::Display::fmt(e, f),
            EntryRef::ShapeList(e) => fmt::Display::fmt(e, f),
            EntryRef::PitchBendStart(e) => fmt::Display::fmt(e, f),
            EntryRef::Vibrato(e) => fmt::Display::fmt(e, f),
            EntryRef::Envelope(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Mutable view of an entry, tagged by kind.
#[derive(Debug)]
pub enum EntryMut<'a> {
    Bool(&'a mut BoolEntry),
    Int(&'a mut IntEntry),
    Float(&'a mut FloatEntry),
    Str(&'a mut StringEntry),
    Flags(&'a mut FlagsEntry),
    NoteNum(&'a mut NoteNumEntry),
    IntList(&'a mut ListEntry<i32>),
    FloatList(&'a mut ListEntry<f64>),
    ShapeList(&'a mut ListEntry<CurveShape>),
    PitchBendStart(&'a mut PitchBendStart),
    Vibrato(&'a mut VibratoEntry),
    Envelope(&'a mut EnvelopeEntry),
}

impl EntryMut<'_> {
    pub fn view(&self) -> EntryRef<'_> {
        match self {
            EntryMut::Bool(e) => EntryRef::Bool(e),
            EntryMut::Int(e) => EntryRef::Int(e),
            EntryMut::Float(e) => EntryRef::Float(e),
            EntryMut::Str(e) => EntryRef::Str(e),
            EntryMut::Flags(e) => EntryRef::Flags(e),
            EntryMut::NoteNum(e) => EntryRef::NoteNum(e),
            EntryMut::IntList(e) => EntryRef::IntList(e),
            EntryMut::FloatList(e) => EntryRef::FloatList(e),
            EntryMut::ShapeList(e) => EntryRef::ShapeList(e),
            EntryMut::PitchBendStart(e) => EntryRef::PitchBendStart(e),
            EntryMut::Vibrato(e) => EntryRef::Vibrato(e),
            EntryMut::Envelope(e) => EntryRef::Envelope(e),
        }
    }

    /// Load path: store the parsed value without marking the entry updated.
    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        match self {
            EntryMut::Bool(e) => e.init_from_str(text),
            EntryMut::Int(e) => e.init_from_str(text),
            EntryMut::Float(e) => e.init_from_str(text),
            EntryMut::Str(e) => {
                e.init(text);
                Ok(())
            }
            EntryMut::Flags(e) => {
                e.init(text);
                Ok(())
            }
            EntryMut::NoteNum(e) => e.init_from_str(text),
            EntryMut::IntList(e) => e.init_from_str(text),
            EntryMut::FloatList(e) => e.init_from_str(text),
            EntryMut::ShapeList(e) => e.init_from_str(text),
            EntryMut::PitchBendStart(e) => e.init_from_str(text),
            EntryMut::Vibrato(e) => e.init_from_str(text),
            EntryMut::Envelope(e) => e.init_from_str(text),
        }
    }

    /// Edit path: store the parsed value and mark the entry updated.
    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        match self {
            EntryMut::Bool(e) => e.set_from_str(text),
            EntryMut::Int(e) => e.set_from_str(text),
            EntryMut::Float(e) => e.set_from_str(text),
            EntryMut::Str(e) => {
                e.set(text);
                Ok(())
            }
            EntryMut::Flags(e) => {
                e.set(text);
                Ok(())
            }
            EntryMut::NoteNum(e) => e.set_from_str(text),
            EntryMut::IntList(e) => e.set_from_str(text),
            EntryMut::FloatList(e) => e.set_from_str(text),
            EntryMut::ShapeList(e) => e.set_from_str(text),
            EntryMut::PitchBendStart(e) => e.set_from_str(text),
            EntryMut::Vibrato(e) => e.set_from_str(text),
            EntryMut::Envelope(e) => e.set_from_str(text),
        }
    }

    pub fn reset(&mut self) {
        match self {
            EntryMut::Bool(e) => e.reset(),
            EntryMut::Int(e) => e.reset(),
            EntryMut::Float(e) => e.reset(),
            EntryMut::Str(e) => e.reset(),
            EntryMut::Flags(e) => e.reset(),
            EntryMut::NoteNum(e) => e.reset(),
            EntryMut::IntList(e) => e.reset(),
            EntryMut::FloatList(e) => e.reset(),
            EntryMut::ShapeList(e) => e.reset(),
            EntryMut::PitchBendStart(e) => e.reset(),
            EntryMut::Vibrato(e) => e.reset(),
            EntryMut::Envelope(e) => e.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = EntryState::default();
        state.loaded();
        assert!(state.has_value && !state.is_updated);
        state.updated();
        assert!(state.has_value && state.is_updated);
        state.cleared();
        assert!(!state.has_value && state.is_updated);
    }

    #[test]
    fn test_dispatch_parses_by_kind() {
        let mut length = IntEntry::new();
        let mut view = EntryMut::Int(&mut length);
        assert!(view.init_from_str("abc").is_err());
        view.init_from_str("480").unwrap();
        assert!(view.view().has_value());
        assert!(!view.view().is_updated());
        assert_eq!(view.view().to_string(), "480");

        let mut lyric = StringEntry::new();
        let mut view = EntryMut::Str(&mut lyric);
        view.set_from_str("あ").unwrap();
        assert!(view.view().is_updated());
        assert!(view.view().accepts_empty());
        view.reset();
        assert!(!lyric.has_value());
    }

    #[test]
    fn test_dispatch_formats_composites() {
        let mut envelope = EnvelopeEntry::new();
        EntryMut::Envelope(&mut envelope)
            .init_from_str("0,5,35,0,100,100,0")
            .unwrap();
        assert_eq!(
            EntryRef::Envelope(&envelope).to_string(),
            "0.00,5.00,35.00,0,100,100,0"
        );
        assert!(!EntryRef::Envelope(&envelope).accepts_empty());
    }
}
