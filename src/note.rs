//! # Notes
//!
//! A [`Note`] is one numbered section of a project document: a bundle of
//! typed entries, the raw lines the parser could not place, and the timing
//! derived for it by fitting against a voicebank.
//!
//! ## Fields
//! [`Field`] names every entry a note carries, in the order they are saved,
//! together with its key in the document text.
//!
//! ## Fitting
//! Fitting derives the at-runtime timing fields (`@preuttr`, `@overlap`,
//! `@stpoint`) in two steps:
//!
//! 1. [`Note::apply`] looks the note up in the timing table and scales its
//!    pre-utterance, overlap and start point by the velocity rate.
//! 2. [`Note::autofit`] shrinks the result so the note does not reach back
//!    further than its predecessor lasts.
//!
//! The at-runtime fields are only ever written by these two methods.
//!
//! ## Related Modules
//! - `entry` - the entry kinds
//! - `timing` - the lookup collaborators used by `apply`
//! - `document` - owns notes and drives fitting in sequence order

use std::fmt;

use log::{debug, warn};

use crate::entry::{
    BoolEntry, CurveShape, EntryMut, EntryRef, EnvelopeEntry, FlagsEntry, FloatEntry, IntEntry,
    ListEntry, NoteNumEntry, PitchBendStart, StringEntry, VibratoEntry,
};
use crate::error::UstError;
use crate::timing::{PrefixLookup, TimingLookup, TimingRecord};

/// Ticks per quarter note.
pub const TICKS_PER_BEAT: f64 = 480.0;

/// Length of a note whose length entry is unset.
pub const DEFAULT_LENGTH: i32 = 480;

/// Velocity, intensity and modulation of an unset entry.
pub const DEFAULT_VELOCITY: i32 = 100;
pub const DEFAULT_INTENSITY: i32 = 100;
pub const DEFAULT_MODULATION: i32 = 100;

/// Section label of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    /// Numbered note, `#0000` onward.
    Index(u32),
    /// The note before a plugin selection.
    Prev,
    /// The note after a plugin selection.
    Next,
    /// A note a plugin adds.
    Insert,
    /// A note a plugin removes.
    Delete,
}

impl SectionId {
    /// Parse a label without brackets, such as `#0003` or `#DELETE`.
    pub fn parse(label: &str) -> Option<SectionId> {
        let body = label.strip_prefix('#')?;
        match body {
            "PREV" => Some(SectionId::Prev),
            "NEXT" => Some(SectionId::Next),
            "INSERT" => Some(SectionId::Insert),
            "DELETE" => Some(SectionId::Delete),
            _ if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) => {
                body.parse().ok().map(SectionId::Index)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Index(n) => write!(f, "#{:04}", n),
            SectionId::Prev => f.write_str("#PREV"),
            SectionId::Next => f.write_str("#NEXT"),
            SectionId::Insert => f.write_str("#INSERT"),
            SectionId::Delete => f.write_str("#DELETE"),
        }
    }
}

/// Every entry of a note, in save order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Length,
    Lyric,
    NoteNum,
    Tempo,
    PreUtterance,
    AtPreUtterance,
    VoiceOverlap,
    AtVoiceOverlap,
    StartPoint,
    AtStartPoint,
    AtFilename,
    AtAlias,
    Velocity,
    Intensity,
    Modulation,
    PitchBend,
    PbStart,
    Pbs,
    Pby,
    Pbw,
    Pbm,
    Flags,
    Vibrato,
    Envelope,
    Label,
    Direct,
    Region,
    RegionEnd,
}

impl Field {
    pub const ALL: [Field; 28] = [
        Field::Length,
        Field::Lyric,
        Field::NoteNum,
        Field::Tempo,
        Field::PreUtterance,
        Field::AtPreUtterance,
        Field::VoiceOverlap,
        Field::AtVoiceOverlap,
        Field::StartPoint,
        Field::AtStartPoint,
        Field::AtFilename,
        Field::AtAlias,
        Field::Velocity,
        Field::Intensity,
        Field::Modulation,
        Field::PitchBend,
        Field::PbStart,
        Field::Pbs,
        Field::Pby,
        Field::Pbw,
        Field::Pbm,
        Field::Flags,
        Field::Vibrato,
        Field::Envelope,
        Field::Label,
        Field::Direct,
        Field::Region,
        Field::RegionEnd,
    ];

    /// Key written to the document.
    pub fn key(self) -> &'static str {
        match self {
            Field::Length => "Length",
            Field::Lyric => "Lyric",
            Field::NoteNum => "NoteNum",
            Field::Tempo => "Tempo",
            Field::PreUtterance => "PreUtterance",
            Field::AtPreUtterance => "@preuttr",
            Field::VoiceOverlap => "VoiceOverlap",
            Field::AtVoiceOverlap => "@overlap",
            Field::StartPoint => "StartPoint",
            Field::AtStartPoint => "@stpoint",
            Field::AtFilename => "@filename",
            Field::AtAlias => "@alias",
            Field::Velocity => "Velocity",
            Field::Intensity => "Intensity",
            Field::Modulation => "Modulation",
            Field::PitchBend => "PitchBend",
            Field::PbStart => "PBStart",
            Field::Pbs => "PBS",
            Field::Pby => "PBY",
            Field::Pbw => "PBW",
            Field::Pbm => "PBM",
            Field::Flags => "Flags",
            Field::Vibrato => "VBR",
            Field::Envelope => "Envelope",
            Field::Label => "Label",
            Field::Direct => "$direct",
            Field::Region => "$region",
            Field::RegionEnd => "$region_end",
        }
    }

    /// Field for a document key. Keys match exactly; `Pitches` is the older
    /// spelling of `PitchBend`.
    pub fn from_key(key: &str) -> Option<Field> {
        if key == "Pitches" {
            return Some(Field::PitchBend);
        }
        Field::ALL.iter().copied().find(|field| field.key() == key)
    }

    /// Timing derived by fitting. Never parsed from a document.
    pub fn is_runtime(self) -> bool {
        matches!(
            self,
            Field::AtPreUtterance | Field::AtVoiceOverlap | Field::AtStartPoint
        )
    }

    /// Any `@` key. Plugins hand these back to the editor untouched.
    pub fn is_derived(self) -> bool {
        self.is_runtime() || matches!(self, Field::AtFilename | Field::AtAlias)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A document line kept as written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraLine {
    /// Text before the separator, or the whole line if there is none.
    pub key: String,
    pub line: String,
}

/// External tables and policy used while fitting.
#[derive(Clone, Copy)]
pub struct FitContext<'a> {
    pub timing: &'a dyn TimingLookup,
    pub prefix: &'a dyn PrefixLookup,
    /// Turn a timing-table miss into [`UstError::NotFoundError`].
    pub strict: bool,
}

impl<'a> FitContext<'a> {
    pub fn new(timing: &'a dyn TimingLookup, prefix: &'a dyn PrefixLookup) -> Self {
        Self {
            timing,
            prefix,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// One note of a project.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: SectionId,
    pub length: IntEntry,
    pub lyric: StringEntry,
    pub note_num: NoteNumEntry,
    /// Own tempo; the header tempo applies while unset.
    pub tempo: FloatEntry,
    pub pre: FloatEntry,
    pub ove: FloatEntry,
    pub stp: FloatEntry,
    at_pre: FloatEntry,
    at_ove: FloatEntry,
    at_stp: FloatEntry,
    at_filename: StringEntry,
    /// Alias override. Fitting writes the alias it resolved here.
    pub at_alias: StringEntry,
    pub velocity: IntEntry,
    pub intensity: IntEntry,
    pub modulation: IntEntry,
    /// Mode-1 pitch bend, in cents.
    pub pitch_bend: ListEntry<i32>,
    /// Start of the mode-1 pitch bend, in ms from the note head.
    pub pb_start: FloatEntry,
    pub pbs: PitchBendStart,
    pub pby: ListEntry<f64>,
    pub pbw: ListEntry<f64>,
    pub pbm: ListEntry<CurveShape>,
    pub flags: FlagsEntry,
    pub vibrato: VibratoEntry,
    pub envelope: EnvelopeEntry,
    pub label: StringEntry,
    pub direct: BoolEntry,
    pub region: StringEntry,
    pub region_end: StringEntry,
    extras: Vec<ExtraLine>,
    timing: Option<TimingRecord>,
}

impl Default for Note {
    fn default() -> Self {
        Note::with_id(SectionId::Index(0))
    }
}

impl Note {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: SectionId) -> Self {
        Note {
            id,
            length: IntEntry::with_default(DEFAULT_LENGTH),
            lyric: StringEntry::new(),
            note_num: NoteNumEntry::new(),
            tempo: FloatEntry::tempo(),
            pre: FloatEntry::new(),
            ove: FloatEntry::new(),
            stp: FloatEntry::new(),
            at_pre: FloatEntry::new(),
            at_ove: FloatEntry::new(),
            at_stp: FloatEntry::new(),
            at_filename: StringEntry::new(),
            at_alias: StringEntry::new(),
            velocity: IntEntry::with_default(DEFAULT_VELOCITY),
            intensity: IntEntry::with_default(DEFAULT_INTENSITY),
            modulation: IntEntry::with_default(DEFAULT_MODULATION),
            pitch_bend: ListEntry::new(),
            pb_start: FloatEntry::new(),
            pbs: PitchBendStart::new(),
            pby: ListEntry::new(),
            pbw: ListEntry::new(),
            pbm: ListEntry::new(),
            flags: FlagsEntry::new(),
            vibrato: VibratoEntry::new(),
            envelope: EnvelopeEntry::new(),
            label: StringEntry::new(),
            direct: BoolEntry::new(),
            region: StringEntry::new(),
            region_end: StringEntry::new(),
            extras: Vec::new(),
            timing: None,
        }
    }

    /// Fitted pre-utterance, ms.
    pub fn at_pre(&self) -> &FloatEntry {
        &self.at_pre
    }

    /// Fitted overlap, ms.
    pub fn at_ove(&self) -> &FloatEntry {
        &self.at_ove
    }

    /// Fitted start point, ms.
    pub fn at_stp(&self) -> &FloatEntry {
        &self.at_stp
    }

    /// Sample the fitted alias resolved to.
    pub fn at_filename(&self) -> &StringEntry {
        &self.at_filename
    }

    /// Timing record matched by the last successful `apply`.
    pub fn timing(&self) -> Option<&TimingRecord> {
        self.timing.as_ref()
    }

    pub fn extras(&self) -> &[ExtraLine] {
        &self.extras
    }

    pub(crate) fn push_extra(&mut self, key: impl Into<String>, line: impl Into<String>) {
        self.extras.push(ExtraLine {
            key: key.into(),
            line: line.into(),
        });
    }

    pub fn entry(&self, field: Field) -> EntryRef<'_> {
        match field {
            Field::Length => EntryRef::Int(&self.length),
            Field::Lyric => EntryRef::Str(&self.lyric),
            Field::NoteNum => EntryRef::NoteNum(&self.note_num),
            Field::Tempo => EntryRef::Float(&self.tempo),
            Field::PreUtterance => EntryRef::Float(&self.pre),
            Field::AtPreUtterance => EntryRef::Float(&self.at_pre),
            Field::VoiceOverlap => EntryRef::Float(&self.ove),
            Field::AtVoiceOverlap => EntryRef::Float(&self.at_ove),
            Field::StartPoint => EntryRef::Float(&self.stp),
            Field::AtStartPoint => EntryRef::Float(&self.at_stp),
            Field::AtFilename => EntryRef::Str(&self.at_filename),
            Field::AtAlias => EntryRef::Str(&self.at_alias),
            Field::Velocity => EntryRef::Int(&self.velocity),
            Field::Intensity => EntryRef::Int(&self.intensity),
            Field::Modulation => EntryRef::Int(&self.modulation),
            Field::PitchBend => EntryRef::IntList(&self.pitch_bend),
            Field::PbStart => EntryRef::Float(&self.pb_start),
            Field::Pbs => EntryRef::PitchBendStart(&self.pbs),
            Field::Pby => EntryRef::FloatList(&self.pby),
            Field::Pbw => EntryRef::FloatList(&self.pbw),
            Field::Pbm => EntryRef::ShapeList(&self.pbm),
            Field::Flags => EntryRef::Flags(&self.flags),
            Field::Vibrato => EntryRef::Vibrato(&self.vibrato),
            Field::Envelope => EntryRef::Envelope(&self.envelope),
            Field::Label => EntryRef::Str(&self.label),
            Field::Direct => EntryRef::Bool(&self.direct),
            Field::Region => EntryRef::Str(&self.region),
            Field::RegionEnd => EntryRef::Str(&self.region_end),
        }
    }

    /// Mutable view of a field. Runtime fields are not reachable here.
    pub fn entry_mut(&mut self, field: Field) -> Option<EntryMut<'_>> {
        let entry = match field {
            Field::AtPreUtterance | Field::AtVoiceOverlap | Field::AtStartPoint => return None,
            Field::Length => EntryMut::Int(&mut self.length),
            Field::Lyric => EntryMut::Str(&mut self.lyric),
            Field::NoteNum => EntryMut::NoteNum(&mut self.note_num),
            Field::Tempo => EntryMut::Float(&mut self.tempo),
            Field::PreUtterance => EntryMut::Float(&mut self.pre),
            Field::VoiceOverlap => EntryMut::Float(&mut self.ove),
            Field::StartPoint => EntryMut::Float(&mut self.stp),
            Field::AtFilename => EntryMut::Str(&mut self.at_filename),
            Field::AtAlias => EntryMut::Str(&mut self.at_alias),
            Field::Velocity => EntryMut::Int(&mut self.velocity),
            Field::Intensity => EntryMut::Int(&mut self.intensity),
            Field::Modulation => EntryMut::Int(&mut self.modulation),
            Field::PitchBend => EntryMut::IntList(&mut self.pitch_bend),
            Field::PbStart => EntryMut::Float(&mut self.pb_start),
            Field::Pbs => EntryMut::PitchBendStart(&mut self.pbs),
            Field::Pby => EntryMut::FloatList(&mut self.pby),
            Field::Pbw => EntryMut::FloatList(&mut self.pbw),
            Field::Pbm => EntryMut::ShapeList(&mut self.pbm),
            Field::Flags => EntryMut::Flags(&mut self.flags),
            Field::Vibrato => EntryMut::Vibrato(&mut self.vibrato),
            Field::Envelope => EntryMut::Envelope(&mut self.envelope),
            Field::Label => EntryMut::Str(&mut self.label),
            Field::Direct => EntryMut::Bool(&mut self.direct),
            Field::Region => EntryMut::Str(&mut self.region),
            Field::RegionEnd => EntryMut::Str(&mut self.region_end),
        };
        Some(entry)
    }

    /// A rest is a note whose lyric is `R` or `r`.
    pub fn is_rest(&self) -> bool {
        matches!(self.lyric.value(), "R" | "r")
    }

    /// Tempo in effect for this note.
    pub fn effective_tempo(&self, header_tempo: f64) -> f64 {
        if self.tempo.has_value() {
            self.tempo.value()
        } else {
            header_tempo
        }
    }

    /// Flags in effect for this note.
    pub fn effective_flags<'a>(&'a self, header_flags: &'a str) -> &'a str {
        if self.flags.has_value() {
            self.flags.value()
        } else {
            header_flags
        }
    }

    /// Duration in milliseconds.
    pub fn ms_length(&self, header_tempo: f64) -> f64 {
        let tempo = self.effective_tempo(header_tempo);
        self.length.value() as f64 * (60000.0 / tempo) / TICKS_PER_BEAT
    }

    /// Consonant speed factor: `2^((100 - velocity) / 100)`.
    pub fn rate(&self) -> f64 {
        velocity_rate(self.velocity.value())
    }

    fn find_record(&self, ctx: &FitContext<'_>) -> Option<TimingRecord> {
        if self.at_alias.has_value() {
            return ctx.timing.lookup(self.at_alias.value());
        }
        let lyric = self.lyric.value();
        let (prefix, suffix) = ctx.prefix.lookup(self.note_num.value());
        if !prefix.is_empty() || !suffix.is_empty() {
            let decorated = format!("{}{}{}", prefix, lyric, suffix);
            if let Some(record) = ctx.timing.lookup(&decorated) {
                return Some(record);
            }
        }
        ctx.timing.lookup(lyric)
    }

    fn clear_runtime(&mut self) {
        self.at_pre.reset();
        self.at_ove.reset();
        self.at_stp.reset();
        self.at_filename.reset();
        self.timing = None;
    }

    /// Look the note up in the timing table and derive its at-runtime timing.
    ///
    /// Own pre-utterance and overlap win over the record's; all three
    /// offsets are scaled by [`Note::rate`]. Rests and misses leave the
    /// runtime fields unset; a miss only fails under a strict context, and a
    /// velocity too low to give a finite rate is a `ValueError`. `is_first`
    /// only affects logging.
    pub fn apply(&mut self, ctx: &FitContext<'_>, is_first: bool) -> Result<(), UstError> {
        if self.is_rest() {
            debug!("{}: rest, skipping timing lookup", self.id);
            self.clear_runtime();
            return Ok(());
        }

        let record = match self.find_record(ctx) {
            Some(record) => record,
            None => {
                self.clear_runtime();
                let message = format!("{}: no timing record for '{}'", self.id, self.lyric.value());
                if ctx.strict {
                    return Err(UstError::NotFoundError(message));
                }
                warn!("{}", message);
                return Ok(());
            }
        };

        let rate = self.rate();
        if !rate.is_finite() {
            self.clear_runtime();
            return Err(UstError::ValueError(format!(
                "{}: velocity {} leaves no usable timing",
                self.id,
                self.velocity.value()
            )));
        }
        let pre = if self.pre.has_value() {
            self.pre.value()
        } else {
            record.preutterance
        };
        let ove = if self.ove.has_value() {
            self.ove.value()
        } else {
            record.overlap
        };
        let stp = self.stp.value();

        self.at_pre.set(pre * rate)?;
        self.at_ove.set(ove * rate)?;
        self.at_stp.set(stp * rate)?;
        self.at_alias.set(record.alias.clone());
        self.at_filename.set(record.sample_path());
        debug!(
            "{}: '{}' -> {} (pre {}, ove {}, stp {}{})",
            self.id,
            self.lyric.value(),
            record.alias,
            self.at_pre,
            self.at_ove,
            self.at_stp,
            if is_first { ", first note" } else { "" }
        );
        self.timing = Some(record);
        Ok(())
    }

    /// Shrink the at-runtime timing to fit inside the previous note.
    ///
    /// When `atPre + atOve` exceeds the previous note's duration, both are
    /// scaled down by the same factor and the start point moves later by
    /// the amount cut from the pre-utterance. The start point then grows
    /// further if `atPre + atOve - atStp` would still exceed that duration.
    /// Does nothing without a predecessor, after a rest, or before `apply`.
    pub fn autofit(&mut self, prev: Option<&Note>, header_tempo: f64) -> Result<(), UstError> {
        let prev = match prev {
            Some(prev) if !prev.is_rest() => prev,
            _ => return Ok(()),
        };
        if !self.at_pre.has_value() || !self.at_ove.has_value() {
            return Ok(());
        }

        let limit = prev.ms_length(header_tempo);
        let pre = self.at_pre.value();
        let ove = self.at_ove.value();
        let sum = pre + ove;
        if sum > limit && sum > 0.0 {
            let ratio = limit / sum;
            self.at_pre.set(pre * ratio)?;
            self.at_ove.set(ove * ratio)?;
            let shift = pre - self.at_pre.value();
            self.at_stp.set(self.at_stp.value() + shift)?;
            debug!(
                "{}: fitted into {} ms (pre {}, ove {}, stp {})",
                self.id, limit, self.at_pre, self.at_ove, self.at_stp
            );
        }

        let reach = self.at_pre.value() + self.at_ove.value() - self.at_stp.value();
        if reach > limit {
            let needed = self.at_pre.value() + self.at_ove.value() - limit;
            self.at_stp.set_rounding_up(needed)?;
        }
        Ok(())
    }
}

/// `2^((100 - velocity) / 100)`; 1.0 at velocity 100.
pub fn velocity_rate(velocity: i32) -> f64 {
    2f64.powf((100.0 - velocity as f64) / 100.0)
}
