//! # Project Documents
//!
//! A [`Document`] is a whole project: the [`Header`] and the ordered notes.
//! The document exclusively owns its notes; neighbors are found by
//! position, never by stored links.
//!
//! ## Lifecycle
//! ```text
//! bytes ─► Document::load ─► edit / fit_all ─► Document::save ─► bytes
//! ```
//!
//! Fitting must run in sequence order because each note's fit reads the
//! already fitted predecessor. [`Document::fit_all`] does that; callers
//! driving [`Document::fit_note`] themselves must keep the order.
//!
//! ## Related Modules
//! - `parser` - text to document
//! - `writer` - document to text
//! - `encoding` - byte decoding and encoding

use std::fmt;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use log::info;

use crate::encoding::{encode, encoding_from_label, resolve_with};
use crate::entry::{BoolEntry, EntryMut, EntryRef, FlagsEntry, FloatEntry, StringEntry};
use crate::error::UstError;
use crate::note::{ExtraLine, FitContext, Note, SectionId};
use crate::parser::Parser;
use crate::settings::Settings;
use crate::timing::{PrefixLookup, TimingLookup};
use crate::writer::{write_changes, write_document};

/// Version written by new documents.
pub const UST_VERSION: &str = "1.2";

/// Keys of the `[#SETTING]` section, in save order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Tempo,
    ProjectName,
    VoiceDir,
    OutFile,
    CacheDir,
    Tool1,
    Tool2,
    Mode2,
    Flags,
}

impl HeaderField {
    pub const ALL: [HeaderField; 9] = [
        HeaderField::Tempo,
        HeaderField::ProjectName,
        HeaderField::VoiceDir,
        HeaderField::OutFile,
        HeaderField::CacheDir,
        HeaderField::Tool1,
        HeaderField::Tool2,
        HeaderField::Mode2,
        HeaderField::Flags,
    ];

    pub fn key(self) -> &'static str {
        match self {
            HeaderField::Tempo => "Tempo",
            HeaderField::ProjectName => "ProjectName",
            HeaderField::VoiceDir => "VoiceDir",
            HeaderField::OutFile => "OutFile",
            HeaderField::CacheDir => "CacheDir",
            HeaderField::Tool1 => "Tool1",
            HeaderField::Tool2 => "Tool2",
            HeaderField::Mode2 => "Mode2",
            HeaderField::Flags => "Flags",
        }
    }

    /// `Project` is accepted for `ProjectName`.
    pub fn from_key(key: &str) -> Option<HeaderField> {
        if key == "Project" {
            return Some(HeaderField::ProjectName);
        }
        HeaderField::ALL.iter().copied().find(|field| field.key() == key)
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The `[#VERSION]` and `[#SETTING]` sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Text after `UST Version`.
    pub version: StringEntry,
    /// Declared text encoding label.
    pub charset: StringEntry,
    /// Project tempo; 120 while unset.
    pub tempo: FloatEntry,
    pub project_name: StringEntry,
    pub voice_dir: StringEntry,
    pub out_file: StringEntry,
    pub cache_dir: StringEntry,
    /// Wavtool.
    pub tool1: StringEntry,
    /// Resampler.
    pub tool2: StringEntry,
    pub mode2: BoolEntry,
    pub flags: FlagsEntry,
    pub(crate) version_extras: Vec<ExtraLine>,
    pub(crate) extras: Vec<ExtraLine>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            version: StringEntry::new(),
            charset: StringEntry::new(),
            tempo: FloatEntry::tempo(),
            project_name: StringEntry::new(),
            voice_dir: StringEntry::new(),
            out_file: StringEntry::new(),
            cache_dir: StringEntry::new(),
            tool1: StringEntry::new(),
            tool2: StringEntry::new(),
            mode2: BoolEntry::new(),
            flags: FlagsEntry::new(),
            version_extras: Vec::new(),
            extras: Vec::new(),
        }
    }
}

impl Header {
    pub fn entry(&self, field: HeaderField) -> EntryRef<'_> {
        match field {
            HeaderField::Tempo => EntryRef::Float(&self.tempo),
            HeaderField::ProjectName => EntryRef::Str(&self.project_name),
            HeaderField::VoiceDir => EntryRef::Str(&self.voice_dir),
            HeaderField::OutFile => EntryRef::Str(&self.out_file),
            HeaderField::CacheDir => EntryRef::Str(&self.cache_dir),
            HeaderField::Tool1 => EntryRef::Str(&self.tool1),
            HeaderField::Tool2 => EntryRef::Str(&self.tool2),
            HeaderField::Mode2 => EntryRef::Bool(&self.mode2),
            HeaderField::Flags => EntryRef::Flags(&self.flags),
        }
    }

    pub fn entry_mut(&mut self, field: HeaderField) -> EntryMut<'_> {
        match field {
            HeaderField::Tempo => EntryMut::Float(&mut self.tempo),
            HeaderField::ProjectName => EntryMut::Str(&mut self.project_name),
            HeaderField::VoiceDir => EntryMut::Str(&mut self.voice_dir),
            HeaderField::OutFile => EntryMut::Str(&mut self.out_file),
            HeaderField::CacheDir => EntryMut::Str(&mut self.cache_dir),
            HeaderField::Tool1 => EntryMut::Str(&mut self.tool1),
            HeaderField::Tool2 => EntryMut::Str(&mut self.tool2),
            HeaderField::Mode2 => EntryMut::Bool(&mut self.mode2),
            HeaderField::Flags => EntryMut::Flags(&mut self.flags),
        }
    }

    /// Unrecognized `[#SETTING]` lines, kept as written.
    pub fn extras(&self) -> &[ExtraLine] {
        &self.extras
    }
}

/// A project: header plus notes in performance order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: Header,
    notes: Vec<Note>,
    encoding: &'static Encoding,
    path: Option<PathBuf>,
    settings: Settings,
    pub(crate) track_end: bool,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// Empty project with default settings.
    pub fn new() -> Self {
        Document::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut header = Header::default();
        header.version.init(UST_VERSION);
        Document {
            header,
            notes: Vec::new(),
            encoding: settings.encoding.unwrap_or(UTF_8),
            path: None,
            settings,
            track_end: true,
        }
    }

    pub(crate) fn from_parts(
        header: Header,
        notes: Vec<Note>,
        encoding: &'static Encoding,
        settings: Settings,
        track_end: bool,
    ) -> Self {
        Document {
            header,
            notes,
            encoding,
            path: None,
            settings,
            track_end,
        }
    }

    /// Decode and parse project bytes.
    pub fn load(bytes: &[u8], settings: &Settings) -> Result<Document, UstError> {
        let decoded = resolve_with(bytes, settings)?;
        let doc = Parser::new(&decoded.text).parse(decoded.encoding, *settings)?;
        info!(
            "loaded {} notes ({})",
            doc.notes.len(),
            decoded.encoding.name()
        );
        Ok(doc)
    }

    /// Read and parse a project file, remembering its path.
    pub fn load_file<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<Document, UstError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut doc = Document::load(&bytes, settings)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Encoding used on save: the declared charset when it names a known
    /// encoding, else the encoding the document was read with.
    pub fn save_encoding(&self) -> &'static Encoding {
        if self.header.charset.has_value() {
            if let Some(encoding) = encoding_from_label(self.header.charset.value()) {
                return encoding;
            }
        }
        self.encoding
    }

    /// Project text with the configured line ending.
    pub fn to_text(&self) -> String {
        write_document(self, self.settings.line_ending.as_str())
    }

    pub fn save(&self) -> Result<Vec<u8>, UstError> {
        let encoding = self.save_encoding();
        let bytes = encode(&self.to_text(), encoding)?;
        info!("saved {} notes ({})", self.notes.len(), encoding.name());
        Ok(bytes)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<(), UstError> {
        let bytes = self.save()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Plugin output: every note section, only updated entries, and
    /// nothing inside `#DELETE` sections.
    pub fn save_changes(&self) -> Result<Vec<u8>, UstError> {
        let text = write_changes(self, self.settings.line_ending.as_str());
        encode(&text, self.save_encoding())
    }

    /// Encoding the document was decoded with.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.path = Some(path.into());
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Header tempo, 120 when the project does not set one.
    pub fn tempo(&self) -> f64 {
        self.header.tempo.value()
    }

    /// Cache directory: the header's, else `<file stem>.cache` beside the
    /// project file, else `<project name>.cache`.
    pub fn cache_dir(&self) -> PathBuf {
        if self.header.cache_dir.has_value() {
            return PathBuf::from(self.header.cache_dir.value());
        }
        match &self.path {
            Some(path) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                path.with_file_name(format!("{}.cache", stem))
            }
            None => PathBuf::from(format!("{}.cache", self.header.project_name.value())),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn note_mut(&mut self, index: usize) -> Option<&mut Note> {
        self.notes.get_mut(index)
    }

    /// The note before `index`.
    pub fn prev(&self, index: usize) -> Option<&Note> {
        index.checked_sub(1).and_then(|i| self.notes.get(i))
    }

    /// The note after `index`.
    pub fn next(&self, index: usize) -> Option<&Note> {
        self.notes.get(index.checked_add(1)?)
    }

    /// Duration of the note at `index` under the header tempo.
    pub fn ms_length(&self, index: usize) -> Result<f64, UstError> {
        let note = self.notes.get(index).ok_or(UstError::BoundsError {
            index,
            len: self.notes.len(),
        })?;
        Ok(note.ms_length(self.tempo()))
    }

    pub fn push_note(&mut self, note: Note) {
        let start = self.first_index();
        self.notes.push(note);
        self.renumber(start);
    }

    pub fn insert_note(&mut self, index: usize, note: Note) -> Result<(), UstError> {
        if index > self.notes.len() {
            return Err(UstError::BoundsError {
                index,
                len: self.notes.len(),
            });
        }
        let start = self.first_index();
        self.notes.insert(index, note);
        self.renumber(start);
        Ok(())
    }

    pub fn remove_note(&mut self, index: usize) -> Result<Note, UstError> {
        if index >= self.notes.len() {
            return Err(UstError::BoundsError {
                index,
                len: self.notes.len(),
            });
        }
        let start = self.first_index();
        let note = self.notes.remove(index);
        self.renumber(start);
        Ok(note)
    }

    fn first_index(&self) -> Option<u32> {
        self.notes.iter().find_map(|note| match note.id {
            SectionId::Index(n) => Some(n),
            _ => None,
        })
    }

    // Numbered sections stay consecutive from the number the sequence
    // started at before the edit.
    fn renumber(&mut self, start: Option<u32>) {
        let mut next = start.or_else(|| self.first_index()).unwrap_or(0);
        for note in &mut self.notes {
            if let SectionId::Index(_) = note.id {
                note.id = SectionId::Index(next);
                next += 1;
            }
        }
    }

    /// `apply` then `autofit` the note at `index` against its predecessor.
    pub fn fit_note(
        &mut self,
        index: usize,
        timing: &dyn TimingLookup,
        prefix: &dyn PrefixLookup,
    ) -> Result<(), UstError> {
        let len = self.notes.len();
        if index >= len {
            return Err(UstError::BoundsError { index, len });
        }
        let ctx = FitContext::new(timing, prefix).strict(self.settings.strict_lookup);
        let tempo = self.tempo();
        let (before, rest) = self.notes.split_at_mut(index);
        let note = &mut rest[0];
        note.apply(&ctx, index == 0)?;
        note.autofit(before.last(), tempo)
    }

    /// Fit every note in sequence order.
    pub fn fit_all(
        &mut self,
        timing: &dyn TimingLookup,
        prefix: &dyn PrefixLookup,
    ) -> Result<(), UstError> {
        for index in 0..self.notes.len() {
            self.fit_note(index, timing, prefix)?;
        }
        Ok(())
    }
}
