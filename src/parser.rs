//! # Parser
//!
//! Turns decoded project text into a [`Document`].
//!
//! ## Layout
//! ```text
//! [#VERSION]
//! UST Version1.2
//! Charset=UTF-8
//! [#SETTING]
//! Tempo=120.00
//! ProjectName=demo
//! [#0000]
//! Length=480
//! Lyric=あ
//! NoteNum=60
//! [#TRACKEND]
//! ```
//!
//! Plugin files use the same layout with `[#PREV]`, `[#NEXT]`, `[#INSERT]`
//! and `[#DELETE]` sections and usually no `[#TRACKEND]`.
//!
//! ## Rules
//! - Each line is `key=value` or `key:value`; whichever separator comes
//!   first on the line wins.
//! - Unknown keys and lines without a separator are kept verbatim.
//! - A value that fails to parse is logged and its line kept verbatim;
//!   the entry stays unset.
//! - An empty value leaves non-string entries unset, except `PBM` where it
//!   is a single S-curve.
//! - `@preuttr`, `@overlap` and `@stpoint` are derived by fitting and are
//!   kept verbatim rather than parsed.
//! - Text without any section marker, content before the first marker and
//!   unknown `[#...]` markers are format errors.
//! - Everything after `[#TRACKEND]` is ignored.

use encoding_rs::Encoding;
use log::{debug, warn};

use crate::document::{Document, Header, HeaderField};
use crate::entry::EntryMut;
use crate::error::UstError;
use crate::note::{ExtraLine, Field, Note, SectionId};
use crate::settings::Settings;

const VERSION_PREFIX: &str = "UST Version";

/// Split a line at its first `=` or `:`.
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let at = line.find(['=', ':'])?;
    Some((&line[..at], &line[at + 1..]))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Version,
    Setting,
    Note,
    End,
}

pub struct Parser<'a> {
    text: &'a str,
    section: Section,
    seen_marker: bool,
    header: Header,
    notes: Vec<Note>,
    track_end: bool,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        Parser {
            text,
            section: Section::Preamble,
            seen_marker: false,
            header: Header::default(),
            notes: Vec::new(),
            track_end: false,
        }
    }

    pub fn parse(
        mut self,
        encoding: &'static Encoding,
        settings: Settings,
    ) -> Result<Document, UstError> {
        for (index, line) in self.text.lines().enumerate() {
            let line_no = index + 1;
            if self.section == Section::End {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            if let Some(label) = section_label(line) {
                self.start_section(label, line_no)?;
                continue;
            }
            match self.section {
                Section::Preamble => {
                    return Err(UstError::FormatError {
                        line: line_no,
                        message: format!("'{}' is outside any section", line),
                    });
                }
                Section::Version => self.version_line(line),
                Section::Setting => self.setting_line(line, line_no),
                Section::Note => self.note_line(line, line_no),
                Section::End => {}
            }
        }

        if !self.seen_marker {
            return Err(UstError::FormatError {
                line: 0,
                message: "no section markers found".to_string(),
            });
        }

        Ok(Document::from_parts(
            self.header,
            self.notes,
            encoding,
            settings,
            self.track_end,
        ))
    }

    fn start_section(&mut self, label: &str, line_no: usize) -> Result<(), UstError> {
        self.seen_marker = true;
        self.section = match label {
            "#VERSION" => Section::Version,
            "#SETTING" => Section::Setting,
            "#TRACKEND" => {
                self.track_end = true;
                Section::End
            }
            _ => {
                let id = SectionId::parse(label).ok_or_else(|| UstError::FormatError {
                    line: line_no,
                    message: format!("unknown section [{}]", label),
                })?;
                self.notes.push(Note::with_id(id));
                Section::Note
            }
        };
        debug!("line {}: section [{}]", line_no, label);
        Ok(())
    }

    fn version_line(&mut self, line: &str) {
        if let Some(version) = line.strip_prefix(VERSION_PREFIX) {
            self.header.version.init(version.trim());
            return;
        }
        match split_key_value(line) {
            Some(("Charset", value)) => self.header.charset.init(value.trim()),
            _ => self.header.version_extras.push(extra(line)),
        }
    }

    fn setting_line(&mut self, line: &str, line_no: usize) {
        let Some((key, value)) = split_key_value(line) else {
            self.header.extras.push(extra(line));
            return;
        };
        let Some(field) = HeaderField::from_key(key) else {
            self.header.extras.push(extra(line));
            return;
        };
        let mut entry = self.header.entry_mut(field);
        if let Err(e) = init_entry(&mut entry, value) {
            warn!("line {}: {}: {}", line_no, field, e.at_line(line_no));
            self.header.extras.push(extra(line));
        }
    }

    fn note_line(&mut self, line: &str, line_no: usize) {
        let Some(note) = self.notes.last_mut() else {
            return;
        };
        let Some((key, value)) = split_key_value(line) else {
            note.push_extra(line, line);
            return;
        };
        let Some(field) = Field::from_key(key) else {
            note.push_extra(key, line);
            return;
        };
        let result = match note.entry_mut(field) {
            Some(mut entry) => init_entry(&mut entry, value),
            // runtime timing is recomputed by fitting
            None => {
                note.push_extra(key, line);
                return;
            }
        };
        if let Err(e) = result {
            warn!("line {}: {}", line_no, e.at_line(line_no));
            note.push_extra(key, line);
        }
    }
}

fn section_label(line: &str) -> Option<&str> {
    let line = line.trim();
    line.strip_prefix('[')?
        .strip_suffix(']')
        .filter(|label| label.starts_with('#'))
}

fn extra(line: &str) -> ExtraLine {
    let key = split_key_value(line).map_or(line, |(key, _)| key);
    ExtraLine {
        key: key.to_string(),
        line: line.to_string(),
    }
}

fn init_entry(entry: &mut EntryMut<'_>, value: &str) -> Result<(), UstError> {
    if value.is_empty() && !entry.view().accepts_empty() {
        return Ok(());
    }
    entry.init_from_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CurveShape;
    use encoding_rs::UTF_8;

    fn parse(text: &str) -> Result<Document, UstError> {
        Parser::new(text).parse(UTF_8, Settings::default())
    }

    const SAMPLE: &str = "[#VERSION]\r\nUST Version1.2\r\nCharset=UTF-8\r\n[#SETTING]\r\nTempo=150.00\r\nTracks=1\r\nProject=demo\r\nVoiceDir=%VOICE%uta\r\nTool1=wavtool.exe\r\nTool2=resampler.exe\r\nMode2=True\r\n[#0000]\r\nLength=480\r\nLyric=R\r\nNoteNum=60\r\n[#0001]\r\nLength=960\r\nLyric=あ\r\nNoteNum=C#4\r\nPBS=-40;0\r\nPBW=80,#\r\nPBM=,s\r\nVBR=65,180,35,20,20,0,0\r\n[#TRACKEND]\r\n";

    #[test]
    fn test_parse_header() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.header.version.value(), "1.2");
        assert_eq!(doc.header.charset.value(), "UTF-8");
        assert_eq!(doc.tempo(), 150.0);
        assert_eq!(doc.header.project_name.value(), "demo");
        assert_eq!(doc.header.voice_dir.value(), "%VOICE%uta");
        assert_eq!(doc.header.tool1.value(), "wavtool.exe");
        assert_eq!(doc.header.tool2.value(), "resampler.exe");
        assert!(doc.header.mode2.value());
        assert_eq!(doc.header.extras().len(), 1);
        assert_eq!(doc.header.extras()[0].line, "Tracks=1");
    }

    #[test]
    fn test_parse_notes() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.len(), 2);
        let rest = doc.note(0).unwrap();
        assert!(rest.is_rest());
        assert_eq!(rest.id, SectionId::Index(0));

        let note = doc.note(1).unwrap();
        assert_eq!(note.length.value(), 960);
        assert_eq!(note.lyric.value(), "あ");
        assert_eq!(note.note_num.value(), 61);
        assert_eq!(note.pbs.time(), -40.0);
        assert_eq!(note.pbw.values(), &[80.0, 80.0]);
        assert_eq!(note.pbm.len(), 2);
        assert_eq!(note.vibrato.cycle(), 180.0);
        assert!(!note.length.is_updated());
    }

    #[test]
    fn test_colon_separator_and_first_separator_wins() {
        let doc = parse("[#SETTING]\nTempo:140\n[#0000]\nLyric=a:b\nLength:240\n").unwrap();
        assert_eq!(doc.tempo(), 140.0);
        let note = doc.note(0).unwrap();
        assert_eq!(note.lyric.value(), "a:b");
        assert_eq!(note.length.value(), 240);
    }

    #[test]
    fn test_missing_tempo_defaults() {
        let doc = parse("[#SETTING]\n[#0000]\nLyric=a\n").unwrap();
        assert_eq!(doc.tempo(), 120.0);
        assert!(!doc.header.tempo.has_value());
        assert!(!doc.track_end);
    }

    #[test]
    fn test_bad_values_are_kept_verbatim() {
        let doc = parse("[#0000]\nLength=long\nNoteNum=\nFoo=bar\nnoseparator\n@preuttr=12.5\n").unwrap();
        let note = doc.note(0).unwrap();
        assert!(!note.length.has_value());
        assert!(!note.note_num.has_value());
        assert!(!note.at_pre().has_value());
        let lines: Vec<&str> = note.extras().iter().map(|e| e.line.as_str()).collect();
        assert_eq!(lines, vec!["Length=long", "Foo=bar", "noseparator", "@preuttr=12.5"]);
        assert_eq!(note.extras()[0].key, "Length");
    }

    #[test]
    fn test_empty_string_value_is_a_value() {
        let doc = parse("[#0000]\nLabel=\n").unwrap();
        assert!(doc.note(0).unwrap().label.has_value());
    }

    #[test]
    fn test_empty_curve_shape_is_one_s_curve() {
        let doc = parse("[#0000]\nPBM=\nPBY=\n").unwrap();
        let note = doc.note(0).unwrap();
        assert!(note.pbm.has_value());
        assert_eq!(note.pbm.values(), &[CurveShape::SCurve]);
        assert!(!note.pby.has_value());
        assert!(doc.to_text().contains("PBM=\r\n"));
    }

    #[test]
    fn test_plugin_sections() {
        let doc = parse("[#SETTING]\n[#PREV]\nLyric=a\n[#0004]\nLyric=b\n[#INSERT]\nLyric=c\n[#DELETE]\n[#NEXT]\nLyric=d\n").unwrap();
        let ids: Vec<SectionId> = doc.notes().iter().map(|n| n.id).collect();
        assert_eq!(
            ids,
            vec![
                SectionId::Prev,
                SectionId::Index(4),
                SectionId::Insert,
                SectionId::Delete,
                SectionId::Next
            ]
        );
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            parse("Lyric=a\nLength=480\n"),
            Err(UstError::FormatError { .. })
        ));
        assert!(matches!(parse(""), Err(UstError::FormatError { .. })));
        match parse("[#SETTING]\n[#BOGUS]\n") {
            Err(UstError::FormatError { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_lines_after_track_end_are_ignored() {
        let doc = parse("[#0000]\nLyric=a\n[#TRACKEND]\n[#BOGUS]\ngarbage\n").unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.track_end);
    }

    #[test]
    fn test_split_key_value() {
        assert_eq!(split_key_value("a=b"), Some(("a", "b")));
        assert_eq!(split_key_value("a:b=c"), Some(("a", "b=c")));
        assert_eq!(split_key_value("a=b:c"), Some(("a", "b:c")));
        assert_eq!(split_key_value("abc"), None);
    }
}
