//! # Writer
//!
//! Renders a [`Document`] back to project text. Entries are written with
//! their own formatting, in field order, followed by the lines the parser
//! kept verbatim. A kept line is dropped once its key's entry has a value,
//! so a malformed line that was later fixed through a setter is not
//! written twice.

use std::fmt::Write as _;

use crate::document::{Document, Header, HeaderField};
use crate::note::{ExtraLine, Field, Note, SectionId};

struct Lines<'a> {
    out: String,
    eol: &'a str,
}

impl<'a> Lines<'a> {
    fn new(eol: &'a str) -> Self {
        Lines {
            out: String::new(),
            eol,
        }
    }

    fn line(&mut self, text: impl std::fmt::Display) {
        // writing into a String cannot fail
        let _ = write!(self.out, "{}{}", text, self.eol);
    }

    fn pair(&mut self, key: &str, value: impl std::fmt::Display) {
        let _ = write!(self.out, "{}={}{}", key, value, self.eol);
    }
}

/// Full project text.
pub fn write_document(doc: &Document, eol: &str) -> String {
    let mut lines = Lines::new(eol);
    write_header(&mut lines, &doc.header);
    for note in doc.notes() {
        write_note(&mut lines, note, false);
    }
    if doc.track_end {
        lines.line("[#TRACKEND]");
    }
    lines.out
}

/// Plugin output: note sections with updated entries only. `@` keys are
/// never written.
pub fn write_changes(doc: &Document, eol: &str) -> String {
    let mut lines = Lines::new(eol);
    for note in doc.notes() {
        write_note(&mut lines, note, true);
    }
    lines.out
}

fn write_header(lines: &mut Lines<'_>, header: &Header) {
    if header.version.has_value() || header.charset.has_value() || !header.version_extras.is_empty() {
        lines.line("[#VERSION]");
        if header.version.has_value() {
            lines.line(format_args!("UST Version{}", header.version));
        }
        if header.charset.has_value() {
            lines.pair("Charset", &header.charset);
        }
        write_extras(lines, &header.version_extras, |_| false);
    }

    lines.line("[#SETTING]");
    for field in HeaderField::ALL {
        let entry = header.entry(field);
        if entry.has_value() {
            lines.pair(field.key(), entry);
        }
    }
    write_extras(lines, &header.extras, |key| {
        HeaderField::from_key(key).is_some_and(|field| header.entry(field).has_value())
    });
}

fn write_note(lines: &mut Lines<'_>, note: &Note, changes_only: bool) {
    lines.line(format_args!("[{}]", note.id));
    if changes_only && note.id == SectionId::Delete {
        return;
    }
    for field in Field::ALL {
        if changes_only && field.is_derived() {
            continue;
        }
        let entry = note.entry(field);
        if entry.has_value() && (!changes_only || entry.is_updated()) {
            lines.pair(field.key(), entry);
        }
    }
    if changes_only {
        return;
    }
    write_extras(lines, note.extras(), |key| {
        Field::from_key(key).is_some_and(|field| note.entry(field).has_value())
    });
}

fn write_extras(lines: &mut Lines<'_>, extras: &[ExtraLine], superseded: impl Fn(&str) -> bool) {
    for extra in extras {
        if !superseded(&extra.key) {
            lines.line(&extra.line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn load(text: &str) -> Document {
        Document::load(text.as_bytes(), &Settings::default()).unwrap()
    }

    #[test]
    fn test_write_new_document() {
        let mut doc = Document::new();
        doc.header.tempo.init(120.0).unwrap();
        let mut note = Note::new();
        note.length.init(480);
        note.lyric.init("あ");
        note.note_num.init(60);
        doc.push_note(note);
        assert_eq!(
            write_document(&doc, "\n"),
            "[#VERSION]\nUST Version1.2\n[#SETTING]\nTempo=120.00\n[#0000]\nLength=480\nLyric=あ\nNoteNum=60\n[#TRACKEND]\n"
        );
    }

    #[test]
    fn test_extras_follow_fields() {
        let doc = load("[#SETTING]\nTracks=1\nTempo=120\n[#0000]\nFoo=1\nLyric=a\n[#TRACKEND]\n");
        assert_eq!(
            write_document(&doc, "\n"),
            "[#SETTING]\nTempo=120.00\nTracks=1\n[#0000]\nLyric=a\nFoo=1\n[#TRACKEND]\n"
        );
    }

    #[test]
    fn test_fixed_value_supersedes_kept_line() {
        let mut doc = load("[#SETTING]\n[#0000]\nLength=long\n");
        assert!(write_document(&doc, "\n").contains("Length=long"));
        doc.note_mut(0).unwrap().length.set(240);
        let text = write_document(&doc, "\n");
        assert!(text.contains("Length=240"));
        assert!(!text.contains("Length=long"));
    }

    #[test]
    fn test_changes_only() {
        let mut doc = load("[#SETTING]\n[#PREV]\nLyric=a\n[#0003]\nLyric=b\nLength=480\n[#DELETE]\nLyric=c\n[#NEXT]\nLyric=d\n");
        {
            let note = doc.note_mut(1).unwrap();
            note.lyric.set("x");
        }
        doc.note_mut(2).unwrap().lyric.set("y");
        assert_eq!(
            write_changes(&doc, "\r\n"),
            "[#PREV]\r\n[#0003]\r\nLyric=x\r\n[#DELETE]\r\n[#NEXT]\r\n"
        );
    }
}
