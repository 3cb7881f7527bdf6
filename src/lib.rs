pub mod document;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod note;
pub mod parser;
pub mod settings;
pub mod timing;
pub mod writer;

pub use document::{Document, Header, HeaderField};
pub use entry::*;
pub use error::*;
pub use note::{Field, FitContext, Note, SectionId};
pub use settings::{LineEnding, Settings};
pub use timing::{PrefixLookup, PrefixTable, TimingLookup, TimingRecord, TimingTable};

use std::path::Path;

/// Load a project file and fit every note against a voicebank.
/// This is the main entry point for the library.
pub fn load_and_fit<P: AsRef<Path>>(
    path: P,
    settings: &Settings,
    timing: &dyn TimingLookup,
    prefix: &dyn PrefixLookup,
) -> Result<Document, UstError> {
    let mut doc = Document::load_file(path, settings)?;
    doc.fit_all(timing, prefix)?;
    Ok(doc)
}

/// Re-encode a project through a load/save cycle (useful for normalizing
/// whitespace, separators and number formatting)
pub fn normalize(bytes: &[u8], settings: &Settings) -> Result<Vec<u8>, UstError> {
    Document::load(bytes, settings)?.save()
}
