//! # Timing Collaborators
//!
//! Fitting a note needs two external tables belonging to the voicebank:
//!
//! - the timing table, mapping an alias to its recorded sample offsets
//! - the prefix table, mapping a note number to an alias prefix and suffix
//!
//! Reading those tables from disk is the caller's business. This module
//! defines the lookup seams ([`TimingLookup`], [`PrefixLookup`]), simple
//! in-memory tables implementing them, and blanket impls so a closure can
//! stand in for either table.

use std::collections::HashMap;

/// One entry of a voicebank timing table. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingRecord {
    /// Directory of the sample, relative to the voicebank root. Empty for the root.
    pub subdir: String,
    /// Sample file name.
    pub filename: String,
    pub alias: String,
    /// Left blank.
    pub offset: f64,
    pub preutterance: f64,
    pub overlap: f64,
    /// Fixed (consonant) range.
    pub consonant: f64,
    /// Right blank; positive from the sample end, negative from the offset.
    pub blank: f64,
}

impl TimingRecord {
    /// Sample path relative to the voicebank root, joined with `\\` as
    /// project files spell it.
    pub fn sample_path(&self) -> String {
        let subdir = self.subdir.trim_end_matches(['/', '\\']);
        if subdir.is_empty() {
            self.filename.clone()
        } else {
            format!("{}\\{}", subdir, self.filename)
        }
    }
}

/// Alias → timing record.
pub trait TimingLookup {
    fn lookup(&self, alias: &str) -> Option<TimingRecord>;
}

/// Note number → `(prefix, suffix)`; both empty when nothing applies.
pub trait PrefixLookup {
    fn lookup(&self, note_num: i32) -> (String, String);
}

impl<F> TimingLookup for F
where
    F: Fn(&str) -> Option<TimingRecord>,
{
    fn lookup(&self, alias: &str) -> Option<TimingRecord> {
        self(alias)
    }
}

impl<F> PrefixLookup for F
where
    F: Fn(i32) -> (String, String),
{
    fn lookup(&self, note_num: i32) -> (String, String) {
        self(note_num)
    }
}

/// In-memory timing table keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct TimingTable {
    records: HashMap<String, TimingRecord>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record under its alias. The first record for an alias wins.
    pub fn insert(&mut self, record: TimingRecord) {
        self.records.entry(record.alias.clone()).or_insert(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.records.contains_key(alias)
    }
}

impl FromIterator<TimingRecord> for TimingTable {
    fn from_iter<I: IntoIterator<Item = TimingRecord>>(iter: I) -> Self {
        let mut table = TimingTable::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

impl TimingLookup for TimingTable {
    fn lookup(&self, alias: &str) -> Option<TimingRecord> {
        self.records.get(alias).cloned()
    }
}

/// In-memory prefix table keyed by note number.
#[derive(Debug, Clone, Default)]
pub struct PrefixTable {
    entries: HashMap<i32, (String, String)>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note_num: i32, prefix: impl Into<String>, suffix: impl Into<String>) {
        self.entries.insert(note_num, (prefix.into(), suffix.into()));
    }
}

impl PrefixLookup for PrefixTable {
    fn lookup(&self, note_num: i32) -> (String, String) {
        self.entries.get(&note_num).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alias: &str, pre: f64) -> TimingRecord {
        TimingRecord {
            filename: format!("{}.wav", alias),
            alias: alias.to_string(),
            preutterance: pre,
            ..TimingRecord::default()
        }
    }

    #[test]
    fn test_first_record_for_alias_wins() {
        let table: TimingTable = vec![record("a", 10.0), record("a", 20.0), record("i", 5.0)]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("a").unwrap().preutterance, 10.0);
        assert!(table.lookup("u").is_none());
    }

    #[test]
    fn test_sample_path() {
        let mut r = record("a", 0.0);
        assert_eq!(r.sample_path(), "a.wav");
        r.subdir = "C4/".to_string();
        assert_eq!(r.sample_path(), "C4\\a.wav");
        r.subdir = "C4".to_string();
        assert_eq!(r.sample_path(), "C4\\a.wav");
    }

    #[test]
    fn test_prefix_table_defaults_to_empty() {
        let mut table = PrefixTable::new();
        table.insert(60, "", "↑");
        assert_eq!(table.lookup(60), (String::new(), "↑".to_string()));
        assert_eq!(table.lookup(61), (String::new(), String::new()));
    }

    #[test]
    fn test_closures_act_as_lookups() {
        let timing = |alias: &str| (alias == "a").then(|| record("a", 1.0));
        assert!(TimingLookup::lookup(&timing, "a").is_some());
        let prefix = |n: i32| (format!("{}", n), String::new());
        assert_eq!(PrefixLookup::lookup(&prefix, 3).0, "3");
    }
}
