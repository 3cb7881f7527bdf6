//! Delimiter-joined list entries.
//!
//! A list is stored fully expanded. In its text form a reserved placeholder
//! token stands for "the previous value of this list", so `3,#,#,5,#` reads
//! as `[3, 3, 3, 5, 5]`. Formatting compresses every item that equals its
//! predecessor back into the placeholder, which makes compressed text
//! round-trip exactly.
//!
//! A leading placeholder repeats the list's *base* value. The base is only
//! known when the caller supplies one through
//! [`ListEntry::init_from_str_with_base`]; without it a leading placeholder
//! is a format error.

use std::fmt;

use super::scalar::{parse_float, parse_int};
use super::EntryState;
use crate::error::UstError;

/// Default item delimiter.
pub const LIST_SEPARATOR: char = ',';

/// Default "same as previous" token.
pub const REPEAT_PLACEHOLDER: &str = "#";

/// An item type that can live in a [`ListEntry`].
pub trait ListItem: Clone + PartialEq + fmt::Debug {
    fn parse_item(text: &str) -> Result<Self, UstError>;
    fn format_item(&self) -> String;
}

impl ListItem for i32 {
    fn parse_item(text: &str) -> Result<Self, UstError> {
        parse_int(text)
    }

    fn format_item(&self) -> String {
        self.to_string()
    }
}

impl ListItem for f64 {
    fn parse_item(text: &str) -> Result<Self, UstError> {
        parse_float(text)
    }

    // Shortest representation that parses back to the same value.
    fn format_item(&self) -> String {
        self.to_string()
    }
}

/// Interpolation between two pitch-bend control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveShape {
    /// Half cosine from -pi to 0 (written as an empty token)
    #[default]
    SCurve,
    /// Straight line (`s`)
    Linear,
    /// Quarter sine, fast start (`r`)
    EaseOut,
    /// Quarter cosine, slow start (`j`)
    EaseIn,
}

impl CurveShape {
    pub fn token(&self) -> &'static str {
        match self {
            CurveShape::SCurve => "",
            CurveShape::Linear => "s",
            CurveShape::EaseOut => "r",
            CurveShape::EaseIn => "j",
        }
    }
}

impl ListItem for CurveShape {
    fn parse_item(text: &str) -> Result<Self, UstError> {
        match text.trim() {
            "" => Ok(CurveShape::SCurve),
            "s" => Ok(CurveShape::Linear),
            "r" => Ok(CurveShape::EaseOut),
            "j" => Ok(CurveShape::EaseIn),
            _ => Err(UstError::format(format!("{} is not '',s,r,j", text))),
        }
    }

    fn format_item(&self) -> String {
        self.token().to_string()
    }
}

/// Ordered list of validated items.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry<T: ListItem> {
    values: Vec<T>,
    base: Option<T>,
    separator: char,
    placeholder: &'static str,
    state: EntryState,
}

impl<T: ListItem> Default for ListEntry<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            base: None,
            separator: LIST_SEPARATOR,
            placeholder: REPEAT_PLACEHOLDER,
            state: EntryState::default(),
        }
    }
}

impl<T: ListItem> ListEntry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(separator: char, placeholder: &'static str) -> Self {
        Self {
            separator,
            placeholder,
            ..Self::default()
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    /// Value a leading placeholder stood for, if one was supplied.
    pub fn base(&self) -> Option<&T> {
        self.base.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.state.has_value
    }

    pub fn is_updated(&self) -> bool {
        self.state.is_updated
    }

    pub fn init(&mut self, values: Vec<T>) {
        self.values = values;
        self.base = None;
        self.state.loaded();
    }

    pub fn set_values(&mut self, values: Vec<T>) {
        self.values = values;
        self.base = None;
        self.state.updated();
    }

    pub fn init_from_str(&mut self, text: &str) -> Result<(), UstError> {
        self.init_from_str_with_base(text, None)
    }

    /// Parse `text`, letting leading placeholders repeat `base`.
    pub fn init_from_str_with_base(&mut self, text: &str, base: Option<T>) -> Result<(), UstError> {
        let values = self.expand(text, base.as_ref())?;
        self.values = values;
        self.base = base;
        self.state.loaded();
        Ok(())
    }

    pub fn set_from_str(&mut self, text: &str) -> Result<(), UstError> {
        let values = self.expand(text, None)?;
        self.values = values;
        self.base = None;
        self.state.updated();
        Ok(())
    }

    fn expand(&self, text: &str, base: Option<&T>) -> Result<Vec<T>, UstError> {
        let mut values: Vec<T> = Vec::new();
        for token in text.split(self.separator) {
            if token.trim() == self.placeholder {
                let previous = values.last().or(base).cloned().ok_or_else(|| {
                    UstError::format(format!(
                        "{} has a leading '{}' with no value to repeat",
                        text, self.placeholder
                    ))
                })?;
                values.push(previous);
            } else {
                values.push(T::parse_item(token)?);
            }
        }
        Ok(values)
    }

    pub fn append(&mut self, value: T) {
        self.values.push(value);
        self.state.updated();
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<(), UstError> {
        if index > self.values.len() {
            return Err(UstError::BoundsError {
                index,
                len: self.values.len(),
            });
        }
        self.values.insert(index, value);
        self.state.updated();
        Ok(())
    }

    pub fn pop(&mut self, index: usize) -> Result<T, UstError> {
        if index >= self.values.len() {
            return Err(UstError::BoundsError {
                index,
                len: self.values.len(),
            });
        }
        let value = self.values.remove(index);
        self.state.updated();
        Ok(value)
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), UstError> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(UstError::BoundsError { index, len })?;
        *slot = value;
        self.state.updated();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.base = None;
        self.state.cleared();
    }
}

impl<T: ListItem> fmt::Display for ListEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous = self.base.as_ref();
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separator)?;
            }
            if previous == Some(value) {
                f.write_str(self.placeholder)?;
            } else {
                f.write_str(&value.format_item())?;
            }
            previous = Some(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_from_str() {
        let mut e: ListEntry<i32> = ListEntry::new();
        e.init_from_str("1,2,3").unwrap();
        assert_eq!(e.values(), &[1, 2, 3]);
        assert!(e.has_value());
        assert!(!e.is_updated());
        assert_eq!(e.to_string(), "1,2,3");
    }

    #[test]
    fn test_placeholder_expands_from_base() {
        let mut e: ListEntry<i32> = ListEntry::new();
        e.init_from_str_with_base("#,#,5,#", Some(3)).unwrap();
        assert_eq!(e.values(), &[3, 3, 5, 5]);
        assert_eq!(e.to_string(), "#,#,5,#");
    }

    #[test]
    fn test_placeholder_repeats_previous_in_list() {
        let mut e: ListEntry<f64> = ListEntry::new();
        e.init_from_str("1.5,#,#,-2,#,0").unwrap();
        assert_eq!(e.values(), &[1.5, 1.5, 1.5, -2.0, -2.0, 0.0]);
        assert_eq!(e.to_string(), "1.5,#,#,-2,#,0");
    }

    #[test]
    fn test_leading_placeholder_without_base_fails() {
        let mut e: ListEntry<i32> = ListEntry::new();
        assert!(matches!(
            e.init_from_str("#,1"),
            Err(UstError::FormatError { .. })
        ));
        assert!(!e.has_value());
    }

    #[test]
    fn test_bad_item_leaves_entry_untouched() {
        let mut e: ListEntry<i32> = ListEntry::new();
        e.init_from_str("1,2").unwrap();
        let err = e.init_from_str("a,b").unwrap_err();
        assert_eq!(err.to_string(), "Format error at line 0: a is not int");
        assert_eq!(e.values(), &[1, 2]);
    }

    #[test]
    fn test_edit_operations_check_bounds() {
        let mut e: ListEntry<i32> = ListEntry::new();
        e.init(vec![1, 2, 3]);

        e.append(4);
        assert_eq!(e.to_string(), "1,2,3,4");
        assert!(e.is_updated());

        e.insert(2, 9).unwrap();
        assert_eq!(e.values(), &[1, 2, 9, 3, 4]);
        assert!(matches!(
            e.insert(9, 0),
            Err(UstError::BoundsError { index: 9, len: 5 })
        ));

        assert_eq!(e.pop(0).unwrap(), 1);
        assert!(e.pop(4).is_err());

        e.set(0, 7).unwrap();
        assert_eq!(e.values(), &[7, 9, 3, 4]);
        assert!(matches!(e.set(4, 1), Err(UstError::BoundsError { .. })));
    }

    #[test]
    fn test_curve_shapes() {
        let mut e: ListEntry<CurveShape> = ListEntry::new();
        e.init_from_str(",s,r,j").unwrap();
        assert_eq!(
            e.values(),
            &[
                CurveShape::SCurve,
                CurveShape::Linear,
                CurveShape::EaseOut,
                CurveShape::EaseIn
            ]
        );
        assert_eq!(e.to_string(), ",s,r,j");

        let err = e.init_from_str("a,b").unwrap_err();
        assert_eq!(err.to_string(), "Format error at line 0: a is not '',s,r,j");
    }

    #[test]
    fn test_custom_separator() {
        let mut e: ListEntry<i32> = ListEntry::with_format(' ', "*");
        e.init_from_str("4 * 5").unwrap();
        assert_eq!(e.values(), &[4, 4, 5]);
        assert_eq!(e.to_string(), "4 * 5");
    }
}
