//! Closed enumerations stored as small integers
//!
//! Note statuses and comment ratings are both "choices": a fixed set of variants, each with a
//! numeric value used by storage and the query string, and a display label used by the
//! representations.

use std::collections::BTreeSet;
use std::fmt::Debug;

/// A closed enumeration with a numeric value and a display label per variant
pub trait Choice: Copy + Ord + Debug + Send + Sync + 'static {
    /// All variants, in value order
    const ALL: &'static [Self];

    /// Numeric value of the variant
    fn value(self) -> i16;

    /// Human readable label of the variant
    fn display(self) -> &'static str;

    /// Find the variant for a numeric value
    fn from_value(value: i64) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|choice| i64::from(choice.value()) == value)
    }

    /// Parse a variant from its textual (query string) value
    ///
    /// Only the plain decimal spelling matches: `1`, never `01`, `+1` or ` 1`
    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|choice| choice.value().to_string() == raw)
    }
}

/// Message used when a value is not part of a choice
pub fn invalid_choice_message(raw: &str) -> String {
    format!(r#""{raw}" is not a valid choice."#)
}

/// A multi-value filter over a choice
///
/// An empty set of requested values means "no filter"
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChoiceFilter<C: Choice> {
    /// Accept every variant
    Any,

    /// Accept only the given variants
    OneOf(BTreeSet<C>),
}

impl<C: Choice> ChoiceFilter<C> {
    /// Build a filter from already validated values
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let values = values.into_iter().collect::<BTreeSet<C>>();

        if values.is_empty() {
            Self::Any
        } else {
            Self::OneOf(values)
        }
    }

    /// Does the filter accept this variant?
    pub fn accepts(&self, choice: C) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(values) => values.contains(&choice),
        }
    }

    /// The numeric values to restrict on, `None` when everything is accepted
    pub fn values(&self) -> Option<Vec<i16>> {
        match self {
            Self::Any => None,
            Self::OneOf(values) => Some(values.iter().map(|choice| choice.value()).collect()),
        }
    }
}

impl<C: Choice> Default for ChoiceFilter<C> {
    fn default() -> Self {
        Self::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NoteStatus;

    #[test]
    fn test_parse_choice() {
        assert_eq!(Some(NoteStatus::Executed), NoteStatus::parse("1"));
        assert_eq!(Some(NoteStatus::Active), NoteStatus::parse("0"));
        assert_eq!(None, NoteStatus::parse(" 0 "));
        assert_eq!(None, NoteStatus::parse("01"));
        assert_eq!(None, NoteStatus::parse("+1"));
        assert_eq!(None, NoteStatus::parse("100"));
        assert_eq!(None, NoteStatus::parse("big"));
        assert_eq!(None, NoteStatus::parse("-1"));
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = ChoiceFilter::<NoteStatus>::from_values(Vec::new());

        assert_eq!(ChoiceFilter::Any, filter);
        assert!(NoteStatus::ALL.iter().all(|status| filter.accepts(*status)));
        assert_eq!(None, filter.values());
    }

    #[test]
    fn test_filter_restricts() {
        let filter = ChoiceFilter::from_values([NoteStatus::Postponed, NoteStatus::Active]);

        assert!(filter.accepts(NoteStatus::Active));
        assert!(!filter.accepts(NoteStatus::Executed));
        assert_eq!(Some(vec![0, 2]), filter.values());
    }
}
