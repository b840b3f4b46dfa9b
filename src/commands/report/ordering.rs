//! Composite comparators built from an ordered list of sort keys.
//!
//! Each key extracts one value and carries its own direction. Undefined
//! numeric values always sort after every defined value, whatever the
//! direction, so a statistic without evidence can never outrank one with
//! evidence.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue<'a> {
    Number(Option<f64>),
    Text(&'a str),
}

pub struct SortKey<T> {
    pub name: &'static str,
    pub direction: Direction,
    pub extract: for<'a> fn(&'a T) -> KeyValue<'a>,
}

impl<T> SortKey<T> {
    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        compare_values((self.extract)(left), (self.extract)(right), self.direction)
    }
}

fn compare_values(left: KeyValue<'_>, right: KeyValue<'_>, direction: Direction) -> Ordering {
    let ordered = |ordering: Ordering| match direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    };

    match (left, right) {
        (KeyValue::Number(Some(left)), KeyValue::Number(Some(right))) => {
            ordered(left.total_cmp(&right))
        }
        (KeyValue::Number(Some(_)), KeyValue::Number(None)) => Ordering::Less,
        (KeyValue::Number(None), KeyValue::Number(Some(_))) => Ordering::Greater,
        (KeyValue::Number(None), KeyValue::Number(None)) => Ordering::Equal,
        (KeyValue::Text(left), KeyValue::Text(right)) => ordered(left.cmp(right)),
        // Keys never mix kinds for the same extractor.
        _ => Ordering::Equal,
    }
}

/// Lexicographic comparison over `keys`: later keys only break ties left
/// by earlier ones.
pub fn compare_by<T>(keys: &[SortKey<T>], left: &T, right: &T) -> Ordering {
    keys.iter().fold(Ordering::Equal, |ordering, key| {
        ordering.then_with(|| key.compare(left, right))
    })
}

/// Name of the first key that separates `left` from `right`, if any.
pub fn deciding_key<T>(keys: &[SortKey<T>], left: &T, right: &T) -> Option<&'static str> {
    keys.iter()
        .find(|key| key.compare(left, right) != Ordering::Equal)
        .map(|key| key.name)
}
