//! The decoded element tree.
//!
//! [`FlightData`] maps record indices to resolved elements. It is built once
//! per decode pass and read-only afterwards; a fresh decode produces a fresh
//! tree. Composite elements own their children directly, so nested payloads
//! are reachable only by traversal, never by top-level lookup.

use crate::element::{Element, ElementError, ElementRecord};
use crate::query::Query;
use std::collections::BTreeMap;

/// Index -> element mapping produced by one decode pass.
///
/// Records with an empty index field accumulate separately in stream order
/// (`anonymous`); whether multiple anonymous records are legitimate output or
/// a stream-format quirk is an open question, so all of them are kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlightData {
    entries: BTreeMap<u64, Element>,
    anonymous: Vec<Element>,
}

impl FlightData {
    /// Build a tree from already-resolved elements.
    pub fn from_elements(entries: impl IntoIterator<Item = (u64, Element)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            anonymous: Vec::new(),
        }
    }

    /// Rebuild a tree from flat serialized records, re-resolving each one.
    pub fn from_records(
        records: impl IntoIterator<Item = (u64, ElementRecord)>,
    ) -> Result<Self, ElementError> {
        let entries = records
            .into_iter()
            .map(|(index, record)| Ok((index, Element::from_record(record)?)))
            .collect::<Result<BTreeMap<_, _>, ElementError>>()?;
        Ok(Self {
            entries,
            anonymous: Vec::new(),
        })
    }

    /// Insert during decoding. Concrete indices overwrite (last write wins);
    /// anonymous records append.
    pub(crate) fn insert(&mut self, index: Option<u64>, element: Element) {
        match index {
            Some(index) => {
                self.entries.insert(index, element);
            }
            None => self.anonymous.push(element),
        }
    }

    /// Look up a top-level record by index.
    pub fn get(&self, index: u64) -> Option<&Element> {
        self.entries.get(&index)
    }

    /// Iterate top-level records in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Element)> {
        self.entries.iter().map(|(&index, element)| (index, element))
    }

    pub(crate) fn values(&self) -> std::collections::btree_map::Values<'_, u64, Element> {
        self.entries.values()
    }

    /// Number of top-level records (anonymous records not included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.anonymous.is_empty()
    }

    /// Records that arrived with an empty index field, in stream order.
    pub fn anonymous(&self) -> &[Element] {
        &self.anonymous
    }

    /// Start a query over this tree.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Dump every top-level record in flat serialized form.
    pub fn to_records(&self) -> BTreeMap<u64, ElementRecord> {
        self.entries
            .iter()
            .map(|(&index, element)| (index, element.to_record()))
            .collect()
    }
}
