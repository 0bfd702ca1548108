//! Recursive search over a decoded tree.
//!
//! Traversal is depth-first in ascending index order. With recursion enabled
//! (the default), composite elements are never candidates themselves: a
//! DataContainer contributes its owned sequence and a DataParent its single
//! child, and matches surface from the recursion instead.

use crate::element::{Element, ElementError, ElementKind};
use crate::tree::FlightData;
use std::collections::btree_map;
use std::iter;
use std::slice;

/// A configured search over one [`FlightData`] tree.
///
/// Built via [`FlightData::query`]; filters and the predicate are optional
/// and combine with AND. [`Query::iter`] is the lazy form; [`Query::find`]
/// and [`Query::find_all`] share its exact traversal and filter semantics.
pub struct Query<'a> {
    tree: &'a FlightData,
    kinds: Vec<ElementKind>,
    predicate: Option<Box<dyn Fn(&Element) -> bool + 'a>>,
    recursive: bool,
}

impl<'a> Query<'a> {
    pub(crate) fn new(tree: &'a FlightData) -> Self {
        Self {
            tree,
            kinds: Vec::new(),
            predicate: None,
            recursive: true,
        }
    }

    /// Restrict matches to the given kinds. Extends any filter set so far.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Restrict matches by variant names, resolved through the fixed name
    /// table. An unresolvable name fails with
    /// [`ElementError::UnknownVariant`].
    pub fn kind_names<S: AsRef<str>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self, ElementError> {
        for name in names {
            self.kinds.push(ElementKind::from_name(name.as_ref())?);
        }
        Ok(self)
    }

    /// Restrict matches with an arbitrary predicate.
    pub fn predicate(mut self, predicate: impl Fn(&Element) -> bool + 'a) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Control descent into composite elements. Defaults to true.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Lazily iterate matching elements.
    pub fn iter(&self) -> Matches<'_, 'a> {
        Matches {
            query: self,
            stack: vec![Frame::Top(self.tree.values())],
        }
    }

    /// First matching element, if any.
    pub fn find(&self) -> Option<&'a Element> {
        self.iter().next()
    }

    /// All matching elements, in traversal order.
    pub fn find_all(&self) -> Vec<&'a Element> {
        self.iter().collect()
    }

    fn matches(&self, element: &Element) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&element.kind()) {
            return false;
        }
        match &self.predicate {
            Some(predicate) => predicate(element),
            None => true,
        }
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("kinds", &self.kinds)
            .field("predicate", &self.predicate.is_some())
            .field("recursive", &self.recursive)
            .finish()
    }
}

/// One traversal level: the top-level tree, a container's sequence, or a
/// parent's single child.
enum Frame<'a> {
    Top(btree_map::Values<'a, u64, Element>),
    Seq(slice::Iter<'a, Element>),
    One(iter::Once<&'a Element>),
}

impl<'a> Iterator for Frame<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Frame::Top(it) => it.next(),
            Frame::Seq(it) => it.next(),
            Frame::One(it) => it.next(),
        }
    }
}

/// Lazy iterator over query matches.
pub struct Matches<'q, 'a> {
    query: &'q Query<'a>,
    stack: Vec<Frame<'a>>,
}

impl<'q, 'a> Iterator for Matches<'q, 'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.last_mut() {
            let Some(element) = frame.next() else {
                self.stack.pop();
                continue;
            };
            if self.query.recursive {
                match element.kind() {
                    ElementKind::DataContainer => {
                        if let Some(items) = element.elements() {
                            self.stack.push(Frame::Seq(items.iter()));
                        }
                        continue;
                    }
                    ElementKind::DataParent => {
                        if let Some(child) = element.children() {
                            self.stack.push(Frame::One(iter::once(child)));
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            if self.query.matches(element) {
                return Some(element);
            }
        }
        None
    }
}
