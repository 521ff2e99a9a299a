//! Path-aware traversal of document trees.
//!
//! Leaves are scalars and encrypted scalars. They are visited in document
//! order, which is also the order the integrity tag covers them in.

use sealcfg_document::{Branch, Value};
use std::fmt;

/// One step from a branch root to a leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a leaf inside its branch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafPath {
    segments: Vec<PathSegment>,
}

impl LeafPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The nearest enclosing mapping key.
    pub fn local_key(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|segment| match segment {
            PathSegment::Key(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    /// Associated data for the leaf: every segment followed by `:`.
    ///
    /// Keys escape `\` and `:` with a backslash, and a key made only of
    /// digits gets a leading backslash, so no two distinct paths share
    /// the same associated data.
    pub fn aad(&self) -> String {
        self.to_string()
    }

    fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    fn pop(&mut self) {
        self.segments.pop();
    }
}

impl fmt::Display for LeafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
                        f.write_str("\\")?;
                    }
                    for c in key.chars() {
                        if matches!(c, '\\' | ':') {
                            f.write_str("\\")?;
                        }
                        write!(f, "{c}")?;
                    }
                    f.write_str(":")?;
                }
                PathSegment::Index(i) => write!(f, "{i}:")?,
            }
        }
        Ok(())
    }
}

/// Called once per leaf with mutable access.
pub trait LeafVisitorMut {
    type Error;

    fn visit_leaf(&mut self, path: &LeafPath, value: &mut Value) -> Result<(), Self::Error>;
}

impl<F, E> LeafVisitorMut for F
where
    F: FnMut(&LeafPath, &mut Value) -> Result<(), E>,
{
    type Error = E;

    fn visit_leaf(&mut self, path: &LeafPath, value: &mut Value) -> Result<(), E> {
        self(path, value)
    }
}

/// Called once per leaf with shared access.
pub trait LeafVisitor {
    type Error;

    fn visit_leaf(&mut self, path: &LeafPath, value: &Value) -> Result<(), Self::Error>;
}

impl<F, E> LeafVisitor for F
where
    F: FnMut(&LeafPath, &Value) -> Result<(), E>,
{
    type Error = E;

    fn visit_leaf(&mut self, path: &LeafPath, value: &Value) -> Result<(), E> {
        self(path, value)
    }
}

/// Visits every leaf of every branch, allowing replacement.
pub fn walk_mut<V: LeafVisitorMut>(branches: &mut [Branch], visitor: &mut V) -> Result<(), V::Error> {
    let mut path = LeafPath::default();
    for branch in branches {
        for item in &mut branch.items {
            path.push(PathSegment::Key(item.key.clone()));
            walk_value_mut(&mut item.value, &mut path, visitor)?;
            path.pop();
        }
    }
    Ok(())
}

fn walk_value_mut<V: LeafVisitorMut>(
    value: &mut Value,
    path: &mut LeafPath,
    visitor: &mut V,
) -> Result<(), V::Error> {
    match value {
        Value::Scalar(_) | Value::Encrypted(_) => visitor.visit_leaf(path, value),
        Value::Sequence(values) => {
            for (index, child) in values.iter_mut().enumerate() {
                path.push(PathSegment::Index(index));
                walk_value_mut(child, path, visitor)?;
                path.pop();
            }
            Ok(())
        }
        Value::Mapping(items) => {
            for item in items {
                path.push(PathSegment::Key(item.key.clone()));
                walk_value_mut(&mut item.value, path, visitor)?;
                path.pop();
            }
            Ok(())
        }
    }
}

/// Visits every leaf of every branch.
pub fn walk<V: LeafVisitor>(branches: &[Branch], visitor: &mut V) -> Result<(), V::Error> {
    let mut path = LeafPath::default();
    for branch in branches {
        for item in &branch.items {
            path.push(PathSegment::Key(item.key.clone()));
            walk_value(&item.value, &mut path, visitor)?;
            path.pop();
        }
    }
    Ok(())
}

fn walk_value<V: LeafVisitor>(value: &Value, path: &mut LeafPath, visitor: &mut V) -> Result<(), V::Error> {
    match value {
        Value::Scalar(_) | Value::Encrypted(_) => visitor.visit_leaf(path, value),
        Value::Sequence(values) => {
            for (index, child) in values.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk_value(child, path, visitor)?;
                path.pop();
            }
            Ok(())
        }
        Value::Mapping(items) => {
            for item in items {
                path.push(PathSegment::Key(item.key.clone()));
                walk_value(&item.value, path, visitor)?;
                path.pop();
            }
            Ok(())
        }
    }
}
