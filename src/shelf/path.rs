//! Dotted/bracketed addressing into JSON-like trees.
//!
//! `web.client_id` walks two object keys, `items[0].name` walks a key, an
//! array index and another key. Rendering a parsed path gives back the same
//! text for every path produced by the flattener.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::error::ShelfError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A path segment that could not be followed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldResolutionError {
    #[error("`{0}` is absent")]
    Missing(String),
    #[error("`{0}` is not a container")]
    NotContainer(String),
    #[error("empty path")]
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `a.b[0].c`. Parsing never fails: a part whose brackets are not
    /// well-formed indices is kept as a literal key.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        for part in raw.split('.') {
            match split_indices(part) {
                Some((name, indices)) => {
                    if !name.is_empty() || indices.is_empty() {
                        segments.push(Segment::Key(name.to_string()));
                    }
                    segments.extend(indices.into_iter().map(Segment::Index));
                }
                None => segments.push(Segment::Key(part.to_string())),
            }
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn child(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Key(key.to_string()));
        next
    }

    pub fn index(&self, i: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(i));
        next
    }

    /// Follow the path from an object root.
    pub fn get<'a>(&self, root: &'a Map<String, Value>) -> Result<&'a Value, FieldResolutionError> {
        let (first, rest) = match self.segments.split_first() {
            Some((Segment::Key(k), rest)) => (k, rest),
            Some((Segment::Index(i), _)) => {
                return Err(FieldResolutionError::NotContainer(format!("[{i}]")))
            }
            None => return Err(FieldResolutionError::Empty),
        };
        let mut current = root
            .get(first)
            .ok_or_else(|| FieldResolutionError::Missing(first.clone()))?;
        for seg in rest {
            current = match (seg, current) {
                (Segment::Key(k), Value::Object(map)) => map
                    .get(k)
                    .ok_or_else(|| FieldResolutionError::Missing(k.clone()))?,
                (Segment::Index(i), Value::Array(items)) => items
                    .get(*i)
                    .ok_or_else(|| FieldResolutionError::Missing(format!("[{i}]")))?,
                (seg, _) => return Err(FieldResolutionError::NotContainer(seg.to_string())),
            };
        }
        Ok(current)
    }

    /// Write `value` at this path, creating intermediate objects and arrays.
    /// A scalar sitting where a container is needed gets replaced. An index
    /// may address an existing element or append one; anything further out
    /// is rejected.
    pub fn set(&self, root: &mut Map<String, Value>, value: Value) -> Result<(), ShelfError> {
        let Some((Segment::Key(first), rest)) = self.segments.split_first() else {
            return Err(ShelfError::Invalid(format!("`{self}` must start with a key")));
        };
        if rest.is_empty() {
            root.insert(first.clone(), value);
            return Ok(());
        }
        let slot = root
            .entry(first.clone())
            .or_insert_with(|| empty_container_for(&rest[0]));
        set_in(slot, rest, value).map_err(|e| ShelfError::Invalid(format!("{self}: {e}")))
    }
}

fn set_in(slot: &mut Value, path: &[Segment], value: Value) -> Result<(), String> {
    let Some((seg, rest)) = path.split_first() else {
        *slot = value;
        return Ok(());
    };
    if matches!(seg, Segment::Key(_)) && !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if matches!(seg, Segment::Index(_)) && !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    let next = match (seg, slot) {
        (Segment::Key(k), Value::Object(map)) => map.entry(k.clone()).or_insert(Value::Null),
        (Segment::Index(i), Value::Array(items)) => {
            if *i > items.len() {
                return Err(format!("index {i} is past the end ({} elements)", items.len()));
            }
            if *i == items.len() {
                items.push(Value::Null);
            }
            &mut items[*i]
        }
        _ => return Err(format!("cannot descend into `{seg}`")),
    };
    if let Some(following) = rest.first() {
        if next.is_null() {
            *next = empty_container_for(following);
        }
    }
    set_in(next, rest, value)
}

fn empty_container_for(seg: &Segment) -> Value {
    match seg {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

/// `name[1][2]` -> ("name", [1, 2]). `None` when brackets are malformed.
fn split_indices(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = part.find('[') else {
        return Some((part, Vec::new()));
    };
    let (name, mut tail) = part.split_at(open);
    let mut indices = Vec::new();
    while !tail.is_empty() {
        let inner = tail.strip_prefix('[')?;
        let close = inner.find(']')?;
        indices.push(inner[..close].parse::<usize>().ok()?);
        tail = &inner[close + 1..];
    }
    Some((name, indices))
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, seg) in self.segments.iter().enumerate() {
            if n > 0 && matches!(seg, Segment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}
