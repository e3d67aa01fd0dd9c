//! Path resolution over JSON trees.
//!
//! Paths are dot-separated keys. A segment may carry array suffixes:
//! `items[*]` addresses every element, `items[2]` one element. Within a single
//! segment the suffixes must all be wildcards or all be indices; a segment such
//! as `grid[*][0]` is rejected by [`parse_path`].
//!
//! ```
//! use json_fieldmap_core::path::{get, set};
//! use serde_json::json;
//!
//! let out = set(&json!({}), "profile.fullName", json!("Ada"));
//! assert_eq!(out, json!({"profile": {"fullName": "Ada"}}));
//! assert_eq!(get(&out, "profile.fullName"), Some(&json!("Ada")));
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::error::MappingError;

/// Array suffix attached to one path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayAccess {
    /// Plain key, no brackets.
    None,
    /// `[*]` repeated this many times.
    Wildcard(usize),
    /// `[N]` suffixes, outermost first.
    Indices(Vec<usize>),
}

/// One parsed segment of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Object key. Empty when the segment addresses the current value itself
    /// (e.g. the leading `[*]` of a path extracted from an array root).
    pub key: String,
    pub access: ArrayAccess,
}

impl PathSegment {
    /// True if this segment carries any array suffix.
    pub fn is_array(&self) -> bool {
        !matches!(self.access, ArrayAccess::None)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        match &self.access {
            ArrayAccess::None => Ok(()),
            ArrayAccess::Wildcard(n) => {
                for _ in 0..*n {
                    write!(f, "[*]")?;
                }
                Ok(())
            }
            ArrayAccess::Indices(indices) => {
                for i in indices {
                    write!(f, "[{}]", i)?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a path expression into segments. The empty path is the root and
/// yields no segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, MappingError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('.')
        .map(|raw| parse_segment(path, raw))
        .collect()
}

/// Check that a path parses. Used by config validation.
pub fn validate_path(path: &str) -> Result<(), MappingError> {
    parse_path(path).map(|_| ())
}

/// Render segments back into a path expression.
pub fn format_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_segment(path: &str, raw: &str) -> Result<PathSegment, MappingError> {
    let invalid = |message: &str| MappingError::InvalidPath {
        path: path.to_string(),
        message: message.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid("empty segment"));
    }

    let (key, mut rest) = match raw.find('[') {
        Some(pos) => (&raw[..pos], &raw[pos..]),
        None => (raw, ""),
    };
    if key.contains(']') {
        return Err(invalid("unbalanced `]`"));
    }

    let mut wildcards = 0usize;
    let mut indices = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(invalid("unexpected characters after `]`"));
        }
        let close = rest
            .find(']')
            .ok_or_else(|| invalid("unterminated `[`"))?;
        let inner = &rest[1..close];
        if inner == "*" {
            wildcards += 1;
        } else {
            let index = inner
                .parse::<usize>()
                .map_err(|_| invalid(&format!("invalid array index `{}`", inner)))?;
            indices.push(index);
        }
        rest = &rest[close + 1..];
    }

    if wildcards > 0 && !indices.is_empty() {
        return Err(MappingError::MixedArrayAccess {
            path: path.to_string(),
            segment: raw.to_string(),
        });
    }

    let access = if wildcards > 0 {
        ArrayAccess::Wildcard(wildcards)
    } else if !indices.is_empty() {
        ArrayAccess::Indices(indices)
    } else {
        ArrayAccess::None
    };

    Ok(PathSegment {
        key: key.to_string(),
        access,
    })
}

/// Remove every `[*]` suffix: `items[*].name` → `items.name`.
pub fn strip_wildcards(path: &str) -> String {
    path.replace("[*]", "")
}

/// True if the path contains at least one `[*]` suffix.
pub fn has_wildcard(path: &str) -> bool {
    path.contains("[*]")
}

/// Join a base path and a child key the way extracted paths are built.
pub fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a single value. Returns `None` for any miss; never panics.
///
/// A segment naming an existing key resolves literally, even if it contains
/// brackets. Otherwise `name[N]` indexes into the array stored at `name`, and
/// a bare numeric segment indexes into an array. Wildcard segments never
/// resolve to a single value; use [`get_all`] for those.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for raw in path.split('.') {
        current = step(current, raw)?;
    }
    Some(current)
}

fn step<'a>(node: &'a Value, raw: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => {
            if let Some(child) = map.get(raw) {
                return Some(child);
            }
        }
        Value::Array(arr) => {
            if let Ok(index) = raw.parse::<usize>() {
                return arr.get(index);
            }
        }
        _ => return None,
    }

    let segment = parse_segment(raw, raw).ok()?;
    match segment.access {
        ArrayAccess::Indices(indices) => {
            let mut current = descend_key(node, &segment.key)?;
            for index in indices {
                current = current.as_array()?.get(index)?;
            }
            Some(current)
        }
        ArrayAccess::None | ArrayAccess::Wildcard(_) => None,
    }
}

fn descend_key<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return Some(node);
    }
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    }
}

/// Resolve every value a path addresses, expanding each `[*]` over the
/// elements `0..len` of the array at that point. Results are in index order.
/// Unparseable paths resolve to nothing.
pub fn get_all<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(e) => {
            tracing::debug!(path, error = %e, "get_all: unparseable path");
            return Vec::new();
        }
    };

    let mut frontier = vec![root];
    for segment in &segments {
        let mut next = Vec::new();
        for node in frontier {
            let Some(base) = descend_key(node, &segment.key) else {
                continue;
            };
            match &segment.access {
                ArrayAccess::None => next.push(base),
                ArrayAccess::Indices(indices) => {
                    let mut current = Some(base);
                    for index in indices {
                        current = current.and_then(|c| c.as_array()).and_then(|a| a.get(*index));
                    }
                    if let Some(found) = current {
                        next.push(found);
                    }
                }
                ArrayAccess::Wildcard(levels) => {
                    let mut expanded = vec![base];
                    for _ in 0..*levels {
                        expanded = expanded
                            .into_iter()
                            .filter_map(|v| v.as_array())
                            .flat_map(|a| a.iter())
                            .collect();
                    }
                    next.extend(expanded);
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }
    frontier
}

/// Return a new tree with `value` stored at `path`; `root` is left untouched.
///
/// Missing intermediate objects are created. Bracket segments are stored as
/// literal keys; callers materialize concrete indices before calling this.
pub fn set(root: &Value, path: &str, value: Value) -> Value {
    let mut out = root.clone();
    set_in_place(&mut out, path, value);
    out
}

/// Mutating form of [`set`] used by accumulators that own their tree.
/// Unparseable paths leave the tree as it was.
pub fn set_in_place(root: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }
    if let Err(e) = validate_path(path) {
        tracing::debug!(path, error = %e, "set: unparseable path, nothing written");
        return;
    }

    let parts: Vec<&str> = path.split('.').collect();
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = root;
    for part in parents {
        current = child_container(current, part);
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert((*last).to_string(), value);
    }
}

/// Step into `key`, creating an empty object when the slot is missing or holds
/// a scalar. Existing arrays are entered by numeric key when in bounds.
fn child_container<'a>(node: &'a mut Value, key: &str) -> &'a mut Value {
    let array_index = match node {
        Value::Array(arr) => key.parse::<usize>().ok().filter(|i| *i < arr.len()),
        _ => None,
    };
    match (node, array_index) {
        (Value::Array(arr), Some(index)) => &mut arr[index],
        (other, _) => object_slot(other, key),
    }
}

fn object_slot<'a>(node: &'a mut Value, key: &str) -> &'a mut Value {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        unreachable!("node was just replaced with an object");
    };
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() && !slot.is_array() {
        *slot = Value::Object(Map::new());
    }
    slot
}
