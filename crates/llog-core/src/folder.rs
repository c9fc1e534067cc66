//! Virtual folder model for the content registry.
//!
//! Folders are not stored entities: an item's `folder` field is a
//! `/`-separated path, and a folder exists as soon as any item path passes
//! through it (plus any paths in the explicit folder registry, which may be
//! empty). This module holds the pure path logic: normalization,
//! breadcrumbs, prefix-safe matching and renaming, and derivation of the
//! folder listing from a set of items.
//!
//! Prefix operations respect segment boundaries. Renaming `math` moves
//! `math` and `math/algebra` but never touches `math2`.

use std::collections::BTreeMap;

use crate::models::{FolderInfo, Item};

/// Display name for the root folder (path `""`).
pub const ROOT_NAME: &str = "Root";

/// Normalize a folder path: split on `/`, trim whitespace from each
/// segment, drop empty segments, and rejoin.
///
/// `""`, `"/"`, and `"//"` all normalize to the root path `""`.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a normalized path into its segments. The root path has none.
pub fn segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').collect()
}

/// Last segment of a normalized path, or `None` for the root.
pub fn name(path: &str) -> Option<&str> {
    if path.is_empty() {
        None
    } else {
        path.rsplit('/').next()
    }
}

/// Parent path of a normalized path: `"a/b/c"` -> `"a/b"`, `"a"` -> `""`.
/// The root has no parent.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(head, _)| head).unwrap_or(""))
}

/// Breadcrumb trail for a normalized path: one `(segment, full_path)` pair
/// per level, e.g. `"a/b/c"` -> `[("a","a"), ("b","a/b"), ("c","a/b/c")]`.
/// The root yields an empty trail.
pub fn breadcrumbs(path: &str) -> Vec<(String, String)> {
    let mut trail = Vec::new();
    let mut full = String::new();
    for segment in segments(path) {
        if !full.is_empty() {
            full.push('/');
        }
        full.push_str(segment);
        trail.push((segment.to_string(), full.clone()));
    }
    trail
}

/// Whether `path` is `prefix` itself or lies underneath it.
///
/// Matching is segment-aware: `"math2"` is not within `"math"`. Every path
/// is within the root prefix `""`.
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// Whether `path` lies strictly underneath `prefix` (not equal to it).
pub fn is_strictly_within(path: &str, prefix: &str) -> bool {
    path != prefix && is_within(path, prefix)
}

/// Rewrite `path` by replacing the leading `old_prefix` with `new_prefix`.
///
/// Returns `None` when `path` is not within `old_prefix`. Replacing with
/// the empty prefix lifts the subtree to the root.
pub fn replace_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(path, old_prefix) {
        return None;
    }
    let rest = if old_prefix.is_empty() {
        path
    } else {
        path[old_prefix.len()..].trim_start_matches('/')
    };
    Some(match (new_prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => new_prefix.to_string(),
        (false, false) => format!("{}/{}", new_prefix, rest),
    })
}

/// All ancestor paths of a normalized path, nearest first, excluding the
/// path itself and the root: `"a/b/c"` -> `["a/b", "a"]`.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path;
    while let Some(up) = parent(current) {
        if up.is_empty() {
            break;
        }
        out.push(up.to_string());
        current = up;
    }
    out
}

/// Derive the full folder listing from items plus the explicit registry.
///
/// Every path an item passes through exists, as does every registered
/// path and the root. `item_count` counts items whose folder equals the
/// path exactly. Sorted by path; the root comes first.
pub fn folder_index(items: &[Item], registered: &[String]) -> Vec<FolderInfo> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    counts.insert(String::new(), 0);

    for item in items {
        *counts.entry(item.folder.clone()).or_insert(0) += 1;
        for ancestor in ancestors(&item.folder) {
            counts.entry(ancestor).or_insert(0);
        }
    }
    for path in registered {
        counts.entry(path.clone()).or_insert(0);
        for ancestor in ancestors(path) {
            counts.entry(ancestor).or_insert(0);
        }
    }

    counts
        .into_iter()
        .map(|(path, item_count)| {
            let display = name(&path).unwrap_or(ROOT_NAME).to_string();
            FolderInfo {
                path,
                name: display,
                item_count,
            }
        })
        .collect()
}

/// Whether `path` exists in the given folder universe (item paths plus
/// registered paths). Ancestors of occupied paths exist implicitly; the
/// root always exists.
pub fn folder_exists(path: &str, items: &[Item], registered: &[String]) -> bool {
    if path.is_empty() {
        return true;
    }
    items.iter().any(|item| is_within(&item.folder, path))
        || registered.iter().any(|reg| is_within(reg, path))
}
