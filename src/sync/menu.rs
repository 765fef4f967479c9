//! Keeps submenu references pointing at the right menu rows across a menu save

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::warn;

use super::key::RowKey;
use super::loose::LooseInt;
use crate::database::{KeyKind, Row};

/// Decides which freshly written menu row is the logical successor of an old one
pub trait IdentityMatcher: Send + Sync {
    /// Indices into `candidates` that match `old`, best match first
    fn candidates(&self, old: &Row, candidates: &[Row]) -> Vec<usize>;
}

/// Same `order` value first, then same `display_name`
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderThenName;

impl IdentityMatcher for OrderThenName {
    fn candidates(&self, old: &Row, candidates: &[Row]) -> Vec<usize> {
        if let Some(order) = int_field(old, "order") {
            let by_order: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, row)| int_field(row, "order") == Some(order))
                .map(|(i, _)| i)
                .collect();
            if !by_order.is_empty() {
                return by_order;
            }
        }

        match old.get("display_name").and_then(Value::as_str) {
            Some(name) => candidates
                .iter()
                .enumerate()
                .filter(|(_, row)| row.get("display_name").and_then(Value::as_str) == Some(name))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }
}

fn int_field(row: &Row, column: &str) -> Option<i64> {
    row.get(column)
        .cloned()
        .and_then(|v| serde_json::from_value::<LooseInt>(v).ok())
        .and_then(|v| v.value())
}

/// Map every old menu key to the key of its successor.
///
/// Keys that survived the save map to themselves. Old rows without a match are left out,
/// so references to them pass through unchanged.
pub fn successor_keys(previous: &[Row], written: &[Row], matcher: &dyn IdentityMatcher) -> HashMap<RowKey, RowKey> {
    let written_keys: Vec<Option<RowKey>> = written.iter().map(|row| RowKey::of_row(row, KeyKind::Serial)).collect();

    let mut map = HashMap::new();
    for old in previous {
        let Some(old_key) = RowKey::of_row(old, KeyKind::Serial) else {
            continue;
        };
        if written_keys.contains(&Some(old_key)) {
            map.insert(old_key, old_key);
            continue;
        }

        let matches = matcher.candidates(old, written);
        if matches.len() > 1 {
            warn!(
                "Menu item {} matches {} rewritten menu items; using the first",
                old_key,
                matches.len()
            );
        }
        if let Some(new_key) = matches.first().and_then(|i| written_keys[*i]) {
            map.insert(old_key, new_key);
        }
    }
    map
}

/// Point each incoming submenu item at its menu item's successor key.
///
/// Returns how many references changed.
pub fn rewrite_submenu_refs(items: &mut [Value], successors: &HashMap<RowKey, RowKey>) -> usize {
    let mut rewritten = 0;
    for item in items.iter_mut() {
        let Some(object) = item.as_object_mut() else {
            continue;
        };
        let old = object
            .get("menu_item_id")
            .and_then(|v| RowKey::parse(v, KeyKind::Serial));
        if let Some(new_key) = old.and_then(|k| successors.get(&k)) {
            if Some(*new_key) != old {
                rewritten += 1;
            }
            object.insert("menu_item_id".to_string(), new_key.to_value());
        }
    }
    rewritten
}

/// Clear `menu_item_id` on submenu items whose menu row is not one of `menu_keys`.
///
/// Cleared items fail validation and are dropped, so a submenu can only hang off a
/// menu row of the organization being saved. Returns how many were cleared.
pub fn detach_unknown_parents(items: &mut [Value], menu_keys: &HashSet<RowKey>) -> usize {
    let mut detached = 0;
    for item in items.iter_mut() {
        let Some(object) = item.as_object_mut() else {
            continue;
        };
        let parent = object
            .get("menu_item_id")
            .and_then(|v| RowKey::parse(v, KeyKind::Serial));
        match parent {
            Some(key) if menu_keys.contains(&key) => {}
            Some(key) => {
                warn!("Submenu item points at menu item {} outside this organization", key);
                object.insert("menu_item_id".to_string(), Value::Null);
                detached += 1;
            }
            None => {}
        }
    }
    detached
}
