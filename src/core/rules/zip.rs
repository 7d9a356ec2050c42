// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! ZIP code rules: filling blank ZIPs and replacing malformed ones from a
//! group's single valid ZIP.

use std::collections::HashMap;
use std::hash::Hash;

use super::{normalize, push_unique};
use crate::core::models::{AddressColumn, ProposedChange, Rule};
use crate::core::view::{MergedRow, MergedView};

/// True for ZIPs in the `_12345` form (after trimming).
pub fn is_valid_zip(zip: Option<&str>) -> bool {
    match zip {
        Some(z) => {
            let z = z.trim();
            z.len() == 6 && z.starts_with('_') && z[1..].bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// True for missing or whitespace-only ZIPs.
pub fn is_blank_zip(zip: Option<&str>) -> bool {
    zip.map_or(true, |z| z.trim().is_empty())
}

/// Groups rows by `key` and keeps the groups whose valid ZIPs agree on
/// exactly one value. Rows without a key are ignored.
fn canonical_zips<K, F>(view: &MergedView, key: F) -> HashMap<K, String>
where
    K: Eq + Hash,
    F: Fn(&MergedRow) -> Option<K>,
{
    let mut seen: HashMap<K, Vec<&str>> = HashMap::new();
    for row in &view.rows {
        if !is_valid_zip(row.zip.as_deref()) {
            continue;
        }
        if let (Some(k), Some(zip)) = (key(row), row.zip.as_deref()) {
            push_unique(seen.entry(k).or_default(), zip);
        }
    }
    seen.into_iter()
        .filter(|(_, zips)| zips.len() == 1)
        .map(|(k, zips)| (k, zips[0].to_owned()))
        .collect()
}

/// (EID, house number, street) grouping shared by rules 1 and 3a.
fn entity_street_key(row: &MergedRow) -> Option<(String, String, String)> {
    let num1 = row.num1.as_ref()?;
    Some((
        row.eid.clone(),
        num1.clone(),
        normalize(row.street_name.as_deref()),
    ))
}

/// (state, city, street, house number) grouping for rule 3b.
fn address_key(row: &MergedRow) -> Option<(String, String, String, String)> {
    let num1 = row.num1.as_ref()?;
    Some((
        row.state.as_deref().unwrap_or("").trim().to_uppercase(),
        normalize(row.city.as_deref()),
        normalize(row.street_name.as_deref()),
        num1.clone(),
    ))
}

fn entity_street_proposals<P>(view: &MergedView, rule: Rule, is_target: P) -> Vec<ProposedChange>
where
    P: Fn(Option<&str>) -> bool,
{
    let canon = canonical_zips(view, entity_street_key);
    view.rows
        .iter()
        .filter(|row| is_target(row.zip.as_deref()))
        .filter_map(|row| {
            let zip = canon.get(&entity_street_key(row)?)?;
            Some(ProposedChange {
                original_aid: row.aid,
                eid_context: Some(row.eid.clone()),
                column: AddressColumn::Zip,
                original_value: row.zip.clone(),
                proposed_value: zip.clone(),
                rule,
            })
        })
        .collect()
}

/// Rule 1: within each (EID, house number, street) group that has exactly one
/// valid ZIP, fill every blank ZIP with it.
pub fn propose_fill_missing_zips_keep(view: &MergedView) -> Vec<ProposedChange> {
    entity_street_proposals(view, Rule::FillMissingZips, is_blank_zip)
}

/// Rule 3a: same groups as rule 1, but replaces non-blank ZIPs that aren't
/// valid.
pub fn propose_replace_invalid_zips(view: &MergedView) -> Vec<ProposedChange> {
    entity_street_proposals(view, Rule::ReplaceInvalidZips, |zip| {
        !is_blank_zip(zip) && !is_valid_zip(zip)
    })
}

/// Rule 3b: groups by (state, city, street, house number) across all entities
/// and fills blank ZIPs when the group has exactly one valid ZIP.
pub fn propose_fill_missing_zips_by_address(view: &MergedView) -> Vec<ProposedChange> {
    let canon = canonical_zips(view, address_key);
    view.rows
        .iter()
        .filter(|row| is_blank_zip(row.zip.as_deref()))
        .filter_map(|row| {
            let zip = canon.get(&address_key(row)?)?;
            Some(ProposedChange {
                original_aid: row.aid,
                eid_context: None,
                column: AddressColumn::Zip,
                original_value: row.zip.clone(),
                proposed_value: zip.clone(),
                rule: Rule::ZipsByAddress,
            })
        })
        .collect()
}
