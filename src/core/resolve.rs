// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Applying proposals to the address table.
//!
//! Proposals for the same (AID, column) may disagree. The value backed by the
//! most entities is written to the AID; every other value is split off to a
//! freshly minted AID and the entities that proposed it are re-pointed there.

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::Result;
use log::{debug, info};

use super::models::{
    AddressColumn, AddressRecord, AddressTable, Cell, ProposedChange, RelationshipTable,
    SplitEvent,
};

/// Columns joined (in order) to rebuild `fullAddress_c`.
const FULL_ADDRESS_PARTS: [AddressColumn; 5] = [
    AddressColumn::Num1,
    AddressColumn::StreetName,
    AddressColumn::City,
    AddressColumn::State,
    AddressColumn::Zip,
];

/// Columns that identify a physical location for
/// [split_shared_addresses].
const SIGNATURE_COLUMNS: [AddressColumn; 7] = [
    AddressColumn::Num1,
    AddressColumn::StreetName,
    AddressColumn::StreetSuffix,
    AddressColumn::Unit,
    AddressColumn::Zip,
    AddressColumn::City,
    AddressColumn::State,
];

/// Space-joined non-empty number, street, city, state, and ZIP.
pub fn reconstruct_full_address(table: &AddressTable, record: &AddressRecord) -> String {
    FULL_ADDRESS_PARTS
        .iter()
        .filter_map(|c| table.value(record, *c))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}

/// Writes `value` to `column` of the record at `pos`, then refreshes its full
/// address if the table has one.
fn apply_value(table: &mut AddressTable, pos: usize, column: AddressColumn, value: Cell) -> Result<()> {
    table.set_value(pos, column, value)?;
    refresh_full_address(table, pos)
}

fn refresh_full_address(table: &mut AddressTable, pos: usize) -> Result<()> {
    if table.has_column(AddressColumn::FullAddress) {
        let full = reconstruct_full_address(table, table.record(pos));
        table.set_value(pos, AddressColumn::FullAddress, Some(full))?;
    }
    Ok(())
}

/// Proposed values for one (AID, column), each with its distinct supporting
/// entities, in first-seen order.
type Variants = Vec<(String, Vec<Option<String>>)>;

/// Buckets proposals by (AID, column), keeping first-seen order for both the
/// buckets and the values inside them.
fn bucket_proposals(proposals: &[ProposedChange]) -> Vec<((i64, AddressColumn), Variants)> {
    let mut order: HashMap<(i64, AddressColumn), usize> = HashMap::new();
    let mut buckets: Vec<((i64, AddressColumn), Variants)> = Vec::new();
    for p in proposals {
        let key = (p.original_aid, p.column);
        let slot = *order.entry(key).or_insert_with(|| {
            buckets.push((key, Vec::new()));
            buckets.len() - 1
        });
        let variants = &mut buckets[slot].1;
        let idx = match variants.iter().position(|(v, _)| *v == p.proposed_value) {
            Some(i) => i,
            None => {
                variants.push((p.proposed_value.clone(), Vec::new()));
                variants.len() - 1
            }
        };
        let supporters = &mut variants[idx].1;
        if !supporters.contains(&p.eid_context) {
            supporters.push(p.eid_context.clone());
        }
    }
    buckets
}

/// Result of [resolve_and_apply_changes].
#[derive(Debug)]
pub struct Resolution {
    /// Largest AID handed out so far.
    pub max_aid: i64,
    pub splits: Vec<SplitEvent>,
}

/// Applies proposals to the tables, splitting AIDs where entities disagree.
///
/// Proposals for AIDs that are not in the address table are ignored. New AIDs
/// are minted from `max_aid + 1` upwards.
///
/// # Errors
///
/// Returns an error if a proposal targets a column the address table doesn't
/// have.
pub fn resolve_and_apply_changes(
    addresses: &mut AddressTable,
    relationships: &mut RelationshipTable,
    proposals: &[ProposedChange],
    mut max_aid: i64,
) -> Result<Resolution> {
    let mut splits = Vec::new();

    for ((aid, column), variants) in bucket_proposals(proposals) {
        let pos = match addresses.position(aid) {
            Some(p) => p,
            None => {
                debug!("skipping proposals for unknown AID {}", aid);
                continue;
            }
        };
        let current = addresses.value(addresses.record(pos), column).map(str::to_owned);

        if variants.len() == 1 {
            let value = &variants[0].0;
            if current.as_deref() != Some(value.as_str()) {
                apply_value(addresses, pos, column, Some(value.clone()))?;
            }
            continue;
        }

        // Most supporters wins; ties go to the greatest value
        let majority = match variants
            .iter()
            .max_by(|(va, sa), (vb, sb)| sa.len().cmp(&sb.len()).then_with(|| va.cmp(vb)))
        {
            Some((v, _)) => v.clone(),
            None => continue,
        };
        if current.as_deref() != Some(majority.as_str()) {
            apply_value(addresses, pos, column, Some(majority.clone()))?;
        }

        for (value, supporters) in variants {
            if value == majority {
                continue;
            }
            max_aid += 1;
            let new_aid = max_aid;
            debug!(
                "splitting AID {} -> {} for {}={:?} ({} supporters)",
                aid,
                new_aid,
                column,
                value,
                supporters.len()
            );

            let mut record = addresses.record(pos).clone();
            record.aid = new_aid;
            addresses.push(record);
            let new_pos = addresses.len() - 1;
            apply_value(addresses, new_pos, column, Some(value.clone()))?;

            let supporters: HashSet<&str> = supporters.iter().flatten().map(String::as_str).collect();
            let moved: Vec<usize> = relationships
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.aid == aid && supporters.contains(r.eid.as_str()))
                .map(|(i, _)| i)
                .collect();
            for i in moved {
                relationships.repoint(i, new_aid);
            }

            splits.push(SplitEvent {
                old_aid: aid,
                new_aid,
                column,
                new_value: value,
            });
        }
    }

    info!(
        "applied {} proposals, {} splits",
        proposals.len(),
        splits.len()
    );
    Ok(Resolution { max_aid, splits })
}

/// Gives every (entity, address) signature of a shared AID its own AID, so
/// each AID maps to one entity's view of one physical location.
///
/// All signatures of an affected AID move to new AIDs, minted from
/// `max_aid + 1` upwards; the original address record is left in place.
/// `max_aid` must be at least the largest AID in `addresses`.
///
/// Returns the `(old, new)` AID of every address record minted.
pub fn split_shared_addresses(
    addresses: &mut AddressTable,
    relationships: &mut RelationshipTable,
    max_aid: i64,
) -> Vec<(i64, i64)> {
    let signature = |eid: &str, record: Option<&AddressRecord>| -> String {
        let mut parts = vec![eid.to_owned()];
        for c in SIGNATURE_COLUMNS.iter() {
            let v = record.and_then(|r| addresses.value(r, *c)).unwrap_or("");
            parts.push(v.to_owned());
        }
        parts.join("|")
    };

    let signatures: Vec<String> = relationships
        .records()
        .iter()
        .map(|r| signature(&r.eid, addresses.find(r.aid)))
        .collect();

    // AID -> distinct signatures in first-seen order
    let mut per_aid: HashMap<i64, Vec<&str>> = HashMap::new();
    for (r, sig) in relationships.records().iter().zip(&signatures) {
        let sigs = per_aid.entry(r.aid).or_default();
        if !sigs.contains(&sig.as_str()) {
            sigs.push(sig);
        }
    }
    let bad_aids: BTreeSet<i64> = per_aid
        .iter()
        .filter(|(_, sigs)| sigs.len() > 1)
        .map(|(aid, _)| *aid)
        .collect();
    if bad_aids.is_empty() {
        return Vec::new();
    }

    let mut next_aid = max_aid + 1;
    let mut remap: HashMap<(i64, &str), i64> = HashMap::new();
    let mut minted: Vec<(i64, i64)> = Vec::new();
    for aid in &bad_aids {
        for sig in &per_aid[aid] {
            remap.insert((*aid, *sig), next_aid);
            minted.push((*aid, next_aid));
            next_aid += 1;
        }
    }

    for (i, sig) in signatures.iter().enumerate() {
        let aid = relationships.records()[i].aid;
        if let Some(&new_aid) = remap.get(&(aid, sig.as_str())) {
            relationships.repoint(i, new_aid);
        }
    }

    let mut added = Vec::new();
    for (old_aid, new_aid) in minted {
        // Relationships to unknown AIDs have no record to clone
        if let Some(record) = addresses.find(old_aid) {
            let mut record = record.clone();
            record.aid = new_aid;
            addresses.push(record);
            added.push((old_aid, new_aid));
        }
    }
    info!(
        "shared-address split: {} new AIDs minted due to conflicting signatures",
        added.len()
    );
    added
}
