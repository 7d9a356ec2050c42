// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Rule 2: majority vote on street-name spelling within each
//! (EID, house number) bucket.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::{normalize, push_unique};
use crate::core::fuzzy::cluster_variants;
use crate::core::models::{AddressColumn, ProposedChange, Rule};
use crate::core::view::{MergedRow, MergedView};

/// Groups near-identical street spellings per (EID, house number) and proposes
/// the most frequent original spelling for the rest of its cluster.
///
/// Frequency ties go to the greatest spelling. Rows without a house number or
/// street name are ignored.
pub fn propose_street_name_corrections(view: &MergedView, threshold: f64) -> Vec<ProposedChange> {
    let mut groups: BTreeMap<(&str, &str), Vec<&MergedRow>> = BTreeMap::new();
    for row in &view.rows {
        if let (Some(num1), Some(_)) = (row.num1.as_deref(), row.street_name.as_deref()) {
            groups
                .entry((row.eid.as_str(), num1))
                .or_default()
                .push(row);
        }
    }

    let mut proposals = Vec::new();
    for ((eid, num1), rows) in groups {
        // Frequency of the original spellings within this bucket
        let mut freq: HashMap<&str, usize> = HashMap::new();
        let mut norms: Vec<String> = Vec::new();
        for row in &rows {
            let street = row.street_name.as_deref().unwrap_or("");
            *freq.entry(street).or_insert(0) += 1;
            push_unique(&mut norms, normalize(Some(street)));
        }
        if norms.len() < 2 {
            continue;
        }

        for cluster in cluster_variants(norms, threshold) {
            let members: Vec<&MergedRow> = rows
                .iter()
                .copied()
                .filter(|r| cluster.contains(&normalize(r.street_name.as_deref())))
                .collect();

            let mut originals: Vec<&str> = Vec::new();
            for r in &members {
                push_unique(&mut originals, r.street_name.as_deref().unwrap_or(""));
            }
            if originals.len() <= 1 {
                continue;
            }

            let best = match originals
                .iter()
                .copied()
                .max_by_key(|v| (freq.get(v).copied().unwrap_or(0), *v))
            {
                Some(b) => b,
                None => continue,
            };
            debug!(
                "street cluster {:?} for ({}, {}) resolves to {:?}",
                originals, eid, num1, best
            );

            for r in members {
                let current = r.street_name.as_deref().unwrap_or("");
                if current != best {
                    proposals.push(ProposedChange {
                        original_aid: r.aid,
                        eid_context: Some(eid.to_owned()),
                        column: AddressColumn::StreetName,
                        original_value: r.street_name.clone(),
                        proposed_value: best.to_owned(),
                        rule: Rule::StreetNames,
                    });
                }
            }
        }
    }
    proposals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::testing::row;

    #[test]
    fn test_majority_spelling_wins() {
        let view = MergedView::from_rows(vec![
            row("e1", 1, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 2, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 3, Some("7"), Some("Pensylvania Avenue"), None),
            row("e1", 4, Some("7"), Some("Oak Road"), None),
        ]);
        let proposals = propose_street_name_corrections(&view, 0.10);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].original_aid, 3);
        assert_eq!(proposals[0].original_value.as_deref(), Some("Pensylvania Avenue"));
        assert_eq!(proposals[0].proposed_value, "Pennsylvania Avenue");
        assert_eq!(proposals[0].eid_context.as_deref(), Some("e1"));
    }

    #[test]
    fn test_tie_goes_to_greatest_spelling() {
        let view = MergedView::from_rows(vec![
            row("e1", 1, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 2, Some("7"), Some("Pensylvania Avenue"), None),
        ]);
        let proposals = propose_street_name_corrections(&view, 0.10);
        assert_eq!(proposals.len(), 1);
        // "Pens..." sorts after "Penn..."
        assert_eq!(proposals[0].original_aid, 1);
        assert_eq!(proposals[0].proposed_value, "Pensylvania Avenue");
    }

    #[test]
    fn test_case_variants_fixed_alongside_typos() {
        let view = MergedView::from_rows(vec![
            row("e1", 1, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 2, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 3, Some("7"), Some("PENNSYLVANIA AVENUE"), None),
            row("e1", 4, Some("7"), Some("Pensylvania Avenue"), None),
        ]);
        let proposals = propose_street_name_corrections(&view, 0.10);
        let fixed: Vec<i64> = proposals.iter().map(|p| p.original_aid).collect();
        assert_eq!(fixed, vec![3, 4]);
    }

    #[test]
    fn test_single_normalised_spelling_is_left_alone() {
        // Only one distinct normalised street, so the bucket is skipped
        let view = MergedView::from_rows(vec![
            row("e1", 1, Some("7"), Some("Main Street"), None),
            row("e1", 2, Some("7"), Some("MAIN STREET"), None),
        ]);
        assert!(propose_street_name_corrections(&view, 0.10).is_empty());
    }

    #[test]
    fn test_buckets_are_per_entity_and_number() {
        let view = MergedView::from_rows(vec![
            row("e1", 1, Some("7"), Some("Pennsylvania Avenue"), None),
            row("e1", 2, Some("8"), Some("Pensylvania Avenue"), None),
            row("e2", 3, Some("7"), Some("Pensylvania Avenue"), None),
            row("e1", 4, None, Some("Pensylvania Avenue"), None),
        ]);
        assert!(propose_street_name_corrections(&view, 0.10).is_empty());
    }
}
