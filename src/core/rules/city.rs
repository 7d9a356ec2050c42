// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Rule 4: fuzzy city-name correction within each valid ZIP.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::zip::is_valid_zip;
use super::{normalize, push_unique};
use crate::core::fuzzy::cluster_variants;
use crate::core::models::{AddressColumn, ProposedChange, Rule};
use crate::core::view::{MergedRow, MergedView};

/// Within each valid ZIP, clusters city spellings closer than `threshold`
/// and proposes the cluster's most frequent original spelling for every other
/// row in it.
pub fn propose_correct_city_names_by_zip(view: &MergedView, threshold: f64) -> Vec<ProposedChange> {
    let candidates: Vec<&MergedRow> = view
        .rows
        .iter()
        .filter(|r| r.city.is_some() && is_valid_zip(r.zip.as_deref()))
        .collect();

    let mut by_zip: BTreeMap<&str, Vec<&MergedRow>> = BTreeMap::new();
    for &row in &candidates {
        by_zip
            .entry(row.zip.as_deref().unwrap_or(""))
            .or_default()
            .push(row);
    }

    // (zip, normalised city) -> chosen spelling
    let mut canon: HashMap<(&str, String), &str> = HashMap::new();
    for (zip, rows) in &by_zip {
        let mut freq: HashMap<&str, usize> = HashMap::new();
        let mut variants: Vec<String> = Vec::new();
        for &row in rows {
            let city = row.city.as_deref().unwrap_or("");
            *freq.entry(city).or_insert(0) += 1;
            push_unique(&mut variants, normalize(Some(city)));
        }
        if variants.len() < 2 {
            continue;
        }

        for cluster in cluster_variants(variants, threshold) {
            if cluster.len() == 1 {
                continue;
            }
            let mut originals: Vec<&str> = Vec::new();
            for &row in rows {
                let city = row.city.as_deref().unwrap_or("");
                if cluster.contains(&normalize(Some(city))) {
                    push_unique(&mut originals, city);
                }
            }
            let best = match originals
                .iter()
                .copied()
                .max_by_key(|c| (freq.get(c).copied().unwrap_or(0), *c))
            {
                Some(b) => b,
                None => continue,
            };
            debug!("city cluster {:?} in {} resolves to {:?}", cluster, zip, best);
            for norm in cluster {
                canon.insert((*zip, norm), best);
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|row| {
            let zip = row.zip.as_deref()?;
            let city = row.city.as_deref()?;
            let best = *canon.get(&(zip, normalize(Some(city))))?;
            if best == city {
                return None;
            }
            Some(ProposedChange {
                original_aid: row.aid,
                eid_context: None,
                column: AddressColumn::City,
                original_value: row.city.clone(),
                proposed_value: best.to_owned(),
                rule: Rule::CityNames,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(aid: i64, zip: &str, city: &str) -> MergedRow {
        MergedRow {
            eid: format!("e{}", aid),
            aid,
            zip: Some(zip.to_owned()),
            city: Some(city.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_corrects_minority_city_spelling() {
        let view = MergedView::from_rows(vec![
            row(1, "_60601", "Chicago Heights"),
            row(2, "_60601", "Chicago Heights"),
            row(3, "_60601", "Chicago Hieghts"),
            row(4, "_60601", "chicago heights"),
            row(5, "_60601", "Evanston"),
        ]);
        let proposals = propose_correct_city_names_by_zip(&view, 0.20);
        let fixed: Vec<(i64, &str)> = proposals
            .iter()
            .map(|p| (p.original_aid, p.proposed_value.as_str()))
            .collect();
        assert_eq!(fixed, vec![(3, "Chicago Heights"), (4, "Chicago Heights")]);
        assert!(proposals.iter().all(|p| p.eid_context.is_none()));
    }

    #[test]
    fn test_ignores_invalid_zips_and_other_zips() {
        let view = MergedView::from_rows(vec![
            row(1, "60601", "Chicago Heights"),
            row(2, "60601", "Chicago Hieghts"),
            row(3, "_60601", "Chicago Heights"),
            row(4, "_60602", "Chicago Hieghts"),
        ]);
        assert!(propose_correct_city_names_by_zip(&view, 0.20).is_empty());
    }

    #[test]
    fn test_case_only_variants_are_not_clustered() {
        // One normalised variant in the ZIP means nothing to vote on
        let view = MergedView::from_rows(vec![
            row(1, "_60601", "Chicago"),
            row(2, "_60601", "CHICAGO"),
        ]);
        assert!(propose_correct_city_names_by_zip(&view, 0.20).is_empty());
    }
}
