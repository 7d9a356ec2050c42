// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Correction rules. Each rule reads the merged view and returns proposed
//! changes; none of them modify any table.

pub(crate) mod city;
pub(crate) mod street;
pub(crate) mod zip;

use anyhow::Result;

use super::models::{ProposedChange, Rule};
use super::view::MergedView;
use crate::app_config::RulesConfig;

/// Runs a single rule over the view.
///
/// # Errors
///
/// Returns an error if the address table lacks a column the rule needs.
pub fn propose(rule: Rule, view: &MergedView, config: &RulesConfig) -> Result<Vec<ProposedChange>> {
    view.require(rule)?;
    let proposals = match rule {
        Rule::FillMissingZips => zip::propose_fill_missing_zips_keep(view),
        Rule::StreetNames => street::propose_street_name_corrections(view, config.street_threshold),
        Rule::ReplaceInvalidZips => zip::propose_replace_invalid_zips(view),
        Rule::ZipsByAddress => zip::propose_fill_missing_zips_by_address(view),
        Rule::CityNames => city::propose_correct_city_names_by_zip(view, config.city_threshold),
    };
    Ok(proposals)
}

/// Trims and lower-cases a street or city name for grouping.
pub(crate) fn normalize(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_lowercase()
}

/// Pushes `value` unless it's already present, keeping first-seen order.
pub(crate) fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}
