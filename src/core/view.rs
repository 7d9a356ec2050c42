// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Relationships joined with their entity and address, which is the shape
//! every rule reads.

use std::collections::HashSet;

use anyhow::{bail, Result};
use log::{debug, warn};

use super::models::{AddressColumn, AddressTable, EntityTable, RelationshipTable, Rule};

/// One relationship with the address fields the rules look at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedRow {
    pub eid: String,
    pub aid: i64,
    pub num1: Option<String>,
    pub street_name: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Read-only merged view of the three tables.
#[derive(Clone, Debug, Default)]
pub struct MergedView {
    pub rows: Vec<MergedRow>,
    // Address columns that exist in the address table
    available: Vec<AddressColumn>,
}

impl MergedView {
    /// Joins relationships with entities (on `EID_1 = EID`) and addresses (on
    /// `AID_2 = AID`), keeping relationship order.
    ///
    /// Relationships pointing at an AID that isn't in the address table are
    /// dropped, since there is no address to correct.
    pub fn build(
        addresses: &AddressTable,
        entities: &EntityTable,
        relationships: &RelationshipTable,
    ) -> Self {
        let known_eids: HashSet<&str> = entities.records.iter().map(|e| e.eid.as_str()).collect();

        let mut rows = Vec::with_capacity(relationships.len());
        let mut dangling = 0usize;
        for rel in relationships.records() {
            let record = match addresses.find(rel.aid) {
                Some(r) => r,
                None => {
                    dangling += 1;
                    continue;
                }
            };
            if !known_eids.contains(rel.eid.as_str()) {
                debug!("relationship refers to unknown entity {:?}", rel.eid);
            }
            let value = |c| addresses.value(record, c).map(str::to_owned);
            rows.push(MergedRow {
                eid: rel.eid.clone(),
                aid: rel.aid,
                num1: value(AddressColumn::Num1),
                street_name: value(AddressColumn::StreetName),
                zip: value(AddressColumn::Zip),
                city: value(AddressColumn::City),
                state: value(AddressColumn::State),
            });
        }
        if dangling > 0 {
            warn!(
                "{} relationships point at AIDs missing from the address table; skipping them",
                dangling
            );
        }

        let available = [
            AddressColumn::Num1,
            AddressColumn::StreetName,
            AddressColumn::Zip,
            AddressColumn::City,
            AddressColumn::State,
        ]
        .iter()
        .copied()
        .filter(|c| addresses.has_column(*c))
        .collect();

        Self { rows, available }
    }

    /// Fails if any column `rule` needs is missing from the address table.
    pub fn require(&self, rule: Rule) -> Result<()> {
        let missing: Vec<&str> = rule
            .required_columns()
            .iter()
            .filter(|c| !self.available.contains(*c))
            .map(|c| c.as_ref())
            .collect();
        if !missing.is_empty() {
            bail!("Missing columns for {}: {:?}", rule.label(), missing);
        }
        Ok(())
    }
}

#[cfg(test)]
impl MergedView {
    /// View over hand-built rows with every column available.
    pub fn from_rows(rows: Vec<MergedRow>) -> Self {
        Self {
            rows,
            available: vec![
                AddressColumn::Num1,
                AddressColumn::StreetName,
                AddressColumn::Zip,
                AddressColumn::City,
                AddressColumn::State,
            ],
        }
    }
}
