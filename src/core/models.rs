// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! In-memory representations of the address, entity, and relationship tables,
//! plus the change proposals that rules produce.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, EnumVariantNames};

/// Name of the address identifier column in `fa.csv`.
pub const AID_COLUMN: &str = "AID";
/// Name of the entity identifier column in `fe.csv`.
pub const EID_COLUMN: &str = "EID";
/// Entity side of a relationship in `r_fe_fa.csv`.
pub const REL_EID_COLUMN: &str = "EID_1";
/// Address side of a relationship in `r_fe_fa.csv`.
pub const REL_AID_COLUMN: &str = "AID_2";

/// A single CSV cell. Empty fields are read as `None`.
pub type Cell = Option<String>;

/// Address columns that rules read or write.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumString,
    EnumIter, Serialize,
)]
pub enum AddressColumn {
    #[strum(serialize = "num1_c")]
    #[serde(rename = "num1_c")]
    Num1,
    #[strum(serialize = "streetName_c")]
    #[serde(rename = "streetName_c")]
    StreetName,
    #[strum(serialize = "streetSuffix_c")]
    #[serde(rename = "streetSuffix_c")]
    StreetSuffix,
    #[strum(serialize = "unit_c")]
    #[serde(rename = "unit_c")]
    Unit,
    #[strum(serialize = "zip_c")]
    #[serde(rename = "zip_c")]
    Zip,
    #[strum(serialize = "city_c")]
    #[serde(rename = "city_c")]
    City,
    #[strum(serialize = "state_c")]
    #[serde(rename = "state_c")]
    State,
    #[strum(serialize = "fullAddress_c")]
    #[serde(rename = "fullAddress_c")]
    FullAddress,
}

/// Correction rules, in the order they run.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
    EnumVariantNames,
)]
pub enum Rule {
    /// Rule 1
    #[strum(serialize = "fill-missing-zips")]
    FillMissingZips,
    /// Rule 2
    #[strum(serialize = "street-names")]
    StreetNames,
    /// Rule 3a
    #[strum(serialize = "replace-invalid-zips")]
    ReplaceInvalidZips,
    /// Rule 3b
    #[strum(serialize = "zips-by-address")]
    ZipsByAddress,
    /// Rule 4
    #[strum(serialize = "city-names")]
    CityNames,
}

impl Rule {
    /// Human-readable name used in reports and exported proposals.
    pub fn label(&self) -> &'static str {
        match *self {
            Rule::FillMissingZips => "Rule 1: Fill Missing ZIPs (Keep)",
            Rule::StreetNames => "Rule 2: Street-name majority vote",
            Rule::ReplaceInvalidZips => "Rule 3a: Replace Invalid ZIPs",
            Rule::ZipsByAddress => "Rule 3b: Fill Missing ZIPs by Address",
            Rule::CityNames => "Rule 4: Fuzzy city by ZIP",
        }
    }

    /// Address columns the rule needs to be present in the address table.
    pub fn required_columns(&self) -> &'static [AddressColumn] {
        match *self {
            Rule::FillMissingZips | Rule::ReplaceInvalidZips => &[
                AddressColumn::Num1,
                AddressColumn::StreetName,
                AddressColumn::Zip,
            ],
            Rule::StreetNames => &[AddressColumn::Num1, AddressColumn::StreetName],
            Rule::ZipsByAddress => &[
                AddressColumn::State,
                AddressColumn::City,
                AddressColumn::StreetName,
                AddressColumn::Num1,
                AddressColumn::Zip,
            ],
            Rule::CityNames => &[AddressColumn::Zip, AddressColumn::City],
        }
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// A single fix suggested by a rule. Applying it is up to
/// [crate::core::resolve::resolve_and_apply_changes].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProposedChange {
    #[serde(rename = "original_AID")]
    pub original_aid: i64,
    /// Entity the proposal was derived for. `None` for rules that look across
    /// entities.
    #[serde(rename = "EID_context")]
    pub eid_context: Option<String>,
    #[serde(rename = "column_to_change")]
    pub column: AddressColumn,
    pub original_value: Cell,
    pub proposed_value: String,
    #[serde(rename = "rule_name")]
    pub rule: Rule,
}

/// Record of an address being split off to a new AID during conflict
/// resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SplitEvent {
    pub old_aid: i64,
    pub new_aid: i64,
    pub column: AddressColumn,
    pub new_value: String,
}

/// Maps header names to column positions.
fn header_index(headers: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(h.clone()).or_insert(i);
    }
    index
}

/// One row of `fa.csv`.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressRecord {
    pub aid: i64,
    pub cells: Vec<Cell>,
}

/// The address table (`fa.csv`), keeping every column in file order.
#[derive(Clone, Debug)]
pub struct AddressTable {
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    records: Vec<AddressRecord>,
    // First record position for each AID
    by_aid: HashMap<i64, usize>,
}

impl AddressTable {
    pub fn new(headers: Vec<String>, records: Vec<AddressRecord>) -> Result<Self> {
        let columns = header_index(&headers);
        if !columns.contains_key(AID_COLUMN) {
            return Err(anyhow!("Address table has no {} column", AID_COLUMN));
        }
        let mut by_aid = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            by_aid.entry(r.aid).or_insert(i);
        }
        Ok(Self {
            headers,
            columns,
            records,
            by_aid,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, column: AddressColumn) -> bool {
        self.columns.contains_key(column.as_ref())
    }

    pub fn column_index(&self, column: AddressColumn) -> Option<usize> {
        self.columns.get(column.as_ref()).copied()
    }

    /// Largest AID in the table, or 0 when empty.
    pub fn max_aid(&self) -> i64 {
        self.records.iter().map(|r| r.aid).max().unwrap_or(0)
    }

    /// Position of the first record with this AID.
    pub fn position(&self, aid: i64) -> Option<usize> {
        self.by_aid.get(&aid).copied()
    }

    pub fn find(&self, aid: i64) -> Option<&AddressRecord> {
        self.position(aid).map(|i| &self.records[i])
    }

    /// Value of `column` in `record`, treating a missing column as missing.
    pub fn value<'a>(&self, record: &'a AddressRecord, column: AddressColumn) -> Option<&'a str> {
        self.column_index(column)
            .and_then(|i| record.cells.get(i))
            .and_then(|c| c.as_deref())
    }

    pub fn set_value(&mut self, pos: usize, column: AddressColumn, value: Cell) -> Result<()> {
        let i = self
            .column_index(column)
            .ok_or_else(|| anyhow!("Address table has no {} column", column))?;
        self.records[pos].cells[i] = value;
        Ok(())
    }

    pub fn record(&self, pos: usize) -> &AddressRecord {
        &self.records[pos]
    }

    /// Appends a record, keeping the `AID` cell in step with `record.aid`.
    pub fn push(&mut self, mut record: AddressRecord) {
        if let Some(&i) = self.columns.get(AID_COLUMN) {
            record.cells[i] = Some(record.aid.to_string());
        }
        self.by_aid.entry(record.aid).or_insert(self.records.len());
        self.records.push(record);
    }
}

/// One row of `fe.csv`.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    pub eid: String,
    pub cells: Vec<Cell>,
}

/// The entity table (`fe.csv`). Only `EID` is interpreted.
#[derive(Clone, Debug)]
pub struct EntityTable {
    pub headers: Vec<String>,
    pub records: Vec<EntityRecord>,
}

impl EntityTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// One row of `r_fe_fa.csv`.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub eid: String,
    pub aid: i64,
    pub cells: Vec<Cell>,
}

/// The entity to address relationship table (`r_fe_fa.csv`).
#[derive(Clone, Debug)]
pub struct RelationshipTable {
    headers: Vec<String>,
    aid_col: usize,
    records: Vec<Relationship>,
}

impl RelationshipTable {
    pub fn new(headers: Vec<String>, records: Vec<Relationship>) -> Result<Self> {
        let aid_col = headers
            .iter()
            .position(|h| h == REL_AID_COLUMN)
            .ok_or_else(|| anyhow!("Relationship table has no {} column", REL_AID_COLUMN))?;
        Ok(Self {
            headers,
            aid_col,
            records,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Relationship] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Points relationship `pos` at a different address.
    pub fn repoint(&mut self, pos: usize, aid: i64) {
        let record = &mut self.records[pos];
        record.aid = aid;
        record.cells[self.aid_col] = Some(aid.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    fn table() -> AddressTable {
        AddressTable::new(
            vec!["AID".to_owned(), "zip_c".to_owned()],
            vec![
                AddressRecord {
                    aid: 3,
                    cells: vec![Some("3".to_owned()), Some("_12345".to_owned())],
                },
                AddressRecord {
                    aid: 7,
                    cells: vec![Some("7".to_owned()), None],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rule_names_round_trip_through_cli_names() {
        for rule in Rule::iter() {
            assert_eq!(Rule::from_str(rule.as_ref()).unwrap(), rule);
        }
        assert!(Rule::from_str("rule-5").is_err());
    }

    #[test]
    fn test_address_table_lookup() {
        let t = table();
        assert_eq!(t.max_aid(), 7);
        assert_eq!(t.value(t.find(3).unwrap(), AddressColumn::Zip), Some("_12345"));
        assert_eq!(t.value(t.find(7).unwrap(), AddressColumn::Zip), None);
        // Absent column reads as missing
        assert_eq!(t.value(t.find(3).unwrap(), AddressColumn::City), None);
        assert!(t.find(4).is_none());
    }

    #[test]
    fn test_push_syncs_aid_cell() {
        let mut t = table();
        let mut copy = t.find(3).unwrap().clone();
        copy.aid = 8;
        t.push(copy);
        assert_eq!(t.find(8).unwrap().cells[0].as_deref(), Some("8"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_set_value_missing_column_is_err() {
        let mut t = table();
        let e = t
            .set_value(0, AddressColumn::City, Some("x".to_owned()))
            .expect_err("city_c is not in the table");
        assert_eq!(e.to_string(), "Address table has no city_c column");
    }

    #[test]
    fn test_table_without_aid_is_err() {
        assert!(AddressTable::new(vec!["zip_c".to_owned()], vec![]).is_err());
    }
}
