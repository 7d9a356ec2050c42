// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Reading the input CSVs and writing cleaned output.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

use super::models::{
    AddressRecord, AddressTable, Cell, EntityRecord, EntityTable, ProposedChange, Relationship,
    RelationshipTable, AID_COLUMN, EID_COLUMN, REL_AID_COLUMN, REL_EID_COLUMN,
};

pub const ADDRESS_FILE: &str = "fa.csv";
pub const ENTITY_FILE: &str = "fe.csv";
pub const RELATIONSHIP_FILE: &str = "r_fe_fa.csv";
pub const ADDRESS_OUTPUT_FILE: &str = "fa_cleaned.csv";
pub const RELATIONSHIP_OUTPUT_FILE: &str = "r_fe_fa_cleaned.csv";

/// Headers and raw rows of one CSV file.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    fn column(&self, name: &str, path: &Path) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("{} has no {} column", path.display(), name))
    }
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Malformed row in {}", path.display()))?;
        if record.len() > headers.len() {
            bail!(
                "{} row {}: {} fields, header has {}",
                path.display(),
                i + 1,
                record.len(),
                headers.len()
            );
        }
        let mut cells: Vec<Cell> = record
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_owned()) })
            .collect();
        // Short rows are padded
        cells.resize(headers.len(), None);
        rows.push(cells);
    }
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(RawTable { headers, rows })
}

/// Parses an identifier column value as an integer. Integral floats (as
/// written by tools that widen integer columns) are accepted.
pub fn parse_id(raw: Option<&str>) -> Result<i64> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        bail!("missing identifier");
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(anyhow!("{:?} is not an integer identifier", raw)),
    }
}

fn load_addresses(path: &Path) -> Result<AddressTable> {
    let raw = read_csv(path)?;
    let aid_col = raw.column(AID_COLUMN, path)?;
    let records = raw
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, cells)| {
            let aid = parse_id(cells[aid_col].as_deref())
                .with_context(|| format!("{} row {}: bad {}", path.display(), i + 1, AID_COLUMN))?;
            Ok(AddressRecord { aid, cells })
        })
        .collect::<Result<Vec<_>>>()?;
    AddressTable::new(raw.headers, records)
}

fn load_entities(path: &Path) -> Result<EntityTable> {
    let raw = read_csv(path)?;
    let eid_col = raw.column(EID_COLUMN, path)?;
    let records = raw
        .rows
        .into_iter()
        .map(|cells| EntityRecord {
            eid: cells[eid_col].clone().unwrap_or_default(),
            cells,
        })
        .collect();
    Ok(EntityTable {
        headers: raw.headers,
        records,
    })
}

fn load_relationships(path: &Path) -> Result<RelationshipTable> {
    let raw = read_csv(path)?;
    let eid_col = raw.column(REL_EID_COLUMN, path)?;
    let aid_col = raw.column(REL_AID_COLUMN, path)?;
    let records = raw
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, cells)| {
            let aid = parse_id(cells[aid_col].as_deref()).with_context(|| {
                format!("{} row {}: bad {}", path.display(), i + 1, REL_AID_COLUMN)
            })?;
            Ok(Relationship {
                eid: cells[eid_col].clone().unwrap_or_default(),
                aid,
                cells,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    RelationshipTable::new(raw.headers, records)
}

/// Loads `fa.csv`, `fe.csv`, and `r_fe_fa.csv` from `dir`.
///
/// # Errors
///
/// Returns an error if a file is missing or malformed, lacks its key column,
/// or has an AID that isn't an integer.
pub fn load_data(dir: &Path) -> Result<(AddressTable, EntityTable, RelationshipTable)> {
    let addresses = load_addresses(&dir.join(ADDRESS_FILE))?;
    let entities = load_entities(&dir.join(ENTITY_FILE))?;
    let relationships = load_relationships(&dir.join(RELATIONSHIP_FILE))?;
    info!(
        "Loaded fa=({}, {}) fe=({}, {}) r_fe_fa=({}, {})",
        addresses.len(),
        addresses.headers().len(),
        entities.len(),
        entities.headers.len(),
        relationships.len(),
        relationships.headers().len()
    );
    Ok((addresses, entities, relationships))
}

fn write_csv<'a, I>(path: &Path, headers: &[String], rows: I) -> Result<()>
where
    I: Iterator<Item = &'a [Cell]>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(headers)?;
    for cells in rows {
        writer.write_record(cells.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `fa_cleaned.csv` and `r_fe_fa_cleaned.csv` into `dir`, creating it
/// if needed.
pub fn write_outputs(
    dir: &Path,
    addresses: &AddressTable,
    relationships: &RelationshipTable,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    write_csv(
        &dir.join(ADDRESS_OUTPUT_FILE),
        addresses.headers(),
        addresses.records().iter().map(|r| r.cells.as_slice()),
    )?;
    write_csv(
        &dir.join(RELATIONSHIP_OUTPUT_FILE),
        relationships.headers(),
        relationships.records().iter().map(|r| r.cells.as_slice()),
    )?;
    debug!("wrote cleaned tables to {}", dir.display());
    Ok(())
}

/// Exports proposals as pretty JSON (`.json` paths) or CSV (anything else).
pub fn write_proposals(path: &Path, proposals: &[ProposedChange]) -> Result<()> {
    let is_json = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), proposals)?;
    } else {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for p in proposals {
            writer.serialize(p)?;
        }
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::core::models::{AddressColumn, Rule};

    fn write_inputs(dir: &Path, fa: &str, fe: &str, rel: &str) {
        fs::write(dir.join(ADDRESS_FILE), fa).unwrap();
        fs::write(dir.join(ENTITY_FILE), fe).unwrap();
        fs::write(dir.join(RELATIONSHIP_FILE), rel).unwrap();
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("42")).unwrap(), 42);
        assert_eq!(parse_id(Some(" 42 ")).unwrap(), 42);
        assert_eq!(parse_id(Some("42.0")).unwrap(), 42);
        assert!(parse_id(Some("42.5")).is_err());
        assert!(parse_id(Some("abc")).is_err());
        assert!(parse_id(None).is_err());
    }

    #[test]
    fn test_load_and_write_preserves_columns() {
        let tmp = TempDir::new().unwrap();
        write_inputs(
            tmp.path(),
            "AID,num1_c,zip_c,extra\n1,10,,x\n2,12,_12345,\n",
            "EID,name\nA,Alice\n",
            "EID_1,AID_2,relationshipType,number\nA,1,owner,1\nA,2,owner,2\n",
        );
        let (fa, fe, r) = load_data(tmp.path()).unwrap();
        assert_eq!(fa.len(), 2);
        assert_eq!(fe.len(), 1);
        assert_eq!(r.len(), 2);
        assert_eq!(fa.value(fa.find(1).unwrap(), AddressColumn::Zip), None);
        assert_eq!(r.records()[1].aid, 2);

        let out = tmp.path().join("out");
        write_outputs(&out, &fa, &r).unwrap();
        assert_eq!(
            fs::read_to_string(out.join(ADDRESS_OUTPUT_FILE)).unwrap(),
            "AID,num1_c,zip_c,extra\n1,10,,x\n2,12,_12345,\n"
        );
        assert_eq!(
            fs::read_to_string(out.join(RELATIONSHIP_OUTPUT_FILE)).unwrap(),
            "EID_1,AID_2,relationshipType,number\nA,1,owner,1\nA,2,owner,2\n"
        );
    }

    #[test]
    fn test_missing_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let e = load_data(tmp.path()).expect_err("no input files");
        assert!(format!("{:#}", e).contains("fa.csv"));
    }

    #[test]
    fn test_bad_aid_is_err() {
        let tmp = TempDir::new().unwrap();
        write_inputs(
            tmp.path(),
            "AID,zip_c\nfirst,\n",
            "EID\nA\n",
            "EID_1,AID_2\nA,1\n",
        );
        let e = load_data(tmp.path()).expect_err("AID is not an integer");
        assert!(format!("{:#}", e).contains("row 1: bad AID"));
    }

    #[test]
    fn test_row_longer_than_header_is_err() {
        let tmp = TempDir::new().unwrap();
        write_inputs(
            tmp.path(),
            "AID,num1_c\n1,10,Apt 4B\n",
            "EID\nA\n",
            "EID_1,AID_2\nA,1\n",
        );
        let e = load_data(tmp.path()).expect_err("extra field would be dropped");
        assert!(e.to_string().ends_with("fa.csv row 1: 3 fields, header has 2"));
    }

    #[test]
    fn test_short_row_is_padded() {
        let tmp = TempDir::new().unwrap();
        write_inputs(
            tmp.path(),
            "AID,num1_c,zip_c\n1,10\n",
            "EID\nA\n",
            "EID_1,AID_2\nA,1\n",
        );
        let (fa, _, _) = load_data(tmp.path()).unwrap();
        assert_eq!(fa.records()[0].cells.len(), 3);
        assert_eq!(fa.value(fa.find(1).unwrap(), AddressColumn::Zip), None);
    }

    #[test]
    fn test_missing_key_column_is_err() {
        let tmp = TempDir::new().unwrap();
        write_inputs(tmp.path(), "AID\n1\n", "EID\nA\n", "EID_1,address\nA,1\n");
        let e = load_data(tmp.path()).expect_err("no AID_2 column");
        assert!(e.to_string().contains("has no AID_2 column"));
    }

    #[test]
    fn test_write_proposals_csv_and_json() {
        let tmp = TempDir::new().unwrap();
        let proposals = vec![ProposedChange {
            original_aid: 7,
            eid_context: None,
            column: AddressColumn::City,
            original_value: Some("Chicgo".to_owned()),
            proposed_value: "Chicago".to_owned(),
            rule: Rule::CityNames,
        }];

        let csv_path = tmp.path().join("proposals.csv");
        write_proposals(&csv_path, &proposals).unwrap();
        assert_eq!(
            fs::read_to_string(&csv_path).unwrap(),
            "original_AID,EID_context,column_to_change,original_value,proposed_value,rule_name\n\
             7,,city_c,Chicgo,Chicago,Rule 4: Fuzzy city by ZIP\n"
        );

        let json_path = tmp.path().join("proposals.json");
        write_proposals(&json_path, &proposals).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed[0]["original_AID"], 7);
        assert_eq!(parsed[0]["column_to_change"], "city_c");
        assert_eq!(parsed[0]["EID_context"], serde_json::Value::Null);
    }
}
