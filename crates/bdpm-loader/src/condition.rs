//! Conditions file parser.
//!
//! Parses `CIS_CPD_bdpm.txt`.

use bdpm_types::Condition;
use csv::StringRecord;

use crate::parser::{parse, BdpmRecord};
use crate::types::{BdpmResult, SourceKind};

/// Expected columns in the conditions file.
const CONDITION_COLUMNS: &[&str] = &["CIS", "condition"];

impl BdpmRecord for Condition {
    const KIND: SourceKind = SourceKind::Conditions;
    const EXPECTED_COLUMNS: &'static [&'static str] = CONDITION_COLUMNS;

    fn from_record(record: &StringRecord) -> BdpmResult<Self> {
        Ok(Condition {
            cis: parse::integer(record, 0, CONDITION_COLUMNS[0])?,
            condition: parse::required(record, 1, CONDITION_COLUMNS[1])?.to_string(),
        })
    }
}
