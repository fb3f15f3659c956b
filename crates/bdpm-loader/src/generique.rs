//! Generiques file parser.
//!
//! Parses `CIS_GENER_bdpm.txt`.

use bdpm_types::{GeneriqueEntry, GeneriqueType};
use csv::StringRecord;

use crate::parser::{parse, BdpmRecord};
use crate::types::{BdpmResult, SourceKind};

/// Expected columns in the generiques file.
const GENERIQUE_COLUMNS: &[&str] = &[
    "identifiantGroupe",
    "libelleGroupe",
    "CIS",
    "typeGenerique",
    "numeroTri",
];

impl BdpmRecord for GeneriqueEntry {
    const KIND: SourceKind = SourceKind::Generiques;
    const EXPECTED_COLUMNS: &'static [&'static str] = GENERIQUE_COLUMNS;

    fn from_record(record: &StringRecord) -> BdpmResult<Self> {
        Ok(GeneriqueEntry {
            group_id: parse::integer(record, 0, GENERIQUE_COLUMNS[0])?,
            libelle: parse::required(record, 1, GENERIQUE_COLUMNS[1])?.to_string(),
            cis: parse::integer(record, 2, GENERIQUE_COLUMNS[2])?,
            generique_type: GeneriqueType::from_code(parse::integer(
                record,
                3,
                GENERIQUE_COLUMNS[3],
            )?),
            numero_tri: parse::optional_integer(record, 4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TsvParser;

    #[test]
    fn test_parse_generique_record() {
        let row = "1368\tPARACETAMOL 1000 mg - DOLIPRANE 1000 mg, comprimé\t60904643\t0\t1\t";
        let record = StringRecord::from(row.split('\t').collect::<Vec<_>>());

        let entry = GeneriqueEntry::from_record(&record).unwrap();
        assert_eq!(entry.group_id, 1368);
        assert_eq!(entry.cis, 60904643);
        assert_eq!(entry.generique_type, GeneriqueType::Princeps);
        assert_eq!(entry.numero_tri, Some(1));
    }

    #[test]
    fn test_rows_with_bad_type_or_group_are_skipped() {
        let data = "\
100\tGROUP A\t1\t0\t1
100\tGROUP A\t2\tx\t2
abc\tGROUP B\t3\t1\t1
101\tGROUP C\t4\t4\t1
";
        let parsed = TsvParser::<_, GeneriqueEntry>::from_reader(data.as_bytes())
            .parse_all()
            .unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.stats.skipped_records, 2);
        assert_eq!(
            parsed.records[1].generique_type,
            GeneriqueType::GeneriqueSubstituable
        );
    }
}
