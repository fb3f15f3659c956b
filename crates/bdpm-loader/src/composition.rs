//! Compositions file parser.
//!
//! Parses `CIS_COMPO_bdpm.txt`.

use bdpm_types::{Composition, NatureComposant};
use csv::StringRecord;

use crate::parser::{parse, BdpmRecord};
use crate::types::{BdpmResult, SourceKind};

/// Expected columns in the compositions file.
const COMPOSITION_COLUMNS: &[&str] = &[
    "CIS",
    "elementPharmaceutique",
    "codeSubstance",
    "denominationSubstance",
    "dosage",
    "referenceDosage",
    "natureComposant",
    "numeroLiaison",
];

impl BdpmRecord for Composition {
    const KIND: SourceKind = SourceKind::Compositions;
    const EXPECTED_COLUMNS: &'static [&'static str] = COMPOSITION_COLUMNS;

    fn from_record(record: &StringRecord) -> BdpmResult<Self> {
        Ok(Composition {
            cis: parse::integer(record, 0, COMPOSITION_COLUMNS[0])?,
            element_pharmaceutique: parse::field(record, 1).to_string(),
            code_substance: parse::integer(record, 2, COMPOSITION_COLUMNS[2])?,
            denomination_substance: parse::required(record, 3, COMPOSITION_COLUMNS[3])?
                .to_string(),
            dosage: parse::field(record, 4).to_string(),
            reference_dosage: parse::field(record, 5).to_string(),
            nature_composant: NatureComposant::from_code(parse::required(
                record,
                6,
                COMPOSITION_COLUMNS[6],
            )?),
            numero_liaison: parse::optional_integer(record, 7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TsvParser;

    #[test]
    fn test_parse_composition_record() {
        let row = "60904643\tcomprimé\t02202\tPARACÉTAMOL\t1000 mg\tun comprimé\tSA\t1\t";
        let record = StringRecord::from(row.split('\t').collect::<Vec<_>>());

        let composition = Composition::from_record(&record).unwrap();
        assert_eq!(composition.cis, 60904643);
        assert_eq!(composition.code_substance, 2202);
        assert_eq!(composition.denomination_substance, "PARACÉTAMOL");
        assert_eq!(composition.dosage, "1000 mg");
        assert_eq!(composition.reference_dosage, "un comprimé");
        assert!(composition.is_active_substance());
        assert_eq!(composition.numero_liaison, Some(1));
    }

    #[test]
    fn test_consecutive_tabs_in_required_column_skip_row() {
        let data = "1\tcomprimé\t100\t\t\t\tSA\t1\n2\tcomprimé\t200\tIBUPROFÈNE\t400 mg\tun comprimé\tSA\t\n";
        let parsed = TsvParser::<_, Composition>::from_reader(data.as_bytes())
            .parse_all()
            .unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].cis, 2);
        assert_eq!(parsed.records[0].numero_liaison, None);
        assert_eq!(parsed.stats.skipped_records, 1);
    }
}
