//! Specialites file parser.
//!
//! Parses `CIS_bdpm.txt`.

use bdpm_types::Specialite;
use csv::StringRecord;

use crate::parser::{parse, BdpmRecord};
use crate::types::{BdpmResult, SourceKind};

/// Expected columns in the specialites file.
const SPECIALITE_COLUMNS: &[&str] = &[
    "CIS",
    "denomination",
    "formePharmaceutique",
    "voiesAdministration",
    "statutAdministratifAMM",
    "typeProcedureAMM",
    "etatCommercialisation",
    "dateAMM",
    "statutBdm",
    "numeroAutorisationEuropeenne",
    "titulaires",
    "surveillanceRenforcee",
];

impl BdpmRecord for Specialite {
    const KIND: SourceKind = SourceKind::Specialites;
    const EXPECTED_COLUMNS: &'static [&'static str] = SPECIALITE_COLUMNS;

    fn from_record(record: &StringRecord) -> BdpmResult<Self> {
        Ok(Specialite {
            cis: parse::integer(record, 0, SPECIALITE_COLUMNS[0])?,
            denomination: parse::field(record, 1).to_string(),
            forme_pharmaceutique: parse::field(record, 2).to_string(),
            voies_administration: parse::list(parse::field(record, 3), ';'),
            statut_autorisation: parse::field(record, 4).to_string(),
            type_procedure: parse::field(record, 5).to_string(),
            etat_commercialisation: parse::field(record, 6).to_string(),
            date_amm: parse::field(record, 7).to_string(),
            statut_bdm: parse::field(record, 8).to_string(),
            numero_autorisation_europeenne: parse::field(record, 9).to_string(),
            titulaire: parse::field(record, 10).to_string(),
            surveillance_renforcee: parse::oui_non(parse::field(record, 11)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TsvParser;

    const ROW: &str = "60904643\tDOLIPRANE 1000 mg, comprimé\tcomprimé\torale\tAutorisation active\tProcédure nationale\tCommercialisée\t09/07/2002\t\t\t OPELLA HEALTHCARE FRANCE\tNon";

    #[test]
    fn test_parse_specialite_record() {
        let record = StringRecord::from(ROW.split('\t').collect::<Vec<_>>());

        let specialite = Specialite::from_record(&record).unwrap();
        assert_eq!(specialite.cis, 60904643);
        assert_eq!(specialite.denomination, "DOLIPRANE 1000 mg, comprimé");
        assert_eq!(specialite.forme_pharmaceutique, "comprimé");
        assert_eq!(specialite.voies_administration, vec!["orale"]);
        assert_eq!(specialite.date_amm, "09/07/2002");
        assert_eq!(specialite.statut_bdm, "");
        assert_eq!(specialite.titulaire, "OPELLA HEALTHCARE FRANCE");
        assert!(!specialite.surveillance_renforcee);
    }

    #[test]
    fn test_multiple_routes_and_monitoring() {
        let row = "61266250\tA 313, pommade\tpommade\tcutanée;ophtalmique\tAutorisation active\tProcédure nationale\tCommercialisée\t12/03/1998\tAlerte\tEU/1/00/000/001\tPHARMA\tOui";
        let record = StringRecord::from(row.split('\t').collect::<Vec<_>>());

        let specialite = Specialite::from_record(&record).unwrap();
        assert_eq!(specialite.voies_administration, vec!["cutanée", "ophtalmique"]);
        assert_eq!(specialite.statut_bdm, "Alerte");
        assert_eq!(specialite.numero_autorisation_europeenne, "EU/1/00/000/001");
        assert!(specialite.surveillance_renforcee);
    }

    #[test]
    fn test_empty_denomination_is_not_a_row_error() {
        // Left to the join, which excludes it with a warning
        let row = "1\t\t\torale\t\t\t\t\t\t\t\tNon";
        let parsed = TsvParser::<_, Specialite>::from_reader(row.as_bytes())
            .parse_all()
            .unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert!(!parsed.records[0].has_required_fields());
    }

    #[test]
    fn test_short_row_is_skipped() {
        let data = format!("{}\n60904644\tTRUNCATED\tcomprimé\n", ROW);
        let parsed = TsvParser::<_, Specialite>::from_reader(data.as_bytes())
            .parse_all()
            .unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.stats.skipped_records, 1);
    }
}
