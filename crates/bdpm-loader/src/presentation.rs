//! Presentations file parser.
//!
//! Parses `CIS_CIP_bdpm.txt`. Both CIP codes are mandatory; the price is
//! optional and a malformed price does not invalidate the row.

use bdpm_types::Presentation;
use csv::StringRecord;

use crate::parser::{parse, BdpmRecord};
use crate::types::{BdpmResult, SourceKind};

/// Expected columns in the presentations file.
const PRESENTATION_COLUMNS: &[&str] = &[
    "CIS",
    "CIP7",
    "libellePresentation",
    "statutAdministratif",
    "etatCommercialisation",
    "dateDeclaration",
    "CIP13",
    "agrementCollectivites",
    "tauxRemboursement",
    "prix",
];

impl BdpmRecord for Presentation {
    const KIND: SourceKind = SourceKind::Presentations;
    const EXPECTED_COLUMNS: &'static [&'static str] = PRESENTATION_COLUMNS;

    fn from_record(record: &StringRecord) -> BdpmResult<Self> {
        Ok(Presentation {
            cis: parse::integer(record, 0, PRESENTATION_COLUMNS[0])?,
            cip7: parse::integer(record, 1, PRESENTATION_COLUMNS[1])?,
            libelle: parse::field(record, 2).to_string(),
            statut_administratif: parse::field(record, 3).to_string(),
            etat_commercialisation: parse::field(record, 4).to_string(),
            date_declaration: parse::field(record, 5).to_string(),
            cip13: parse::integer(record, 6, PRESENTATION_COLUMNS[6])?,
            agrement_collectivites: parse::field(record, 7).to_string(),
            taux_remboursement: parse::field(record, 8).to_string(),
            prix: parse::french_decimal(parse::field(record, 9)),
        })
    }
}
