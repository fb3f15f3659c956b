//! Presentation row type.
//!
//! A presentation is one packaging of a product, identified by its CIP codes.

use crate::{Cip, Cis};

/// A row from the presentations file (`CIS_CIP_bdpm.txt`).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Presentation {
    /// Product this presentation belongs to.
    pub cis: Cis,
    /// Seven-digit presentation code.
    pub cip7: Cip,
    /// Packaging label (e.g. "plaquette(s) PVC aluminium de 8 comprimé(s)").
    pub libelle: String,
    /// Administrative status of the presentation.
    pub statut_administratif: String,
    /// Marketing state of the presentation.
    pub etat_commercialisation: String,
    /// Marketing declaration date (`dd/mm/yyyy`).
    pub date_declaration: String,
    /// Thirteen-digit presentation code.
    pub cip13: Cip,
    /// Approval for use by collectivities ("oui", "non", "inconnu").
    pub agrement_collectivites: String,
    /// Reimbursement rate(s) as published (e.g. "65%").
    pub taux_remboursement: String,
    /// Public price in euros, absent when not published or not parseable.
    pub prix: Option<f64>,
}

impl Presentation {
    /// Returns true if a price is published for this presentation.
    pub fn is_priced(&self) -> bool {
        self.prix.is_some()
    }
}
