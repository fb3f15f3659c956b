//! Specialite row type.
//!
//! This module provides the `Specialite` struct representing one line of the
//! `CIS_bdpm.txt` file, the base record every medicament is built from.

use crate::Cis;

/// A row from the specialites file (`CIS_bdpm.txt`).
///
/// # Examples
///
/// ```
/// use bdpm_types::Specialite;
///
/// let specialite = Specialite {
///     cis: 60904643,
///     denomination: "DOLIPRANE 1000 mg, comprimé".to_string(),
///     forme_pharmaceutique: "comprimé".to_string(),
///     voies_administration: vec!["orale".to_string()],
///     ..Default::default()
/// };
///
/// assert!(specialite.has_required_fields());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Specialite {
    /// Product identifier.
    pub cis: Cis,
    /// Commercial name, including dosage and form.
    pub denomination: String,
    /// Pharmaceutical form (e.g. "comprimé pelliculé").
    pub forme_pharmaceutique: String,
    /// Administration routes, split on `;`.
    pub voies_administration: Vec<String>,
    /// Administrative status of the marketing authorisation (AMM).
    pub statut_autorisation: String,
    /// Authorisation procedure type.
    pub type_procedure: String,
    /// Marketing status ("Commercialisée", "Non commercialisée").
    pub etat_commercialisation: String,
    /// AMM date as published (`dd/mm/yyyy`).
    pub date_amm: String,
    /// BDM status ("Alerte", "Warning disponibilité" or empty).
    pub statut_bdm: String,
    /// European authorisation number, when the product has one.
    pub numero_autorisation_europeenne: String,
    /// Marketing authorisation holder(s).
    pub titulaire: String,
    /// Whether the product is under reinforced monitoring.
    pub surveillance_renforcee: bool,
}

impl Specialite {
    /// Returns true if the row carries what a publishable medicament needs:
    /// a positive CIS, a denomination and a pharmaceutical form.
    pub fn has_required_fields(&self) -> bool {
        self.cis > 0
            && !self.denomination.trim().is_empty()
            && !self.forme_pharmaceutique.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let valid = Specialite {
            cis: 61266250,
            denomination: "A 313 200 000 UI POUR CENT, pommade".to_string(),
            forme_pharmaceutique: "pommade".to_string(),
            ..Default::default()
        };
        assert!(valid.has_required_fields());

        let zero_cis = Specialite { cis: 0, ..valid.clone() };
        assert!(!zero_cis.has_required_fields());

        let blank_name = Specialite {
            denomination: "  ".to_string(),
            ..valid.clone()
        };
        assert!(!blank_name.has_required_fields());

        let no_form = Specialite {
            forme_pharmaceutique: String::new(),
            ..valid
        };
        assert!(!no_form.has_required_fields());
    }
}
