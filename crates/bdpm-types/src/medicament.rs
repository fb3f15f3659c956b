//! Medicament type.
//!
//! A medicament is a [`Specialite`] row enriched with every side record that
//! shares its CIS.

use crate::{Cis, Composition, Generique, Presentation, Specialite};

/// A fully joined product record, as published in a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Medicament {
    /// Product identifier.
    pub cis: Cis,
    /// Commercial name.
    pub denomination: String,
    /// Pharmaceutical form.
    pub forme_pharmaceutique: String,
    /// Administration routes.
    pub voies_administration: Vec<String>,
    /// Administrative status of the marketing authorisation.
    pub statut_autorisation: String,
    /// Authorisation procedure type.
    pub type_procedure: String,
    /// Marketing status.
    pub etat_commercialisation: String,
    /// AMM date (`dd/mm/yyyy`).
    pub date_amm: String,
    /// BDM status.
    pub statut_bdm: String,
    /// European authorisation number.
    pub numero_autorisation_europeenne: String,
    /// Marketing authorisation holder(s).
    pub titulaire: String,
    /// Reinforced monitoring flag.
    pub surveillance_renforcee: bool,
    /// Components of the product.
    pub composition: Vec<Composition>,
    /// Generique groups the product belongs to.
    pub generiques: Vec<Generique>,
    /// Packagings of the product.
    pub presentations: Vec<Presentation>,
    /// Prescription and delivery conditions.
    pub conditions: Vec<String>,
}

impl Medicament {
    /// Builds a medicament from its specialite row with no side records.
    pub fn from_specialite(specialite: Specialite) -> Self {
        Self {
            cis: specialite.cis,
            denomination: specialite.denomination,
            forme_pharmaceutique: specialite.forme_pharmaceutique,
            voies_administration: specialite.voies_administration,
            statut_autorisation: specialite.statut_autorisation,
            type_procedure: specialite.type_procedure,
            etat_commercialisation: specialite.etat_commercialisation,
            date_amm: specialite.date_amm,
            statut_bdm: specialite.statut_bdm,
            numero_autorisation_europeenne: specialite.numero_autorisation_europeenne,
            titulaire: specialite.titulaire,
            surveillance_renforcee: specialite.surveillance_renforcee,
            ..Default::default()
        }
    }

    /// Returns true if the product is currently marketed.
    pub fn is_commercialise(&self) -> bool {
        self.etat_commercialisation.trim() == "Commercialisée"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_specialite_copies_scalars() {
        let specialite = Specialite {
            cis: 60904643,
            denomination: "DOLIPRANE 1000 mg, comprimé".to_string(),
            forme_pharmaceutique: "comprimé".to_string(),
            voies_administration: vec!["orale".to_string()],
            etat_commercialisation: "Commercialisée".to_string(),
            titulaire: "OPELLA HEALTHCARE FRANCE".to_string(),
            surveillance_renforcee: false,
            ..Default::default()
        };

        let medicament = Medicament::from_specialite(specialite);
        assert_eq!(medicament.cis, 60904643);
        assert_eq!(medicament.voies_administration, vec!["orale"]);
        assert!(medicament.is_commercialise());
        assert!(medicament.composition.is_empty());
        assert!(medicament.presentations.is_empty());
    }
}
