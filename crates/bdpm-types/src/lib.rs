//! # bdpm-types
//!
//! Type definitions for the French public drug database (BDPM).
//!
//! This crate provides the rows of the five BDPM flat files (specialites,
//! presentations, compositions, generiques, conditions) and the joined
//! records built from them: [`Medicament`], [`GeneriqueList`] and the
//! [`DataQualityReport`].
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use bdpm_types::{GeneriqueType, Medicament, Specialite};
//!
//! let specialite = Specialite {
//!     cis: 60904643,
//!     denomination: "DOLIPRANE 1000 mg, comprimé".to_string(),
//!     forme_pharmaceutique: "comprimé".to_string(),
//!     ..Default::default()
//! };
//!
//! let medicament = Medicament::from_specialite(specialite);
//! assert_eq!(medicament.cis, 60904643);
//! assert_eq!(GeneriqueType::from_code(1), GeneriqueType::Generique);
//! ```

#![warn(missing_docs)]

mod composition;
mod condition;
mod generique;
mod ids;
mod medicament;
mod presentation;
pub mod quality;
mod specialite;

// Re-export all public types at crate root
pub use composition::{Composition, NatureComposant};
pub use condition::Condition;
pub use generique::{
    Generique, GeneriqueComposition, GeneriqueEntry, GeneriqueList, GeneriqueMedicament,
    GeneriqueType,
};
pub use ids::{Cip, Cis, GroupId};
pub use medicament::Medicament;
pub use presentation::Presentation;
pub use quality::{DataQualityReport, MissingSideRecords};
pub use specialite::Specialite;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let medicament = Medicament {
            cis: 60904643,
            denomination: "DOLIPRANE 1000 mg, comprimé".to_string(),
            forme_pharmaceutique: "comprimé".to_string(),
            generiques: vec![Generique {
                group_id: 1368,
                libelle: "PARACETAMOL 1000 mg - DOLIPRANE".to_string(),
                generique_type: GeneriqueType::Princeps,
            }],
            conditions: vec!["liste II".to_string()],
            ..Default::default()
        };

        let json = serde_json::to_string(&medicament).unwrap();
        let parsed: Medicament = serde_json::from_str(&json).unwrap();
        assert_eq!(medicament, parsed);
    }
}
