//! Generique group types.
//!
//! The generiques file lists, for every equivalence group, which products
//! belong to it and in which role. From those rows the join builds two
//! views: membership records attached to each medicament, and one
//! [`GeneriqueList`] per group for publication.

use crate::{Cis, GroupId};

/// Role of a product inside a generique group.
///
/// # Examples
///
/// ```
/// use bdpm_types::GeneriqueType;
///
/// assert_eq!(GeneriqueType::from_code(0), GeneriqueType::Princeps);
/// assert_eq!(GeneriqueType::from_code(4).label(), "Générique substituable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeneriqueType {
    /// Reference product of the group.
    Princeps,
    /// Generique.
    Generique,
    /// Generique by posological complementarity.
    ComplementaritePosologique,
    /// Substitutable generique.
    GeneriqueSubstituable,
    /// Code not documented by the BDPM.
    Unknown(i64),
}

impl GeneriqueType {
    /// File code for a princeps.
    pub const PRINCEPS_CODE: i64 = 0;
    /// File code for a generique.
    pub const GENERIQUE_CODE: i64 = 1;
    /// File code for a generique by posological complementarity.
    pub const COMPLEMENTARITE_POSOLOGIQUE_CODE: i64 = 2;
    /// File code for a substitutable generique.
    pub const GENERIQUE_SUBSTITUABLE_CODE: i64 = 4;

    /// Decodes the numeric type column.
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::PRINCEPS_CODE => Self::Princeps,
            Self::GENERIQUE_CODE => Self::Generique,
            Self::COMPLEMENTARITE_POSOLOGIQUE_CODE => Self::ComplementaritePosologique,
            Self::GENERIQUE_SUBSTITUABLE_CODE => Self::GeneriqueSubstituable,
            other => Self::Unknown(other),
        }
    }

    /// Returns the numeric file code.
    pub fn code(self) -> i64 {
        match self {
            Self::Princeps => Self::PRINCEPS_CODE,
            Self::Generique => Self::GENERIQUE_CODE,
            Self::ComplementaritePosologique => Self::COMPLEMENTARITE_POSOLOGIQUE_CODE,
            Self::GeneriqueSubstituable => Self::GENERIQUE_SUBSTITUABLE_CODE,
            Self::Unknown(code) => code,
        }
    }

    /// Human readable label, as shown to API consumers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Princeps => "Princeps",
            Self::Generique => "Générique",
            Self::ComplementaritePosologique => "Générique par complémentarité posologique",
            Self::GeneriqueSubstituable => "Générique substituable",
            Self::Unknown(_) => "Inconnu",
        }
    }
}

/// A row from the generiques file (`CIS_GENER_bdpm.txt`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneriqueEntry {
    /// Group identifier.
    pub group_id: GroupId,
    /// Group label, usually the substance and dosage.
    pub libelle: String,
    /// Member product.
    pub cis: Cis,
    /// Role of the product in the group.
    pub generique_type: GeneriqueType,
    /// Sort order within the group, when published.
    pub numero_tri: Option<u32>,
}

/// Membership of one medicament in a generique group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Generique {
    /// Group identifier.
    pub group_id: GroupId,
    /// Group label.
    pub libelle: String,
    /// Role of the medicament in the group.
    pub generique_type: GeneriqueType,
}

/// Composition line copied into the public generique view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneriqueComposition {
    /// Pharmaceutical element.
    pub element_pharmaceutique: String,
    /// Substance code.
    pub code_substance: i64,
    /// Substance name.
    pub denomination_substance: String,
    /// Dosage.
    pub dosage: String,
}

/// A medicament as listed inside a [`GeneriqueList`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneriqueMedicament {
    /// Product identifier.
    pub cis: Cis,
    /// Product name.
    pub denomination: String,
    /// Pharmaceutical form.
    pub forme_pharmaceutique: String,
    /// Role of the product in this group.
    pub generique_type: GeneriqueType,
    /// Denormalised composition of the product.
    pub composition: Vec<GeneriqueComposition>,
}

/// Publication view of one generique group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneriqueList {
    /// Group identifier.
    pub group_id: GroupId,
    /// Group label.
    pub libelle: String,
    /// Members that resolved to a published medicament.
    pub medicaments: Vec<GeneriqueMedicament>,
    /// Members listed in the grouping with no medicament record.
    pub orphan_cis: Vec<Cis>,
}

impl GeneriqueList {
    /// Returns true if at least one member did not resolve.
    pub fn has_orphans(&self) -> bool {
        !self.orphan_cis.is_empty()
    }

    /// Returns the number of listed products, resolved or not.
    pub fn member_count(&self) -> usize {
        self.medicaments.len() + self.orphan_cis.len()
    }
}
