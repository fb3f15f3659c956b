//! Composition row type.

use crate::Cis;

/// Nature of a composition line.
///
/// The BDPM distinguishes the active substance (`SA`) from the therapeutic
/// fraction (`FT`) it may be expressed as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NatureComposant {
    /// Substance active.
    SubstanceActive,
    /// Fraction thérapeutique.
    FractionTherapeutique,
    /// Any other code found in the file, kept verbatim.
    Other(String),
}

impl NatureComposant {
    /// Code used in the file for an active substance.
    pub const SUBSTANCE_ACTIVE_CODE: &'static str = "SA";
    /// Code used in the file for a therapeutic fraction.
    pub const FRACTION_THERAPEUTIQUE_CODE: &'static str = "FT";

    /// Decodes a nature code.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            Self::SUBSTANCE_ACTIVE_CODE => Self::SubstanceActive,
            Self::FRACTION_THERAPEUTIQUE_CODE => Self::FractionTherapeutique,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the file code for this nature.
    pub fn code(&self) -> &str {
        match self {
            Self::SubstanceActive => Self::SUBSTANCE_ACTIVE_CODE,
            Self::FractionTherapeutique => Self::FRACTION_THERAPEUTIQUE_CODE,
            Self::Other(code) => code,
        }
    }
}

/// A row from the compositions file (`CIS_COMPO_bdpm.txt`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Composition {
    /// Product this component belongs to.
    pub cis: Cis,
    /// Pharmaceutical element the line describes (e.g. "comprimé").
    pub element_pharmaceutique: String,
    /// Substance code.
    pub code_substance: i64,
    /// Substance name.
    pub denomination_substance: String,
    /// Dosage (e.g. "1000 mg").
    pub dosage: String,
    /// What the dosage refers to (e.g. "un comprimé").
    pub reference_dosage: String,
    /// Active substance or therapeutic fraction.
    pub nature_composant: NatureComposant,
    /// Links an `SA` line to its `FT` line, when present.
    pub numero_liaison: Option<u32>,
}

impl Composition {
    /// Returns true if this line is an active substance.
    pub fn is_active_substance(&self) -> bool {
        self.nature_composant == NatureComposant::SubstanceActive
    }
}
