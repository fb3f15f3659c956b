//! Prescription condition row type.

use crate::Cis;

/// A row from the conditions file (`CIS_CPD_bdpm.txt`).
///
/// Conditions are free text ("liste I", "prescription hospitalière", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    /// Product the condition applies to.
    pub cis: Cis,
    /// Condition text.
    pub condition: String,
}
