//! BDPM identifier types.
//!
//! Every key in the BDPM flat files is a plain decimal integer. They are kept
//! signed so that a malformed negative value survives parsing and can be
//! rejected by the join with a proper warning.

/// Code Identifiant de Spécialité: identifies one medicinal product.
///
/// # Examples
///
/// ```
/// use bdpm_types::Cis;
///
/// let doliprane: Cis = 60904643;
/// assert!(doliprane > 0);
/// ```
pub type Cis = i64;

/// Code Identifiant de Présentation, either the 7-digit or the 13-digit form.
pub type Cip = i64;

/// Identifier of a generique equivalence group.
pub type GroupId = i64;
