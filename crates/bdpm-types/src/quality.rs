//! Data quality report type.
//!
//! The report is computed once per refresh by the loader and published next
//! to the snapshot it describes.

use crate::{Cip, Cis, GroupId};

/// Medicaments lacking one kind of side record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MissingSideRecords {
    /// Number of medicaments affected.
    pub count: usize,
    /// Smallest affected CIS values, ascending.
    pub sample: Vec<Cis>,
}

/// Data quality findings for one published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataQualityReport {
    /// CIS values that appeared on more than one specialite row.
    pub duplicate_cis: Vec<Cis>,
    /// Group IDs that appear more than once among published generique lists.
    pub duplicate_group_ids: Vec<GroupId>,
    /// CIP7 codes shared by more than one presentation.
    pub duplicate_cip7: Vec<Cip>,
    /// CIP13 codes shared by more than one presentation.
    pub duplicate_cip13: Vec<Cip>,
    /// Medicaments with no prescription condition.
    pub medicaments_without_conditions: MissingSideRecords,
    /// Medicaments in no generique group.
    pub medicaments_without_generiques: MissingSideRecords,
    /// Medicaments with no presentation.
    pub medicaments_without_presentations: MissingSideRecords,
    /// Medicaments with no composition line.
    pub medicaments_without_compositions: MissingSideRecords,
    /// Grouped CIS values with no medicament record, ascending.
    pub orphan_cis: Vec<Cis>,
    /// CIS values referenced by presentations with no medicament, ascending.
    pub presentations_with_orphan_cis: Vec<Cis>,
}

impl DataQualityReport {
    /// Returns true if the report found nothing to flag.
    pub fn is_clean(&self) -> bool {
        self.duplicate_cis.is_empty()
            && self.duplicate_group_ids.is_empty()
            && self.duplicate_cip7.is_empty()
            && self.duplicate_cip13.is_empty()
            && self.orphan_cis.is_empty()
            && self.presentations_with_orphan_cis.is_empty()
            && self.medicaments_without_conditions.count == 0
            && self.medicaments_without_generiques.count == 0
            && self.medicaments_without_presentations.count == 0
            && self.medicaments_without_compositions.count == 0
    }

    /// Total number of duplicate keys of any kind.
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_cis.len()
            + self.duplicate_group_ids.len()
            + self.duplicate_cip7.len()
            + self.duplicate_cip13.len()
    }
}
