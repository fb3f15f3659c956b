//! Data quality report.
//!
//! Counts are re-derived from the collections about to be published, so the
//! report describes exactly what readers see. Duplicate keys are resolved
//! before publication and therefore come from the join's pre-passes.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use bdpm_types::{
    Cip, Cis, DataQualityReport, GeneriqueList, GroupId, Medicament, MissingSideRecords,
    Presentation,
};

/// Number of CIS values kept as a sample for each "without" counter.
pub const SAMPLE_SIZE: usize = 10;

/// Duplicate keys found while building the lookup maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateKeys {
    /// CIS values seen on several specialite rows.
    pub cis: Vec<Cis>,
    /// Group IDs seen with conflicting labels.
    pub group_ids: Vec<GroupId>,
    /// CIP7 codes seen on several presentations.
    pub cip7: Vec<Cip>,
    /// CIP13 codes seen on several presentations.
    pub cip13: Vec<Cip>,
}

/// Builds the report for one refresh.
///
/// `presentations` is every parsed presentation, including those whose CIS
/// has no medicament.
pub fn build_report(
    medicaments: &[Medicament],
    generiques: &[GeneriqueList],
    presentations: &[Presentation],
    duplicates: DuplicateKeys,
) -> DataQualityReport {
    let known_cis: HashSet<Cis> = medicaments.iter().map(|m| m.cis).collect();

    let orphan_cis = sorted_unique(generiques.iter().flat_map(|g| g.orphan_cis.iter().copied()));
    let presentations_with_orphan_cis = sorted_unique(
        presentations
            .iter()
            .map(|p| p.cis)
            .filter(|cis| !known_cis.contains(cis)),
    );

    DataQualityReport {
        duplicate_cis: duplicates.cis,
        duplicate_group_ids: duplicates.group_ids,
        duplicate_cip7: duplicates.cip7,
        duplicate_cip13: duplicates.cip13,
        medicaments_without_conditions: missing(medicaments, |m| m.conditions.is_empty()),
        medicaments_without_generiques: missing(medicaments, |m| m.generiques.is_empty()),
        medicaments_without_presentations: missing(medicaments, |m| m.presentations.is_empty()),
        medicaments_without_compositions: missing(medicaments, |m| m.composition.is_empty()),
        orphan_cis,
        presentations_with_orphan_cis,
    }
}

/// Returns the keys that occur more than once, ascending.
pub(crate) fn repeated<K>(keys: impl Iterator<Item = K>) -> Vec<K>
where
    K: Copy + Eq + Hash + Ord,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut dups: Vec<K> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(k, _)| k)
        .collect();
    dups.sort_unstable();
    dups
}

fn missing(medicaments: &[Medicament], lacks: impl Fn(&Medicament) -> bool) -> MissingSideRecords {
    let affected = sorted_unique(medicaments.iter().filter(|m| lacks(m)).map(|m| m.cis));
    MissingSideRecords {
        count: affected.len(),
        sample: affected.into_iter().take(SAMPLE_SIZE).collect(),
    }
}

fn sorted_unique(values: impl Iterator<Item = Cis>) -> Vec<Cis> {
    let mut values: Vec<Cis> = values.collect();
    values.sort_unstable();
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicament(cis: Cis) -> Medicament {
        Medicament {
            cis,
            denomination: format!("MEDICAMENT {}", cis),
            forme_pharmaceutique: "comprimé".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_counts_and_samples() {
        let mut medicaments: Vec<Medicament> = (1..=15).rev().map(medicament).collect();
        // medicaments[12] is CIS 3
        medicaments[12].conditions.push("liste I".to_string());

        let report = build_report(&medicaments, &[], &[], DuplicateKeys::default());

        assert_eq!(report.medicaments_without_conditions.count, 14);
        assert_eq!(
            report.medicaments_without_conditions.sample,
            vec![1, 2, 4, 5, 6, 7, 8, 9, 10, 11]
        );
        assert_eq!(report.medicaments_without_compositions.count, 15);
    }

    #[test]
    fn test_orphans_and_orphan_presentations() {
        let medicaments = vec![medicament(1)];
        let generiques = vec![
            GeneriqueList {
                group_id: 100,
                orphan_cis: vec![7, 2],
                ..Default::default()
            },
            GeneriqueList {
                group_id: 101,
                orphan_cis: vec![2],
                ..Default::default()
            },
        ];
        let presentations = vec![
            Presentation { cis: 1, cip7: 1, cip13: 11, ..Default::default() },
            Presentation { cis: 9, cip7: 2, cip13: 12, ..Default::default() },
            Presentation { cis: 9, cip7: 3, cip13: 13, ..Default::default() },
        ];

        let report = build_report(&medicaments, &generiques, &presentations, DuplicateKeys::default());

        assert_eq!(report.orphan_cis, vec![2, 7]);
        assert_eq!(report.presentations_with_orphan_cis, vec![9]);
        assert!(report.duplicate_group_ids.is_empty());
    }

    #[test]
    fn test_repeated_keys() {
        assert_eq!(repeated([5, 1, 5, 2, 1, 5].into_iter()), vec![1, 5]);
        assert!(repeated(std::iter::empty::<i64>()).is_empty());
    }
}
