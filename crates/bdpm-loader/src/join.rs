//! Join and enrichment of the five BDPM sources.
//!
//! Every side table is indexed by CIS in one pass, then each specialite row
//! becomes a [`Medicament`] carrying the side records that share its CIS.
//! Generique groups are resolved against the resulting medicaments; members
//! without a medicament are kept as orphans instead of being dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use bdpm_types::{
    Cip, Cis, Composition, Condition, DataQualityReport, Generique, GeneriqueComposition,
    GeneriqueEntry, GeneriqueList, GeneriqueMedicament, GeneriqueType, GroupId, Medicament,
    Presentation, Specialite,
};

use crate::quality::{build_report, repeated, DuplicateKeys};

/// Raw group to CIS mapping derived from the generiques file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneriqueGrouping {
    /// Member CIS of each group, in file order, ascending by group.
    members: BTreeMap<GroupId, Vec<Cis>>,
    /// Label of each group (first row wins).
    libelles: HashMap<GroupId, String>,
    /// Role of each member within its group.
    types: HashMap<(GroupId, Cis), GeneriqueType>,
    /// Groups whose rows disagree on the label.
    conflicting: BTreeSet<GroupId>,
}

impl GeneriqueGrouping {
    /// Creates an empty grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the grouping from parsed generiques rows.
    pub fn from_entries(entries: &[GeneriqueEntry]) -> Self {
        let mut grouping = Self::new();
        for entry in entries {
            grouping.add(entry.group_id, &entry.libelle, entry.cis, entry.generique_type);
        }
        grouping
    }

    /// Adds `cis` to group `group_id`. A CIS listed twice in the same group
    /// is kept once, with the last type seen. A group ID reused with another
    /// label keeps its first label and is recorded as a duplicate key.
    pub fn add(&mut self, group_id: GroupId, libelle: &str, cis: Cis, generique_type: GeneriqueType) {
        match self.libelles.get(&group_id) {
            Some(known) if known != libelle => {
                if self.conflicting.insert(group_id) {
                    tracing::warn!(
                        "Duplicate group ID {} with labels {:?} and {:?}, keeping the first",
                        group_id,
                        known,
                        libelle
                    );
                }
            }
            Some(_) => {}
            None => {
                self.libelles.insert(group_id, libelle.to_string());
            }
        }

        let members = self.members.entry(group_id).or_default();
        if !members.contains(&cis) {
            members.push(cis);
        }
        self.types.insert((group_id, cis), generique_type);
    }

    /// Returns the number of groups.
    pub fn group_count(&self) -> usize {
        self.members.len()
    }

    /// Group IDs seen with more than one label, ascending.
    pub fn conflicting_group_ids(&self) -> Vec<GroupId> {
        self.conflicting.iter().copied().collect()
    }

    /// Returns the members of a group.
    pub fn members(&self, group_id: GroupId) -> Option<&[Cis]> {
        self.members.get(&group_id).map(Vec::as_slice)
    }

    fn libelle(&self, group_id: GroupId) -> &str {
        self.libelles.get(&group_id).map(String::as_str).unwrap_or("")
    }

    fn generique_type(&self, group_id: GroupId, cis: Cis) -> GeneriqueType {
        self.types
            .get(&(group_id, cis))
            .copied()
            .unwrap_or(GeneriqueType::Unknown(-1))
    }
}

/// Parsed content of the five sources, ready to be joined.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    /// Specialite rows.
    pub specialites: Vec<Specialite>,
    /// Presentation rows.
    pub presentations: Vec<Presentation>,
    /// Composition rows.
    pub compositions: Vec<Composition>,
    /// Group to CIS mapping from the generiques rows.
    pub grouping: GeneriqueGrouping,
    /// Condition rows.
    pub conditions: Vec<Condition>,
}

/// Output of a successful join: everything a snapshot is made of.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Medicaments, one per CIS, in first-seen order.
    pub medicaments: Vec<Medicament>,
    /// Generique lists, ascending by group ID.
    pub generiques: Vec<GeneriqueList>,
    /// Medicaments keyed by CIS.
    pub medicaments_by_cis: HashMap<Cis, Medicament>,
    /// Generique lists keyed by group ID.
    pub generiques_by_group: HashMap<GroupId, GeneriqueList>,
    /// Presentations keyed by CIP7 (last one wins).
    pub presentations_by_cip7: HashMap<Cip, Presentation>,
    /// Presentations keyed by CIP13 (last one wins).
    pub presentations_by_cip13: HashMap<Cip, Presentation>,
    /// Quality findings for this dataset.
    pub report: DataQualityReport,
}

/// Side records indexed by CIS.
struct SideTables {
    compositions: HashMap<Cis, Vec<Composition>>,
    generiques: HashMap<Cis, Vec<Generique>>,
    presentations: HashMap<Cis, Vec<Presentation>>,
    conditions: HashMap<Cis, Vec<String>>,
}

impl SideTables {
    fn build(data: &SourceData, compositions: Vec<Composition>, conditions: Vec<Condition>) -> Self {
        let mut by_cis_compositions: HashMap<Cis, Vec<Composition>> = HashMap::new();
        for composition in compositions {
            by_cis_compositions
                .entry(composition.cis)
                .or_default()
                .push(composition);
        }

        let mut by_cis_generiques: HashMap<Cis, Vec<Generique>> = HashMap::new();
        for (&group_id, members) in &data.grouping.members {
            for &cis in members {
                by_cis_generiques.entry(cis).or_default().push(Generique {
                    group_id,
                    libelle: data.grouping.libelle(group_id).to_string(),
                    generique_type: data.grouping.generique_type(group_id, cis),
                });
            }
        }

        let mut by_cis_presentations: HashMap<Cis, Vec<Presentation>> = HashMap::new();
        for presentation in &data.presentations {
            by_cis_presentations
                .entry(presentation.cis)
                .or_default()
                .push(presentation.clone());
        }

        let mut by_cis_conditions: HashMap<Cis, Vec<String>> = HashMap::new();
        for condition in conditions {
            by_cis_conditions
                .entry(condition.cis)
                .or_default()
                .push(condition.condition);
        }

        Self {
            compositions: by_cis_compositions,
            generiques: by_cis_generiques,
            presentations: by_cis_presentations,
            conditions: by_cis_conditions,
        }
    }

    fn enrich(&self, specialite: Specialite) -> Medicament {
        let cis = specialite.cis;
        let mut medicament = Medicament::from_specialite(specialite);
        medicament.composition = self.compositions.get(&cis).cloned().unwrap_or_default();
        medicament.generiques = self.generiques.get(&cis).cloned().unwrap_or_default();
        medicament.presentations = self.presentations.get(&cis).cloned().unwrap_or_default();
        medicament.conditions = self.conditions.get(&cis).cloned().unwrap_or_default();
        medicament
    }
}

/// Joins the five sources into a publishable dataset.
///
/// Invalid specialites (non-positive CIS, empty denomination or form) are
/// dropped with a warning. Duplicate CIS, CIP7 and CIP13 keys are logged and
/// resolved by keeping the last row.
pub fn build_dataset(mut data: SourceData) -> Dataset {
    let compositions = std::mem::take(&mut data.compositions);
    let conditions = std::mem::take(&mut data.conditions);
    let specialites = std::mem::take(&mut data.specialites);

    let tables = SideTables::build(&data, compositions, conditions);
    let (specialites, duplicate_cis) = retain_valid_specialites(specialites);

    #[cfg(feature = "parallel")]
    let medicaments: Vec<Medicament> = specialites
        .into_par_iter()
        .map(|s| tables.enrich(s))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let medicaments: Vec<Medicament> = specialites.into_iter().map(|s| tables.enrich(s)).collect();

    let medicaments_by_cis: HashMap<Cis, Medicament> = medicaments
        .iter()
        .map(|m| (m.cis, m.clone()))
        .collect();

    let duplicate_cip7 = repeated(data.presentations.iter().map(|p| p.cip7));
    let duplicate_cip13 = repeated(data.presentations.iter().map(|p| p.cip13));
    for cip in &duplicate_cip7 {
        tracing::warn!("Duplicate CIP7 {}, keeping the last presentation", cip);
    }
    for cip in &duplicate_cip13 {
        tracing::warn!("Duplicate CIP13 {}, keeping the last presentation", cip);
    }

    let mut presentations_by_cip7 = HashMap::with_capacity(data.presentations.len());
    let mut presentations_by_cip13 = HashMap::with_capacity(data.presentations.len());
    for presentation in &data.presentations {
        presentations_by_cip7.insert(presentation.cip7, presentation.clone());
        presentations_by_cip13.insert(presentation.cip13, presentation.clone());
    }

    let generiques = build_generique_lists(&data.grouping, &medicaments_by_cis);
    let generiques_by_group: HashMap<GroupId, GeneriqueList> = generiques
        .iter()
        .map(|g| (g.group_id, g.clone()))
        .collect();

    let report = build_report(
        &medicaments,
        &generiques,
        &data.presentations,
        DuplicateKeys {
            cis: duplicate_cis,
            group_ids: data.grouping.conflicting_group_ids(),
            cip7: duplicate_cip7,
            cip13: duplicate_cip13,
        },
    );

    tracing::info!(
        "Joined {} medicaments, {} generique groups, {} presentations ({} orphan CIS)",
        medicaments.len(),
        generiques.len(),
        presentations_by_cip13.len(),
        report.orphan_cis.len()
    );

    Dataset {
        medicaments,
        generiques,
        medicaments_by_cis,
        generiques_by_group,
        presentations_by_cip7,
        presentations_by_cip13,
        report,
    }
}

/// Drops invalid rows and collapses duplicate CIS onto their first position,
/// keeping the content of the last row.
fn retain_valid_specialites(specialites: Vec<Specialite>) -> (Vec<Specialite>, Vec<Cis>) {
    let mut kept: Vec<Specialite> = Vec::with_capacity(specialites.len());
    let mut position: HashMap<Cis, usize> = HashMap::with_capacity(specialites.len());
    let mut duplicates = Vec::new();

    for specialite in specialites {
        if !specialite.has_required_fields() {
            tracing::warn!(
                "Excluding specialite CIS {}: missing CIS, denomination or pharmaceutical form",
                specialite.cis
            );
            continue;
        }

        match position.get(&specialite.cis) {
            Some(&index) => {
                tracing::warn!("Duplicate CIS {}, keeping the last row", specialite.cis);
                duplicates.push(specialite.cis);
                kept[index] = specialite;
            }
            None => {
                position.insert(specialite.cis, kept.len());
                kept.push(specialite);
            }
        }
    }

    duplicates.sort_unstable();
    duplicates.dedup();
    (kept, duplicates)
}

/// Resolves every group against the published medicaments.
fn build_generique_lists(
    grouping: &GeneriqueGrouping,
    medicaments_by_cis: &HashMap<Cis, Medicament>,
) -> Vec<GeneriqueList> {
    grouping
        .members
        .iter()
        .map(|(&group_id, members)| {
            let mut list = GeneriqueList {
                group_id,
                libelle: grouping.libelle(group_id).to_string(),
                ..Default::default()
            };

            for &cis in members {
                match medicaments_by_cis.get(&cis) {
                    Some(medicament) => list.medicaments.push(GeneriqueMedicament {
                        cis,
                        denomination: medicament.denomination.clone(),
                        forme_pharmaceutique: medicament.forme_pharmaceutique.clone(),
                        generique_type: grouping.generique_type(group_id, cis),
                        composition: medicament
                            .composition
                            .iter()
                            .map(|c| GeneriqueComposition {
                                element_pharmaceutique: c.element_pharmaceutique.clone(),
                                code_substance: c.code_substance,
                                denomination_substance: c.denomination_substance.clone(),
                                dosage: c.dosage.clone(),
                            })
                            .collect(),
                    }),
                    None => list.orphan_cis.push(cis),
                }
            }

            list
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdpm_types::NatureComposant;

    fn specialite(cis: Cis) -> Specialite {
        Specialite {
            cis,
            denomination: format!("SPECIALITE {}", cis),
            forme_pharmaceutique: "comprimé".to_string(),
            ..Default::default()
        }
    }

    fn presentation(cis: Cis, cip7: Cip, cip13: Cip, libelle: &str) -> Presentation {
        Presentation {
            cis,
            cip7,
            cip13,
            libelle: libelle.to_string(),
            ..Default::default()
        }
    }

    fn composition(cis: Cis, substance: &str) -> Composition {
        Composition {
            cis,
            element_pharmaceutique: "comprimé".to_string(),
            code_substance: 2202,
            denomination_substance: substance.to_string(),
            dosage: "500 mg".to_string(),
            reference_dosage: "un comprimé".to_string(),
            nature_composant: NatureComposant::SubstanceActive,
            numero_liaison: Some(1),
        }
    }

    #[test]
    fn test_side_records_are_attached_by_cis() {
        let data = SourceData {
            specialites: vec![specialite(1), specialite(2)],
            presentations: vec![presentation(1, 1000001, 3400910000001, "boîte de 8")],
            compositions: vec![composition(1, "PARACÉTAMOL"), composition(1, "CODÉINE")],
            grouping: GeneriqueGrouping::default(),
            conditions: vec![Condition {
                cis: 2,
                condition: "liste I".to_string(),
            }],
        };

        let dataset = build_dataset(data);
        let first = &dataset.medicaments_by_cis[&1];
        let second = &dataset.medicaments_by_cis[&2];

        assert_eq!(first.composition.len(), 2);
        assert_eq!(first.presentations.len(), 1);
        assert!(first.conditions.is_empty());
        assert!(second.composition.is_empty());
        assert_eq!(second.conditions, vec!["liste I"]);

        assert_eq!(dataset.report.medicaments_without_compositions.sample, vec![2]);
        assert_eq!(dataset.report.medicaments_without_conditions.sample, vec![1]);
        assert_eq!(dataset.report.medicaments_without_generiques.count, 2);
    }

    #[test]
    fn test_every_medicament_is_reachable_by_cis() {
        let data = SourceData {
            specialites: vec![specialite(3), specialite(1), specialite(3), specialite(2)],
            ..Default::default()
        };

        let dataset = build_dataset(data);

        assert_eq!(dataset.medicaments.len(), 3);
        assert_eq!(dataset.medicaments_by_cis.len(), 3);
        for medicament in &dataset.medicaments {
            assert_eq!(&dataset.medicaments_by_cis[&medicament.cis], medicament);
        }
        assert_eq!(
            dataset.medicaments.iter().map(|m| m.cis).collect::<Vec<_>>(),
            vec![3, 1, 2]
        );
        assert_eq!(dataset.report.duplicate_cis, vec![3]);
    }

    #[test]
    fn test_invalid_specialites_are_excluded_without_report_entry() {
        let data = SourceData {
            specialites: vec![
                specialite(1),
                Specialite { cis: -4, ..specialite(4) },
                Specialite {
                    denomination: String::new(),
                    ..specialite(5)
                },
                Specialite {
                    forme_pharmaceutique: " ".to_string(),
                    ..specialite(6)
                },
            ],
            ..Default::default()
        };

        let dataset = build_dataset(data);

        assert_eq!(dataset.medicaments.len(), 1);
        assert_eq!(dataset.report.medicaments_without_presentations.count, 1);
        assert!(dataset.report.duplicate_cis.is_empty());
    }

    #[test]
    fn test_orphan_cis_are_preserved() {
        let mut grouping = GeneriqueGrouping::new();
        grouping.add(100, "PARACETAMOL 500 mg", 1, GeneriqueType::Princeps);
        grouping.add(100, "PARACETAMOL 500 mg", 2, GeneriqueType::Generique);

        let data = SourceData {
            specialites: vec![specialite(1)],
            compositions: vec![composition(1, "PARACÉTAMOL")],
            grouping,
            ..Default::default()
        };

        let dataset = build_dataset(data);
        let group = &dataset.generiques_by_group[&100];

        assert_eq!(group.medicaments.len(), 1);
        assert_eq!(group.medicaments[0].cis, 1);
        assert_eq!(group.medicaments[0].generique_type, GeneriqueType::Princeps);
        assert_eq!(group.medicaments[0].composition[0].denomination_substance, "PARACÉTAMOL");
        assert_eq!(group.orphan_cis, vec![2]);
        assert_eq!(dataset.report.orphan_cis, vec![2]);

        let membership = &dataset.medicaments_by_cis[&1].generiques;
        assert_eq!(membership.len(), 1);
        assert_eq!(membership[0].group_id, 100);
        assert_eq!(membership[0].libelle, "PARACETAMOL 500 mg");
    }

    #[test]
    fn test_duplicate_cip7_keeps_last_presentation() {
        let data = SourceData {
            specialites: vec![specialite(1), specialite(2)],
            presentations: vec![
                presentation(1, 1234567, 3400912345671, "first"),
                presentation(2, 1234567, 3400912345672, "second"),
            ],
            ..Default::default()
        };

        let dataset = build_dataset(data);

        assert_eq!(dataset.presentations_by_cip7[&1234567].libelle, "second");
        assert_eq!(dataset.presentations_by_cip7.len(), 1);
        assert_eq!(dataset.presentations_by_cip13.len(), 2);
        assert_eq!(dataset.report.duplicate_cip7, vec![1234567]);
        assert!(dataset.report.duplicate_cip13.is_empty());
    }

    #[test]
    fn test_grouping_from_entries() {
        let entries = vec![
            GeneriqueEntry {
                group_id: 7,
                libelle: "IBUPROFENE 400 mg".to_string(),
                cis: 10,
                generique_type: GeneriqueType::Princeps,
                numero_tri: Some(1),
            },
            GeneriqueEntry {
                group_id: 7,
                libelle: "ignored label".to_string(),
                cis: 11,
                generique_type: GeneriqueType::Generique,
                numero_tri: Some(2),
            },
            GeneriqueEntry {
                group_id: 7,
                libelle: "IBUPROFENE 400 mg".to_string(),
                cis: 10,
                generique_type: GeneriqueType::Princeps,
                numero_tri: Some(3),
            },
        ];

        let grouping = GeneriqueGrouping::from_entries(&entries);
        assert_eq!(grouping.group_count(), 1);
        assert_eq!(grouping.conflicting_group_ids(), vec![7]);
        assert_eq!(grouping.members(7), Some(&[10, 11][..]));
        assert_eq!(grouping.libelle(7), "IBUPROFENE 400 mg");
        assert_eq!(grouping.generique_type(7, 11), GeneriqueType::Generique);
    }

    #[test]
    fn test_group_id_with_conflicting_labels_is_reported() {
        let mut grouping = GeneriqueGrouping::new();
        grouping.add(100, "PARACETAMOL 500 mg", 1, GeneriqueType::Princeps);
        grouping.add(100, "IBUPROFENE 400 mg", 2, GeneriqueType::Generique);
        grouping.add(100, "IBUPROFENE 400 mg", 3, GeneriqueType::Generique);
        grouping.add(200, "ASPIRINE 500 mg", 4, GeneriqueType::Princeps);
        grouping.add(200, "ASPIRINE 500 mg", 5, GeneriqueType::Generique);

        let data = SourceData {
            specialites: vec![specialite(1), specialite(2)],
            grouping,
            ..Default::default()
        };
        let dataset = build_dataset(data);

        assert_eq!(dataset.generiques_by_group[&100].libelle, "PARACETAMOL 500 mg");
        assert_eq!(dataset.generiques_by_group[&100].medicaments.len(), 2);
        assert_eq!(dataset.report.duplicate_group_ids, vec![100]);
        assert_eq!(dataset.report.duplicate_count(), 1);
    }
}
