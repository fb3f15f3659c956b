//! Published BDPM snapshot.
//!
//! The store holds one reference to an immutable [`Snapshot`]. Publishing a
//! refresh swaps that reference in a single step, so a reader always sees the
//! complete previous snapshot or the complete new one, never a mix. Readers
//! only hold the lock long enough to clone the reference.
//!
//! ```ignore
//! let store = SnapshotStore::new();
//!
//! if let Some(_guard) = store.try_begin_update() {
//!     let dataset = build_dataset(sources);
//!     store.update_data(dataset)?;
//! } // flag released here
//!
//! let medicaments = store.medicaments();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use bdpm_types::{Cip, Cis, DataQualityReport, GeneriqueList, GroupId, Medicament, Presentation};

use crate::join::Dataset;
use crate::types::{BdpmError, BdpmResult};

/// One consistent, immutable view of the dataset.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    medicaments: Arc<Vec<Medicament>>,
    generiques: Arc<Vec<GeneriqueList>>,
    medicaments_by_cis: Arc<HashMap<Cis, Medicament>>,
    generiques_by_group: Arc<HashMap<GroupId, GeneriqueList>>,
    presentations_by_cip7: Arc<HashMap<Cip, Presentation>>,
    presentations_by_cip13: Arc<HashMap<Cip, Presentation>>,
    quality_report: Arc<DataQualityReport>,
    published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot served before the first successful refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_dataset(dataset: Dataset, published_at: DateTime<Utc>) -> Self {
        Self {
            medicaments: Arc::new(dataset.medicaments),
            generiques: Arc::new(dataset.generiques),
            medicaments_by_cis: Arc::new(dataset.medicaments_by_cis),
            generiques_by_group: Arc::new(dataset.generiques_by_group),
            presentations_by_cip7: Arc::new(dataset.presentations_by_cip7),
            presentations_by_cip13: Arc::new(dataset.presentations_by_cip13),
            quality_report: Arc::new(dataset.report),
            published_at: Some(published_at),
        }
    }

    /// Returns true once a refresh has been published.
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Publication time, `None` for the empty snapshot.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Medicaments in first-seen CIS order.
    pub fn medicaments(&self) -> &[Medicament] {
        &self.medicaments
    }

    /// Generique lists ascending by group ID.
    pub fn generiques(&self) -> &[GeneriqueList] {
        &self.generiques
    }

    /// Looks up a medicament by CIS.
    pub fn medicament(&self, cis: Cis) -> Option<&Medicament> {
        self.medicaments_by_cis.get(&cis)
    }

    /// Looks up a generique group.
    pub fn generique_group(&self, group_id: GroupId) -> Option<&GeneriqueList> {
        self.generiques_by_group.get(&group_id)
    }

    /// Looks up a presentation by CIP7.
    pub fn presentation_by_cip7(&self, cip7: Cip) -> Option<&Presentation> {
        self.presentations_by_cip7.get(&cip7)
    }

    /// Looks up a presentation by CIP13.
    pub fn presentation_by_cip13(&self, cip13: Cip) -> Option<&Presentation> {
        self.presentations_by_cip13.get(&cip13)
    }

    /// Quality findings of the refresh that produced this snapshot.
    pub fn quality_report(&self) -> &DataQualityReport {
        &self.quality_report
    }
}

/// Checks that every map agrees with the collections it indexes.
fn validate(dataset: &Dataset) -> BdpmResult<()> {
    let inconsistent = |message: String| Err(BdpmError::InconsistentSnapshot(message));

    if dataset.medicaments_by_cis.len() != dataset.medicaments.len() {
        return inconsistent(format!(
            "{} medicaments but {} CIS entries",
            dataset.medicaments.len(),
            dataset.medicaments_by_cis.len()
        ));
    }
    if let Some(m) = dataset
        .medicaments
        .iter()
        .find(|m| !dataset.medicaments_by_cis.contains_key(&m.cis))
    {
        return inconsistent(format!("medicament {} is not indexed by CIS", m.cis));
    }
    if let Some((cis, _)) = dataset.medicaments_by_cis.iter().find(|(k, m)| **k != m.cis) {
        return inconsistent(format!("CIS entry {} holds another medicament", cis));
    }

    if dataset.generiques_by_group.len() != dataset.generiques.len() {
        return inconsistent(format!(
            "{} generique lists but {} group entries",
            dataset.generiques.len(),
            dataset.generiques_by_group.len()
        ));
    }
    if let Some((group_id, _)) = dataset
        .generiques_by_group
        .iter()
        .find(|(k, g)| **k != g.group_id)
    {
        return inconsistent(format!("group entry {} holds another list", group_id));
    }

    if let Some((cip, _)) = dataset
        .presentations_by_cip7
        .iter()
        .find(|(k, p)| **k != p.cip7)
    {
        return inconsistent(format!("CIP7 entry {} holds another presentation", cip));
    }
    if let Some((cip, _)) = dataset
        .presentations_by_cip13
        .iter()
        .find(|(k, p)| **k != p.cip13)
    {
        return inconsistent(format!("CIP13 entry {} holds another presentation", cip));
    }

    Ok(())
}

/// Counts describing the published snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Published medicaments.
    pub medicaments: usize,
    /// Published generique groups.
    pub generiques: usize,
    /// Presentations indexed by CIP13.
    pub presentations: usize,
    /// Orphan CIS across all groups.
    pub orphan_cis: usize,
    /// Time of the last publication.
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether a refresh currently holds the update flag.
    pub is_updating: bool,
}

/// Shared holder of the current snapshot and the refresh flag.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    updating: AtomicBool,
    server_start_time: DateTime<Utc>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Creates a store serving the empty snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            updating: AtomicBool::new(false),
            server_start_time: Utc::now(),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // Writers never panic while holding the lock, a poisoned guard is still valid
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    fn published(&self, what: &str) -> Arc<Snapshot> {
        let snapshot = self.snapshot();
        if !snapshot.is_published() {
            tracing::warn!("Reading {} before the first refresh was published", what);
        }
        snapshot
    }

    /// Medicaments of the current snapshot.
    pub fn medicaments(&self) -> Arc<Vec<Medicament>> {
        Arc::clone(&self.published("medicaments").medicaments)
    }

    /// Generique lists of the current snapshot.
    pub fn generiques(&self) -> Arc<Vec<GeneriqueList>> {
        Arc::clone(&self.published("generiques").generiques)
    }

    /// Medicaments keyed by CIS.
    pub fn medicaments_by_cis(&self) -> Arc<HashMap<Cis, Medicament>> {
        Arc::clone(&self.published("medicaments by CIS").medicaments_by_cis)
    }

    /// Generique lists keyed by group ID.
    pub fn generiques_by_group(&self) -> Arc<HashMap<GroupId, GeneriqueList>> {
        Arc::clone(&self.published("generiques by group").generiques_by_group)
    }

    /// Presentations keyed by CIP7.
    pub fn presentations_by_cip7(&self) -> Arc<HashMap<Cip, Presentation>> {
        Arc::clone(&self.published("presentations by CIP7").presentations_by_cip7)
    }

    /// Presentations keyed by CIP13.
    pub fn presentations_by_cip13(&self) -> Arc<HashMap<Cip, Presentation>> {
        Arc::clone(&self.published("presentations by CIP13").presentations_by_cip13)
    }

    /// Quality report of the current snapshot.
    pub fn quality_report(&self) -> Arc<DataQualityReport> {
        Arc::clone(&self.published("quality report").quality_report)
    }

    /// Time of the last successful publication.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot().published_at
    }

    /// Time the store was created.
    pub fn server_start_time(&self) -> DateTime<Utc> {
        self.server_start_time
    }

    /// Returns true while a refresh holds the update flag.
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Claims the update flag. Returns false if it is already held.
    pub fn begin_update(&self) -> bool {
        self.updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases the update flag. Releasing a free flag is a no-op.
    pub fn end_update(&self) {
        self.updating.store(false, Ordering::Release);
    }

    /// Claims the update flag for the lifetime of the returned guard.
    pub fn try_begin_update(&self) -> Option<UpdateGuard<'_>> {
        self.begin_update().then(|| UpdateGuard { store: self })
    }

    /// Publishes a joined dataset as the new snapshot.
    ///
    /// # Errors
    /// Returns [`BdpmError::InconsistentSnapshot`] if a lookup map disagrees
    /// with the collections; the previous snapshot stays published.
    pub fn update_data(&self, dataset: Dataset) -> BdpmResult<()> {
        if !self.is_updating() {
            tracing::warn!("Publishing a snapshot without holding the update flag");
        }
        validate(&dataset)?;

        let snapshot = Arc::new(Snapshot::from_dataset(dataset, Utc::now()));
        tracing::info!(
            "Published snapshot: {} medicaments, {} generique groups, {} presentations",
            snapshot.medicaments.len(),
            snapshot.generiques.len(),
            snapshot.presentations_by_cip13.len()
        );

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = snapshot;
        Ok(())
    }

    /// Returns counts for logs and health reporting.
    pub fn stats(&self) -> StoreStats {
        let snapshot = self.snapshot();
        StoreStats {
            medicaments: snapshot.medicaments.len(),
            generiques: snapshot.generiques.len(),
            presentations: snapshot.presentations_by_cip13.len(),
            orphan_cis: snapshot.quality_report.orphan_cis.len(),
            last_updated: snapshot.published_at,
            is_updating: self.is_updating(),
        }
    }
}

/// Holds the update flag and releases it on drop.
#[derive(Debug)]
pub struct UpdateGuard<'a> {
    store: &'a SnapshotStore,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.store.end_update();
    }
}
