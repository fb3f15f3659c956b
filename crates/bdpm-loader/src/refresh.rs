//! Refresh orchestration: download, parse, join, publish.
//!
//! A refresh claims the store's update flag, fetches the five sources
//! concurrently, parses them concurrently on the blocking pool, joins them
//! and publishes the result. Any failure aborts the cycle before
//! publication, leaving the previous snapshot in place.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use bdpm_types::{Composition, Condition, GeneriqueEntry, Presentation, Specialite};

use crate::download::{download_all, scratch_files, HttpFetcher, SourceFetcher};
use crate::join::{build_dataset, GeneriqueGrouping, SourceData};
use crate::parser::{parse_source, Parsed};
use crate::store::SnapshotStore;
use crate::types::{BdpmError, BdpmResult, ParseStats, RefreshConfig, SourceFiles, SourceKind};

/// Outcome of a successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Row counters of each source.
    pub parse_stats: BTreeMap<SourceKind, ParseStats>,
    /// Published medicaments.
    pub medicaments: usize,
    /// Published generique groups.
    pub generiques: usize,
    /// Presentations indexed by CIP13.
    pub presentations: usize,
    /// Duplicate keys of any kind.
    pub duplicates: usize,
    /// Group members with no medicament.
    pub orphan_cis: usize,
    /// Wall time of the whole refresh in milliseconds.
    pub elapsed_ms: u64,
}

impl RefreshSummary {
    /// Rows skipped across all sources.
    pub fn skipped_records(&self) -> usize {
        self.parse_stats.values().map(|s| s.skipped_records).sum()
    }
}

/// One parsed source, as returned by its parse task.
enum ParsedSource {
    Specialites(Parsed<Specialite>),
    Presentations(Parsed<Presentation>),
    Compositions(Parsed<Composition>),
    Generiques(GeneriqueGrouping, ParseStats),
    Conditions(Parsed<Condition>),
}

fn parse_kind(kind: SourceKind, path: PathBuf) -> BdpmResult<ParsedSource> {
    Ok(match kind {
        SourceKind::Specialites => ParsedSource::Specialites(parse_source(&path)?),
        SourceKind::Presentations => ParsedSource::Presentations(parse_source(&path)?),
        SourceKind::Compositions => ParsedSource::Compositions(parse_source(&path)?),
        SourceKind::Generiques => {
            let parsed: Parsed<GeneriqueEntry> = parse_source(&path)?;
            let grouping = GeneriqueGrouping::from_entries(&parsed.records);
            ParsedSource::Generiques(grouping, parsed.stats)
        }
        SourceKind::Conditions => ParsedSource::Conditions(parse_source(&path)?),
    })
}

/// Parses the five scratch files concurrently on the blocking pool.
///
/// # Errors
/// Waits for every parse, then fails with every collected error.
pub async fn parse_all(
    files: &SourceFiles,
) -> BdpmResult<(SourceData, BTreeMap<SourceKind, ParseStats>)> {
    let mut tasks = JoinSet::new();
    for kind in SourceKind::ALL {
        let path = files.get(kind).to_path_buf();
        tasks.spawn_blocking(move || parse_kind(kind, path));
    }
    collect_parsed(tasks).await
}

/// Gathers the parse tasks into [`SourceData`]; a panicking task becomes
/// [`BdpmError::JoinPanic`] for the `parse` stage.
async fn collect_parsed(
    mut tasks: JoinSet<BdpmResult<ParsedSource>>,
) -> BdpmResult<(SourceData, BTreeMap<SourceKind, ParseStats>)> {
    let mut data = SourceData::default();
    let mut stats = BTreeMap::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(ParsedSource::Specialites(p))) => {
                stats.insert(SourceKind::Specialites, p.stats);
                data.specialites = p.records;
            }
            Ok(Ok(ParsedSource::Presentations(p))) => {
                stats.insert(SourceKind::Presentations, p.stats);
                data.presentations = p.records;
            }
            Ok(Ok(ParsedSource::Compositions(p))) => {
                stats.insert(SourceKind::Compositions, p.stats);
                data.compositions = p.records;
            }
            Ok(Ok(ParsedSource::Generiques(grouping, s))) => {
                stats.insert(SourceKind::Generiques, s);
                data.grouping = grouping;
            }
            Ok(Ok(ParsedSource::Conditions(p))) => {
                stats.insert(SourceKind::Conditions, p.stats);
                data.conditions = p.records;
            }
            Ok(Err(e)) => {
                tracing::warn!("Parse failed: {}", e);
                errors.push(e);
            }
            Err(e) => errors.push(BdpmError::from_join_error("parse", e)),
        }
    }
    BdpmError::aggregate(errors)?;

    Ok((data, stats))
}

/// Runs refresh cycles against a [`SnapshotStore`].
#[derive(Debug)]
pub struct Refresher<F: SourceFetcher> {
    fetcher: Arc<F>,
    config: RefreshConfig,
}

impl Refresher<HttpFetcher> {
    /// Creates a refresher fetching over HTTP with the configured timeout.
    pub fn with_http(config: RefreshConfig) -> BdpmResult<Self> {
        let fetcher = HttpFetcher::new(config.http_timeout)?;
        Ok(Self::new(fetcher, config))
    }
}

impl<F: SourceFetcher> Refresher<F> {
    /// Creates a refresher using `fetcher` as transport.
    pub fn new(fetcher: F, config: RefreshConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// Returns the refresh configuration.
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Runs one complete refresh cycle and publishes the result.
    ///
    /// # Errors
    /// Returns [`BdpmError::ConcurrentUpdateRejected`] if another refresh is
    /// running, or the first failing stage's error(s). Nothing is published
    /// on failure.
    pub async fn refresh(&self, store: &SnapshotStore) -> BdpmResult<RefreshSummary> {
        let _guard = store
            .try_begin_update()
            .ok_or(BdpmError::ConcurrentUpdateRejected)?;
        let start = Instant::now();
        tracing::info!("Refreshing BDPM data into {}", self.config.files_dir.display());

        let files = download_all(Arc::clone(&self.fetcher), &self.config).await?;
        self.publish(store, &files, start).await
    }

    /// Rebuilds and publishes the snapshot from the scratch files already on
    /// disk, without downloading.
    ///
    /// # Errors
    /// Same as [`Refresher::refresh`]; a missing scratch file is a
    /// [`BdpmError::ParseFile`].
    pub async fn reload(&self, store: &SnapshotStore) -> BdpmResult<RefreshSummary> {
        let _guard = store
            .try_begin_update()
            .ok_or(BdpmError::ConcurrentUpdateRejected)?;
        let start = Instant::now();
        tracing::info!("Reloading BDPM data from {}", self.config.files_dir.display());

        let files = scratch_files(&self.config.files_dir)?;
        self.publish(store, &files, start).await
    }

    /// Parses, joins and publishes. The caller holds the update flag.
    async fn publish(
        &self,
        store: &SnapshotStore,
        files: &SourceFiles,
        start: Instant,
    ) -> BdpmResult<RefreshSummary> {
        let (data, parse_stats) = parse_all(files).await?;

        let dataset = tokio::task::spawn_blocking(move || build_dataset(data))
            .await
            .map_err(|e| BdpmError::from_join_error("join", e))?;

        let mut summary = RefreshSummary {
            parse_stats,
            medicaments: dataset.medicaments.len(),
            generiques: dataset.generiques.len(),
            presentations: dataset.presentations_by_cip13.len(),
            duplicates: dataset.report.duplicate_count(),
            orphan_cis: dataset.report.orphan_cis.len(),
            elapsed_ms: 0,
        };

        store.update_data(dataset)?;

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Refresh complete in {} ms ({} rows skipped, {} duplicate keys, {} orphan CIS)",
            summary.elapsed_ms,
            summary.skipped_records(),
            summary.duplicates,
            summary.orphan_cis
        );
        Ok(summary)
    }
}
