//! # bdpm-loader
//!
//! Ingestion pipeline for the French public drug database (BDPM).
//!
//! The five BDPM flat files are downloaded, converted to UTF-8, parsed with
//! per-row error recovery, joined into [`Medicament`](bdpm_types::Medicament)
//! and [`GeneriqueList`](bdpm_types::GeneriqueList) records, and published
//! atomically in a [`SnapshotStore`].
//!
//! ## Features
//!
//! - `parallel` (default): builds medicaments on a rayon thread pool.
//!
//! ## Usage
//!
//! ```ignore
//! use bdpm_loader::{RefreshConfig, Refresher, SnapshotStore};
//!
//! let store = SnapshotStore::new();
//! let refresher = Refresher::with_http(RefreshConfig::from_env())?;
//! let summary = refresher.refresh(&store).await?;
//! println!("{} medicaments", summary.medicaments);
//!
//! let doliprane = store.snapshot().medicament(60904643).cloned();
//! ```

#![warn(missing_docs)]

mod composition;
mod condition;
pub mod download;
mod generique;
pub mod join;
pub mod parser;
mod presentation;
pub mod quality;
pub mod refresh;
mod specialite;
pub mod store;
mod types;

pub use download::{download_all, HttpFetcher, SourceEncoding, SourceFetcher};
pub use join::{build_dataset, Dataset, GeneriqueGrouping, SourceData};
pub use parser::{parse_source, BdpmRecord, Parsed, TsvParser};
pub use refresh::{RefreshSummary, Refresher};
pub use store::{Snapshot, SnapshotStore, StoreStats, UpdateGuard};
pub use types::{
    BdpmError, BdpmResult, ParseStats, RefreshConfig, SourceFiles, SourceKind, SourceUrls,
};

// Re-export bdpm-types for convenience
pub use bdpm_types;
