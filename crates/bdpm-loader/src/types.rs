//! Loader-specific types: errors, configuration and parse statistics.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while refreshing the BDPM dataset.
#[derive(Error, Debug)]
pub enum BdpmError {
    /// I/O error outside of a specific source file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TSV reader error.
    #[error("TSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Fetching a source over HTTP failed.
    #[error("Download of {kind} from {url} failed: {message}")]
    Download {
        /// Source being fetched.
        kind: SourceKind,
        /// URL that was requested.
        url: String,
        /// Transport error or HTTP status.
        message: String,
    },

    /// A scratch file path would escape the scratch directory.
    #[error("Path escapes scratch directory {root}: {path}")]
    Path {
        /// Offending path.
        path: String,
        /// Scratch directory the path must stay under.
        root: String,
    },

    /// A source file could not be opened or read.
    #[error("Failed to read {kind} file {path}: {error}")]
    ParseFile {
        /// Source being parsed.
        kind: SourceKind,
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// A row has fewer columns than the schema.
    #[error("Expected at least {expected} columns, found {found}")]
    ColumnCount {
        /// Schema column count.
        expected: usize,
        /// Columns on the row.
        found: usize,
    },

    /// A required column is empty.
    #[error("Required column '{column}' is empty")]
    EmptyField {
        /// Name of the empty column.
        column: &'static str,
    },

    /// A numeric column does not hold an integer.
    #[error("Invalid integer in column '{column}': {value}")]
    InvalidInteger {
        /// Name of the column.
        column: &'static str,
        /// The invalid value.
        value: String,
    },

    /// A refresh stage panicked.
    #[error("{stage} stage panicked: {message}")]
    JoinPanic {
        /// Stage that panicked.
        stage: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A snapshot failed its consistency check and was not published.
    #[error("Inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    /// Another refresh holds the update flag.
    #[error("A refresh is already in progress")]
    ConcurrentUpdateRejected,

    /// Several independent failures collected from concurrent tasks.
    #[error("{} failure(s): {}", .errors.len(), summarize(.errors))]
    Aggregate {
        /// Every collected failure.
        errors: Vec<BdpmError>,
    },
}

fn summarize(errors: &[BdpmError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl BdpmError {
    /// Returns true for errors that only invalidate a single row.
    ///
    /// Row-level errors are counted and skipped by the parsers, everything
    /// else aborts the parse.
    pub fn is_row_level(&self) -> bool {
        match self {
            Self::ColumnCount { .. } | Self::EmptyField { .. } | Self::InvalidInteger { .. } => {
                true
            }
            Self::Csv(e) => !e.is_io_error(),
            _ => false,
        }
    }

    /// Converts a failed task into an error, recovering its panic message.
    pub(crate) fn from_join_error(stage: impl Into<String>, err: tokio::task::JoinError) -> Self {
        let stage = stage.into();
        if !err.is_panic() {
            return Self::JoinPanic {
                stage,
                message: "task was cancelled".to_string(),
            };
        }

        let payload = err.into_panic();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::JoinPanic { stage, message }
    }

    /// Collapses collected failures: none is `Ok`, one is returned as is.
    pub fn aggregate(mut errors: Vec<BdpmError>) -> BdpmResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate { errors }),
        }
    }
}

/// Result type for loader operations.
pub type BdpmResult<T> = Result<T, BdpmError>;

/// The five BDPM flat files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// `CIS_bdpm.txt`: base product records.
    Specialites,
    /// `CIS_CIP_bdpm.txt`: packagings.
    Presentations,
    /// `CIS_COMPO_bdpm.txt`: substances.
    Compositions,
    /// `CIS_GENER_bdpm.txt`: generique groups.
    Generiques,
    /// `CIS_CPD_bdpm.txt`: prescription conditions.
    Conditions,
}

impl SourceKind {
    /// Every source, in join order.
    pub const ALL: [SourceKind; 5] = [
        Self::Specialites,
        Self::Presentations,
        Self::Compositions,
        Self::Generiques,
        Self::Conditions,
    ];

    /// Logical name, also used for the scratch file name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Specialites => "specialites",
            Self::Presentations => "presentations",
            Self::Compositions => "compositions",
            Self::Generiques => "generiques",
            Self::Conditions => "conditions",
        }
    }

    /// File name on the BDPM download server.
    pub fn remote_file(self) -> &'static str {
        match self {
            Self::Specialites => "CIS_bdpm.txt",
            Self::Presentations => "CIS_CIP_bdpm.txt",
            Self::Compositions => "CIS_COMPO_bdpm.txt",
            Self::Generiques => "CIS_GENER_bdpm.txt",
            Self::Conditions => "CIS_CPD_bdpm.txt",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Download URL for each source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    /// URL of the specialites file.
    pub specialites: String,
    /// URL of the presentations file.
    pub presentations: String,
    /// URL of the compositions file.
    pub compositions: String,
    /// URL of the generiques file.
    pub generiques: String,
    /// URL of the conditions file.
    pub conditions: String,
}

impl SourceUrls {
    /// Builds every URL as `{base}?fichier={remote file}`.
    pub fn from_base(base: &str) -> Self {
        let url = |kind: SourceKind| format!("{}?fichier={}", base, kind.remote_file());
        Self {
            specialites: url(SourceKind::Specialites),
            presentations: url(SourceKind::Presentations),
            compositions: url(SourceKind::Compositions),
            generiques: url(SourceKind::Generiques),
            conditions: url(SourceKind::Conditions),
        }
    }

    /// Returns the URL for one source.
    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Specialites => &self.specialites,
            SourceKind::Presentations => &self.presentations,
            SourceKind::Compositions => &self.compositions,
            SourceKind::Generiques => &self.generiques,
            SourceKind::Conditions => &self.conditions,
        }
    }
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self::from_base(RefreshConfig::DEFAULT_BASE_URL)
    }
}

/// Configuration of a refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Directory holding one scratch file per source.
    pub files_dir: PathBuf,
    /// Timeout applied to each source fetch.
    pub http_timeout: Duration,
    /// Where to fetch each source from.
    pub urls: SourceUrls,
}

impl RefreshConfig {
    /// Default scratch directory.
    pub const DEFAULT_FILES_DIR: &'static str = "files";
    /// Default per-fetch timeout in seconds.
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
    /// Default BDPM download endpoint.
    pub const DEFAULT_BASE_URL: &'static str =
        "https://base-donnees-publique.medicaments.gouv.fr/telechargement.php";

    /// Reads the configuration from `BDPM_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("BDPM_FILES_DIR").filter(|d| !d.trim().is_empty()) {
            config.files_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("BDPM_HTTP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.http_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    "Ignoring invalid BDPM_HTTP_TIMEOUT_SECS={:?}, using {}s",
                    raw,
                    Self::DEFAULT_HTTP_TIMEOUT_SECS
                ),
            }
        }

        if let Some(base) = lookup("BDPM_BASE_URL").filter(|b| !b.trim().is_empty()) {
            config.urls = SourceUrls::from_base(base.trim());
        }

        config
    }

    /// Returns a copy using `dir` as scratch directory.
    pub fn with_files_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.files_dir = dir.as_ref().to_path_buf();
        self
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from(Self::DEFAULT_FILES_DIR),
            http_timeout: Duration::from_secs(Self::DEFAULT_HTTP_TIMEOUT_SECS),
            urls: SourceUrls::default(),
        }
    }
}

/// Statistics from parsing one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Non-blank rows read from the file.
    pub total_records: usize,
    /// Rows turned into records.
    pub parsed_records: usize,
    /// Rows skipped for a schema or numeric violation.
    pub skipped_records: usize,
    /// Time taken to parse in milliseconds.
    pub parse_time_ms: u64,
}

impl ParseStats {
    /// Returns the percentage of rows that were skipped.
    pub fn skip_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.skipped_records as f64 / self.total_records as f64) * 100.0
        }
    }
}

/// Scratch file locations, one per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    /// Specialites scratch file.
    pub specialites: PathBuf,
    /// Presentations scratch file.
    pub presentations: PathBuf,
    /// Compositions scratch file.
    pub compositions: PathBuf,
    /// Generiques scratch file.
    pub generiques: PathBuf,
    /// Conditions scratch file.
    pub conditions: PathBuf,
}

impl SourceFiles {
    /// Returns the path for one source.
    pub fn get(&self, kind: SourceKind) -> &Path {
        match kind {
            SourceKind::Specialites => &self.specialites,
            SourceKind::Presentations => &self.presentations,
            SourceKind::Compositions => &self.compositions,
            SourceKind::Generiques => &self.generiques,
            SourceKind::Conditions => &self.conditions,
        }
    }
}
