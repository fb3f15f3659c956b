//! Raw source retrieval.
//!
//! Each BDPM file is fetched whole, converted to UTF-8 when the server sent
//! ISO-8859-1, and written line by line to a scratch file that the parsers
//! read back. The five downloads run concurrently; every failure is collected
//! before the step reports.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinSet;

use crate::types::{BdpmError, BdpmResult, RefreshConfig, SourceFiles, SourceKind};

/// Fetches the raw bytes of a source.
///
/// Implement this trait to plug in another transport (tests use an
/// in-memory map).
pub trait SourceFetcher: Send + Sync + 'static {
    /// Fetches `url`, returning the complete response body.
    ///
    /// # Errors
    /// Returns [`BdpmError::Download`] on transport failure or non-success
    /// status.
    fn fetch(&self, kind: SourceKind, url: &str)
        -> impl Future<Output = BdpmResult<Vec<u8>>> + Send;
}

/// Fetches sources over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    const USER_AGENT: &'static str = concat!("bdpm-loader/", env!("CARGO_PKG_VERSION"));

    /// Creates a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> BdpmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, kind: SourceKind, url: &str) -> BdpmResult<Vec<u8>> {
        let download_error = |message: String| BdpmError::Download {
            kind,
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Encoding a source body was received in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Body was valid UTF-8.
    Utf8,
    /// Body was decoded as ISO-8859-1.
    Latin1,
}

/// Converts a body to UTF-8.
///
/// Valid UTF-8 is kept as is (minus a byte order mark); anything else is
/// read as ISO-8859-1, where every byte is the code point of the same value.
pub fn normalize_encoding(bytes: Vec<u8>) -> (String, SourceEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => {
            let text = match text.strip_prefix('\u{feff}') {
                Some(stripped) => stripped.to_string(),
                None => text,
            };
            (text, SourceEncoding::Utf8)
        }
        Err(e) => {
            let text = e.into_bytes().into_iter().map(char::from).collect();
            (text, SourceEncoding::Latin1)
        }
    }
}

/// Returns the scratch file path for a source name under `root`.
///
/// # Errors
/// Returns [`BdpmError::Path`] if the name is not a single plain path
/// component, i.e. the file would land outside `root`.
pub fn scratch_path(root: &Path, name: &str) -> BdpmResult<PathBuf> {
    let file_name = format!("{}.txt", name);
    let relative = Path::new(&file_name);

    let mut components = relative.components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    let path = root.join(relative);
    if !single_normal || !path.starts_with(root) {
        return Err(BdpmError::Path {
            path: path.display().to_string(),
            root: root.display().to_string(),
        });
    }
    Ok(path)
}

/// Returns the scratch file of every source under `root`.
pub fn scratch_files(root: &Path) -> BdpmResult<SourceFiles> {
    Ok(SourceFiles {
        specialites: scratch_path(root, SourceKind::Specialites.name())?,
        presentations: scratch_path(root, SourceKind::Presentations.name())?,
        compositions: scratch_path(root, SourceKind::Compositions.name())?,
        generiques: scratch_path(root, SourceKind::Generiques.name())?,
        conditions: scratch_path(root, SourceKind::Conditions.name())?,
    })
}

/// Writes `text` to `path` one line at a time, normalising line endings.
pub async fn write_scratch_file(path: &Path, text: &str) -> BdpmResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    for line in text.lines() {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Fetches one source and stores it as a UTF-8 scratch file.
pub async fn download_source<F: SourceFetcher>(
    fetcher: &F,
    kind: SourceKind,
    url: &str,
    root: &Path,
) -> BdpmResult<PathBuf> {
    let path = scratch_path(root, kind.name())?;
    let start = Instant::now();

    let bytes = fetcher.fetch(kind, url).await?;
    let size = bytes.len();
    let (text, encoding) = normalize_encoding(bytes);
    write_scratch_file(&path, &text).await?;

    tracing::info!(
        "Downloaded {} ({} bytes, {:?}) in {} ms",
        kind,
        size,
        encoding,
        start.elapsed().as_millis()
    );
    Ok(path)
}

/// Downloads all five sources concurrently.
///
/// # Errors
/// Waits for every download, then fails with every collected error if any
/// download failed.
pub async fn download_all<F: SourceFetcher>(
    fetcher: Arc<F>,
    config: &RefreshConfig,
) -> BdpmResult<SourceFiles> {
    let mut tasks = JoinSet::new();
    for kind in SourceKind::ALL {
        let fetcher = Arc::clone(&fetcher);
        let url = config.urls.get(kind).to_string();
        let root = config.files_dir.clone();
        tasks.spawn(async move {
            (kind, download_source(fetcher.as_ref(), kind, &url, &root).await)
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(_))) => {}
            Ok((kind, Err(e))) => {
                tracing::warn!("Download of {} failed: {}", kind, e);
                errors.push(e);
            }
            Err(e) => errors.push(BdpmError::from_join_error("download", e)),
        }
    }
    BdpmError::aggregate(errors)?;

    scratch_files(&config.files_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapFetcher {
        bodies: HashMap<SourceKind, Vec<u8>>,
    }

    impl SourceFetcher for MapFetcher {
        async fn fetch(&self, kind: SourceKind, url: &str) -> BdpmResult<Vec<u8>> {
            self.bodies.get(&kind).cloned().ok_or_else(|| BdpmError::Download {
                kind,
                url: url.to_string(),
                message: "HTTP status 404 Not Found".to_string(),
            })
        }
    }

    #[test]
    fn test_normalize_utf8() {
        let (text, encoding) = normalize_encoding("comprimé pelliculé".as_bytes().to_vec());
        assert_eq!(text, "comprimé pelliculé");
        assert_eq!(encoding, SourceEncoding::Utf8);

        let (text, _) = normalize_encoding("\u{feff}60904643".as_bytes().to_vec());
        assert_eq!(text, "60904643");
    }

    #[test]
    fn test_normalize_latin1() {
        // "comprimé" in ISO-8859-1
        let bytes = vec![b'c', b'o', b'm', b'p', b'r', b'i', b'm', 0xe9];
        let (text, encoding) = normalize_encoding(bytes);
        assert_eq!(text, "comprimé");
        assert_eq!(encoding, SourceEncoding::Latin1);
    }

    #[test]
    fn test_scratch_path_stays_in_root() {
        let root = Path::new("files");
        assert_eq!(
            scratch_path(root, "specialites").unwrap(),
            PathBuf::from("files/specialites.txt")
        );
        assert!(matches!(
            scratch_path(root, "../etc/passwd"),
            Err(BdpmError::Path { .. })
        ));
        assert!(matches!(
            scratch_path(root, "nested/name"),
            Err(BdpmError::Path { .. })
        ));
        assert!(matches!(
            scratch_path(root, "/absolute"),
            Err(BdpmError::Path { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_scratch_file_normalises_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conditions.txt");

        write_scratch_file(&path, "1\tliste I\r\n2\tliste II").await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "1\tliste I\n2\tliste II\n");
    }

    #[tokio::test]
    async fn test_download_all_writes_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = RefreshConfig::default().with_files_dir(dir.path());
        let bodies = SourceKind::ALL
            .iter()
            .map(|kind| (*kind, format!("{}\n", kind.name()).into_bytes()))
            .collect();

        let files = download_all(Arc::new(MapFetcher { bodies }), &config)
            .await
            .unwrap();

        for kind in SourceKind::ALL {
            let content = std::fs::read_to_string(files.get(kind)).unwrap();
            assert_eq!(content, format!("{}\n", kind.name()));
        }
    }

    #[tokio::test]
    async fn test_download_all_reports_every_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = RefreshConfig::default().with_files_dir(dir.path());
        let mut bodies = HashMap::new();
        bodies.insert(SourceKind::Specialites, b"1\n".to_vec());
        bodies.insert(SourceKind::Conditions, b"1\tliste I\n".to_vec());

        let err = download_all(Arc::new(MapFetcher { bodies }), &config)
            .await
            .unwrap_err();

        match err {
            BdpmError::Aggregate { errors } => {
                assert_eq!(errors.len(), 3);
                assert!(errors
                    .iter()
                    .all(|e| matches!(e, BdpmError::Download { .. })));
            }
            other => panic!("expected aggregate error, got {other}"),
        }
    }
}
