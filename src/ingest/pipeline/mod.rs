//! One repository, end to end: clone, walk, filter, chunk, write

use super::{
    Chunk, ChunkSink, ContentFilter, Document, FileKind, FileWalker, IngestibleFile,
    RepositoryFetcher, RepositorySource, TokenChunker, WorkingDirectory, extract_pdf_pages,
};
use crate::config::IngestionConfig;
use crate::error::{FileReadError, IngestionError};
use crate::types::IngestReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Knobs for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Parent of per-job working directories (system temp dir when `None`)
    pub work_dir: Option<PathBuf>,
    /// Directory names pruned from the walk
    pub skip_dirs: Vec<String>,
    /// Files above this size are skipped
    pub max_file_size: u64,
    /// Abort the job on the first failed sink write
    pub abort_on_sink_error: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            skip_dirs: config.skip_dirs.clone(),
            max_file_size: config.max_file_size,
            abort_on_sink_error: config.abort_on_sink_error,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}

/// Ingests one repository into a [`ChunkSink`]
///
/// Stateless between runs, so one pipeline can serve many concurrent jobs.
pub struct IngestionPipeline {
    fetcher: Arc<dyn RepositoryFetcher>,
    sink: Arc<dyn ChunkSink>,
    chunker: Arc<TokenChunker>,
    filter: Arc<ContentFilter>,
    options: PipelineOptions,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: Arc<dyn RepositoryFetcher>,
        sink: Arc<dyn ChunkSink>,
        chunker: Arc<TokenChunker>,
        filter: Arc<ContentFilter>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            chunker,
            filter,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Ingest `source`
    ///
    /// Fetch failures end the job. Unreadable files are skipped, as are
    /// failed sink writes unless `abort_on_sink_error` is set. The working
    /// directory is removed on every exit path.
    #[tracing::instrument(skip(self), fields(repo = %source))]
    pub async fn ingest(&self, source: &RepositorySource) -> Result<IngestReport, IngestionError> {
        let start = Instant::now();
        tracing::info!("Starting ingestion");

        let workdir = match &self.options.work_dir {
            Some(base) => WorkingDirectory::create_in(base),
            None => WorkingDirectory::create(),
        }
        .map_err(IngestionError::WorkingDirectory)?;
        let workdir = Arc::new(workdir);

        let outcome = self.run(source, &workdir).await;

        // A clone still held elsewhere removes the directory when it drops
        if let Ok(workdir) = Arc::try_unwrap(workdir) {
            match tokio::task::spawn_blocking(move || workdir.cleanup()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("{}", e),
                Err(e) => tracing::warn!("Cleanup task failed: {}", e),
            }
        }

        let mut report = outcome?;
        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Ingested {} chunks from {}/{} files in {}ms",
            report.chunks_written,
            report.files_ingested,
            report.files_seen,
            report.duration_ms
        );
        Ok(report)
    }

    async fn run(
        &self,
        source: &RepositorySource,
        workdir: &Arc<WorkingDirectory>,
    ) -> Result<IngestReport, IngestionError> {
        let root = workdir.path();

        // The clone keeps the directory alive until the fetch returns, even
        // if this future is dropped mid-fetch
        let fetcher = self.fetcher.clone();
        let fetch_source = source.clone();
        let dest = workdir.clone();
        tokio::task::spawn_blocking(move || fetcher.fetch(&fetch_source, dest.path()))
            .await
            .map_err(|e| IngestionError::TaskFailed(e.to_string()))??;

        let walker = FileWalker::new(root).with_skip_dirs(self.options.skip_dirs.clone());
        let filter = self.filter.clone();
        let (candidates, files_seen) = tokio::task::spawn_blocking(move || {
            let mut files_seen = 0;
            let mut candidates = Vec::new();
            for path in walker.files()? {
                files_seen += 1;
                if let Some(file) = filter.admit(path) {
                    candidates.push(file);
                }
            }
            Ok::<_, std::io::Error>((candidates, files_seen))
        })
        .await
        .map_err(|e| IngestionError::TaskFailed(e.to_string()))?
        .map_err(IngestionError::Walk)?;

        let mut report = IngestReport {
            repository: source.to_string(),
            files_seen,
            files_skipped: files_seen - candidates.len(),
            ..IngestReport::default()
        };
        tracing::info!(
            "Found {} ingestible files out of {}",
            candidates.len(),
            files_seen
        );

        for file in candidates {
            let relative = relative_path(root, &file.path);
            let chunker = self.chunker.clone();
            let repository = source.to_string();
            let source_file = relative.clone();
            let max_file_size = self.options.max_file_size;

            let loaded = tokio::task::spawn_blocking(move || {
                load_documents(&file, &repository, &source_file, max_file_size).map(|documents| {
                    documents
                        .iter()
                        .flat_map(|doc| chunker.chunk(doc))
                        .collect::<Vec<Chunk>>()
                })
            })
            .await
            .map_err(|e| IngestionError::TaskFailed(e.to_string()))?;

            let chunks = match loaded {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::warn!("Skipping file due to read error: {}", e);
                    report.read_failures += 1;
                    report.errors.push(format!("{}: {}", relative, e));
                    continue;
                }
            };

            if chunks.is_empty() {
                tracing::debug!("No text content in {}", relative);
                report.files_skipped += 1;
                continue;
            }

            match self.sink.write(chunks).await {
                Ok(written) => {
                    tracing::info!("Loaded {} chunks from {} to vector store", written, relative);
                    report.files_ingested += 1;
                    report.chunks_written += written;
                }
                Err(e) if self.options.abort_on_sink_error => {
                    return Err(IngestionError::Sink {
                        file: relative,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to write chunks for {}: {}", relative, e);
                    report.sink_failures += 1;
                    report.errors.push(format!("{}: {}", relative, e));
                }
            }
        }

        Ok(report)
    }
}

/// Path of `path` relative to `root`, with forward slashes
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Read an admitted file into documents: one per PDF page, one for text files
pub(crate) fn load_documents(
    file: &IngestibleFile,
    repository: &str,
    source_file: &str,
    max_file_size: u64,
) -> Result<Vec<Document>, FileReadError> {
    let io_error = |source| FileReadError::Io {
        path: file.path.clone(),
        source,
    };

    let size = std::fs::metadata(&file.path).map_err(io_error)?.len();
    if size > max_file_size {
        return Err(FileReadError::TooLarge {
            size,
            max: max_file_size,
        });
    }

    let document = |text: String, page: Option<u32>| Document {
        text,
        repository: repository.to_string(),
        source_file: source_file.to_string(),
        page,
    };

    match file.kind {
        FileKind::Pdf => Ok(extract_pdf_pages(&file.path)?
            .into_iter()
            .map(|page| document(page.text, Some(page.number)))
            .collect()),
        FileKind::Text => {
            let bytes = std::fs::read(&file.path).map_err(io_error)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| FileReadError::InvalidUtf8(file.path.clone()))?;
            Ok(vec![document(text, None)])
        }
    }
}
