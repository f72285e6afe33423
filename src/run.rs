//! The batch driver: locate PDFs, then turn each one into a canvas.
//!
//! ## Per-document flow
//!
//! ```text
//! read ─▶ extract ─▶ strip ─▶ (length check) ─▶ title ─▶ sanitize
//!      ─▶ summary ─▶ list categories ─▶ categorise ─▶ resolve folder
//!      ─▶ build canvas ─▶ write {folder}/{title}.canvas
//! ```
//!
//! Documents run strictly one after another. A failure at any step is
//! recorded as [`DocumentOutcome::Failed`] with the step it happened in and
//! the batch moves on; nothing already written (e.g. a freshly created
//! category folder) is rolled back.
//!
//! Two entry points share that flow: [`Pipeline::run`] waits for the whole
//! batch and returns a [`BatchReport`], [`Pipeline::run_stream`] yields each
//! outcome as soon as its document is finished.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::output::{BatchReport, DocumentOutcome, DocumentStage, FailedDocument, ProcessedDocument};
use crate::pipeline::canvas::build_canvas;
use crate::pipeline::category::{existing_categories, resolve_category_folder};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::{extract_title, generate_summary, suggest_category, ChatProvider};
use crate::pipeline::locate::{locate_documents, DocumentRef};
use crate::pipeline::sanitize::sanitize_file_name;
use crate::pipeline::strip::strip_references;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::vault::{join_path, normalize_path, EntryKind, Vault};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of document outcomes, in processing order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = DocumentOutcome> + Send>>;

/// Everything one run needs, wired together once at startup.
#[derive(Clone)]
pub struct Pipeline {
    settings: Settings,
    vault: Arc<dyn Vault>,
    extractor: Arc<dyn TextExtractor>,
    provider: Arc<dyn ChatProvider>,
    progress: ProgressCallback,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        vault: Arc<dyn Vault>,
        extractor: Arc<dyn TextExtractor>,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            settings,
            vault,
            extractor,
            provider,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Report per-document events to `progress`.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate the folders and list the documents to process.
    ///
    /// # Errors
    /// - [`PipelineError::MissingFolder`] when a folder is not configured
    /// - [`PipelineError::NotAFolder`] when the output root does not exist
    /// - [`PipelineError::NoDocuments`] when the input folder holds no PDF
    pub async fn locate(&self) -> Result<Vec<DocumentRef>, PipelineError> {
        self.settings.require_folders()?;

        let output_root = normalize_path(&self.settings.output_folder);
        if self.vault.entry(&output_root).await? != Some(EntryKind::Folder) {
            return Err(PipelineError::NotAFolder { path: output_root });
        }

        locate_documents(self.vault.as_ref(), &self.settings.input_folder).await
    }

    /// Process every located document and collect the outcomes.
    ///
    /// Returns `Err` only for run-level failures (see [`Pipeline::locate`]).
    /// Per-document failures are inside the report.
    pub async fn run(&self) -> Result<BatchReport, PipelineError> {
        let start = Instant::now();
        let docs = self.locate().await?;
        let total = docs.len();
        info!(
            "Processing {} documents from '{}'",
            total, self.settings.input_folder
        );
        self.progress.on_batch_start(total);

        let mut outcomes = Vec::with_capacity(total);
        for (i, doc) in docs.iter().enumerate() {
            outcomes.push(self.process_at(i + 1, total, doc).await);
        }

        let report = BatchReport {
            outcomes,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        self.progress.on_batch_complete(total, report.succeeded());
        info!(
            "Batch complete: {}/{} documents, {}ms total",
            report.succeeded(),
            total,
            report.total_duration_ms
        );
        Ok(report)
    }

    /// Like [`Pipeline::run`], but yield each outcome as soon as it is ready.
    ///
    /// Run-level failures are returned before the stream is built.
    /// `on_batch_complete` is not fired; the stream ending is the signal.
    pub async fn run_stream(&self) -> Result<OutcomeStream, PipelineError> {
        let docs = self.locate().await?;
        let total = docs.len();
        self.progress.on_batch_start(total);

        let pipeline = self.clone();
        let s = stream::iter(docs.into_iter().enumerate()).then(move |(i, doc)| {
            let pipeline = pipeline.clone();
            async move { pipeline.process_at(i + 1, total, &doc).await }
        });

        Ok(Box::pin(s))
    }

    /// Run one document through the whole flow.
    pub async fn process_document(&self, doc: &DocumentRef) -> DocumentOutcome {
        self.process_at(1, 1, doc).await
    }

    async fn process_at(&self, index: usize, total: usize, doc: &DocumentRef) -> DocumentOutcome {
        let start = Instant::now();
        self.progress.on_document_start(index, total, &doc.path);
        info!("[{}/{}] {}", index, total, doc.path);

        match self.try_process(doc).await {
            Ok(mut done) => {
                done.duration_ms = start.elapsed().as_millis() as u64;
                self.progress
                    .on_document_complete(index, total, &done.canvas_path);
                info!(
                    "[{}/{}] {} → {} in {}ms",
                    index, total, doc.path, done.canvas_path, done.duration_ms
                );
                DocumentOutcome::Done(done)
            }
            Err((stage, error)) => {
                warn!(
                    "[{}/{}] {} failed during {:?}: {}",
                    index, total, doc.path, stage, error
                );
                if self.settings.verbose {
                    debug!("{}: {:#?}", doc.path, error);
                }
                self.progress
                    .on_document_error(index, total, &doc.path, &error.to_string());
                DocumentOutcome::Failed(FailedDocument {
                    source: doc.path.clone(),
                    stage,
                    error,
                })
            }
        }
    }

    async fn try_process(
        &self,
        doc: &DocumentRef,
    ) -> Result<ProcessedDocument, (DocumentStage, PipelineError)> {
        let settings = &self.settings;
        let vault = self.vault.as_ref();
        let provider = self.provider.as_ref();

        let bytes = vault
            .read_binary(&doc.path)
            .await
            .map_err(at(DocumentStage::Read))?;

        let raw = self
            .extractor
            .extract_text(&doc.path, bytes)
            .await
            .map_err(at(DocumentStage::Extract))?;
        let text = strip_references(&raw);
        let text_chars = text.chars().count();
        debug!(
            "{}: {} chars extracted, {} after stripping references",
            doc.path,
            raw.chars().count(),
            text_chars
        );

        let budget = settings.length_budget_chars();
        let over_length_budget = text_chars > budget;
        if over_length_budget {
            warn!(
                "{}: {} chars exceeds the ~{} char budget for max_tokens={}; the model may see a truncated document",
                doc.path, text_chars, budget, settings.max_tokens
            );
            self.progress.on_length_warning(&doc.path, text_chars, budget);
        }

        let title = extract_title(provider, settings, text)
            .await
            .map_err(at(DocumentStage::Title))?;
        let file_name = sanitize_file_name(&title);
        debug!("{}: title {:?} → {}", doc.path, title, file_name);

        let summary = generate_summary(provider, settings, text)
            .await
            .map_err(at(DocumentStage::Summary))?;

        let existing = existing_categories(vault, &settings.output_folder)
            .await
            .map_err(at(DocumentStage::Categorize))?;
        let category = suggest_category(provider, settings, &summary, &existing)
            .await
            .map_err(at(DocumentStage::Categorize))?;
        let category_folder = resolve_category_folder(vault, &settings.output_folder, &category)
            .await
            .map_err(at(DocumentStage::Categorize))?;

        let canvas_json = build_canvas(&doc.path, &summary)
            .to_json()
            .map_err(|e| PipelineError::Internal(format!("canvas serialisation: {e}")))
            .map_err(at(DocumentStage::Write))?;
        let canvas_path = join_path(&category_folder, &file_name);
        vault
            .create_file(&canvas_path, &canvas_json)
            .await
            .map_err(at(DocumentStage::Write))?;

        Ok(ProcessedDocument {
            source: doc.path.clone(),
            title,
            category_folder,
            canvas_path,
            text_chars,
            over_length_budget,
            duration_ms: 0,
        })
    }
}

fn at(stage: DocumentStage) -> impl FnOnce(PipelineError) -> (DocumentStage, PipelineError) {
    move |error| (stage, error)
}
