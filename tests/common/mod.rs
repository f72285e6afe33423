//! Fakes shared by the pipeline integration tests.
//!
//! Documents are plain text behind a fake `%PDF` header. The scripted
//! provider recognises which prompt it was sent by a prefix the test
//! settings put in front of each template.

#![allow(dead_code)]

use async_trait::async_trait;
use pdf2canvas::{
    BatchProgressCallback, ChatMessage, ChatProvider, PipelineError, SamplingOptions, Settings,
    TextExtractor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const PDF_HEADER: &str = "%PDF-1.7 fake\n";

/// Bytes of a fake PDF whose extracted text is `text`.
pub fn fake_pdf(text: &str) -> Vec<u8> {
    format!("{PDF_HEADER}{text}").into_bytes()
}

/// Strips [`PDF_HEADER`]; anything without it fails like a corrupt file.
pub struct FakeExtractor;

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, path: &str, bytes: Vec<u8>) -> Result<String, PipelineError> {
        let text = String::from_utf8(bytes).map_err(|e| PipelineError::Extraction {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        text.strip_prefix(PDF_HEADER)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Extraction {
                path: path.to_string(),
                detail: "not a PDF".into(),
            })
    }
}

/// Settings whose templates are easy for [`ScriptedProvider`] to tell apart.
pub fn test_settings(input: &str, output: &str) -> Settings {
    Settings::builder()
        .input_folder(input)
        .output_folder(output)
        .system_prompt("SYSTEM")
        .title_prompt("TITLE:{doc}")
        .summary_prompt("SUMMARY:{doc}")
        .category_prompt("CATEGORY:{existing_subjects}|{summary}")
        .build()
        .unwrap()
}

/// Answers the three prompts deterministically.
///
/// - title: the first line of the document
/// - summary: `Summary of <title>` unless a failure is scripted for it
/// - category: the scripted category for that title, or `General`
#[derive(Default)]
pub struct ScriptedProvider {
    categories: HashMap<String, String>,
    summary_failures: HashMap<String, String>,
    /// Every user message received, in order.
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, title: &str, category: &str) -> Self {
        self.categories.insert(title.into(), category.into());
        self
    }

    /// Make the summary call for `title` fail with a server error.
    pub fn failing_summary(mut self, title: &str, message: &str) -> Self {
        self.summary_failures.insert(title.into(), message.into());
        self
    }

    pub fn prompts_starting_with(&self, prefix: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &SamplingOptions,
    ) -> Result<String, PipelineError> {
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "SYSTEM");
        let user = messages[1].content.clone();
        self.prompts.lock().unwrap().push(user.clone());

        if let Some(doc) = user.strip_prefix("TITLE:") {
            return Ok(format!("  {}  \n", doc.lines().next().unwrap_or("")));
        }
        if let Some(doc) = user.strip_prefix("SUMMARY:") {
            let title = doc.lines().next().unwrap_or("");
            if let Some(message) = self.summary_failures.get(title) {
                return Err(PipelineError::ServerError {
                    message: message.clone(),
                });
            }
            return Ok(format!("Summary of {title}"));
        }
        if let Some(rest) = user.strip_prefix("CATEGORY:") {
            let summary = rest.split_once('|').map(|(_, s)| s).unwrap_or("");
            let title = summary.trim_start_matches("Summary of ");
            return Ok(self
                .categories
                .get(title)
                .cloned()
                .unwrap_or_else(|| "General".into()));
        }
        panic!("unexpected prompt: {user}");
    }
}

/// Counts every callback event.
#[derive(Default)]
pub struct CountingCallback {
    pub batch_total: AtomicUsize,
    pub starts: AtomicUsize,
    pub completes: AtomicUsize,
    pub errors: AtomicUsize,
    pub length_warnings: AtomicUsize,
    pub batch_succeeded: AtomicUsize,
}

impl BatchProgressCallback for CountingCallback {
    fn on_batch_start(&self, total: usize) {
        self.batch_total.store(total, Ordering::SeqCst);
    }

    fn on_document_start(&self, _index: usize, _total: usize, _path: &str) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_length_warning(&self, _path: &str, _chars: usize, _budget: usize) {
        self.length_warnings.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_complete(&self, _index: usize, _total: usize, _canvas_path: &str) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_error(&self, _index: usize, _total: usize, _path: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, _total: usize, succeeded: usize) {
        self.batch_succeeded.store(succeeded, Ordering::SeqCst);
    }
}
