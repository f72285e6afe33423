//! Settings for a pdf2canvas run.
//!
//! Everything the pipeline needs (endpoint, sampling parameters, folders,
//! prompts) lives in one flat [`Settings`] record that is built once at
//! startup and passed by reference into each stage. There is no global.
//!
//! Settings are persisted as pretty-printed JSON. Loading merges the saved
//! values over [`Settings::default()`]: a file that names only `model` and
//! `output_folder` still gets every other field from the defaults, so new
//! fields never break old files.

use crate::error::PipelineError;
use crate::prompts::{
    DEFAULT_CATEGORY_PROMPT, DEFAULT_SUMMARY_PROMPT, DEFAULT_SYSTEM_PROMPT, DEFAULT_TITLE_PROMPT,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Empirical characters-per-token ratio used for the length warning.
pub const CHARS_PER_TOKEN: usize = 4;

/// Configuration for a batch run.
///
/// Built via [`Settings::builder()`], [`Settings::load`] or
/// [`Settings::default()`].
///
/// # Example
/// ```rust
/// use pdf2canvas::Settings;
///
/// let settings = Settings::builder()
///     .model("llama3.1:8b")
///     .input_folder("Papers")
///     .output_folder("Canvases")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(settings.base_url, "http://localhost:11434");
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the inference server; `/api/chat` is appended.
    pub base_url: String,

    /// Bearer token. Sent only when set and non-empty.
    pub api_token: Option<String>,

    /// Model identifier, e.g. "llama3.1:8b".
    pub model: String,

    /// Context window in tokens, sent as `num_ctx`. Also sizes the
    /// over-length warning (`max_tokens × CHARS_PER_TOKEN` characters).
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    pub top_k: u32,

    pub top_p: f32,

    pub repeat_penalty: f32,

    pub presence_penalty: f32,

    pub frequency_penalty: f32,

    /// Vault-relative folder scanned for PDFs. Empty means "not configured".
    pub input_folder: String,

    /// Vault-relative folder under which category folders are created.
    pub output_folder: String,

    /// Log full error detail for failed documents.
    pub verbose: bool,

    pub system_prompt: String,

    /// Title template; `{doc}` is the first 500 characters of the document.
    pub title_prompt: String,

    /// Summary template; `{doc}` is the stripped document text.
    pub summary_prompt: String,

    /// Category template; `{summary}` and `{existing_subjects}`.
    pub category_prompt: String,

    /// Whole-request timeout for the inference call. `None` leaves the
    /// transport default in place.
    pub request_timeout_secs: Option<u64>,

    /// Explicit path to the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            api_token: None,
            model: "llama3.1:8b".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.9,
            repeat_penalty: 1.1,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            input_folder: String::new(),
            output_folder: String::new(),
            verbose: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            title_prompt: DEFAULT_TITLE_PROMPT.to_string(),
            summary_prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
            category_prompt: DEFAULT_CATEGORY_PROMPT.to_string(),
            request_timeout_secs: None,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .field("repeat_penalty", &self.repeat_penalty)
            .field("presence_penalty", &self.presence_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("input_folder", &self.input_folder)
            .field("output_folder", &self.output_folder)
            .field("verbose", &self.verbose)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl Settings {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Turn these settings back into a builder, e.g. to apply CLI overrides.
    pub fn into_builder(self) -> SettingsBuilder {
        SettingsBuilder { settings: self }
    }

    /// Load settings from a JSON file, merging saved values over defaults.
    ///
    /// Saved values go through the same clamping and validation as
    /// [`SettingsBuilder::build`]. A missing file yields
    /// [`Settings::default()`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(PipelineError::SettingsIo {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let format_err = |detail: String| PipelineError::SettingsFormat {
            path: path.to_path_buf(),
            detail,
        };
        let saved: Settings = serde_json::from_str(&raw).map_err(|e| format_err(e.to_string()))?;
        saved
            .into_builder()
            .build()
            .map_err(|e| format_err(e.to_string()))
    }

    /// Persist settings as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let io_err = |source| PipelineError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Internal(format!("settings serialisation: {e}")))?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Character count above which a document triggers the length warning.
    pub fn length_budget_chars(&self) -> usize {
        self.max_tokens.saturating_mul(CHARS_PER_TOKEN)
    }

    /// The bearer token, if one is configured and non-empty.
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Check that both folders are configured.
    pub fn require_folders(&self) -> Result<(), PipelineError> {
        if self.input_folder.trim().is_empty() {
            return Err(PipelineError::MissingFolder { which: "input" });
        }
        if self.output_folder.trim().is_empty() {
            return Err(PipelineError::MissingFolder { which: "output" });
        }
        Ok(())
    }
}

/// Builder for [`Settings`].
#[derive(Debug)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.settings.api_token = Some(token.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.settings.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.settings.temperature = t;
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.settings.top_k = k;
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.settings.top_p = p;
        self
    }

    pub fn repeat_penalty(mut self, p: f32) -> Self {
        self.settings.repeat_penalty = p;
        self
    }

    pub fn presence_penalty(mut self, p: f32) -> Self {
        self.settings.presence_penalty = p;
        self
    }

    pub fn frequency_penalty(mut self, p: f32) -> Self {
        self.settings.frequency_penalty = p;
        self
    }

    pub fn input_folder(mut self, folder: impl Into<String>) -> Self {
        self.settings.input_folder = folder.into();
        self
    }

    pub fn output_folder(mut self, folder: impl Into<String>) -> Self {
        self.settings.output_folder = folder.into();
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.settings.verbose = v;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.settings.system_prompt = prompt.into();
        self
    }

    pub fn title_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.settings.title_prompt = prompt.into();
        self
    }

    pub fn summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.settings.summary_prompt = prompt.into();
        self
    }

    pub fn category_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.settings.category_prompt = prompt.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.settings.request_timeout_secs = Some(secs);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the settings: clamp `temperature` to 0–2 and `top_p` to 0–1,
    /// then validate the rest.
    pub fn build(mut self) -> Result<Settings, PipelineError> {
        self.settings.temperature = self.settings.temperature.clamp(0.0, 2.0);
        self.settings.top_p = self.settings.top_p.clamp(0.0, 1.0);
        let s = &self.settings;
        if s.base_url.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("base_url must not be empty".into()));
        }
        if !(s.base_url.starts_with("http://") || s.base_url.starts_with("https://")) {
            return Err(PipelineError::InvalidConfig(format!(
                "base_url must start with http:// or https://, got '{}'",
                s.base_url
            )));
        }
        if s.model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("model must not be empty".into()));
        }
        if s.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.settings)
    }
}
