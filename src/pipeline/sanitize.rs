//! File- and folder-name sanitising for model-generated titles and categories.
//!
//! Both sanitizers share one policy:
//! 1. replace each of `/ \ ? % * : | " < >` with `_`
//! 2. trim surrounding whitespace
//! 3. collapse internal whitespace runs to a single `_`
//!
//! The file-name variant also guarantees a `.canvas` suffix. There is no
//! length limit and no collision handling; two titles that sanitize to the
//! same name collide when the canvas is written.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extension given to every generated canvas.
pub const CANVAS_EXTENSION: &str = ".canvas";

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\?%*:|"<>]"#).unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn sanitize(name: &str) -> String {
    let replaced = RE_UNSAFE.replace_all(name, "_");
    RE_WHITESPACE
        .replace_all(replaced.trim(), "_")
        .into_owned()
}

/// Sanitize a folder name.
pub fn sanitize_folder_name(name: &str) -> String {
    sanitize(name)
}

/// Sanitize a file name and make sure it ends in `.canvas`
/// (case-insensitive check).
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = sanitize(name);
    if !has_canvas_extension(&out) {
        out.push_str(CANVAS_EXTENSION);
    }
    out
}

fn has_canvas_extension(name: &str) -> bool {
    name.len() >= CANVAS_EXTENSION.len()
        && name
            .get(name.len() - CANVAS_EXTENSION.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(CANVAS_EXTENSION))
}
