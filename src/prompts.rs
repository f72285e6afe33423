//! Default prompts and placeholder substitution.
//!
//! Every prompt the pipeline sends lives here so that changing the default
//! wording means editing exactly one place. Callers override any of them via
//! [`crate::config::Settings`]; these constants are only the defaults.
//!
//! ## Placeholders
//!
//! | Token | Used in | Replaced with |
//! |-------|---------|---------------|
//! | `{doc}` | title, summary | document text (first 500 chars for the title) |
//! | `{summary}` | category | the generated summary |
//! | `{existing_subjects}` | category | existing category folders, comma-joined |
//!
//! Substitution is a single pass over the *template*: text inserted for one
//! token is never scanned again, so a paper that literally contains
//! `{summary}` keeps it verbatim. Unknown `{...}` tokens are left alone.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Default system prompt sent ahead of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a meticulous research assistant. \
You read academic and technical documents and answer exactly what is asked, \
without preamble, commentary or formatting that was not requested.";

/// Default title template. `{doc}` is the first 500 characters of the document.
pub const DEFAULT_TITLE_PROMPT: &str = r#"Below is the beginning of a document. Reply with its title and nothing else: no quotes, no labels, no trailing punctuation.

"""
{doc}
""""#;

/// Default summary template. `{doc}` is the document text with its
/// reference section removed.
pub const DEFAULT_SUMMARY_PROMPT: &str = r#"Summarise the following document for a researcher deciding whether to read it in full.

Cover, in Markdown:
- the problem the document addresses
- the approach or method
- the main results or claims
- limitations the authors acknowledge

Do not add an introduction or a closing remark.

"""
{doc}
""""#;

/// Default category template.
pub const DEFAULT_CATEGORY_PROMPT: &str = r#"Assign the document summarised below to a single subject category.

Existing categories: {existing_subjects}

Reuse an existing category whenever it fits. Only propose a new one when none of them does. Reply with the category name only, one to three words.

Summary:
"""
{summary}
""""#;

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(doc|summary|existing_subjects)\}").unwrap());

/// Values available for substitution into a prompt template.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptVars<'a> {
    pub doc: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub existing_subjects: Option<&'a str>,
}

/// Fill `template` with `vars` in one pass.
///
/// A known token whose value is `None` stays in the output unchanged.
pub fn fill_template(template: &str, vars: &PromptVars<'_>) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let value = match &caps[1] {
                "doc" => vars.doc,
                "summary" => vars.summary,
                "existing_subjects" => vars.existing_subjects,
                _ => None,
            };
            value.map(str::to_string).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_their_placeholders() {
        assert!(DEFAULT_TITLE_PROMPT.contains("{doc}"));
        assert!(DEFAULT_SUMMARY_PROMPT.contains("{doc}"));
        assert!(DEFAULT_CATEGORY_PROMPT.contains("{summary}"));
        assert!(DEFAULT_CATEGORY_PROMPT.contains("{existing_subjects}"));
    }

    #[test]
    fn fills_every_occurrence() {
        let out = fill_template(
            "{doc} / {doc}",
            &PromptVars {
                doc: Some("x"),
                ..Default::default()
            },
        );
        assert_eq!(out, "x / x");
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let out = fill_template(
            "S: {summary} E: {existing_subjects}",
            &PromptVars {
                summary: Some("talks about {existing_subjects}"),
                existing_subjects: Some("Alignment, Scaling"),
                ..Default::default()
            },
        );
        assert_eq!(
            out,
            "S: talks about {existing_subjects} E: Alignment, Scaling"
        );
    }

    #[test]
    fn missing_values_and_unknown_tokens_are_kept() {
        let out = fill_template("{doc} {title} {summary}", &PromptVars::default());
        assert_eq!(out, "{doc} {title} {summary}");
    }
}
