//! Strip markdown fences and surrounding whitespace from model output.
//!
//! No semantic repair happens here; the result is only a candidate for
//! [`crate::validate`].

use thiserror::Error;

use crate::llm::RawText;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Model response was empty after sanitizing")]
    EmptyResponse,
}

/// Model output with fence markers removed, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate(String);

impl Candidate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const FENCE: &str = "```";

/// Reduce model output to the text that should parse.
///
/// If the output contains a fenced block, the body of the first block is kept
/// and any prose around it dropped. Otherwise the whole text is kept. Either
/// way stray fence markers are removed and whitespace trimmed.
pub fn sanitize(raw: &RawText) -> Result<Candidate, SanitizeError> {
    let text = raw.as_str();

    let body = match text.find(FENCE) {
        Some(open) => {
            let after_open = &text[open + FENCE.len()..];
            // Skip the info string ("json") up to the end of the fence line.
            let after_info = match after_open.find('\n') {
                Some(nl) if after_open[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                    &after_open[nl + 1..]
                }
                _ => after_open.trim_start_matches("json"),
            };
            match after_info.find(FENCE) {
                Some(close) => &after_info[..close],
                None => after_info,
            }
        }
        None => text,
    };

    let cleaned = body.replace(FENCE, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(SanitizeError::EmptyResponse);
    }

    Ok(Candidate(cleaned.to_string()))
}
