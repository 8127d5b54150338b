//! Combined-payload construction and reply parsing.
//!
//! Positional correlation is the only linkage between request and result:
//! the payload numbers each text, the instruction demands a JSON array of
//! exactly that many objects in the same order, and the parser enforces the
//! length before anything is resolved.

use crate::types::analysis::Analysis;
use crate::types::request::PendingRequest;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed instruction prefix; `{n}` is the batch length.
fn instruction(n: usize) -> String {
    format!(
        "You will receive {n} captured texts, each introduced by a line of the form \
\"--- ITEM k ---\". Reply with a JSON array of exactly {n} objects, in the same \
order as the items. Each object must have the keys \"title\", \"summary\", \
\"keywords\" (array of strings), \"emotions\" (array of strings), \"category\", \
and \"source_url\" (a URL string, or null). Reply with the JSON array only."
    )
}

/// Concatenate the batch into one delimited payload.
pub(crate) fn combined_payload(batch: &[PendingRequest]) -> String {
    let mut out = instruction(batch.len());
    for (i, req) in batch.iter().enumerate() {
        out.push_str(&format!("\n\n--- ITEM {} ---\n", i + 1));
        out.push_str(&req.text);
    }
    out
}

static FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

/// Pull a JSON array out of a model reply.
///
/// Tries, in order: the reply as-is, the contents of a markdown code fence,
/// and the outermost `[...]` span.
fn extract_array(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        return Some(value);
    }
    if let Some(captures) = FENCED.captures(text) {
        if let Some(inner) = captures.get(1) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(inner.as_str().trim()) {
                return Some(value);
            }
        }
    }
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if start < end {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text[start..=end]) {
            return Some(value);
        }
    }
    None
}

fn parse_failure(message: impl Into<String>) -> Error {
    Error::UpstreamParseFailure {
        message: message.into(),
    }
}

/// Parse the reply for a batch of `expected` requests into positionally
/// matched analyses. Any shortfall fails the whole reply; there is no
/// per-item salvage.
pub(crate) fn parse_batch_reply(reply: &str, expected: usize) -> Result<Vec<Analysis>> {
    let value = extract_array(reply)
        .ok_or_else(|| parse_failure("reply does not contain a JSON array"))?;
    let items: Vec<Analysis> = serde_json::from_value(value)
        .map_err(|e| parse_failure(format!("reply is not an array of analyses: {e}")))?;
    if items.len() != expected {
        return Err(parse_failure(format!(
            "expected {} analyses, got {}",
            expected,
            items.len()
        )));
    }
    Ok(items.into_iter().map(Analysis::normalized).collect())
}
