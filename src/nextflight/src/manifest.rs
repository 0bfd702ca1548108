//! Build-manifest extraction.
//!
//! The `_buildManifest.js` asset is a script that assigns
//! `self.__BUILD_MANIFEST` when executed. Execution is host-runtime
//! dependent, so it sits behind the one-method [`JsEvaluator`] capability
//! seam; no engine ships by default. When no evaluator is available (or the
//! one given fails), a textual fallback locates the `sortedPages` array
//! literal by bracket-depth matching and JSON-decodes it.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from build-manifest extraction.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The plugged-in evaluator failed to run the script.
    #[error("build manifest evaluation failed: {0}")]
    Evaluator(String),

    /// The script carries no `sortedPages` literal.
    #[error("build manifest script does not define sortedPages")]
    MissingSortedPages,

    /// The `sortedPages` literal never closes its bracket.
    #[error("sortedPages literal is unterminated")]
    UnterminatedLiteral,

    /// The `sortedPages` literal is not decodable as JSON.
    #[error("sortedPages literal is not valid JSON: {0}")]
    BadLiteral(#[source] serde_json::Error),
}

/// Capability seam for executing the build-manifest script.
///
/// Implementations run `script` in a context where a `self` mapping exists
/// to receive `self.__BUILD_MANIFEST`, and return that mapping. Invocation
/// is synchronous with no internal timeout; callers needing one wrap the
/// evaluator externally.
pub trait JsEvaluator {
    fn evaluate(&self, script: &str) -> Result<Map<String, Value>, ManifestError>;
}

/// A parsed build manifest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildManifest {
    raw: Map<String, Value>,
    sorted_pages: Vec<String>,
}

impl BuildManifest {
    /// Route paths in manifest order. Always populated, whichever extraction
    /// path produced the manifest.
    pub fn sorted_pages(&self) -> &[String] {
        &self.sorted_pages
    }

    /// The full manifest mapping. Empty when only the textual fallback ran.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// Extract the build manifest from a `_buildManifest.js` script.
///
/// Tries the evaluator first when one is given; on evaluator failure, falls
/// back to the textual `sortedPages` extraction. Each failed step logs a
/// diagnostic.
pub fn extract_build_manifest(
    script: &str,
    evaluator: Option<&dyn JsEvaluator>,
) -> Result<BuildManifest, ManifestError> {
    if let Some(evaluator) = evaluator {
        match evaluator.evaluate(script) {
            Ok(raw) => {
                let sorted_pages = pages_from_mapping(&raw)
                    .map_or_else(|| sorted_pages_fallback(script), Ok)?;
                return Ok(BuildManifest { raw, sorted_pages });
            }
            Err(err) => {
                tracing::warn!(error = %err, "evaluator failed, using textual fallback");
            }
        }
    }
    let sorted_pages = sorted_pages_fallback(script)?;
    Ok(BuildManifest {
        raw: Map::new(),
        sorted_pages,
    })
}

fn pages_from_mapping(manifest: &Map<String, Value>) -> Option<Vec<String>> {
    let pages = manifest.get("sortedPages")?.as_array()?;
    pages
        .iter()
        .map(|p| p.as_str().map(str::to_string))
        .collect()
}

/// Locate and decode the `sortedPages` array literal without executing the
/// script.
pub fn sorted_pages_fallback(script: &str) -> Result<Vec<String>, ManifestError> {
    let key = script
        .find("sortedPages")
        .ok_or(ManifestError::MissingSortedPages)?;
    let after_key = &script[key..];
    let open = after_key
        .find('[')
        .ok_or(ManifestError::MissingSortedPages)?;
    let literal = bracket_literal(&after_key[open..])?;

    let value: Value = serde_json::from_str(literal)
        // Manifests occasionally use single-quoted strings.
        .or_else(|_| serde_json::from_str(&literal.replace('\'', "\"")))
        .map_err(ManifestError::BadLiteral)?;
    let pages = value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .ok_or(ManifestError::MissingSortedPages)?;
    Ok(pages)
}

/// Slice a balanced `[...]` literal off the front of `text`, tracking
/// bracket depth and skipping brackets inside string literals.
fn bracket_literal(text: &str) -> Result<&str, ManifestError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (pos, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ManifestError::UnterminatedLiteral)?;
                if depth == 0 {
                    return Ok(&text[..=pos]);
                }
            }
            _ => {}
        }
    }
    Err(ManifestError::UnterminatedLiteral)
}
