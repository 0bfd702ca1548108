//! Raw segment extraction from HTML markup.
//!
//! Two patterns are tried over the inline-script corpus in document order: a
//! bootstrap pattern matching the stream's initialization call (captured
//! exactly once, first match wins) and a payload-push pattern matching every
//! subsequent push call. Each captured array literal is JSON-decoded into one
//! segment.
//!
//! DOM access sits behind the narrow [`Dom`] seam so callers with a real DOM
//! tree can plug it in; [`Markup`] is the default regex-backed implementation
//! over a raw markup string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").expect("static pattern"));

static SRC_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bsrc\s*=\s*["']"#).expect("static pattern"));

static ID_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']*)["']"#).expect("static pattern"));

static URL_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:href|src)\s*=\s*["']([^"']+)["']"#).expect("static pattern")
});

static BOOTSTRAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)self\.__next_f\s*=\s*self\.__next_f\s*\|\|\s*\[\s*\]\s*;?\s*self\.__next_f\.push\(\s*(\[.*\])\s*\)",
    )
    .expect("static pattern")
});

static PUSH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)self\.__next_f\.push\(\s*(\[.*\])\s*\)").expect("static pattern"));

/// Id of the side-channel state script emitted by the pages router.
pub const NEXT_DATA_ID: &str = "__NEXT_DATA__";

/// Errors from segment and side-channel extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A captured push literal is not valid JSON.
    #[error("flight segment in script {position} is not valid JSON: {source}")]
    ParseError {
        position: usize,
        #[source]
        source: serde_json::Error,
    },

    /// More than one `__NEXT_DATA__` script in the document; user-input
    /// error, not a decoder bug.
    #[error("document contains {count} __NEXT_DATA__ scripts, expected at most one")]
    DuplicateNextData { count: usize },

    /// The `__NEXT_DATA__` payload is not valid JSON.
    #[error("__NEXT_DATA__ payload is not valid JSON: {0}")]
    BadNextData(#[source] serde_json::Error),
}

/// Minimal DOM access required by the extractor and build-id discovery.
pub trait Dom {
    /// All inline script bodies, in document order.
    fn inline_scripts(&self) -> Vec<String>;

    /// Bodies of scripts carrying the given `id` attribute, in document
    /// order.
    fn scripts_by_id(&self, id: &str) -> Vec<String>;

    /// All `href`/`src` attribute values containing the given substring, in
    /// document order.
    fn asset_urls(&self, needle: &str) -> Vec<String>;
}

/// Regex-backed [`Dom`] over a raw markup string.
#[derive(Debug, Clone, Copy)]
pub struct Markup<'a> {
    html: &'a str,
}

impl<'a> Markup<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html }
    }
}

impl Dom for Markup<'_> {
    fn inline_scripts(&self) -> Vec<String> {
        SCRIPT_RE
            .captures_iter(self.html)
            .filter(|c| !SRC_ATTR_RE.is_match(&c[1]))
            .map(|c| c[2].to_string())
            .collect()
    }

    fn scripts_by_id(&self, id: &str) -> Vec<String> {
        SCRIPT_RE
            .captures_iter(self.html)
            .filter(|c| {
                ID_ATTR_RE
                    .captures(&c[1])
                    .is_some_and(|attr| &attr[1] == id)
            })
            .map(|c| c[2].to_string())
            .collect()
    }

    fn asset_urls(&self, needle: &str) -> Vec<String> {
        URL_ATTR_RE
            .captures_iter(self.html)
            .map(|c| c[1].to_string())
            .filter(|url| url.contains(needle))
            .collect()
    }
}

/// Extract the ordered flight segments from a document.
///
/// Returns `None` when no script matches either pattern (the page carries no
/// flight data at all).
pub fn flight_segments(dom: &dyn Dom) -> Result<Option<Vec<Value>>, ExtractError> {
    let mut segments = Vec::new();
    let mut bootstrap_seen = false;

    for (position, script) in dom.inline_scripts().iter().enumerate() {
        if !bootstrap_seen {
            if let Some(captures) = BOOTSTRAP_RE.captures(script) {
                segments.push(parse_segment(&captures[1], position)?);
                bootstrap_seen = true;
                continue;
            }
        }
        if let Some(captures) = PUSH_RE.captures(script) {
            segments.push(parse_segment(&captures[1], position)?);
        }
    }

    Ok((!segments.is_empty()).then_some(segments))
}

fn parse_segment(literal: &str, position: usize) -> Result<Value, ExtractError> {
    serde_json::from_str(literal).map_err(|source| ExtractError::ParseError { position, source })
}

/// Extract the `__NEXT_DATA__` side-channel payload, if present. Exactly
/// zero or one such script is allowed.
pub fn next_data(dom: &dyn Dom) -> Result<Option<Value>, ExtractError> {
    let scripts = dom.scripts_by_id(NEXT_DATA_ID);
    match scripts.as_slice() {
        [] => Ok(None),
        [body] => serde_json::from_str(body)
            .map(Some)
            .map_err(ExtractError::BadNextData),
        more => Err(ExtractError::DuplicateNextData { count: more.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<html><head>
<link rel="stylesheet" href="/_next/static/css/app.css"/>
<script src="/_next/static/chunks/main.js"></script>
</head><body>
<script>self.__next_f=self.__next_f||[];self.__next_f.push([0])</script>
<script>self.__next_f.push([1,"0:{\"b\":\"BID\"}\n"])</script>
<script>self.__next_f.push([1,"1:T5,hello"])</script>
</body></html>"#;

    #[test]
    fn test_inline_scripts_skip_external() {
        let markup = Markup::new(PAGE);
        let scripts = markup.inline_scripts();
        assert_eq!(scripts.len(), 3);
        assert!(scripts[0].contains("__next_f=self.__next_f||[]"));
    }

    #[test]
    fn test_segments_in_document_order() {
        let markup = Markup::new(PAGE);
        let segments = flight_segments(&markup).unwrap().unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], json!([0]));
        assert_eq!(segments[1], json!([1, "0:{\"b\":\"BID\"}\n"]));
        assert_eq!(segments[2], json!([1, "1:T5,hello"]));
    }

    #[test]
    fn test_no_flight_scripts_is_none() {
        let markup = Markup::new("<html><script>console.log(1)</script></html>");
        assert!(flight_segments(&markup).unwrap().is_none());
    }

    #[test]
    fn test_later_bootstrap_matches_are_ignored() {
        let html = r#"
<script>self.__next_f=self.__next_f||[];self.__next_f.push([0])</script>
<script>self.__next_f=self.__next_f||[];self.__next_f.push([1,"x"])</script>
"#;
        let markup = Markup::new(html);
        let segments = flight_segments(&markup).unwrap().unwrap();
        // The second bootstrap is not re-captured as a bootstrap, but its
        // push still matches the payload pattern.
        assert_eq!(segments, vec![json!([0]), json!([1, "x"])]);
    }

    #[test]
    fn test_invalid_segment_json_is_fatal() {
        let markup = Markup::new("<script>self.__next_f.push([1,unquoted])</script>");
        let err = flight_segments(&markup).unwrap_err();
        assert!(matches!(err, ExtractError::ParseError { .. }));
    }

    #[test]
    fn test_next_data_extraction() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"buildId":"abc"}</script>"#;
        let markup = Markup::new(html);
        let data = next_data(&markup).unwrap().unwrap();
        assert_eq!(data["buildId"], json!("abc"));
    }

    #[test]
    fn test_missing_next_data_is_none() {
        let markup = Markup::new(PAGE);
        assert!(next_data(&markup).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_next_data_is_an_error() {
        let html = r#"
<script id="__NEXT_DATA__" type="application/json">{}</script>
<script id="__NEXT_DATA__" type="application/json">{}</script>
"#;
        let err = next_data(&Markup::new(html)).unwrap_err();
        assert!(matches!(err, ExtractError::DuplicateNextData { count: 2 }));
    }

    #[test]
    fn test_asset_urls_filtering() {
        let markup = Markup::new(PAGE);
        let urls = markup.asset_urls("/_next/static/");
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().any(|u| u.ends_with("app.css")));
        assert!(urls.iter().any(|u| u.ends_with("main.js")));
    }
}
