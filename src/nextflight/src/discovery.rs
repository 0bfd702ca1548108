//! Build-id discovery.
//!
//! A deployment's build id names the directory that static assets and the
//! data API live under. Discovery is a best-effort ordered chain; each step
//! is independent, logs a diagnostic on failure, and falls through. Total
//! failure is `None`, not an error.

use crate::element::ElementKind;
use crate::extract::Dom;
use crate::tree::FlightData;
use serde_json::Value;

/// Common base path of Next.js static assets.
pub const STATIC_BASE: &str = "/_next/static/";

/// Manifest filenames that directly follow the build-id path segment.
const MANIFEST_FILES: [&str; 2] = ["_buildManifest.js", "_ssgManifest.js"];

/// Discover the page's build id.
///
/// Order: static-asset URLs, then the `__NEXT_DATA__` side channel, then an
/// RSC payload in the decoded tree.
pub fn discover_build_id(
    dom: &dyn Dom,
    next_data: Option<&Value>,
    data: Option<&FlightData>,
) -> Option<String> {
    if let Some(id) = build_id_from_assets(&dom.asset_urls(STATIC_BASE)) {
        return Some(id);
    }
    tracing::debug!("no build id in static asset urls");

    if let Some(id) = build_id_from_next_data(next_data) {
        return Some(id);
    }
    tracing::debug!("no build id in side-channel state");

    if let Some(id) = data.and_then(build_id_from_tree) {
        return Some(id);
    }
    tracing::debug!("no rsc payload with a build id in the flight tree");

    None
}

/// Build id from manifest asset URLs: the path segment between the static
/// base and the manifest filename.
pub(crate) fn build_id_from_assets(urls: &[String]) -> Option<String> {
    for url in urls {
        if !MANIFEST_FILES.iter().any(|name| url.contains(name)) {
            continue;
        }
        let Some(rest) = url.split(STATIC_BASE).nth(1) else {
            continue;
        };
        let Some(id) = rest.split('/').next() else {
            continue;
        };
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }
    None
}

pub(crate) fn build_id_from_next_data(next_data: Option<&Value>) -> Option<String> {
    next_data?
        .get("buildId")?
        .as_str()
        .map(str::to_string)
}

pub(crate) fn build_id_from_tree(data: &FlightData) -> Option<String> {
    data.query()
        .kinds([ElementKind::RscPayload])
        .find()?
        .build_id()
        .map(str::to_string)
}

/// Join URL path segments without duplicating separators.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
