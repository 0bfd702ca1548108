//! High-level page façade.
//!
//! [`FlightPage`] runs the whole pipeline over one document: extract the
//! push segments, assemble the stream buffer, decode it into a tree, and
//! capture the side-channel state and static-asset URLs that build-id
//! discovery feeds on. One parse produces one immutable page; decoding the
//! same markup twice yields structurally identical results.

use crate::decode::{self, DecodeError};
use crate::discovery;
use crate::extract::{self, Dom, ExtractError, Markup};
use crate::manifest::{self, BuildManifest, JsEvaluator, ManifestError};
use crate::query::Query;
use crate::segment::{self, SegmentError};
use crate::tree::FlightData;
use serde_json::Value;
use thiserror::Error;

/// Errors from parsing a page end to end.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// One parsed server-rendered page.
#[derive(Debug, Clone, Default)]
pub struct FlightPage {
    data: FlightData,
    next_data: Option<Value>,
    static_urls: Vec<String>,
}

impl FlightPage {
    /// Parse a raw markup string.
    pub fn parse(html: &str) -> Result<Self, PageError> {
        Self::from_dom(&Markup::new(html))
    }

    /// Parse through a caller-supplied DOM implementation.
    pub fn from_dom(dom: &dyn Dom) -> Result<Self, PageError> {
        let next_data = extract::next_data(dom)?;
        let data = match extract::flight_segments(dom)? {
            Some(segments) => decode::decode(&segment::assemble(&segments)?)?,
            None => FlightData::default(),
        };
        let static_urls = dom.asset_urls(discovery::STATIC_BASE);
        Ok(Self {
            data,
            next_data,
            static_urls,
        })
    }

    /// The decoded element tree. Empty when the page carried no flight data.
    pub fn flight_data(&self) -> &FlightData {
        &self.data
    }

    /// The `__NEXT_DATA__` side-channel payload, if the page had one.
    pub fn next_data(&self) -> Option<&Value> {
        self.next_data.as_ref()
    }

    /// Start a query over the decoded tree.
    pub fn query(&self) -> Query<'_> {
        self.data.query()
    }

    /// Discover the deployment build id for this page.
    pub fn build_id(&self) -> Option<String> {
        if let Some(id) = discovery::build_id_from_assets(&self.static_urls) {
            return Some(id);
        }
        if let Some(id) = discovery::build_id_from_next_data(self.next_data.as_ref()) {
            return Some(id);
        }
        discovery::build_id_from_tree(&self.data)
    }

    /// Path of the page's build-manifest asset, when a build id is known.
    pub fn build_manifest_path(&self) -> Option<String> {
        let id = self.build_id()?;
        Some(discovery::join_url(
            &discovery::join_url(discovery::STATIC_BASE, &id),
            "_buildManifest.js",
        ))
    }

    /// Extract the build manifest from a fetched `_buildManifest.js` script.
    pub fn build_manifest(
        &self,
        script: &str,
        evaluator: Option<&dyn JsEvaluator>,
    ) -> Result<BuildManifest, ManifestError> {
        manifest::extract_build_manifest(script, evaluator)
    }
}
