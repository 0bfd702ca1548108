//! # nextflight
//!
//! Decoder for the flight-data stream that Next.js embeds in
//! server-rendered HTML.
//!
//! This library provides functionality to:
//! - Extract the `self.__next_f.push` segments from a page's inline scripts
//! - Assemble and decode the record stream into a tree of typed elements
//! - Classify records into variants by value-class tag or payload shape
//! - Search the tree recursively with class and predicate filters
//! - Discover the deployment build id and read the build manifest
//!
//! ## Example
//!
//! ```
//! use nextflight::{ElementKind, FlightPage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let html = r#"
//! <script>self.__next_f=self.__next_f||[];self.__next_f.push([0])</script>
//! <script>self.__next_f.push([1,"0:{\"b\":\"dev\"}\n1:T5,hello"])</script>
//! "#;
//!
//! let page = FlightPage::parse(html)?;
//!
//! let text = page.query().kinds([ElementKind::Text]).find().unwrap();
//! assert_eq!(text.text(), Some("hello"));
//! assert_eq!(page.build_id().as_deref(), Some("dev"));
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod discovery;
pub mod element;
pub mod extract;
pub mod manifest;
pub mod page;
pub mod query;
pub mod resolve;
pub mod segment;
pub mod tree;

// Re-export commonly used items
#[doc(inline)]
pub use decode::{decode_buffer, decode_str, DecodeError};
#[doc(inline)]
pub use discovery::{discover_build_id, join_url};
#[doc(inline)]
pub use element::{Element, ElementError, ElementKind, ElementRecord, RscVersion};
#[doc(inline)]
pub use extract::{flight_segments, next_data, Dom, ExtractError, Markup};
#[doc(inline)]
pub use manifest::{extract_build_manifest, BuildManifest, JsEvaluator, ManifestError};
#[doc(inline)]
pub use page::{FlightPage, PageError};
#[doc(inline)]
pub use query::{Matches, Query};
#[doc(inline)]
pub use resolve::{resolve, resolve_as};
#[doc(inline)]
pub use segment::{assemble, SegmentError};
#[doc(inline)]
pub use tree::FlightData;
