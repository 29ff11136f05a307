//! Asset module
//!
//! Environment sources, ASTC container handling, concurrent payload fetching
//! and the background loader feeding finished descriptors to the engine.

mod astc;
mod fetcher;
mod loader;
mod source;

pub use astc::{has_header, parse_header, strip_header, AstcError, AstcHeader, ASTC_HEADER_LEN, ASTC_MAGIC};
pub use fetcher::{AssetFetcher, FetchError};
pub use loader::{build_descriptor, EnvironmentLoader, LoadError, LoadEvent};
pub use source::{EnvironmentSource, FacePaths, SourceKind};
