//! Converts plain-text outlines and changelogs into sectioned XML.
//!
//! Input lines are escaped, classified into [`LineKind`]s and fed to a
//! [`MarkupBuilder`], which tracks open elements on an [`ElementStack`] and
//! hands out unique section identifiers from an [`IdentifierTable`].

pub mod builder;
pub mod classify;
pub mod convert;
pub mod error;
pub mod ids;
mod line;
pub mod quote;
pub mod release;
pub mod stack;

pub use builder::{MarkupBuilder, Section, XML_DECLARATION};
pub use classify::{classify, Dialect, LineKind, DEFAULT_HEADING_MARKER};
pub use convert::{convert_path, convert_reader, convert_str, ConvertOptions, DEFAULT_ROOT_ELEMENT};
pub use error::{MarkupError, MarkupResult};
pub use ids::{slugify, IdentifierTable};
pub use quote::{escape, link, quote, unescape, LinkOptions, TrackerLinks};
pub use release::{
    GitTagLookup, NoReleaseLookup, Release, ReleaseLookup, ReleasePattern, DEFAULT_PRODUCT,
    DEFAULT_TAG_PREFIX,
};
pub use stack::ElementStack;
