use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use crate::builder::{MarkupBuilder, Section};
use crate::classify::{classify, Dialect, LineKind, DEFAULT_HEADING_MARKER};
use crate::error::MarkupResult;
use crate::line::{read_lines, SourceLine};
use crate::quote::{escape, LinkOptions};
use crate::release::{ReleaseLookup, ReleasePattern};

pub const DEFAULT_ROOT_ELEMENT: &str = "changes";

/// Everything that shapes one conversion apart from the input itself.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub root_element: String,
    pub dialect: Dialect,
    pub heading_marker: char,
    pub links: LinkOptions,
    pub release_pattern: ReleasePattern,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            root_element: DEFAULT_ROOT_ELEMENT.to_string(),
            dialect: Dialect::default(),
            heading_marker: DEFAULT_HEADING_MARKER,
            links: LinkOptions::default(),
            release_pattern: ReleasePattern::default(),
        }
    }
}

pub fn convert_str(
    text: &str,
    options: &ConvertOptions,
    releases: &dyn ReleaseLookup,
) -> MarkupResult<String> {
    let mut reader = Cursor::new(text);
    convert_reader(&mut reader, options, releases)
}

pub fn convert_path(
    path: &Path,
    options: &ConvertOptions,
    releases: &dyn ReleaseLookup,
) -> MarkupResult<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    convert_reader(&mut reader, options, releases)
}

/// Converts a whole document. A fresh builder, and with it a fresh identifier
/// table, is used for every call.
pub fn convert_reader<R: BufRead>(
    reader: &mut R,
    options: &ConvertOptions,
    releases: &dyn ReleaseLookup,
) -> MarkupResult<String> {
    let lines = read_lines(reader)?;
    convert_lines(&lines, options, releases)
}

fn convert_lines(
    lines: &[SourceLine],
    options: &ConvertOptions,
    releases: &dyn ReleaseLookup,
) -> MarkupResult<String> {
    let mut builder = MarkupBuilder::new(&options.root_element, options.links.clone());

    for line in lines {
        let escaped = escape(&line.text);
        match classify(&escaped, options.dialect, options.heading_marker) {
            LineKind::Heading { depth, title } => {
                let release = options
                    .release_pattern
                    .version(&title)
                    .and_then(|version| releases.lookup(version));
                tracing::trace!(line = line.number, depth, "heading");
                builder.open_section(&Section::new(title, depth).with_release(release))?;
            }
            kind => builder.add_line(&kind)?,
        }
    }

    builder.finish()
}
