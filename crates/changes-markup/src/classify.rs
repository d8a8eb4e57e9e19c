use std::fmt;
use std::str::FromStr;

/// Default heading marker for the outline dialect.
pub const DEFAULT_HEADING_MARKER: char = '*';

const LIST_MARKER: &str = "- ";
const QUOTE_MARKER: &str = "&gt;";

/// Line convention of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Headings are a run of the marker character; depth is the run length.
    #[default]
    Outline,
    /// Changelog layout: every non-indented line is a top-level heading and
    /// indented lines carry the content. Column-zero dashes are rules.
    Changes,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Outline => "outline",
            Dialect::Changes => "changes",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "outline" => Ok(Dialect::Outline),
            "changes" => Ok(Dialect::Changes),
            _ => Err(()),
        }
    }
}

/// Structural role of one escaped input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Heading { depth: usize, title: String },
    /// Item text with the dash marker removed.
    ListItem(String),
    /// Quoted text, marker included.
    Quoted(String),
    Plain(String),
    /// Separator line; carries no content.
    Rule,
}

/// Classifies an entity-escaped line.
pub fn classify(line: &str, dialect: Dialect, marker: char) -> LineKind {
    match dialect {
        Dialect::Outline => {
            detect_marker_heading(line, marker).unwrap_or_else(|| classify_content(line))
        }
        Dialect::Changes => classify_changes_line(line),
    }
}

fn classify_changes_line(line: &str) -> LineKind {
    if line.starts_with('-') {
        return LineKind::Rule;
    }

    match line.chars().next() {
        Some(first) if first != ' ' && first != '\t' => LineKind::Heading {
            depth: 1,
            title: line.trim().to_string(),
        },
        _ => classify_content(line),
    }
}

fn detect_marker_heading(line: &str, marker: char) -> Option<LineKind> {
    let depth = line.chars().take_while(|ch| *ch == marker).count();
    if depth == 0 {
        return None;
    }

    let rest = &line[depth * marker.len_utf8()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let title = rest.trim();
    if title.is_empty() {
        return None;
    }

    Some(LineKind::Heading {
        depth,
        title: title.to_string(),
    })
}

fn classify_content(line: &str) -> LineKind {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        LineKind::Blank
    } else if let Some(item) = trimmed.strip_prefix(LIST_MARKER) {
        LineKind::ListItem(item.trim_start().to_string())
    } else if trimmed.starts_with(QUOTE_MARKER) {
        LineKind::Quoted(trimmed.to_string())
    } else {
        LineKind::Plain(trimmed.to_string())
    }
}
