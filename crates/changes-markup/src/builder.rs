use crate::classify::LineKind;
use crate::error::MarkupResult;
use crate::ids::{slugify, IdentifierTable};
use crate::quote::{link, unescape, LinkOptions};
use crate::release::Release;
use crate::stack::ElementStack;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n";

const SECTION: &str = "section";
const TITLE: &str = "title";
const PARAGRAPH: &str = "p";
const LIST: &str = "ul";
const LIST_ITEM: &str = "li";
const LINE_BREAK: &str = "<br/>";

/// One heading of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Entity-escaped heading text.
    pub title: String,
    /// 1 for top-level sections.
    pub depth: usize,
    pub release: Option<Release>,
}

impl Section {
    pub fn new(title: impl Into<String>, depth: usize) -> Self {
        Self {
            title: title.into(),
            depth: depth.max(1),
            release: None,
        }
    }

    pub fn with_release(mut self, release: Option<Release>) -> Self {
        self.release = release;
        self
    }

    fn identity(&self) -> String {
        match &self.release {
            Some(release) if !release.tag.is_empty() => release.tag.clone(),
            _ => slugify(&unescape(&self.title)),
        }
    }
}

/// A `section` element still on the stack.
#[derive(Debug, Clone, Copy)]
struct OpenSection {
    /// Heading depth as written in the source.
    depth: usize,
    /// Stack depth just before the section was opened.
    stack_depth: usize,
}

/// Single-pass builder turning classified lines into an XML document.
///
/// The element stack and identifier table belong to this builder alone, so
/// identifiers never leak between documents.
#[derive(Debug)]
pub struct MarkupBuilder {
    stack: ElementStack,
    ids: IdentifierTable,
    sections: Vec<OpenSection>,
    links: LinkOptions,
    result: String,
    paragraph_pending: bool,
}

impl MarkupBuilder {
    pub fn new(root_element: &str, links: LinkOptions) -> Self {
        let mut stack = ElementStack::new();
        let mut result = String::from(XML_DECLARATION);
        result.push_str(&stack.open(root_element, &[]));

        Self {
            stack,
            ids: IdentifierTable::new(),
            sections: Vec::new(),
            links,
            result,
            paragraph_pending: true,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn add_line(&mut self, kind: &LineKind) -> MarkupResult<()> {
        match kind {
            LineKind::Blank => self.paragraph_pending = true,
            LineKind::Rule => {}
            LineKind::Heading { depth, title } => {
                self.open_section(&Section::new(title.as_str(), *depth))?;
            }
            LineKind::ListItem(text) => {
                if self.paragraph_pending {
                    self.paragraph_pending = false;
                    self.close_if_open(&[LIST_ITEM, LIST, PARAGRAPH])?;
                }
                self.close_if_open(&[LIST_ITEM, PARAGRAPH])?;
                self.ensure_open(LIST);
                self.ensure_open(LIST_ITEM);
                self.push_text(text);
            }
            LineKind::Quoted(text) => {
                self.start_pending_paragraph()?;
                self.close_if_open(&[LIST_ITEM])?;
                self.result.push_str(LINE_BREAK);
                self.push_text(text);
            }
            LineKind::Plain(text) => {
                self.start_pending_paragraph()?;
                self.push_text(text);
            }
        }
        Ok(())
    }

    /// Closes open content and every open section at the same or a deeper
    /// heading depth, then opens `section` inside whatever remains.
    pub fn open_section(&mut self, section: &Section) -> MarkupResult<()> {
        self.close_if_open(&[LIST_ITEM, LIST, PARAGRAPH])?;
        let parent_depth = self.parent_stack_depth(section.depth);
        self.close_to_depth(parent_depth)?;

        let id = self.ids.unique_id(&section.identity());
        let date = section
            .release
            .as_ref()
            .and_then(|release| release.date)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        tracing::trace!(depth = section.depth, %id, "opening section");

        self.sections.push(OpenSection {
            depth: section.depth,
            stack_depth: self.stack.depth(),
        });
        let markup = self.stack.open(
            SECTION,
            &[
                ("name", section.title.as_str()),
                ("id", id.as_str()),
                ("date", date.as_str()),
            ],
        );
        self.result.push_str(&markup);

        let title = link(&section.title, &self.links);
        self.add_literal(TITLE, &title, &[])?;

        self.paragraph_pending = true;
        Ok(())
    }

    /// Writes `<element>text</element>` at the current position. `text` is
    /// emitted as given.
    pub fn add_literal(
        &mut self,
        element: &str,
        text: &str,
        attributes: &[(&str, &str)],
    ) -> MarkupResult<()> {
        let open = self.stack.open(element, attributes);
        self.result.push_str(open.trim_end_matches('\n'));
        self.result.push_str(text);
        let close = self.stack.close()?;
        self.result.push_str(&close);
        Ok(())
    }

    /// Closes elements until `depth` remain on the stack.
    pub fn close_to_depth(&mut self, depth: usize) -> MarkupResult<()> {
        let markup = self.stack.close_to_depth(depth)?;
        self.result.push_str(&markup);
        self.sections.retain(|open| open.stack_depth < depth);
        Ok(())
    }

    /// Closes everything, including the root element, and returns the document.
    pub fn finish(mut self) -> MarkupResult<String> {
        self.close_to_depth(0)?;
        Ok(self.result)
    }

    /// Stack depth a section of heading depth `depth` is opened at: just
    /// inside the innermost open section with a smaller heading depth, or
    /// just inside the root.
    fn parent_stack_depth(&self, depth: usize) -> usize {
        self.sections
            .iter()
            .rev()
            .find(|open| open.depth < depth)
            .map_or(1, |parent| parent.stack_depth + 1)
    }

    fn start_pending_paragraph(&mut self) -> MarkupResult<()> {
        if self.paragraph_pending {
            self.paragraph_pending = false;
            self.close_if_open(&[LIST_ITEM, LIST, PARAGRAPH])?;
            self.ensure_open(PARAGRAPH);
        }
        Ok(())
    }

    fn close_if_open(&mut self, tags: &[&str]) -> MarkupResult<()> {
        let markup = self.stack.perhaps_close(tags)?;
        self.result.push_str(&markup);
        Ok(())
    }

    fn ensure_open(&mut self, tag: &str) {
        let markup = self.stack.ensure_open(tag);
        self.result.push_str(&markup);
    }

    fn push_text(&mut self, text: &str) {
        self.result.push_str(&link(text, &self.links));
        self.result.push(' ');
    }
}
