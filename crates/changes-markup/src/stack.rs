use crate::error::{MarkupError, MarkupResult};

/// Stack of currently open elements. Every method returns the markup it
/// produced so the caller decides where it goes.
#[derive(Debug, Default)]
pub struct ElementStack {
    open: Vec<String>,
}

impl ElementStack {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn top(&self) -> Option<&str> {
        self.open.last().map(String::as_str)
    }

    /// Pushes `tag` and renders its start tag. Attributes with empty values
    /// are dropped; values must already be entity-escaped text.
    pub fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) -> String {
        self.open.push(tag.to_string());

        let mut result = format!("<{tag}");
        for (key, value) in attributes {
            if value.is_empty() {
                continue;
            }
            result.push_str(&format!(
                " {}='{}'",
                key.replace('_', ":"),
                value.replace('\'', "&apos;")
            ));
        }
        result.push_str(">\n");
        result
    }

    pub fn ensure_open(&mut self, tag: &str) -> String {
        if self.top() == Some(tag) {
            String::new()
        } else {
            self.open(tag, &[])
        }
    }

    /// Walks `tags` in order, closing the innermost element whenever it
    /// matches the tag being visited.
    pub fn perhaps_close(&mut self, tags: &[&str]) -> MarkupResult<String> {
        let mut result = String::new();
        for tag in tags {
            if self.top() == Some(*tag) {
                result.push_str(&self.close()?);
            }
        }
        Ok(result)
    }

    pub fn close(&mut self) -> MarkupResult<String> {
        let tag = self.open.pop().ok_or(MarkupError::EmptyStack)?;
        Ok(format!("</{tag}>\n"))
    }

    pub fn close_to_depth(&mut self, depth: usize) -> MarkupResult<String> {
        let mut result = String::new();
        while self.depth() > depth {
            result.push_str(&self.close()?);
        }
        Ok(result)
    }
}
