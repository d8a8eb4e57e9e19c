use std::collections::HashSet;

/// Identifier handed out when a heading yields nothing usable.
pub const FALLBACK_ID: &str = "id";

/// Registry of identifiers already emitted in one document.
#[derive(Debug, Default)]
pub struct IdentifierTable {
    reserved: HashSet<String>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `candidate` if it is unused, otherwise `candidate-N` for the
    /// smallest `N` that is. The returned value is reserved.
    pub fn unique_id(&mut self, candidate: &str) -> String {
        let mut id = candidate.to_string();
        let mut suffix = 1usize;
        while self.reserved.contains(&id) {
            id = format!("{candidate}-{suffix}");
            suffix += 1;
        }
        self.reserved.insert(id.clone());
        id
    }
}

/// Lowercase ASCII slug of `title`; runs of anything else collapse to `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_candidates_get_increasing_suffixes() {
        let mut table = IdentifierTable::new();
        assert_eq!(table.unique_id("release"), "release");
        assert_eq!(table.unique_id("release"), "release-1");
        assert_eq!(table.unique_id("release"), "release-2");
    }

    #[test]
    fn suffix_skips_identifiers_reserved_literally() {
        let mut table = IdentifierTable::new();
        table.unique_id("notes-1");
        table.unique_id("notes");
        assert_eq!(table.unique_id("notes"), "notes-2");
        assert_eq!(table.unique_id("notes-1"), "notes-1-1");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("The Grinder 3.0-beta!"), "the-grinder-3-0-beta");
        assert_eq!(slugify("  Notes  "), "notes");
        assert_eq!(slugify("***"), FALLBACK_ID);
    }
}
