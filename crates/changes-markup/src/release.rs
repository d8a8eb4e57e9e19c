//! Resolution of heading version strings to release tags and dates.

use chrono::NaiveDate;
use regex::Regex;
use std::path::PathBuf;
use std::process::Command;

use crate::error::MarkupResult;

pub const DEFAULT_PRODUCT: &str = "Grinder";
pub const DEFAULT_TAG_PREFIX: &str = "release_";

/// A release tag and, when known, the date it was cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
    pub date: Option<NaiveDate>,
}

impl Release {
    pub fn new(tag: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            tag: tag.into(),
            date,
        }
    }
}

/// Source of release metadata. A miss is `None`, never an error.
pub trait ReleaseLookup {
    fn lookup(&self, version: &str) -> Option<Release>;
}

impl<F> ReleaseLookup for F
where
    F: Fn(&str) -> Option<Release>,
{
    fn lookup(&self, version: &str) -> Option<Release> {
        self(version)
    }
}

/// Lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReleaseLookup;

impl ReleaseLookup for NoReleaseLookup {
    fn lookup(&self, _version: &str) -> Option<Release> {
        None
    }
}

/// Recognises "product version" headings.
#[derive(Debug, Clone)]
pub struct ReleasePattern {
    regex: Regex,
}

impl ReleasePattern {
    /// Matches any heading ending in `<product> <version>`.
    pub fn for_product(product: &str) -> MarkupResult<Self> {
        let regex = Regex::new(&format!(r"^.*{} (.*)$", regex::escape(product)))?;
        Ok(Self { regex })
    }

    /// Uses `pattern` directly; the first capture group is the version.
    pub fn from_regex(pattern: &str) -> MarkupResult<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn version<'t>(&self, title: &'t str) -> Option<&'t str> {
        let version = self.regex.captures(title)?.get(1)?.as_str().trim();
        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    }
}

impl Default for ReleasePattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(r"^.*Grinder (.*)$").expect("default release pattern compiles"),
        }
    }
}

/// Looks versions up as `<prefix><version>` tags in a git repository.
#[derive(Debug, Clone)]
pub struct GitTagLookup {
    repository: PathBuf,
    tag_prefix: String,
}

impl GitTagLookup {
    pub fn new(repository: impl Into<PathBuf>, tag_prefix: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag_prefix: tag_prefix.into(),
        }
    }

    fn find_tag(&self, version: &str) -> Option<String> {
        let name = format!("{}{}", self.tag_prefix, version);
        let output = self.git(&["tag", "-l", name.as_str()])?;
        output.lines().next().map(str::trim).map(str::to_string)
    }

    fn tag_date(&self, tag: &str) -> Option<NaiveDate> {
        let output = self.git(&["log", "-1", "--pretty=format:%ad", "--date=short", tag])?;
        match NaiveDate::parse_from_str(output.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(err) => {
                tracing::debug!("unparsable date {:?} for tag {tag}: {err}", output.trim());
                None
            }
        }
    }

    fn git(&self, args: &[&str]) -> Option<String> {
        let output = match Command::new("git")
            .args(args)
            .current_dir(&self.repository)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!("failed to run git {args:?}: {err}");
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!("git {args:?} exited with {}", output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            None
        } else {
            Some(stdout)
        }
    }
}

impl ReleaseLookup for GitTagLookup {
    fn lookup(&self, version: &str) -> Option<Release> {
        let tag = self
            .find_tag(version)
            .or_else(|| self.find_tag(&normalize_version(version)));

        let Some(tag) = tag else {
            tracing::debug!("no release tag for version {version}");
            return None;
        };

        let date = self.tag_date(&tag);
        tracing::debug!("version {version} resolved to tag {tag} ({date:?})");
        Some(Release { tag, date })
    }
}

/// `3.0-beta.1` becomes `3_0_beta_1`.
pub fn normalize_version(version: &str) -> String {
    version.replace(['.', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_pattern_extracts_trailing_version() {
        let pattern = ReleasePattern::for_product("Grinder").unwrap();
        assert_eq!(pattern.version("The Grinder 3.0-beta1"), Some("3.0-beta1"));
        assert_eq!(pattern.version("Grinder"), None);
        assert_eq!(pattern.version("Unrelated heading"), None);
    }

    #[test]
    fn product_names_are_matched_literally() {
        let pattern = ReleasePattern::for_product("C++").unwrap();
        assert_eq!(pattern.version("C++ 20"), Some("20"));
        assert_eq!(pattern.version("CCC 20"), None);
    }

    #[test]
    fn regex_pattern_uses_first_group() {
        let pattern = ReleasePattern::from_regex(r"^Release (\S+)").unwrap();
        assert_eq!(pattern.version("Release 1.0 (final)"), Some("1.0"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        assert!(ReleasePattern::from_regex("(").is_err());
    }

    #[test]
    fn normalizes_punctuation_to_underscores() {
        assert_eq!(normalize_version("3.0-beta.1"), "3_0_beta_1");
    }

    #[test]
    fn closures_act_as_lookups() {
        let lookup = |version: &str| (version == "1.0").then(|| Release::new("v1", None));
        assert_eq!(lookup.lookup("1.0"), Some(Release::new("v1", None)));
        assert_eq!(lookup.lookup("2.0"), None);
        assert_eq!(NoReleaseLookup.lookup("1.0"), None);
    }

    #[test]
    fn git_lookup_outside_a_repository_misses() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = GitTagLookup::new(dir.path(), DEFAULT_TAG_PREFIX);
        assert_eq!(lookup.lookup("1.0"), None);
    }
}
