//! Configuration primitives and loader for changes-markup.
//!
//! Settings are resolved from layered `.changes-markup.toml` files:
//! override flag → working directory → git root → built-in defaults.
//! Every value remembers the layer it came from so validation errors can
//! point at the offending file.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use changes_markup::{
    ConvertOptions, Dialect, LinkOptions, ReleasePattern, TrackerLinks, DEFAULT_HEADING_MARKER,
    DEFAULT_PRODUCT, DEFAULT_ROOT_ELEMENT, DEFAULT_TAG_PREFIX,
};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".changes-markup.toml";

/// Characters that cannot serve as a heading marker: the list marker and the
/// characters rewritten by entity escaping.
const RESERVED_MARKERS: &[char] = &['-', '&', '<', '>'];

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub output: OutputSettings,
    pub links: LinkSettings,
    pub release: ReleaseSettings,
    pub sources: ConfigSources,
}

/// Shape of the generated document.
#[derive(Clone, Debug)]
pub struct OutputSettings {
    pub root_element: String,
    pub dialect: Dialect,
    pub heading_marker: char,
}

/// Hyperlink and issue-reference rewriting.
#[derive(Clone, Debug)]
pub struct LinkSettings {
    pub hyperlinks: bool,
    pub trackers: TrackerLinks,
}

/// Release tag lookup.
#[derive(Clone, Debug)]
pub struct ReleaseSettings {
    pub enabled: bool,
    pub product: String,
    pub tag_prefix: String,
    pub pattern: ReleasePattern,
}

impl Config {
    /// Options for one conversion built from these settings.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            root_element: self.output.root_element.clone(),
            dialect: self.output.dialect,
            heading_marker: self.output.heading_marker,
            links: LinkOptions {
                hyperlinks: self.links.hyperlinks,
                trackers: self.links.trackers.clone(),
            },
            release_pattern: self.release.pattern.clone(),
        }
    }

    /// Root of the enclosing git repository, if any.
    pub fn repository_root(&self) -> Option<PathBuf> {
        find_git_root(&self.sources.working_directory)
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn default() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default();
        let mut merged = defaults_layer(default_source.clone());
        let mut source_layers = vec![default_source];

        let git_root = find_git_root(&working_dir);
        let git_config_path = git_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            output: resolved.output,
            links: resolved.links,
            release: resolved.release,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let trackers = TrackerLinks::default();
    let located = |value: String| Some(Located::new(value, source.clone()));

    PartialConfig {
        output: OutputPartial {
            root_element: located(DEFAULT_ROOT_ELEMENT.into()),
            dialect: located(Dialect::default().to_string()),
            heading_marker: located(DEFAULT_HEADING_MARKER.to_string()),
        },
        links: LinksPartial {
            hyperlinks: Some(Located::new(true, source.clone())),
            bug_long: located(trackers.bug_long),
            bug_short: located(trackers.bug_short),
            request_long: located(trackers.request_long),
            request_short: located(trackers.request_short),
        },
        release: ReleasePartial {
            enabled: Some(Located::new(true, source.clone())),
            product: located(DEFAULT_PRODUCT.into()),
            tag_prefix: located(DEFAULT_TAG_PREFIX.into()),
            pattern: None,
        },
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

/// Replaces `target` when `other` carries a value.
fn overlay<T>(target: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *target = other;
    }
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    output: OutputPartial,
    links: LinksPartial,
    release: ReleasePartial,
}

#[derive(Clone, Debug, Default)]
struct OutputPartial {
    root_element: Option<Located<String>>,
    dialect: Option<Located<String>>,
    heading_marker: Option<Located<String>>,
}

#[derive(Clone, Debug, Default)]
struct LinksPartial {
    hyperlinks: Option<Located<bool>>,
    bug_long: Option<Located<String>>,
    bug_short: Option<Located<String>>,
    request_long: Option<Located<String>>,
    request_short: Option<Located<String>>,
}

#[derive(Clone, Debug, Default)]
struct ReleasePartial {
    enabled: Option<Located<bool>>,
    product: Option<Located<String>>,
    tag_prefix: Option<Located<String>>,
    pattern: Option<Located<String>>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        overlay(&mut self.output.root_element, other.output.root_element);
        overlay(&mut self.output.dialect, other.output.dialect);
        overlay(&mut self.output.heading_marker, other.output.heading_marker);

        overlay(&mut self.links.hyperlinks, other.links.hyperlinks);
        overlay(&mut self.links.bug_long, other.links.bug_long);
        overlay(&mut self.links.bug_short, other.links.bug_short);
        overlay(&mut self.links.request_long, other.links.request_long);
        overlay(&mut self.links.request_short, other.links.request_short);

        overlay(&mut self.release.enabled, other.release.enabled);
        overlay(&mut self.release.product, other.release.product);
        overlay(&mut self.release.tag_prefix, other.release.tag_prefix);
        overlay(&mut self.release.pattern, other.release.pattern);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let fallback = |value: &str| Located::new(value.to_string(), ConfigSource::default());

        let root_element = self
            .output
            .root_element
            .unwrap_or_else(|| fallback(DEFAULT_ROOT_ELEMENT));
        if !is_xml_name(&root_element.value) {
            errors.push(
                ConfigValidationError::new(
                    Some(root_element.source.clone()),
                    format!("'{}' is not a valid element name", root_element.value),
                )
                .with_context("output.root_element"),
            );
        }

        let dialect_loc = self
            .output
            .dialect
            .unwrap_or_else(|| fallback(Dialect::default().as_str()));
        let dialect = dialect_loc.value.parse::<Dialect>().unwrap_or_else(|_| {
            errors.push(
                ConfigValidationError::new(
                    Some(dialect_loc.source.clone()),
                    format!(
                        "unknown dialect '{}' (expected 'outline' or 'changes')",
                        dialect_loc.value
                    ),
                )
                .with_context("output.dialect"),
            );
            Dialect::default()
        });

        let marker_loc = self
            .output
            .heading_marker
            .unwrap_or_else(|| fallback(&DEFAULT_HEADING_MARKER.to_string()));
        let heading_marker = parse_marker(&marker_loc, &mut errors);

        let hyperlinks = self
            .links
            .hyperlinks
            .map(|located| located.value)
            .unwrap_or(true);

        let defaults = TrackerLinks::default();
        let trackers = TrackerLinks {
            bug_long: tracker_template(
                self.links.bug_long,
                "links.bug_long",
                defaults.bug_long,
                &mut errors,
            ),
            bug_short: tracker_template(
                self.links.bug_short,
                "links.bug_short",
                defaults.bug_short,
                &mut errors,
            ),
            request_long: tracker_template(
                self.links.request_long,
                "links.request_long",
                defaults.request_long,
                &mut errors,
            ),
            request_short: tracker_template(
                self.links.request_short,
                "links.request_short",
                defaults.request_short,
                &mut errors,
            ),
        };

        let enabled = self
            .release
            .enabled
            .map(|located| located.value)
            .unwrap_or(true);
        let product = self
            .release
            .product
            .unwrap_or_else(|| fallback(DEFAULT_PRODUCT));
        if product.value.trim().is_empty() {
            errors.push(
                ConfigValidationError::new(
                    Some(product.source.clone()),
                    "release.product cannot be empty".into(),
                )
                .with_context("release.product"),
            );
        }
        let tag_prefix = self
            .release
            .tag_prefix
            .map(|located| located.value)
            .unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_string());

        let pattern = match &self.release.pattern {
            Some(located) => ReleasePattern::from_regex(&located.value),
            None => ReleasePattern::for_product(product.value.trim()),
        };
        let pattern = pattern.unwrap_or_else(|err| {
            let source = self
                .release
                .pattern
                .as_ref()
                .map_or(product.source.clone(), |located| located.source.clone());
            errors.push(
                ConfigValidationError::new(Some(source), err.to_string())
                    .with_context("release.pattern"),
            );
            ReleasePattern::default()
        });

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            output: OutputSettings {
                root_element: root_element.value,
                dialect,
                heading_marker,
            },
            links: LinkSettings {
                hyperlinks,
                trackers,
            },
            release: ReleaseSettings {
                enabled,
                product: product.value,
                tag_prefix,
                pattern,
            },
        })
    }
}

fn parse_marker(located: &Located<String>, errors: &mut Vec<ConfigValidationError>) -> char {
    let mut chars = located.value.chars();
    match (chars.next(), chars.next()) {
        (Some(marker), None) if !marker.is_whitespace() && !RESERVED_MARKERS.contains(&marker) => {
            marker
        }
        _ => {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source.clone()),
                    format!(
                        "heading marker must be a single character other than whitespace, '-', '&', '<' or '>' (received '{}')",
                        located.value
                    ),
                )
                .with_context("output.heading_marker"),
            );
            DEFAULT_HEADING_MARKER
        }
    }
}

fn tracker_template(
    located: Option<Located<String>>,
    context: &str,
    default: String,
    errors: &mut Vec<ConfigValidationError>,
) -> String {
    let Some(located) = located else {
        return default;
    };
    if !located.value.contains("{id}") {
        errors.push(
            ConfigValidationError::new(
                Some(located.source.clone()),
                format!("template '{}' must contain '{{id}}'", located.value),
            )
            .with_context(context),
        );
    }
    located.value
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    output: OutputSettings,
    links: LinkSettings,
    release: ReleaseSettings,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    output: Option<RawOutput>,
    #[serde(default)]
    links: Option<RawLinks>,
    #[serde(default)]
    release: Option<RawRelease>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            output: self
                .output
                .map(|output| output.into_partial(&source))
                .unwrap_or_default(),
            links: self
                .links
                .map(|links| links.into_partial(&source))
                .unwrap_or_default(),
            release: self
                .release
                .map(|release| release.into_partial(&source))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    #[serde(default)]
    root_element: Option<String>,
    #[serde(default)]
    dialect: Option<String>,
    #[serde(default)]
    heading_marker: Option<String>,
}

impl RawOutput {
    fn into_partial(self, source: &ConfigSource) -> OutputPartial {
        OutputPartial {
            root_element: self.root_element.map(|value| Located::new(value, source.clone())),
            dialect: self.dialect.map(|value| Located::new(value, source.clone())),
            heading_marker: self
                .heading_marker
                .map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLinks {
    #[serde(default)]
    hyperlinks: Option<bool>,
    #[serde(default)]
    bug_long: Option<String>,
    #[serde(default)]
    bug_short: Option<String>,
    #[serde(default)]
    request_long: Option<String>,
    #[serde(default)]
    request_short: Option<String>,
}

impl RawLinks {
    fn into_partial(self, source: &ConfigSource) -> LinksPartial {
        LinksPartial {
            hyperlinks: self.hyperlinks.map(|value| Located::new(value, source.clone())),
            bug_long: self.bug_long.map(|value| Located::new(value, source.clone())),
            bug_short: self.bug_short.map(|value| Located::new(value, source.clone())),
            request_long: self
                .request_long
                .map(|value| Located::new(value, source.clone())),
            request_short: self
                .request_short
                .map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelease {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    tag_prefix: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
}

impl RawRelease {
    fn into_partial(self, source: &ConfigSource) -> ReleasePartial {
        ReleasePartial {
            enabled: self.enabled.map(|value| Located::new(value, source.clone())),
            product: self.product.map(|value| Located::new(value, source.clone())),
            tag_prefix: self.tag_prefix.map(|value| Located::new(value, source.clone())),
            pattern: self.pattern.map(|value| Located::new(value, source.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_names_are_checked() {
        assert!(is_xml_name("changes"));
        assert!(is_xml_name("_release-notes.v2"));
        assert!(!is_xml_name(""));
        assert!(!is_xml_name("2changes"));
        assert!(!is_xml_name("change log"));
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let mut base = defaults_layer(ConfigSource::default());
        let local = ConfigSource::for_file(ConfigSourceKind::Local, PathBuf::from("x.toml"));
        let raw: RawConfig = toml::from_str("[output]\ndialect = \"changes\"\n").unwrap();
        base.merge(raw.into_partial(local.clone()));

        let dialect = base.output.dialect.unwrap();
        assert_eq!(dialect.value, "changes");
        assert_eq!(dialect.source, local);
        assert_eq!(base.output.root_element.unwrap().value, DEFAULT_ROOT_ELEMENT);
    }
}
