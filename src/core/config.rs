//! Scan configuration: raw input shapes, normalization, and env overrides.
//!
//! A raw configuration arrives in one of three shapes (a single path, a list of
//! paths, or an options object) and is normalized once into a [`ScanConfig`].
//! Traversal code only ever sees the normalized form.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{FeedError, Result};
use crate::scanner::patterns::PathMatcher;

/// A value that may be given either bare or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Object kinds a scan may be asked to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalOption {
    Files,
    Dirs,
    Symlinks,
}

impl RetrievalOption {
    pub const ALL: [Self; 3] = [Self::Files, Self::Dirs, Self::Symlinks];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Dirs => "dirs",
            Self::Symlinks => "symlinks",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for RetrievalOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `recursion` as written by the user: a boolean or a depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRecursion {
    Enabled(bool),
    Depth(i64),
}

/// Options-object form of the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawOptions {
    pub path: Option<OneOrMany<PathBuf>>,
    pub mask: Option<String>,
    pub regexp: Option<String>,
    pub recursion: Option<RawRecursion>,
    pub retrieve: Option<OneOrMany<RetrievalOption>>,
}

/// Raw configuration exactly as supplied: a path, a list of paths, or options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConfig {
    Path(PathBuf),
    Paths(Vec<PathBuf>),
    Options(RawOptions),
}

impl From<RawConfig> for RawOptions {
    fn from(raw: RawConfig) -> Self {
        match raw {
            RawConfig::Path(path) => Self {
                path: Some(OneOrMany::One(path)),
                ..Self::default()
            },
            RawConfig::Paths(paths) => Self {
                path: Some(OneOrMany::Many(paths)),
                ..Self::default()
            },
            RawConfig::Options(options) => options,
        }
    }
}

impl RawConfig {
    /// Parse a raw configuration from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Convert an already-parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a raw configuration from TOML text (options form only).
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let options: RawOptions = toml::from_str(raw)?;
        Ok(Self::Options(options))
    }

    /// Load a configuration file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FeedError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| FeedError::io(path, source))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
    }
}

impl RawOptions {
    /// Apply `FSFEED_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(env_var)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FSFEED_MASK") {
            self.mask = Some(raw);
        }
        if let Some(raw) = lookup("FSFEED_REGEXP") {
            self.regexp = Some(raw);
        }
        if let Some(raw) = lookup("FSFEED_RECURSION") {
            self.recursion = Some(parse_recursion("FSFEED_RECURSION", &raw)?);
        }
        if let Some(raw) = lookup("FSFEED_RETRIEVE") {
            self.retrieve = Some(OneOrMany::Many(parse_retrieve_list(
                "FSFEED_RETRIEVE",
                &raw,
            )?));
        }
        Ok(())
    }
}

/// How deep below each root a scan descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "depth")]
pub enum Recursion {
    /// Immediate children of each root only.
    #[default]
    Disabled,
    /// No depth limit.
    Unbounded,
    /// Objects at most `N` levels below the root.
    Bounded(usize),
}

impl Recursion {
    /// Absolute depth bound for a root of `base_depth` segments.
    ///
    /// `None` means unbounded. `Bounded(0)` behaves like `Disabled`.
    pub fn max_depth(self, base_depth: usize) -> Option<usize> {
        match self {
            Self::Disabled => Some(base_depth + 1),
            Self::Unbounded => None,
            Self::Bounded(levels) => Some(base_depth + levels.max(1)),
        }
    }

    /// Depth below the root past which traversal need not descend.
    pub fn walk_limit(self) -> Option<usize> {
        match self {
            Self::Disabled => Some(1),
            Self::Unbounded => None,
            Self::Bounded(levels) => Some(levels.max(1)),
        }
    }
}

impl TryFrom<RawRecursion> for Recursion {
    type Error = FeedError;

    fn try_from(raw: RawRecursion) -> Result<Self> {
        match raw {
            RawRecursion::Enabled(true) => Ok(Self::Unbounded),
            RawRecursion::Enabled(false) | RawRecursion::Depth(0) => Ok(Self::Disabled),
            RawRecursion::Depth(depth) => usize::try_from(depth)
                .map(Self::Bounded)
                .map_err(|_| FeedError::InvalidConfig {
                    details: format!("recursion must be a boolean or a depth >= 0, got {depth}"),
                }),
        }
    }
}

impl fmt::Display for Recursion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Unbounded => f.write_str("unbounded"),
            Self::Bounded(levels) => write!(f, "{levels} level(s)"),
        }
    }
}

/// Which object kinds a scan emits. All three flags are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetrieveSet {
    pub files: bool,
    pub dirs: bool,
    pub symlinks: bool,
}

impl RetrieveSet {
    pub const fn all() -> Self {
        Self {
            files: true,
            dirs: true,
            symlinks: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            files: false,
            dirs: false,
            symlinks: false,
        }
    }

    pub fn from_options(options: impl IntoIterator<Item = RetrievalOption>) -> Self {
        options
            .into_iter()
            .fold(Self::none(), |set, option| set.with(option))
    }

    #[must_use]
    pub const fn with(mut self, option: RetrievalOption) -> Self {
        match option {
            RetrievalOption::Files => self.files = true,
            RetrievalOption::Dirs => self.dirs = true,
            RetrievalOption::Symlinks => self.symlinks = true,
        }
        self
    }

    pub const fn contains(self, option: RetrievalOption) -> bool {
        match option {
            RetrievalOption::Files => self.files,
            RetrievalOption::Dirs => self.dirs,
            RetrievalOption::Symlinks => self.symlinks,
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.files || self.dirs || self.symlinks)
    }
}

impl Default for RetrieveSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Fully-resolved, immutable scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub matcher: PathMatcher,
    pub recursion: Recursion,
    pub retrieve: RetrieveSet,
}

impl ScanConfig {
    /// Configuration that scans `roots` with every default applied.
    pub fn for_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            matcher: PathMatcher::any(),
            recursion: Recursion::default(),
            retrieve: RetrieveSet::default(),
        }
    }

    /// Normalize a raw configuration.
    ///
    /// A mask takes precedence over a regexp. With neither, every path matches.
    pub fn from_raw(raw: impl Into<RawOptions>) -> Result<Self> {
        let options: RawOptions = raw.into();

        let roots = options
            .path
            .map(OneOrMany::into_vec)
            .ok_or_else(|| FeedError::InvalidConfig {
                details: "path is required".to_string(),
            })?;
        if roots.is_empty() {
            return Err(FeedError::InvalidConfig {
                details: "path must name at least one directory".to_string(),
            });
        }
        if roots.iter().any(|root| root.as_os_str().is_empty()) {
            return Err(FeedError::InvalidConfig {
                details: "path entries must not be empty".to_string(),
            });
        }

        let matcher = match (options.mask.as_deref(), options.regexp.as_deref()) {
            (Some(mask), _) if !mask.is_empty() => PathMatcher::from_mask(mask)?,
            (_, Some(regexp)) => PathMatcher::from_regex(regexp)?,
            _ => PathMatcher::any(),
        };

        let recursion = options
            .recursion
            .map_or(Ok(Recursion::Disabled), Recursion::try_from)?;

        let retrieve = match options.retrieve {
            None => RetrieveSet::all(),
            Some(requested) => {
                let requested = requested.into_vec();
                if requested.is_empty() {
                    return Err(FeedError::InvalidConfig {
                        details: "retrieve must name at least one of files, dirs, symlinks"
                            .to_string(),
                    });
                }
                RetrieveSet::from_options(requested)
            }
        };

        Ok(Self {
            roots,
            matcher,
            recursion,
            retrieve,
        })
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: PathMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_recursion(mut self, recursion: Recursion) -> Self {
        self.recursion = recursion;
        self
    }

    #[must_use]
    pub fn with_retrieve(mut self, retrieve: RetrieveSet) -> Self {
        self.retrieve = retrieve;
        self
    }
}

impl TryFrom<RawConfig> for ScanConfig {
    type Error = FeedError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        Self::from_raw(raw)
    }
}

/// Per-invocation switches supplied by the caller, not by the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Surface each produced entry on the diagnostics channel as well.
    pub test_mode: bool,
}

/// Parse `true`/`false`/integer recursion text (CLI flags and env vars).
pub fn parse_recursion(name: &str, raw: &str) -> Result<RawRecursion> {
    let trimmed = raw.trim();
    if let Ok(enabled) = trimmed.parse::<bool>() {
        return Ok(RawRecursion::Enabled(enabled));
    }
    trimmed
        .parse::<i64>()
        .map(RawRecursion::Depth)
        .map_err(|error| FeedError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

/// Parse a comma-separated retrieval list such as `files,dirs`.
pub fn parse_retrieve_list(name: &str, raw: &str) -> Result<Vec<RetrievalOption>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            RetrievalOption::parse(part).ok_or_else(|| FeedError::ConfigParse {
                context: "env",
                details: format!(
                    "{name}={raw:?}: unknown retrieval option {:?} (expected files, dirs, symlinks)",
                    part.trim()
                ),
            })
        })
        .collect()
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn normalize(value: serde_json::Value) -> Result<ScanConfig> {
        ScanConfig::from_raw(RawConfig::from_json_value(value)?)
    }

    #[test]
    fn bare_path_gets_all_defaults() {
        let cfg = normalize(json!("/storage/movies")).unwrap();
        assert_eq!(cfg.roots, vec![PathBuf::from("/storage/movies")]);
        assert_eq!(cfg.recursion, Recursion::Disabled);
        assert_eq!(cfg.retrieve, RetrieveSet::all());
        assert!(cfg.matcher.is_match_all());
    }

    #[test]
    fn list_of_paths_preserves_order_and_duplicates() {
        let cfg = normalize(json!(["/b", "/a", "/b"])).unwrap();
        assert_eq!(
            cfg.roots,
            vec![PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn options_object_with_single_path() {
        let cfg = normalize(json!({
            "path": "/storage/tv",
            "regexp": ".*\\.(avi|mkv)$",
            "recursion": 2,
            "retrieve": "files",
        }))
        .unwrap();
        assert_eq!(cfg.roots, vec![PathBuf::from("/storage/tv")]);
        assert_eq!(cfg.recursion, Recursion::Bounded(2));
        assert_eq!(
            cfg.retrieve,
            RetrieveSet::from_options([RetrievalOption::Files])
        );
        assert!(cfg.matcher.is_match("/storage/tv/Show.MKV"));
        assert!(!cfg.matcher.is_match("/storage/tv/show.srt"));
    }

    #[test]
    fn mask_takes_precedence_over_regexp() {
        let cfg = normalize(json!({
            "path": "/x",
            "mask": "*.avi",
            "regexp": ".*\\.mkv",
        }))
        .unwrap();
        assert_eq!(cfg.matcher.source(), Some("*.avi"));
        assert!(cfg.matcher.is_match("/x/a.avi"));
        assert!(!cfg.matcher.is_match("/x/a.mkv"));
    }

    #[test]
    fn empty_mask_falls_back_to_regexp() {
        let cfg = normalize(json!({"path": "/x", "mask": "", "regexp": ".*\\.mkv"})).unwrap();
        assert_eq!(cfg.matcher.source(), Some(".*\\.mkv"));
    }

    #[test]
    fn recursion_booleans_and_depths() {
        let cases = [
            (json!(true), Recursion::Unbounded),
            (json!(false), Recursion::Disabled),
            (json!(0), Recursion::Disabled),
            (json!(3), Recursion::Bounded(3)),
        ];
        for (raw, expected) in cases {
            let cfg = normalize(json!({"path": "/x", "recursion": raw})).unwrap();
            assert_eq!(cfg.recursion, expected);
        }
    }

    #[test]
    fn negative_recursion_rejected() {
        let err = normalize(json!({"path": "/x", "recursion": -1})).unwrap_err();
        assert_eq!(err.code(), "FSF-1001");
        assert!(err.to_string().contains("recursion"));
    }

    #[test]
    fn missing_path_rejected() {
        let err = normalize(json!({"mask": "*.avi"})).unwrap_err();
        match err {
            FeedError::InvalidConfig { details } => assert!(details.contains("path")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_path_list_rejected() {
        let err = normalize(json!([])).unwrap_err();
        assert_eq!(err.code(), "FSF-1001");
        let err = normalize(json!({"path": ""})).unwrap_err();
        assert_eq!(err.code(), "FSF-1001");
    }

    #[test]
    fn invalid_regexp_rejected() {
        let err = normalize(json!({"path": "/x", "regexp": "([unclosed"})).unwrap_err();
        assert_eq!(err.code(), "FSF-1002");
    }

    #[test]
    fn unknown_fields_and_retrieval_options_rejected() {
        assert!(RawConfig::from_json_value(json!({"path": "/x", "depth": 3})).is_err());
        assert!(RawConfig::from_json_value(json!({"path": "/x", "retrieve": ["sockets"]})).is_err());
    }

    #[test]
    fn empty_retrieve_list_rejected() {
        let err = normalize(json!({"path": "/x", "retrieve": []})).unwrap_err();
        assert!(err.to_string().contains("retrieve"));
    }

    #[test]
    fn max_depth_arithmetic() {
        assert_eq!(Recursion::Disabled.max_depth(3), Some(4));
        assert_eq!(Recursion::Unbounded.max_depth(3), None);
        assert_eq!(Recursion::Bounded(2).max_depth(3), Some(5));
        assert_eq!(
            Recursion::Bounded(0).max_depth(3),
            Recursion::Disabled.max_depth(3)
        );
    }

    #[test]
    fn toml_options_parse() {
        let raw = RawConfig::from_toml_str(
            r#"
path = ["/storage/movies", "/storage/tv"]
mask = "*.mkv"
recursion = true
retrieve = ["files", "dirs"]
"#,
        )
        .unwrap();
        let cfg = ScanConfig::try_from(raw).unwrap();
        assert_eq!(cfg.roots.len(), 2);
        assert_eq!(cfg.recursion, Recursion::Unbounded);
        assert!(cfg.retrieve.files && cfg.retrieve.dirs && !cfg.retrieve.symlinks);
    }

    #[test]
    fn load_returns_error_for_missing_file() {
        let err = RawConfig::load(Path::new("/nonexistent/fsfeed/config.toml")).unwrap_err();
        assert!(matches!(err, FeedError::MissingConfig { .. }));
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("find.json");
        fs::write(&json_path, r#"["/a", "/b"]"#).unwrap();
        assert_eq!(
            RawConfig::load(&json_path).unwrap(),
            RawConfig::Paths(vec![PathBuf::from("/a"), PathBuf::from("/b")])
        );

        let toml_path = dir.path().join("find.toml");
        fs::write(&toml_path, "path = \"/a\"\nrecursion = 1\n").unwrap();
        let cfg = ScanConfig::try_from(RawConfig::load(&toml_path).unwrap()).unwrap();
        assert_eq!(cfg.recursion, Recursion::Bounded(1));
    }

    #[test]
    fn env_overrides_apply_on_top_of_raw_options() {
        let mut options = RawOptions::from(RawConfig::Path(PathBuf::from("/x")));
        let overrides = vars(&[
            ("FSFEED_MASK", "*.avi"),
            ("FSFEED_RECURSION", "true"),
            ("FSFEED_RETRIEVE", "files, symlinks"),
        ]);
        options
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");

        let cfg = ScanConfig::from_raw(options).unwrap();
        assert_eq!(cfg.matcher.source(), Some("*.avi"));
        assert_eq!(cfg.recursion, Recursion::Unbounded);
        assert!(cfg.retrieve.files && cfg.retrieve.symlinks && !cfg.retrieve.dirs);
    }

    #[test]
    fn env_invalid_values_rejected() {
        let mut options = RawOptions::default();
        let overrides = vars(&[("FSFEED_RECURSION", "deep")]);
        let err = options
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid recursion should fail");
        match err {
            FeedError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("FSFEED_RECURSION"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let overrides = vars(&[("FSFEED_RETRIEVE", "files,pipes")]);
        assert!(
            options
                .apply_env_overrides_from(|name| overrides.get(name).cloned())
                .is_err()
        );
    }
}
