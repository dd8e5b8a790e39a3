//! Configuration resolution.
//!
//! Every setting is resolved once, at construction, in this order:
//!
//! 1. the explicit value in [`StoreOptions`], if present
//! 2. the environment variable `<prefix><KEY>`, if set and non-blank
//! 3. the built-in default
//!
//! The result is validated into an immutable [`ResolvedConfig`]. Nothing
//! reads the environment after that.
//!
//! | Key | Default |
//! |-----|---------|
//! | `COLLECTION_NAME` | `refinire_documents` |
//! | `PERSIST_DIRECTORY` | unset (in-memory) |
//! | `DISTANCE_METRIC` | `cosine` |
//! | `BATCH_SIZE` | `100` |
//! | `MAX_RETRIES` | `3` |
//! | `AUTO_CREATE_COLLECTION` | `true` |
//! | `AUTO_CLEAR_ON_INIT` | `false` |

use crate::error::{Error, Result};
use crate::store::DocumentStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::DistanceMetric;
use tempfile::NamedTempFile;
use tracing::debug;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "REFINIRE_RAG_STRATA_";

/// Default collection name
pub const DEFAULT_COLLECTION_NAME: &str = "refinire_documents";
/// Default distance metric
pub const DEFAULT_DISTANCE_METRIC: DistanceMetric = DistanceMetric::Cosine;
/// Default insert chunk size
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default retry budget
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Create the collection when it does not exist
pub const DEFAULT_AUTO_CREATE_COLLECTION: bool = true;
/// Wipe the collection on construction
pub const DEFAULT_AUTO_CLEAR_ON_INIT: bool = false;

/// Environment key suffixes
pub mod keys {
    /// Collection name
    pub const COLLECTION_NAME: &str = "COLLECTION_NAME";
    /// Persist directory
    pub const PERSIST_DIRECTORY: &str = "PERSIST_DIRECTORY";
    /// Distance metric
    pub const DISTANCE_METRIC: &str = "DISTANCE_METRIC";
    /// Insert chunk size
    pub const BATCH_SIZE: &str = "BATCH_SIZE";
    /// Retry budget
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
    /// Auto-create flag
    pub const AUTO_CREATE_COLLECTION: &str = "AUTO_CREATE_COLLECTION";
    /// Auto-clear flag
    pub const AUTO_CLEAR_ON_INIT: &str = "AUTO_CLEAR_ON_INIT";

    /// All key suffixes
    pub const ALL: [&str; 7] = [
        COLLECTION_NAME,
        PERSIST_DIRECTORY,
        DISTANCE_METRIC,
        BATCH_SIZE,
        MAX_RETRIES,
        AUTO_CREATE_COLLECTION,
        AUTO_CLEAR_ON_INIT,
    ];
}

// ============================================================================
// Environment sources
// ============================================================================

/// Source of environment variables
///
/// The process environment in production; a map in tests.
pub trait EnvSource {
    /// Look up a variable by its full name
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ============================================================================
// Explicit options
// ============================================================================

/// Explicit construction parameters
///
/// Every field is optional; unset fields fall back to the environment and
/// then to the defaults.
///
/// # Example
///
/// ```ignore
/// let store = StoreOptions::new()
///     .collection_name("papers")
///     .distance_metric("l2")
///     .persist_directory("./vectors")
///     .open()?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOptions {
    collection_name: Option<String>,
    persist_directory: Option<PathBuf>,
    distance_metric: Option<String>,
    batch_size: Option<usize>,
    max_retries: Option<u32>,
    auto_create_collection: Option<bool>,
    auto_clear_on_init: Option<bool>,
}

impl StoreOptions {
    /// Options with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection name
    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Set the persist directory. An empty path counts as unset.
    pub fn persist_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.persist_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the distance metric by name (`cosine`, `l2`, `ip`)
    pub fn distance_metric(mut self, metric: impl Into<String>) -> Self {
        self.distance_metric = Some(metric.into());
        self
    }

    /// Set the distance metric
    pub fn metric(self, metric: DistanceMetric) -> Self {
        self.distance_metric(metric.as_str())
    }

    /// Set the insert chunk size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the retry budget
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Create the collection if it does not exist
    pub fn auto_create_collection(mut self, enabled: bool) -> Self {
        self.auto_create_collection = Some(enabled);
        self
    }

    /// Clear the collection during construction
    pub fn auto_clear_on_init(mut self, enabled: bool) -> Self {
        self.auto_clear_on_init = Some(enabled);
        self
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        ConfigResolver::new(&ProcessEnv).resolve(self)
    }

    /// Resolve against the process environment and open the store
    pub fn open(self) -> Result<DocumentStore> {
        DocumentStore::from_config(self.resolve()?)
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Validated, immutable settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// Collection name (non-empty)
    pub collection_name: String,
    /// Storage directory; `None` means in-memory
    pub persist_directory: Option<PathBuf>,
    /// Metric used when the collection is created
    pub distance_metric: DistanceMetric,
    /// Insert chunk size (> 0)
    pub batch_size: usize,
    /// Retry budget for callers wrapping store operations; the store
    /// itself never retries
    pub max_retries: u32,
    /// Create the collection when missing
    pub auto_create_collection: bool,
    /// Clear the collection during construction
    pub auto_clear_on_init: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            persist_directory: None,
            distance_metric: DEFAULT_DISTANCE_METRIC,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            auto_create_collection: DEFAULT_AUTO_CREATE_COLLECTION,
            auto_clear_on_init: DEFAULT_AUTO_CLEAR_ON_INIT,
        }
    }
}

impl ResolvedConfig {
    /// True when nothing is written to disk
    pub fn is_in_memory(&self) -> bool {
        self.persist_directory.is_none()
    }
}

/// Resolves [`StoreOptions`] against an [`EnvSource`]
pub struct ConfigResolver<'a> {
    env: &'a dyn EnvSource,
    prefix: String,
}

impl<'a> ConfigResolver<'a> {
    /// Resolver using the default prefix
    pub fn new(env: &'a dyn EnvSource) -> Self {
        ConfigResolver {
            env,
            prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Full variable name for a key suffix
    pub fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Non-blank environment value for a key suffix
    fn env(&self, key: &str) -> Option<String> {
        let name = self.env_key(key);
        let value = self.env.var(&name)?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            debug!(variable = %name, value, "Using environment value");
            Some(value.to_string())
        }
    }

    /// Resolve and validate
    ///
    /// Creates the persist directory if it does not exist.
    ///
    /// ## Errors
    /// - `InvalidConfig` naming the first setting that fails validation
    pub fn resolve(&self, options: &StoreOptions) -> Result<ResolvedConfig> {
        let collection_name = match &options.collection_name {
            Some(name) => name.clone(),
            None => self
                .env(keys::COLLECTION_NAME)
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
        };
        let collection_name = validate_collection_name(&collection_name)?;

        let persist_directory = match options
            .persist_directory
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
        {
            Some(dir) => Some(dir.clone()),
            None => self.env(keys::PERSIST_DIRECTORY).map(PathBuf::from),
        };
        let persist_directory = persist_directory
            .map(|dir| prepare_persist_directory(&dir))
            .transpose()?;

        let distance_metric = match options
            .distance_metric
            .clone()
            .or_else(|| self.env(keys::DISTANCE_METRIC))
        {
            Some(raw) => parse_distance_metric(&raw)?,
            None => DEFAULT_DISTANCE_METRIC,
        };

        let batch_size = match options.batch_size {
            Some(size) => size,
            None => match self.env(keys::BATCH_SIZE) {
                Some(raw) => parse_usize("batch_size", &raw)?,
                None => DEFAULT_BATCH_SIZE,
            },
        };
        if batch_size == 0 {
            return Err(Error::config("batch_size", "must be greater than 0, got 0"));
        }

        let max_retries = match options.max_retries {
            Some(retries) => retries,
            None => match self.env(keys::MAX_RETRIES) {
                Some(raw) => parse_u32("max_retries", &raw)?,
                None => DEFAULT_MAX_RETRIES,
            },
        };

        let auto_create_collection = match options.auto_create_collection {
            Some(flag) => flag,
            None => match self.env(keys::AUTO_CREATE_COLLECTION) {
                Some(raw) => parse_bool("auto_create_collection", &raw)?,
                None => DEFAULT_AUTO_CREATE_COLLECTION,
            },
        };

        let auto_clear_on_init = match options.auto_clear_on_init {
            Some(flag) => flag,
            None => match self.env(keys::AUTO_CLEAR_ON_INIT) {
                Some(raw) => parse_bool("auto_clear_on_init", &raw)?,
                None => DEFAULT_AUTO_CLEAR_ON_INIT,
            },
        };

        Ok(ResolvedConfig {
            collection_name,
            persist_directory,
            distance_metric,
            batch_size,
            max_retries,
            auto_create_collection,
            auto_clear_on_init,
        })
    }
}

// ============================================================================
// Parsers and validators
// ============================================================================

/// Parse a boolean-like string
///
/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`/empty,
/// case-insensitively and ignoring surrounding whitespace.
///
/// ## Errors
/// - `InvalidConfig` for anything else
pub fn parse_bool(field: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::config(
            field,
            format!("expected a boolean (true/false/1/0/yes/no/on/off), got '{raw}'"),
        )),
    }
}

/// Parse a distance metric name
pub fn parse_distance_metric(raw: &str) -> Result<DistanceMetric> {
    DistanceMetric::parse(raw).ok_or_else(|| {
        Error::config(
            "distance_metric",
            format!("expected one of cosine, l2, ip; got '{raw}'"),
        )
    })
}

fn parse_integer(field: &'static str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::config(field, format!("expected an integer, got '{raw}'")))
}

fn parse_usize(field: &'static str, raw: &str) -> Result<usize> {
    let value = parse_integer(field, raw)?;
    if value <= 0 {
        return Err(Error::config(
            field,
            format!("must be greater than 0, got {value}"),
        ));
    }
    usize::try_from(value).map_err(|_| Error::config(field, format!("{value} is too large")))
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32> {
    let value = parse_integer(field, raw)?;
    if value < 0 {
        return Err(Error::config(
            field,
            format!("must be 0 or greater, got {value}"),
        ));
    }
    u32::try_from(value).map_err(|_| Error::config(field, format!("{value} is too large")))
}

fn validate_collection_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::config("collection_name", "cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Make sure `dir` is a writable directory, creating it if missing
fn prepare_persist_directory(dir: &Path) -> Result<PathBuf> {
    let display = dir.display();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::config(
                "persist_directory",
                format!("{display} exists and is not a directory"),
            ));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| {
            Error::config(
                "persist_directory",
                format!("cannot create {display}: {e}"),
            )
        })?;
        debug!(path = %dir.display(), "Created persist directory");
    }

    // Mode bits alone miss ownership, mount flags and ACLs
    NamedTempFile::new_in(dir).map_err(|e| {
        Error::config(
            "persist_directory",
            format!("{display} is not writable: {e}"),
        )
    })?;
    Ok(dir.to_path_buf())
}
