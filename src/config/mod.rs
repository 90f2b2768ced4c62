//! Configuration management.
//!
//! TOML-file-plus-environment-override configuration, following the
//! teacher's own `expand_env_vars`/`load_from_file`/`load_default` pattern:
//! a `ConfigFile` deserialization shadow with every field optional, merged
//! onto a fully-defaulted [`ChronographConfig`], then overridden by
//! `CHRONOGRAPH_<SECTION>_<FIELD>` environment variables.

use serde::Deserialize;
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use crate::embedding::RateLimiterConfig;
use crate::graph::DecayConfig;
use crate::pagination::CacheConfig;
use crate::search::{HybridConfig, MergeMethod};
use crate::storage::traits::vector::SimilarityFunction;
use crate::{Error, Result};

/// Expands environment variable references in a string.
///
/// Supports `${VAR_NAME}` syntax. If the variable is not set, the original
/// reference is preserved (e.g., `${MISSING_VAR}` stays as-is).
fn expand_env_vars(input: &str) -> Cow<'_, str> {
    if !input.contains("${") {
        return Cow::Borrowed(input);
    }

    let mut result = input.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        if let Some(var_end) = result[var_start..].find('}') {
            let var_end = var_start + var_end;
            let var_name = &result[var_start + 2..var_end];
            if let Ok(value) = std::env::var(var_name) {
                result.replace_range(var_start..=var_end, &value);
                start = var_start + value.len();
            } else {
                start = var_end + 1;
            }
        } else {
            break;
        }
    }

    Cow::Owned(result)
}

/// Storage backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// SQLite file path, or `"file::memory:"` for an in-memory database.
    pub uri: String,
    /// Username, for backends that require authentication (reserved).
    pub username: String,
    /// Password, for backends that require authentication (reserved).
    pub password: String,
    /// Database/schema name, for backends that support one (reserved).
    pub database: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { uri: "chronograph.sqlite3".to_string(), username: String::new(), password: String::new(), database: String::new() }
    }
}

/// Vector index settings.
#[derive(Debug, Clone)]
pub struct VectorConfig {
    /// Name of the vector index (used as the on-disk file stem).
    pub index_name: String,
    /// Embedding dimensionality; vectors of any other length are rejected.
    pub dimensions: usize,
    /// Similarity metric used for ranking.
    pub similarity_function: SimilarityFunction,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { index_name: "entity_embeddings".to_string(), dimensions: 384, similarity_function: SimilarityFunction::Cosine }
    }
}

/// Pagination limits.
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig {
    /// `limit`/`pageSize` used when the caller specifies neither.
    pub default_limit: usize,
    /// Hard ceiling on `limit`.
    pub max_limit: usize,
    /// Hard ceiling on `pageSize`.
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { default_limit: 20, max_limit: 200, max_page_size: 100 }
    }
}

/// Observability settings.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_level: String,
    /// `"json"` or `"pretty"`.
    pub log_format: crate::observability::LogFormat,
    /// Whether to install the Prometheus metrics recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), log_format: crate::observability::LogFormat::Json, metrics_enabled: true }
    }
}

/// Top-level chronograph configuration, assembled from defaults, an
/// optional TOML file, and environment overrides, in that order.
#[derive(Debug, Clone)]
pub struct ChronographConfig {
    /// Storage backend settings.
    pub backend: BackendConfig,
    /// Vector index settings.
    pub vector: VectorConfig,
    /// Confidence decay settings.
    pub decay: DecayConfig,
    /// Whether decay views are enabled at all.
    pub decay_enabled: bool,
    /// Embedding job rate limit.
    pub embedding_rate_limit: RateLimiterConfig,
    /// Pagination limits.
    pub pagination: PaginationConfig,
    /// Hybrid search fusion settings.
    pub hybrid: HybridConfig,
    /// Result cache settings.
    pub cache: CacheConfig,
    /// Logging/metrics settings.
    pub observability: ObservabilityConfig,
    /// Paths this configuration was loaded from, for diagnostics.
    pub config_sources: Vec<PathBuf>,
}

impl Default for ChronographConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            vector: VectorConfig::default(),
            decay: DecayConfig::default(),
            decay_enabled: true,
            embedding_rate_limit: RateLimiterConfig::default(),
            pagination: PaginationConfig::default(),
            hybrid: HybridConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
            config_sources: Vec::new(),
        }
    }
}

impl ChronographConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file, then applies environment
    /// overrides on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the file cannot be read or does
    /// not parse as valid TOML matching the expected schema.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let file = load_config_file(path)?;
        let mut config = Self::default();
        config.apply_config_file(file);
        config.config_sources.push(path.to_path_buf());
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from the default location
    /// (`~/.config/chronograph/config.toml`), falling back to defaults if
    /// no file is found there.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            let mut config = Self::default();
            config.apply_env_overrides();
            return config;
        };

        let config_dir = base_dirs.home_dir().join(".config").join("chronograph");
        let config_path = config_dir.join("config.toml");

        let mut config = Self::default();
        match load_config_file(&config_path) {
            Ok(file) => {
                config.apply_config_file(file);
                config.config_sources.push(config_path);
            },
            Err(error) => {
                tracing::debug!(path = %config_path.display(), %error, "no config file loaded, using defaults");
            },
        }

        config.apply_env_overrides();
        config
    }

    fn apply_config_file(&mut self, file: ConfigFile) {
        if let Some(backend) = file.backend {
            if let Some(uri) = backend.uri {
                self.backend.uri = expand_env_vars(&uri).into_owned();
            }
            if let Some(username) = backend.username {
                self.backend.username = username;
            }
            if let Some(password) = backend.password {
                self.backend.password = expand_env_vars(&password).into_owned();
            }
            if let Some(database) = backend.database {
                self.backend.database = database;
            }
        }
        if let Some(vector) = file.vector {
            if let Some(index_name) = vector.index_name {
                self.vector.index_name = index_name;
            }
            if let Some(dimensions) = vector.dimensions {
                self.vector.dimensions = dimensions;
            }
            if let Some(similarity_function) = vector.similarity_function {
                self.vector.similarity_function = parse_similarity_function(&similarity_function);
            }
        }
        if let Some(decay) = file.decay {
            if let Some(enabled) = decay.enabled {
                self.decay_enabled = enabled;
            }
            if let Some(half_life_days) = decay.half_life_days {
                self.decay.half_life_days = half_life_days;
            }
            if let Some(min_confidence) = decay.min_confidence {
                self.decay.min_confidence = min_confidence;
            }
        }
        if let Some(rate_limit) = file.embedding_rate_limit {
            if let Some(tokens) = rate_limit.tokens_per_interval {
                self.embedding_rate_limit.tokens_per_interval = tokens;
            }
            if let Some(interval_ms) = rate_limit.interval_ms {
                self.embedding_rate_limit.interval_ms = interval_ms;
            }
        }
        if let Some(pagination) = file.pagination {
            if let Some(default_limit) = pagination.default_limit {
                self.pagination.default_limit = default_limit;
            }
            if let Some(max_limit) = pagination.max_limit {
                self.pagination.max_limit = max_limit;
            }
            if let Some(max_page_size) = pagination.max_page_size {
                self.pagination.max_page_size = max_page_size;
            }
        }
        if let Some(hybrid) = file.hybrid {
            if let Some(graph_weight) = hybrid.graph_weight {
                self.hybrid.graph_weight = graph_weight;
            }
            if let Some(vector_weight) = hybrid.vector_weight {
                self.hybrid.vector_weight = vector_weight;
            }
            if let Some(deduplication) = hybrid.deduplication {
                self.hybrid.deduplication = deduplication;
            }
            if let Some(merge_method) = hybrid.merge_method {
                self.hybrid.merge_method = parse_merge_method(&merge_method);
            }
        }
        if let Some(cache) = file.cache {
            if let Some(max_size_bytes) = cache.max_size_bytes {
                self.cache.max_size_bytes = max_size_bytes;
            }
            if let Some(default_ttl_ms) = cache.default_ttl_ms {
                self.cache.default_ttl = Duration::from_millis(default_ttl_ms);
            }
        }
        if let Some(observability) = file.observability {
            if let Some(log_level) = observability.log_level {
                self.observability.log_level = log_level;
            }
            if let Some(log_format) = observability.log_format {
                self.observability.log_format = parse_log_format(&log_format);
            }
            if let Some(metrics_enabled) = observability.metrics_enabled {
                self.observability.metrics_enabled = metrics_enabled;
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CHRONOGRAPH_BACKEND_URI") {
            self.backend.uri = expand_env_vars(&v).into_owned();
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_VECTOR_DIMENSIONS")
            && let Ok(parsed) = v.parse()
        {
            self.vector.dimensions = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_DECAY_ENABLED")
            && let Ok(parsed) = v.parse()
        {
            self.decay_enabled = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_DECAY_HALF_LIFE_DAYS")
            && let Ok(parsed) = v.parse()
        {
            self.decay.half_life_days = parsed;
        }
        self.embedding_rate_limit = self.embedding_rate_limit.with_env_overrides();
        if let Ok(v) = std::env::var("CHRONOGRAPH_PAGINATION_DEFAULT_LIMIT")
            && let Ok(parsed) = v.parse()
        {
            self.pagination.default_limit = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_PAGINATION_MAX_LIMIT")
            && let Ok(parsed) = v.parse()
        {
            self.pagination.max_limit = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_HYBRID_GRAPH_WEIGHT")
            && let Ok(parsed) = v.parse()
        {
            self.hybrid.graph_weight = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_HYBRID_VECTOR_WEIGHT")
            && let Ok(parsed) = v.parse()
        {
            self.hybrid.vector_weight = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_HYBRID_MERGE_METHOD") {
            self.hybrid.merge_method = parse_merge_method(&v);
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_CACHE_MAX_SIZE_BYTES")
            && let Ok(parsed) = v.parse()
        {
            self.cache.max_size_bytes = parsed;
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_OBSERVABILITY_LOG_LEVEL") {
            self.observability.log_level = v;
        }
    }
}

fn parse_similarity_function(value: &str) -> SimilarityFunction {
    match value.to_lowercase().as_str() {
        "euclidean" => SimilarityFunction::Euclidean,
        _ => SimilarityFunction::Cosine,
    }
}

fn parse_merge_method(value: &str) -> MergeMethod {
    match value.to_lowercase().as_str() {
        "rrf" => MergeMethod::Rrf,
        _ => MergeMethod::Weighted,
    }
}

fn parse_log_format(value: &str) -> crate::observability::LogFormat {
    match value.to_lowercase().as_str() {
        "pretty" => crate::observability::LogFormat::Pretty,
        _ => crate::observability::LogFormat::Json,
    }
}

fn load_config_file(path: &std::path::Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::InvalidArgument(format!("cannot read config file {}: {e}", path.display())))?;
    toml::from_str(&contents).map_err(|e| Error::InvalidArgument(format!("cannot parse config file {}: {e}", path.display())))
}

/// TOML deserialization shadow of [`ChronographConfig`], every field
/// optional so a caller's file only needs to name what it overrides.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    backend: Option<BackendConfigFile>,
    vector: Option<VectorConfigFile>,
    decay: Option<DecayConfigFile>,
    embedding_rate_limit: Option<RateLimitConfigFile>,
    pagination: Option<PaginationConfigFile>,
    hybrid: Option<HybridConfigFile>,
    cache: Option<CacheConfigFile>,
    observability: Option<ObservabilityConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendConfigFile {
    uri: Option<String>,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VectorConfigFile {
    index_name: Option<String>,
    dimensions: Option<usize>,
    similarity_function: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DecayConfigFile {
    enabled: Option<bool>,
    half_life_days: Option<f64>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitConfigFile {
    tokens_per_interval: Option<u32>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaginationConfigFile {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    max_page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HybridConfigFile {
    graph_weight: Option<f32>,
    vector_weight: Option<f32>,
    deduplication: Option<bool>,
    merge_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheConfigFile {
    max_size_bytes: Option<usize>,
    default_ttl_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ObservabilityConfigFile {
    log_level: Option<String>,
    log_format: Option<String>,
    metrics_enabled: Option<bool>,
}
