//! A/B test bucketing for page previews.
//!
//! Users are assigned to a bucket by hashing the experiment name together with
//! a per-browser token. The token is generated once and kept in the host's
//! key-value storage so the assignment stays stable.

use crate::telemetry::generate_session_id;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const CONTROL_BUCKET: &str = "control";
/// Storage key holding the user's explicit "true"/"false" preference.
pub const ENABLED_STORAGE_KEY: &str = "mwe-popups-enabled";
pub const TOKEN_STORAGE_KEY: &str = "PopupsExperimentID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub weight: f64,
}

impl Bucket {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// 32-bit string hash shared with the browser-side bucketing code.
pub fn hash_string(value: &str) -> i32 {
    let units: Vec<u16> = value.encode_utf16().collect();
    units.iter().rev().fold(0i32, |hash, &unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Picks the bucket for `token`, or [`CONTROL_BUCKET`] when the experiment is
/// off or has no buckets.
pub fn get_bucket<'a>(config: &'a ExperimentConfig, token: &str) -> &'a str {
    if !config.enabled || config.buckets.is_empty() {
        return CONTROL_BUCKET;
    }
    let range: f64 = config.buckets.iter().map(|bucket| bucket.weight).sum();
    let hash = hash_string(&format!("{}:{}", config.name, token));
    let max = (f64::from(hash).abs() / f64::from(i32::MAX)) * range;
    let mut acc = 0.0;
    for bucket in &config.buckets {
        acc += bucket.weight;
        if max <= acc {
            return &bucket.name;
        }
    }
    CONTROL_BUCKET
}

/// Host-provided key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.write().remove(key);
    }
}

/// Decides whether page previews are shown to the current user.
pub struct PopupsExperiment<S> {
    config: Option<ExperimentConfig>,
    beta_feature_enabled: bool,
    store: S,
    token_source: fn() -> String,
}

impl<S: KeyValueStore> PopupsExperiment<S> {
    pub fn new(config: Option<ExperimentConfig>, beta_feature_enabled: bool, store: S) -> Self {
        Self {
            config,
            beta_feature_enabled,
            store,
            token_source: generate_session_id,
        }
    }

    pub fn with_token_source(mut self, token_source: fn() -> String) -> Self {
        self.token_source = token_source;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// An explicit preference in storage wins, then the beta feature flag,
    /// then the experiment bucket. Without an experiment the user is out.
    pub fn is_user_in_condition(&self) -> bool {
        match self.store.get(ENABLED_STORAGE_KEY).as_deref() {
            Some("true") => return true,
            Some("false") => return false,
            _ => {}
        }
        if self.beta_feature_enabled {
            return true;
        }
        let Some(config) = &self.config else {
            return false;
        };
        let token = self.user_token();
        let bucket = get_bucket(config, &token);
        debug!(experiment = %config.name, bucket, "bucketed user");
        bucket != CONTROL_BUCKET
    }

    /// Returns the stored experiment token, creating and saving one if needed.
    pub fn user_token(&self) -> String {
        if let Some(token) = self.store.get(TOKEN_STORAGE_KEY).filter(|t| !t.is_empty()) {
            return token;
        }
        let token = (self.token_source)();
        self.store.set(TOKEN_STORAGE_KEY, &token);
        token
    }
}
