use crate::extract::process_extract;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Milliseconds after which a page edit no longer counts as recent.
pub const ONE_DAY_MS: u64 = 24 * 60 * 60 * 1000;

pub const TYPE_GENERIC: &str = "generic";
pub const TYPE_EXTRACT: &str = "extract";

// Characters `wikiUrlencode` leaves readable in page paths.
const TITLE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b':')
    .remove(b'@')
    .remove(b'$')
    .remove(b',')
    .remove(b'/');

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LanguageDirection {
    #[default]
    Ltr,
    Rtl,
}

impl LanguageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageDirection::Ltr => "ltr",
            LanguageDirection::Rtl => "rtl",
        }
    }
}

impl fmt::Display for LanguageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language direction {0:?}, expected ltr or rtl")]
pub struct ParseDirectionError(String);

impl FromStr for LanguageDirection {
    type Err = ParseDirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ltr" => Ok(LanguageDirection::Ltr),
            "rtl" => Ok(LanguageDirection::Rtl),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Whether a preview has usable text or falls back to the minimal display.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewType {
    Generic,
    Extract,
}

impl PreviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewType::Generic => TYPE_GENERIC,
            PreviewType::Extract => TYPE_EXTRACT,
        }
    }
}

impl fmt::Display for PreviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page image as returned by the page summary API. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

/// Edit timestamp together with its recency at the time the model was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastModified {
    #[serde(rename = "lastModified")]
    pub timestamp_ms: u64,
    #[serde(rename = "isRecent")]
    pub is_recent: bool,
}

impl LastModified {
    pub fn at(timestamp_ms: u64, now_ms: u64) -> Self {
        Self {
            timestamp_ms,
            is_recent: now_ms.saturating_sub(timestamp_ms) < ONE_DAY_MS,
        }
    }
}

/// Source of "now" for recency checks.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

/// Display-ready preview of a page.
///
/// Built once per preview request and never mutated. The type is `Extract`
/// exactly when an extract survived normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewModel {
    title: String,
    url: String,
    language_code: String,
    language_direction: LanguageDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    extract: Option<String>,
    #[serde(rename = "type")]
    preview_type: PreviewType,
    #[serde(flatten)]
    last_modified: Option<LastModified>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Thumbnail>,
}

impl PreviewModel {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn language_direction(&self) -> LanguageDirection {
        self.language_direction
    }

    pub fn extract(&self) -> Option<&str> {
        self.extract.as_deref()
    }

    pub fn preview_type(&self) -> PreviewType {
        self.preview_type
    }

    pub fn last_modified(&self) -> Option<u64> {
        self.last_modified.map(|value| value.timestamp_ms)
    }

    /// `None` whenever `last_modified` is `None`.
    pub fn is_recent(&self) -> Option<bool> {
        self.last_modified.map(|value| value.is_recent)
    }

    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }
}

/// Collects raw page metadata and turns it into a [`PreviewModel`].
#[derive(Debug, Clone)]
pub struct PreviewModelBuilder {
    title: String,
    url: String,
    language_code: String,
    language_direction: LanguageDirection,
    extract: Option<String>,
    last_modified: Option<u64>,
    thumbnail: Option<Thumbnail>,
}

impl PreviewModelBuilder {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        language_code: impl Into<String>,
        language_direction: LanguageDirection,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            language_code: language_code.into(),
            language_direction,
            extract: None,
            last_modified: None,
            thumbnail: None,
        }
    }

    pub fn extract(mut self, extract: impl Into<String>) -> Self {
        self.extract = Some(extract.into());
        self
    }

    pub fn last_modified(mut self, timestamp_ms: u64) -> Self {
        self.last_modified = Some(timestamp_ms);
        self
    }

    pub fn thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn build(self) -> PreviewModel {
        self.build_with(&SystemClock)
    }

    pub fn build_with(self, clock: &impl Clock) -> PreviewModel {
        self.build_at(clock.now_ms())
    }

    pub fn build_at(self, now_ms: u64) -> PreviewModel {
        create_model(
            self.title,
            self.url,
            self.language_code,
            self.language_direction,
            self.extract.as_deref(),
            self.last_modified,
            self.thumbnail,
            now_ms,
        )
    }
}

/// Builds a preview model from raw page metadata.
///
/// `now_ms` is the time the preview is requested; it only matters when
/// `last_modified` is given.
#[allow(clippy::too_many_arguments)]
pub fn create_model(
    title: String,
    url: String,
    language_code: String,
    language_direction: LanguageDirection,
    extract: Option<&str>,
    last_modified: Option<u64>,
    thumbnail: Option<Thumbnail>,
    now_ms: u64,
) -> PreviewModel {
    let extract = process_extract(extract);
    let preview_type = if extract.is_some() {
        PreviewType::Extract
    } else {
        PreviewType::Generic
    };
    let last_modified = last_modified.map(|timestamp| LastModified::at(timestamp, now_ms));
    debug!(
        %title,
        preview_type = %preview_type,
        is_recent = ?last_modified.map(|value| value.is_recent),
        "created preview model"
    );
    PreviewModel {
        title,
        url,
        language_code,
        language_direction,
        extract,
        preview_type,
        last_modified,
        thumbnail,
    }
}

/// Article URL for `title` under `base_url`, encoded like MediaWiki page links.
pub fn canonical_url(base_url: &str, title: &str) -> String {
    let normalized = title.trim().replace(' ', "_");
    let encoded = utf8_percent_encode(&normalized, TITLE_ENCODE_SET);
    format!("{}/wiki/{}", base_url.trim_end_matches('/'), encoded)
}
