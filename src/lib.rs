//! Page and reference previews: the model, text normalization, popup
//! rendering, pageview logging and A/B bucketing behind hover previews.

pub mod config;
pub mod experiment;
pub mod extract;
pub mod pageviews;
pub mod preview;
pub mod render;
pub mod telemetry;

pub use config::{ConfigError, Messages, PopupsConfig};
pub use experiment::{ExperimentConfig, KeyValueStore, MemoryStore, PopupsExperiment, get_bucket};
pub use extract::{process_extract, remove_ellipsis, remove_parentheticals};
pub use pageviews::{PageContext, PageviewStore, PageviewsListener, VirtualPageViewEvent};
pub use preview::{
    Clock, FixedClock, LanguageDirection, PreviewModel, PreviewModelBuilder, PreviewType,
    SystemClock, Thumbnail, create_model,
};
pub use render::{
    ReferencePreviewModel, RenderError, render_page_preview, render_popup,
    render_reference_preview,
};
pub use telemetry::{PageviewLog, generate_session_id};
