use crate::config::Messages;
use crate::preview::{PreviewModel, PreviewType, Thumbnail};
use askama::Template;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// Popup flavour, used for the `mwe-popups-type-*` class.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PopupKind {
    Generic,
    Extract,
    Reference,
}

impl PopupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PopupKind::Generic => "generic",
            PopupKind::Extract => "extract",
            PopupKind::Reference => "reference",
        }
    }
}

impl fmt::Display for PopupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PreviewType> for PopupKind {
    fn from(value: PreviewType) -> Self {
        match value {
            PreviewType::Generic => PopupKind::Generic,
            PreviewType::Extract => PopupKind::Extract,
        }
    }
}

/// Footnote shown in a reference preview. The extract is already rendered
/// reference markup and is inserted as is.
#[derive(Debug, Clone, Serialize)]
pub struct ReferencePreviewModel {
    pub title: Option<String>,
    pub url: String,
    pub extract_html: String,
}

/// Wraps a rendered preview body in the popup container.
pub fn render_popup(kind: PopupKind, body_html: &str) -> Result<String, RenderError> {
    let template = PopupTemplate {
        kind: kind.as_str(),
        body: body_html,
    };
    Ok(template.render()?)
}

pub fn render_page_preview(
    model: &PreviewModel,
    messages: &Messages,
) -> Result<String, RenderError> {
    let body = match model.extract() {
        Some(extract) => ExtractPreviewTemplate {
            url: model.url(),
            lang: model.language_code(),
            dir: model.language_direction().as_str(),
            extract,
            thumbnail: model.thumbnail(),
        }
        .render()?,
        None => GenericPreviewTemplate {
            title: model.title(),
            url: model.url(),
            no_preview: &messages.no_preview,
            go_to_page: &messages.go_to_page,
        }
        .render()?,
    };
    render_popup(PopupKind::from(model.preview_type()), &body)
}

pub fn render_reference_preview(
    model: &ReferencePreviewModel,
    messages: &Messages,
) -> Result<String, RenderError> {
    let body = ReferencePreviewTemplate {
        title: model
            .title
            .as_deref()
            .filter(|title| !title.is_empty())
            .unwrap_or(&messages.footnote),
        url: &model.url,
        extract_html: &model.extract_html,
        link_label: &messages.jump_to_reference,
    }
    .render()?;
    render_popup(PopupKind::Reference, &body)
}

#[derive(Template)]
#[template(
    source = r#"<div class='mwe-popups mwe-popups-type-{{ kind }}' role='tooltip' aria-hidden>
  <div class='mwe-popups-container'>{{ body|safe }}</div>
</div>"#,
    ext = "html"
)]
struct PopupTemplate<'a> {
    kind: &'a str,
    body: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"
{% if let Some(thumbnail) = thumbnail %}
<a href='{{ url }}' class='mwe-popups-discreet'>
  <img class='mwe-popups-thumbnail' src='{{ thumbnail.source }}' width='{{ thumbnail.width }}' height='{{ thumbnail.height }}' alt=''>
</a>
{% endif %}
<a dir='{{ dir }}' lang='{{ lang }}' class='mwe-popups-extract' href='{{ url }}'>{{ extract }}</a>
"#,
    ext = "html"
)]
struct ExtractPreviewTemplate<'a> {
    url: &'a str,
    lang: &'a str,
    dir: &'a str,
    extract: &'a str,
    thumbnail: Option<&'a Thumbnail>,
}

#[derive(Template)]
#[template(
    source = r#"
<strong class='mwe-popups-title'>{{ title }}</strong>
<a href='{{ url }}' class='mwe-popups-extract'>
  <span class='mwe-popups-message'>{{ no_preview }}</span>
</a>
<footer>
  <a href='{{ url }}' class='mwe-popups-read-link'>{{ go_to_page }}</a>
</footer>
"#,
    ext = "html"
)]
struct GenericPreviewTemplate<'a> {
    title: &'a str,
    url: &'a str,
    no_preview: &'a str,
    go_to_page: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"
<strong class='mwe-popups-title'>
  <span class='mw-ui-icon mw-ui-icon-element mw-ui-icon-preview-reference'></span>
  {{ title }}
</strong>
<div class='mwe-popups-extract'>
  <span class='mwe-popups-message'>{{ extract_html|safe }}</span>
</div>
<footer>
  <a href='{{ url }}' class='mwe-popups-read-link'>{{ link_label }}</a>
</footer>
"#,
    ext = "html"
)]
struct ReferencePreviewTemplate<'a> {
    title: &'a str,
    url: &'a str,
    extract_html: &'a str,
    link_label: &'a str,
}
