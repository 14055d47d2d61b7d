use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use page_previews::experiment::{ENABLED_STORAGE_KEY, TOKEN_STORAGE_KEY};
use page_previews::preview::canonical_url;
use page_previews::{
    KeyValueStore, LanguageDirection, MemoryStore, PageContext, PageviewLog, PageviewStore,
    PageviewsListener, PopupsConfig, PopupsExperiment, PreviewModel, PreviewModelBuilder,
    ReferencePreviewModel, Thumbnail, get_bucket, process_extract, render_page_preview,
    render_reference_preview,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "popups", about = "Build, render and track page previews", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Path to a popups.toml configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize an extract the way previews display it.
    Extract {
        /// Raw extract text.
        text: String,
    },
    /// Build the preview model for a page.
    Preview(PageArgs),
    /// Render the HTML popup for a page.
    Render(PageArgs),
    /// Render the HTML popup for a footnote.
    Reference {
        /// Footnote title; defaults to the configured footnote label.
        #[arg(long)]
        title: Option<String>,
        /// Link target of the footnote.
        #[arg(long)]
        url: String,
        /// Rendered footnote markup.
        extract_html: String,
    },
    /// Show the experiment bucket a token falls into.
    Bucket {
        /// Experiment token to hash.
        token: String,
    },
    /// Decide whether previews are enabled for a user.
    Condition {
        /// Previously stored experiment token.
        #[arg(long)]
        token: Option<String>,
        /// Explicit preference stored by the user ("true" or "false").
        #[arg(long)]
        enabled: Option<bool>,
        /// Treat the beta feature as switched on.
        #[arg(long)]
        beta: bool,
    },
    /// Log a virtual pageview for a previewed page.
    Pageview {
        /// Title of the previewed page.
        page_title: String,
        /// Title of the page the reader is on.
        #[arg(long)]
        source_title: String,
        /// URL of the page the reader is on; derived from the title if omitted.
        #[arg(long)]
        source_url: Option<String>,
        #[arg(long, default_value_t = 0)]
        source_id: u64,
        #[arg(long, default_value_t = 0)]
        namespace: i32,
        /// JSON-lines file to append the event to; overrides the config.
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// Page title.
    #[arg(long)]
    title: String,
    /// Canonical page URL; derived from the configured base URL if omitted.
    #[arg(long)]
    url: Option<String>,
    #[arg(long, default_value = "en")]
    lang: String,
    #[arg(long, value_enum, default_value_t = LanguageDirection::Ltr)]
    dir: LanguageDirection,
    /// Raw extract text.
    #[arg(long)]
    extract: Option<String>,
    /// Last edit time in milliseconds since the Unix epoch.
    #[arg(long)]
    last_modified: Option<u64>,
    /// Override "now" (milliseconds since the Unix epoch).
    #[arg(long)]
    now: Option<u64>,
    /// Thumbnail image URL.
    #[arg(long)]
    thumbnail: Option<String>,
    #[arg(long, default_value_t = 0)]
    thumbnail_width: u32,
    #[arg(long, default_value_t = 0)]
    thumbnail_height: u32,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PopupsConfig::load(path)?,
        None => PopupsConfig::default(),
    };
    match cli.command {
        Command::Extract { text } => handle_extract(text, cli.json),
        Command::Preview(args) => handle_preview(args, &config, cli.json),
        Command::Render(args) => handle_render(args, &config),
        Command::Reference {
            title,
            url,
            extract_html,
        } => handle_reference(title, url, extract_html, &config),
        Command::Bucket { token } => handle_bucket(token, &config, cli.json),
        Command::Condition {
            token,
            enabled,
            beta,
        } => handle_condition(token, enabled, beta, config, cli.json),
        Command::Pageview {
            page_title,
            source_title,
            source_url,
            source_id,
            namespace,
            log,
        } => {
            let source_url =
                source_url.unwrap_or_else(|| canonical_url(&config.base_url, &source_title));
            let page = PageContext {
                namespace_id: namespace,
                id: source_id,
                title: source_title,
                url: source_url,
            };
            handle_pageview(page, page_title, log.or(config.pageview_log), cli.json)
        }
    }
}

fn handle_extract(text: String, as_json: bool) -> Result<(), Box<dyn Error>> {
    let processed = process_extract(Some(&text));
    if as_json {
        let payload = json!({ "raw": text, "extract": processed });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        match processed {
            Some(extract) => println!("{extract}"),
            None => println!("<no extract>"),
        }
    }
    Ok(())
}

fn handle_preview(
    args: PageArgs,
    config: &PopupsConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let model = build_model(args, config);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print_model(&model);
    }
    Ok(())
}

fn handle_render(args: PageArgs, config: &PopupsConfig) -> Result<(), Box<dyn Error>> {
    let model = build_model(args, config);
    println!("{}", render_page_preview(&model, &config.messages)?);
    Ok(())
}

fn handle_reference(
    title: Option<String>,
    url: String,
    extract_html: String,
    config: &PopupsConfig,
) -> Result<(), Box<dyn Error>> {
    let model = ReferencePreviewModel {
        title,
        url,
        extract_html,
    };
    println!("{}", render_reference_preview(&model, &config.messages)?);
    Ok(())
}

fn handle_bucket(
    token: String,
    config: &PopupsConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let experiment = config
        .experiment
        .as_ref()
        .ok_or("No [experiment] section configured")?;
    let bucket = get_bucket(experiment, &token);
    if as_json {
        let payload = json!({
            "experiment": experiment.name,
            "enabled": experiment.enabled,
            "token": token,
            "bucket": bucket,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{} / {token}: {bucket}", experiment.name);
    }
    Ok(())
}

fn handle_condition(
    token: Option<String>,
    enabled: Option<bool>,
    beta: bool,
    config: PopupsConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    if let Some(token) = &token {
        store.set(TOKEN_STORAGE_KEY, token);
    }
    if let Some(enabled) = enabled {
        store.set(ENABLED_STORAGE_KEY, &enabled.to_string());
    }
    let experiment = PopupsExperiment::new(
        config.experiment,
        config.beta_feature_enabled || beta,
        store,
    );
    let in_condition = experiment.is_user_in_condition();
    let token = experiment.store().get(TOKEN_STORAGE_KEY);
    if as_json {
        let payload = json!({ "in_condition": in_condition, "token": token });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let verdict = if in_condition { "enabled" } else { "disabled" };
        match token {
            Some(token) => println!("Previews {verdict} (token {token})"),
            None => println!("Previews {verdict}"),
        }
    }
    Ok(())
}

fn handle_pageview(
    page: PageContext,
    page_title: String,
    log_path: Option<PathBuf>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let log = match log_path {
        Some(path) => PageviewLog::persistent(path),
        None => PageviewLog::ephemeral(),
    };
    let store = PageviewStore::new(page);
    let listener = PageviewsListener::new(store.clone(), log.clone());
    let before = store.snapshot();
    store.queue_pageview(page_title);
    listener.on_change(Some(&before), &store.snapshot());

    let events = log.events();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        for tracked in &events {
            println!(
                "{}: {} (from {} #{})",
                tracked.topic,
                tracked.event.page_title,
                tracked.event.source_title,
                tracked.event.source_page_id
            );
        }
    }
    Ok(())
}

fn build_model(args: PageArgs, config: &PopupsConfig) -> PreviewModel {
    let url = args
        .url
        .unwrap_or_else(|| canonical_url(&config.base_url, &args.title));
    let mut builder = PreviewModelBuilder::new(args.title, url, args.lang, args.dir);
    if let Some(extract) = args.extract {
        builder = builder.extract(extract);
    }
    if let Some(last_modified) = args.last_modified {
        builder = builder.last_modified(last_modified);
    }
    if let Some(source) = args.thumbnail {
        builder = builder.thumbnail(Thumbnail {
            source,
            width: args.thumbnail_width,
            height: args.thumbnail_height,
        });
    }
    match args.now {
        Some(now) => builder.build_at(now),
        None => builder.build(),
    }
}

fn print_model(model: &PreviewModel) {
    println!("Preview: {} [{}]", model.title(), model.preview_type());
    println!("URL: {}", model.url());
    println!(
        "Language: {} ({})",
        model.language_code(),
        model.language_direction()
    );
    if let (Some(last_modified), Some(is_recent)) = (model.last_modified(), model.is_recent()) {
        let note = if is_recent { " (edited recently)" } else { "" };
        println!("Last modified: {last_modified}{note}");
    }
    if let Some(thumbnail) = model.thumbnail() {
        println!(
            "Thumbnail: {} ({}x{})",
            thumbnail.source, thumbnail.width, thumbnail.height
        );
    }
    match model.extract() {
        Some(extract) => render_markdown_block("Extract", extract),
        None => println!("\nNo extract available."),
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_previews::PreviewType;

    fn page_args(args: &[&str]) -> PageArgs {
        let mut argv = vec!["popups", "preview"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Preview(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preview_args_build_a_model() {
        let args = page_args(&[
            "--title",
            "Cat",
            "--extract",
            "The cat (Felis catus) is small...",
            "--last-modified",
            "1000",
            "--now",
            "2000",
            "--dir",
            "rtl",
        ]);
        let model = build_model(args, &PopupsConfig::default());
        assert_eq!(model.url(), "https://en.wikipedia.org/wiki/Cat");
        assert_eq!(model.extract(), Some("The cat is small"));
        assert_eq!(model.preview_type(), PreviewType::Extract);
        assert_eq!(model.language_direction(), LanguageDirection::Rtl);
        assert_eq!(model.is_recent(), Some(true));
    }

    #[test]
    fn explicit_url_wins_over_base_url() {
        let args = page_args(&["--title", "Cat", "--url", "https://example.org/Cat"]);
        let model = build_model(args, &PopupsConfig::default());
        assert_eq!(model.url(), "https://example.org/Cat");
        assert_eq!(model.preview_type(), PreviewType::Generic);
        assert_eq!(model.is_recent(), None);
    }

    #[test]
    fn thumbnail_flags_are_collected() {
        let args = page_args(&[
            "--title",
            "Cat",
            "--thumbnail",
            "https://upload.wikimedia.org/cat.jpg",
            "--thumbnail-width",
            "200",
            "--thumbnail-height",
            "150",
        ]);
        let model = build_model(args, &PopupsConfig::default());
        let thumbnail = model.thumbnail().unwrap();
        assert_eq!(thumbnail.width, 200);
        assert_eq!(thumbnail.height, 150);
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let result = Cli::try_parse_from(["popups", "preview", "--title", "Cat", "--dir", "up"]);
        assert!(result.is_err());
    }
}
