//! Notebook client CLI
//!
//! Drives the client engine against a running notebook server: renders a
//! document with its comment markers, posts comments anchored to text and
//! saves edited content through the autosave path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notebook_client::anchor::AnchorResolver;
use notebook_client::annotations::PanelState;
use notebook_client::api::{DocumentApi, HttpApi};
use notebook_client::config::ClientConfig;
use notebook_client::html::TextSelection;
use notebook_client::notices::Notices;
use notebook_client::preferences::PreferenceStore;
use notebook_client::session::DocumentSession;

#[derive(Parser, Debug)]
#[command(name = "notebook-client")]
#[command(about = "Annotation and autosave client for the notebook server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a document's HTML with comment markers
    Render {
        document_id: String,
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Add a comment, optionally anchored to text in the document
    Comment {
        document_id: String,
        /// Comment text
        #[arg(short, long)]
        content: String,
        /// Document text to anchor the comment to
        #[arg(short, long)]
        anchor: Option<String>,
    },
    /// Replace a document's content and save it
    Save {
        document_id: String,
        /// File holding the new content
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Adjust the viewer font size
    Font { step: FontStep },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FontStep {
    Up,
    Down,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env();
    let cli = Cli::parse();

    tracing::debug!("API root: {}", config.api.api_root());
    let api: Arc<dyn DocumentApi> = Arc::new(HttpApi::new(&config.api));

    match cli.command {
        Command::Render {
            document_id,
            output,
        } => render(api, &document_id, config, output).await,
        Command::Comment {
            document_id,
            content,
            anchor,
        } => comment(api, &document_id, config, &content, anchor.as_deref()).await,
        Command::Save {
            document_id,
            file,
            title,
        } => save(api, &document_id, config, &file, title.as_deref()).await,
        Command::Font { step } => font(&config, step).await,
    }
}

async fn render(
    api: Arc<dyn DocumentApi>,
    document_id: &str,
    config: ClientConfig,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let prefs = PreferenceStore::load(&config.preferences_path).await;
    let mut session = DocumentSession::open(api, document_id, config).await?;

    match session.load_annotations().await {
        PanelState::Error { message } => tracing::warn!("{}", message),
        PanelState::Empty => tracing::info!("No comments"),
        panel => {
            for entry in panel.entries() {
                tracing::info!(
                    "[{}] {} {}: {}",
                    entry.author_initial,
                    entry.author,
                    entry.time_label,
                    entry.content
                );
            }
        }
    }

    let html = format!(
        "<div class=\"document-content\" style=\"font-size: {}\">{}</div>\n",
        prefs.get().font_size_css(),
        session.render()?
    );
    match output {
        Some(path) => tokio::fs::write(&path, html)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", html),
    }
    report(session.notices());
    Ok(())
}

async fn comment(
    api: Arc<dyn DocumentApi>,
    document_id: &str,
    config: ClientConfig,
    content: &str,
    anchor: Option<&str>,
) -> anyhow::Result<()> {
    let resolver = AnchorResolver::persistent(&config.anchors);
    let mut session = DocumentSession::open(api, document_id, config).await?;

    if let Some(anchor) = anchor {
        let found = resolver
            .resolve(anchor, session.rendered())
            .found()
            .copied()
            .with_context(|| format!("{:?} does not occur in the document", anchor))?;
        let range = TextSelection::within_run(found.run, found.start, found.end);
        if !session.comment_on_selection(range) {
            anyhow::bail!("nothing to anchor to");
        }
    }

    session.set_comment_input(content);
    let result = session.submit_comment().await;
    report(session.notices());
    result?;

    println!("{} comment(s) on {}", session.panel().count(), document_id);
    Ok(())
}

async fn save(
    api: Arc<dyn DocumentApi>,
    document_id: &str,
    config: ClientConfig,
    file: &Path,
    title: Option<&str>,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let session = DocumentSession::open(api, document_id, config).await?;

    let editor = session.editor();
    if let Some(title) = title {
        editor.set_title(title);
    }
    editor.set_content(&content);
    let stats = editor.buffer().stats();

    let result = editor.complete().await;
    report(session.notices());
    result?;

    println!("Saved {} ({} words, {} characters)", document_id, stats.words, stats.chars);
    Ok(())
}

async fn font(config: &ClientConfig, step: FontStep) -> anyhow::Result<()> {
    let mut prefs = PreferenceStore::load(&config.preferences_path).await;
    let size = match step {
        FontStep::Up => prefs.get_mut().increase_font(),
        FontStep::Down => prefs.get_mut().decrease_font(),
    };
    prefs.save().await?;
    println!("{}%", size);
    Ok(())
}

fn report(notices: &Notices) {
    for notice in notices.drain() {
        eprintln!("{:?}: {}", notice.kind, notice.message);
    }
}
