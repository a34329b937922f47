//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use studiosync_core::{Assembler, Dispatch, Relay, Request, Response, SyncOrchestrator};
use studiosync_extractor::{ConversationExtractor, Dwell, HostPage, SnapshotPage, is_allowed_host};
use studiosync_feishu::FeishuClient;
use studiosync_shared::{
    AppConfig, FeishuSettings, Outcome, StudioSyncError, Transcript, config_file_path,
    init_config_at, load_config_or_default,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// StudioSync: copy AI Studio conversations into Feishu documents.
#[derive(Parser)]
#[command(
    name = "studiosync",
    version,
    about = "Extract AI Studio conversations and publish them as Feishu documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.studiosync/studiosync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract the conversation from a saved page.
    Extract {
        /// Saved HTML of the conversation page.
        #[arg(long)]
        page: PathBuf,

        /// Address the page was saved from (overrides its canonical link).
        #[arg(long)]
        url: Option<String>,

        /// Read turns as rendered, without activating reveal controls.
        #[arg(long)]
        no_reveal: bool,

        /// Write the transcript here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Publish a conversation as a new document.
    Sync {
        /// Saved HTML of the conversation page.
        #[arg(long, conflicts_with = "transcript", required_unless_present = "transcript")]
        page: Option<PathBuf>,

        /// A transcript previously written by `extract --out`.
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Address the page was saved from.
        #[arg(long)]
        url: Option<String>,
    },

    /// Serve relay requests as JSON lines on stdin/stdout.
    Serve {
        /// Saved HTML of the conversation page.
        #[arg(long)]
        page: PathBuf,

        /// Address the page was saved from.
        #[arg(long)]
        url: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "studiosync=info",
        1 => "studiosync=debug",
        _ => "studiosync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path()?,
    };

    match cli.command {
        Command::Extract {
            page,
            url,
            no_reveal,
            out,
        } => cmd_extract(&config_path, &page, url.as_deref(), no_reveal, out.as_deref()).await,
        Command::Sync {
            page,
            transcript,
            url,
        } => {
            cmd_sync(
                &config_path,
                page.as_deref(),
                transcript.as_deref(),
                url.as_deref(),
            )
            .await
        }
        Command::Serve { page, url } => cmd_serve(&config_path, &page, url.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&config_path),
            ConfigAction::Show => cmd_config_show(&config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Resolved sync settings, or `None` when not configured.
fn resolve_settings(config: &AppConfig) -> Option<FeishuSettings> {
    match config.feishu.settings() {
        Ok(settings) => Some(settings),
        Err(e) => {
            debug!(error = %e, "feishu settings unavailable");
            None
        }
    }
}

fn open_page(path: &Path, url: Option<&str>, config: &AppConfig) -> Result<SnapshotPage> {
    let html = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read page '{}'", path.display()))?;
    let url = url
        .map(|u| Url::parse(u).map_err(|e| eyre!("invalid URL '{u}': {e}")))
        .transpose()?;

    let page = SnapshotPage::parse(&html, url, &config.page)?;
    check_host(&page, &config.extractor.allowed_host)?;
    Ok(page)
}

/// Refuse pages known to come from another host.
fn check_host(page: &dyn HostPage, allowed_host: &str) -> Result<()> {
    match page.url() {
        Some(url) if !is_allowed_host(&url, allowed_host) => {
            warn!(%url, allowed_host, "page is not a conversation page");
            Err(eyre!("please open an {allowed_host} conversation"))
        }
        _ => Ok(()),
    }
}

fn build_relay(
    config: &AppConfig,
    page: SnapshotPage,
    settings: watch::Receiver<Option<FeishuSettings>>,
) -> Result<Relay> {
    let client = Arc::new(FeishuClient::from_config(&config.feishu)?);
    let assembler = Assembler::from_strategy(config.assembly.strategy, client.clone());
    let orchestrator = SyncOrchestrator::new(client.clone(), client, assembler);
    let extractor = ConversationExtractor::new(Dwell::from(&config.extractor));

    Ok(Relay::new(Arc::new(page), extractor, orchestrator, settings))
}

async fn extract_via(relay: &Relay, no_reveal: bool) -> Result<Transcript> {
    let request = if no_reveal {
        Request::GetConversationData
    } else {
        Request::ExtractData
    };

    match relay.send(request).await {
        Some(Response::Transcript(transcript)) => Ok(transcript),
        other => Err(eyre!("unexpected relay response: {other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract(
    config_path: &Path,
    page: &Path,
    url: Option<&str>,
    no_reveal: bool,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let page = open_page(page, url, &config)?;
    let (_tx, rx) = watch::channel(None);
    let relay = build_relay(&config, page, rx)?;

    let progress = CliProgress::new();
    progress.phase("Extracting conversation");
    let transcript = extract_via(&relay, no_reveal).await;
    progress.finish();
    let transcript = non_empty(transcript?)?;

    let json = serde_json::to_string_pretty(&transcript)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .wrap_err_with(|| format!("failed to write '{}'", path.display()))?;
            info!(path = %path.display(), turns = transcript.turns.len(), "transcript saved");
            println!(
                "Saved {} turns of \"{}\" to {}",
                transcript.turns.len(),
                transcript.title,
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn non_empty(transcript: Transcript) -> Result<Transcript> {
    if transcript.is_empty() {
        return Err(StudioSyncError::ExtractionEmpty.into());
    }
    Ok(transcript)
}

async fn cmd_sync(
    config_path: &Path,
    page: Option<&Path>,
    transcript: Option<&Path>,
    url: Option<&str>,
) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let (_tx, rx) = watch::channel(resolve_settings(&config));
    let progress = CliProgress::new();

    let (relay, transcript) = match (page, transcript) {
        (_, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read transcript '{}'", path.display()))?;
            let transcript = Transcript::from_json(&json)?;
            let empty = SnapshotPage::parse("", None, &config.page)?;
            (build_relay(&config, empty, rx)?, transcript)
        }
        (Some(path), None) => {
            let relay = build_relay(&config, open_page(path, url, &config)?, rx)?;
            progress.phase("Extracting conversation");
            let transcript = extract_via(&relay, false).await.and_then(non_empty);
            if transcript.is_err() {
                progress.finish();
            }
            (relay, transcript?)
        }
        (None, None) => return Err(eyre!("either --page or --transcript is required")),
    };

    progress.phase(&format!("Publishing \"{}\"", transcript.title));
    let response = relay
        .send(Request::UploadToFeishu { data: transcript })
        .await;
    progress.finish();

    match response {
        Some(Response::Outcome(Outcome { ok: true, .. })) => {
            println!("Published to Feishu.");
            Ok(())
        }
        Some(Response::Outcome(Outcome { reason, .. })) => {
            Err(eyre!(reason.unwrap_or_else(|| "sync failed".to_string())))
        }
        other => Err(eyre!("unexpected relay response: {other:?}")),
    }
}

async fn cmd_serve(config_path: &Path, page: &Path, url: Option<&str>) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let page = open_page(page, url, &config)?;
    let (tx, rx) = watch::channel(resolve_settings(&config));
    let relay = build_relay(&config, page, rx)?;

    info!("relay listening on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        // Pick up credential changes made while serving.
        match load_config_or_default(config_path) {
            Ok(config) => {
                tx.send_replace(resolve_settings(&config));
            }
            Err(e) => warn!(error = %e, "keeping previous settings"),
        }

        let reply = serve_line(&relay, &line).await;
        stdout.write_all(reply.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed, relay stopped");
    Ok(())
}

/// Handle one request line and build the reply line.
async fn serve_line(relay: &Relay, line: &str) -> Value {
    let mut message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "unparseable request line");
            return declined(None);
        }
    };

    let id = message.as_object_mut().and_then(|m| m.remove("id"));

    match relay.dispatch(message) {
        Dispatch::Pending(rx) => match rx.await {
            Ok(response) => tag_response(&response, id),
            Err(_) => {
                let outcome = Outcome::failure("relay handler stopped without a response");
                tag_response(&Response::Outcome(outcome), id)
            }
        },
        Dispatch::Declined => declined(id),
    }
}

fn declined(id: Option<Value>) -> Value {
    serde_json::json!({ "id": id, "declined": true })
}

/// Serialize `response`, echoing the request `id` when one was sent.
fn tag_response(response: &Response, id: Option<Value>) -> Value {
    let mut value = serde_json::to_value(response).unwrap_or(Value::Null);
    if let (Some(id), Some(map)) = (id, value.as_object_mut()) {
        map.insert("id".to_string(), id);
    }
    value
}

fn cmd_config_init(path: &Path) -> Result<()> {
    init_config_at(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: &Path) -> Result<()> {
    let config = load_config_or_default(path)?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("# {}", path.display());
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr while the relay works.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_sync_with_transcript() {
        let cli = Cli::try_parse_from([
            "studiosync",
            "sync",
            "--transcript",
            "chat.json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        match cli.command {
            Command::Sync {
                transcript, page, ..
            } => {
                assert_eq!(transcript, Some(PathBuf::from("chat.json")));
                assert!(page.is_none());
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn empty_extraction_is_reported_as_such() {
        let err = non_empty(Transcript::empty()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioSyncError>(),
            Some(StudioSyncError::ExtractionEmpty)
        ));
        assert!(err.to_string().contains("finished loading"));
    }

    #[test]
    fn sync_needs_a_source() {
        assert!(Cli::try_parse_from(["studiosync", "sync"]).is_err());
        assert!(
            Cli::try_parse_from([
                "studiosync",
                "sync",
                "--page",
                "a.html",
                "--transcript",
                "b.json"
            ])
            .is_err()
        );
    }

    #[test]
    fn tag_response_echoes_id() {
        let value = tag_response(&Response::Outcome(Outcome::success()), Some(json!(7)));
        assert_eq!(value, json!({"ok": true, "id": 7}));

        let value = tag_response(&Response::Outcome(Outcome::failure("upload failed")), None);
        assert_eq!(value, json!({"ok": false, "error": "upload failed"}));
    }

    #[test]
    fn declined_line_shape() {
        assert_eq!(declined(Some(json!("a"))), json!({"id": "a", "declined": true}));
        assert_eq!(declined(None), json!({"id": null, "declined": true}));
    }

    #[test]
    fn foreign_host_is_refused() {
        let page = SnapshotPage::parse(
            "<html></html>",
            Some(Url::parse("https://example.com/chat").unwrap()),
            &Default::default(),
        )
        .unwrap();
        let err = check_host(&page, "aistudio.google.com").unwrap_err();
        assert_eq!(
            err.to_string(),
            "please open an aistudio.google.com conversation"
        );

        let unknown = SnapshotPage::parse("<html></html>", None, &Default::default()).unwrap();
        assert!(check_host(&unknown, "aistudio.google.com").is_ok());
    }

    #[tokio::test]
    async fn serve_line_declines_unknown_and_answers_known() {
        let page = SnapshotPage::parse(
            r#"<h1>Saved</h1>
               <ms-chat-turn>
                 <div data-turn-role="User"></div>
                 <ms-autosize-textarea data-value="hello"></ms-autosize-textarea>
               </ms-chat-turn>"#,
            None,
            &Default::default(),
        )
        .unwrap();
        let (_tx, rx) = watch::channel(None);
        let relay = build_relay(&AppConfig::default(), page, rx).unwrap();

        let reply = serve_line(&relay, r#"{"type":"NOPE","id":1}"#).await;
        assert_eq!(reply, json!({"id": 1, "declined": true}));

        let reply = serve_line(&relay, "not json").await;
        assert_eq!(reply["declined"], true);

        let reply = serve_line(&relay, r#"{"type":"GET_CONVERSATION_DATA","id":"x"}"#).await;
        assert_eq!(reply["id"], "x");
        assert_eq!(reply["title"], "Saved");
        assert_eq!(reply["turns"][0]["content"], "hello");

        let upload = json!({
            "type": "UPLOAD_TO_FEISHU",
            "data": {"title": "t", "turns": [{"role": "user", "content": "hi"}], "extractedAt": 0}
        });
        let reply = serve_line(&relay, &upload.to_string()).await;
        assert_eq!(reply, json!({"ok": false, "error": "feishu is not configured"}));
    }
}
