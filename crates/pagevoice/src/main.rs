use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagevoice_core::{Document, NodeId, RemoteReply, Section, Viewport};
use pagevoice_local::config::{self, GatewayConfig};
use pagevoice_local::openai_compat::OpenAiCompatClient;
use pagevoice_local::query::Intent;
use pagevoice_local::{
    controls, load_scan, match_query, scan, summarize, AudioEvent, Command, Reader,
    RecordingAudio, ScanOptions, ScanReport, StaticDocument, SummaryGateway,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "pagevoice")]
#[command(about = "Summarize web pages and read them aloud, headless (json on stdout)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan an HTML page into content sections (json).
    Scan(ScanCmd),
    /// Extractive summary of some text; `--remote` goes through the remote summarizer.
    Summarize(SummarizeCmd),
    /// Synthesize a short heading from some text.
    Heading(HeadingCmd),
    /// Find the section of a page that best answers a query (json).
    Query(QueryCmd),
    /// Replay reader commands against a page; prints audio events as json lines.
    Read(ReadCmd),
    /// Diagnose configuration issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    /// HTML file to load.
    #[arg(long)]
    html: PathBuf,
    /// Layout viewport, WIDTHxHEIGHT.
    #[arg(long, env = "PAGEVOICE_VIEWPORT", default_value = "1280x800")]
    viewport: Viewport,
    /// Extract prices and ratings into each section.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    offers: bool,
}

impl PageArgs {
    fn open(&self, extract_offers: bool) -> Result<(StaticDocument, ScanReport)> {
        let html = std::fs::read_to_string(&self.html)
            .with_context(|| format!("read {}", self.html.display()))?;
        let mut doc = StaticDocument::parse(&html, self.viewport);
        let report = scan(&mut doc, &ScanOptions { extract_offers });
        Ok((doc, report))
    }
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct TextInput {
    /// Read the text from this file.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Use this text directly.
    #[arg(long)]
    text: Option<String>,
}

impl TextInput {
    fn load(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(t), _) => Ok(t.clone()),
            (None, Some(p)) => {
                std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))
            }
            (None, None) => anyhow::bail!("one of --file or --text is required"),
        }
    }
}

#[derive(clap::Args, Debug)]
struct ScanCmd {
    #[command(flatten)]
    page: PageArgs,
}

#[derive(clap::Args, Debug)]
struct SummarizeCmd {
    #[command(flatten)]
    input: TextInput,
    /// Sentences to keep in the local summary.
    #[arg(long, default_value_t = summarize::DEFAULT_MAX_SENTENCES)]
    max_sentences: usize,
    /// Use the configured OpenAI-compatible summarizer (falls back to local on failure).
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    remote: bool,
    /// Never touch the network, even with `--remote`.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    offline: bool,
}

#[derive(clap::Args, Debug)]
struct HeadingCmd {
    #[command(flatten)]
    input: TextInput,
    #[arg(long, default_value_t = summarize::DEFAULT_HEADING_WORDS)]
    max_words: usize,
}

#[derive(clap::Args, Debug)]
struct QueryCmd {
    #[command(flatten)]
    page: PageArgs,
    /// Free-form query, e.g. "cheapest" or "opening hours".
    query: String,
}

#[derive(clap::Args, Debug)]
struct ReadCmd {
    #[command(flatten)]
    page: PageArgs,
    /// Reader command (repeatable, replayed in order).
    ///
    /// page-summary, priority-page-summary, play-pause, stop, resummarize, toggle-listen,
    /// priority:<high|medium|low>, query:<text>, hover:<section index>, control:<label>,
    /// key:<combo> (e.g. key:Shift+P), point:<css selector> (pointer enters the element).
    #[arg(long = "command", required = true)]
    commands: Vec<String>,
    /// Never touch the network.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    offline: bool,
    /// Print the final session snapshot after the replay.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    snapshot: bool,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Send one tiny request to the configured remote summarizer.
    ///
    /// Off by default: this is the only doctor check that uses the network.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    check_remote: bool,
    /// Timeout for the remote check (ms).
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn gateway_config(offline: bool) -> GatewayConfig {
    let mut cfg = GatewayConfig::from_env();
    cfg.offline |= offline;
    cfg
}

/// Turn one `--command` string into a reader command. `point:` needs the document.
fn resolve_command(raw: &str, doc: &StaticDocument, sections: &[Section]) -> Result<Command> {
    let Some(selector) = raw.trim().strip_prefix("point:") else {
        return raw.parse::<Command>().map_err(anyhow::Error::from);
    };
    let selector = selector.trim();
    let node = doc
        .select(selector)
        .into_iter()
        .next()
        .with_context(|| format!("no element matches {selector:?}"))?;
    if controls::is_interactive(doc, node) {
        return Ok(Command::AnnounceControl(controls::accessible_label(doc, node)));
    }
    let mut cur: Option<NodeId> = Some(node);
    while let Some(n) = cur {
        if let Some(s) = sections.iter().find(|s| s.owns(n)) {
            return Ok(Command::Hover(s.index));
        }
        cur = doc.parent(n);
    }
    anyhow::bail!("{selector:?} is not inside any content section")
}

fn print_events(events: Vec<AudioEvent>) -> Result<()> {
    for e in events {
        println!("{}", serde_json::to_string(&e)?);
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = config::env("PAGEVOICE_LOG")
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

async fn doctor(args: DoctorCmd) -> Result<serde_json::Value> {
    let t0 = std::time::Instant::now();
    let cfg = GatewayConfig::from_env();

    let mut checks: Vec<serde_json::Value> = Vec::new();

    let base_url = cfg.validated_base_url();
    let base_ok = base_url.is_ok();
    checks.push(serde_json::json!({
        "name": "base_url",
        "ok": base_ok,
        "message": match &base_url {
            Ok(_) => "base url is an absolute http(s) url".to_string(),
            Err(e) => e.to_string(),
        },
        "hint": if base_ok { "" } else { "Set PAGEVOICE_OPENAI_COMPAT_BASE_URL to an http(s) url." },
    }));

    let key_ok = cfg.has_api_key();
    checks.push(serde_json::json!({
        "name": "api_key",
        "ok": key_ok || cfg.offline,
        "message": if key_ok {
            "api key is set"
        } else {
            "no api key; summaries are local only"
        },
        "hint": if key_ok || cfg.offline {
            ""
        } else {
            "Set PAGEVOICE_OPENAI_COMPAT_API_KEY (or OPENAI_API_KEY), or PAGEVOICE_OFFLINE=1."
        },
    }));

    let mut remote_ok = true;
    let mut remote_skipped = true;
    let mut remote_error: Option<String> = None;
    let mut remote_elapsed_ms: Option<u128> = None;
    if args.check_remote && !cfg.offline {
        remote_skipped = false;
        let check_t0 = std::time::Instant::now();
        let mut probe_cfg = cfg.clone();
        probe_cfg.timeout_ms = Some(args.timeout_ms);
        let res = match OpenAiCompatClient::from_config(&probe_cfg) {
            Ok(client) => client
                .chat("Reply with the single word: ok", "ping", Some(5), Some(0.0))
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        remote_elapsed_ms = Some(check_t0.elapsed().as_millis());
        match res {
            Ok(RemoteReply::Completed(_)) => {}
            Ok(RemoteReply::Rejected { status, code }) => {
                remote_ok = false;
                remote_error = Some(format!(
                    "rejected: status={status} code={}",
                    code.as_deref().unwrap_or("-")
                ));
            }
            Err(e) => {
                remote_ok = false;
                remote_error = Some(e);
            }
        }
    }
    checks.push(serde_json::json!({
        "name": "remote_summarizer",
        "ok": remote_ok,
        "skipped": remote_skipped,
        "elapsed_ms": remote_elapsed_ms,
        "error": remote_error,
    }));

    Ok(serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "name": "pagevoice",
        "version": env!("CARGO_PKG_VERSION"),
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "llm": {
                "openai_compat": key_ok,
            },
            "offline": cfg.offline,
            "model": cfg.model,
            "timeout_ms": cfg.timeout_ms,
            "env_file": config::env("PAGEVOICE_ENV_FILE").is_some(),
        },
        "checks": checks,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional env-file loader (opt-in via PAGEVOICE_ENV_FILE). Never overrides the
    // process env and never logs values.
    if let Some(p) = config::env("PAGEVOICE_ENV_FILE") {
        if let Ok(txt) = std::fs::read_to_string(&p) {
            for raw in txt.lines() {
                let s = raw.trim();
                if s.is_empty() || s.starts_with('#') {
                    continue;
                }
                let Some((k, v)) = s.split_once('=') else {
                    continue;
                };
                let k = k.trim();
                let v = v.trim();
                if k.is_empty() {
                    continue;
                }
                if std::env::var_os(k).is_none() {
                    std::env::set_var(k, v);
                }
            }
        }
    }

    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let (_, report) = args.page.open(args.page.offers)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Summarize(args) => {
            let text = args.input.load()?;
            let max = args.max_sentences.max(1);
            if args.remote {
                let gateway =
                    SummaryGateway::from_config(&gateway_config(args.offline)).with_max_sentences(max);
                let summary = gateway.summarize(&text).await;
                println!(
                    "{}",
                    serde_json::json!({
                        "summary": summary,
                        "remote": true,
                        "backend": gateway.backend_name(),
                        "ai_enabled": gateway.is_enabled(),
                    })
                );
            } else {
                println!(
                    "{}",
                    serde_json::json!({
                        "summary": summarize::summarize(&text, max),
                        "remote": false,
                    })
                );
            }
        }
        Commands::Heading(args) => {
            let text = args.input.load()?;
            let heading = summarize::synthesize_heading(&text, args.max_words.max(1));
            println!("{}", serde_json::json!({ "heading": heading }));
        }
        Commands::Query(args) => {
            // Intent queries rank by price/rating, so they need offers extracted.
            let offers = args.page.offers || Intent::detect(&args.query).is_some();
            let (_, report) = args.page.open(offers)?;
            let v = match match_query(&report.sections, &args.query) {
                Some(m) => serde_json::json!({
                    "matched": true,
                    "match": m,
                    "intro": m.intro(),
                    "section": report.sections.get(m.index),
                }),
                None => serde_json::json!({ "matched": false }),
            };
            println!("{v}");
        }
        Commands::Read(args) => {
            let (doc, report) = args.page.open(args.page.offers)?;
            let audio = Arc::new(RecordingAudio::new());
            let gateway = SummaryGateway::from_config(&gateway_config(args.offline));
            let reader = Reader::new(gateway, audio.clone());
            load_scan(&reader, &doc, &report);
            for raw in &args.commands {
                let cmd = resolve_command(raw, &doc, &report.sections)
                    .with_context(|| format!("--command {raw:?}"))?;
                let outcome = reader.dispatch(cmd.clone()).await;
                println!(
                    "{}",
                    serde_json::json!({
                        "event": "command",
                        "command": cmd.to_string(),
                        "outcome": outcome,
                    })
                );
                print_events(audio.drain())?;
            }
            if args.snapshot {
                println!(
                    "{}",
                    serde_json::json!({ "event": "snapshot", "session": reader.snapshot() })
                );
            }
        }
        Commands::Doctor(args) => {
            let format = args.output.to_ascii_lowercase();
            let payload = doctor(args).await?;
            match format.as_str() {
                "text" => {
                    println!("pagevoice {}", env!("CARGO_PKG_VERSION"));
                    println!(
                        "configured: openai_compat={} offline={}",
                        payload["configured"]["llm"]["openai_compat"]
                            .as_bool()
                            .unwrap_or(false),
                        payload["configured"]["offline"].as_bool().unwrap_or(false),
                    );
                    println!("checks:");
                    if let Some(arr) = payload["checks"].as_array() {
                        for c in arr {
                            let name = c["name"].as_str().unwrap_or("?");
                            let ok = c["ok"].as_bool().unwrap_or(false);
                            let skipped = c["skipped"].as_bool().unwrap_or(false);
                            if skipped {
                                println!("- {name}: skipped");
                            } else {
                                println!("- {name}: {}", if ok { "ok" } else { "fail" });
                            }
                        }
                    }
                }
                _ => println!("{payload}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "pagevoice",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("pagevoice {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }

    Ok(())
}
