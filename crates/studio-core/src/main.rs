use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use studio_chroma::{ChromaKeyParams, KeyColor};
use studio_core::{init_tracing, Studio, StudioConfig};
use studio_webhook::WebhookPayload;

fn cli() -> Command {
    Command::new("studio")
        .version(studio_core::VERSION)
        .about("Content studio webhook and image tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to studio.toml (defaults apply when omitted)"),
        )
        .subcommand(
            Command::new("chroma")
                .about("Key out a solid-color matte and write a PNG")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Source image"),
                )
                .arg(
                    Arg::new("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Destination PNG"),
                )
                .arg(
                    Arg::new("key-color")
                        .long("key-color")
                        .value_parser(value_parser!(KeyColor))
                        .help("Matte color, e.g. #FF00FF (overrides config)"),
                )
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .value_parser(value_parser!(f64))
                        .help("RGB distance of the hard-key zone (overrides config)"),
                ),
        )
        .subcommand(
            Command::new("errors")
                .about("Inspect the durable error log")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("Print persisted entries as JSON")
                        .arg(
                            Arg::new("session")
                                .long("session")
                                .help("Only entries for this session id"),
                        ),
                )
                .subcommand(Command::new("stats").about("Print aggregate statistics as JSON"))
                .subcommand(
                    Command::new("clear")
                        .about("Delete persisted entries")
                        .arg(
                            Arg::new("session")
                                .long("session")
                                .help("Only clear this session id"),
                        ),
                ),
        )
        .subcommand(
            Command::new("send")
                .about("Send a payload JSON file to its webhook")
                .arg(
                    Arg::new("payload")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Payload JSON with a `type` field"),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .help("Session id for log correlation (random when omitted)"),
                )
                .arg(
                    Arg::new("image-out")
                        .long("image-out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the returned image (keyed if requested) to this file"),
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .action(ArgAction::SetTrue)
                        .help("Do not print the response"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StudioConfig::default(),
    };
    init_tracing(&config.logging)?;

    let studio = Studio::start(config).context("starting studio")?;
    let outcome = match matches.subcommand() {
        Some(("chroma", args)) => run_chroma(&studio, args),
        Some(("errors", args)) => run_errors(&studio, args),
        Some(("send", args)) => run_send(&studio, args).await,
        _ => Ok(()),
    };
    studio.shutdown();
    outcome
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(id)
        .with_context(|| format!("missing argument `{id}`"))
}

fn run_chroma(studio: &Studio, args: &ArgMatches) -> Result<()> {
    let input = required(args, "input")?;
    let output = required(args, "output")?;

    let configured = studio.keyer().params();
    let params = ChromaKeyParams::new(
        args.get_one::<KeyColor>("key-color")
            .copied()
            .unwrap_or(configured.key_color),
        args.get_one::<f64>("tolerance")
            .copied()
            .unwrap_or(configured.tolerance),
    )?;

    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let png = studio.keyer().with_params(params).apply_bytes(&bytes)?;
    std::fs::write(output, png).with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "Wrote keyed image"
    );
    Ok(())
}

fn run_errors(studio: &Studio, args: &ArgMatches) -> Result<()> {
    let diagnostics = studio.diagnostics();
    if studio.config().diagnostics.store_dir.is_none() {
        tracing::warn!("No [diagnostics] store_dir configured, the error log is empty");
    }

    match args.subcommand() {
        Some(("list", sub)) => {
            let mut entries = diagnostics.persisted_errors()?;
            if let Some(session) = sub.get_one::<String>("session") {
                entries.retain(|e| &e.session_id == session);
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Some(("stats", _)) => {
            let stats = diagnostics.persisted_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Some(("clear", sub)) => match sub.get_one::<String>("session") {
            Some(session) => diagnostics.clear_session(session),
            None => diagnostics.clear(),
        },
        Some((other, _)) => bail!("unknown errors subcommand `{other}`"),
        None => bail!("missing errors subcommand"),
    }
    Ok(())
}

async fn run_send(studio: &Studio, args: &ArgMatches) -> Result<()> {
    let path = required(args, "payload")?;
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let payload: WebhookPayload =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let session = args
        .get_one::<String>("session")
        .cloned()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let shutdown = studio.shutdown_token().clone();
    studio
        .diagnostics()
        .spawn_monitored("ctrl-c", async move {
            tokio::signal::ctrl_c().await?;
            tracing::warn!("Interrupt received, cancelling");
            shutdown.cancel();
            Ok::<_, std::io::Error>(())
        });

    let generation = studio
        .generate(&payload, &session)
        .await
        .with_context(|| format!("sending {} payload (session {session})", payload.kind()))?;

    if let (Some(out), Some(image)) = (args.get_one::<PathBuf>("image-out"), &generation.image) {
        let bytes = STANDARD
            .decode(image.data.trim())
            .context("decoding returned image")?;
        std::fs::write(out, bytes).with_context(|| format!("writing {}", out.display()))?;
        tracing::info!(path = %out.display(), keyed = image.keyed, "Wrote returned image");
    }

    if !args.get_flag("quiet") {
        println!("{}", serde_json::to_string_pretty(&generation.response)?);
    }
    Ok(())
}
