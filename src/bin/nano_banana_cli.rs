//! nano-banana-cli: Nano Banana 生图与批量处理命令行工具
//!
//! Usage:
//!   nano-banana-cli generate --prompt <text> --out <file> [OPTIONS]
//!   nano-banana-cli batch --prompts <file> --folder <dir> [OPTIONS]
//!   nano-banana-cli nodes [--locale <en|zh-CN>]

use anyhow::{anyhow, bail, Context};
use nano_banana_nodes::batch::{LoggingProgressSink, ProgressSink, ProgressUpdate, StopSignal};
use nano_banana_nodes::config::ClientConfig;
use nano_banana_nodes::nodes::{node_registry, BatchProcessorNode, TextToImageNode};
use nano_banana_nodes::presets::GenerationCatalog;
use nano_banana_nodes::resilience::PacingConfig;
use nano_banana_nodes::Locale;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "generate" => cmd_generate(&args[2..]).await,
        "batch" => cmd_batch(&args[2..]).await,
        "nodes" => cmd_nodes(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("nano-banana-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"nano-banana-cli: Nano Banana 命令行工具

USAGE:
    nano-banana-cli <COMMAND> [OPTIONS]

COMMANDS:
    generate    Generate one image from a prompt
    batch       Run every prompt against every image of a folder
    nodes       Print the node registry as JSON
    version     Show version information
    help        Show this help message

OPTIONS:
    --prompt <text>         Prompt (generate)
    --out <file>            Output file (generate)
    --prompts <file>        Prompt file, one prompt per line (batch)
    --folder <dir>          Input image folder (batch)
    --pattern <globs>       Comma-separated file patterns [default: *.png,*.jpg,*.jpeg]
    --output <dir>          Save batch results here
    --model <id>            nano-banana-pro-svip | nano-banana-svip
    --aspect <ratio>        1:1, 16:9, ...
    --size <tier>           1K | 2K | 4K
    --seed <n>              -1 for random
    --interval <secs>       Base interval between requests [default: 3]
    --config <file>         YAML client configuration
    --locale <tag>          en | zh-CN

ENVIRONMENT:
    NANO_BANANA_API_KEY     API key
    NANO_BANANA_NETWORK     direct | global | domestic
    NANO_BANANA_PROXY_URL   HTTP proxy
    RUST_LOG                Log filter [default: info]"#
    );
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn required<'a>(args: &'a [String], name: &str) -> anyhow::Result<&'a str> {
    flag(args, name).ok_or_else(|| anyhow!("missing required option {name}"))
}

fn load_config(args: &[String]) -> anyhow::Result<ClientConfig> {
    let base = match flag(args, "--config") {
        Some(path) => ClientConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ClientConfig::default(),
    };
    let mut config = base.merge_env()?;
    if let Some(locale) = flag(args, "--locale") {
        config.locale = locale.parse().map_err(|e: String| anyhow!(e))?;
    }
    Ok(config)
}

fn parse_seed(args: &[String]) -> anyhow::Result<i64> {
    flag(args, "--seed")
        .map(|s| s.parse::<i64>().with_context(|| format!("invalid seed: {s}")))
        .transpose()
        .map(|seed| seed.unwrap_or(-1))
}

async fn cmd_generate(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let node = TextToImageNode::new(GenerationCatalog::standard());
    let mut input = node.default_input(required(args, "--prompt")?);
    if let Some(model) = flag(args, "--model") {
        input.model = model.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(ratio) = flag(args, "--aspect") {
        input.aspect_ratio = ratio.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(size) = flag(args, "--size") {
        input.resolution = size.parse().map_err(|e: String| anyhow!(e))?;
    }
    input.seed = parse_seed(args)?;

    let image = node.run(&config, &input).await?;
    let out = PathBuf::from(required(args, "--out")?);
    std::fs::write(&out, &image.data).with_context(|| format!("writing {}", out.display()))?;
    println!("Saved {} ({} bytes)", out.display(), image.data.len());
    Ok(())
}

async fn cmd_batch(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let locale = config.locale;

    let prompts_path = required(args, "--prompts")?;
    let prompts = std::fs::read_to_string(prompts_path)
        .with_context(|| format!("reading prompts from {prompts_path}"))?;

    let mut pacing = PacingConfig::default();
    if let Some(secs) = flag(args, "--interval") {
        let secs: f64 = secs.parse().with_context(|| format!("invalid interval: {secs}"))?;
        if !secs.is_finite() || secs < 0.0 {
            bail!("invalid interval: {secs}");
        }
        pacing = pacing.with_base_interval(Duration::from_secs_f64(secs));
    }

    let node = BatchProcessorNode::new(GenerationCatalog::standard(), pacing);
    let mut input = node.default_input(prompts, required(args, "--folder")?);
    if let Some(pattern) = flag(args, "--pattern") {
        input.file_pattern = pattern.to_string();
    }
    if let Some(output) = flag(args, "--output") {
        input.output_folder = Some(PathBuf::from(output));
    }
    if let Some(model) = flag(args, "--model") {
        input.model = model.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(ratio) = flag(args, "--aspect") {
        input.aspect_ratio = ratio.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(size) = flag(args, "--size") {
        input.resolution = size.parse().map_err(|e: String| anyhow!(e))?;
    }
    input.seed = parse_seed(args)?;

    let stop = StopSignal::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current request...");
            ctrl_c.raise();
        }
    });

    let logging = LoggingProgressSink::new(locale);
    let sink = move |update: &ProgressUpdate| {
        logging.on_progress(update);
        println!(
            "[{}/{}] remaining {}",
            update.completed,
            update.total,
            locale.format_duration(Some(update.eta))
        );
    };

    let output = node.run(&config, &input, Arc::new(sink), stop).await?;
    let report = &output.report;
    println!();
    println!(
        "Done: {}/{} succeeded in {}",
        report.success_count(),
        report.total(),
        locale.format_duration(Some(report.elapsed))
    );
    for outcome in &report.outcomes {
        if let Some(failure) = outcome.failure() {
            println!(
                "  #{} {}: {}",
                outcome.index + 1,
                outcome.label.as_deref().unwrap_or("-"),
                failure.user_message(locale)
            );
        }
    }
    for path in &output.saved {
        println!("  saved {}", path.display());
    }
    Ok(())
}

fn cmd_nodes(args: &[String]) -> anyhow::Result<()> {
    let locale: Locale = flag(args, "--locale")
        .map(str::parse::<Locale>)
        .transpose()
        .map_err(|e: String| anyhow!(e))?
        .unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&node_registry(locale))?);
    Ok(())
}
