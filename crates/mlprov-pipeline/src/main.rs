//! `mlprov` command-line tool

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mlprov_export::{
    json::to_prov_json_string, provn, render_graph_with, render_image, write_outputs_with, DotOptions, ImageFormat,
};
use mlprov_fingerprint::Fingerprinter;
use mlprov_model::{Document, ViewKind};
use mlprov_pipeline::Manifest;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("mlprov")
        .version(mlprov_pipeline::VERSION)
        .about("Provenance recording for ML pipeline runs")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log filter when RUST_LOG is unset"),
        )
        .subcommand(
            Command::new("fingerprint")
                .about("Print SHA-256 digest, size and creation time of files")
                .arg(
                    Arg::new("paths")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Files to fingerprint"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("65536")
                        .value_parser(value_parser!(usize))
                        .help("Read buffer size in bytes"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Per-file deadline in seconds"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("record")
                .about("Replay a run manifest and write provenance outputs")
                .arg(manifest_arg())
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Override the manifest's output directory"),
                )
                .arg(
                    Arg::new("token")
                        .long("token")
                        .value_parser(value_parser!(u64))
                        .help("Fixed session token"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Replay a run manifest and print one rendering to stdout")
                .arg(manifest_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("provn")
                        .value_parser(["provn", "json", "dot", "png", "svg", "pdf"])
                        .help("Output format"),
                )
                .arg(
                    Arg::new("view")
                        .long("view")
                        .value_parser(["data", "process", "responsibility"])
                        .help("Project onto one concern first"),
                )
                .arg(
                    Arg::new("token")
                        .long("token")
                        .value_parser(value_parser!(u64))
                        .help("Fixed session token"),
                ),
        )
}

fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to the TOML run manifest")
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    init_tracing(level);

    match matches.subcommand() {
        Some(("fingerprint", args)) => fingerprint(args),
        Some(("record", args)) => record(args),
        Some(("render", args)) => render(args),
        _ => bail!("no subcommand given"),
    }
}

fn fingerprint(args: &ArgMatches) -> Result<()> {
    let chunk_size = args.get_one::<usize>("chunk-size").copied().unwrap_or(65536);
    let mut fingerprinter = Fingerprinter::new().with_chunk_size(chunk_size)?;
    if let Some(secs) = args.get_one::<u64>("timeout") {
        fingerprinter = fingerprinter.with_timeout(Duration::from_secs(*secs));
    }
    let json = args.get_flag("json");

    let mut stdout = std::io::stdout().lock();
    for path in args.get_many::<PathBuf>("paths").into_iter().flatten() {
        let fp = fingerprinter
            .fingerprint(path)
            .with_context(|| format!("fingerprinting {}", path.display()))?;
        if json {
            let line = serde_json::json!({ "path": path, "fingerprint": fp });
            writeln!(stdout, "{line}")?;
        } else {
            writeln!(stdout, "{}  {:>12}  {}  {}", fp.digest, fp.size, fp.created_at.to_rfc3339(), path.display())?;
        }
    }
    Ok(())
}

fn load(args: &ArgMatches) -> Result<(Manifest, Document)> {
    let path = args
        .get_one::<PathBuf>("manifest")
        .context("manifest path required")?;
    let manifest = Manifest::load(path).with_context(|| format!("loading {}", path.display()))?;

    let mut config = manifest.recorder_config();
    if let Some(token) = args.get_one::<u64>("token") {
        config.fixed_token = Some(*token);
    }
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let doc = manifest
        .record_with(base_dir, &config)
        .with_context(|| format!("recording {}", path.display()))?;
    Ok((manifest, doc))
}

fn record(args: &ArgMatches) -> Result<()> {
    let (manifest, doc) = load(args)?;
    let path = args
        .get_one::<PathBuf>("manifest")
        .context("manifest path required")?;
    let dir = match args.get_one::<PathBuf>("out-dir") {
        Some(dir) => dir.clone(),
        None => path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&manifest.output.dir),
    };

    let written = write_outputs_with(&doc, &dir, &manifest.output.base, &manifest.output.options())
        .with_context(|| format!("writing outputs to {}", dir.display()))?;
    for artifact in written {
        println!("{}  {}", artifact.fingerprint.digest, artifact.path.display());
    }
    Ok(())
}

fn render(args: &ArgMatches) -> Result<()> {
    let (manifest, mut doc) = load(args)?;
    if let Some(view) = args.get_one::<String>("view") {
        let kind = match view.as_str() {
            "data" => ViewKind::Data,
            "process" => ViewKind::Process,
            _ => ViewKind::Responsibility,
        };
        doc = doc.view(kind)?;
    }

    let dot_options = DotOptions {
        show_attributes: manifest.output.show_attributes,
        ..DotOptions::default()
    };
    let format = args.get_one::<String>("format").map_or("provn", String::as_str);
    let bytes = match format {
        "provn" => provn::serialize(&doc)?.into_bytes(),
        "json" => to_prov_json_string(&doc)?.into_bytes(),
        "dot" => render_graph_with(&doc, &dot_options).into_bytes(),
        other => {
            let image: ImageFormat = other.parse().map_err(anyhow::Error::msg)?;
            render_image(&render_graph_with(&doc, &dot_options), image)?
        }
    };
    std::io::stdout().lock().write_all(&bytes)?;
    Ok(())
}
