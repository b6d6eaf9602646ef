mod debug_report;

use bladeconf::{BladeConfig, ConfigMap, Context, Options, PageContext, plan_enrichment, resolve_blade};
use chrono::NaiveDateTime;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "BLADECONF_LOG";

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match parse_args().and_then(load) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if config.plan {
        let request = plan_enrichment(&config.blade, &config.options);
        match serde_json::to_string_pretty(&request) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: failed to encode enrichment request: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    match resolve_blade(&config.blade, &config.data, &config.context, &config.options) {
        Ok(resolution) if config.json => match serde_json::to_string_pretty(&resolution) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: failed to encode resolution: {err}");
                std::process::exit(1);
            }
        },
        Ok(resolution) => debug_report::print_resolution(&config.source_name, &resolution, config.color),
        Err(err) => {
            debug_report::print_failure(&err, io::stderr().is_terminal() && config.color);
            std::process::exit(1);
        }
    }
}

struct CliArgs {
    config_path: Option<String>,
    data_path: Option<String>,
    page_path: Option<String>,
    reference_time: Option<NaiveDateTime>,
    sources: Vec<String>,
    plan: bool,
    json: bool,
    color: bool,
}

struct CliConfig {
    source_name: String,
    blade: BladeConfig,
    data: ConfigMap,
    context: Context,
    options: Options,
    plan: bool,
    json: bool,
    color: bool,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        config_path: None,
        data_path: None,
        page_path: None,
        reference_time: None,
        sources: Vec::new(),
        plan: false,
        json: false,
        color: io::stdout().is_terminal(),
    };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline.clone().or_else(|| args.next()).ok_or_else(|| format!("error: {name} expects a value"))
        };

        match flag.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("bladeconf {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => cli.color = true,
            "--no-color" => cli.color = false,
            "--plan" => cli.plan = true,
            "--json" => cli.json = true,
            "--data" | "-d" => cli.data_path = Some(value("--data")?),
            "--page" | "-p" => cli.page_path = Some(value("--page")?),
            "--source" | "-s" => cli.sources.push(value("--source")?),
            "--reference" => cli.reference_time = Some(parse_reference(&value("--reference")?)?),
            "-" => set_config_path(&mut cli, arg)?,
            _ if flag.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ => set_config_path(&mut cli, arg)?,
        }
    }

    Ok(cli)
}

fn set_config_path(cli: &mut CliArgs, path: String) -> Result<(), String> {
    if cli.config_path.is_some() {
        return Err("error: configuration provided multiple times".to_string());
    }
    cli.config_path = Some(path);
    Ok(())
}

fn load(cli: CliArgs) -> Result<CliConfig, String> {
    let (source_name, text) = match cli.config_path.as_deref() {
        None | Some("-") => ("<stdin>".to_string(), read_stdin()?),
        Some(path) => (path.to_string(), read_file(path)?),
    };
    if text.trim().is_empty() {
        return Err(format!("error: no configuration provided\n\n{}", help_text()));
    }
    let blade = BladeConfig::from_json(&text).map_err(|err| format!("error: {source_name}: {err}"))?;

    let data = match cli.data_path.as_deref() {
        Some(path) => serde_json::from_str(&read_file(path)?)
            .map_err(|err| format!("error: {path}: enriched data must be a JSON object: {err}"))?,
        None => ConfigMap::new(),
    };

    let mut context = Context::default();
    if let Some(path) = cli.page_path.as_deref() {
        context.page = serde_json::from_str::<PageContext>(&read_file(path)?)
            .map_err(|err| format!("error: {path}: invalid page context: {err}"))?;
    }
    if let Some(reference_time) = cli.reference_time {
        context.reference_time = reference_time;
    }

    let mut options = Options::default();
    if !cli.sources.is_empty() {
        options.enrichment_sources = cli.sources;
    }

    Ok(CliConfig { source_name, blade, data, context, options, plan: cli.plan, json: cli.json, color: cli.color })
}

fn read_file(path: &str) -> Result<String, String> {
    std::fs::read_to_string(Path::new(path)).map_err(|err| format!("error: failed to read {path}: {err}"))
}

fn read_stdin() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_reference(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| format!("error: invalid --reference '{value}' (expected YYYY-MM-DDTHH:MM:SS)"))
}

fn help_text() -> String {
    format!(
        "bladeconf {version}

Resolve a blade navigation configuration.

Usage:
  bladeconf [OPTIONS] [<config.json> | -]

Reads the blade document from the given file, or from stdin when the path is
omitted or '-'.

Options:
  -d, --data <file>          Enriched data (flat JSON object, e.g.
                             {{\"workItem.title\": \"...\"}}).
  -p, --page <file>          Page context JSON (user, locale, permissions, ...).
  --reference <timestamp>    Reference time in YYYY-MM-DDTHH:MM:SS.
                             Default: the local clock.
  -s, --source <tag>         Source tag that needs enrichment. Repeatable.
                             Default: workItem
  --plan                     Print the enrichment request and exit.
  --json                     Print the resolution as JSON.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}              Log filter (default: warn), e.g. bladeconf=trace.

Exit codes:
  0  Success.
  1  Resolution failed.
  2  Invalid arguments or unreadable input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
