use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vizdata::translate::{status_message, StatusMessage};
use vizdata::{handle_request, PrepareOptions, Request, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// A full `{table, visualization}` request
    Request,
    /// CSV table; the visualization comes from --spec
    Csv,
    /// JSON array of objects; the visualization comes from --spec
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vizdata")]
#[command(about = "Turn tabular data into chart series or word-cloud terms", long_about = None)]
struct Args {
    /// How stdin is interpreted
    #[arg(long, value_enum, default_value_t = InputFormat::Request)]
    input: InputFormat,

    /// Visualization JSON (e.g. '{"type": "wordcloud", "title": "Terms", "textColumn": "text"}')
    #[arg(long)]
    spec: Option<String>,

    /// Table id used in error messages for csv/json input
    #[arg(long, default_value = "stdin")]
    table_id: String,

    /// JSON file with preparation options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of word-cloud terms
    #[arg(long)]
    top_terms: Option<usize>,

    /// Bucket count targeted by automatic date formatting
    #[arg(long)]
    min_values: Option<usize>,

    /// Locale for status messages
    #[arg(long, default_value = "en")]
    locale: String,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vizdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let options = load_options(&args)?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;

    let request = build_request(&args, &input)?;
    let response = handle_request(&request, &options);

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("Failed to serialize response")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write response to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    match response.visualization_data() {
        None => {
            eprintln!("{}", status_message(StatusMessage::Error, &args.locale));
            std::process::exit(1);
        }
        Some(data) if data.is_empty() => {
            eprintln!("{}", status_message(StatusMessage::NoData, &args.locale));
        }
        Some(_) => {}
    }

    Ok(())
}

fn load_options(args: &Args) -> Result<PrepareOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PrepareOptions::default(),
    };
    if let Some(n) = args.top_terms {
        options.top_terms = n;
    }
    if let Some(n) = args.min_values {
        options.auto_min_values = n;
    }
    Ok(options)
}

fn build_request(args: &Args, input: &str) -> Result<Request> {
    if args.input == InputFormat::Request {
        return serde_json::from_str(input).context("Failed to parse request JSON from stdin");
    }

    let Some(spec) = &args.spec else {
        bail!("--spec is required when reading a {:?} table", args.input);
    };
    let visualization = serde_json::from_str(spec).context("Failed to parse --spec JSON")?;

    let table = match args.input {
        InputFormat::Csv => Table::from_csv(args.table_id.as_str(), input.as_bytes())
            .context("Failed to read CSV table")?,
        _ => {
            let records = serde_json::from_str(input).context("Failed to parse JSON records")?;
            Table::from_records(args.table_id.as_str(), &records).context("Failed to read JSON table")?
        }
    };

    Ok(Request {
        id: 0,
        table: Some(table),
        visualization: Some(visualization),
    })
}
