use std::io::Read;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, WrapErr};
use tracing::{debug, info};
use wdshex::{LegacyOptions, ParsedDocument, Properties, RequiresSource, ShExParser};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// A file, `-` for standard input, an Entity Schema id such as `E10`, or a URL.
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Stop at the first error instead of skipping what cannot be read.
    #[arg(long, conflicts_with = "legacy")]
    strict: bool,

    /// Produce the older `{required, optional}` output.
    #[arg(long)]
    legacy: bool,

    /// With --legacy, read with the new parser.
    #[arg(long, requires = "legacy")]
    new_parser: bool,

    /// With --new-parser, report failures instead of falling back to the line reader.
    #[arg(long, requires = "new_parser")]
    no_fallback: bool,

    /// Additional property ids whose statements need a reference.
    #[arg(long = "requires-source", value_name = "ID")]
    requires_source: Vec<String>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Summary,
}

const SCHEMA_TEXT: &str = "https://www.wikidata.org/wiki/Special:EntitySchemaText/";

fn main() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let text = load(&args.source)?;

    let requires_source = args
        .requires_source
        .iter()
        .fold(RequiresSource::default(), |registry, id| {
            registry.with_property(id.trim())
        });

    if args.legacy {
        let options = LegacyOptions::new()
            .with_new_parser(args.new_parser)
            .with_fallback(!args.no_fallback)
            .with_requires_source(requires_source);
        debug!(strategy = ?options.strategy(), "legacy output");

        let properties = wdshex::parse_shex_properties(&text, &options)
            .map_err(miette::Report::new)?;
        match args.format {
            Format::Json => print_json(&properties)?,
            Format::Summary => {
                for p in &properties.required {
                    println!("required  {}  {}", p.id, p.description);
                }
                for p in &properties.optional {
                    println!("optional  {}  {}", p.id, p.description);
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let parser = ShExParser::with_requires_source(requires_source);
    let document = if args.strict {
        match parser.parse_strict(&text) {
            Ok(document) => document,
            Err(err) => {
                eprintln!("{:?}", miette::Report::new(err));
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        parser.parse(&text)
    };

    info!(
        shapes = document.shapes.len(),
        properties = document.all_properties().count(),
        "schema read"
    );

    match args.format {
        Format::Json => print_json(&document)?,
        Format::Summary => print!("{}", summary(&document)),
    }

    Ok(ExitCode::SUCCESS)
}

fn load(source: &str) -> miette::Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .into_diagnostic()
            .wrap_err("reading standard input")?;
        return Ok(text);
    }

    let url = if is_entity_schema_id(source) {
        Some(url::Url::parse(&format!("{SCHEMA_TEXT}{source}")).into_diagnostic()?)
    } else {
        url::Url::parse(source)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    };

    match url {
        Some(url) => {
            debug!(%url, "fetching schema");
            let client = reqwest::blocking::Client::new();
            client
                .get(url.clone())
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .into_diagnostic()
                .wrap_err_with(|| format!("fetching {url}"))
        }
        None => std::fs::read_to_string(source)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {source}")),
    }
}

/// `E10`, `E1234`
fn is_entity_schema_id(source: &str) -> bool {
    source
        .strip_prefix('E')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn print_json(value: &impl serde::Serialize) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn summary(document: &ParsedDocument) -> String {
    let mut output = String::new();
    let mut section = |title: &str, properties: &Properties| {
        if properties.is_empty() {
            return;
        }
        output.push_str(title);
        output.push('\n');
        for p in properties.iter() {
            output.push_str(&format!(
                "  {:<9} {:<8} {:<10} {}",
                if p.is_required() { "required" } else { "optional" },
                p.id,
                p.cardinality.to_string(),
                p.constraint,
            ));
            if let Some(comment) = &p.schema_comment {
                output.push_str("  # ");
                output.push_str(comment);
            }
            if p.requires_source {
                output.push_str("  [source]");
            }
            output.push('\n');
        }
    };

    section("(document)", &document.properties);
    for shape in document.shapes.values() {
        section(&format!("<{}>", shape.label), &shape.properties);
    }

    output
}
