//! cypher-sink CLI: normalise relation specs, compile records to
//! statements, and dry-run record writes against an in-memory graph.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use cypher_sink::compiler::RecordLayout;
use cypher_sink::{
    encode_relations, parse_relations, CompilerConfig, FailurePolicy, GraphRecordWriter, MemoryGraph, QueryCompiler,
    Record, RecordSchema, RelationSpec, Schema, SinkConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "cypher-sink", version, about = "Compile records into Cypher upserts")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Log compiled statements and session activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Inputs shared by the record-processing commands
#[derive(clap::Args)]
struct Inputs {
    /// Avro-style JSON record schema
    #[arg(long)]
    schema: PathBuf,

    /// JSON-lines file, one record per line
    #[arg(long)]
    records: PathBuf,

    /// Sink configuration (.yaml, .yml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Relations in text form; overrides the configuration
    #[arg(long)]
    relations: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse relation text and print its wire form
    Relations {
        /// Relations, e.g. "WORKS_AT:>(company),MEMBER_OF:<(clubs)"
        text: String,

        /// Schema whose related-record fields the relations must target
        #[arg(long)]
        schema: PathBuf,
    },
    /// Print the create statement for every record
    Compile(Inputs),
    /// Upsert every record into an empty in-memory graph and print it
    DryRun(Inputs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Relations { text, schema } => run_relations(text, schema, &cli.format),
        Commands::Compile(inputs) => run_compile(inputs, &cli.format),
        Commands::DryRun(inputs) => run_dry_run(inputs, &cli.format).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_relations(text: &str, schema: &Path, format: &OutputFormat) -> Result<()> {
    let schema = load_schema(schema)?;
    let layout = RecordLayout::classify(&schema)?;
    let relations = parse_relations(text, &layout.structural_fields())?;

    match format {
        OutputFormat::Json => {
            let items: Vec<_> = relations
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "field": r.field,
                        "direction": r.direction.token(),
                        "label": r.edge_label,
                    })
                })
                .collect();
            let out = serde_json::json!({ "wire": encode_relations(&relations), "relations": items });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["Field", "Direction", "Label"]);
            for r in &relations {
                table.add_row(vec![r.field.clone(), r.direction.token().to_string(), r.edge_label.clone()]);
            }
            println!("{}", table);
            println!("{}", encode_relations(&relations));
        }
    }

    Ok(())
}

fn run_compile(inputs: &Inputs, format: &OutputFormat) -> Result<()> {
    let job = Job::load(inputs)?;
    let compiler = QueryCompiler::new(job.compiler.clone());

    let mut statements = Vec::new();
    for (line, record) in &job.records {
        let statement = compiler
            .compile_create(record, &job.relations)
            .with_context(|| format!("record on line {}", line))?;
        statements.push((*line, statement.text()));
    }

    match format {
        OutputFormat::Json => {
            let items: Vec<_> = statements
                .iter()
                .map(|(line, text)| serde_json::json!({ "line": line, "statement": text }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Table => {
            for (_, text) in &statements {
                println!("{}", text);
            }
        }
    }

    Ok(())
}

async fn run_dry_run(inputs: &Inputs, format: &OutputFormat) -> Result<()> {
    let job = Job::load(inputs)?;
    let graph = MemoryGraph::new();
    let mut writer = GraphRecordWriter::new(graph.session(), job.compiler.clone(), job.relations.clone(), job.policy);

    for (line, record) in &job.records {
        writer
            .write(record)
            .await
            .with_context(|| format!("record on line {}", line))?;
    }
    let (_, summary) = writer.close();

    let nodes = graph.nodes().await;
    let edges = graph.edges().await;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "summary": summary, "nodes": nodes, "edges": edges });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["Id", "Labels", "Properties"]);
            for node in &nodes {
                let labels: Vec<&str> = node.labels.iter().map(String::as_str).collect();
                table.add_row(vec![
                    node.id.to_string(),
                    labels.join(":"),
                    serde_json::to_string(&node.properties)?,
                ]);
            }
            println!("{}", table);

            if !edges.is_empty() {
                let mut table = new_table(&["Source", "Type", "Target"]);
                for edge in &edges {
                    table.add_row(vec![edge.source.to_string(), edge.edge_type.clone(), edge.target.to_string()]);
                }
                println!("{}", table);
            }
            println!("{}", summary);
        }
    }

    Ok(())
}

/// Everything a record-processing command needs, loaded up front
struct Job {
    compiler: CompilerConfig,
    relations: Vec<RelationSpec>,
    policy: FailurePolicy,
    /// (line number, record)
    records: Vec<(usize, Record)>,
}

impl Job {
    fn load(inputs: &Inputs) -> Result<Self> {
        let schema = load_schema(&inputs.schema)?;

        let (compiler, mut relations, policy) = match &inputs.config {
            Some(path) => {
                let config = SinkConfig::load(path)?;
                let relations = config.validate(&schema)?;
                (config.compiler, relations, config.failure_policy)
            }
            None => (CompilerConfig::default(), Vec::new(), FailurePolicy::Abort),
        };
        if let Some(text) = &inputs.relations {
            let layout = RecordLayout::classify(&schema)?;
            relations = parse_relations(text, &layout.structural_fields())?;
        }

        let text = std::fs::read_to_string(&inputs.records)
            .with_context(|| format!("reading {}", inputs.records.display()))?;
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = Record::parse_json(Arc::clone(&schema), line)
                .with_context(|| format!("decoding record on line {}", index + 1))?;
            records.push((index + 1, record));
        }

        Ok(Job {
            compiler,
            relations,
            policy,
            records,
        })
    }
}

fn load_schema(path: &Path) -> Result<Arc<RecordSchema>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let schema = Schema::parse_json(&text)?;
    schema
        .as_record()
        .cloned()
        .ok_or_else(|| anyhow!("{} does not describe a record", path.display()))
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}
