use anyhow::{Context, Result};
use archcanvas_api::Server;
use archcanvas_core::{
    completion_score, layout, progress_bar, project_summary, render_svg, ConfigManager,
    ExportDocument, Library, LogFormat, MitigationFilter, ProjectSummary, RiskFilter, Settings,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "archcanvas")]
#[command(about = "ArchCanvas - architecture risk canvas and coverage analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Directory holding default.toml / {env}.toml / local.toml
    #[arg(long, global = true, env = "ARCHCANVAS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve {
        /// Overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Browse the reference risk and mitigation libraries
    #[command(subcommand)]
    Library(LibraryCommands),

    /// Summarize an exported project
    Summary {
        /// Export file written by the API's export endpoint
        file: PathBuf,
    },

    /// Completion score of an exported project
    Score {
        file: PathBuf,
    },

    /// Render an exported project's canvas as SVG
    Canvas {
        file: PathBuf,

        /// Write the SVG here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Hide item counts and bucket notes
        #[arg(long)]
        no_details: bool,
    },
}

#[derive(Subcommand)]
enum LibraryCommands {
    /// List risks
    Risks,
    /// List mitigations
    Mitigations,
    /// Risk/mitigation pairs and library-wide coverage
    Mappings,
}

/// A command's result: JSON for `--output json|pretty`, plus an optional
/// pre-rendered table for `--output table`.
struct Report {
    value: Value,
    table: Option<String>,
}

impl Report {
    fn plain<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            table: None,
        })
    }

    fn with_table<T: Serialize>(value: &T, table: String) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            table: Some(table),
        })
    }
}

#[derive(Tabled)]
struct RiskLine {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Impact")]
    impact: String,
    #[tabled(rename = "Likelihood")]
    likelihood: String,
    #[tabled(rename = "Domain")]
    domain: String,
}

#[derive(Tabled)]
struct MitigationLine {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Effectiveness")]
    effectiveness: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Risks")]
    risks: String,
}

#[derive(Tabled)]
struct MappingLine {
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Impact")]
    impact: String,
    #[tabled(rename = "Mitigation")]
    mitigation: String,
    #[tabled(rename = "Effectiveness")]
    effectiveness: String,
    #[tabled(rename = "Cost")]
    cost: String,
}

#[derive(Tabled)]
struct SummaryLine {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Domain")]
    domain: String,
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigManager::new(cli.config_dir.clone())
        .context("Failed to load configuration")?;
    init_tracing(config.settings(), cli.verbose);
    debug!(dir = %config.config_dir().display(), env = config.env(), "configuration loaded");

    match execute_command(&cli, config).await {
        Ok(Some(report)) => {
            print_output(cli.output, &report)?;
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(settings: &Settings, verbose: bool) {
    let fallback = if verbose {
        "debug".to_string()
    } else {
        settings.logging.level.clone()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // Logs go to stderr so stdout stays parseable.
    match settings.logging.format {
        LogFormat::Json => {
            let subscriber = Registry::default().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        LogFormat::Pretty => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

async fn execute_command(cli: &Cli, config: ConfigManager) -> Result<Option<Report>> {
    match &cli.command {
        Commands::Serve { host, port } => {
            serve(config, host.clone(), *port).await?;
            Ok(None)
        }
        Commands::Library(cmd) => {
            let library = if config.settings().library.seed_defaults {
                Library::seeded()
            } else {
                Library::new()
            };
            library_report(cmd, &library).map(Some)
        }
        Commands::Summary { file } => summary_report(file).map(Some),
        Commands::Score { file } => score_report(file).map(Some),
        Commands::Canvas {
            file,
            out,
            no_details,
        } => canvas_command(&config, file, out.as_deref(), *no_details),
    }
}

async fn serve(config: ConfigManager, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut settings = config.settings().clone();
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    let config = Arc::new(ConfigManager::from_settings(settings)?);

    println!(
        "{} http://{}:{}",
        "ArchCanvas API on".green().bold(),
        config.settings().server.host,
        config.settings().server.port
    );
    Server::from_config(config)?.run().await
}

fn library_report(cmd: &LibraryCommands, library: &Library) -> Result<Report> {
    match cmd {
        LibraryCommands::Risks => {
            let risks = library.filter_risks(&RiskFilter::default());
            let rows = risks
                .iter()
                .map(|r| RiskLine {
                    id: r.id.clone(),
                    description: r.description.clone(),
                    impact: r.impact.to_string(),
                    likelihood: or_dash(r.likelihood),
                    domain: or_dash(r.domain),
                })
                .collect();
            Report::with_table(&risks, render_table::<RiskLine>(rows))
        }
        LibraryCommands::Mitigations => {
            let mitigations = library.filter_mitigations(&MitigationFilter::default());
            let rows = mitigations
                .iter()
                .map(|m| MitigationLine {
                    id: m.id.clone(),
                    description: m.description.clone(),
                    effectiveness: m.effectiveness.to_string(),
                    cost: m.cost.to_string(),
                    risks: m.mapped_risks.join(", "),
                })
                .collect();
            Report::with_table(&mitigations, render_table::<MitigationLine>(rows))
        }
        LibraryCommands::Mappings => {
            let overview = library.mapping_overview();
            let rows = overview
                .rows
                .iter()
                .map(|row| MappingLine {
                    risk: format!("{} {}", row.risk_id, row.risk_description),
                    impact: row.risk_impact.to_string(),
                    mitigation: format!("{} {}", row.mitigation_id, row.mitigation_description),
                    effectiveness: row.mitigation_effectiveness.to_string(),
                    cost: row.implementation_cost.to_string(),
                })
                .collect();
            let mut table = render_table::<MappingLine>(rows);
            table.push_str(&format!(
                "\n{}/{} risks mapped ({:.1}%)",
                overview.covered_risks, overview.total_risks, overview.coverage_percentage
            ));
            Report::with_table(&overview, table)
        }
    }
}

fn load_export(file: &Path) -> Result<ExportDocument> {
    ExportDocument::read_from(file)
        .with_context(|| format!("Failed to read export file {}", file.display()))
}

fn summary_table(summary: &ProjectSummary) -> String {
    let mut rows: Vec<SummaryLine> = summary
        .risks
        .iter()
        .map(|r| SummaryLine {
            kind: "risk",
            id: r.risk_id.clone(),
            description: r.description.clone(),
            rating: r.impact.to_string(),
            domain: r.domain.to_string(),
        })
        .collect();
    rows.extend(summary.mitigations.iter().map(|m| SummaryLine {
        kind: "mitigation",
        id: m.mitigation_id.clone(),
        description: m.description.clone(),
        rating: m.effectiveness.to_string(),
        domain: m.domain.to_string(),
    }));

    format!(
        "{} ({})  elements: {}  connections: {}  completion: {}%\n{}\ncoverage {} {:.1}%",
        summary.name,
        summary.status,
        summary.total_elements,
        summary.connections,
        summary.completion,
        render_table(rows),
        summary.progress_bar,
        summary.coverage.coverage_percentage
    )
}

fn summary_report(file: &Path) -> Result<Report> {
    let doc = load_export(file)?;
    let summary = project_summary(&doc.project, &doc.library());
    info!(project = %summary.name, completion = summary.completion, "summary computed");
    let table = summary_table(&summary);
    Report::with_table(&summary, table)
}

fn score_report(file: &Path) -> Result<Report> {
    let doc = load_export(file)?;
    let score = completion_score(&doc.project);
    Report::plain(&json!({
        "project": doc.project.name,
        "score": score,
        "progress": progress_bar(f64::from(score)),
    }))
}

fn canvas_command(
    config: &ConfigManager,
    file: &Path,
    out: Option<&Path>,
    no_details: bool,
) -> Result<Option<Report>> {
    let doc = load_export(file)?;
    let mut options = config.settings().canvas.options();
    if no_details {
        options.show_details = false;
    }
    let canvas = layout(&doc.project, &options);
    let svg = render_svg(&canvas);

    let Some(out) = out else {
        println!("{svg}");
        return Ok(None);
    };
    std::fs::write(out, &svg).with_context(|| format!("Failed to write {}", out.display()))?;
    info!(path = %out.display(), "canvas written");
    Report::plain(&json!({
        "project": doc.project.name,
        "written": out.display().to_string(),
        "nodes": canvas.nodes.len(),
        "edges": canvas.edges.len(),
    }))
    .map(Some)
}

fn print_output(format: OutputFormat, report: &Report) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(&report.value, 0)?;
        }
        OutputFormat::Table => match &report.table {
            Some(table) => println!("{table}"),
            None => print_pretty(&report.value, 0)?,
        },
    }
    Ok(())
}

fn print_pretty(value: &Value, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    Value::String(s) => {
                        println!("{indent}{}: {}", key_colored, s.green());
                    }
                    Value::Number(n) => {
                        println!("{indent}{}: {}", key_colored, n.to_string().yellow());
                    }
                    Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{indent}{}: {}", key_colored, val_colored);
                    }
                    Value::Null => {
                        println!("{indent}{}: {}", key_colored, "-".dimmed());
                    }
                    _ => {
                        println!("{indent}{}:", key_colored);
                        print_pretty(val, depth + 1)?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{indent}{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item, depth + 1)?;
            }
        }
        _ => {
            println!("{indent}{}", value);
        }
    }
    Ok(())
}
