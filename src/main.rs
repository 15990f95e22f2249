use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitereport::cli::commands::generate::GenerateOptions;
use sitereport::cli::util::parse_date_arg;

#[derive(Parser)]
#[command(name = "sitereport")]
#[command(
    version,
    about = "Periodic operational reports for construction-supervision projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize sitereport in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Import projects and operational records from JSON
    Import {
        #[arg(help = "Records file (JSON)")]
        path: PathBuf,
    },

    /// List imported projects
    Projects {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage report templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Generate a periodic report
    Generate {
        #[arg(long, short, help = "Project ID")]
        project: String,
        #[arg(long, value_parser = parse_date_arg, help = "First day of the period (YYYY-MM-DD)")]
        from: chrono::NaiveDate,
        #[arg(long, value_parser = parse_date_arg, help = "Last day of the period (YYYY-MM-DD)")]
        to: chrono::NaiveDate,
        #[arg(long, short, help = "Template ID (project or global default otherwise)")]
        template: Option<String>,
        #[arg(long, help = "Signature grid (YAML)")]
        signatures: Option<PathBuf>,
        #[arg(long, short, help = "Output PDF path")]
        output: Option<PathBuf>,
        #[arg(long, help = "LLM provider (openai, ollama, none)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Use literal content for every section")]
        no_generation: bool,
    },

    /// List generated reports
    History {
        #[arg(long, short, help = "Project ID")]
        project: String,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Import templates from a YAML file
    Import {
        #[arg(help = "Templates file (YAML)")]
        path: PathBuf,
    },
    /// List templates
    List {
        #[arg(long, short, help = "Only templates visible to this project")]
        project: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Delete a template and its sections
    Delete {
        #[arg(help = "Template ID")]
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    use sitereport::cli::commands;

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Import { path } => commands::import::run(&path)?,
        Commands::Projects { format } => commands::projects::run(&format)?,
        Commands::Templates { action } => match action {
            TemplateAction::Import { path } => commands::templates::import(&path)?,
            TemplateAction::List { project, format } => {
                commands::templates::list(project.as_deref(), &format)?
            }
            TemplateAction::Delete { id } => commands::templates::delete(&id)?,
        },
        Commands::Generate {
            project,
            from,
            to,
            template,
            signatures,
            output,
            provider,
            model,
            no_generation,
        } => commands::generate::run(GenerateOptions {
            project_id: project,
            from,
            to,
            template_id: template,
            signatures,
            output,
            provider,
            model,
            no_generation,
        })?,
        Commands::History { project, format } => commands::history::run(&project, &format)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => commands::config::show(global, &format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?
                } else {
                    commands::config::init_project()?
                }
            }
        },
    }

    Ok(())
}
