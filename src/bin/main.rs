//! Dossier CLI - build, run and export ad-hoc reports
//!
//! Usage:
//!   dossier entities
//!   dossier compile --base <entity> --columns <a,b.c> [--filter f:op:v]...
//!   dossier run --data <rows.json> (--report <id> | --base <entity> ...)
//!   dossier metric --data <rows.json> --entity <e> --field <f|*> --aggregation <agg>
//!   dossier export --data <rows.json> (--report <id> | --base <entity> ...) [--out <file>]
//!   dossier save --name <name> --base <entity> --columns <...> [--public]
//!   dossier list [--public]
//!
//! Examples:
//!   dossier compile --base cases --columns title,users.name --filter status:eq:open
//!   dossier run --data demo.json --base cases --columns priority,amount \
//!       --chart bar --group-by priority --aggregation sum --value-field amount

use clap::{Args, Parser, Subcommand};
use dossier::access::AllowAll;
use dossier::config::{Settings, SettingsError};
use dossier::gateway::{ExecutionError, ExecutionGateway, MemoryGateway, SqlRenderer};
use dossier::model::{
    Aggregation, ChartConfig, ChartType, ColumnRef, DateGrouping, Filter, ReportId,
};
use dossier::planner::{CompileError, QueryCompiler};
use dossier::schema::{SchemaError, SchemaRegistry, StaticSchemaSource};
use dossier::session::{ReportSession, SessionError};
use dossier::store::{ReportStore, SqliteReportStore, StoreError};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dossier")]
#[command(about = "Dossier - ad-hoc multi-table reports over case-management data")]
#[command(version)]
struct Cli {
    /// Config file (overrides the default search)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Schema document (.json or .toml), overrides the configured source
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entities, their fields and outgoing relationships
    Entities,

    /// Compile a report to SQL without running it
    Compile {
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Run a report and print its view model as JSON
    Run {
        /// JSON file mapping table names to row arrays
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Evaluate a single aggregate
    Metric {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        entity: String,

        /// Field name, or '*' for count
        #[arg(short, long, default_value = "*")]
        field: String,

        #[arg(short, long, default_value = "count")]
        aggregation: Aggregation,
    },

    /// Run a report and write its rows as CSV
    Export {
        #[arg(short, long)]
        data: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Save a report definition
    Save {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Make the report visible to other users
        #[arg(long)]
        public: bool,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// List saved reports
    List {
        /// Include other users' public reports
        #[arg(long)]
        public: bool,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Saved report id
    #[arg(long, conflicts_with = "base")]
    report: Option<ReportId>,

    /// Base entity
    #[arg(short, long)]
    base: Option<String>,

    /// Columns, comma separated; `entity.field` pulls from a related entity
    #[arg(short, long, value_delimiter = ',', value_parser = ColumnRef::parse)]
    columns: Vec<ColumnRef>,

    /// Filter as field:operator:value (repeatable)
    #[arg(short, long = "filter", value_parser = Filter::parse_triple)]
    filters: Vec<Filter>,

    #[arg(long, default_value = "table")]
    chart: ChartType,

    #[arg(long)]
    aggregation: Option<Aggregation>,

    #[arg(long, value_parser = ColumnRef::parse)]
    group_by: Option<ColumnRef>,

    #[arg(long)]
    date_grouping: Option<DateGrouping>,

    #[arg(long, value_parser = ColumnRef::parse)]
    value_field: Option<ColumnRef>,
}

impl ReportArgs {
    fn chart_config(&self) -> ChartConfig {
        ChartConfig {
            chart_type: self.chart,
            aggregation: self.aggregation,
            group_by: self.group_by.clone(),
            date_grouping: self.date_grouping,
            value_field: self.value_field.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(&'static str),
}

/// Loaded settings and schema shared by every command.
struct App {
    settings: Settings,
    registry: SchemaRegistry,
    user: String,
}

impl App {
    async fn init(cli: &Cli) -> Result<Self, CliError> {
        let settings = match &cli.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::load()?,
        };
        let registry = load_registry(&settings, cli.schema.clone()).await?;
        if registry.is_degraded() {
            tracing::warn!("using built-in core entities");
        }
        Ok(Self {
            settings,
            registry,
            user: cli.user.clone(),
        })
    }

    fn store(&self) -> Result<SqliteReportStore, CliError> {
        let store = match self.settings.store_path()? {
            Some(path) => SqliteReportStore::open(path)?,
            None => SqliteReportStore::open_default()?,
        };
        Ok(store)
    }

    fn session(&self) -> ReportSession<'_> {
        ReportSession::new(&self.registry, &AllowAll, self.user.clone())
            .with_row_limit(self.settings.query.preview_limit)
            .with_zone(self.settings.display.zone())
    }

    /// Session holding the report described by `args`.
    fn prepare(&self, args: &ReportArgs) -> Result<ReportSession<'_>, CliError> {
        let mut session = self.session();
        if let Some(id) = args.report {
            session.open(&self.store()?, id)?;
            return Ok(session);
        }

        let base = args
            .base
            .as_deref()
            .ok_or(CliError::Usage("either --report or --base is required"))?;
        session.set_base_entity(base)?;
        session.set_columns(args.columns.clone());
        session.set_filters(args.filters.clone());
        session.set_chart(args.chart_config())?;
        Ok(session)
    }
}

async fn load_registry(
    settings: &Settings,
    schema_override: Option<PathBuf>,
) -> Result<SchemaRegistry, CliError> {
    let path = match schema_override {
        Some(path) => Some(path),
        None => settings.schema_source()?,
    };
    let Some(path) = path else {
        return Ok(SchemaRegistry::fallback());
    };

    let fallback_enabled = settings.schema.fallback_enabled;
    let source = match StaticSchemaSource::from_file(&path) {
        Ok(source) => source,
        Err(e) if fallback_enabled => {
            tracing::warn!(path = %path.display(), error = %e, "schema document unreadable");
            return Ok(SchemaRegistry::fallback());
        }
        Err(e) => return Err(e.into()),
    };

    if fallback_enabled {
        Ok(SchemaRegistry::load(&source).await)
    } else {
        Ok(SchemaRegistry::try_load(&source).await?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dossier::logging::init();
    let cli = Cli::parse();

    let result = match App::init(&cli).await {
        Ok(app) => run_command(&app, cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Compile(e)) => {
            eprintln!("Error: {} ({})", e.user_message(), e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(app: &App, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Entities => cmd_entities(app),
        Commands::Compile { report } => cmd_compile(app, &report),
        Commands::Run { data, report } => cmd_run(app, data, &report).await,
        Commands::Metric {
            data,
            entity,
            field,
            aggregation,
        } => cmd_metric(app, data, &entity, &field, aggregation).await,
        Commands::Export { data, out, report } => cmd_export(app, data, out, &report).await,
        Commands::Save {
            name,
            description,
            public,
            report,
        } => cmd_save(app, name, description, public, &report),
        Commands::List { public } => cmd_list(app, public),
    }
}

fn cmd_entities(app: &App) -> Result<(), CliError> {
    if app.registry.is_degraded() {
        println!("(degraded: built-in core entities)");
        println!();
    }
    for entity in app.registry.list_entities() {
        println!("{}", entity.name);
        println!("  fields: {}", entity.fields.join(", "));
        for rel in &entity.relationships {
            println!(
                "  {}.{} -> {}.{}",
                rel.source_entity, rel.source_column, rel.target_entity, rel.target_column
            );
        }
    }
    Ok(())
}

fn cmd_compile(app: &App, args: &ReportArgs) -> Result<(), CliError> {
    let session = app.prepare(args)?;
    let pending = session.begin_run()?;
    let rendered = SqlRenderer::new().render(&pending.plan)?;

    println!("{}", rendered.sql);
    if !rendered.params.is_empty() {
        println!("-- params: {}", serde_json::to_string(&rendered.params)?);
    }
    Ok(())
}

async fn cmd_run(app: &App, data: PathBuf, args: &ReportArgs) -> Result<(), CliError> {
    let gateway = MemoryGateway::from_file(&data)?;
    let mut session = app.prepare(args)?;
    session.run(&gateway).await?;

    if let Some(view) = session.view_model()? {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }
    Ok(())
}

async fn cmd_metric(
    app: &App,
    data: PathBuf,
    entity: &str,
    field: &str,
    aggregation: Aggregation,
) -> Result<(), CliError> {
    let gateway = MemoryGateway::from_file(&data)?;
    let compiler =
        QueryCompiler::new(&app.registry).with_row_limit(app.settings.query.preview_limit);
    let plan = compiler.compile_metric(entity, field, aggregation)?;
    let value = gateway.execute_scalar(&plan).await?;

    match value {
        Some(v) => println!("{}", v),
        None => println!("null"),
    }
    Ok(())
}

async fn cmd_export(
    app: &App,
    data: PathBuf,
    out: Option<PathBuf>,
    args: &ReportArgs,
) -> Result<(), CliError> {
    let gateway = MemoryGateway::from_file(&data)?;
    let mut session = app.prepare(args)?;
    session.run(&gateway).await?;

    let export = session
        .export_csv()
        .ok_or(CliError::Usage("report returned no result"))?;
    match out {
        Some(path) => {
            fs::write(&path, &export.body)?;
            eprintln!("wrote {} ({})", path.display(), export.mime_type);
        }
        None => print!("{}", export.body),
    }
    Ok(())
}

fn cmd_save(
    app: &App,
    name: String,
    description: Option<String>,
    public: bool,
    args: &ReportArgs,
) -> Result<(), CliError> {
    let store = app.store()?;
    let mut session = app.prepare(args)?;
    session.set_name(name);
    session.set_description(description);
    session.set_public(public);
    let id = session.save(&store)?;
    println!("{}", id);
    Ok(())
}

fn cmd_list(app: &App, public: bool) -> Result<(), CliError> {
    let store = app.store()?;
    let reports = store.list_for(&app.user, public)?;
    if reports.is_empty() {
        println!("No reports saved.");
        return Ok(());
    }
    for report in reports {
        let id = report.id.map(|id| id.to_string()).unwrap_or_default();
        let visibility = if report.is_public { "public" } else { "private" };
        println!(
            "{}  {}  (base: {}, {}, {}, owner: {})",
            id, report.name, report.base_entity, report.chart.chart_type, visibility,
            report.owner_id
        );
    }
    Ok(())
}
