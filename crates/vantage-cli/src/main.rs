mod db;
mod run;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vantage_core::{AnalysisKind, PipelineKind, TriggerKind};

#[derive(Debug, Parser)]
#[command(name = "vantage")]
#[command(about = "Vantage intelligence pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run one governed pipeline stage and print its report
    Run {
        #[arg(value_enum)]
        stage: StageArg,
        #[arg(long, value_enum, default_value_t = TriggerArg::Manual)]
        trigger: TriggerArg,
        #[arg(long)]
        persona: Option<Uuid>,
        /// Enrichment batch size
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Write an analysis report on a topic
    Analyze {
        #[arg(long)]
        topic: String,
        #[arg(long = "type", value_enum)]
        kind: AnalysisKindArg,
        #[arg(long)]
        persona: Option<Uuid>,
    },
    /// Show today's usage against the daily limits
    Usage,
    Briefing {
        #[command(subcommand)]
        command: BriefingCommands,
    },
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum DbCommands {
    Ping,
    Migrate,
    /// Upsert the source catalog and default persona from YAML
    Seed,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum BriefingCommands {
    /// Print the latest briefing as markdown
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Fetch,
    Enrich,
    Connect,
    Briefing,
}

impl From<StageArg> for PipelineKind {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Fetch => PipelineKind::Fetch,
            StageArg::Enrich => PipelineKind::Enrich,
            StageArg::Connect => PipelineKind::Connect,
            StageArg::Briefing => PipelineKind::Briefing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TriggerArg {
    Manual,
    Cron,
}

impl From<TriggerArg> for TriggerKind {
    fn from(trigger: TriggerArg) -> Self {
        match trigger {
            TriggerArg::Manual => TriggerKind::Manual,
            TriggerArg::Cron => TriggerKind::Cron,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AnalysisKindArg {
    Competitive,
    Trend,
    Regulatory,
    Threat,
}

impl From<AnalysisKindArg> for AnalysisKind {
    fn from(kind: AnalysisKindArg) -> Self {
        match kind {
            AnalysisKindArg::Competitive => AnalysisKind::Competitive,
            AnalysisKindArg::Trend => AnalysisKind::Trend,
            AnalysisKindArg::Regulatory => AnalysisKind::Regulatory,
            AnalysisKindArg::Threat => AnalysisKind::Threat,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("vantage: pass --help to list commands");
        return Ok(());
    };

    let config = vantage_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = vantage_db::connect_pool_from_config(&config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::ping(&pool).await,
            DbCommands::Migrate => db::migrate(&pool).await,
            DbCommands::Seed => db::seed(&pool, &config).await,
        },
        Commands::Run {
            stage,
            trigger,
            persona,
            limit,
        } => run::run_stage(&pool, &config, stage.into(), trigger.into(), persona, limit).await,
        Commands::Analyze {
            topic,
            kind,
            persona,
        } => run::analyze(&pool, &config, topic, kind.into(), persona).await,
        Commands::Usage => run::usage(&pool).await,
        Commands::Briefing {
            command: BriefingCommands::Latest,
        } => run::latest_briefing(&pool).await,
    }
}
