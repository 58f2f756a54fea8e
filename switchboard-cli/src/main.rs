use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use switchboard_router::{
    ConfigError, EcosystemConfig, RouterError, Switchboard, SwitchboardConfig,
};

mod interactive;

#[derive(Parser, Debug)]
#[command(name = "switchboard", version)]
#[command(about = "Route queries across A2A agents, run workflows and coordinate answers")]
struct Cli {
    /// Ecosystem file listing agents, workflows and settings (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe the configured agents and list what was found
    Discover,
    /// Show which agent a query would go to, and why
    Route {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Route a query and print the agent's answer
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Send a message to one named agent, skipping routing
    Send {
        /// Agent name as published in its card
        agent: String,
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Registered and dynamic workflows
    Workflow {
        #[command(subcommand)]
        workflow_command: WorkflowCommands,
    },
    /// Split a mixed query and answer its parts concurrently
    Coordinate {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Read commands from standard input
    Interactive,
}

#[derive(Subcommand, Debug)]
enum WorkflowCommands {
    /// List registered workflows
    List,
    /// Run a registered workflow
    Run {
        /// Workflow name
        name: String,
    },
    /// Run every registered workflow
    All,
    /// Build a workflow from a description and run it
    Create {
        #[arg(required = true, trailing_var_arg = true)]
        description: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

fn load(config: Option<&PathBuf>) -> Result<(SwitchboardConfig, EcosystemConfig), CliError> {
    let ecosystem = match config {
        Some(path) => EcosystemConfig::load(path)?,
        None => EcosystemConfig::default(),
    };
    let settings = ecosystem.config_builder().apply_env()?.build()?;
    Ok((settings, ecosystem))
}

/// Whether `command` talks to agents and so needs discovery first.
fn needs_agents(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Workflow {
            workflow_command: WorkflowCommands::List
        }
    )
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (settings, ecosystem) = load(cli.config.as_ref())?;
    let switchboard = Switchboard::a2a(settings, ecosystem)?;

    if !needs_agents(&cli.command) {
        print!("{}", switchboard.workflow_listing().await);
        return Ok(());
    }

    let report = switchboard.discover_configured().await?;
    if matches!(cli.command, Commands::Discover) {
        print!("{report}");
        println!();
        print!("{}", switchboard.store_summary().await);
        return Ok(());
    }
    tracing::debug!(succeeded = report.succeeded, attempted = report.attempted, "Agents ready");

    match cli.command {
        Commands::Discover => {}
        Commands::Route { query } => {
            print!("{}", switchboard.explain(&query.join(" ")).await?);
        }
        Commands::Ask { query } => {
            let answer = switchboard.ask(&query.join(" ")).await?;
            println!("[{}] {}", answer.decision.agent_name(), answer.text);
        }
        Commands::Send { agent, message } => {
            let text = switchboard.send_to(&agent, &message.join(" ")).await?;
            println!("[{agent}] {text}");
        }
        Commands::Coordinate { query } => {
            println!("{}", switchboard.coordinate(&query.join(" ")).await?);
        }
        Commands::Workflow { workflow_command } => match workflow_command {
            WorkflowCommands::List => print!("{}", switchboard.workflow_listing().await),
            WorkflowCommands::Run { name } => {
                print!("{}", switchboard.execute(&name).await?.report());
            }
            WorkflowCommands::All => {
                for execution in switchboard.run_all().await {
                    print!("{}", execution.report());
                }
            }
            WorkflowCommands::Create { description } => {
                let (_, execution) = switchboard.run_dynamic(&description.join(" ")).await;
                print!("{}", execution.report());
            }
        },
        Commands::Interactive => interactive::run(&switchboard).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
