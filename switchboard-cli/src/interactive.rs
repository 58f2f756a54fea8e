//! Line-oriented interactive mode.

use switchboard_router::{RouterResult, Switchboard};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Commands:
  list                 list workflows
  run <name>           run a workflow
  all                  run every workflow
  create <description> build and run a one-off workflow
  save <description>   build, register and run a one-off workflow
  route <query>        explain routing for a query
  coordinate <query>   split a query and answer its parts
  send <agent>: <text> send text to one agent, skipping routing
  agents               list discovered agents
  routes               show the routing table
  discover             probe the configured agents again
  help                 show this help
  quit                 leave
Anything else is sent to the best matching agent.
";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    List,
    Run(&'a str),
    All,
    Create(&'a str),
    Save(&'a str),
    Route(&'a str),
    Coordinate(&'a str),
    Send { agent: &'a str, text: &'a str },
    Agents,
    Routes,
    Discover,
    Help,
    Quit,
    Ask(&'a str),
    Empty,
}

fn parse(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match (head.to_ascii_lowercase().as_str(), rest.is_empty()) {
        ("list", true) => Command::List,
        ("all", true) => Command::All,
        ("agents", true) => Command::Agents,
        ("routes", true) => Command::Routes,
        ("discover", true) => Command::Discover,
        ("help", true) => Command::Help,
        ("quit" | "exit", true) => Command::Quit,
        ("run", false) => Command::Run(rest),
        ("create", false) => Command::Create(rest),
        ("save", false) => Command::Save(rest),
        ("route", false) => Command::Route(rest),
        ("coordinate", false) => Command::Coordinate(rest),
        ("send", false) => match rest.split_once(':') {
            Some((agent, text)) if !agent.trim().is_empty() && !text.trim().is_empty() => {
                Command::Send {
                    agent: agent.trim(),
                    text: text.trim(),
                }
            }
            _ => Command::Ask(line),
        },
        _ => Command::Ask(line),
    }
}

async fn respond(switchboard: &Switchboard, command: Command<'_>) -> RouterResult<String> {
    Ok(match command {
        Command::List => switchboard.workflow_listing().await,
        Command::Run(name) => switchboard.execute(name).await?.report(),
        Command::All => switchboard
            .run_all()
            .await
            .iter()
            .map(|execution| execution.report())
            .collect(),
        Command::Create(description) => switchboard.run_dynamic(description).await.1.report(),
        Command::Save(description) => {
            let (definition, execution) = switchboard.run_dynamic(description).await;
            let name = definition.name.clone();
            switchboard.register_workflow(definition).await?;
            format!("{}Registered as '{}'\n", execution.report(), name)
        }
        Command::Route(query) => switchboard.explain(query).await?,
        Command::Coordinate(query) => format!("{}\n", switchboard.coordinate(query).await?),
        Command::Send { agent, text } => {
            format!("[{}] {}\n", agent, switchboard.send_to(agent, text).await?)
        }
        Command::Agents => switchboard.store_summary().await,
        Command::Routes => switchboard.routing_summary().await,
        Command::Discover => switchboard.discover_configured().await?.to_string(),
        Command::Help => HELP.to_string(),
        Command::Ask(query) => {
            let answer = switchboard.ask(query).await?;
            format!("[{}] {}\n", answer.decision.agent_name(), answer.text)
        }
        Command::Quit | Command::Empty => String::new(),
    })
}

/// Read commands until `quit` or end of input.
pub async fn run(switchboard: &Switchboard) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(HELP.as_bytes()).await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = parse(&line);
        if command == Command::Quit {
            break;
        }

        let output = match respond(switchboard, command).await {
            Ok(output) => output,
            // errors are shown and the session goes on
            Err(e) => format!("Error: {e}\n"),
        };
        stdout.write_all(output.as_bytes()).await?;
    }
    Ok(())
}
