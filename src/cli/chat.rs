//! CLI `chat` command: the interactive prompt.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};

use jotter::agent::{prompt, Agent, OpenAiCompatibleModel};
use jotter::config::JotterConfig;
use jotter::context::ContextLog;
use jotter::store::HybridStore;
use jotter::tools::ToolRegistry;

const HELP: &str = "
Commands:
  /quit   - Exit the assistant
  /reset  - Clear conversation history
  /help   - Show this help message

Just type naturally to interact with your assistant.
Examples:
  - \"Add a task to review the quarterly report\"
  - \"What do I have to do today?\"
  - \"Mark the grocery task as done\"
  - \"I prefer to work on hard tasks in the morning\"
";

enum Input {
    Quit,
    Reset,
    Help,
    Skip,
    Message(String),
}

fn classify(line: &str) -> Input {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Skip,
        "/quit" => Input::Quit,
        "/reset" => Input::Reset,
        "/help" => Input::Help,
        _ => Input::Message(line.to_string()),
    }
}

/// Wire the stores, tools, prompt and model together for one session.
fn build_agent(config: &JotterConfig) -> Result<Agent> {
    let backend = super::open_backend(config)?;
    let items = HybridStore::new(backend.clone(), &config.storage.items_collection);
    let context = ContextLog::new(HybridStore::new(backend, &config.storage.context_collection));

    let global_context = context
        .prepare_session()
        .context("failed to load global context")?;
    let template = prompt::load_template(config.agent.system_prompt_path.as_deref())?;
    let system_prompt = prompt::render(&template, Local::now(), &global_context);

    let tools = Arc::new(ToolRegistry::new(items, context));
    let model = Arc::new(OpenAiCompatibleModel::new(&config.llm)?);
    Ok(Agent::new(model, tools, system_prompt, config.agent.max_tool_rounds))
}

pub async fn run(config: &JotterConfig) -> Result<()> {
    let mut agent = build_agent(config)?;

    println!("Jotter");
    println!("{}", "=".repeat(40));
    println!("Type your message and press Enter.");
    println!("Commands: /quit, /reset, /help");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!("\nGoodbye!");
            break;
        };

        match classify(&line) {
            Input::Skip => continue,
            Input::Quit => {
                println!("Goodbye!");
                break;
            }
            Input::Reset => {
                agent.reset();
                println!("Conversation reset.");
            }
            Input::Help => println!("{HELP}"),
            Input::Message(text) => {
                tokio::select! {
                    result = agent.chat(&text) => match result {
                        Ok(response) => println!("\nAssistant: {response}\n"),
                        Err(e) => {
                            tracing::error!(error = %e, "turn failed");
                            println!("\nError: {e}\n");
                        }
                    },
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nGoodbye!");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
