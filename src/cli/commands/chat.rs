//! Interactive chat command.

use crate::agent::{AgentEvent, EventHandler};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::engine::{get_chat_engine, EngineParams};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Prints a marker line for each tool the agent calls.
struct ConsoleHandler;

impl EventHandler for ConsoleHandler {
    fn on_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolCall { name, .. } => {
                print!("{}", style(format!("  [{}] ", name)).dim());
                io::stdout().flush().ok();
            }
            AgentEvent::ToolResult { ok, .. } => {
                if *ok {
                    println!("{}", style("✓").green());
                } else {
                    println!("{}", style("✗").red());
                }
            }
            _ => {}
        }
    }
}

/// Run the interactive chat command.
pub async fn run_chat(params: EngineParams, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'concierge doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let console: Arc<dyn EventHandler> = Arc::new(ConsoleHandler);
    let mut agent = get_chat_engine(&settings, params, vec![console])?;

    println!("\n{}", style("Concierge Chat").bold().cyan());
    println!(
        "{}",
        style(format!("{} tools on {}", agent.tools().len(), agent.model())).dim()
    );
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            agent.reset();
            Output::info("Conversation history cleared.");
            continue;
        }

        match agent.chat(input).await {
            Ok(response) => {
                println!("\n{} {}\n", style("Concierge:").cyan().bold(), response.content);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
