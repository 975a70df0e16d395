//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::engine::{get_chat_engine, EngineParams};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, params: EngineParams, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'concierge doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    for missing in preflight::missing_indices(&settings) {
        Output::warning(&format!(
            "No {} index yet; run 'concierge generate' to build it.",
            missing
        ));
    }

    let agent = get_chat_engine(&settings, params, Vec::new())?;
    let spinner = Output::spinner("Thinking...");

    match agent.run(question).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::tool_call(&call.name, &call.arguments, call.ok);
                }
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            Err(e.into())
        }
    }
}
