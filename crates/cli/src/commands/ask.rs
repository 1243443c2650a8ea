//! `gitscribe ask` — Run the agent once from the terminal.

use std::path::Path;

use gitscribe_agent::{AgentContext, AgentStreamEvent};
use tracing::warn;

pub async fn run(
    config_path: Option<&Path>,
    prompt: String,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("No prompt provided.".into());
    }

    let config = super::load_config(config_path)?;
    let context = AgentContext::initialize(config).await;
    let agent = context.agent().ok_or_else(|| context.unavailable_reason())?;

    if !stream {
        let run = agent.run(prompt).await;
        if !run.outcome.is_done() {
            warn!(outcome = %run.outcome, steps = run.steps, "Run ended abnormally");
        }
        println!("{}", run.answer);
        return Ok(());
    }

    let mut rx = agent.run_stream(prompt);
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Status { message } => eprintln!("  {message}"),
            AgentStreamEvent::Log { .. } => {}
            AgentStreamEvent::Complete {
                final_response,
                outcome,
                steps,
            } => {
                if outcome != "done" {
                    warn!(outcome = %outcome, steps, "Run ended abnormally");
                }
                println!("{final_response}");
            }
            AgentStreamEvent::Error { message } => return Err(message.into()),
        }
    }

    Ok(())
}
