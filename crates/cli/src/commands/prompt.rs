//! `gitscribe prompt` — Print the rendered system instruction.

use std::path::Path;

use gitscribe_agent::SystemInstruction;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let instruction = SystemInstruction::from_config(&config)?;
    println!("{instruction}");
    Ok(())
}
