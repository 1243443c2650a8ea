//! `gitscribe status` — Show the effective configuration.

use std::path::Path;

use gitscribe_config::AppConfig;

fn presence(value: bool) -> &'static str {
    if value { "set" } else { "missing" }
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    println!("gitscribe status");
    println!("================");
    println!("  Config file:  {}", file.display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.model());
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", presence(config.has_api_key()));
    println!(
        "  Repository:   {}",
        config.repository.name.as_deref().unwrap_or("<not configured>")
    );
    println!("  Branch:       {}", config.repository.branch);
    println!("  GitHub API:   {}", config.repository.api_url);
    println!("  Token:        {}", presence(config.repository.token.is_some()));
    println!("  Template:     {}", config.layout.template_path);
    for (category, dir) in &config.layout.directories {
        println!("    {category:<12} -> {dir}");
    }
    println!("  Max steps:    {}", config.agent.max_steps);
    println!(
        "  Instructions: {}",
        config
            .agent
            .instructions_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".into())
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    if file.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file; using defaults and environment");
    }

    Ok(())
}
