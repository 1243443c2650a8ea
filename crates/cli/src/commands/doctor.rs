//! `gitscribe doctor` — Diagnose credentials and connectivity.

use std::path::Path;

use gitscribe_agent::AgentContext;
use gitscribe_config::AppConfig;
use gitscribe_core::provider::Provider;

const MODEL_ISSUE: &str = "Model unavailable";
const REPOSITORY_ISSUE: &str = "Repository unavailable";

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("gitscribe doctor");
    println!("================\n");

    let mut issues = 0;

    let file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if file.exists() {
        println!("  ✅ Config file found at {}", file.display());
    } else {
        println!("  ⚠️  No config file at {}; using defaults and environment", file.display());
    }

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running further checks.");
            return Ok(());
        }
    };

    let key_missing = !config.has_api_key();
    if key_missing {
        println!("  ❌ No model API key; set GOOGLE_API_KEY or api_key in config.toml");
        issues += 1;
    } else {
        println!("  ✅ Model API key configured");
    }

    let repository_missing = !config.repository_configured();
    if repository_missing {
        println!("  ❌ Repository not configured; set GITHUB_TOKEN and GITHUB_REPO_NAME");
        issues += 1;
    } else {
        println!("  ✅ Repository credentials configured");
    }

    let context = AgentContext::initialize(config).await;
    if let Some(info) = context.connection() {
        println!(
            "  ✅ Connected to {} as {} (branch {})",
            info.repository, info.login, info.branch
        );
        if !info.branch_exists {
            println!("  ⚠️  Branch '{}' does not exist yet", info.branch);
            issues += 1;
        }
    }
    for issue in unreported_issues(context.issues(), key_missing, repository_missing) {
        println!("  ❌ {issue}");
        issues += 1;
    }

    if let Some(provider) = context.provider() {
        match check_provider(provider.as_ref()).await {
            Ok(line) => println!("  ✅ {line}"),
            Err(line) => {
                println!("  ❌ {line}");
                issues += 1;
            }
        }
    }
    if context.agent().is_some() {
        println!("  ✅ Agent ready with {} tools", context.tools().len());
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Startup issues not already explained by the credential checks.
fn unreported_issues(
    issues: &[String],
    key_missing: bool,
    repository_missing: bool,
) -> impl Iterator<Item = &str> {
    issues.iter().map(String::as_str).filter(move |issue| {
        !(key_missing && issue.starts_with(MODEL_ISSUE)
            || repository_missing && issue.starts_with(REPOSITORY_ISSUE))
    })
}

async fn check_provider(provider: &dyn Provider) -> Result<String, String> {
    match provider.health_check().await {
        Ok(true) => Ok(format!("Model provider '{}' reachable", provider.name())),
        Ok(false) => Err(format!(
            "Model provider '{}' rejected the health check",
            provider.name()
        )),
        Err(e) => Err(format!("Model provider '{}' unreachable: {e}", provider.name())),
    }
}
