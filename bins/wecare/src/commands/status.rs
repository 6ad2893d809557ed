//! Configuration and session overview

use crate::context::Context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;

/// Show where the client points and whether a session is held
pub async fn run(ctx: &Context) -> Result<()> {
    let config = ctx.client.config();
    let session = ctx.client.session();
    let authenticated = session.initialize().await;
    let user = session.user();

    if ctx.json() {
        let output = json!({
            "base_url": config.base_url,
            "environment": config.environment,
            "timeout_secs": config.timeout.as_secs(),
            "config_file": ctx.config_path.as_ref().map(|p| p.display().to_string()),
            "storage": ctx.storage_path.display().to_string(),
            "authenticated": authenticated,
            "user": user,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {}", "WeCare Client Status".blue().bold());
    println!();
    println!("  Base URL:     {}", config.base_url);
    println!("  Environment:  {:?}", config.environment);
    println!("  Timeout:      {}s", config.timeout.as_secs());
    match &ctx.config_path {
        Some(path) => println!("  Config file:  {}", path.display()),
        None => println!("  Config file:  {}", "(none)".dimmed()),
    }
    println!("  Storage:      {}", ctx.storage_path.display());

    match user {
        Some(user) if authenticated => println!(
            "  Session:      {} {} [{}]",
            "✓".green(),
            user.email,
            user.role
        ),
        _ => println!("  Session:      {}", "not logged in".yellow()),
    }
    println!();

    Ok(())
}
