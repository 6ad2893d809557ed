//! login, logout and whoami

use crate::context::Context;
use anyhow::Result;
use owo_colors::OwoColorize;
use wecare_api_client::Principal;

/// Sign in and persist the session
pub async fn login(ctx: &Context, email: &str, password: &str) -> Result<()> {
    let user = ctx.client.session().login(email, password).await?;

    if ctx.json() {
        println!("{}", serde_json::to_string(&user)?);
    } else {
        println!("{} Signed in as {}", "✓".green(), describe(&user).bold());
    }
    Ok(())
}

/// Forget the persisted session
pub fn logout(ctx: &Context) -> Result<()> {
    ctx.client.session().logout();

    if !ctx.json() {
        println!("{} Signed out", "✓".green());
    }
    Ok(())
}

/// Restore and verify the persisted session, then show the user
pub async fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.client.session();
    let user = if session.initialize().await {
        session.user()
    } else {
        None
    };

    match (user, ctx.json()) {
        (Some(user), true) => println!("{}", serde_json::to_string(&user)?),
        (Some(user), false) => println!("{}", describe(&user)),
        (None, true) => println!("null"),
        (None, false) => println!("{}", "Not logged in".yellow()),
    }
    Ok(())
}

fn describe(user: &Principal) -> String {
    format!("{} <{}> [{}]", user.name, user.email, user.role)
}
