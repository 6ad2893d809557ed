//! Raw API calls through the session layer

use super::print_json;
use crate::context::Context;
use anyhow::{Context as _, Result};
use serde_json::Value;

async fn restore(ctx: &Context) {
    // Unauthenticated calls are still allowed; the server decides.
    ctx.client.session().initialize().await;
}

/// GET an endpoint
pub async fn get(ctx: &Context, endpoint: &str) -> Result<()> {
    restore(ctx).await;
    let value: Value = ctx.client.get(endpoint).await?;
    print_json(&value, ctx.json())
}

/// POST a JSON body
pub async fn post(ctx: &Context, endpoint: &str, data: &str) -> Result<()> {
    let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;

    restore(ctx).await;
    let value: Value = ctx.client.post(endpoint, &body).await?;
    print_json(&value, ctx.json())
}

/// DELETE an endpoint
pub async fn delete(ctx: &Context, endpoint: &str) -> Result<()> {
    restore(ctx).await;
    let value: Value = ctx.client.delete(endpoint).await?;
    print_json(&value, ctx.json())
}
