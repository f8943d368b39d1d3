//! `sentinel status`

use anyhow::Context;

pub async fn execute(base_url: &str) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/failover/status", base_url.trim_end_matches('/'));

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("invalid status response")?;

    if !status.is_success() {
        anyhow::bail!("{} returned {}: {}", url, status, body);
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
