use std::path::Path;

use anyhow::Context;
use log::info;

/// Downloads `url` into `output`, replacing it if it exists.
///
/// # Returns
/// The amount of bytes written, or an error on a failed request, a non success status
/// or a failed write.
pub async fn fetch(url: &str, output: &Path) -> anyhow::Result<usize> {
    info!("fetching {url}");

    let response = reqwest::get(url)
        .await
        .with_context(|| format!("cannot reach {url}"))?
        .error_for_status()
        .with_context(|| format!("bad response from {url}"))?;

    let body = response
        .bytes()
        .await
        .with_context(|| format!("cannot read the body of {url}"))?;

    tokio::fs::write(output, &body)
        .await
        .with_context(|| format!("cannot write {}", output.display()))?;

    info!("wrote {} bytes to {}", body.len(), output.display());
    Ok(body.len())
}
