//! Audio retrieval over HTTP.

use std::sync::Arc;

use super::job::TransferProgress;
use super::loader::{decode_bytes, AudioData, AudioError};

/// Download `url` and decode it, reporting byte progress.
///
/// Runs its own single-threaded runtime, so it must be called from a worker
/// thread rather than from inside another async runtime.
pub fn fetch_audio(url: &str, progress: &Arc<TransferProgress>) -> Result<AudioData, AudioError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bytes = runtime.block_on(download(url, progress))?;
    decode_bytes(bytes, url_extension(url))
}

async fn download(url: &str, progress: &TransferProgress) -> Result<Vec<u8>, AudioError> {
    let transfer = |e: reqwest::Error| AudioError::Transfer(e.to_string());

    let mut response = reqwest::get(url).await.map_err(transfer)?;
    let status = response.status().as_u16();
    if status >= 400 {
        return Err(AudioError::HttpStatus(status));
    }

    let total = response.content_length();
    progress.set_total(total);
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await.map_err(transfer)? {
        progress.advance(chunk.len() as u64);
        bytes.extend_from_slice(&chunk);
    }
    log::debug!("Downloaded {} bytes from {url}", bytes.len());
    Ok(bytes)
}

/// File extension of the last path component, ignoring query and fragment.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
