//! Model downloader for pretrained ONNX exports.
//!
//! Fetches a registry model's files from HuggingFace into the local cache
//! when they are not already present.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{GeneratorError, Result};

use super::loader::{missing_model_files, OPTIONAL_MODEL_FILES};
use super::registry::PretrainedModel;

/// Chunk size for streamed downloads.
const CHUNK_SIZE: usize = 64 * 1024;

/// Per-request timeout. Decoder files are several hundred MB.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Downloads every missing required file for `model` into `model_dir`.
///
/// Returns Ok(()) if all files exist or were successfully downloaded.
/// Optional files are fetched best-effort.
pub fn ensure_models(model_dir: &Path, model: &PretrainedModel) -> Result<()> {
    fs::create_dir_all(model_dir).map_err(|e| {
        GeneratorError::model_download_failed(format!(
            "Failed to create model directory {}: {}",
            model_dir.display(),
            e
        ))
    })?;

    let missing = missing_model_files(model_dir);
    if missing.is_empty() {
        tracing::debug!(dir = %model_dir.display(), "all model files present");
        return Ok(());
    }

    tracing::info!(
        model = model.name,
        count = missing.len(),
        "downloading missing model files (this may take several minutes on first run)"
    );

    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| {
            GeneratorError::model_download_failed(format!("Failed to create HTTP client: {}", e))
        })?;

    for file in &missing {
        let url = model.url_for(file).ok_or_else(|| {
            GeneratorError::model_download_failed(format!("No download URL for {}", file))
        })?;
        download_file_streaming(&client, url, &model_dir.join(file))?;
    }

    for file in OPTIONAL_MODEL_FILES {
        let dest = model_dir.join(file);
        if dest.exists() {
            continue;
        }
        if let Some(url) = model.url_for(file) {
            if let Err(e) = download_file_streaming(&client, url, &dest) {
                tracing::warn!(file = *file, error = %e, "optional model file not downloaded");
            }
        }
    }

    tracing::info!(model = model.name, "model files downloaded");
    Ok(())
}

/// Streams `url` into `dest` through a `.part` file.
fn download_file_streaming(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
) -> Result<()> {
    let filename = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(file = %filename, "downloading");

    let mut response = client.get(url).send().map_err(|e| {
        GeneratorError::model_download_failed(format!("Failed to download {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(GeneratorError::model_download_failed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let partial = dest.with_extension("part");

    let mut file = fs::File::create(&partial).map_err(|e| {
        GeneratorError::model_download_failed(format!(
            "Failed to create file {}: {}",
            partial.display(),
            e
        ))
    })?;

    let mut downloaded: u64 = 0;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut last_progress = 0;

    loop {
        let bytes_read = response.read(&mut buffer).map_err(|e| {
            GeneratorError::model_download_failed(format!("Failed to read response: {}", e))
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).map_err(|e| {
            GeneratorError::model_download_failed(format!("Failed to write file: {}", e))
        })?;

        downloaded += bytes_read as u64;

        if total_size > 0 {
            let progress = (downloaded * 100 / total_size) as usize;
            if progress >= last_progress + 10 {
                tracing::debug!(file = %filename, progress, "download progress");
                last_progress = progress;
            }
        }
    }

    fs::rename(&partial, dest).map_err(|e| {
        GeneratorError::model_download_failed(format!(
            "Failed to move {} into place: {}",
            partial.display(),
            e
        ))
    })?;

    let size_mb = downloaded as f64 / (1024.0 * 1024.0);
    tracing::info!(file = %filename, size_mb = format!("{:.1}", size_mb), "download complete");

    Ok(())
}
