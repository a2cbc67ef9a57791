//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Every stage downstream works on bytes (pdfium loads from a byte slice,
//! DOCX is a zip read from a cursor), so a download never touches disk.
//! The source name keeps the file name, which decides the document kind and
//! the output file names.

use crate::error::Doc2PagesError;
use tracing::{debug, info};

/// A document loaded into memory with the name it came from.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    /// Local path, or the last path segment of a URL.
    pub source_name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` from disk or over HTTP(S).
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, Doc2PagesError> {
    if input.trim().is_empty() {
        return Err(Doc2PagesError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<LoadedInput, Doc2PagesError> {
    let path = std::path::PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Doc2PagesError::PermissionDenied {
            path: path.clone(),
        },
        _ => Doc2PagesError::FileNotFound { path: path.clone() },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(LoadedInput {
        source_name: path_str.to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, Doc2PagesError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Doc2PagesError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Doc2PagesError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Doc2PagesError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Doc2PagesError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Doc2PagesError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedInput {
        source_name: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of `url`, percent-decoded; `downloaded.pdf` when the URL
/// has no usable file name.
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                let decoded = percent_encoding::percent_decode_str(last).decode_utf8_lossy();
                if !decoded.is_empty() && decoded.contains('.') {
                    return decoded.into_owned();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
