//! Fetch-extract worker: download one quarterly archive and pull out its index

use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::io::{Cursor, Read};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::errors::IndexError;
use crate::models::{Endpoint, FetchOutcome};

/// Archive entry holding the pipe-delimited filing index
pub const TARGET_ENTRY: &str = "master.idx";

/// Upper bound on buffer preallocation taken from sizes the remote declares
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

/// Fetch `endpoint` and write its `master.idx` entry into `save_dir`.
///
/// Always yields exactly one outcome; errors are carried inside it.
pub async fn fetch_index_file(
    client: &Client,
    endpoint: &Endpoint,
    save_dir: &Path,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::new(&endpoint.locator);
    match fetch_and_extract(client, endpoint, save_dir, &mut outcome.status).await {
        Ok(extracted) => outcome.extracted_bytes = extracted,
        Err(e) => outcome.error = Some(e),
    }
    outcome
}

async fn fetch_and_extract(
    client: &Client,
    endpoint: &Endpoint,
    save_dir: &Path,
    status: &mut Option<StatusCode>,
) -> Result<Option<u64>, IndexError> {
    // Created up front so permission problems surface before any network I/O
    let path = save_dir.join(endpoint.fragment_file_name());
    let mut out = File::create(&path)
        .await
        .map_err(|source| IndexError::CreateFragment {
            path: path.clone(),
            source,
        })?;

    debug!("Fetching index archive from: {}", endpoint.locator);
    let response = client.get(&endpoint.locator).send().await?;
    *status = Some(response.status());

    if response.status() != StatusCode::OK {
        return Err(IndexError::Status(response.status()));
    }

    let body = read_body(response).await?;
    debug!("Read {} archive bytes from {}", body.len(), endpoint.locator);

    let entry = tokio::task::spawn_blocking(move || extract_entry(&body, TARGET_ENTRY)).await??;

    match entry {
        Some(contents) => {
            out.write_all(&contents).await?;
            out.flush().await?;
            debug!("Wrote {} bytes to {}", contents.len(), path.display());
            Ok(Some(contents.len() as u64))
        }
        None => {
            warn!("No {} entry in archive {}", TARGET_ENTRY, endpoint.locator);
            Ok(None)
        }
    }
}

/// Buffer capacity for a declared length; the declaration is only a hint
fn prealloc_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC_BYTES) as usize
}

/// Collect the response body into a buffer sized from `Content-Length` when known
async fn read_body(response: Response) -> Result<Vec<u8>, IndexError> {
    let capacity = prealloc_capacity(response.content_length().unwrap_or(0));
    let mut body = Vec::with_capacity(capacity);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

/// Decompress the entry called `name` from an in-memory ZIP archive.
///
/// Returns `Ok(None)` when the archive is readable but has no such entry.
pub fn extract_entry(archive: &[u8], name: &str) -> Result<Option<Vec<u8>>, IndexError> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.name() != name {
            continue;
        }
        let mut contents = Vec::with_capacity(prealloc_capacity(file.size()));
        file.read_to_end(&mut contents)?;
        return Ok(Some(contents));
    }

    Ok(None)
}
