mod parse;
mod types;

pub use parse::parse_apkindex;
pub use types::{IndexRequest, PackageRecord, RepositoryIndex};

use crate::{Result, TrimError};
use flate2::read::MultiGzDecoder;
use std::io::{Cursor, Read};
use std::time::Instant;
use tar::Archive;
use tracing::{debug, info, warn};

/// Somewhere repository indexes can be loaded from.
pub trait IndexSource {
    fn fetch(&self, repository: &str, arch: &str) -> Result<RepositoryIndex>;
}

pub struct HttpIndexSource {
    client: reqwest::blocking::Client,
}

impl HttpIndexSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pkgtrim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TrimError::Configuration {
                reason: format!("failed to build HTTP client: {}", err),
            })?;

        Ok(HttpIndexSource { client })
    }
}

impl IndexSource for HttpIndexSource {
    fn fetch(&self, repository: &str, arch: &str) -> Result<RepositoryIndex> {
        let url = index_url(repository, arch);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| TrimError::Http {
                url: url.clone(),
                source,
            })?;

        let bytes = response
            .error_for_status()
            .map_err(|source| TrimError::Http {
                url: url.clone(),
                source,
            })?
            .bytes()
            .map_err(|source| TrimError::Http {
                url: url.clone(),
                source,
            })?;

        debug!(
            "downloaded {} ({} bytes) in {:.3}s",
            url,
            bytes.len(),
            started.elapsed().as_secs_f64()
        );

        let mut index = read_index_archive(&url, &bytes)?;
        index.url = repository.to_string();
        Ok(index)
    }
}

pub fn index_url(repository: &str, arch: &str) -> String {
    format!("{}/{}/APKINDEX.tar.gz", repository.trim_end_matches('/'), arch)
}

/// Reads the `APKINDEX` member out of an `APKINDEX.tar.gz` payload.
///
/// Signed indexes are several gzip members back to back; the signature
/// segment is skipped without verification.
pub fn read_index_archive(url: &str, data: &[u8]) -> Result<RepositoryIndex> {
    let decoder = MultiGzDecoder::new(Cursor::new(data));
    let mut archive = Archive::new(decoder);

    let entries = archive.entries().map_err(|source| TrimError::Archive {
        url: url.to_string(),
        source,
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| TrimError::Archive {
            url: url.to_string(),
            source,
        })?;

        let is_index = entry
            .path()
            .map(|path| path.as_os_str() == "APKINDEX")
            .unwrap_or(false);

        if !is_index {
            continue;
        }

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|source| TrimError::Archive {
                url: url.to_string(),
                source,
            })?;

        return Ok(RepositoryIndex {
            url: url.to_string(),
            packages: parse_apkindex(&text),
        });
    }

    Err(TrimError::IndexFormat {
        url: url.to_string(),
        reason: "archive has no APKINDEX entry".into(),
    })
}

/// Loads every repository in `request`, skipping the ones that fail.
///
/// Fails only when the repository list is empty or nothing could be loaded.
pub fn fetch_indexes(
    request: &IndexRequest,
    source: &dyn IndexSource,
) -> Result<Vec<RepositoryIndex>> {
    if request.repositories.is_empty() {
        return Err(TrimError::Configuration {
            reason: "no repositories specified".into(),
        });
    }

    if !request.keys.is_empty() {
        debug!(
            "signature verification disabled; ignoring {} signing key(s)",
            request.keys.len()
        );
    }

    let mut indexes = Vec::new();
    let mut failures = Vec::new();

    for repository in &request.repositories {
        match source.fetch(repository, &request.arch) {
            Ok(index) => {
                info!(
                    "loaded {} packages from {} ({})",
                    index.packages.len(),
                    repository,
                    request.arch
                );
                indexes.push(index);
            }
            Err(err) => {
                warn!("skipping repository {}: {}", repository, err);
                failures.push(err.to_string());
            }
        }
    }

    if indexes.is_empty() {
        return Err(TrimError::Fetch {
            reason: failures.join("; "),
        });
    }

    Ok(indexes)
}

/// Drops repository entries that cannot be fetched over HTTP: tagged local
/// repositories (`@local /path`), `file://` URLs and bare paths.
pub fn filter_repositories(repos: &[String]) -> Vec<String> {
    repos
        .iter()
        .filter(|repo| !repo.starts_with('@'))
        .filter(|repo| repo.starts_with("http://") || repo.starts_with("https://"))
        .cloned()
        .collect()
}

/// Maps toolchain architecture names onto APK ones.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "amd64" => "x86_64".to_string(),
        "arm64" => "aarch64".to_string(),
        other => other.to_string(),
    }
}
