//! JSON downloads backed by a file cache.
//!
//! A cached document younger than the freshness window is returned without
//! touching the network. Otherwise the URL is fetched once; on success the body
//! replaces the cache file, on failure whatever is cached is returned regardless
//! of its age.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::app;

/// Errors from [`fetch_cached`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The download failed and there was nothing cached to fall back to.
    #[error("Failed to download data from {url} and no cache is available at {}", path.display())]
    Download {
        url: String,
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },
    #[error("Cached data at {} is not valid JSON: {source}", path.display())]
    CorruptCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Response from {url} is not valid JSON: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where a [`Cached`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Cache file within the freshness window; no request was made.
    Fresh,
    /// Downloaded just now and written to the cache file.
    Network,
    /// The download failed; the cache file was older than the freshness window.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Cached {
    pub value: Value,
    pub source: CacheSource,
}

/// HTTP client for catalog downloads. Follows redirects.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("{}/{}", app::NAME, app::VERSION))
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Fetch `url` as JSON through the cache file at `path`.
/// Staleness is not reported; see [`fetch_cached`].
pub async fn fetch_cached_json(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    freshness: Duration,
    key: &str,
) -> Result<Value, FetchError> {
    fetch_cached(client, url, path, freshness, key)
        .await
        .map(|cached| cached.value)
}

/// Fetch `url` as JSON through the cache file at `path`, reporting where the value came from.
///
/// The parent directory of `path` is created first. The request carries
/// `Authorization: Bearer <key>`.
pub async fn fetch_cached(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    freshness: Duration,
    key: &str,
) -> Result<Cached, FetchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if let Some(age) = cache_age(path)
        && age < freshness
    {
        log::debug!("Using cached {} ({}s old)", path.display(), age.as_secs());
        return Ok(Cached {
            value: read_cache(path)?,
            source: CacheSource::Fresh,
        });
    }

    log::info!("Downloading {}", url);
    match download(client, url, key).await {
        Ok(body) => {
            let value = serde_json::from_slice(&body).map_err(|source| {
                FetchError::InvalidResponse {
                    url: url.to_string(),
                    source,
                }
            })?;
            write_cache(path, &body)?;
            Ok(Cached {
                value,
                source: CacheSource::Network,
            })
        }
        Err(source) if path.is_file() => {
            log::warn!(
                "Failed to download {}: {}; using cached {}",
                url,
                source,
                path.display()
            );
            Ok(Cached {
                value: read_cache(path)?,
                source: CacheSource::Stale,
            })
        }
        Err(source) => Err(FetchError::Download {
            url: url.to_string(),
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// One GET. Non-2xx statuses are errors.
async fn download(
    client: &reqwest::Client,
    url: &str,
    key: &str,
) -> Result<Vec<u8>, reqwest::Error> {
    let response = client
        .get(url)
        .bearer_auth(key)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Age of the cache file by modification time; `None` when there is no file.
/// A modification time in the future counts as zero age.
fn cache_age(path: &Path) -> Option<Duration> {
    let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
    let modified = meta.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

/// Replace the cache file through a sibling temp file, so readers never see a partial write.
fn write_cache(path: &Path, body: &[u8]) -> Result<(), FetchError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = fs::write(&tmp, body).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result.map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_cache(path: &Path) -> Result<Value, FetchError> {
    let data = fs::read(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| FetchError::CorruptCache {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    fn client() -> reqwest::Client {
        http_client(Some(Duration::from_secs(5))).unwrap()
    }

    fn make_stale(path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
            .unwrap();
    }

    /// Nothing listens on port 1, so connecting fails immediately.
    const UNREACHABLE: &str = "http://127.0.0.1:1/models";

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": []}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": [{"id": "cached"}]}"#).unwrap();

        let cached = fetch_cached(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        mock.assert_calls(0);
        assert_eq!(cached.source, CacheSource::Fresh);
        assert_eq!(cached.value, json!({"data": [{"id": "cached"}]}));
    }

    #[tokio::test]
    async fn download_is_persisted_verbatim() {
        let body = r#"{"data":[{"id":"llama-v3-70b","architecture":{"modality":"text->text"}}]}"#;
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/models")
                .header("authorization", "Bearer fw-key");
            then.status(200)
                .header("content-type", "application/json")
                .body(body);
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("user").join("models.json");

        let cached = fetch_cached(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(cached.source, CacheSource::Network);
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, cached.value);
    }

    #[tokio::test]
    async fn stale_cache_is_refreshed_when_online() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": [{"id": "new"}]}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": [{"id": "old"}]}"#).unwrap();
        make_stale(&path);

        let value = fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(value, json!({"data": [{"id": "new"}]}));
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, value);
    }

    #[tokio::test]
    async fn stale_cache_served_on_server_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(503).body("unavailable");
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": [{"id": "old"}]}"#).unwrap();
        make_stale(&path);

        let cached = fetch_cached(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(cached.source, CacheSource::Stale);
        assert_eq!(cached.value, json!({"data": [{"id": "old"}]}));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"{"data": [{"id": "old"}]}"#
        );
    }

    #[tokio::test]
    async fn stale_cache_served_when_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": []}"#).unwrap();
        make_stale(&path);

        let value = fetch_cached_json(&client(), UNREACHABLE, &path, HOUR, "fw-key")
            .await
            .unwrap();

        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn no_cache_and_no_network_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("models.json");

        let err = fetch_cached_json(&client(), UNREACHABLE, &path, HOUR, "fw-key")
            .await
            .unwrap_err();

        match &err {
            FetchError::Download { url, path: p, .. } => {
                assert_eq!(url, UNREACHABLE);
                assert_eq!(p, &path);
            }
            other => panic!("expected Download, got {:?}", other),
        }
        assert!(err.to_string().contains(&path.display().to_string()));
        // The directory is created even though nothing was written.
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn no_cache_and_http_error_is_a_download_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(401).json_body(json!({"error": "unauthorized"}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");

        let err = fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "bad")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Download { .. }), "got {:?}", err);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn corrupt_fresh_cache_is_fatal() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": []}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, "{not json").unwrap();

        let err = fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap_err();

        mock.assert_calls(0);
        assert!(matches!(err, FetchError::CorruptCache { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn corrupt_stale_cache_is_fatal_when_offline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, "{not json").unwrap();
        make_stale(&path);

        let err = fetch_cached_json(&client(), UNREACHABLE, &path, HOUR, "fw-key")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::CorruptCache { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn non_json_response_is_not_cached() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).body("<html>maintenance</html>");
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": []}"#).unwrap();
        make_stale(&path);

        let err = fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidResponse { .. }), "got {:?}", err);
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"data": []}"#);
    }

    #[tokio::test]
    async fn cache_write_failure_is_fatal() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": []}));
        });
        let dir = tempfile::tempdir().unwrap();
        // A directory where the cache file should be cannot be replaced by a file.
        let path = dir.path().join("models.json");
        fs::create_dir(&path).unwrap();

        let err = fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap_err();

        mock.assert_calls(1);
        match &err {
            FetchError::Io { path: p, .. } => assert_eq!(p, &path),
            other => panic!("expected Io, got {:?}", other),
        }
        assert!(!dir.path().join("models.json.tmp").exists());
    }

    #[tokio::test]
    async fn download_leaves_no_temp_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": []}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");

        fetch_cached_json(&client(), &server.url("/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["models.json"]);
    }

    #[tokio::test]
    async fn redirects_are_followed() {
        let server = MockServer::start();
        let moved = server.mock(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(301).header("Location", server.url("/v2/models"));
        });
        let target = server.mock(|when, then| {
            when.method(GET).path("/v2/models");
            then.status(200).json_body(json!({"data": [{"id": "moved"}]}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");

        let value = fetch_cached_json(&client(), &server.url("/v1/models"), &path, HOUR, "fw-key")
            .await
            .unwrap();

        moved.assert_calls(1);
        target.assert_calls(1);
        assert_eq!(value, json!({"data": [{"id": "moved"}]}));
    }

    #[tokio::test]
    async fn zero_freshness_always_refetches() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({"data": [{"id": "new"}]}));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(&path, r#"{"data": []}"#).unwrap();

        let cached = fetch_cached(&client(), &server.url("/models"), &path, Duration::ZERO, "k")
            .await
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(cached.source, CacheSource::Network);
    }
}
