use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use super::{CatalogError, ClipMetadata, MediaCatalog};
use crate::config::{Config, ConfigError};

const API_KEY_HEADER: &str = "X-API-Key";

/// Video Jungle catalog over HTTP.
pub struct HttpCatalog {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    download_timeout: Duration,
}

impl HttpCatalog {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.request_timeout()))
            .build()
            .into();
        Ok(Self::with_agent(agent, &config.api_url, &api_key, config.download_timeout()))
    }

    pub fn with_agent(agent: ureq::Agent, api_url: &str, api_key: &str, download_timeout: Duration) -> Self {
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            download_timeout,
        }
    }

    fn metadata_url(&self, video_id: &str) -> String {
        format!("{}/video-file/{}", self.api_url, video_id)
    }
}

impl MediaCatalog for HttpCatalog {
    fn get_metadata(&self, video_id: &str) -> Result<ClipMetadata, CatalogError> {
        let url = self.metadata_url(video_id);
        log::debug!("GET {url}");

        let mut response = self
            .agent
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .call()
            .map_err(|e| classify(e, video_id))?;

        let mut metadata: ClipMetadata = response
            .body_mut()
            .read_json()
            .map_err(|e| CatalogError::InvalidResponse(format!("metadata for {video_id}: {e}")))?;
        if metadata.id.is_empty() {
            metadata.id = video_id.to_string();
        }
        Ok(metadata)
    }

    fn download(&self, clip: &ClipMetadata, destination: &Path) -> Result<PathBuf, CatalogError> {
        let url = clip
            .download_url
            .as_deref()
            .ok_or_else(|| CatalogError::NotFound(clip.id.clone()))?;

        let response = self
            .agent
            .get(url)
            .config()
            .timeout_global(Some(self.download_timeout))
            .build()
            .call()
            .map_err(|e| classify(e, &clip.id))?;

        // Stream into a sibling temp file; only a complete body replaces the
        // destination.
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        let mut body = response.into_body().into_reader();
        let bytes = std::io::copy(&mut body, &mut tmp).map_err(|e| {
            CatalogError::Transport(format!("download of {} interrupted: {e}", clip.id))
        })?;
        tmp.persist(destination).map_err(|e| CatalogError::Io(e.error))?;

        log::debug!("Wrote {bytes} bytes to {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

fn classify(error: ureq::Error, video_id: &str) -> CatalogError {
    match error {
        ureq::Error::StatusCode(404) => CatalogError::NotFound(video_id.to_string()),
        ureq::Error::StatusCode(status) => CatalogError::Status {
            status,
            video_id: video_id.to_string(),
        },
        other => CatalogError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    struct Route {
        path: String,
        status: u16,
        body: Vec<u8>,
    }

    /// Serve the routes built by `routes` (which receives the server's base
    /// URL) over `requests` connections and return the request heads seen.
    fn serve<F>(routes: F, requests: usize) -> (String, JoinHandle<Vec<String>>)
    where
        F: FnOnce(&str) -> Vec<Route>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = routes(&base);
        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    head.push_str(&line);
                }
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|r| r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((404, b"{}".to_vec()));
                write!(
                    stream,
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )
                .unwrap();
                stream.write_all(&body).unwrap();
                stream.flush().unwrap();
                heads.push(head);
            }
            heads
        });
        (base, handle)
    }

    fn catalog(base: &str) -> HttpCatalog {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .proxy(None)
            .build()
            .into();
        HttpCatalog::with_agent(agent, &format!("{base}/"), "secret-key", Duration::from_secs(5))
    }

    const MP4_STUB: &[u8] = b"\x00\x00\x00\x18ftypmp42";

    #[test]
    fn fetches_metadata_and_downloads() {
        let (base, handle) = serve(
            |base| {
                let metadata = format!(
                    r#"{{"name": "Beach", "fps": 29.97, "download_url": "{base}/files/abc.mp4", "extra": 1}}"#
                );
                vec![
                    Route { path: "/video-file/abc".into(), status: 200, body: metadata.into_bytes() },
                    Route { path: "/files/abc.mp4".into(), status: 200, body: MP4_STUB.to_vec() },
                ]
            },
            2,
        );
        let catalog = catalog(&base);

        let metadata = catalog.get_metadata("abc").unwrap();
        assert_eq!(metadata.id, "abc");
        assert_eq!(metadata.name.as_deref(), Some("Beach"));
        assert_eq!(metadata.frame_rate, Some(29.97));

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Beach.mp4");
        std::fs::write(&dest, "old").unwrap();
        let written = catalog.download(&metadata, &dest).unwrap();
        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), MP4_STUB);

        let heads = handle.join().unwrap();
        assert!(heads[0].starts_with("GET /video-file/abc "));
        assert!(heads[0].to_ascii_lowercase().contains("x-api-key: secret-key"));
        assert!(heads[1].starts_with("GET /files/abc.mp4 "));
    }

    #[test]
    fn failed_download_leaves_destination_alone() {
        let (base, handle) = serve(|_| Vec::new(), 1);
        let metadata = ClipMetadata {
            id: "abc".into(),
            name: None,
            frame_rate: None,
            download_url: Some(format!("{base}/files/abc.mp4")),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abc.mp4");

        let err = catalog(&base).download(&metadata, &dest).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        handle.join().unwrap();
    }

    #[test]
    fn missing_clip_maps_to_not_found() {
        let (base, handle) = serve(|_| Vec::new(), 1);
        let err = catalog(&base).get_metadata("nope").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref id) if id == "nope"));
        handle.join().unwrap();
    }

    #[test]
    fn server_errors_are_transient() {
        let (base, handle) = serve(
            |_| vec![Route { path: "/video-file/abc".into(), status: 503, body: Vec::new() }],
            1,
        );
        let err = catalog(&base).get_metadata("abc").unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));
        assert!(err.is_transient());
        handle.join().unwrap();
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let (base, handle) = serve(
            |_| vec![Route { path: "/video-file/abc".into(), status: 200, body: b"<html>".to_vec() }],
            1,
        );
        let err = catalog(&base).get_metadata("abc").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidResponse(_)));
        assert!(!err.is_transient());
        handle.join().unwrap();
    }

    #[test]
    fn transport_errors_are_transient() {
        let err = classify(
            ureq::Error::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            "abc",
        );
        assert!(err.is_transient());
    }

    #[test]
    fn new_requires_api_key() {
        assert!(matches!(
            HttpCatalog::new(&Config::default()),
            Err(ConfigError::MissingApiKey)
        ));
        let config = Config { api_key: Some("k".into()), ..Config::default() };
        let catalog = HttpCatalog::new(&config).unwrap();
        assert_eq!(catalog.metadata_url("abc"), "https://api.video-jungle.com/video-file/abc");
    }
}
