// SPDX-License-Identifier: AGPL-3.0-or-later
//! Protocol client
//!
//! One request per operation, no retries. Response statuses are translated
//! into [`HfsError`] values for the caller to act on.

use bytes::Bytes;
use hfs_core::{HfsError, HfsResult, ResourcePath};
use reqwest::{Client, Method, StatusCode};
use std::fmt;
use tracing::Span;
use url::Url;

/// A file on a remote HFS server, e.g. `http://example.org/docs/a.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    server: Url,
    path: ResourcePath,
}

impl RemoteFile {
    /// Whether `location` should be treated as a remote file rather than a local path.
    pub fn is_remote(location: &str) -> bool {
        location.starts_with("http://") || location.starts_with("https://")
    }

    pub fn parse(location: &str) -> HfsResult<Self> {
        let url = Url::parse(location).map_err(|e| HfsError::InvalidUrl(format!("{location}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HfsError::InvalidUrl(format!("{location}: unsupported scheme")));
        }
        if url.host_str().is_none() {
            return Err(HfsError::InvalidUrl(format!("{location}: missing host")));
        }

        let path = ResourcePath::from_url_path(url.path())?;
        Ok(Self::new(url, path))
    }

    /// `server` only contributes its scheme and authority.
    pub fn new(mut server: Url, path: ResourcePath) -> Self {
        server.set_path("/");
        server.set_query(None);
        server.set_fragment(None);
        Self { server, path }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn join(&self, name: &str) -> HfsResult<Self> {
        Ok(Self {
            server: self.server.clone(),
            path: self.path.join(name)?,
        })
    }

    /// Request URL, with each path segment percent-encoded
    pub fn url(&self) -> Url {
        let mut url = self.server.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().extend(&self.path.segments);
        }
        url
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

fn transport(err: reqwest::Error) -> HfsError {
    HfsError::Transport(err.to_string())
}

/// Client for HFS servers
#[derive(Debug, Clone)]
pub struct FileServerClient {
    http: Client,
    span: Span,
}

impl Default for FileServerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FileServerClient {
    pub fn new() -> Self {
        Self::with_http_client(Client::new())
    }

    /// Use a preconfigured `reqwest` client (timeouts, proxies, TLS).
    pub fn with_http_client(http: Client) -> Self {
        Self {
            http,
            span: tracing::debug_span!("hfs_client"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn send(&self, method: Method, file: &RemoteFile, body: Option<reqwest::Body>) -> HfsResult<reqwest::Response> {
        let url = file.url();
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(transport)?;
        tracing::debug!(
            parent: &self.span,
            method = %method,
            url = %url,
            status = response.status().as_u16(),
            "received response"
        );
        Ok(response)
    }

    /// Fetch the full content of `file`.
    ///
    /// The body is buffered before returning so the connection is released
    /// as soon as possible.
    pub async fn download(&self, file: &RemoteFile) -> HfsResult<Bytes> {
        let response = self.send(Method::GET, file, None).await?;
        match response.status() {
            StatusCode::OK => response.bytes().await.map_err(transport),
            StatusCode::NOT_FOUND => Err(HfsError::NotFound(file.to_string())),
            status => Err(HfsError::UnexpectedStatus(status.as_u16())),
        }
    }

    /// Create `file`, or replace its content if it already exists.
    pub async fn upload(&self, file: &RemoteFile, content: impl Into<reqwest::Body>) -> HfsResult<()> {
        let response = self.send(Method::POST, file, Some(content.into())).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(HfsError::UnexpectedStatus(status.as_u16())),
        }
    }

    pub async fn remove(&self, file: &RemoteFile) -> HfsResult<()> {
        let response = self.send(Method::DELETE, file, None).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(HfsError::NotFound(file.to_string())),
            status => Err(HfsError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(server: &MockServer, p: &str) -> RemoteFile {
        RemoteFile::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_is_remote() {
        assert!(RemoteFile::is_remote("http://example.org/hello.txt"));
        assert!(RemoteFile::is_remote("https://example.org/"));

        assert!(!RemoteFile::is_remote("hello.txt"));
        assert!(!RemoteFile::is_remote("/tmp/http-cache/file"));
        assert!(!RemoteFile::is_remote("./http"));
    }

    #[test]
    fn test_parse() {
        let file = RemoteFile::parse("http://example.org:8080/docs/a.txt?x=1#frag").unwrap();
        assert_eq!(file.path().segments, vec!["docs", "a.txt"]);
        assert_eq!(file.server().as_str(), "http://example.org:8080/");
        assert_eq!(file.url().as_str(), "http://example.org:8080/docs/a.txt");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(RemoteFile::parse("not a url"), Err(HfsError::InvalidUrl(_))));
        assert!(matches!(RemoteFile::parse("ftp://example.org/a"), Err(HfsError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_encodes_segments() {
        let file = RemoteFile::parse("http://example.org/").unwrap().join("my docs/a b.txt").unwrap();
        assert_eq!(file.url().as_str(), "http://example.org/my%20docs/a%20b.txt");
        assert_eq!(file.to_string(), "http://example.org/my%20docs/a%20b.txt");
    }

    #[test]
    fn test_root_url() {
        let file = RemoteFile::parse("http://example.org").unwrap();
        assert!(file.path().is_root());
        assert_eq!(file.url().as_str(), "http://example.org/");
    }

    #[tokio::test]
    async fn test_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        let body = client.download(&remote(&server, "/a.txt")).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_download_large_body_is_complete() {
        let content: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        let body = client.download(&remote(&server, "/big.bin")).await.unwrap();
        assert_eq!(body.as_ref(), content.as_slice());
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("file not found"))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        let err = client.download(&remote(&server, "/missing.txt")).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_download_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        let err = client.download(&remote(&server, "/a.txt")).await.unwrap_err();
        assert!(matches!(err, HfsError::UnexpectedStatus(500)));
    }

    #[tokio::test]
    async fn test_upload_accepts_created_and_ok() {
        for response in [ResponseTemplate::new(200), ResponseTemplate::new(201)] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/a.txt"))
                .and(body_bytes(b"hello".to_vec()))
                .respond_with(response)
                .expect(1)
                .mount(&server)
                .await;

            let client = FileServerClient::new();
            client.upload(&remote(&server, "/a.txt"), "hello").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_upload_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        let err = client.upload(&remote(&server, "/a.txt"), "hello").await.unwrap_err();
        assert!(matches!(err, HfsError::UnexpectedStatus(204)));
    }

    #[tokio::test]
    async fn test_remove() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/a.txt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/missing.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/odd.txt"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = FileServerClient::new();
        client.remove(&remote(&server, "/a.txt")).await.unwrap();

        let err = client.remove(&remote(&server, "/missing.txt")).await.unwrap_err();
        assert!(err.is_not_found());

        let err = client.remove(&remote(&server, "/odd.txt")).await.unwrap_err();
        assert!(matches!(err, HfsError::UnexpectedStatus(200)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FileServerClient::new();
        let file = RemoteFile::parse(&format!("http://{addr}/a.txt")).unwrap();
        let err = client.download(&file).await.unwrap_err();
        assert!(matches!(err, HfsError::Transport(_)));
    }
}
