//! Fetching chapter pages and images.
//!
//! Everything that touches the network goes through the [`Fetcher`] trait,
//! so rendering can be driven by a fake in tests. [`HttpClient`] is the real
//! implementation: a blocking reqwest client with a fixed user agent and
//! timeout, which also serves `file://` URLs from disk.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Browser-like user agent; many sites refuse requests without one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched resource whose body has not been read yet.
pub struct Fetched {
    pub url: Url,
    pub status: u16,
    body: Box<dyn Read>,
}

impl Fetched {
    pub fn new(url: Url, status: u16, body: impl Read + 'static) -> Self {
        Self {
            url,
            status,
            body: Box::new(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with [`Error::Status`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Status {
                url: self.url.to_string(),
                status: self.status,
            })
        }
    }

    /// The body as a stream.
    pub fn into_reader(self) -> Box<dyn Read> {
        self.body
    }

    pub fn bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetched")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Something that can retrieve a URL.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Fetched>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &Url) -> Result<Fetched> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP client configured once and passed to every fetch.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpClient {
    /// Client with the default user agent and timeout.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_file(&self, url: &Url) -> Result<Fetched> {
        let path = url
            .to_file_path()
            .map_err(|()| Error::UnsupportedUrl(url.to_string()))?;
        let file = File::open(&path)?;
        Ok(Fetched::new(url.clone(), 200, BufReader::new(file)))
    }

    fn fetch_http(&self, url: &Url) -> Result<Fetched> {
        let response = self.client.get(url.clone()).send()?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        Ok(Fetched::new(final_url, status, response))
    }
}

impl Fetcher for HttpClient {
    fn fetch(&self, url: &Url) -> Result<Fetched> {
        debug!(url = %url, "fetching");
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "file" => self.fetch_file(url),
            _ => Err(Error::UnsupportedUrl(url.to_string())),
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    user_agent: String,
    timeout: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpClientBuilder {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .build()?;
        Ok(HttpClient {
            client,
            user_agent: self.user_agent,
            timeout: self.timeout,
        })
    }
}

/// Turn a local path into an absolute `file://` URL.
pub fn file_url(path: &std::path::Path) -> Result<Url> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute).map_err(|()| Error::UnsupportedUrl(absolute.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(10));
        assert!(client.user_agent().starts_with("Mozilla/5.0"));

        let client = HttpClient::builder()
            .user_agent("pagefold-test")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        assert_eq!(client.user_agent(), "pagefold-test");
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_fetch_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>local</p>").unwrap();

        let client = HttpClient::new().unwrap();
        let fetched = client.fetch(&file_url(&path).unwrap()).unwrap();
        assert!(fetched.is_success());
        assert_eq!(fetched.bytes().unwrap(), b"<p>local</p>");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(&dir.path().join("nope.png")).unwrap();
        let err = HttpClient::new().unwrap().fetch(&url).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unsupported_scheme() {
        let url = Url::parse("ftp://example.com/a.png").unwrap();
        let err = HttpClient::new().unwrap().fetch(&url).unwrap_err();
        assert!(matches!(err, Error::UnsupportedUrl(u) if u == "ftp://example.com/a.png"));
    }

    #[test]
    fn test_error_for_status() {
        let url = Url::parse("https://example.com/missing").unwrap();
        let err = Fetched::new(url, 404, std::io::empty())
            .error_for_status()
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }));
    }
}
