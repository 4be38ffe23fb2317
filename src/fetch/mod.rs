//! HTTP access to the upstream firmware and kernel repositories.
//!
//! All network traffic goes through the [`Fetch`] trait so resolution and
//! installation logic can be exercised without a network.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("rpi-source/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_EXCERPT_LEN: usize = 200;

/// Blocking HTTP operations used by a run.
pub trait Fetch {
    /// GET a URL and return the body as text.
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET a URL and stream the body into `dest`, returning the byte count.
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Fetch`] implementation over `reqwest`'s blocking client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            // Tarballs are large; only the connect phase is bounded.
            .timeout(None)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("requesting {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "GET {} failed with HTTP {}: {}",
                url,
                status,
                excerpt(&body)
            );
        }
        Ok(response)
    }
}

impl Fetch for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        self.get(url)?
            .text()
            .with_context(|| format!("reading response body from {}", url))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url)?;
        stream_to_file(&mut response, dest).with_context(|| format!("downloading {}", url))
    }
}

/// Copy `reader` into `dest` through a `.part` sibling, so an interrupted
/// download never looks like a finished one. The partial file is removed
/// on failure.
fn stream_to_file(reader: &mut impl Read, dest: &Path) -> Result<u64> {
    let partial = dest.with_extension("part");
    let mut file =
        File::create(&partial).with_context(|| format!("creating '{}'", partial.display()))?;
    let written = io::copy(reader, &mut file)
        .inspect_err(|_| {
            let _ = fs::remove_file(&partial);
        })
        .with_context(|| format!("writing '{}'", partial.display()))?;
    drop(file);

    fs::rename(&partial, dest)
        .with_context(|| format!("renaming '{}' -> '{}'", partial.display(), dest.display()))?;
    Ok(written)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        let short = excerpt(&body);
        assert_eq!(short.len(), BODY_EXCERPT_LEN + 3);
        assert!(short.ends_with("..."));
    }

    /// Yields some bytes, then fails like a dropped connection.
    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"\x1f\x8b\x08\x00");
            Ok(4)
        }
    }

    #[test]
    fn test_stream_to_file_renames_on_success() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("rpi-linux-f00dfeed.tar.gz");

        let written = stream_to_file(&mut &b"payload"[..], &dest).unwrap();

        assert_eq!(written, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_stream_to_file_removes_partial_on_error() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("rpi-linux-f00dfeed.tar.gz");

        let result = stream_to_file(&mut BrokenReader { sent: false }, &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_excerpt_keeps_short_bodies() {
        assert_eq!(excerpt("  404: Not Found\n"), "404: Not Found");
    }
}
