//! Blocking HTTP session shared by all service clients.
//!
//! One cookie-keeping client is used per run so that the ASP.NET session
//! cookies issued by MAST survive between the form fetch and the search post.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::ServiceConfig;
use crate::{Result, SkyQueryError};

pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    fn checked(url: &str, response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(SkyQueryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Status code of a GET, without treating failures as errors.
    pub fn status(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send()?;
        Ok(response.status().as_u16())
    }

    pub fn get_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        Ok(Self::checked(url, response)?.text()?)
    }

    pub fn get_text_with_query(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        log::debug!("GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send()?;
        Ok(Self::checked(url, response)?.text()?)
    }

    /// POST a url-encoded form and return the response body.
    pub fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        referer: Option<&str>,
    ) -> Result<String> {
        log::debug!("POST {} ({} fields)", url, form.len());
        let mut request = self.client.post(url).form(form);
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }
        let response = request.send()?;
        Ok(Self::checked(url, response)?.text()?)
    }

    /// Download `url` into `path`, going through a temporary file.
    pub fn download<P: AsRef<Path>>(&self, url: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("Downloading {} to {}", url, path.display());
        let response = self.client.get(url).send()?;
        let mut response = Self::checked(url, response)?;

        let temp_path = path.with_extension("tmp");
        let written = write_stream(&mut response, &temp_path)?;

        fs::rename(&temp_path, path)?;
        log::debug!("Wrote {} bytes", written);
        Ok(())
    }
}

/// Copy `reader` into a new file at `path`, removing the partial file if
/// the copy fails.
fn write_stream<R: Read>(reader: &mut R, path: &Path) -> io::Result<u64> {
    let copy = |reader: &mut R| -> io::Result<u64> {
        let mut file = BufWriter::new(File::create(path)?);
        let written = io::copy(reader, &mut file)?;
        file.flush()?;
        Ok(written)
    };
    let result = copy(reader);
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

/// Last path segment of a URL, without any query string.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let name = without_query.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Decompress a gzip file to the end to make sure it is complete.
pub fn validate_gzip<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let incomplete = || SkyQueryError::IncompleteFits(path.to_path_buf());

    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    if file.read_exact(&mut magic).is_err() || magic != [0x1F, 0x8B] {
        log::warn!("{} does not start with a gzip header", path.display());
        return Err(incomplete());
    }

    let file = File::open(path)?;
    let mut decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    match io::copy(&mut decoder, &mut io::sink()) {
        Ok(bytes) if bytes > 0 => Ok(()),
        Ok(_) => Err(incomplete()),
        Err(e) => {
            log::warn!("Failed to decompress {}: {}", path.display(), e);
            Err(incomplete())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    /// Yields some bytes, then fails like a dropped connection.
    struct BrokenStream {
        sent: bool,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            let chunk = b"SIMPLE  =";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_failed_stream_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tile-nd-int.tmp");
        let err = write_stream(&mut BrokenStream { sent: false }, &path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!path.exists());
    }

    #[test]
    fn test_write_stream_copies_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.tmp");
        let written = write_stream(&mut &b"payload"[..], &path).unwrap();
        assert_eq!(written, 7);
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    fn write_gzip(path: &Path, payload: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("http://galex.stsci.edu/data/GR6/AIS_101-nd-int.fits.gz"),
            Some("AIS_101-nd-int.fits.gz".to_string())
        );
        assert_eq!(
            file_name_from_url("https://host/a/b/c.fits?x=1"),
            Some("c.fits".to_string())
        );
        assert_eq!(file_name_from_url("https://host/a/"), None);
    }

    #[test]
    fn test_valid_gzip_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("good.fits.gz");
        write_gzip(&path, &vec![7u8; 50_000]);
        assert!(validate_gzip(&path).is_ok());
    }

    #[test]
    fn test_truncated_gzip_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.fits.gz");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();
        write_gzip(&good, &payload);

        let bytes = fs::read(&good).unwrap();
        let cut = dir.path().join("cut.fits.gz");
        fs::write(&cut, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(
            validate_gzip(&cut),
            Err(SkyQueryError::IncompleteFits(_))
        ));
    }

    #[test]
    fn test_plain_file_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.fits.gz");
        fs::write(&path, "<html>Service unavailable</html>").unwrap();
        assert!(matches!(
            validate_gzip(&path),
            Err(SkyQueryError::IncompleteFits(_))
        ));
    }

    #[test]
    fn test_session_builds_with_defaults() {
        assert!(HttpSession::new(&ServiceConfig::default()).is_ok());
    }
}
