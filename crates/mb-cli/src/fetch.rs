//! HTTP transport for list fetching and report forwarding.

use std::fs;
use std::time::Duration;

use reqwest::blocking::Client;

use mb_core::{FetchError, ListFetcher, ReportRecord, ReportSink};

fn user_agent() -> String {
    format!("mojublock/{}", env!("CARGO_PKG_VERSION"))
}

fn build_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

fn classify(endpoint: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        FetchError::Unreachable {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

/// Fetches lists over HTTP(S), or from disk for `file://` endpoints.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl ListFetcher for HttpFetcher {
    fn fetch(&self, endpoint: &str) -> Result<String, FetchError> {
        if let Some(path) = endpoint.strip_prefix("file://") {
            return fs::read_to_string(path).map_err(|e| FetchError::Unreachable {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            });
        }

        let response = self
            .client
            .get(endpoint)
            .send()
            .map_err(|e| classify(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| classify(endpoint, e))
    }
}

/// Posts each report as JSON to an upstream endpoint.
pub struct HttpReportSink {
    client: Client,
    endpoint: String,
}

impl HttpReportSink {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
        })
    }
}

impl ReportSink for HttpReportSink {
    fn submit(&self, record: &ReportRecord) -> Result<(), FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .map_err(|e| classify(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_file_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        fs::write(&path, "# list\nbad.com\n").unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let text = fetcher.fetch(&format!("file://{}", path.display())).unwrap();
        assert_eq!(text, "# list\nbad.com\n");
    }

    #[test]
    fn missing_file_is_unreachable() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("file:///definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }
}
