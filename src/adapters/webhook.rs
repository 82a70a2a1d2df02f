use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::domain::ReportFormat;
use crate::ports::{ReportUploader, UploadError};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads the finished report by POSTing it to a collector URL
pub struct WebhookUploader {
    url: String,
    client: Client,
}

impl WebhookUploader {
    pub fn new(url: impl Into<String>) -> Result<Self, UploadError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| UploadError {
                target: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { url, client })
    }
}

impl ReportUploader for WebhookUploader {
    fn target(&self) -> &str {
        &self.url
    }

    fn upload(&self, document: &str, format: ReportFormat) -> Result<(), UploadError> {
        let fail = |reason: String| UploadError {
            target: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, format.content_type())
            .body(document.to_string())
            .send()
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fail(format!("collector answered {}", response.status())));
        }

        info!(target_url = %self.url, bytes = document.len(), "Report uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_unreachable_collector_is_upload_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let uploader = WebhookUploader::new("http://127.0.0.1:9/report").unwrap();
        assert_eq!(uploader.target(), "http://127.0.0.1:9/report");
        let err = uploader.upload("{}", ReportFormat::Json).unwrap_err();
        assert_eq!(err.target, "http://127.0.0.1:9/report");
    }

    /// Accept one request and hand back its raw head
    fn one_shot_collector() -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/report", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let mut head = String::new();
            while !head.contains("\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .unwrap();
            head
        });
        (url, handle)
    }

    #[test]
    fn test_csv_report_is_posted_as_csv() {
        let (url, collector) = one_shot_collector();
        let uploader = WebhookUploader::new(url).unwrap();
        uploader.upload("diskSize,7\n", ReportFormat::Csv).unwrap();

        let head = collector.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("post /report"));
        assert!(head.contains("content-type: text/csv"));
    }
}
