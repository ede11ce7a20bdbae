use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{io_at, LauncherError, LauncherResult};
use crate::core::http::READ_TIMEOUT;
use crate::core::progress::StageProgress;

use super::transfer::TransferProgress;

/// Streaming downloader that feeds byte progress into a [`StageProgress`].
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    read_timeout: Duration,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Replace the default [`READ_TIMEOUT`].
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Stream `url` into `dest`, reporting progress as `label` on `stage`.
    ///
    /// Creates parent directories as needed. Returns the number of bytes written.
    /// Any gap longer than the read timeout between two chunks aborts the transfer.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        stage: &StageProgress,
        label: &str,
    ) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_at(parent))?;
        }

        info!("Downloading from: {}", url);
        let response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| self.timeout_error(url))??;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        debug!(
            "File size: {} MB",
            content_length.unwrap_or(0) / (1024 * 1024)
        );

        let mut progress = TransferProgress::new(content_length, Instant::now());
        let mut stream = response.bytes_stream();
        let mut downloaded = 0_u64;

        // Handle is dropped at the end of this block, before anyone reopens the file.
        {
            let mut file = tokio::fs::File::create(dest).await.map_err(io_at(dest))?;

            loop {
                let next = tokio::time::timeout(self.read_timeout, stream.next())
                    .await
                    .map_err(|_| self.timeout_error(url))?;
                let Some(chunk) = next else {
                    break;
                };
                let chunk = chunk?;

                file.write_all(&chunk).await.map_err(io_at(dest))?;
                downloaded = downloaded.saturating_add(chunk.len() as u64);

                if let Some(snapshot) = progress.record(downloaded, Instant::now()) {
                    stage.update(snapshot.stage_percent, &snapshot.describe(label));
                }
            }

            file.flush().await.map_err(io_at(dest))?;
        }

        info!(
            "Download complete: {} MB total",
            downloaded / (1024 * 1024)
        );
        Ok(downloaded)
    }

    pub(crate) fn timeout_error(&self, url: &str) -> LauncherError {
        LauncherError::Timeout {
            url: url.to_string(),
            seconds: self.read_timeout.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::tests::{serve, test_downloader, Reply};
    use crate::core::progress::tests::recording_reporter;
    use crate::core::progress::RUNTIME_DOWNLOAD;

    #[tokio::test]
    async fn body_is_streamed_to_disk() {
        let body: Vec<u8> = (0..700 * 1024).map(|i| (i % 251) as u8).collect();
        let base = serve(Reply::ok(body.clone())).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/jdk-temp.tar.gz");
        let (sink, reporter) = recording_reporter();
        let stage = reporter.stage(RUNTIME_DOWNLOAD);

        let written = test_downloader()
            .download_to_file(&format!("{base}/jdk"), &dest, &stage, "Downloading JDK 11")
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let progress = sink.progress();
        assert!(!progress.is_empty());
        assert!(progress.iter().all(|(_, overall, _)| *overall <= 25));
        assert!(progress[0].2.starts_with("Downloading JDK 11"));
    }

    #[tokio::test]
    async fn error_status_is_a_failed_download() {
        let base = serve(Reply::status(404)).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("VitaLite.zip");
        let (_sink, reporter) = recording_reporter();
        let url = format!("{base}/missing.zip");

        let err = test_downloader()
            .download_to_file(&url, &dest, &reporter.stage(RUNTIME_DOWNLOAD), "x")
            .await
            .unwrap_err();

        assert!(
            matches!(&err, LauncherError::DownloadFailed { url: failed, status: 404 } if *failed == url),
            "{err:?}"
        );
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let base = serve(Reply::stall(1024, b"partial".to_vec())).await;
        let dir = tempfile::tempdir().unwrap();
        let (_sink, reporter) = recording_reporter();

        let err = test_downloader()
            .with_read_timeout(Duration::from_millis(300))
            .download_to_file(
                &format!("{base}/slow"),
                &dir.path().join("slow.bin"),
                &reporter.stage(RUNTIME_DOWNLOAD),
                "x",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Timeout { .. }), "{err:?}");
    }
}
