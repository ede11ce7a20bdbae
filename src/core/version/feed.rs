// ─── Release Feeds ───
// The fork publishes GitHub releases (JSON, `tag_name`); the upstream project
// publishes a Maven metadata document whose `<release>` tag names its line.

use std::path::Path;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::StageProgress;

/// Remote side of version resolution and updates.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Tag of the fork's latest published release.
    async fn live_fork_version(&self) -> LauncherResult<String>;

    /// Current upstream version line. `None` when the feed is unreachable or
    /// does not carry the tag.
    async fn live_upstream_version(&self) -> Option<String>;

    /// Download the release archive for `tag` into `dest`.
    async fn download_release(
        &self,
        tag: &str,
        dest: &Path,
        stage: &StageProgress,
    ) -> LauncherResult<u64>;
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub fork_latest_release: String,
    pub fork_release_download: String,
    pub upstream_metadata: String,
    pub upstream_tag: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            fork_latest_release: "https://api.github.com/repos/Tonic-Box/VitaLite/releases/latest"
                .to_string(),
            fork_release_download: "https://github.com/Tonic-Box/VitaLite/releases/download"
                .to_string(),
            upstream_metadata: "https://repo.runelite.net/net/runelite/client/maven-metadata.xml"
                .to_string(),
            upstream_tag: "release".to_string(),
        }
    }
}

/// Archive URL of the fork release `tag` under `download_base`.
pub fn release_archive_url(download_base: &str, tag: &str) -> String {
    format!(
        "{}/{}/VitaLite-{}.zip",
        download_base.trim_end_matches('/'),
        tag,
        tag
    )
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// [`ReleaseFeed`] backed by the real HTTP endpoints.
pub struct RemoteFeed {
    downloader: Downloader,
    endpoints: Endpoints,
}

impl RemoteFeed {
    pub fn new(downloader: Downloader, endpoints: Endpoints) -> Self {
        Self {
            downloader,
            endpoints,
        }
    }

    async fn fetch_text(&self, url: &str, accept: &'static str) -> LauncherResult<String> {
        let read_timeout = self.downloader.read_timeout();
        let request = self.downloader.client().get(url).header(ACCEPT, accept);
        let response = tokio::time::timeout(read_timeout, request.send())
            .await
            .map_err(|_| self.downloader.timeout_error(url))??;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = tokio::time::timeout(read_timeout, response.text())
            .await
            .map_err(|_| self.downloader.timeout_error(url))??;
        Ok(body)
    }
}

#[async_trait]
impl ReleaseFeed for RemoteFeed {
    async fn live_fork_version(&self) -> LauncherResult<String> {
        let url = &self.endpoints.fork_latest_release;
        debug!("Fetching latest fork release from {}", url);
        let body = self
            .fetch_text(url, "application/vnd.github.v3+json")
            .await?;
        let release: LatestRelease = serde_json::from_str(&body)?;
        info!("Latest VitaLite release: {}", release.tag_name);
        Ok(release.tag_name)
    }

    async fn live_upstream_version(&self) -> Option<String> {
        let url = &self.endpoints.upstream_metadata;
        let body = match self.fetch_text(url, "application/xml").await {
            Ok(body) => body,
            Err(err) => {
                warn!("Upstream version feed unavailable: {}", err);
                return None;
            }
        };

        match tag_value(&body, &self.endpoints.upstream_tag) {
            Ok(Some(version)) => {
                info!("Live upstream version: {}", version);
                Some(version)
            }
            Ok(None) => {
                warn!(
                    "Upstream feed has no <{}> tag",
                    self.endpoints.upstream_tag
                );
                None
            }
            Err(err) => {
                warn!("Upstream feed is not valid XML: {}", err);
                None
            }
        }
    }

    async fn download_release(
        &self,
        tag: &str,
        dest: &Path,
        stage: &StageProgress,
    ) -> LauncherResult<u64> {
        let url = release_archive_url(&self.endpoints.fork_release_download, tag);
        let label = format!("Downloading VitaLite {tag}");
        self.downloader
            .download_to_file(&url, dest, stage, &label)
            .await
    }
}

/// Text of the first element named `tag`, trimmed. Empty elements count as absent.
pub fn tag_value(xml: &str, tag: &str) -> LauncherResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    loop {
        match reader.read_event()? {
            Event::Start(start) => inside = start.name().as_ref() == tag.as_bytes(),
            Event::Text(text) if inside => {
                let value = text
                    .unescape()
                    .map_err(|err| LauncherError::Other(format!("Bad text in <{tag}>: {err}")))?;
                let value = value.trim();
                return Ok((!value.is_empty()).then(|| value.to_string()));
            }
            Event::End(_) => inside = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
