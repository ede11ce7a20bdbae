use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::core::error::LauncherResult;

use super::feed::ReleaseFeed;
use super::marker::read_local_version;
use super::update_state::UpdateState;

/// The three version strings an update decision is made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    pub local: String,
    /// Empty when the upstream feed is unavailable; every version then
    /// matches the upstream line and only the fork is tracked.
    pub upstream: String,
    pub fork: String,
}

impl VersionCheck {
    pub fn state(&self) -> UpdateState {
        UpdateState::decide(&self.local, &self.upstream, &self.fork)
    }
}

/// Reads the installed version and the live versions from the feeds.
#[derive(Clone)]
pub struct VersionResolver {
    marker: PathBuf,
    feed: Arc<dyn ReleaseFeed>,
}

impl VersionResolver {
    pub fn new(marker: PathBuf, feed: Arc<dyn ReleaseFeed>) -> Self {
        Self { marker, feed }
    }

    pub fn local_version(&self) -> String {
        read_local_version(&self.marker)
    }

    pub async fn live_fork_version(&self) -> LauncherResult<String> {
        self.feed.live_fork_version().await
    }

    pub async fn live_upstream_version(&self) -> Option<String> {
        self.feed.live_upstream_version().await
    }

    pub async fn check(&self) -> LauncherResult<VersionCheck> {
        let upstream = self.live_upstream_version().await.unwrap_or_default();
        let fork = self.live_fork_version().await?;
        let local = self.local_version();
        info!(
            "Version check: local={} upstream={} fork={}",
            local, upstream, fork
        );

        Ok(VersionCheck {
            local,
            upstream,
            fork,
        })
    }
}
