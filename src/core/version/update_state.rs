// ─── Update State ───
// The fork follows the upstream version line. A fork build is only safe to
// install once one exists for the *current* upstream line.

/// Outcome of comparing the installed build with the live feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Installed build is the latest fork build on the current upstream line.
    NoUpdate,
    /// A newer compatible fork build can be installed now.
    UpdateAvailable,
    /// Upstream moved on and the fork has not published a matching build yet.
    UpdateWaiting,
}

impl UpdateState {
    pub fn decide(local: &str, live_upstream: &str, live_fork: &str) -> Self {
        if !local.starts_with(live_upstream) {
            if live_fork.starts_with(live_upstream) {
                UpdateState::UpdateAvailable
            } else {
                UpdateState::UpdateWaiting
            }
        } else if local != live_fork {
            UpdateState::UpdateAvailable
        } else {
            UpdateState::NoUpdate
        }
    }
}
