pub mod feed;
pub mod marker;
pub mod resolver;
pub mod update_state;

pub use feed::{release_archive_url, Endpoints, ReleaseFeed, RemoteFeed};
pub use marker::{read_local_version, write_version_marker, NO_VERSION};
pub use resolver::{VersionCheck, VersionResolver};
pub use update_state::UpdateState;
