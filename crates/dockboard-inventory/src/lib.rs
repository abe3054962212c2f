// Dockboard inventory - cached container inventory merged with operator tags

mod cache;
mod credentials;
pub mod descriptor;
mod gate;
mod inspector;
mod layout;
pub mod merger;
mod storage;
mod tags;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{CacheStatus, InventoryCache, RefreshTask, DEFAULT_REFRESH_PERIOD};
pub use credentials::{CredentialMap, CredentialStore, JsonFileCredentialStore};
pub use gate::{fingerprint, ChangeGate, PollOutcome};
pub use inspector::{
    parse_descriptors, parse_id_list, CliInspector, InspectorConfig, RuntimeInspector,
};
pub use layout::DataDir;
pub use storage::{
    read_json_or_default, read_json_strict, write_json_atomic, InMemorySnapshotStore,
    InMemoryTagStore, JsonFileSnapshotStore, JsonFileTagStore, SnapshotStore, TagStore,
};
pub use tags::{apply_tag_update, dedup_tags, TagEditor};

pub use dockboard_common as common;
