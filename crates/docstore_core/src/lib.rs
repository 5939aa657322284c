//! Core domain logic for docstore.
//! This crate is the single source of truth for entity invariants, the wire
//! formats and the resource semantics; transports stay thin on top of it.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resource;
pub mod service;

pub use codec::Representation;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Document, DocumentId};
pub use model::folder::{Folder, FolderId};
pub use model::path::{FolderIndex, Located, PathError};
pub use model::topic::{Topic, TopicId};
pub use model::validation::FieldErrors;
pub use repo::document_repo::{DocumentListQuery, FolderFilter};
pub use repo::folder_repo::FolderListQuery;
pub use repo::{RepoError, RepoResult};
pub use resource::{
    parse_body, DocumentResource, FolderResource, Reply, ResourceError, ResourceResult,
    TopicResource,
};
pub use service::transfer_service::{LoadSummary, TransferError, TransferService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
