//! Core data model: documents, doc files, links, and staged rows

mod docfile;
mod document;
mod link;
mod staged;
mod status;


pub use docfile::{DocFile, DocFileId};
pub use document::{DocId, Document, UNKNOWN_LINK_COUNT};
pub use link::{Link, LinkId};
pub use staged::{StagedDoc, StagedId, StagedKind, StagedLink, StagedPath};
pub use status::{ProcessStatus, UnknownStatus};
