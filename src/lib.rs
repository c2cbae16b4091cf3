//! Template helper metadata: extraction from script sources, a per-file
//! index, and markdown documentation for hover and completion.

pub mod events;
pub mod helpers;
pub mod hover;
pub mod index;
pub mod logging;
pub mod parser;
pub mod position;
pub mod project;
pub mod render;
pub mod report;

pub use helpers::{FileIndexEntry, HelperInfo, HelperRecord, MemberSyntax, Scope};
pub use index::{HelperIndex, SharedIndex, UpdateOutcome};
pub use render::{render, DocFragment};
