use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub mod hash;

/// Half-open byte offsets into the text snapshot an extraction ran over.
pub type ByteRange = Range<usize>;

/// The template a helper is registered against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Scope {
    /// Registered with the global form, visible from every template.
    Global,
    /// Registered with the scoped form against the named template.
    Template(String),
}

impl Scope {
    pub fn template(name: impl Into<String>) -> Self {
        Scope::Template(name.into())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }

    /// The template name, or `None` for global helpers.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Template(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "<global>"),
            Scope::Template(name) => write!(f, "{name}"),
        }
    }
}

/// The source shape a helper was recognized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberSyntax {
    /// `name(params) { ... }`
    Method,
    /// `name: function(params) { ... }`
    FunctionExpr,
    /// `name: (params) => ...`
    Arrow,
    /// `name: param => ...`
    SingleParamArrow,
    /// `registerHelper('name', someFunction)`
    Reference,
}

impl fmt::Display for MemberSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberSyntax::Method => write!(f, "method"),
            MemberSyntax::FunctionExpr => write!(f, "function"),
            MemberSyntax::Arrow | MemberSyntax::SingleParamArrow => write!(f, "arrow"),
            MemberSyntax::Reference => write!(f, "ref"),
        }
    }
}

/// One helper as recognized by the extractor, before it is tied to a scope
/// and a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperMeta {
    pub name: String,
    pub syntax: MemberSyntax,
    pub parameters: Option<String>,
    pub return_type: Option<String>,
    pub jsdoc: Option<String>,
    pub range: ByteRange,
}

/// Normalized metadata for one helper.
///
/// Records are produced by an extraction pass over a whole file and are never
/// edited afterwards; a later pass builds a fresh set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperRecord {
    pub name: String,
    pub scope: Scope,
    pub syntax: MemberSyntax,
    pub signature: Option<String>,
    pub parameters: Option<String>,
    pub return_type: Option<String>,
    pub jsdoc: Option<String>,
    pub file_path: PathBuf,
    pub source_range: ByteRange,
}

impl HelperRecord {
    pub fn from_meta(meta: HelperMeta, scope: Scope, file_path: &Path) -> Self {
        let signature = match meta.syntax {
            MemberSyntax::Reference => None,
            _ => {
                let params = meta.parameters.as_deref().unwrap_or("");
                Some(match meta.return_type.as_deref() {
                    Some(ret) => format!("{}({}): {}", meta.name, params, ret),
                    None => format!("{}({})", meta.name, params),
                })
            }
        };

        Self {
            name: meta.name,
            scope,
            syntax: meta.syntax,
            signature,
            parameters: meta.parameters,
            return_type: meta.return_type,
            jsdoc: meta.jsdoc,
            file_path: file_path.to_path_buf(),
            source_range: meta.range,
        }
    }

    /// Read-only view handed to the doc renderer.
    pub fn info(&self) -> HelperInfo<'_> {
        HelperInfo {
            file_path: &self.file_path,
            jsdoc: self.jsdoc.as_deref(),
            signature: self.signature.as_deref(),
            return_type: self.return_type.as_deref(),
            parameters: self.parameters.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperInfo<'a> {
    pub file_path: &'a Path,
    pub jsdoc: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub return_type: Option<&'a str>,
    pub parameters: Option<&'a str>,
}

impl HelperInfo<'_> {
    /// Base name of the defining file; full paths are kept out of UI text.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.to_string_lossy().into_owned())
    }
}

/// Everything one extraction pass produced for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub file_path: PathBuf,
    pub content_hash: [u8; 32],
    pub helpers: Vec<HelperRecord>,
}

impl FileIndexEntry {
    pub fn total_helpers(&self) -> usize {
        self.helpers.len()
    }

    pub fn find(&self, name: &str, scope: &Scope) -> Option<&HelperRecord> {
        self.helpers
            .iter()
            .find(|h| h.name == name && &h.scope == scope)
    }
}
