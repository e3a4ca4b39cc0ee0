use serde::Serialize;

/// A linkable external automation object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub description: String,
    /// Known property names; empty when the backend does not report them.
    pub properties: Vec<String>,
}
