use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Collections the billing engine persists to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Claims,
    Denials,
}

impl CollectionKind {
    pub fn segment(&self) -> &'static str {
        match self {
            CollectionKind::Claims => "claims",
            CollectionKind::Denials => "denials",
        }
    }
}

/// Tenant-scoped collection path, e.g. `tenants/{tenant}/claims`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub tenant_id: Uuid,
    pub kind: CollectionKind,
}

impl CollectionRef {
    pub fn new(tenant_id: Uuid, kind: CollectionKind) -> Self {
        Self { tenant_id, kind }
    }

    pub fn claims(tenant_id: Uuid) -> Self {
        Self::new(tenant_id, CollectionKind::Claims)
    }

    pub fn denials(tenant_id: Uuid) -> Self {
        Self::new(tenant_id, CollectionKind::Denials)
    }

    /// Path to a document inside this collection
    pub fn doc(&self, document_id: Uuid) -> DocumentRef {
        DocumentRef {
            collection: *self,
            document_id,
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenants/{}/{}", self.tenant_id, self.kind.segment())
    }
}

/// Tenant-scoped document path, e.g. `tenants/{tenant}/claims/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: CollectionRef,
    pub document_id: Uuid,
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}
