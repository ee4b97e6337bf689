use crate::errors::FetchError;
use crate::models::{EntityType, NormalizedRecord};
use async_trait::async_trait;
use serde::Serialize;

/// What a source can deliver, exposed for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCapability {
    pub name: &'static str,
    pub entity_type: EntityType,
    pub endpoint: String,
}

/// An authoritative remote collection for one or more entity types.
///
/// A single call issues at most one request and returns every record of the
/// bounded page, already normalized into local shape and in received order.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Vec<SourceCapability> {
        Vec::new()
    }

    async fn fetch(
        &self,
        entity_type: EntityType,
    ) -> std::result::Result<Vec<NormalizedRecord>, FetchError>;
}
