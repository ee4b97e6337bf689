use std::sync::Arc;

use async_trait::async_trait;
use nstorage::{
    errors::{FetchError, Result as StorageResult, StorageError},
    fetch::{RemoteSource, SourceCapability},
    models::{EntityType, NormalizedRecord},
};

use crate::{
    client::{HttpNulpService, NulpService},
    mapper,
    params::{SourceDescriptor, SourceRequest, SourceSettings},
};

/// Remote source for courses, good practices and forum discussions.
pub struct NulpFetcher {
    client: Arc<dyn NulpService>,
    descriptors: Vec<SourceDescriptor>,
}

impl NulpFetcher {
    pub fn new(client: Arc<dyn NulpService>, descriptors: Vec<SourceDescriptor>) -> Self {
        Self {
            client,
            descriptors,
        }
    }

    pub fn from_settings(settings: &SourceSettings) -> StorageResult<Self> {
        let descriptors = settings
            .descriptors()
            .map_err(|err| StorageError::Config(err.to_string()))?;
        let client = HttpNulpService::new(settings.http_timeout()).map_err(|err| {
            StorageError::Config(format!("failed to create HTTP client: {err}"))
        })?;
        Ok(Self::new(Arc::new(client), descriptors))
    }

    pub fn descriptor(&self, entity_type: EntityType) -> Option<&SourceDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.entity_type == entity_type)
    }
}

#[async_trait]
impl RemoteSource for NulpFetcher {
    fn name(&self) -> &'static str {
        "nulpfetcher"
    }

    fn capabilities(&self) -> Vec<SourceCapability> {
        self.descriptors
            .iter()
            .map(|descriptor| SourceCapability {
                name: self.name(),
                entity_type: descriptor.entity_type,
                endpoint: descriptor.url.to_string(),
            })
            .collect()
    }

    async fn fetch(
        &self,
        entity_type: EntityType,
    ) -> std::result::Result<Vec<NormalizedRecord>, FetchError> {
        let descriptor = self
            .descriptor(entity_type)
            .ok_or_else(|| FetchError::Transport {
                url: String::new(),
                message: format!("no endpoint configured for {entity_type}"),
            })?;
        let plural = entity_type.profile().plural;
        log::info!("API URL: {}", descriptor.url);
        log::info!("Limit: {} {}", descriptor.limit, plural);

        match &descriptor.request {
            SourceRequest::ContentSearch(params) => {
                let request = params.to_request(descriptor.limit);
                let items = self
                    .client
                    .search_content(&descriptor.url, &request)
                    .await
                    .map_err(|err| err.into_fetch_error(descriptor.url.as_str()))?;
                Ok(items
                    .iter()
                    .map(|raw| mapper::normalize_content(raw, entity_type))
                    .collect())
            }
            SourceRequest::TopicList => {
                let page = self
                    .client
                    .list_topics(&descriptor.url)
                    .await
                    .map_err(|err| err.into_fetch_error(descriptor.url.as_str()))?;
                match page.topic_count {
                    Some(total) => log::info!(
                        "Found {} {} (total: {})",
                        page.topics.len(),
                        plural,
                        total
                    ),
                    None => log::info!("Found {} {}", page.topics.len(), plural),
                }
                Ok(page.topics.iter().map(mapper::normalize_topic).collect())
            }
        }
    }
}
