//! cache_list tool implementation.
//!
//! Lists cache stores, or the requests cached in one store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error, RequestKey, StoreSummary};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Store to list keys for; omit to list stores only.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
    /// Requests cached in `store`, in insertion order.
    pub keys: Option<Vec<RequestKey>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let stores = cache.store_summaries().await?;

    let keys = match params.store {
        Some(store) => {
            if !cache.has_store(&store).await? {
                return Err(Error::InvalidInput(format!("no cache store named {store}")).into());
            }
            Some(cache.keys(&store).await?)
        }
        None => None,
    };

    json_result(&CacheListOutput { stores, keys })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{INDEX, host, output};
    use std::sync::Arc;
    use swcache_client::testing::ScriptedNetwork;

    #[tokio::test]
    async fn test_list_stores() {
        let host = host(Arc::new(ScriptedNetwork::new())).await;

        let out: CacheListOutput = output(&list_impl(&host.cache, CacheListParams::default()).await.unwrap());

        assert_eq!(out.stores.len(), 1);
        assert_eq!(out.stores[0].name, "etiquetadora-v1.0.0");
        assert_eq!(out.stores[0].entries, 1);
        assert!(out.keys.is_none());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let host = host(Arc::new(ScriptedNetwork::new())).await;

        let params = CacheListParams { store: Some("etiquetadora-v1.0.0".into()) };
        let out: CacheListOutput = output(&list_impl(&host.cache, params).await.unwrap());

        assert_eq!(out.keys.unwrap(), vec![RequestKey::get(INDEX)]);
    }

    #[tokio::test]
    async fn test_list_unknown_store() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheListParams { store: Some("v-missing".into()) };
        assert!(list_impl(&cache, params).await.is_err());
    }
}
