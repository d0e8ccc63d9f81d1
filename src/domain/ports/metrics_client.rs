use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::TimeWindow;

/// Upstream brand metrics provider
///
/// Methods return the raw JSON payload. The same logical resource may come
/// back as a bare array, as `{"data": [...]}` or as `{"<resource>": [...]}`;
/// normalization is the transform layer's job, not the client's.
///
/// Implementations enforce their own request timeout and must not retry.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// List all workspaces (tracked brands)
    async fn get_workspaces(&self) -> Result<Value>;

    /// Fetch narratives for a workspace within the given window
    ///
    /// # Arguments
    /// * `workspace_id` - Upstream workspace identifier
    /// * `window` - `since`/`to` bounds and optional channel filter
    async fn get_narratives(&self, workspace_id: u64, window: &TimeWindow) -> Result<Value>;

    /// Fetch mentions for a workspace within the given window
    async fn get_mentions(&self, workspace_id: u64, window: &TimeWindow) -> Result<Value>;
}
