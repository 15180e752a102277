//! Independent fan-out of several calls.

use futures_util::future::join_all;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::http::{ApiResponse, CallDescriptor, Method};

/// Result of one call in a bulk batch.
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub method: Method,
    pub path: String,
    pub result: ApiResult<ApiResponse>,
}

impl BulkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl ApiClient {
    /// Issue every descriptor through the normal pipeline. One failure does
    /// not affect the others; outcomes come back in input order.
    pub async fn bulk(&self, requests: Vec<CallDescriptor>) -> Vec<BulkOutcome> {
        let calls = requests.into_iter().map(|request| async move {
            let method = request.method;
            let path = request.path.clone();
            let result = self.request(request).await;
            BulkOutcome { method, path, result }
        });

        let outcomes = join_all(calls).await;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        tracing::debug!(total = outcomes.len(), failed, "Bulk batch finished");
        outcomes
    }
}
