//! Admin-only endpoints. Role gating happens in the `Till` facade before
//! these are called; the server enforces it again.

use till_core::validation::validate_pagination;
use till_core::{AuditLogPage, DashboardStats};

use super::ApiClient;
use crate::error::ClientResult;

impl ApiClient {
    pub async fn dashboard(&self) -> ClientResult<DashboardStats> {
        self.get("/admin/dashboard", Vec::new()).await
    }

    /// One page of the audit trail, newest first.
    pub async fn audit_logs(&self, page: u32, per_page: u32) -> ClientResult<AuditLogPage> {
        validate_pagination(page, per_page)?;
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ];
        self.get("/audit-logs", query).await
    }
}
