//! Checkout and sales reporting.

use serde::Serialize;
use till_core::{CheckoutReceipt, LineItem, SalesReport, SalesReportQuery};

use super::ApiClient;
use crate::error::{ClientError, ClientResult};

/// `POST /checkout` body.
#[derive(Debug, Serialize)]
pub struct CheckoutRequest<'a> {
    pub items: &'a [LineItem],
}

impl ApiClient {
    /// Commits a sale. The server prices, decrements stock and records the
    /// transaction.
    pub async fn checkout(&self, items: &[LineItem]) -> ClientResult<CheckoutReceipt> {
        if items.is_empty() {
            return Err(ClientError::EmptyCart);
        }
        self.post("/checkout", &CheckoutRequest { items }).await
    }

    pub async fn sales_report(&self, query: &SalesReportQuery) -> ClientResult<SalesReport> {
        query.validate()?;
        self.get("/reports/sales", query.to_query()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::testing::ScriptedTransport;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use till_core::Money;

    #[tokio::test]
    async fn test_checkout_sends_items() {
        let transport = ScriptedTransport::new();
        transport.reply(201, json!({"message": "Checkout successful", "transaction_id": 77}));
        let api = ApiClient::new(transport.clone(), AuthSettings::default());

        let items = vec![LineItem::new(1, "X", Money::from_major(10), 5)];
        let receipt = api.checkout(&items).await.unwrap();
        assert_eq!(receipt.transaction_id, Some(77));

        let body = transport.last_request().body.unwrap();
        assert_eq!(
            body,
            json!({"items": [{"id": 1, "name": "X", "price": 10.0, "quantity": 5}]})
        );
    }

    #[tokio::test]
    async fn test_empty_checkout_is_rejected_locally() {
        let transport = ScriptedTransport::new();
        let api = ApiClient::new(transport.clone(), AuthSettings::default());

        assert!(matches!(api.checkout(&[]).await, Err(ClientError::EmptyCart)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sales_report_query() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            json!({"report": [
                {"timestamp": "2024-03-01T00:00:00", "total_sales": 99.5, "transaction_count": 3}
            ]}),
        );
        let api = ApiClient::new(transport.clone(), AuthSettings::default());

        let query = SalesReportQuery::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        );
        let report = api.sales_report(&query).await.unwrap();
        assert_eq!(report.total_sales(), Money::from_cents(9950));

        let sent = transport.last_request();
        assert_eq!(sent.path, "/reports/sales");
        assert_eq!(sent.query.len(), 2);
        assert_eq!(sent.query[1].0, "end_date");
    }
}
