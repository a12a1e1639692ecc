//! Customer directory endpoints.

use till_core::{Customer, CustomerCreated, CustomerList, NewCustomer};

use super::ApiClient;
use crate::error::ClientResult;

impl ApiClient {
    pub async fn customers(&self) -> ClientResult<Vec<Customer>> {
        let list: CustomerList = self.get("/customers", Vec::new()).await?;
        Ok(list.customers)
    }

    pub async fn add_customer(&self, customer: &NewCustomer) -> ClientResult<CustomerCreated> {
        customer.validate()?;
        self.post("/addcustomer", customer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_customers() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            json!({"customers": [
                {"id": 1, "name": "Wanjiku", "email": "w@example.com", "phone": "254700000001"}
            ]}),
        );
        let api = ApiClient::new(transport, AuthSettings::default());

        let customers = api.customers().await.unwrap();
        assert_eq!(customers[0].name, "Wanjiku");
    }

    #[tokio::test]
    async fn test_add_customer() {
        let transport = ScriptedTransport::new();
        transport.reply(
            201,
            json!({
                "message": "Customer added successfully",
                "customer": {"id": 5, "name": "Otieno"}
            }),
        );
        let api = ApiClient::new(transport.clone(), AuthSettings::default());

        let created = api
            .add_customer(&NewCustomer {
                name: "Otieno".to_string(),
                email: "otieno@example.com".to_string(),
                phone: "+254711000222".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.customer.id, 5);
        assert_eq!(transport.last_request().path, "/addcustomer");
    }
}
