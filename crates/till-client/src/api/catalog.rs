//! Product catalog and inventory endpoints.

use till_core::{InventorySummary, NewProduct, Product, ProductCreated, ProductList};

use super::ApiClient;
use crate::error::ClientResult;

impl ApiClient {
    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        let list: ProductList = self.get("/products", Vec::new()).await?;
        Ok(list.products)
    }

    /// Products whose name contains `query` (case-insensitive). Filtering
    /// happens client-side over the full list.
    pub async fn search_products(&self, query: &str) -> ClientResult<Vec<Product>> {
        let mut products = self.products().await?;
        products.retain(|p| p.matches(query));
        Ok(products)
    }

    pub async fn create_product(&self, product: &NewProduct) -> ClientResult<ProductCreated> {
        product.validate()?;
        self.post("/products", product).await
    }

    /// Products at or below their critical stock level.
    pub async fn inventory(&self) -> ClientResult<InventorySummary> {
        self.get("/inventory-monitoring", Vec::new()).await
    }
}
