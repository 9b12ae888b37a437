//! Catalog browsing and admin product management.

use common::{Order, Principal, Product, ProductId};
use store::{NewProduct, ProductFilter, ProductUpdate, ShopStore};

use crate::access::require_admin;
use crate::error::ShopError;

/// Counts and recent activity for the admin dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub product_count: u64,
    pub user_count: u64,
    pub order_count: u64,
    pub recent_orders: Vec<Order>,
}

/// Public catalog reads plus the admin-only product operations.
pub struct CatalogService<S> {
    store: S,
}

impl<S: ShopStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Products visible to shoppers.
    pub async fn list_active_products(&self) -> Result<Vec<Product>, ShopError> {
        Ok(self
            .store
            .list_products(ProductFilter { active_only: true })
            .await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, ShopError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(ShopError::NotFound("product"))
    }

    /// Every product, including inactive ones. Admin only.
    pub async fn list_all_products(
        &self,
        principal: Principal,
    ) -> Result<Vec<Product>, ShopError> {
        require_admin(principal)?;
        Ok(self.store.list_products(ProductFilter::default()).await?)
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(
        &self,
        principal: Principal,
        product: NewProduct,
    ) -> Result<ProductId, ShopError> {
        require_admin(principal)?;
        validate_product_fields(&product.name, product.price)?;
        Ok(self.store.insert_product(product).await?)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        principal: Principal,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(), ShopError> {
        require_admin(principal)?;
        validate_product_fields(&update.name, update.price)?;
        if !self.store.update_product(id, update).await? {
            return Err(ShopError::NotFound("product"));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        principal: Principal,
        id: ProductId,
    ) -> Result<(), ShopError> {
        require_admin(principal)?;
        if !self.store.delete_product(id).await? {
            return Err(ShopError::NotFound("product"));
        }
        Ok(())
    }

    /// Flips the product's active flag and returns the new value.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_active(
        &self,
        principal: Principal,
        id: ProductId,
    ) -> Result<bool, ShopError> {
        require_admin(principal)?;
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(ShopError::NotFound("product"))?;
        let next = !product.active;
        self.store.set_product_active(id, next).await?;
        Ok(next)
    }

    /// Entity counts and the most recent orders. Admin only.
    pub async fn dashboard(&self, principal: Principal) -> Result<DashboardSummary, ShopError> {
        require_admin(principal)?;
        Ok(DashboardSummary {
            product_count: self.store.count_products().await?,
            user_count: self.store.count_users().await?,
            order_count: self.store.count_orders().await?,
            recent_orders: self.store.recent_orders(5).await?,
        })
    }
}

fn validate_product_fields(name: &str, price: common::Money) -> Result<(), ShopError> {
    if name.trim().is_empty() {
        return Err(ShopError::Validation("product name is required".into()));
    }
    if price.is_negative() {
        return Err(ShopError::Validation(
            "product price cannot be negative".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::{Money, UserId};
    use store::MemoryStore;

    use super::*;

    fn new_product(name: &str, price_cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            brand: None,
            category: None,
            image_url: None,
            price: Money::from_cents(price_cents),
            stock: 10,
            active: true,
        }
    }

    #[tokio::test]
    async fn admin_role_is_required_for_mutations() {
        let service = CatalogService::new(MemoryStore::new());
        let customer = Principal::customer(UserId::new());

        let err = service
            .create_product(customer, new_product("Widget", 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
        let err = service
            .delete_product(customer, ProductId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn inactive_products_are_hidden_from_shoppers() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Principal::admin(UserId::new());

        let id = service
            .create_product(admin, new_product("Widget", 1000))
            .await
            .unwrap();
        assert_eq!(service.list_active_products().await.unwrap().len(), 1);

        assert!(!service.toggle_active(admin, id).await.unwrap());
        assert!(service.list_active_products().await.unwrap().is_empty());
        assert_eq!(service.list_all_products(admin).await.unwrap().len(), 1);

        // toggling again brings it back
        assert!(service.toggle_active(admin, id).await.unwrap());
        assert_eq!(service.list_active_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn product_validation() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Principal::admin(UserId::new());

        let err = service
            .create_product(admin, new_product("   ", 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        let err = service
            .create_product(admin, new_product("Widget", -1))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_product_reports_not_found() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Principal::admin(UserId::new());

        let err = service.get_product(ProductId::new()).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
        let err = service
            .toggle_active(admin, ProductId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn dashboard_counts_entities() {
        let store = MemoryStore::new();
        let service = CatalogService::new(store.clone());
        let admin = Principal::admin(UserId::new());

        service
            .create_product(admin, new_product("Widget", 1000))
            .await
            .unwrap();
        service
            .create_product(admin, new_product("Gadget", 2000))
            .await
            .unwrap();

        let summary = service.dashboard(admin).await.unwrap();
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.order_count, 0);
        assert!(summary.recent_orders.is_empty());

        let err = service
            .dashboard(Principal::customer(UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }
}
