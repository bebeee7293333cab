//! Back-office operations for canteen staff.

use common::{Money, OrderId, OrderStatus, ProductId, Role, UserId};
use serde::Deserialize;
use store::{Category, Datastore, NewProduct, OrderDetail, Product, ProductPatch, User};

use crate::catalog::slugify;
use crate::error::{DomainError, Result};
use crate::orders::Requester;

/// A new product as staff describe it; the slug is derived.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub category_id: common::CategoryId,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Service for staff-only catalog, order and user management.
///
/// Every method checks the requester's role first: catalog and order
/// management needs staff, user management needs a super admin.
pub struct AdminService<S: Datastore> {
    store: S,
}

impl<S: Datastore> AdminService<S> {
    /// Creates a new admin service with the given datastore.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn require_staff(requester: &Requester) -> Result<()> {
        if requester.role.is_staff() {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }

    fn require_super_admin(requester: &Requester) -> Result<()> {
        if requester.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }

    /// Adds a product to the catalog, deriving a unique slug from the
    /// name.
    #[tracing::instrument(skip(self, draft))]
    pub async fn create_product(
        &self,
        requester: &Requester,
        draft: ProductDraft,
    ) -> Result<Product> {
        Self::require_staff(requester)?;
        let product = self
            .store
            .insert_product(NewProduct {
                slug: slugify(&draft.name),
                name: draft.name,
                price: draft.price,
                stock: draft.stock,
                category_id: draft.category_id,
                active: draft.active,
                images: draft.images,
            })
            .await?;
        metrics::counter!("products_created_total").increment(1);
        Ok(product)
    }

    /// Applies a partial update to a product.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        requester: &Requester,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        Self::require_staff(requester)?;
        Ok(self.store.update_product(id, patch).await?)
    }

    /// Adds a category.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, requester: &Requester, name: &str) -> Result<Category> {
        Self::require_staff(requester)?;
        Ok(self.store.insert_category(name).await?)
    }

    /// Lists every order in the system, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, requester: &Requester) -> Result<Vec<OrderDetail>> {
        Self::require_staff(requester)?;
        Ok(self.store.list_orders().await?)
    }

    /// Moves an order to a new status.
    ///
    /// Terminal orders stay put. A move to cancelled goes through the
    /// cancellation path so stock is returned.
    #[tracing::instrument(skip(self))]
    pub async fn set_order_status(
        &self,
        requester: &Requester,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderDetail> {
        Self::require_staff(requester)?;

        let detail = self
            .store
            .get_order(id)
            .await?
            .ok_or(DomainError::NotFound("order"))?;
        if detail.order.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                status: detail.order.status,
                action: "update",
            });
        }

        let order = match status {
            OrderStatus::Cancelled => self.store.cancel_order(id).await?,
            other => self.store.set_order_status(id, other).await?,
        };
        Ok(OrderDetail {
            order,
            lines: detail.lines,
        })
    }

    /// Lists every user account. Super admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, requester: &Requester) -> Result<Vec<User>> {
        Self::require_super_admin(requester)?;
        Ok(self.store.list_users().await?)
    }

    /// Replaces a user's role. Super admin only.
    #[tracing::instrument(skip(self))]
    pub async fn set_user_role(
        &self,
        requester: &Requester,
        user_id: UserId,
        role: Role,
    ) -> Result<User> {
        Self::require_super_admin(requester)?;
        Ok(self.store.set_user_role(user_id, role).await?)
    }
}
