//! Public catalog reads and product reviews.

use chrono::Utc;
use common::UserId;
use serde::Deserialize;
use store::{
    Category, CategorySelector, Datastore, NewReview, Product, ProductPage, ProductQuery, Review,
};
use uuid::Uuid;

use crate::error::{DomainError, Result};

/// Category keywords accepted by the storefront in place of a UUID.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("sale", "On Sale"),
    ("hot", "Hot Products"),
    ("food", "Food"),
    ("drink", "Drink"),
];

/// Resolves a raw category parameter into a selector.
///
/// A parseable UUID selects by id; otherwise the value is matched
/// case-insensitively against the keyword table and falls through as a
/// literal category name.
pub fn resolve_category(raw: &str) -> CategorySelector {
    if let Ok(uuid) = raw.parse::<Uuid>() {
        return CategorySelector::Id(uuid.into());
    }
    let lowered = raw.to_lowercase();
    for (keyword, name) in CATEGORY_KEYWORDS {
        if lowered == *keyword {
            return CategorySelector::Name((*name).to_string());
        }
    }
    CategorySelector::Name(raw.to_string())
}

/// Generates a unique URL slug from a product name.
///
/// Lowercases, keeps alphanumerics, collapses everything else into
/// single dashes, and appends a millisecond timestamp so two products
/// with the same name never collide.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    format!("{}-{}", slug, Utc::now().timestamp_millis())
}

/// Listing filter as it arrives from the outside.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    /// Category UUID or keyword.
    pub category: Option<String>,
    /// Substring to match against product names.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl CatalogFilter {
    fn to_query(&self) -> ProductQuery {
        let defaults = ProductQuery::default();
        ProductQuery {
            category: self.category.as_deref().map(resolve_category),
            search: self.search.clone(),
            page: self.page.unwrap_or(defaults.page).max(1),
            page_size: self.page_size.unwrap_or(defaults.page_size).clamp(1, 100),
        }
    }
}

/// Service for browsing the catalog and reviewing products.
pub struct CatalogService<S: Datastore> {
    store: S,
}

impl<S: Datastore> CatalogService<S> {
    /// Creates a new catalog service with the given datastore.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists active, in-stock products matching the filter, newest
    /// first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: &CatalogFilter) -> Result<ProductPage> {
        let page = self.store.list_products(&filter.to_query()).await?;
        metrics::counter!("catalog_listings_total").increment(1);
        Ok(page)
    }

    /// Lists all categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Fetches a product by slug together with its reviews, newest
    /// first.
    #[tracing::instrument(skip(self))]
    pub async fn product_detail(&self, slug: &str) -> Result<(Product, Vec<Review>)> {
        let product = self
            .store
            .get_product_by_slug(slug)
            .await?
            .ok_or(DomainError::NotFound("product"))?;
        let reviews = self.store.reviews_for_product(product.id).await?;
        Ok((product, reviews))
    }

    /// Posts a review on a product. Ratings run from 1 to 5.
    #[tracing::instrument(skip(self, content))]
    pub async fn post_review(
        &self,
        user_id: UserId,
        slug: &str,
        rating: u8,
        content: String,
    ) -> Result<Review> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidRating(rating));
        }
        let product = self
            .store
            .get_product_by_slug(slug)
            .await?
            .ok_or(DomainError::NotFound("product"))?;

        let review = self
            .store
            .insert_review(NewReview {
                user_id,
                product_id: product.id,
                rating,
                content,
            })
            .await?;
        metrics::counter!("reviews_posted_total").increment(1);
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{MemoryStore, NewProduct};

    async fn seed(store: &MemoryStore) -> Product {
        let category = store.insert_category("Drink").await.unwrap();
        store
            .insert_product(NewProduct {
                name: "Iced Coffee".to_string(),
                slug: slugify("Iced Coffee"),
                price: Money::from_cents(300),
                stock: 5,
                category_id: category.id,
                active: true,
                images: vec![],
            })
            .await
            .unwrap()
    }

    #[test]
    fn keywords_map_to_category_names() {
        assert_eq!(
            resolve_category("drink"),
            CategorySelector::Name("Drink".to_string())
        );
        assert_eq!(
            resolve_category("SALE"),
            CategorySelector::Name("On Sale".to_string())
        );
        // Unknown words pass through as literal names.
        assert_eq!(
            resolve_category("Snacks"),
            CategorySelector::Name("Snacks".to_string())
        );
    }

    #[test]
    fn uuid_params_select_by_id() {
        let uuid = Uuid::new_v4();
        assert_eq!(
            resolve_category(&uuid.to_string()),
            CategorySelector::Id(uuid.into())
        );
    }

    #[test]
    fn slugify_normalizes_and_disambiguates() {
        let slug = slugify("Crispy  Spring Rolls!");
        assert!(slug.starts_with("crispy-spring-rolls-"));
        assert_ne!(slugify("Same Name"), slug);
    }

    #[tokio::test]
    async fn keyword_filter_finds_products() {
        let store = MemoryStore::new();
        let product = seed(&store).await;
        let service = CatalogService::new(store);

        let page = service
            .list(&CatalogFilter {
                category: Some("drink".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, product.id);
    }

    #[tokio::test]
    async fn detail_includes_reviews() {
        let store = MemoryStore::new();
        let product = seed(&store).await;
        let service = CatalogService::new(store);
        let user_id = UserId::new();

        service
            .post_review(user_id, &product.slug, 5, "great".to_string())
            .await
            .unwrap();

        let (found, reviews) = service.product_detail(&product.slug).await.unwrap();
        assert_eq!(found.id, product.id);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 5);
    }

    #[tokio::test]
    async fn ratings_outside_range_are_rejected() {
        let store = MemoryStore::new();
        let product = seed(&store).await;
        let service = CatalogService::new(store);

        for rating in [0, 6] {
            let result = service
                .post_review(UserId::new(), &product.slug, rating, String::new())
                .await;
            assert!(matches!(result, Err(DomainError::InvalidRating(r)) if r == rating));
        }
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let service = CatalogService::new(MemoryStore::new());
        let result = service.product_detail("missing-0").await;
        assert!(matches!(result, Err(DomainError::NotFound("product"))));
    }
}
