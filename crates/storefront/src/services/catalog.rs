//! Catalog service: products and their reviews.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use fruit_store_core::ProductId;
use fruit_store_core::cart::ProductSnapshot;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{FieldErrors, Product, ProductInput, ReviewInput};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl CatalogError {
    fn from_repository(id: ProductId, e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        Self::Repository(e)
    }
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// Every product, optionally filtered by a free-text query.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the catalog cannot be read.
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let products = self.products.list().await?;
        Ok(match query {
            Some(q) => products.into_iter().filter(|p| p.matches(q)).collect(),
            None => products,
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// The cart snapshot of a product as it is right now.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn snapshot(&self, id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        Ok(self.get(id).await?.snapshot())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad fields.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let draft = input.validate()?;
        let product = self.products.create(draft).await?;
        info!(product_id = %product.id, title = %product.title, "Product created");
        Ok(product)
    }

    /// Full edit; reviews are kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad fields or
    /// `CatalogError::NotFound` for an unknown id.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product, CatalogError> {
        let draft = input.validate()?;
        let product = self
            .products
            .update(id, draft)
            .await
            .map_err(|e| CatalogError::from_repository(id, e))?;
        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products
            .delete(id)
            .await
            .map_err(|e| CatalogError::from_repository(id, e))?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Append one review.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad fields or
    /// `CatalogError::NotFound` for an unknown id.
    #[instrument(skip(self, input))]
    pub async fn add_review(&self, id: ProductId, input: ReviewInput) -> Result<Product, CatalogError> {
        let review = input.validate()?;
        self.products
            .append_review(id, review)
            .await
            .map_err(|e| CatalogError::from_repository(id, e))
    }
}
