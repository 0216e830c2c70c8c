//! `PostgreSQL` product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use fruit_store_core::{Price, ProductId, Rating};

use super::{PgStore, ProductRepository, RepositoryError};
use crate::models::{Product, ProductDraft, Review};

const PRODUCT_COLUMNS: &str = "id, title, owner, brand, price, images, description, category, \
                               rating, stock, warranty, reviews, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    owner: String,
    brand: String,
    price: Decimal,
    images: Json<Vec<String>>,
    description: String,
    category: String,
    rating: Decimal,
    stock: i32,
    warranty: String,
    reviews: Json<Vec<Review>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} for product {}: {e}", row.id))
        };
        let price = Price::new(row.price).map_err(|e| corrupt("price", &e))?;
        let rating = Rating::new(row.rating).map_err(|e| corrupt("rating", &e))?;
        let stock = u32::try_from(row.stock).map_err(|e| corrupt("stock", &e))?;

        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            owner: row.owner,
            brand: row.brand,
            price,
            images: row.images.0,
            description: row.description,
            category: row.category,
            rating,
            stock,
            warranty: row.warranty,
            reviews: row.reviews.0,
            created_at: row.created_at,
        })
    }
}

/// Drafts cap stock at `i32::MAX`, so this never saturates in practice.
fn stock_column(stock: u32) -> i32 {
    i32::try_from(stock).unwrap_or(i32::MAX)
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.product
                (title, owner, brand, price, images, description, category, rating, stock, warranty)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.title)
        .bind(&draft.owner)
        .bind(&draft.brand)
        .bind(draft.price)
        .bind(Json(&draft.images))
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.rating.value())
        .bind(stock_column(draft.stock))
        .bind(&draft.warranty)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.product
            SET title = $2, owner = $3, brand = $4, price = $5, images = $6,
                description = $7, category = $8, rating = $9, stock = $10,
                warranty = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.owner)
        .bind(&draft.brand)
        .bind(draft.price)
        .bind(Json(&draft.images))
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.rating.value())
        .bind(stock_column(draft.stock))
        .bind(&draft.warranty)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn append_review(&self, id: ProductId, review: Review) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.product
            SET reviews = reviews || $2::jsonb, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(Json(vec![review]))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
