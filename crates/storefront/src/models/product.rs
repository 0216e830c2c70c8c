//! Catalog products and their reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fruit_store_core::cart::ProductSnapshot;
use fruit_store_core::{Price, ProductId, Rating};

use super::validation::FieldErrors;

/// Most images a product may carry.
pub const MAX_IMAGES: usize = 4;

/// A customer review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub user: String,
    pub comment: String,
    pub rating: Rating,
}

/// Body of a review submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub user: String,
    pub comment: String,
    pub rating: Option<Decimal>,
}

impl ReviewInput {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<Review, FieldErrors> {
        let mut errors = FieldErrors::new();
        let user = errors.required("user", "User", &self.user);
        let comment = errors.min_chars("comment", "Comment", &self.comment, 5);
        let rating = match self.rating {
            Some(r) => errors.check("rating", Rating::new(r)),
            None => {
                errors.add("rating", "Rating is required");
                None
            }
        };
        match (user, comment, rating) {
            (Some(user), Some(comment), Some(rating)) => Ok(Review {
                user,
                comment,
                rating,
            }),
            _ => Err(errors),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub owner: String,
    pub brand: String,
    pub price: Price,
    pub images: Vec<String>,
    pub description: String,
    pub category: String,
    pub rating: Rating,
    pub stock: u32,
    pub warranty: String,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The fields a cart line freezes.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            image: self.images.first().cloned(),
        }
    }

    /// Case-insensitive substring search over title, category, brand and
    /// description. An empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || [&self.title, &self.category, &self.brand, &self.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Validated product fields for insert or full edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: String,
    pub owner: String,
    pub brand: String,
    pub price: Price,
    pub images: Vec<String>,
    pub description: String,
    pub category: String,
    pub rating: Rating,
    pub stock: u32,
    pub warranty: String,
}

/// Body of a product create or full edit.
///
/// Also reads catalog import files, which name the owner `name`, the
/// description `dis` and spread images over `img`, `img1`, `img2`, `img3`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductInput {
    pub title: String,
    #[serde(alias = "name")]
    pub owner: String,
    pub brand: String,
    pub price: Option<Decimal>,
    pub images: Vec<String>,
    #[serde(alias = "dis")]
    pub description: String,
    pub category: String,
    pub rating: Option<Decimal>,
    pub stock: Option<i64>,
    pub warranty: String,
    pub(crate) img: Option<String>,
    pub(crate) img1: Option<String>,
    pub(crate) img2: Option<String>,
    pub(crate) img3: Option<String>,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<ProductDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = errors.required("title", "Title", &self.title);
        let owner = errors.required("owner", "Owner name", &self.owner);
        let brand = errors.required("brand", "Brand", &self.brand);
        let category = errors.required("category", "Category", &self.category);
        let warranty = errors.required("warranty", "Warranty", &self.warranty);
        let description = errors.min_chars("description", "Description", &self.description, 10);

        let price = match self.price {
            Some(p) => errors.check("price", Price::new(p)),
            None => {
                errors.add("price", "Price is required");
                None
            }
        };
        let rating = match self.rating {
            Some(r) => errors.check("rating", Rating::new(r)),
            None => {
                errors.add("rating", "Rating is required");
                None
            }
        };
        let stock = match self.stock.map(|s| i32::try_from(s).map(u32::try_from)) {
            Some(Ok(Ok(stock))) => Some(stock),
            Some(_) => {
                errors.add("stock", "Stock must be zero or more");
                None
            }
            None => {
                errors.add("stock", "Stock is required");
                None
            }
        };

        let images: Vec<String> = self
            .images
            .into_iter()
            .chain([self.img, self.img1, self.img2, self.img3].into_iter().flatten())
            .map(|i| i.trim().to_owned())
            .filter(|i| !i.is_empty())
            .collect();
        if images.is_empty() {
            errors.add("images", "Main image is required");
        } else if images.len() > MAX_IMAGES {
            errors.add("images", format!("At most {MAX_IMAGES} images are allowed"));
        }

        match (title, owner, brand, category, warranty, description, price, rating, stock) {
            (
                Some(title),
                Some(owner),
                Some(brand),
                Some(category),
                Some(warranty),
                Some(description),
                Some(price),
                Some(rating),
                Some(stock),
            ) if errors.is_empty() => Ok(ProductDraft {
                title,
                owner,
                brand,
                price,
                images,
                description,
                category,
                rating,
                stock,
                warranty,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn mango_input() -> ProductInput {
        ProductInput {
            title: "Alphonso Mango".to_owned(),
            owner: "Ratnagiri Farms".to_owned(),
            brand: "Ratnagiri".to_owned(),
            price: Some(Decimal::from(50)),
            images: vec!["https://img.example/mango.jpg".to_owned()],
            description: "Sweet, saffron-coloured mangoes".to_owned(),
            category: "Mango".to_owned(),
            rating: Some(Decimal::new(45, 1)),
            stock: Some(20),
            warranty: "Replace if spoiled".to_owned(),
            ..ProductInput::default()
        }
    }

    #[test]
    fn test_valid_product() {
        let draft = mango_input().validate().unwrap();
        assert_eq!(draft.stock, 20);
        assert_eq!(draft.images.len(), 1);
    }

    #[test]
    fn test_reports_every_invalid_field() {
        let errors = ProductInput {
            price: Some(Decimal::ZERO),
            rating: Some(Decimal::from(9)),
            stock: Some(-1),
            description: "short".to_owned(),
            ..ProductInput::default()
        }
        .validate()
        .unwrap_err();
        for field in [
            "title",
            "owner",
            "brand",
            "category",
            "warranty",
            "description",
            "price",
            "rating",
            "stock",
            "images",
        ] {
            assert!(errors.get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn test_price_must_fit_money_column() {
        for price in [
            Decimal::new(1, 3),
            Decimal::from(10_000_000_000_i64),
            Decimal::from_i128_with_scale(2 * 10_i128.pow(28), 0),
        ] {
            let errors = ProductInput {
                price: Some(price),
                ..mango_input()
            }
            .validate()
            .unwrap_err();
            assert!(errors.get("price").is_some(), "{price}");
        }
    }

    #[test]
    fn test_too_many_images() {
        let errors = ProductInput {
            images: (0..5).map(|i| format!("img{i}.jpg")).collect(),
            ..mango_input()
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("images").is_some());
    }

    #[test]
    fn test_reads_import_file_field_names() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "title": "Kiwi",
            "name": "Green Valley",
            "brand": "GV",
            "price": 120,
            "img": "kiwi.jpg",
            "img1": "kiwi-2.jpg",
            "dis": "Tangy imported kiwis",
            "category": "Kiwi",
            "rating": 4,
            "stock": 12,
            "warranty": "None"
        }))
        .unwrap();
        let draft = input.validate().unwrap();
        assert_eq!(draft.owner, "Green Valley");
        assert_eq!(draft.description, "Tangy imported kiwis");
        assert_eq!(draft.images, vec!["kiwi.jpg", "kiwi-2.jpg"]);
    }

    #[test]
    fn test_review_validation() {
        let review = ReviewInput {
            user: "asha".to_owned(),
            comment: "Lovely and fresh".to_owned(),
            rating: Some(Decimal::from(5)),
        }
        .validate()
        .unwrap();
        assert_eq!(review.user, "asha");

        let errors = ReviewInput {
            user: " ".to_owned(),
            comment: "ok".to_owned(),
            rating: None,
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("user").is_some());
        assert!(errors.get("comment").is_some());
        assert!(errors.get("rating").is_some());
    }
}
