//! Import catalog products from a file.
//!
//! The file is JSON (`.json`) or YAML (anything else) holding either a list
//! of products or an object with a `products` array. Older export files
//! name that array `users`; it is accepted too.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info};

use fruit_store_storefront::db::PgStore;
use fruit_store_storefront::models::ProductInput;
use fruit_store_storefront::services::CatalogService;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    List(Vec<ProductInput>),
    Wrapped {
        #[serde(alias = "users")]
        products: Vec<ProductInput>,
    },
}

/// Parse a seed file's content.
fn parse_products(content: &str, json: bool) -> Result<Vec<ProductInput>, Box<dyn std::error::Error>> {
    let file: SeedFile = if json {
        serde_json::from_str(content)?
    } else {
        serde_yaml::from_str(content)?
    };
    Ok(match file {
        SeedFile::List(products) | SeedFile::Wrapped { products } => products,
    })
}

/// Seed products from `file_path`.
///
/// Every product is validated like an admin create; invalid entries are
/// reported and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database
/// cannot be reached, or any entry was rejected.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let products = parse_products(&content, json)?;

    info!(products = products.len(), "Parsed seed file");

    let catalog = CatalogService::new(Arc::new(PgStore::new(super::connect().await?)));

    let mut inserted = 0usize;
    let mut failures = Vec::new();
    for (index, input) in products.into_iter().enumerate() {
        let title = input.title.clone();
        match catalog.create(input).await {
            Ok(product) => {
                inserted += 1;
                info!(id = %product.id, title = %product.title, "Inserted product");
            }
            Err(e) => failures.push(format!("#{index} {title:?}: {e}")),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");

    if !failures.is_empty() {
        error!("  Errors: {}", failures.len());
        for failure in &failures {
            error!("    - {failure}");
        }
        return Err(format!("{} products rejected", failures.len()).into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_yaml_list() {
        let content = r"
- title: Alphonso Mango
  owner: Ratnagiri Farms
  brand: Orchard Fresh
  price: 120
  images: [mango.jpg]
  description: Sweet and fragrant summer mangoes
  category: fruit
  rating: 4.5
  stock: 10
  warranty: none
";
        let products = parse_products(content, false).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Alphonso Mango");
        assert!(products[0].clone().validate().is_ok());
    }

    #[test]
    fn test_parses_legacy_json_export() {
        let content = r#"{"users": [
            {"title": "Kiwi", "name": "Hill Farm", "brand": "Green", "price": 40,
             "img": "kiwi.jpg", "dis": "Tangy green kiwis by the dozen",
             "category": "fruit", "rating": 4, "stock": 3, "warranty": "none"}
        ]}"#;
        let products = parse_products(content, true).unwrap();
        assert_eq!(products.len(), 1);
        let draft = products[0].clone().validate().unwrap();
        assert_eq!(draft.owner, "Hill Farm");
        assert_eq!(draft.images, vec!["kiwi.jpg"]);
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(parse_products(r#"{"items": 3}"#, true).is_err());
        assert!(parse_products("just text", false).is_err());
    }
}
