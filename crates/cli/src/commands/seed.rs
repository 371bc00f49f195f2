//! Seed the database with demo data.
//!
//! Creates a small catalog, an active banner and two hero slides through the
//! same services the back office uses, so every row passes normal validation.
//! Each section is skipped when the table already has data.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use emporium_server::services::catalog::{CatalogCache, CatalogService, CategoryInput, ProductInput};
use emporium_server::services::content::{ContentService, HeroSlideInput, MainMessageInput};

use super::{CommandError, connect};

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    /// Price in cents.
    cents: i64,
    stock: i32,
    featured: bool,
}

struct DemoCategory {
    name: &'static str,
    description: &'static str,
    products: &'static [DemoProduct],
}

const CATALOG: &[DemoCategory] = &[
    DemoCategory {
        name: "Kitchen",
        description: "Cookware and tools for everyday cooking.",
        products: &[
            DemoProduct {
                name: "Cast Iron Skillet",
                description: "Pre-seasoned 26 cm skillet.",
                cents: 4_500,
                stock: 25,
                featured: true,
            },
            DemoProduct {
                name: "Chef's Knife",
                description: "20 cm stainless steel blade.",
                cents: 7_999,
                stock: 12,
                featured: false,
            },
            DemoProduct {
                name: "Linen Tea Towels",
                description: "Set of three.",
                cents: 1_850,
                stock: 4,
                featured: false,
            },
        ],
    },
    DemoCategory {
        name: "Stationery",
        description: "Paper goods and writing instruments.",
        products: &[
            DemoProduct {
                name: "Dot Grid Notebook",
                description: "A5, 160 numbered pages.",
                cents: 1_600,
                stock: 60,
                featured: true,
            },
            DemoProduct {
                name: "Fountain Pen",
                description: "Medium nib with converter.",
                cents: 3_200,
                stock: 0,
                featured: false,
            },
        ],
    },
];

/// Load demo data.
///
/// # Errors
///
/// Returns an error if the connection fails or any record is rejected.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    seed_catalog(&pool).await?;
    seed_content(&pool).await?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> Result<(), CommandError> {
    let cache = CatalogCache::new();
    let catalog = CatalogService::new(pool, &cache);

    if !catalog.all_categories().await?.is_empty() {
        info!("Catalog already has categories, skipping");
        return Ok(());
    }

    for demo in CATALOG {
        let category = catalog
            .create_category(&CategoryInput {
                name: demo.name.to_string(),
                slug: None,
                description: Some(demo.description.to_string()),
                image_url: None,
                is_active: Some(true),
            })
            .await?;

        for product in demo.products {
            catalog
                .create_product(&ProductInput {
                    category_id: category.id,
                    name: product.name.to_string(),
                    slug: None,
                    description: Some(product.description.to_string()),
                    price: Decimal::new(product.cents, 2),
                    stock: product.stock,
                    image_url: None,
                    is_active: Some(true),
                    is_featured: Some(product.featured),
                })
                .await?;
        }

        info!(
            category = %category.slug,
            products = demo.products.len(),
            "Seeded category"
        );
    }

    Ok(())
}

async fn seed_content(pool: &PgPool) -> Result<(), CommandError> {
    let content = ContentService::new(pool);

    if content.banners().await?.is_empty() {
        let banner = content
            .create_banner(&MainMessageInput {
                content: "Free shipping on orders over $50".to_string(),
                link_url: Some("/products".to_string()),
            })
            .await?;
        content.activate_banner(banner.id).await?;
        info!(banner_id = %banner.id, "Seeded banner");
    }

    if content.slides(false).await?.is_empty() {
        let slides = [
            ("New in the kitchen", "/images/hero/kitchen.jpg", "/categories/kitchen"),
            ("Write it down", "/images/hero/stationery.jpg", "/categories/stationery"),
        ];
        for (title, image_url, link_url) in slides {
            content
                .create_slide(&HeroSlideInput {
                    title: title.to_string(),
                    subtitle: None,
                    image_url: image_url.to_string(),
                    link_url: Some(link_url.to_string()),
                    is_active: Some(true),
                })
                .await?;
        }
        info!(count = slides.len(), "Seeded hero slides");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_products_are_valid() {
        for category in CATALOG {
            for product in category.products {
                let input = ProductInput {
                    category_id: emporium_core::CategoryId::new(1),
                    name: product.name.to_string(),
                    slug: None,
                    description: Some(product.description.to_string()),
                    price: Decimal::new(product.cents, 2),
                    stock: product.stock,
                    image_url: None,
                    is_active: Some(true),
                    is_featured: Some(product.featured),
                };
                assert!(input.validate().is_ok(), "{} is invalid", product.name);
            }
        }
    }

    #[test]
    fn test_demo_category_slugs_are_unique() {
        let mut slugs: Vec<String> = CATALOG
            .iter()
            .map(|c| emporium_core::slugify(c.name))
            .collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), CATALOG.len());
    }
}
