//! Seed the catalog from a YAML file.
//!
//! The whole file is validated before anything is written. Entries whose
//! slug already exists are skipped, so the command can be re-run.
//!
//! # File Format
//!
//! ```yaml
//! categories:
//!   - name: Portfolios
//!     description: One-page sites for designers
//! products:
//!   - title: Minimal Portfolio
//!     category: portfolios   # category slug
//!     price: "19.00"
//!     tags: [minimal, dark]
//!     is_featured: true
//! ```
//!
//! Slugs are derived from names and titles when omitted. Prices are quoted
//! strings so the exact decimal is kept.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use template_shop_core::{CategoryId, NewCategory, NewProduct};
use template_shop_storefront::backend::{BackendClient, Caller};
use template_shop_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use template_shop_storefront::services::validation::{
    self, MAX_CONTACT_MESSAGE, MAX_SHORT_TEXT,
};

use super::{CommandError, connect};

/// Top level of a catalog file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

/// A category as written in the file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A product as written in the file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// Slug of the category
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: bool,
}

/// Validated rows, ready to insert.
#[derive(Debug, Default)]
pub struct SeedPlan {
    pub categories: Vec<NewCategory>,
    pub products: Vec<PlannedProduct>,
}

/// A validated product and the slug of its category.
#[derive(Debug)]
pub struct PlannedProduct {
    pub category: Option<String>,
    pub product: NewProduct,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub categories_skipped: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

/// Seed categories and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, the
/// service key is missing, or a backend write fails.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate before touching the backend
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::ReadFile {
            path: file_path.to_string(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let plan = match build_plan(&file) {
        Ok(plan) => plan,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(CommandError::Invalid(errors.len()));
        }
    };

    info!(
        categories = plan.categories.len(),
        products = plan.products.len(),
        "Catalog validated successfully"
    );
    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let (_, client) = connect(true)?;
    let summary = apply(&client, plan).await?;

    info!("Seeding complete!");
    info!(
        "  Categories created: {}, skipped (already exist): {}",
        summary.categories_created, summary.categories_skipped
    );
    info!(
        "  Products created: {}, skipped (already exist): {}",
        summary.products_created, summary.products_skipped
    );
    Ok(())
}

/// Validate every entry, collecting all problems instead of stopping at the
/// first.
///
/// # Errors
///
/// Returns one message per invalid entry.
pub fn build_plan(file: &CatalogFile) -> Result<SeedPlan, Vec<String>> {
    let mut errors = Vec::new();
    let mut plan = SeedPlan::default();

    let mut category_slugs = HashSet::new();
    for (i, entry) in file.categories.iter().enumerate() {
        match validation::category(
            &entry.name,
            entry.slug.as_deref(),
            entry.description.as_deref(),
        ) {
            Ok(category) => {
                if category_slugs.insert(category.slug.clone()) {
                    plan.categories.push(category);
                } else {
                    errors.push(format!("categories[{i}]: duplicate slug {}", category.slug));
                }
            }
            Err(e) => errors.push(format!("categories[{i}]: {e}")),
        }
    }

    let mut product_slugs = HashSet::new();
    for (i, entry) in file.products.iter().enumerate() {
        match planned_product(entry) {
            Ok(planned) => {
                if product_slugs.insert(planned.product.slug.clone()) {
                    plan.products.push(planned);
                } else {
                    errors.push(format!(
                        "products[{i}]: duplicate slug {}",
                        planned.product.slug
                    ));
                }
            }
            Err(e) => errors.push(format!("products[{i}]: {e}")),
        }
    }

    if errors.is_empty() { Ok(plan) } else { Err(errors) }
}

fn planned_product(entry: &ProductEntry) -> Result<PlannedProduct, String> {
    let title = validation::required_text("title", &entry.title, MAX_SHORT_TEXT)
        .map_err(|e| e.to_string())?;
    let slug = validation::slug_or_derived(entry.slug.as_deref(), &title)
        .map_err(|e| e.to_string())?;
    let amount = Decimal::from_str(entry.price.trim())
        .map_err(|_| format!("price {:?} is not a number", entry.price))?;

    let product = NewProduct {
        category_id: None,
        description: validation::optional_text(
            "description",
            entry.description.as_deref(),
            MAX_CONTACT_MESSAGE,
        )
        .map_err(|e| e.to_string())?
        .unwrap_or_default(),
        price: validation::price(amount).map_err(|e| e.to_string())?,
        preview_url: validation::optional_url("preview_url", entry.preview_url.as_deref())
            .map_err(|e| e.to_string())?,
        tags: validation::tags(&entry.tags).map_err(|e| e.to_string())?,
        is_active: entry.is_active.unwrap_or(true),
        is_featured: entry.is_featured,
        title,
        slug,
    };

    let category = entry
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(PlannedProduct { category, product })
}

/// Insert the plan as the service role, skipping slugs that already exist.
async fn apply(client: &BackendClient, plan: SeedPlan) -> Result<SeedSummary, CommandError> {
    let categories = CategoryRepository::new(client, Caller::Service);
    let products = ProductRepository::new(client, Caller::Service);
    let mut summary = SeedSummary::default();
    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();

    for category in &plan.categories {
        if let Some(existing) = categories.get_by_slug(&category.slug).await? {
            info!(slug = %category.slug, "Category exists, skipping");
            category_ids.insert(existing.slug, existing.id);
            summary.categories_skipped += 1;
            continue;
        }
        let created = categories.create(category).await?;
        info!(slug = %created.slug, id = %created.id, "Category created");
        category_ids.insert(created.slug, created.id);
        summary.categories_created += 1;
    }

    for planned in plan.products {
        let mut product = planned.product;
        if let Some(slug) = planned.category {
            let id = match category_ids.get(&slug) {
                Some(id) => *id,
                None => {
                    let found = categories
                        .get_by_slug(&slug)
                        .await?
                        .ok_or_else(|| CommandError::UnknownCategory(slug.clone()))?;
                    category_ids.insert(slug, found.id);
                    found.id
                }
            };
            product.category_id = Some(id);
        }

        match products.create(&product).await {
            Ok(created) => {
                info!(slug = %created.slug, id = %created.id, "Product created");
                summary.products_created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                info!(slug = %product.slug, "Product exists, skipping");
                summary.products_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
categories:
  - name: Portfolios
  - name: Landing Pages
    slug: landing
    description: Single-page marketing sites
products:
  - title: Minimal Portfolio
    category: portfolios
    price: "19.00"
    tags: [Minimal, dark, minimal]
    is_featured: true
  - title: Free Starter
    price: "0"
    is_active: false
"#;

    #[test]
    fn test_plan_from_valid_file() {
        let file: CatalogFile = serde_yaml::from_str(CATALOG).unwrap();
        let plan = build_plan(&file).unwrap();

        assert_eq!(plan.categories.len(), 2);
        assert_eq!(plan.categories[0].slug, "portfolios");
        assert_eq!(plan.categories[1].slug, "landing");

        let portfolio = &plan.products[0];
        assert_eq!(portfolio.category.as_deref(), Some("portfolios"));
        assert_eq!(portfolio.product.slug, "minimal-portfolio");
        assert_eq!(portfolio.product.tags, vec!["minimal", "dark"]);
        assert!(portfolio.product.is_active);
        assert!(portfolio.product.is_featured);

        let starter = &plan.products[1];
        assert!(starter.category.is_none());
        assert!(!starter.product.is_active);
    }

    #[test]
    fn test_plan_collects_every_error() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
categories:
  - name: "   "
products:
  - title: One
    price: "ten"
  - title: Two
    price: "-1"
  - title: Two
    price: "5"
  - title: Two
    price: "5"
"#,
        )
        .unwrap();

        let errors = build_plan(&file).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("categories[0]"));
        assert!(errors[1].contains("not a number"));
        assert!(errors[2].starts_with("products[1]"));
        assert!(errors[3].contains("duplicate slug two"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<CatalogFile, _> = serde_yaml::from_str(
            r#"
products:
  - title: Typo
    price: "1"
    featured: true
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file_is_empty_plan() {
        let file: CatalogFile = serde_yaml::from_str("{}").unwrap();
        let plan = build_plan(&file).unwrap();
        assert!(plan.categories.is_empty());
        assert!(plan.products.is_empty());
    }
}
