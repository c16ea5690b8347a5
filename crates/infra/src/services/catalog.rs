use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest};
use kopontren_inventory::{MovementType, PriceHistory, PriceSource, ReferenceType, StockMovement, StockReference};
use kopontren_products::{Category, CategoryId, CategoryInput, NewProduct, Product, ProductId, ProductUpdate, barcode};

use super::{ServiceResult, Services, require};
use crate::audit::{self, AuditAction};
use crate::store::Tables;

/// Attempts at drawing an unused in-store barcode before giving up.
const BARCODE_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Only products at or below their minimum stock.
    #[serde(default)]
    pub low_stock: bool,
    /// `None` lists active products only.
    pub active: Option<bool>,
}

impl ProductFilter {
    fn matches(&self, p: &Product) -> bool {
        p.is_active == self.active.unwrap_or(true)
            && self.category_id.is_none_or(|c| p.category_id == Some(c))
            && (!self.low_stock || p.is_low_stock())
            && self.q.as_deref().is_none_or(|q| p.matches_search(q))
    }
}

fn ensure_category_name_free(t: &Tables, name: &str, except: Option<CategoryId>) -> Result<(), DomainError> {
    let taken = t
        .categories
        .values()
        .any(|c| Some(c.id) != except && c.same_name(name));
    if taken {
        return Err(DomainError::conflict(format!("category '{}' already exists", name.trim())));
    }
    Ok(())
}

fn ensure_product_identity_free(t: &Tables, p: &Product) -> Result<(), DomainError> {
    for other in t.products.values().filter(|o| o.id != p.id) {
        if other.code == p.code {
            return Err(DomainError::conflict(format!("product code {} is already used", p.code)));
        }
        if p.barcode.is_some() && other.barcode == p.barcode {
            return Err(DomainError::conflict(format!(
                "barcode {} is already used by {}",
                p.barcode.as_deref().unwrap_or_default(),
                other.code
            )));
        }
    }
    Ok(())
}

fn ensure_category_exists(t: &Tables, id: Option<CategoryId>) -> Result<(), DomainError> {
    match id {
        Some(id) if !t.categories.contains_key(&id) => Err(DomainError::not_found("category")),
        _ => Ok(()),
    }
}

fn unused_barcode(t: &Tables) -> Result<String, DomainError> {
    let mut rng = rand::thread_rng();
    for _ in 0..BARCODE_ATTEMPTS {
        let code = barcode::generate_internal(&mut rng);
        if !t.products.values().any(|p| p.barcode.as_deref() == Some(code.as_str())) {
            return Ok(code);
        }
    }
    Err(DomainError::conflict("could not generate an unused barcode, try again"))
}

impl Services {
    pub async fn list_categories(&self) -> Vec<CategoryView> {
        self.store
            .read(|t| {
                let mut rows: Vec<CategoryView> = t
                    .categories
                    .values()
                    .map(|c| CategoryView {
                        category: c.clone(),
                        product_count: t
                            .products
                            .values()
                            .filter(|p| p.category_id == Some(c.id))
                            .count(),
                    })
                    .collect();
                rows.sort_by_key(|v| v.category.name.to_lowercase());
                rows
            })
            .await
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn create_category(&self, actor: &Principal, input: CategoryInput) -> ServiceResult<Category> {
        let now = Utc::now();
        let category = Category::create(input, now)?;
        self.store
            .write(|tx| -> ServiceResult<Category> {
                ensure_category_name_free(tx.tables(), &category.name, None)?;
                audit::record(tx, actor, AuditAction::Create, "category", Some(category.id.into()), json!({ "name": category.name }), now)?;
                tx.put(category.clone())?;
                Ok(category)
            })
            .await
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn update_category(&self, actor: &Principal, id: CategoryId, input: CategoryInput) -> ServiceResult<Category> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Category> {
                let mut category = require::<Category>(tx, id, "category")?;
                ensure_category_name_free(tx.tables(), &input.name, Some(id))?;
                category.update(input, now)?;
                audit::record(tx, actor, AuditAction::Update, "category", Some(id.into()), json!({ "name": category.name }), now)?;
                tx.put(category.clone())?;
                Ok(category)
            })
            .await
    }

    /// Delete a category no product refers to.
    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn delete_category(&self, actor: &Principal, id: CategoryId) -> ServiceResult<()> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<()> {
                let category = require::<Category>(tx, id, "category")?;
                let used = tx.tables().products.values().filter(|p| p.category_id == Some(id)).count();
                if used > 0 {
                    return Err(DomainError::conflict(format!(
                        "category '{}' is used by {used} product(s)",
                        category.name
                    ))
                    .into());
                }
                tx.delete::<Category>(id);
                audit::record(tx, actor, AuditAction::Delete, "category", Some(id.into()), json!({ "name": category.name }), now)?;
                Ok(())
            })
            .await
    }

    /// Products matching `filter`, ordered by name.
    pub async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Page<Product> {
        self.store
            .read(|t| {
                let mut rows: Vec<Product> = t.products.values().filter(|p| filter.matches(p)).cloned().collect();
                rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.code.cmp(&b.code)));
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .read(|t| t.products.get(&id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    /// Scanner lookup: exact barcode match among active products.
    pub async fn product_by_barcode(&self, code: &str) -> ServiceResult<Product> {
        let code = code.trim();
        self.store
            .read(|t| {
                t.products
                    .values()
                    .find(|p| p.is_active && p.barcode.as_deref() == Some(code))
                    .cloned()
            })
            .await
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    /// Create a product; a positive `initial_stock` is booked as an INITIAL movement.
    ///
    /// With `generate_barcode` and no barcode supplied, an in-store EAN-13 is assigned.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn create_product(&self, actor: &Principal, input: NewProduct, generate_barcode: bool) -> ServiceResult<Product> {
        let now = Utc::now();
        let initial_stock = input.initial_stock;
        let mut product = Product::create(input, now)?;
        let product = self
            .store
            .write(|tx| -> ServiceResult<Product> {
                ensure_category_exists(tx.tables(), product.category_id)?;
                if generate_barcode && product.barcode.is_none() {
                    let code = unused_barcode(tx.tables())?;
                    product.set_barcode(code, now)?;
                }
                ensure_product_identity_free(tx.tables(), &product)?;
                if initial_stock > 0 {
                    let movement = StockMovement::apply(
                        &mut product,
                        MovementType::In,
                        initial_stock,
                        StockReference::new(ReferenceType::Initial),
                        Some("opening stock".to_string()),
                        actor.user_id,
                        now,
                    )?;
                    tx.put(movement)?;
                }
                audit::record(
                    tx,
                    actor,
                    AuditAction::Create,
                    "product",
                    Some(product.id.into()),
                    json!({ "code": product.code, "name": product.name, "initial_stock": initial_stock }),
                    now,
                )?;
                tx.put(product.clone())?;
                Ok(product)
            })
            .await?;
        info!(code = %product.code, "product created");
        Ok(product)
    }

    /// Partial update. A price change is recorded as MANUAL price history.
    #[instrument(skip(self, actor, update), fields(actor = %actor.username), err)]
    pub async fn update_product(&self, actor: &Principal, id: ProductId, update: ProductUpdate) -> ServiceResult<Product> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Product> {
                let mut product = require::<Product>(tx, id, "product")?;
                if let Some(category_id) = update.category_id {
                    ensure_category_exists(tx.tables(), category_id)?;
                }
                let change = product.apply_update(update, now)?;
                ensure_product_identity_free(tx.tables(), &product)?;
                if let Some(change) = change {
                    let details = json!({
                        "buy_price": [change.old_buy_price, change.new_buy_price],
                        "sell_price": [change.old_sell_price, change.new_sell_price],
                    });
                    tx.put(PriceHistory::record(id, change, PriceSource::Manual, None, actor.user_id, now))?;
                    audit::record(tx, actor, AuditAction::Update, "product", Some(id.into()), details, now)?;
                } else {
                    audit::record(tx, actor, AuditAction::Update, "product", Some(id.into()), json!({ "code": product.code }), now)?;
                }
                tx.put(product.clone())?;
                Ok(product)
            })
            .await
    }

    /// Soft delete: the product disappears from the catalog and POS but keeps its history.
    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn deactivate_product(&self, actor: &Principal, id: ProductId) -> ServiceResult<Product> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Product> {
                let mut product = require::<Product>(tx, id, "product")?;
                product.deactivate(now);
                audit::record(tx, actor, AuditAction::Delete, "product", Some(id.into()), json!({ "code": product.code }), now)?;
                tx.put(product.clone())?;
                Ok(product)
            })
            .await
    }

    /// Assign an in-store barcode to a product that has none.
    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn generate_barcode(&self, actor: &Principal, id: ProductId) -> ServiceResult<Product> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Product> {
                let mut product = require::<Product>(tx, id, "product")?;
                if let Some(existing) = &product.barcode {
                    return Err(DomainError::conflict(format!("product already has barcode {existing}")).into());
                }
                let code = unused_barcode(tx.tables())?;
                product.set_barcode(code.clone(), now)?;
                audit::record(tx, actor, AuditAction::Update, "product", Some(id.into()), json!({ "barcode": code }), now)?;
                tx.put(product.clone())?;
                Ok(product)
            })
            .await
    }

    /// Store an uploaded image and point the product at it; the old file is removed afterwards.
    #[instrument(skip(self, actor, bytes), fields(actor = %actor.username, size = bytes.len()), err)]
    pub async fn set_product_image(&self, actor: &Principal, id: ProductId, file_name: &str, bytes: &[u8]) -> ServiceResult<Product> {
        // Fail fast before writing a file for a product that does not exist.
        self.get_product(id).await?;
        let path = self.images.save_product_image(file_name, bytes).await?;
        let now = Utc::now();
        let result = self
            .store
            .write(|tx| -> ServiceResult<(Product, Option<String>)> {
                let mut product = require::<Product>(tx, id, "product")?;
                let old = product.set_image(path.clone(), now);
                audit::record(tx, actor, AuditAction::Upload, "product", Some(id.into()), json!({ "image": path }), now)?;
                tx.put(product.clone())?;
                Ok((product, old))
            })
            .await;
        match result {
            Ok((product, old)) => {
                if let Some(old) = old {
                    self.images.remove_best_effort(&old).await;
                }
                Ok(product)
            }
            Err(err) => {
                self.images.remove_best_effort(&path).await;
                Err(err)
            }
        }
    }
}
