//! Menu service: the public menu tree and its administration.

use crate::domain::error::ServiceError;
use crate::ports::outbound::MenuRepository;
use serde::Deserialize;
use shared_bus::ChangeNotifier;
use shared_types::{Menu, Product, ProductGroup};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Admin request to create or edit a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub group_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub hidden: bool,
}

/// Admin request to create a product group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInput {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub name: String,
}

/// Business logic for the menu. Every mutation notifies the admin channel.
#[derive(Clone)]
pub struct MenuService {
    repo: Arc<dyn MenuRepository>,
    notifier: ChangeNotifier,
}

impl MenuService {
    pub fn new(repo: Arc<dyn MenuRepository>, notifier: ChangeNotifier) -> Self {
        Self { repo, notifier }
    }

    /// Menus → groups → products, each level ordered by index.
    ///
    /// Hidden products are left out unless `include_hidden` is set.
    pub async fn get_menu(&self, include_hidden: bool) -> Result<Vec<Menu>, ServiceError> {
        let mut menus = self.repo.menus().await?;
        let mut groups = self.repo.groups().await?;
        let mut products = self.repo.products().await?;

        menus.sort_by_key(|m| (m.index, m.id));
        groups.sort_by_key(|g| (g.index, g.id));
        products.sort_by_key(|p| (p.index, p.id));

        let mut by_group: HashMap<Uuid, Vec<Product>> = HashMap::new();
        for product in products {
            if include_hidden || !product.hidden {
                by_group.entry(product.group_id).or_default().push(product);
            }
        }

        let mut positions: HashMap<Uuid, usize> = HashMap::new();
        for (i, menu) in menus.iter_mut().enumerate() {
            menu.groups.clear();
            positions.insert(menu.id, i);
        }
        for mut group in groups {
            let Some(&pos) = positions.get(&group.menu_id) else {
                continue;
            };
            group.products = by_group.remove(&group.id).unwrap_or_default();
            menus[pos].groups.push(group);
        }

        Ok(menus)
    }

    /// Create the product `id` or replace it.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn upsert_product(&self, id: Uuid, input: ProductInput) -> Result<Product, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("product name is required".into()));
        }
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(ServiceError::Validation(format!(
                "invalid price {}",
                input.price
            )));
        }

        // Edits keep the product's position
        let index = match self.repo.get_product(id).await? {
            Some(existing) => existing.index,
            None => i32::MAX,
        };
        let product = Product {
            id,
            group_id: input.group_id,
            name: input.name,
            description: input.description,
            price: input.price,
            index,
            hidden: input.hidden,
        };
        self.repo.upsert_product(product.clone()).await?;

        info!(group_id = %product.group_id, "Product saved");
        self.notifier.notify_menu_changed().await;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.repo.delete_product(id).await? {
            return Err(ServiceError::NotFound(format!("product {id}")));
        }
        info!(product_id = %id, "Product deleted");
        self.notifier.notify_menu_changed().await;
        Ok(())
    }

    /// Add an empty group at the end of its menu.
    #[instrument(skip(self, input), fields(group_id = %input.id, menu_id = %input.menu_id))]
    pub async fn add_group(&self, input: GroupInput) -> Result<ProductGroup, ServiceError> {
        let name = group_name(input.name)?;
        let group = ProductGroup {
            id: input.id,
            menu_id: input.menu_id,
            name,
            index: i32::MAX,
            products: Vec::new(),
        };
        if !self.repo.insert_group(group.clone()).await? {
            return Err(ServiceError::Conflict(format!("product group {}", group.id)));
        }

        info!("Product group added");
        self.notifier.notify_menu_changed().await;
        Ok(group)
    }

    #[instrument(skip(self, name))]
    pub async fn edit_group(&self, id: Uuid, name: String) -> Result<(), ServiceError> {
        let name = group_name(name)?;
        if !self.repo.rename_group(id, name).await? {
            return Err(ServiceError::NotFound(format!("product group {id}")));
        }
        self.notifier.notify_menu_changed().await;
        Ok(())
    }

    /// Delete a group and every product in it.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.repo.delete_group(id).await? {
            return Err(ServiceError::NotFound(format!("product group {id}")));
        }
        info!(group_id = %id, "Product group deleted");
        self.notifier.notify_menu_changed().await;
        Ok(())
    }

    /// Reorder the groups of `menu_id`: position in `group_ids` becomes the
    /// group index. Every group must belong to that menu.
    #[instrument(skip(self, group_ids), fields(groups = group_ids.len()))]
    pub async fn set_group_ordering(
        &self,
        menu_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let mut indexes = Vec::with_capacity(group_ids.len());
        for (index, id) in group_ids.iter().enumerate() {
            let group = self
                .repo
                .get_group(*id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("product group {id}")))?;
            if group.menu_id != menu_id {
                return Err(ServiceError::Validation(format!(
                    "product group {id} belongs to menu {}, not {menu_id}",
                    group.menu_id
                )));
            }
            indexes.push((*id, position(index)?));
        }
        self.repo.set_group_indexes(&indexes).await?;

        self.notifier.notify_menu_changed().await;
        Ok(())
    }

    /// Reorder the products of `group_id`. Every product must belong to that
    /// group.
    #[instrument(skip(self, product_ids), fields(products = product_ids.len()))]
    pub async fn set_product_ordering(
        &self,
        group_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let mut indexes = Vec::with_capacity(product_ids.len());
        for (index, id) in product_ids.iter().enumerate() {
            let product = self
                .repo
                .get_product(*id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))?;
            if product.group_id != group_id {
                return Err(ServiceError::Validation(format!(
                    "product {id} belongs to group {}, not {group_id}",
                    product.group_id
                )));
            }
            indexes.push((*id, position(index)?));
        }
        self.repo.set_product_indexes(&indexes).await?;

        self.notifier.notify_menu_changed().await;
        Ok(())
    }
}

fn group_name(name: String) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("group name is required".into()));
    }
    Ok(name.to_string())
}

fn position(index: usize) -> Result<i32, ServiceError> {
    i32::try_from(index).map_err(|_| ServiceError::Validation("ordering list too long".into()))
}
