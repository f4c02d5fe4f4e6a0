//! # Initial Menu
//!
//! The menu a fresh node starts with: either a JSON file (a list of menus in
//! the same shape `GET /api/menu` returns) or the built-in demo menu.
//!
//! Demo ids are fixed so that clients and tests can refer to them across
//! restarts.

use std::path::{Path, PathBuf};

use shared_types::{Menu, Product, ProductGroup};
use thiserror::Error;
use uuid::Uuid;

use crate::container::config::SeedConfig;

/// Menu seeding errors.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Menu file could not be read.
    #[error("cannot read menu file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Menu file is not a valid list of menus.
    #[error("invalid menu file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A group or product points at the wrong parent.
    #[error("inconsistent menu: {0}")]
    Inconsistent(String),
}

/// Menus to load at startup.
pub fn initial_menus(config: &SeedConfig) -> Result<Vec<Menu>, SeedError> {
    match (&config.menu_file, config.demo_menu) {
        (Some(path), _) => load_file(path),
        (None, true) => Ok(vec![demo_menu()]),
        (None, false) => Ok(Vec::new()),
    }
}

/// Read a JSON list of menus and check parent ids.
pub fn load_file(path: &Path) -> Result<Vec<Menu>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let menus: Vec<Menu> = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for menu in &menus {
        for group in &menu.groups {
            if group.menu_id != menu.id {
                return Err(SeedError::Inconsistent(format!(
                    "group {} listed under menu {} but belongs to {}",
                    group.id, menu.id, group.menu_id
                )));
            }
            if let Some(product) = group.products.iter().find(|p| p.group_id != group.id) {
                return Err(SeedError::Inconsistent(format!(
                    "product {} listed under group {} but belongs to {}",
                    product.id, group.id, product.group_id
                )));
            }
        }
    }
    Ok(menus)
}

const DEMO_MENU_ID: u128 = 0x7a6e_0000_0000_4000_8000_0000_0000_0001;

/// Built-in menu for development and demos.
pub fn demo_menu() -> Menu {
    let menu_id = Uuid::from_u128(DEMO_MENU_ID);
    let groups = [
        ("Starters", &[("Samosa", "Two pastries with spiced potato", 4.5), ("Pakora", "Mixed vegetable fritters", 5.0)][..]),
        ("Curries", &[("Butter Chicken", "", 13.9), ("Chana Masala", "Chickpeas in tomato gravy", 11.5), ("Lamb Rogan Josh", "", 15.0)][..]),
        ("Bread", &[("Naan", "", 2.5), ("Garlic Naan", "", 3.0)][..]),
        ("Drinks", &[("Mango Lassi", "", 4.0), ("Masala Chai", "", 3.0)][..]),
    ];

    let mut next_id = DEMO_MENU_ID;
    let mut fresh_id = move || {
        next_id += 1;
        Uuid::from_u128(next_id)
    };

    let groups = groups
        .iter()
        .zip(0..)
        .map(|((name, products), group_index)| {
            let group_id = fresh_id();
            let products = products
                .iter()
                .zip(0..)
                .map(|(&(name, description, price), index)| Product {
                    id: fresh_id(),
                    group_id,
                    name: name.to_string(),
                    description: description.to_string(),
                    price,
                    index,
                    hidden: false,
                })
                .collect();
            ProductGroup {
                id: group_id,
                menu_id,
                name: name.to_string(),
                index: group_index,
                products,
            }
        })
        .collect();

    Menu {
        id: menu_id,
        name: "Kitchen".into(),
        index: 0,
        groups,
    }
}
