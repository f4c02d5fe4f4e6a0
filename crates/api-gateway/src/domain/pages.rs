//! Content pages: free-form pages built from typed elements (text blocks,
//! images, links) that the frontend renders. Public read, admin write.

use crate::domain::error::ServiceError;
use crate::ports::outbound::PageRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Longest accepted page id.
pub const MAX_PAGE_ID_LEN: usize = 64;

/// One block of a page. `params` is interpreted by the frontend per `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// A content page addressed by a URL-safe id (e.g. `about`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub elements: Vec<PageElement>,
}

#[derive(Clone)]
pub struct PageService {
    repo: Arc<dyn PageRepository>,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> Result<Page, ServiceError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("page {id}")))
    }

    /// All pages ordered by id.
    pub async fn list(&self) -> Result<Vec<Page>, ServiceError> {
        let mut pages = self.repo.list().await?;
        pages.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pages)
    }

    #[instrument(skip(self, page), fields(page_id = %page.id))]
    pub async fn insert(&self, page: Page) -> Result<Page, ServiceError> {
        validate(&page)?;
        if !self.repo.insert(page.clone()).await? {
            return Err(ServiceError::Conflict(format!("page {}", page.id)));
        }
        info!("Page created");
        Ok(page)
    }

    /// Replace page `id`. The id in the path wins over the one in the body.
    #[instrument(skip(self, page))]
    pub async fn update(&self, id: &str, mut page: Page) -> Result<Page, ServiceError> {
        page.id = id.to_string();
        validate(&page)?;
        if !self.repo.update(page.clone()).await? {
            return Err(ServiceError::NotFound(format!("page {id}")));
        }
        info!("Page updated");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(format!("page {id}")));
        }
        info!("Page deleted");
        Ok(())
    }
}

fn validate(page: &Page) -> Result<(), ServiceError> {
    let id_ok = !page.id.is_empty()
        && page.id.len() <= MAX_PAGE_ID_LEN
        && page
            .id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if !id_ok {
        return Err(ServiceError::Validation(format!(
            "page id must be 1-{MAX_PAGE_ID_LEN} chars of [a-z0-9_-], got {:?}",
            page.id
        )));
    }
    if page.title.trim().is_empty() {
        return Err(ServiceError::Validation("page title is required".into()));
    }
    if let Some(element) = page.elements.iter().find(|e| e.kind.trim().is_empty()) {
        return Err(ServiceError::Validation(format!(
            "element {} has no type",
            element.id
        )));
    }
    Ok(())
}
