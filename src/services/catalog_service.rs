//! Read-only catalog facade over the document store.
//!
//! Browse/search reads are non-critical: a failed read degrades to an
//! empty result set (logged at warn) instead of propagating.

use std::sync::Arc;

use serde_json::json;

use crate::config::StoreConfig;
use crate::models::Product;
use crate::ports::{Document, DocumentStore, Filter, Ordering};

pub struct CatalogStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl CatalogStore {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            collection: config.products_collection.clone(),
        }
    }

    /// Loads a product dataset into the store, keyed by product id.
    /// Used with the in-memory store as the static fallback catalog.
    pub async fn seed(&self, products: &[Product]) -> crate::error::StoreResult<()> {
        for product in products {
            let doc = product_to_doc(product);
            self.store.put(&self.collection, &product.id, doc).await?;
        }
        Ok(())
    }

    pub async fn all(&self) -> Vec<Product> {
        self.read_many(&[], None, None).await
    }

    pub async fn by_id(&self, id: &str) -> Option<Product> {
        match self.store.get(&self.collection, id).await {
            Ok(doc) => doc.and_then(|d| product_from_doc(id, d)),
            Err(err) => {
                tracing::warn!(error = %err, id, "catalog read failed");
                None
            }
        }
    }

    pub async fn by_category(&self, category: &str) -> Vec<Product> {
        self.read_many(&[Filter::eq("category", category)], None, None)
            .await
    }

    /// Case-insensitive substring match against title or description.
    /// The store has no full-text search, so this scans the collection.
    pub async fn search(&self, term: &str) -> Vec<Product> {
        let needle = term.to_lowercase();
        self.all()
            .await
            .into_iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Top N products by rating count, descending.
    pub async fn best_sellers(&self, n: usize) -> Vec<Product> {
        self.read_many(&[], Some(&Ordering::desc("ratingCount")), Some(n))
            .await
    }

    /// Products with a sale price (originalPrice set).
    pub async fn on_sale(&self) -> Vec<Product> {
        self.all()
            .await
            .into_iter()
            .filter(|p| p.original_price.is_some())
            .collect()
    }

    /// Highly rated products for the landing page: rating >= 4.7, max 4.
    pub async fn featured(&self) -> Vec<Product> {
        self.read_many(&[Filter::gte("rating", json!(4.7))], None, Some(4))
            .await
    }

    async fn read_many(
        &self,
        filters: &[Filter],
        ordering: Option<&Ordering>,
        limit: Option<usize>,
    ) -> Vec<Product> {
        match self.store.query(&self.collection, filters, ordering, limit).await {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(id, doc)| product_from_doc(&id, doc))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, collection = %self.collection, "catalog query failed");
                Vec::new()
            }
        }
    }
}

fn product_to_doc(product: &Product) -> Document {
    match serde_json::to_value(product) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

fn product_from_doc(id: &str, mut doc: Document) -> Option<Product> {
    // The document id is authoritative over any embedded id field.
    doc.insert("id".into(), serde_json::Value::String(id.to_string()));
    match serde_json::from_value(serde_json::Value::Object(doc)) {
        Ok(product) => Some(product),
        Err(err) => {
            tracing::warn!(error = %err, id, "malformed product document");
            None
        }
    }
}
