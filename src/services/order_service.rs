//! Order persistence against the document store, scoped by user id.

use std::sync::Arc;

use chrono::{DurationRound, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::models::{Address, Order, OrderItem, OrderStatus};
use crate::ports::{Document, DocumentStore, Filter, Ordering};

pub struct OrderStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl OrderStore {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            collection: config.orders_collection.clone(),
        }
    }

    /// Writes a new `pending` order. The id and creation timestamp are
    /// assigned here; the store's assigned id becomes the order id.
    pub async fn create(
        &self,
        user_id: &str,
        items: Vec<OrderItem>,
        total: Decimal,
        address: Address,
    ) -> StoreResult<Order> {
        // Truncate to the stored millisecond precision so the returned
        // order round-trips exactly.
        let now = Utc::now();
        let created_at = now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now);
        let mut order = Order {
            id: String::new(),
            user_id: user_id.to_string(),
            items,
            total,
            status: OrderStatus::Pending,
            created_at,
            address,
        };
        let mut doc = order_to_doc(&order);
        doc.remove("id");
        order.id = self.store.create(&self.collection, doc).await?;
        Ok(order)
    }

    /// A user's orders, newest first.
    pub async fn for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let rows = self
            .store
            .query(
                &self.collection,
                &[Filter::eq("userId", user_id)],
                Some(&Ordering::desc("createdAt")),
                None,
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, doc)| order_from_doc(&id, doc))
            .collect())
    }

    pub async fn by_id(&self, id: &str) -> StoreResult<Option<Order>> {
        let doc = self.store.get(&self.collection, id).await?;
        Ok(doc.and_then(|d| order_from_doc(id, d)))
    }
}

fn order_to_doc(order: &Order) -> Document {
    match serde_json::to_value(order) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

fn order_from_doc(id: &str, mut doc: Document) -> Option<Order> {
    doc.insert("id".into(), serde_json::Value::String(id.to_string()));
    match serde_json::from_value(serde_json::Value::Object(doc)) {
        Ok(order) => Some(order),
        Err(err) => {
            tracing::warn!(error = %err, id, "malformed order document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::memory::InMemoryDocumentStore;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn address() -> Address {
        Address {
            name: "Jo Buyer".into(),
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "OR".into(),
            zip_code: "97477".into(),
            country: "US".into(),
        }
    }

    fn item(product_id: &str, quantity: u32, price: &str) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            quantity,
            price: dec(price),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_pending_status() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let orders = OrderStore::new(store.clone(), &StoreConfig::default());
        let order = orders
            .create("u1", vec![item("p1", 2, "9.99")], dec("27.57"), address())
            .await
            .unwrap();
        assert!(!order.id.is_empty());
        assert_eq!(order.status, OrderStatus::Pending);

        let read_back = orders.by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(read_back, order);
    }

    #[tokio::test]
    async fn for_user_filters_and_sorts_newest_first() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let orders = OrderStore::new(store.clone(), &StoreConfig::default());
        let first = orders
            .create("u1", vec![item("p1", 1, "5.00")], dec("11.39"), address())
            .await
            .unwrap();
        // Stored timestamps have millisecond precision; keep the two
        // creates on distinct milliseconds.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = orders
            .create("u1", vec![item("p2", 1, "7.00")], dec("13.55"), address())
            .await
            .unwrap();
        orders
            .create("other", vec![item("p3", 1, "1.00")], dec("7.07"), address())
            .await
            .unwrap();

        let mine = orders.for_user("u1").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);
        assert_eq!(mine[1].id, first.id);
    }
}
