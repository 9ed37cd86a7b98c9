use std::env;

/// Document-store collection names, overridable via environment.
/// Money rules are deliberately not configurable; they live in `money`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub products_collection: String,
    pub orders_collection: String,
    pub users_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            products_collection: "products".to_string(),
            orders_collection: "orders".to_string(),
            users_collection: "users".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Ok(Self {
            products_collection: env::var("STORE_PRODUCTS_COLLECTION")
                .unwrap_or(defaults.products_collection),
            orders_collection: env::var("STORE_ORDERS_COLLECTION")
                .unwrap_or(defaults.orders_collection),
            users_collection: env::var("STORE_USERS_COLLECTION")
                .unwrap_or(defaults.users_collection),
        })
    }
}
