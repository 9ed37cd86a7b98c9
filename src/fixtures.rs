//! Sample product dataset.
//!
//! A small static catalog used by the test suite and as a seed for the
//! in-memory document store when no external catalog is configured.

use rust_decimal::Decimal;

use crate::models::Product;

/// Two-decimal price from a cent amount.
fn dec(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Eight products across three categories, with a spread of ratings,
/// sale prices, and stock levels.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "1".into(),
            title: "Wireless Noise-Cancelling Ear Buds".into(),
            description: "Active noise cancellation with adaptive transparency.".into(),
            price: dec(18999),
            original_price: Some(dec(24999)),
            image: "https://img.example.com/earbuds.jpg".into(),
            images: None,
            category: "electronics".into(),
            rating: 4.7,
            rating_count: 38754,
            is_prime: Some(true),
            features: Some(vec![
                "Active noise cancellation".into(),
                "Adaptive transparency".into(),
            ]),
            stock_count: Some(25),
        },
        Product {
            id: "2".into(),
            title: "4K Ultra HD HDMI Cable, 6 Feet, 2-Pack".into(),
            description: "High-speed HDMI cable supporting Ethernet, 3D, and 4K video.".into(),
            price: dec(1249),
            original_price: None,
            image: "https://img.example.com/hdmi.jpg".into(),
            images: None,
            category: "electronics".into(),
            rating: 4.6,
            rating_count: 97564,
            is_prime: Some(true),
            features: None,
            stock_count: None,
        },
        Product {
            id: "3".into(),
            title: "Stainless Steel Insulated Tumbler, 30 oz".into(),
            description: "Double-wall vacuum insulation keeps drinks cold for 12 hours.".into(),
            price: dec(2495),
            original_price: Some(dec(3495)),
            image: "https://img.example.com/tumbler.jpg".into(),
            images: None,
            category: "home".into(),
            rating: 4.8,
            rating_count: 61230,
            is_prime: Some(true),
            features: None,
            stock_count: Some(120),
        },
        Product {
            id: "4".into(),
            title: "Memory Foam Pillow, Queen".into(),
            description: "Pressure-relieving memory foam with a washable cover.".into(),
            price: dec(3999),
            original_price: None,
            image: "https://img.example.com/pillow.jpg".into(),
            images: None,
            category: "home".into(),
            rating: 4.3,
            rating_count: 18421,
            is_prime: None,
            features: None,
            stock_count: Some(8),
        },
        Product {
            id: "5".into(),
            title: "USB-C Fast Charger, 30W".into(),
            description: "Compact wall charger with foldable plug.".into(),
            price: dec(1999),
            original_price: None,
            image: "https://img.example.com/charger.jpg".into(),
            images: None,
            category: "electronics".into(),
            rating: 4.5,
            rating_count: 45012,
            is_prime: Some(true),
            features: None,
            stock_count: Some(3),
        },
        Product {
            id: "6".into(),
            title: "Running Shoes, Lightweight Trainer".into(),
            description: "Breathable mesh upper with responsive cushioning.".into(),
            price: dec(6499),
            original_price: Some(dec(8999)),
            image: "https://img.example.com/shoes.jpg".into(),
            images: None,
            category: "fashion".into(),
            rating: 4.4,
            rating_count: 9034,
            is_prime: None,
            features: None,
            stock_count: Some(42),
        },
        Product {
            id: "7".into(),
            title: "Ceramic Pour-Over Coffee Dripper".into(),
            description: "Even extraction with a spiral-ribbed cone.".into(),
            price: dec(2100),
            original_price: None,
            image: "https://img.example.com/dripper.jpg".into(),
            images: None,
            category: "home".into(),
            rating: 4.9,
            rating_count: 5310,
            is_prime: Some(false),
            features: None,
            stock_count: Some(15),
        },
        Product {
            id: "8".into(),
            title: "Merino Wool Crew Socks, 3-Pack".into(),
            description: "Temperature-regulating everyday socks.".into(),
            price: dec(1650),
            original_price: None,
            image: "https://img.example.com/socks.jpg".into(),
            images: None,
            category: "fashion".into(),
            rating: 4.2,
            rating_count: 2874,
            is_prime: Some(true),
            features: None,
            stock_count: None,
        },
    ]
}
