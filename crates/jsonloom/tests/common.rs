#![allow(missing_docs)]
#![allow(dead_code)]

use std::sync::Arc;

use jsonloom::{DeclaredType, ParserConfig, TypeDescriptor, TypeRegistry};

pub const ORIGINAL: &str = r#"
{
    "id": 1042,
    "customer": {
        "name": "Ada",
        "email": "ada@example.com"
    },
    "items": [
        {
            "sku": "A-1",
            "qty": 2,
            "price": 9.5
        },
        {
            "sku": "B-7",
            "qty": 1,
            "price": 120.25
        }
    ],
    "tags": [
        "priority",
        "gift"
    ],
    "notes": null,
    "paid": true
}"#;

/// [`ORIGINAL`] as a hand-edited config file would write it.
pub const LENIENT: &str = r"
// order export
{
    id: 1042,
    customer: {name: 'Ada', email: 'ada@example.com',},
    /* line items */
    items: [
        {sku: 'A-1', qty: 2, price: 9.5},
        {sku: 'B-7', qty: 1, price: 120.25},
    ],
    tags: ['priority', 'gift',],
    notes: null,
    paid: true,
}";

/// A loader that knows the order types, none of them registered up front.
pub fn order_loader() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register(
        TypeDescriptor::builder("shop.Customer")
            .field("name", DeclaredType::String)
            .field("email", DeclaredType::String)
            .build(),
    );
    registry.register(
        TypeDescriptor::builder("shop.Item")
            .field("sku", DeclaredType::String)
            .field("qty", DeclaredType::Int)
            .field("price", DeclaredType::Decimal)
            .build(),
    );
    registry.register(
        TypeDescriptor::builder("shop.Order")
            .field("id", DeclaredType::Long)
            .field("customer", DeclaredType::named("shop.Customer"))
            .field("items", DeclaredType::list_of(DeclaredType::named("shop.Item")))
            .field("tags", DeclaredType::list_of(DeclaredType::String))
            .field("notes", DeclaredType::String)
            .field("paid", DeclaredType::Bool)
            .build(),
    );
    Arc::new(registry)
}

pub fn order_config() -> ParserConfig {
    ParserConfig::new().with_loader(order_loader())
}

#[test]
fn fixtures_agree_with_serde_json() {
    let value: serde_json::Value = serde_json::from_str(ORIGINAL).unwrap();
    let original = serde_json::to_string(&value).unwrap();

    let options = jsonloom::ParserOptions {
        ordered_field: true,
        ..Default::default()
    };
    let strict = jsonloom::parse_with(ORIGINAL, options).unwrap();
    let lenient = jsonloom::parse_with(LENIENT, jsonloom::ParserOptions::lenient()).unwrap();

    assert_eq!(strict.to_string(), original);
    assert_eq!(lenient.to_string(), original);
}
