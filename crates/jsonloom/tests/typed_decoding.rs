#![expect(missing_docs)]

use jsonloom::{DeclaredType, ErrorKind, JsonParser, ParserOptions, TypeLoader, Value};

mod common;

#[test]
fn order_decodes_into_nested_beans() {
    let config = common::order_config();
    let order = config.resolve_declared("shop.Order").unwrap();
    let value = JsonParser::with_config(common::ORIGINAL, ParserOptions::default(), &config)
        .parse_typed(&order)
        .unwrap();
    let bean = value.as_bean().unwrap();
    assert_eq!(bean.get("id"), Some(Value::Int(1042)));
    assert_eq!(bean.get("notes"), Some(Value::Null));

    let customer = bean.get("customer").unwrap();
    assert_eq!(customer.as_bean().unwrap().type_descriptor().name(), "shop.Customer");

    let items = bean.get("items").unwrap();
    let second = items.index(1).unwrap();
    let second = second.as_bean().unwrap();
    assert_eq!(second.get("qty"), Some(Value::Int(1)));
    assert_eq!(second.get("price").unwrap().to_string(), "120.25");

    insta::assert_snapshot!(value.to_string(), @r#"{"@type":"shop.Order","id":1042,"customer":{"@type":"shop.Customer","name":"Ada","email":"ada@example.com"},"items":[{"@type":"shop.Item","sku":"A-1","qty":2,"price":9.5},{"@type":"shop.Item","sku":"B-7","qty":1,"price":120.25}],"tags":["priority","gift"],"notes":null,"paid":true}"#);
}

#[test]
fn lenient_text_decodes_the_same() {
    let config = common::order_config();
    let order = config.resolve_declared("shop.Order").unwrap();
    let strict = JsonParser::with_config(common::ORIGINAL, ParserOptions::default(), &config)
        .parse_typed(&order)
        .unwrap();
    let lenient = JsonParser::with_config(common::LENIENT, ParserOptions::lenient(), &config)
        .parse_typed(&order)
        .unwrap();
    assert_eq!(strict, lenient);
}

#[test]
fn smart_matching_binds_differently_cased_keys() {
    let config = common::order_config();
    let item = common::order_loader().load("shop.Item").unwrap();
    let value = JsonParser::with_config(r#"{"SKU":"Z-9","Qty":"3","PRICE":"1.10"}"#, ParserOptions::default(), &config)
        .parse_typed(&item)
        .unwrap();
    assert_eq!(value.to_string(), r#"{"@type":"shop.Item","sku":"Z-9","qty":3,"price":1.10}"#);
}

#[test]
fn declared_types_bypass_the_gate() {
    let config = common::order_config();
    config.set_safe_mode(true);
    let customers = DeclaredType::list_of(DeclaredType::named("shop.Customer"));
    let value = JsonParser::with_config(r#"[{"name":"a"},{"name":"b"}]"#, ParserOptions::default(), &config)
        .parse_as(&customers)
        .unwrap();
    assert_eq!(value.index(1).unwrap().as_bean().unwrap().get("name"), Some(Value::from("b")));
}

#[test]
fn cast_errors_name_the_field() {
    let config = common::order_config();
    let order = config.resolve_declared("shop.Order").unwrap();
    let error = JsonParser::with_config(r#"{"id":1,"paid":"maybe"}"#, ParserOptions::default(), &config)
        .parse_typed(&order)
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::Cast(_)));
    assert_eq!(error.field(), Some("paid"));
    assert_eq!(error.to_string(), "can not cast string to bool, value : \"maybe\", offset 15, line 1, column 16, token string, field paid");
}
