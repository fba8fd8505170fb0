//! Schema declaration tests over the related-model fixture.

mod common;

use common::{customer_model, shop};
use quarry_db::{FieldKind, FieldSpec, Model};

#[test]
fn related_schema_defines_cleanly() {
    let shop = shop();
    assert_eq!(shop.customer.table_name(), "customer");
    assert_eq!(shop.order_item.table_name(), "order_item");
    assert_eq!(shop.item_topping.table_name(), "item_topping");
}

#[test]
fn reverse_relations_follow_declaration_order() {
    let shop = shop();
    // Customer gained `order`; Order and Item gained `order_item`;
    // OrderItem and Topping gained `item_topping`.
    assert!(shop.customer.schema().field_by_name("order", true).is_some());
    assert!(shop.order.schema().field_by_name("order_item", true).is_some());
    assert!(shop.item.schema().field_by_name("order_item", true).is_some());
    assert!(shop
        .order_item
        .schema()
        .field_by_name("item_topping", true)
        .is_some());
    assert!(shop.topping.schema().field_by_name("item_topping", true).is_some());
}

#[test]
fn reverse_relation_is_synthetic_related_field() {
    let shop = shop();
    let related = shop.customer.schema().field_by_name("order", true).unwrap();
    match related.kind() {
        FieldKind::Related { source, fk_column } => {
            assert_eq!(source.name(), "Order");
            assert_eq!(fk_column, "customer_id");
        }
        other => panic!("expected Related, got {other:?}"),
    }
}

#[test]
fn field_names_include_relations_for_discoverability() {
    let shop = shop();
    assert_eq!(
        shop.customer.schema().field_names(),
        vec!["id", "first", "last", "order"]
    );
    // Order: declared + distinct column name + reverse relation
    assert_eq!(
        shop.order.schema().field_names(),
        vec!["id", "customer", "is_paid", "customer_id", "order_item"]
    );
}

#[test]
fn create_table_sql_for_fk_model() {
    let shop = shop();
    assert_eq!(
        shop.order.schema().generate_table_sql(),
        "CREATE TABLE \"order\" (\n  \
         id bigserial NOT NULL PRIMARY KEY, \n  \
         customer_id bigint REFERENCES customer NOT NULL, \n  \
         is_paid boolean NOT NULL DEFAULT false\n);"
    );
}

#[test]
fn schema_is_frozen_after_definition() {
    let shop = shop();
    // the only post-definition mutation is reverse registration from a
    // later-declared model; ordinary lookups never change state
    let before = shop.customer.schema().field_names();
    let _ = shop.customer.schema().field_by_name("order", true);
    let _ = shop.customer.schema().generate_table_sql();
    assert_eq!(shop.customer.schema().field_names(), before);

    let late = Model::define(
        "Complaint",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("customer", FieldSpec::foreign_key(&shop.customer).not_null()),
        ],
    )
    .unwrap();
    assert_eq!(late.table_name(), "complaint");
    let mut expected = before;
    expected.push("complaint".to_string());
    assert_eq!(shop.customer.schema().field_names(), expected);
}

#[test]
fn extend_keeps_tables_independent() {
    let base = customer_model();
    let archived = base
        .extend("ArchivedCustomer", [("archived_at", FieldSpec::date_time().auto_now())])
        .unwrap();
    assert_eq!(archived.table_name(), "archivedcustomer");
    assert_eq!(
        archived.schema().db_field_names(),
        vec!["id", "first", "last", "archived_at"]
    );
    assert_eq!(base.schema().db_field_names(), vec!["id", "first", "last"]);
}
