//! Shared fixtures: the pizza-shop schema and a recording executor.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use quarry_db::{
    Executor, FieldSpec, Model, ModelOptions, QuarryError, QuarryResult, QueryOutput, Row, Value,
};

/// Customer(id PK, first, last)
pub fn customer_model() -> Model {
    Model::define(
        "Customer",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("first", FieldSpec::text().not_null()),
            ("last", FieldSpec::text()),
        ],
    )
    .unwrap()
}

/// Order(id PK, customer FK, is_paid)
pub fn order_model(customer: &Model) -> Model {
    Model::define(
        "Order",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("customer", FieldSpec::foreign_key(customer).not_null()),
            (
                "is_paid",
                FieldSpec::boolean().not_null().default(false),
            ),
        ],
    )
    .unwrap()
}

/// Item(id PK, is_pizza, name, price_cents)
pub fn item_model() -> Model {
    Model::define(
        "Item",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("is_pizza", FieldSpec::boolean().not_null()),
            ("name", FieldSpec::text().not_null()),
            ("price_cents", FieldSpec::integer().not_null()),
        ],
    )
    .unwrap()
}

/// Topping(id PK, name, price_cents)
pub fn topping_model() -> Model {
    Model::define(
        "Topping",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("name", FieldSpec::text().not_null()),
            ("price_cents", FieldSpec::integer().not_null()),
        ],
    )
    .unwrap()
}

/// OrderItem(id PK, order FK, item FK), table `order_item`
pub fn order_item_model(order: &Model, item: &Model) -> Model {
    Model::define_with(
        "OrderItem",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("order", FieldSpec::foreign_key(order).not_null()),
            ("item", FieldSpec::foreign_key(item).not_null()),
        ],
        ModelOptions {
            db_name: Some("order_item".to_string()),
        },
    )
    .unwrap()
}

/// ItemTopping(id PK, order_item FK, topping FK), table `item_topping`
pub fn item_topping_model(order_item: &Model, topping: &Model) -> Model {
    Model::define_with(
        "ItemTopping",
        [
            ("id", FieldSpec::auto_serial().primary_key().not_null()),
            ("order_item", FieldSpec::foreign_key(order_item).not_null()),
            ("topping", FieldSpec::foreign_key(topping)),
        ],
        ModelOptions {
            db_name: Some("item_topping".to_string()),
        },
    )
    .unwrap()
}

/// The whole related-schema fixture, declared in dependency order.
pub struct Shop {
    pub customer: Model,
    pub order: Model,
    pub item: Model,
    pub topping: Model,
    pub order_item: Model,
    pub item_topping: Model,
}

pub fn shop() -> Shop {
    let customer = customer_model();
    let order = order_model(&customer);
    let item = item_model();
    let topping = topping_model();
    let order_item = order_item_model(&order, &item);
    let item_topping = item_topping_model(&order_item, &topping);
    Shop {
        customer,
        order,
        item,
        topping,
        order_item,
        item_topping,
    }
}

/// An executor that records every dispatched statement and replays canned
/// results.
pub struct RecordingExecutor {
    pub log: Mutex<Vec<(String, Vec<Value>)>>,
    pub rows: Vec<Row>,
    pub row_count: u64,
}

impl RecordingExecutor {
    pub fn returning_rows(rows: Vec<Row>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            rows,
            row_count: 0,
        }
    }

    pub fn affecting(row_count: u64) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            rows: Vec::new(),
            row_count,
        }
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> QuarryResult<QueryOutput> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(QueryOutput {
            rows: self.rows.clone(),
            row_count: self.row_count,
        })
    }
}

/// An executor that rejects everything with the given message.
pub struct FailingExecutor(pub &'static str);

#[async_trait]
impl Executor for FailingExecutor {
    async fn execute(&self, _sql: &str, _params: &[Value]) -> QuarryResult<QueryOutput> {
        Err(QuarryError::Execution(self.0.to_string()))
    }
}

/// A customer row as the backend would return it.
pub fn customer_row(id: i64, first: &str, last: &str) -> Row {
    Row::new(
        vec!["id".to_string(), "first".to_string(), "last".to_string()],
        vec![
            Value::Int(id),
            Value::String(first.to_string()),
            Value::String(last.to_string()),
        ],
    )
}
