//! Schema registry - accepted column sets per dataset type
//!
//! Built once at startup and passed into the validator/normalizer; nothing
//! here is mutated after construction.

use crate::ingestion::types::DatasetType;
use std::collections::HashMap;

/// Accepted column names for one dataset type: the preferred `required`
/// set plus an older `legacy` set still accepted for compatibility.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub required: Vec<&'static str>,
    pub legacy: Vec<&'static str>,
}

/// Immutable lookup of schema definitions, keyed by dataset type, plus the
/// inventory column alias table.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<DatasetType, SchemaDef>,
    inventory_aliases: Vec<(&'static str, Vec<&'static str>)>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        schemas.insert(
            DatasetType::Inventory,
            SchemaDef {
                required: vec!["item_name", "category", "quantity", "price"],
                legacy: vec!["inventory_item", "item_category", "stock_on_hand", "item_price"],
            },
        );
        schemas.insert(
            DatasetType::Expense,
            SchemaDef {
                required: vec!["category", "amount", "month"],
                legacy: vec!["expense_category", "expense_amount", "expense_month"],
            },
        );
        schemas.insert(
            DatasetType::Fraud,
            SchemaDef {
                required: vec!["transaction_id", "amount", "is_fraud"],
                legacy: vec!["txn_id", "txn_amount", "fraud_flag"],
            },
        );
        schemas.insert(
            DatasetType::Energy,
            SchemaDef {
                required: vec!["hour", "usage_kwh"],
                legacy: vec!["time", "kwh"],
            },
        );

        // Inventory-only header aliases, resolved to canonical names before
        // validation. Order matters: the first alias present in the upload
        // wins, and a canonical name already present always takes priority.
        let inventory_aliases = vec![
            ("item_name", vec!["name", "product", "product_name", "item", "sku"]),
            ("category", vec!["cat", "type", "department", "group"]),
            ("quantity", vec!["qty", "stock", "count", "units", "on_hand"]),
            ("price", vec!["cost", "unit_price", "value", "amount"]),
            ("vendor", vec!["supplier", "vendor_name", "supplier_name"]),
        ];

        Self {
            schemas,
            inventory_aliases,
        }
    }

    pub fn schema(&self, dataset_type: DatasetType) -> &SchemaDef {
        // Every variant is inserted in new(); the map is total by construction.
        &self.schemas[&dataset_type]
    }

    /// Canonical-name -> alias-list pairs for inventory headers.
    pub fn inventory_aliases(&self) -> &[(&'static str, Vec<&'static str>)] {
        &self.inventory_aliases
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
