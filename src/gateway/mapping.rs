//! Storage shapes of designs and orders and the mapping to domain values.
//!
//! Both backends persist these rows: the Local Store as JSON arrays, the
//! Remote Store as table rows. Storage names are lower/snake case
//! (`imageurl`, `customer_name`); legacy camelCase names are accepted on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{
    ChildType, ComboType, Design, Inventory, Member, Order, OrderStatus, SizeChoice,
    DEFAULT_COUNTRY_CODE, NOT_APPLICABLE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRow {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fabric: String,
    #[serde(rename = "imageurl", alias = "imageUrl", default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory: Inventory,
    #[serde(rename = "childtype", alias = "childType", default)]
    pub child_type: Option<ChildType>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "createdat", alias = "createdAt", default, deserialize_with = "coerce_millis")]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: String,
    #[serde(rename = "designid", alias = "designId")]
    pub design_id: String,
    #[serde(rename = "combotype", alias = "comboType")]
    pub combo_type: ComboType,
    #[serde(rename = "selectedsizes", alias = "selectedSizes", default, deserialize_with = "null_as_default")]
    pub selected_sizes: BTreeMap<Member, SizeChoice>,
    #[serde(alias = "customerName", default = "not_applicable", deserialize_with = "customer_text")]
    pub customer_name: String,
    #[serde(alias = "customerPhone", default = "not_applicable", deserialize_with = "customer_text")]
    pub customer_phone: String,
    #[serde(alias = "customerCountryCode", default = "default_country_code", deserialize_with = "country_code")]
    pub customer_country_code: String,
    #[serde(alias = "customerAddress", default = "not_applicable", deserialize_with = "customer_text")]
    pub customer_address: String,
    #[serde(alias = "customerEmail", default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub notes: Option<BTreeMap<Member, String>>,
    pub status: OrderStatus,
    #[serde(rename = "createdat", alias = "createdAt", default, deserialize_with = "coerce_millis")]
    pub created_at: i64,
}

impl From<DesignRow> for Design {
    fn from(row: DesignRow) -> Self {
        Design {
            id: row.id,
            name: row.name,
            color: row.color,
            fabric: row.fabric,
            image_url: row.image_url,
            label: row.label,
            child_type: row.child_type,
            inventory: row.inventory,
            created_at: row.created_at,
        }
    }
}

impl From<&Design> for DesignRow {
    fn from(design: &Design) -> Self {
        DesignRow {
            id: design.id.clone(),
            name: design.name.clone(),
            color: design.color.clone(),
            fabric: design.fabric.clone(),
            image_url: design.image_url.clone(),
            inventory: design.inventory.clone(),
            child_type: design.child_type,
            label: design.label.clone(),
            created_at: design.created_at,
        }
    }
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            design_id: row.design_id,
            combo_type: row.combo_type,
            selected_sizes: row.selected_sizes,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_country_code: row.customer_country_code,
            customer_address: row.customer_address,
            customer_email: row.customer_email,
            notes: row.notes,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        OrderRow {
            id: order.id.clone(),
            design_id: order.design_id.clone(),
            combo_type: order.combo_type,
            selected_sizes: order.selected_sizes.clone(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_country_code: order.customer_country_code.clone(),
            customer_address: order.customer_address.clone(),
            customer_email: order.customer_email.clone(),
            notes: order.notes.clone(),
            status: order.status,
            created_at: order.created_at,
        }
    }
}

fn not_applicable() -> String {
    NOT_APPLICABLE.to_string()
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a scalar as text: strings as-is, numbers in decimal. Null and empty
/// values yield `None`.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let text = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return Ok(None),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected text or number, got {other}"
            )))
        }
    };
    Ok(Some(text).filter(|s| !s.trim().is_empty()))
}

fn customer_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(deserializer)?.unwrap_or_else(not_applicable))
}

fn country_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(deserializer)?.unwrap_or_else(default_country_code))
}

/// Accepts integer, float or numeric-string timestamps.
fn coerce_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let millis = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Null => Some(0),
        _ => None,
    };
    millis.ok_or_else(|| serde::de::Error::custom("createdat is not a timestamp"))
}
