//! Cart response normalization.
//!
//! The cart API does not return a single envelope. Observed shapes:
//!
//! ```json
//! { "data": { "id": 1, "cart_items": [...] } }
//! { "cart": { "id": 1, "items": [...] } }
//! { "items": [...] }
//! ```
//!
//! [`normalize_cart`] accepts exactly these, tried in that order, and turns
//! them into a [`CartSnapshot`] or a [`Normalized::Malformed`] with a reason.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use storefront_cart_core::{CartId, CartItem, CartItemId, CartSnapshot, ProductId, VariantId};

/// Result of normalizing a cart response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Body described a cart.
    Ok(CartSnapshot),
    /// Body did not describe a cart.
    Malformed(String),
}

type Object = Map<String, Value>;

const PRICE_KEYS: &[&str] = &[
    "unit_price",
    "unitPrice",
    "price",
    "selling_price",
    "sellingPrice",
];
const STOCK_KEYS: &[&str] = &["stock", "available_stock", "availableStock"];

/// Normalize any accepted cart envelope into a [`CartSnapshot`].
#[must_use]
pub fn normalize_cart(body: &Value) -> Normalized {
    let Some(root) = body.as_object() else {
        return Normalized::Malformed("response is not a JSON object".to_string());
    };

    let Some((container, raw_items)) = locate_items(root) else {
        return Normalized::Malformed(
            "no cart items found (expected data.cart_items, cart.items, or items)".to_string(),
        );
    };

    let cart_id = container
        .and_then(|c| read_int(c, &["id", "cart_id", "cartId"]).ok().flatten())
        .or_else(|| read_int(root, &["cart_id", "cartId"]).ok().flatten())
        .or_else(|| {
            ["data", "cart"].iter().find_map(|key| {
                root.get(*key)
                    .and_then(Value::as_object)
                    .and_then(|obj| read_int(obj, &["id", "cart_id", "cartId"]).ok().flatten())
            })
        })
        .map(CartId::new);

    let mut items = Vec::with_capacity(raw_items.len());
    for (index, raw) in raw_items.iter().enumerate() {
        match convert_item(raw) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => debug!(index, "Skipping zero-quantity cart item"),
            Err(reason) => return Normalized::Malformed(format!("item {index}: {reason}")),
        }
    }

    Normalized::Ok(CartSnapshot { cart_id, items })
}

/// Find the item array and the object that holds it.
///
/// A `null` item list is read as an empty cart.
fn locate_items(root: &Object) -> Option<(Option<&Object>, &[Value])> {
    const EMPTY: &[Value] = &[];

    let nested = [("data", "cart_items"), ("cart", "items")];
    for (outer, inner) in nested {
        if let Some(container) = root.get(outer).and_then(Value::as_object) {
            match container.get(inner) {
                Some(Value::Array(items)) => return Some((Some(container), items.as_slice())),
                Some(Value::Null) => return Some((Some(container), EMPTY)),
                _ => {}
            }
        }
    }

    match root.get("items") {
        Some(Value::Array(items)) => Some((None, items.as_slice())),
        Some(Value::Null) => Some((None, EMPTY)),
        _ => None,
    }
}

/// Convert one raw item. Returns `Ok(None)` for zero-quantity items.
fn convert_item(raw: &Value) -> Result<Option<CartItem>, String> {
    let item = raw.as_object().ok_or("not an object")?;
    let product = item.get("product").and_then(Value::as_object);

    let cart_item_id = read_int(item, &["id", "cart_item_id", "cartItemId"])?
        .ok_or("missing cart item id")?;

    let product_id = match read_int(item, &["product_id", "productId"])? {
        Some(id) => id,
        None => product
            .map(|p| read_int(p, &["id"]))
            .transpose()?
            .flatten()
            .ok_or("missing product id")?,
    };

    let variant_id = read_int(item, &["variant_id", "variantId"])?;

    let quantity = read_u32(item, &["quantity", "qty"])?.ok_or("missing quantity")?;
    if quantity == 0 {
        return Ok(None);
    }

    let unit_price = match read_decimal(item, PRICE_KEYS)? {
        Some(price) => price,
        None => product
            .map(|p| read_decimal(p, PRICE_KEYS))
            .transpose()?
            .flatten()
            .ok_or("missing unit price")?,
    };
    if unit_price < Decimal::ZERO {
        return Err(format!("negative unit price {unit_price}"));
    }
    if unit_price.checked_mul(Decimal::from(quantity)).is_none() {
        return Err(format!("line total overflows ({unit_price} x {quantity})"));
    }

    let stock = match read_u32(item, STOCK_KEYS)? {
        Some(stock) => stock,
        None => product
            .map(|p| read_u32(p, STOCK_KEYS))
            .transpose()?
            .flatten()
            .unwrap_or(quantity),
    };

    let title = read_string(item, &["title", "name"])
        .or_else(|| product.and_then(|p| read_string(p, &["title", "name"])));

    Ok(Some(CartItem {
        cart_item_id: CartItemId::new(cart_item_id),
        product_id: ProductId::new(product_id),
        variant_id: variant_id.map(VariantId::new),
        quantity,
        unit_price,
        stock,
        title,
    }))
}

// =============================================================================
// Field Readers
// =============================================================================

/// First non-null value among `keys`, with the key it was found under.
fn field<'a, 'k>(obj: &'a Object, keys: &[&'k str]) -> Option<(&'k str, &'a Value)> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .filter(|v| !v.is_null())
            .map(|v| (*key, v))
    })
}

/// Integer from a JSON number or numeric string.
fn read_int(obj: &Object, keys: &[&str]) -> Result<Option<i64>, String> {
    let Some((key, value)) = field(obj, keys) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| format!("`{key}` is not an integer"))
}

fn read_u32(obj: &Object, keys: &[&str]) -> Result<Option<u32>, String> {
    let Some(value) = read_int(obj, keys)? else {
        return Ok(None);
    };
    u32::try_from(value)
        .map(Some)
        .map_err(|_| format!("`{}` is out of range: {value}", keys.first().unwrap_or(&"")))
}

/// Decimal from a JSON number or string. Numbers are read through their
/// textual form so `9.99` stays exactly `9.99`.
fn read_decimal(obj: &Object, keys: &[&str]) -> Result<Option<Decimal>, String> {
    let Some((key, value)) = field(obj, keys) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| format!("`{key}` is not a decimal"))
}

fn read_string(obj: &Object, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(|(_, v)| v.as_str().map(str::to_string))
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, then `error` (string or object with `message`), then
/// the first entry of `errors`.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    fn message_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(obj) => obj.get("message").and_then(message_of),
            _ => None,
        }
    }

    let value: Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;

    obj.get("message")
        .and_then(message_of)
        .or_else(|| obj.get("error").and_then(message_of))
        .or_else(|| {
            obj.get("errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(message_of)
        })
}
