//! Request bodies for the cart API.

use serde::Serialize;

use storefront_cart_core::{CartLine, ProductId, VariantId};

/// Body of `POST /cart/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl From<&CartLine> for CartItemInput {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
        }
    }
}

/// Direction of a single-unit quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increment,
    Decrement,
}

/// Body of `PATCH /cart/items/{cartItemId}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct QuantityUpdate {
    pub action: QuantityAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cart_item_input_wire_format() {
        let input = CartItemInput {
            product_id: ProductId::new(1),
            variant_id: None,
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(input).unwrap(),
            json!({ "productId": 1, "quantity": 2 })
        );

        let input = CartItemInput {
            variant_id: Some(VariantId::new(5)),
            ..input
        };
        assert_eq!(
            serde_json::to_value(input).unwrap(),
            json!({ "productId": 1, "variantId": 5, "quantity": 2 })
        );
    }

    #[test]
    fn test_quantity_update_wire_format() {
        let body = QuantityUpdate {
            action: QuantityAction::Decrement,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "action": "decrement" })
        );
    }
}
