//! Keyset pagination.
//!
//! Every ordering ends with `_id`, so rows are totally ordered even when the
//! declared sort keys repeat. A cursor becomes a lexicographic boundary over
//! the full ORDER BY:
//!
//! ```text
//! a1 OP1 c1 OR (a1 = c1 AND (a2 OP2 c2 OR (a2 = c2 AND _id OPid cid)))
//! ```
//!
//! Paging backwards inverts every sort direction, fetches, then reverses the
//! page so callers always see rows in the requested order.

use crate::document::encode_value;
use crate::error::{AdapterError, Result};
use crate::model::{CursorDirection, FindOptions, OrderType};
use crate::statement::{qualified, Fragment};

const INTERNAL_ID: &str = "_id";

/// Ordering and boundary derived from [`FindOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub order: Vec<String>,
    pub boundary: Option<Fragment>,
    /// Fetched rows must be reversed before returning them.
    pub reverse: bool,
}

fn comparison(order: OrderType) -> &'static str {
    match order {
        OrderType::Asc => ">",
        OrderType::Desc => "<",
    }
}

/// Builds the ORDER BY keys and the cursor boundary for `options`.
///
/// The boundary compares every order attribute in turn, not only the first.
/// A first-key-only boundary skips or repeats rows whenever the first key
/// ties across a page edge and a later key decides the order.
///
/// Fails with [`AdapterError::OrderAttributeEmpty`] when the cursor has no
/// value for an order attribute.
pub fn plan(options: &FindOptions) -> Result<PagePlan> {
    let attributes = &options.order_attributes;
    if !attributes.is_empty() && options.order_types.len() > attributes.len() {
        return Err(AdapterError::Validation(format!(
            "{} order types given for {} order attributes",
            options.order_types.len(),
            attributes.len()
        )));
    }

    let before = options.cursor_direction == CursorDirection::Before;
    let effective = |order: OrderType| if before { order.invert() } else { order };

    let mut keys = Vec::with_capacity(attributes.len());
    for (j, attribute) in attributes.iter().enumerate() {
        let order = effective(options.order_types.get(j).copied().unwrap_or_default());
        keys.push((qualified(attribute)?, order));
    }

    // With declared attributes the id only breaks ties, following the cursor
    // direction; without them the first order type picks the natural order.
    let id_order = match (attributes.is_empty(), options.order_types.first()) {
        (true, Some(order)) => effective(*order),
        _ => effective(OrderType::Asc),
    };
    let id_column = qualified(INTERNAL_ID)?;

    let mut order: Vec<String> = keys.iter().map(|(column, o)| format!("{column} {o}")).collect();
    order.push(format!("{id_column} {id_order}"));

    let boundary = match &options.cursor {
        None => None,
        Some(cursor) => {
            let mut params = Vec::with_capacity(keys.len() + 1);
            let mut values = Vec::with_capacity(keys.len());
            for (j, attribute) in attributes.iter().enumerate() {
                let value = cursor
                    .values
                    .get(attribute)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| AdapterError::OrderAttributeEmpty(attribute.clone()))?;
                let placeholder = format!(":cursor_{j}");
                params.push((placeholder.clone(), encode_value(value)?));
                values.push(placeholder);
            }
            params.push((":cursorInternalId".to_string(), cursor.internal_id.into()));

            // Built innermost first: the id comparison, then each key wrapping it.
            let mut sql = format!("{id_column} {} :cursorInternalId", comparison(id_order));
            for ((column, order), placeholder) in keys.iter().zip(&values).rev() {
                sql = format!(
                    "{column} {} {placeholder} OR ({column} = {placeholder} AND ({sql}))",
                    comparison(*order)
                );
            }
            Some(Fragment { sql: format!("({sql})"), params })
        }
    };

    Ok(PagePlan { order, boundary, reverse: before })
}
