use serde::Deserialize;
use validator::Validate;

use crate::dtos::round_price;
use crate::error::{AppError, AppResult};
use crate::models::product::{NewTier, WholesaleTier};

/// One entry of a `tierPrices` payload. Entries missing either field are
/// skipped rather than rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TierPriceInput {
    #[validate(range(min = 1, message = "Minimum quantity must be at least 1"))]
    pub min_quantity: Option<i32>,
    #[validate(range(min = 0.0, max = 9999999999.99, message = "Price per unit must be between 0 and 9999999999.99"))]
    pub price_per_unit: Option<f64>,
}

/// Validates the supplied tiers and returns the complete entries ordered by
/// minimum quantity.
pub fn normalize_tiers(inputs: &[TierPriceInput]) -> AppResult<Vec<NewTier>> {
    for (idx, input) in inputs.iter().enumerate() {
        input.validate().map_err(|errors| {
            let mut err = AppError::from(errors);
            if let AppError::ValidationError { fields, .. } = &mut err {
                for field in fields.iter_mut() {
                    field.field = format!("tierPrices[{idx}].{}", field.field);
                }
            }
            err
        })?;
        if input.price_per_unit.is_some_and(|p| !p.is_finite()) {
            return Err(AppError::invalid_field(
                &format!("tierPrices[{idx}].pricePerUnit"),
                "Price per unit must be a number",
            ));
        }
    }

    let mut tiers: Vec<NewTier> = inputs
        .iter()
        .filter_map(|input| match (input.min_quantity, input.price_per_unit) {
            (Some(min_quantity), Some(price)) => Some(NewTier { min_quantity, price_per_unit: round_price(price) }),
            _ => None,
        })
        .collect();

    tiers.sort_by_key(|t| t.min_quantity);
    Ok(tiers)
}

/// Ascending by minimum quantity, ties broken by insertion id.
pub fn sort_tiers(tiers: &mut [WholesaleTier]) {
    tiers.sort_by_key(|t| (t.min_quantity, t.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn input(min_quantity: Option<i32>, price_per_unit: Option<f64>) -> TierPriceInput {
        TierPriceInput { min_quantity, price_per_unit }
    }

    fn tier(id: i64, min_quantity: i32, price_per_unit: f64) -> WholesaleTier {
        WholesaleTier { id, product_id: 1, min_quantity, price_per_unit, created_at: Utc::now() }
    }

    #[test]
    fn orders_by_min_quantity() {
        let tiers = normalize_tiers(&[input(Some(25), Some(10500.0)), input(Some(10), Some(11000.0))]).unwrap();

        assert_eq!(
            tiers,
            vec![
                NewTier { min_quantity: 10, price_per_unit: 11000.0 },
                NewTier { min_quantity: 25, price_per_unit: 10500.0 },
            ]
        );
    }

    #[test]
    fn skips_incomplete_entries() {
        let tiers = normalize_tiers(&[
            input(Some(5), None),
            input(None, Some(100.0)),
            input(Some(50), Some(90.0)),
        ])
        .unwrap();

        assert_eq!(tiers, vec![NewTier { min_quantity: 50, price_per_unit: 90.0 }]);
    }

    #[test]
    fn rejects_invalid_values_with_indexed_field() {
        let err = normalize_tiers(&[input(Some(10), Some(5.0)), input(Some(0), Some(5.0))]).unwrap_err();

        match err {
            AppError::ValidationError { fields, .. } => {
                assert_eq!(fields[0].field, "tierPrices[1].minQuantity");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(normalize_tiers(&[input(Some(1), Some(-1.0))]).is_err());
        assert!(normalize_tiers(&[input(Some(1), Some(1e12))]).is_err());
    }

    #[test]
    fn prices_round_to_cents() {
        let tiers = normalize_tiers(&[input(Some(10), Some(99.999))]).unwrap();
        assert_eq!(tiers[0].price_per_unit, 100.0);
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(normalize_tiers(&[]).unwrap().is_empty());
    }

    #[test]
    fn sort_breaks_ties_by_id() {
        let mut tiers = vec![tier(3, 10, 1.0), tier(1, 25, 2.0), tier(2, 10, 3.0)];
        sort_tiers(&mut tiers);
        let ids: Vec<i64> = tiers.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
