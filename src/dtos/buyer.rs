use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::product::BuyerAction;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerActionResponse {
    pub id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    pub saved: bool,
    pub viewed: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<BuyerAction> for BuyerActionResponse {
    fn from(action: BuyerAction) -> Self {
        Self {
            id: action.id,
            buyer_id: action.buyer_id,
            product_id: action.product_id,
            saved: action.saved,
            viewed: action.viewed,
            timestamp: action.timestamp,
        }
    }
}
