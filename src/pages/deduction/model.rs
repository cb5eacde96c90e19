use chrono::NaiveDate;

use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CreateDeduction {
    pub(super) user_id: Uuid,
    pub(super) expense_date: NaiveDate,
    pub(super) description: String,
    pub(super) amount: i64,
    pub(super) notes: Option<String>,
    pub(super) payment_period_id: Option<Uuid>,
}

/// Optional body of the reactivate and cancel routes
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StatusNote {
    pub(super) note: Option<String>,
}
