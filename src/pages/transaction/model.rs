use chrono::NaiveDate;

use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CreateFuelExpense {
    pub(super) driver_user_id: Uuid,
    pub(super) transaction_date: NaiveDate,
    pub(super) fuel_type: String,
    pub(super) gallons_purchased: f64,
    pub(super) total_amount: i64,
    pub(super) station_name: Option<String>,
    pub(super) payment_period_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CreateOtherIncome {
    pub(super) driver_user_id: Uuid,
    pub(super) income_date: NaiveDate,
    pub(super) description: String,
    pub(super) income_type: String,
    pub(super) amount: i64,
    pub(super) reference_number: Option<String>,
    pub(super) payment_period_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CreateLoad {
    pub(super) driver_user_id: Uuid,
    pub(super) load_number: String,
    pub(super) delivery_date: NaiveDate,
    pub(super) total_amount: i64,
    pub(super) payment_period_id: Option<Uuid>,
}

/// Path segment naming the transaction table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum TransactionKind {
    FuelExpenses,
    OtherIncome,
    Loads,
}
