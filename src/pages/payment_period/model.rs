use chrono::NaiveDate;

use crate::{entity::{sea_orm_active_enums::PaymentFrequency, user_payroll}, period::PeriodBounds};

use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct EnsurePeriod {
    pub(super) user_id: Uuid,
    pub(super) target_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CoveringQuery {
    pub(super) date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PreviewQuery {
    pub(super) from: Option<NaiveDate>,
    pub(super) count: Option<u32>,
}

/// Computed bounds only, nothing here is stored
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PeriodPreview {
    pub(super) frequency: PaymentFrequency,
    /// Period right before the one containing `from`
    pub(super) previous: PeriodBounds,
    pub(super) periods: Vec<PeriodBounds>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PeriodPayrolls {
    pub(super) period: payment_period::Model,
    pub(super) payrolls: Vec<user_payroll::Model>,
    pub(super) total_net_payment: i64,
}
