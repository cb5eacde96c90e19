use chrono::Local;
use sea_orm::{sea_query::{Expr, OnConflict}, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, QueryFilter, QuerySelect, Select};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::{expense_instance, fuel_expense, load, other_income, payment_period, prelude::*, sea_orm_active_enums::{ExpenseStatus, PaymentStatus}, user_payroll};

use super::{PayrollError, ReconcileOutcome, Reconciler};

/// Aggregate monetary fields of a payroll, in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub gross_earnings: i64,
    pub other_income: i64,
    pub fuel_expenses: i64,
    pub total_deductions: i64,
}

impl PayrollTotals {
    /// `None` when the amounts do not fit in an `i64` of cents
    pub fn net_payment(&self) -> Option<i64> {
        self.gross_earnings
            .checked_add(self.other_income)?
            .checked_sub(self.fuel_expenses)?
            .checked_sub(self.total_deductions)
    }

    /// A payroll with nothing to report must not be stored
    pub fn is_empty(&self) -> bool {
        self.gross_earnings == 0
            && self.other_income == 0
            && self.fuel_expenses == 0
            && self.total_deductions == 0
    }
}

impl From<&user_payroll::Model> for PayrollTotals {
    fn from(payroll: &user_payroll::Model) -> Self {
        Self {
            gross_earnings: payroll.gross_earnings,
            other_income: payroll.other_income,
            fuel_expenses: payroll.fuel_expenses,
            total_deductions: payroll.total_deductions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub payroll_id: Uuid,
    pub totals: PayrollTotals,
    pub payroll_deleted: bool,
}

#[derive(Debug, FromQueryResult)]
struct Total {
    total: Option<i64>,
}

async fn sum_of<C: ConnectionTrait, E: EntityTrait>(db: &C, query: Select<E>, amount: E::Column) -> Result<i64, DbErr> {
    let total = query
        .select_only()
        .expr_as(Expr::expr(Expr::col(amount).sum()).cast_as("bigint"), "total")
        .into_model::<Total>()
        .one(db).await?;

    Ok(total.and_then(|t| t.total).unwrap_or_default())
}

/// Sums every transaction of `user_id` linked to `period_id`
pub(crate) async fn aggregate<C: ConnectionTrait>(db: &C, period_id: Uuid, user_id: Uuid) -> Result<PayrollTotals, DbErr> {
    let gross_earnings = sum_of(
        db,
        Load::find()
            .filter(load::Column::PaymentPeriodId.eq(period_id))
            .filter(load::Column::DriverUserId.eq(user_id)),
        load::Column::TotalAmount,
    ).await?;

    let other_income = sum_of(
        db,
        OtherIncome::find()
            .filter(other_income::Column::PaymentPeriodId.eq(period_id))
            .filter(other_income::Column::DriverUserId.eq(user_id)),
        other_income::Column::Amount,
    ).await?;

    let fuel_expenses = sum_of(
        db,
        FuelExpense::find()
            .filter(fuel_expense::Column::PaymentPeriodId.eq(period_id))
            .filter(fuel_expense::Column::DriverUserId.eq(user_id)),
        fuel_expense::Column::TotalAmount,
    ).await?;

    let total_deductions = sum_of(
        db,
        ExpenseInstance::find()
            .filter(expense_instance::Column::PaymentPeriodId.eq(period_id))
            .filter(expense_instance::Column::UserId.eq(user_id))
            .filter(expense_instance::Column::Status.is_in([ExpenseStatus::Planned, ExpenseStatus::Applied])),
        expense_instance::Column::Amount,
    ).await?;

    Ok(PayrollTotals { gross_earnings, other_income, fuel_expenses, total_deductions })
}

/// Writes the aggregate, then drops the row when it came out empty.
///
/// Returns whether the row is gone afterwards, which includes it vanishing underneath us.
async fn store_totals<C: ConnectionTrait>(db: &C, payroll_id: Uuid, totals: PayrollTotals, net_payment: i64) -> Result<bool, DbErr> {
    let updated = UserPayroll::update_many()
        .col_expr(user_payroll::Column::GrossEarnings, Expr::value(totals.gross_earnings))
        .col_expr(user_payroll::Column::OtherIncome, Expr::value(totals.other_income))
        .col_expr(user_payroll::Column::FuelExpenses, Expr::value(totals.fuel_expenses))
        .col_expr(user_payroll::Column::TotalDeductions, Expr::value(totals.total_deductions))
        .col_expr(user_payroll::Column::NetPayment, Expr::value(net_payment))
        .col_expr(user_payroll::Column::HasNegativeBalance, Expr::value(net_payment < 0))
        .col_expr(user_payroll::Column::UpdatedAt, Expr::value(Local::now().fixed_offset()))
        .filter(user_payroll::Column::Id.eq(payroll_id))
        .exec(db).await?;

    if updated.rows_affected == 0 {
        debug!(%payroll_id, "payroll disappeared during recalculation");
        return Ok(true);
    }

    let Some(stored) = UserPayroll::find_by_id(payroll_id).one(db).await? else {
        debug!(%payroll_id, "payroll removed by another writer");
        return Ok(true);
    };

    if !PayrollTotals::from(&stored).is_empty() {
        return Ok(false);
    }

    UserPayroll::delete_by_id(payroll_id).exec(db).await?;
    info!(%payroll_id, "deleted empty payroll");

    Ok(true)
}

impl Reconciler<'_> {
    /// Re-sums the payroll from its linked transactions
    pub async fn recalculate(&self, payroll_id: Uuid) -> Result<RecalcReport, PayrollError> {
        let payroll = self.bounded("find_payroll", UserPayroll::find_by_id(payroll_id).one(self.db)).await?
            .ok_or(PayrollError::PayrollNotFound)?;

        let totals = self.bounded("calculate_user_payroll", aggregate(self.db, payroll.payment_period_id, payroll.user_id)).await?;

        let Some(net_payment) = totals.net_payment() else {
            warn!(%payroll_id, ?totals, "payroll totals overflow, keeping the stored values");
            return Err(PayrollError::AmountOverflow);
        };

        let payroll_deleted = self.bounded("store_payroll_totals", store_totals(self.db, payroll.id, totals, net_payment)).await?;

        info!(%payroll_id, net_payment, payroll_deleted, "payroll recalculated");

        Ok(RecalcReport { payroll_id, totals, payroll_deleted })
    }

    async fn find_payroll(&self, period_id: Uuid, user_id: Uuid) -> Result<Option<user_payroll::Model>, PayrollError> {
        self.bounded(
            "find_user_payroll",
            UserPayroll::find()
                .filter(user_payroll::Column::PaymentPeriodId.eq(period_id))
                .filter(user_payroll::Column::UserId.eq(user_id))
                .one(self.db),
        ).await
    }

    async fn create_payroll(&self, period: &payment_period::Model, user_id: Uuid) -> Result<user_payroll::Model, PayrollError> {
        let now = Local::now().fixed_offset();

        let payroll = user_payroll::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now),
            updated_at: Set(now),
            company_id: Set(period.company_id),
            payment_period_id: Set(period.id),
            user_id: Set(user_id),
            gross_earnings: Set(0),
            other_income: Set(0),
            fuel_expenses: Set(0),
            total_deductions: Set(0),
            net_payment: Set(0),
            has_negative_balance: Set(false),
            payment_status: Set(PaymentStatus::Pending),
        };

        self.bounded(
            "create_user_payroll",
            UserPayroll::insert(payroll)
                .on_conflict(
                    OnConflict::columns([user_payroll::Column::PaymentPeriodId, user_payroll::Column::UserId])
                        .update_column(user_payroll::Column::UpdatedAt)
                        .to_owned()
                )
                .exec_with_returning(self.db),
        ).await
    }

    async fn try_settle(&self, period: &payment_period::Model, user_id: Uuid, create_if_missing: bool) -> Result<Option<RecalcReport>, PayrollError> {
        let payroll = match self.find_payroll(period.id, user_id).await? {
            Some(payroll) => payroll,
            None if create_if_missing => self.create_payroll(period, user_id).await?,
            None => {
                debug!(period_id = %period.id, %user_id, "no payroll to recalculate");
                return Ok(None);
            },
        };

        self.recalculate(payroll.id).await.map(Some)
    }

    /// Recalculates the payroll of `user_id` in `period`.
    ///
    /// With `create_if_missing` an absent payroll is created first; otherwise there is nothing to
    /// recompute and the outcome reports so. Failures here never undo the link that triggered
    /// them: they are logged and reported as `recalculated: false`.
    pub(crate) async fn settle_payroll(&self, period: &payment_period::Model, user_id: Uuid, create_if_missing: bool) -> ReconcileOutcome {
        let res = self.try_settle(period, user_id, create_if_missing).await;

        match res {
            Ok(Some(report)) => ReconcileOutcome {
                payment_period_id: Some(period.id),
                recalculated: true,
                payroll_deleted: report.payroll_deleted,
            },
            Ok(None) => ReconcileOutcome::untouched(Some(period.id)),
            Err(err) => {
                warn!(period_id = %period.id, %user_id, error = %err, "transaction saved but payroll recalculation failed");
                ReconcileOutcome::untouched(Some(period.id))
            },
        }
    }
}
