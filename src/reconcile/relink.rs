use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, IntoActiveModel, PrimaryKeyTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::entity::{payment_period, prelude::*, user};

use super::{linker::{self, LinkedRecord, PeriodLinked}, PayrollError, ReconcileOutcome, Reconciler};

/// Payroll outcomes of moving a transaction between periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relinked {
    /// Payroll of the period the transaction left, `None` when it was not linked before
    pub previous: Option<ReconcileOutcome>,
    pub current: ReconcileOutcome,
}

impl Reconciler<'_> {
    async fn find_record<E>(&self, txn: &DatabaseTransaction, id: Uuid) -> Result<E::Model, PayrollError>
    where
        E: EntityTrait,
        <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
    {
        self.bounded("find_transaction", E::find_by_id(id).one(txn)).await?
            .ok_or(PayrollError::TransactionNotFound)
    }

    /// Period the row is linked to, refusing locked ones
    async fn unlocked_period_of<C: ConnectionTrait>(&self, db: &C, period_id: Option<Uuid>) -> Result<Option<payment_period::Model>, PayrollError> {
        let Some(period_id) = period_id else {
            return Ok(None);
        };

        let period = self.bounded("find_payment_period", PaymentPeriod::find_by_id(period_id).one(db)).await?
            .ok_or(PayrollError::PeriodNotFound)?;

        if period.is_locked {
            return Err(PayrollError::PeriodLocked(period.id));
        }

        Ok(Some(period))
    }

    /// Deletes a transaction and recalculates the payroll it counted towards.
    ///
    /// The payroll is never created here, and it is removed once nothing is left in it.
    pub async fn remove<E>(&self, actor: &user::Model, id: Uuid) -> Result<ReconcileOutcome, PayrollError>
    where
        E: EntityTrait,
        E::Model: LinkedRecord,
        <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
    {
        let txn = self.bounded("begin", self.db.begin()).await?;

        let record = self.find_record::<E>(&txn, id).await?;
        let owner = record.owner();

        self.company_for(&txn, actor, owner).await?;

        let period = self.unlocked_period_of(&txn, record.payment_period_id()).await?;

        let deleted = self.bounded("delete_transaction", E::delete_by_id(id).exec(&txn)).await?;
        if deleted.rows_affected == 0 {
            return Err(PayrollError::TransactionNotFound);
        }

        self.bounded("commit", txn.commit()).await?;

        info!(transaction_id = %id, user_id = %owner, "transaction removed");

        match period {
            Some(period) => Ok(self.settle_payroll(&period, owner, false).await),
            None => Ok(ReconcileOutcome::untouched(None)),
        }
    }

    /// Moves a transaction to `target_id` and recalculates the payrolls of both periods
    pub async fn reassign<E>(&self, actor: &user::Model, id: Uuid, target_id: Uuid) -> Result<(E::Model, Relinked), PayrollError>
    where
        E: EntityTrait,
        E::Model: LinkedRecord + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: PeriodLinked + Send,
        <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
    {
        let txn = self.bounded("begin", self.db.begin()).await?;

        let record = self.find_record::<E>(&txn, id).await?;
        let owner = record.owner();

        let company = self.company_for(&txn, actor, owner).await?;

        let target = self.bounded("find_payment_period", PaymentPeriod::find_by_id(target_id).one(&txn)).await?
            .ok_or(PayrollError::PeriodNotFound)?;
        linker::check_linkable(&target, company.id)?;

        if record.payment_period_id() == Some(target.id) {
            return Ok((record, Relinked { previous: None, current: ReconcileOutcome::untouched(Some(target.id)) }));
        }

        let previous = self.unlocked_period_of(&txn, record.payment_period_id()).await?;

        let mut update = record.into_active_model();
        update.link_to(target.id);
        update.stamp(actor.id);

        let record = self.bounded("relink_transaction", update.update(&txn)).await?;

        self.bounded("commit", txn.commit()).await?;

        info!(
            transaction_id = %id,
            from = ?previous.as_ref().map(|period| period.id),
            to = %target.id,
            "transaction moved to another payment period"
        );

        let previous = match previous {
            Some(period) => Some(self.settle_payroll(&period, owner, false).await),
            None => None,
        };
        let current = self.settle_payroll(&target, owner, true).await;

        Ok((record, Relinked { previous, current }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use sea_orm::MockExecResult;

    use crate::{entity::{fuel_expense, load, sea_orm_active_enums::*, user_payroll}, reconcile::{fixtures::*, CallTimeout, PayrollTotals}};

    use super::*;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected }
    }

    fn fuel(driver_id: Uuid, period_id: Option<Uuid>, total_amount: i64) -> fuel_expense::Model {
        fuel_expense::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            created_by: None,
            updated_by: None,
            driver_user_id: driver_id,
            payment_period_id: period_id,
            transaction_date: date(2025, 7, 16),
            fuel_type: "diesel".to_string(),
            gallons_purchased: 100.0,
            total_amount,
            station_name: None,
        }
    }

    #[actix_web::test]
    async fn test_removing_last_transaction_deletes_payroll() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let linked = period(&company, date(2025, 7, 14), date(2025, 7, 20));
        let expense = fuel(driver.id, Some(linked.id), 40_000);
        let existing = payroll(&linked, driver.id, PayrollTotals { fuel_expenses: 40_000, ..Default::default() });
        let zeroed = payroll(&linked, driver.id, PayrollTotals::default());

        let db = mock()
            .append_query_results([vec![expense.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![linked.clone()]])
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![existing.clone()]])
            .append_query_results(sums([0, 0, 0, 0]))
            .append_query_results([vec![zeroed.clone()]])
            .append_exec_results([exec(1), exec(1), exec(1)])
            .into_connection();

        let outcome = Reconciler::new(&db, CallTimeout::default())
            .remove::<fuel_expense::Entity>(&admin, expense.id).await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome { payment_period_id: Some(linked.id), recalculated: true, payroll_deleted: true });

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(r#"DELETE FROM \"fuel_expense\""#));
        assert!(log.contains(r#"DELETE FROM \"user_payroll\""#));
    }

    #[actix_web::test]
    async fn test_removing_from_locked_period_is_refused() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let mut locked = period(&company, date(2025, 7, 14), date(2025, 7, 20));
        locked.is_locked = true;
        let expense = fuel(driver.id, Some(locked.id), 40_000);

        let db = mock()
            .append_query_results([vec![expense.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![locked.clone()]])
            .into_connection();

        let res = Reconciler::new(&db, CallTimeout::default())
            .remove::<fuel_expense::Entity>(&admin, expense.id).await;

        assert!(matches!(res, Err(PayrollError::PeriodLocked(id)) if id == locked.id));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("DELETE"));
    }

    #[actix_web::test]
    async fn test_removing_missing_transaction() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);

        let db = mock()
            .append_query_results([Vec::<load::Model>::new()])
            .into_connection();

        let res = Reconciler::new(&db, CallTimeout::default())
            .remove::<load::Entity>(&admin, Uuid::new_v4()).await;

        assert!(matches!(res, Err(PayrollError::TransactionNotFound)));
    }

    #[actix_web::test]
    async fn test_reassign_recalculates_both_periods() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let first = period(&company, date(2025, 7, 14), date(2025, 7, 20));
        let second = period(&company, date(2025, 7, 21), date(2025, 7, 27));
        let expense = fuel(driver.id, Some(first.id), 40_000);

        let mut moved = expense.clone();
        moved.payment_period_id = Some(second.id);
        moved.updated_by = Some(admin.id);

        let emptied = payroll(&first, driver.id, PayrollTotals { fuel_expenses: 40_000, ..Default::default() });
        let zeroed = payroll(&first, driver.id, PayrollTotals::default());
        let created = payroll(&second, driver.id, PayrollTotals::default());
        let filled = payroll(&second, driver.id, PayrollTotals { fuel_expenses: 40_000, ..Default::default() });

        let db = mock()
            .append_query_results([vec![expense.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![second.clone()]])
            .append_query_results([vec![first.clone()]])
            .append_query_results([vec![moved.clone()]])
            // Old period: payroll loses its only transaction
            .append_query_results([vec![emptied.clone()]])
            .append_query_results([vec![emptied.clone()]])
            .append_query_results(sums([0, 0, 0, 0]))
            .append_query_results([vec![zeroed.clone()]])
            // New period: payroll is created, then filled
            .append_query_results([Vec::<user_payroll::Model>::new()])
            .append_query_results([vec![created.clone()]])
            .append_query_results([vec![created.clone()]])
            .append_query_results(sums([0, 0, 40_000, 0]))
            .append_query_results([vec![filled.clone()]])
            .append_exec_results([exec(1), exec(1), exec(1)])
            .into_connection();

        let (record, relinked) = Reconciler::new(&db, CallTimeout::default())
            .reassign::<fuel_expense::Entity>(&admin, expense.id, second.id).await
            .unwrap();

        assert_eq!(record.payment_period_id, Some(second.id));
        assert_eq!(relinked.previous, Some(ReconcileOutcome { payment_period_id: Some(first.id), recalculated: true, payroll_deleted: true }));
        assert_eq!(relinked.current, ReconcileOutcome { payment_period_id: Some(second.id), recalculated: true, payroll_deleted: false });
    }

    #[actix_web::test]
    async fn test_reassign_refuses_locked_or_foreign_target() {
        let other = company(PaymentFrequency::Weekly);
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let mut locked = period(&company, date(2025, 7, 21), date(2025, 7, 27));
        locked.is_locked = true;
        let foreign = period(&other, date(2025, 7, 21), date(2025, 7, 27));
        let deduction = instance(driver.id, ExpenseStatus::Planned, None);

        let db = mock()
            .append_query_results([vec![deduction.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![locked.clone()]])
            .append_query_results([vec![deduction.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![foreign.clone()]])
            .into_connection();

        let reconciler = Reconciler::new(&db, CallTimeout::default());

        let res = reconciler.reassign::<ExpenseInstance>(&admin, deduction.id, locked.id).await;
        assert!(matches!(res, Err(PayrollError::PeriodLocked(id)) if id == locked.id));

        let res = reconciler.reassign::<ExpenseInstance>(&admin, deduction.id, foreign.id).await;
        assert!(matches!(res, Err(PayrollError::ForeignPeriod)));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("UPDATE"));
    }
}
