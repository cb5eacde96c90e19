use sea_orm::{ActiveValue::{Set, Unchanged}, ConnectionTrait, DbErr, EntityTrait, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use crate::entity::{expense_instance, prelude::*, sea_orm_active_enums::ExpenseStatus, user};

use super::{linker::{self, PeriodLinked as _}, PayrollError, ReconcileOutcome, Reconciler};

fn status_change(instance_id: Uuid, status: ExpenseStatus, note: Option<String>, actor: Uuid) -> expense_instance::ActiveModel {
    let mut model = expense_instance::ActiveModel {
        id: Unchanged(instance_id),
        status: Set(status),
        ..Default::default()
    };
    model.stamp(actor);

    if let Some(note) = note {
        model.notes = Set(Some(note));
    }

    model
}

async fn find_instance<C: ConnectionTrait>(db: &C, instance_id: Uuid) -> Result<Option<expense_instance::Model>, DbErr> {
    ExpenseInstance::find_by_id(instance_id).one(db).await
}

impl Reconciler<'_> {
    /// Brings a cancelled or deferred deduction back into the payroll.
    ///
    /// The instance goes back to `planned` and is linked to the period covering its
    /// `expense_date`. The owner's payroll is recalculated only when it already exists.
    pub async fn reactivate_deduction(&self, actor: &user::Model, instance_id: Uuid, note: Option<String>) -> Result<ReconcileOutcome, PayrollError> {
        let txn = self.bounded("begin", self.db.begin()).await?;

        let instance = self.bounded("find_expense_instance", find_instance(&txn, instance_id)).await?
            .ok_or(PayrollError::ExpenseNotFound)?;

        let company = self.company_for(&txn, actor, instance.user_id).await?;

        if let ExpenseStatus::Planned | ExpenseStatus::Applied = instance.status {
            return Err(PayrollError::AlreadyActive);
        }

        let period = self.resolve_period(&txn, &company, instance.expense_date, Some(actor.id)).await?;
        linker::check_linkable(&period, company.id)?;

        let mut update = status_change(instance.id, ExpenseStatus::Planned, note, actor.id);
        update.link_to(period.id);

        self.bounded("reactivate_expense_instance", ExpenseInstance::update(update).exec(&txn)).await?;

        self.bounded("commit", txn.commit()).await?;

        info!(%instance_id, period_id = %period.id, "deduction reactivated");

        Ok(self.settle_payroll(&period, instance.user_id, false).await)
    }

    /// Takes a deduction out of the payroll, removing the payroll if nothing else is left in it
    pub async fn cancel_deduction(&self, actor: &user::Model, instance_id: Uuid, note: Option<String>) -> Result<ReconcileOutcome, PayrollError> {
        let instance = self.bounded("find_expense_instance", find_instance(self.db, instance_id)).await?
            .ok_or(PayrollError::ExpenseNotFound)?;

        self.company_for(self.db, actor, instance.user_id).await?;

        if instance.status == ExpenseStatus::Cancelled {
            return Err(PayrollError::AlreadyCancelled);
        }

        let period = match instance.payment_period_id {
            Some(period_id) => {
                let period = self.bounded("find_payment_period", PaymentPeriod::find_by_id(period_id).one(self.db)).await?
                    .ok_or(PayrollError::PeriodNotFound)?;

                if period.is_locked {
                    return Err(PayrollError::PeriodLocked(period.id));
                }

                Some(period)
            },
            None => None,
        };

        let update = status_change(instance.id, ExpenseStatus::Cancelled, note, actor.id);
        self.bounded("cancel_expense_instance", ExpenseInstance::update(update).exec(self.db)).await?;

        info!(%instance_id, "deduction cancelled");

        match period {
            Some(period) => Ok(self.settle_payroll(&period, instance.user_id, false).await),
            None => Ok(ReconcileOutcome::untouched(None)),
        }
    }
}
