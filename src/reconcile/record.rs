use chrono::NaiveDate;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{entity::{prelude::*, user}, period::PeriodBounds};

use super::{linker::{self, PeriodLinked}, PayrollError, ReconcileOutcome, Reconciler};

/// A transaction waiting for its pay period
pub struct Entry<A> {
    /// User whose payroll the transaction counts towards
    pub owner: Uuid,
    /// Business date used to pick the period
    pub date: NaiveDate,
    /// Explicit period chosen by the caller; resolved from `date` when absent
    pub payment_period_id: Option<Uuid>,
    pub model: A,
}

impl Reconciler<'_> {
    /// Stores a new transaction linked to its pay period, then brings the owner's payroll up to date.
    ///
    /// Period resolution and the insert commit together, so a transaction is never stored without
    /// a period. The payroll step runs after commit and only reports its failures.
    pub async fn record<A>(&self, actor: &user::Model, entry: Entry<A>) -> Result<(<A::Entity as EntityTrait>::Model, ReconcileOutcome), PayrollError>
    where
        A: PeriodLinked + ActiveModelTrait + ActiveModelBehavior + Send,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let Entry { owner, date, payment_period_id, model } = entry;

        let txn = self.bounded("begin", self.db.begin()).await?;

        let company = self.company_for(&txn, actor, owner).await?;

        let period = match payment_period_id {
            Some(period_id) => {
                let period = self.bounded("find_payment_period", PaymentPeriod::find_by_id(period_id).one(&txn)).await?
                    .ok_or(PayrollError::PeriodNotFound)?;

                if !PeriodBounds::from(&period).contains(date) {
                    warn!(%period_id, %date, "transaction date falls outside the chosen payment period");
                }

                period
            },
            None => self.resolve_period(&txn, &company, date, Some(actor.id)).await?,
        };

        linker::check_linkable(&period, company.id)?;

        let record = self.bounded("link_transaction", linker::insert_linked(&txn, model, period.id)).await?;

        self.bounded("commit", txn.commit()).await?;

        info!(period_id = %period.id, user_id = %owner, %date, "transaction linked to payment period");

        let outcome = self.settle_payroll(&period, owner, true).await;

        Ok((record, outcome))
    }
}
