use chrono::Local;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel};
use uuid::Uuid;

use crate::entity::{expense_instance, fuel_expense, load, other_income, payment_period};

use super::PayrollError;

/// Transaction rows that carry a `payment_period_id`
pub trait PeriodLinked {
    fn link_to(&mut self, period_id: Uuid);

    /// Records `actor` as the last writer
    fn stamp(&mut self, actor: Uuid);
}

/// Read side of [`PeriodLinked`]
pub trait LinkedRecord {
    /// User whose payroll the row counts towards
    fn owner(&self) -> Uuid;

    fn payment_period_id(&self) -> Option<Uuid>;
}

macro_rules! period_linked {
    ($($entity:ident => $owner:ident),+ $(,)?) => {$(
        impl PeriodLinked for $entity::ActiveModel {
            fn link_to(&mut self, period_id: Uuid) {
                self.payment_period_id = Set(Some(period_id));
            }

            fn stamp(&mut self, actor: Uuid) {
                self.updated_by = Set(Some(actor));
                self.updated_at = Set(Local::now().fixed_offset());
            }
        }

        impl LinkedRecord for $entity::Model {
            fn owner(&self) -> Uuid {
                self.$owner
            }

            fn payment_period_id(&self) -> Option<Uuid> {
                self.payment_period_id
            }
        }
    )+};
}

period_linked! {
    fuel_expense => driver_user_id,
    other_income => driver_user_id,
    load => driver_user_id,
    expense_instance => user_id,
}

/// A period accepts new links only from its own company and only while unlocked
pub(crate) fn check_linkable(period: &payment_period::Model, company_id: Uuid) -> Result<(), PayrollError> {
    if period.company_id != company_id {
        return Err(PayrollError::ForeignPeriod);
    }

    if period.is_locked {
        return Err(PayrollError::PeriodLocked(period.id));
    }

    Ok(())
}

/// Writes a fresh transaction already pointing at `period_id`
pub(crate) async fn insert_linked<C, A>(db: &C, mut model: A, period_id: Uuid) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    C: ConnectionTrait,
    A: PeriodLinked + ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    model.link_to(period_id);
    model.insert(db).await
}
