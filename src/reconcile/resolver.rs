use chrono::{Local, NaiveDate};
use sea_orm::{sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{entity::{company, payment_period, prelude::*, sea_orm_active_enums::PeriodStatus, user}, period::{CycleConfig, PeriodBounds}};

use super::{PayrollError, Reconciler};

/// Earliest period of `company_id` whose bounds include `target`
pub async fn find_covering<C: ConnectionTrait>(db: &C, company_id: Uuid, target: NaiveDate) -> Result<Option<payment_period::Model>, DbErr> {
    PaymentPeriod::find()
        .filter(payment_period::Column::CompanyId.eq(company_id))
        .filter(payment_period::Column::PeriodStartDate.lte(target))
        .filter(payment_period::Column::PeriodEndDate.gte(target))
        .order_by_asc(payment_period::Column::PeriodStartDate)
        .one(db).await
}

/// Inserts the period, or hands back the row another caller already created for the same bounds
async fn upsert_period<C: ConnectionTrait>(db: &C, company: &company::Model, bounds: PeriodBounds, actor: Option<Uuid>) -> Result<payment_period::Model, DbErr> {
    let now = Local::now().fixed_offset();

    let period = payment_period::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(actor),
        updated_by: Set(actor),
        company_id: Set(company.id),
        period_start_date: Set(bounds.start),
        period_end_date: Set(bounds.end),
        period_frequency: Set(company.default_payment_frequency),
        status: Set(PeriodStatus::Draft),
        is_locked: Set(false),
    };

    PaymentPeriod::insert(period)
        .on_conflict(
            OnConflict::columns([
                payment_period::Column::CompanyId,
                payment_period::Column::PeriodStartDate,
                payment_period::Column::PeriodEndDate,
            ])
            .update_column(payment_period::Column::UpdatedAt)
            .to_owned()
        )
        .exec_with_returning(db).await
}

impl Reconciler<'_> {
    /// Period of `company` covering `target`, created as a draft when none exists yet
    pub(crate) async fn resolve_period<C: ConnectionTrait>(&self, db: &C, company: &company::Model, target: NaiveDate, actor: Option<Uuid>) -> Result<payment_period::Model, PayrollError> {
        if let Some(period) = self.bounded("find_covering_period", find_covering(db, company.id, target)).await? {
            debug!(period_id = %period.id, %target, "reusing existing payment period");
            return Ok(period);
        }

        let bounds = PeriodBounds::containing(target, &CycleConfig::from(company))
            .ok_or(PayrollError::DateOutOfRange(target))?;

        let period = self.bounded(
            "create_payment_period",
            async { upsert_period(db, company, bounds, actor).await.map_err(PayrollError::PeriodCreation) },
        ).await?;

        info!(
            period_id = %period.id,
            company_id = %company.id,
            start = %period.period_start_date,
            end = %period.period_end_date,
            "payment period ensured"
        );

        Ok(period)
    }

    /// Period covering `target` for the company of `user_id`
    pub async fn ensure_payment_period(&self, actor: &user::Model, user_id: Uuid, target: NaiveDate) -> Result<payment_period::Model, PayrollError> {
        let company_id = self.company_id_of(self.db, user_id).await?;

        self.create_payment_period_if_needed(actor, company_id, target).await
    }

    /// Period of `company_id` covering `target`, created in its own transaction when missing
    pub async fn create_payment_period_if_needed(&self, actor: &user::Model, company_id: Uuid, target: NaiveDate) -> Result<payment_period::Model, PayrollError> {
        if actor.company_id != Some(company_id) {
            return Err(PayrollError::ForeignCompany);
        }

        let txn = self.bounded("begin", self.db.begin()).await?;

        let company = self.bounded("find_company", Company::find_by_id(company_id).one(&txn)).await?
            .ok_or(PayrollError::CompanyNotFound)?;

        let period = self.resolve_period(&txn, &company, target, Some(actor.id)).await?;

        self.bounded("commit", txn.commit()).await?;

        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use crate::{entity::sea_orm_active_enums::{PaymentFrequency, RoleType}, reconcile::{fixtures::*, CallTimeout}};

    use super::*;

    #[actix_web::test]
    async fn test_covered_date_reuses_period() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let existing = period(&company, date(2025, 7, 14), date(2025, 7, 20));

        let db = mock()
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![driver.clone()]])
            .append_query_results([vec![company.clone()]])
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let reconciler = Reconciler::new(&db, CallTimeout::default());

        let first = reconciler.ensure_payment_period(&admin, driver.id, date(2025, 7, 16)).await.unwrap();
        let second = reconciler.ensure_payment_period(&admin, driver.id, date(2025, 7, 16)).await.unwrap();

        assert_eq!(first.id, existing.id);
        assert_eq!(second.id, existing.id);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("INSERT"));
    }

    #[actix_web::test]
    async fn test_uncovered_date_creates_draft_period() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let created = period(&company, date(2025, 7, 14), date(2025, 7, 20));

        let db = mock()
            .append_query_results([vec![company.clone()]])
            .append_query_results([Vec::<payment_period::Model>::new()])
            .append_query_results([vec![created.clone()]])
            .into_connection();

        let reconciler = Reconciler::new(&db, CallTimeout::default());

        let period = reconciler.create_payment_period_if_needed(&admin, company.id, date(2025, 7, 16)).await.unwrap();
        assert_eq!(period, created);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("INSERT"));
        assert!(log.contains("ON CONFLICT"));
    }

    #[actix_web::test]
    async fn test_creation_failure_is_reported() {
        let company = company(PaymentFrequency::Monthly);
        let admin = user(&company, RoleType::Admin);

        let db = mock()
            .append_query_results([vec![company.clone()]])
            .append_query_results([Vec::<payment_period::Model>::new()])
            .append_query_errors([DbErr::Custom("constraint violated".to_string())])
            .into_connection();

        let reconciler = Reconciler::new(&db, CallTimeout::default());

        let res = reconciler.create_payment_period_if_needed(&admin, company.id, date(2025, 7, 16)).await;
        assert!(matches!(res, Err(PayrollError::PeriodCreation(_))));
    }

    #[actix_web::test]
    async fn test_other_company_is_refused() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);

        let db = mock().into_connection();
        let reconciler = Reconciler::new(&db, CallTimeout::default());

        let res = reconciler.create_payment_period_if_needed(&admin, Uuid::new_v4(), date(2025, 7, 16)).await;
        assert!(matches!(res, Err(PayrollError::ForeignCompany)));
    }

    #[actix_web::test]
    async fn test_driver_of_other_company_has_no_period_ensured() {
        let other = company(PaymentFrequency::Weekly);
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let stranger = user(&other, RoleType::Driver);

        let db = mock()
            .append_query_results([vec![stranger.clone()]])
            .into_connection();

        let res = Reconciler::new(&db, CallTimeout::default())
            .ensure_payment_period(&admin, stranger.id, date(2025, 7, 16)).await;
        assert!(matches!(res, Err(PayrollError::ForeignCompany)));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("INSERT"));
    }

    #[actix_web::test]
    async fn test_date_beyond_calendar_is_rejected() {
        let company = company(PaymentFrequency::Biweekly);
        let admin = user(&company, RoleType::Admin);

        let db = mock()
            .append_query_results([vec![company.clone()]])
            .append_query_results([Vec::<payment_period::Model>::new()])
            .into_connection();

        let res = Reconciler::new(&db, CallTimeout::default())
            .create_payment_period_if_needed(&admin, company.id, NaiveDate::MAX).await;
        assert!(matches!(res, Err(PayrollError::DateOutOfRange(d)) if d == NaiveDate::MAX));
    }
}
