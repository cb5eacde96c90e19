//! Pay period resolution and payroll reconciliation.
//!
//! Every transaction (fuel expense, other income, load, deduction instance) is attached to the
//! company pay period covering its date. The period is created lazily the first time a date
//! falls outside all existing ones. After a link changes, the owner's payroll for that period
//! is re-summed, and a payroll that sums to nothing is removed.

use std::{future::Future, time::Duration};

use actix_web::{body, http::{self, header::ContentType, StatusCode}, HttpResponse};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::{consts::DEFAULT_CALL_TIMEOUT_SECS, entity::{company, prelude::*, user}};

mod deduction;
mod linker;
mod recalculator;
mod record;
mod relink;
mod resolver;

pub use record::Entry;
pub use resolver::find_covering;

#[cfg(test)]
pub use recalculator::{PayrollTotals, RecalcReport};
#[cfg(test)]
pub use relink::Relinked;

/// Upper bound applied to every individual backend call
#[derive(Debug, Clone, Copy)]
pub struct CallTimeout(pub Duration);

impl Default for CallTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS))
    }
}

/// What happened to the payroll after a transaction was linked or unlinked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub payment_period_id: Option<Uuid>,
    pub recalculated: bool,
    pub payroll_deleted: bool,
}

impl ReconcileOutcome {
    fn untouched(payment_period_id: Option<Uuid>) -> Self {
        Self { payment_period_id, recalculated: false, payroll_deleted: false }
    }
}

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("unable to create or find a payment period: {0}")]
    PeriodCreation(#[source] DbErr),
    #[error("backend call `{0}` timed out")]
    Timeout(&'static str),
    #[error("database error")]
    Database(#[from] DbErr),
    #[error("user not found")]
    UserNotFound,
    #[error("user does not belong to any company")]
    NoCompany,
    #[error("company not found")]
    CompanyNotFound,
    #[error("user belongs to another company")]
    ForeignCompany,
    #[error("payment period not found")]
    PeriodNotFound,
    #[error("payment period belongs to another company")]
    ForeignPeriod,
    #[error("payment period {0} is locked")]
    PeriodLocked(Uuid),
    #[error("payroll not found")]
    PayrollNotFound,
    #[error("expense instance not found")]
    ExpenseNotFound,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("deduction is already active")]
    AlreadyActive,
    #[error("deduction is already cancelled")]
    AlreadyCancelled,
    #[error("no pay period can be computed around {0}")]
    DateOutOfRange(NaiveDate),
    #[error("payroll totals exceed the representable amount")]
    AmountOverflow,
}

impl actix_web::error::ResponseError for PayrollError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match self {
            PayrollError::PeriodCreation(_) => StatusCode::SERVICE_UNAVAILABLE,
            PayrollError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            PayrollError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PayrollError::UserNotFound
            | PayrollError::CompanyNotFound
            | PayrollError::PeriodNotFound
            | PayrollError::PayrollNotFound
            | PayrollError::ExpenseNotFound
            | PayrollError::TransactionNotFound => StatusCode::NOT_FOUND,
            PayrollError::NoCompany
            | PayrollError::ForeignPeriod
            | PayrollError::DateOutOfRange(_) => StatusCode::BAD_REQUEST,
            PayrollError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::ForeignCompany => StatusCode::FORBIDDEN,
            PayrollError::PeriodLocked(_)
            | PayrollError::AlreadyActive
            | PayrollError::AlreadyCancelled => StatusCode::CONFLICT,
        }
    }
}

/// Runs the resolve, link and recalculate steps against the database
pub struct Reconciler<'a> {
    db: &'a DatabaseConnection,
    call_timeout: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a DatabaseConnection, call_timeout: CallTimeout) -> Self {
        Self { db, call_timeout: call_timeout.0 }
    }

    /// Awaits a single backend call, giving up after the configured timeout
    pub(crate) async fn bounded<T, E>(&self, op: &'static str, call: impl Future<Output = Result<T, E>>) -> Result<T, PayrollError>
    where
        E: Into<PayrollError>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(res) => res.map_err(Into::into),
            Err(_) => {
                error!(op, timeout_ms = self.call_timeout.as_millis() as u64, "backend call timed out");
                Err(PayrollError::Timeout(op))
            },
        }
    }

    pub(crate) async fn company_id_of<C: ConnectionTrait>(&self, db: &C, user_id: Uuid) -> Result<Uuid, PayrollError> {
        let user = self.bounded("find_user", User::find_by_id(user_id).one(db)).await?
            .ok_or(PayrollError::UserNotFound)?;

        user.company_id.ok_or(PayrollError::NoCompany)
    }

    /// Company that `user_id` works for
    pub(crate) async fn company_of<C: ConnectionTrait>(&self, db: &C, user_id: Uuid) -> Result<company::Model, PayrollError> {
        let company_id = self.company_id_of(db, user_id).await?;

        self.bounded("find_company", Company::find_by_id(company_id).one(db)).await?
            .ok_or(PayrollError::CompanyNotFound)
    }

    /// Company of `user_id`, refusing actors from any other company
    pub(crate) async fn company_for<C: ConnectionTrait>(&self, db: &C, actor: &user::Model, user_id: Uuid) -> Result<company::Model, PayrollError> {
        let company = self.company_of(db, user_id).await?;

        if actor.company_id != Some(company.id) {
            return Err(PayrollError::ForeignCompany);
        }

        Ok(company)
    }
}
