use actix_web::{web, HttpRequest};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::{consts::MAX_AMOUNT_CENTS, reconcile::{CallTimeout, ReconcileOutcome}};

mod auth;
mod deduction;
mod payment_period;
mod payroll;
mod transaction;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/auth")
            .configure(auth::config))
        .service(web::scope("/payment_periods")
            .configure(payment_period::config))
        .service(web::scope("/transactions")
            .configure(transaction::config))
        .service(web::scope("/deductions")
            .configure(deduction::config))
        .service(web::scope("/payrolls")
            .configure(payroll::config));
}

/// A stored transaction together with what happened to its payroll
#[derive(Debug, Serialize, Deserialize)]
struct Recorded<T, O = ReconcileOutcome> {
    record: T,
    outcome: O,
}

/// Body of the reassign routes
#[derive(Debug, Serialize, Deserialize)]
struct ReassignTarget {
    payment_period_id: Uuid,
}

fn check_amount(field: &str, amount: i64) -> Result<(), actix_web::Error> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&amount) {
        return Err(actix_web::error::ErrorBadRequest(format!("`{field}` must be between 0 and {MAX_AMOUNT_CENTS} cents")));
    }

    Ok(())
}

/// Shared state needed by extractors that hit the database
fn app_state(req: &HttpRequest) -> Result<(&DatabaseConnection, CallTimeout), actix_web::Error> {
    let Some(db) = req.app_data::<web::Data<DatabaseConnection>>() else {
        return Err(actix_web::error::ErrorInternalServerError("database is not configured"))
    };

    let timeout = req.app_data::<web::Data<CallTimeout>>()
        .map(|timeout| *timeout.get_ref())
        .unwrap_or_default();

    Ok((db.get_ref(), timeout))
}
