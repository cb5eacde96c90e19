use std::str::FromStr;

use actix_web::{dev, get, post, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::Local;
use futures_util::future::LocalBoxFuture;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Admin,
    consts::{DEFAULT_PREVIEW_COUNT, MAX_PREVIEW_COUNT},
    entity::{payment_period, prelude::*, user, user_payroll},
    pages,
    period::{CycleConfig, PeriodBounds},
    reconcile::{find_covering, CallTimeout, PayrollError, Reconciler},
};

use extractor::UnlockedPeriod;
use model::*;

mod extractor;
mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(ensure_period)
        .service(get_covering_period)
        .service(preview_periods)
        .service(get_period)
        .service(lock_period)
        .service(get_period_payrolls);
}

#[post("")]
async fn ensure_period(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, payload: web::Json<EnsurePeriod>) -> Result<HttpResponse, actix_web::Error> {
    let period = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .ensure_payment_period(&admin, payload.user_id, payload.target_date).await?;

    Ok(HttpResponse::Ok().json(web::Json(period)))
}

/// Period of the caller's company covering `date`, today when omitted
#[get("")]
async fn get_covering_period(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, user: user::Model, query: web::Query<CoveringQuery>) -> Result<HttpResponse, actix_web::Error> {
    let company_id = user.company_id.ok_or(PayrollError::NoCompany)?;
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());

    let period = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .bounded("find_covering_period", find_covering(db.get_ref(), company_id, date)).await?
        .ok_or(PayrollError::PeriodNotFound)?;

    Ok(HttpResponse::Ok().json(web::Json(period)))
}

#[get("/preview")]
async fn preview_periods(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, user: user::Model, query: web::Query<PreviewQuery>) -> Result<HttpResponse, actix_web::Error> {
    let count = query.count.unwrap_or(DEFAULT_PREVIEW_COUNT);
    if !(1..=MAX_PREVIEW_COUNT).contains(&count) {
        return Err(actix_web::error::ErrorBadRequest(format!("count must be between 1 and {MAX_PREVIEW_COUNT}")));
    }

    let company_id = user.company_id.ok_or(PayrollError::NoCompany)?;

    let company = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .bounded("find_company", Company::find_by_id(company_id).one(db.get_ref())).await?
        .ok_or(PayrollError::CompanyNotFound)?;

    let config = CycleConfig::from(&company);
    let from = query.from.unwrap_or_else(|| Local::now().date_naive());

    let previous = PeriodBounds::containing(from, &config).and_then(|bounds| bounds.previous(&config));
    let periods = PeriodBounds::upcoming(from, count, &config);

    let (Some(previous), Some(periods)) = (previous, periods) else {
        return Err(PayrollError::DateOutOfRange(from).into())
    };

    Ok(HttpResponse::Ok().json(web::Json(PeriodPreview {
        frequency: config.frequency,
        previous,
        periods,
    })))
}

#[get("/{period_id}")]
async fn get_period(period: payment_period::Model) -> impl Responder {
    web::Json(period)
}

#[post("/{period_id}/lock")]
async fn lock_period(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, period: UnlockedPeriod) -> Result<HttpResponse, actix_web::Error> {
    let model = payment_period::ActiveModel {
        id: Unchanged(period.id),
        updated_at: Set(Local::now().fixed_offset()),
        updated_by: Set(Some(admin.id)),
        is_locked: Set(true),
        ..Default::default()
    };

    let period = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .bounded("lock_payment_period", PaymentPeriod::update(model).exec(db.get_ref())).await?;

    info!(period_id = %period.id, admin_id = %admin.id, "payment period locked");

    Ok(HttpResponse::Ok().json(web::Json(period)))
}

#[get("/{period_id}/payrolls")]
async fn get_period_payrolls(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, _admin: Admin, period: payment_period::Model) -> Result<HttpResponse, actix_web::Error> {
    let payrolls = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .bounded(
            "list_user_payrolls",
            UserPayroll::find()
                .filter(user_payroll::Column::PaymentPeriodId.eq(period.id))
                .order_by_asc(user_payroll::Column::CreatedAt)
                .all(db.get_ref()),
        ).await?;

    let total_net_payment = payrolls.iter().map(|p| p.net_payment).sum();

    Ok(HttpResponse::Ok().json(web::Json(PeriodPayrolls { period, payrolls, total_net_payment })))
}
