use actix_web::{delete, post, web, HttpResponse};
use chrono::Local;
use sea_orm::{ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Admin,
    entity::{fuel_expense, load, other_income, prelude::*},
    pages::{self, ReassignTarget, Recorded},
    reconcile::{CallTimeout, Entry, Reconciler},
};

use model::*;

mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(record_fuel_expense)
        .service(record_other_income)
        .service(record_load)
        .service(remove_transaction)
        .service(reassign_transaction);
}

#[post("/fuel_expenses")]
async fn record_fuel_expense(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, payload: web::Json<CreateFuelExpense>) -> Result<HttpResponse, actix_web::Error> {
    let payload = payload.into_inner();

    pages::check_amount("total_amount", payload.total_amount)?;
    if payload.gallons_purchased < 0.0 {
        return Err(actix_web::error::ErrorBadRequest("gallons_purchased must not be negative"));
    }

    let now = Local::now().fixed_offset();

    let model = fuel_expense::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(Some(admin.id)),
        updated_by: Set(Some(admin.id)),
        driver_user_id: Set(payload.driver_user_id),
        transaction_date: Set(payload.transaction_date),
        fuel_type: Set(payload.fuel_type),
        gallons_purchased: Set(payload.gallons_purchased),
        total_amount: Set(payload.total_amount),
        station_name: Set(payload.station_name),
        ..Default::default()
    };

    let (record, outcome) = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .record(&admin, Entry {
            owner: payload.driver_user_id,
            date: payload.transaction_date,
            payment_period_id: payload.payment_period_id,
            model,
        }).await?;

    Ok(HttpResponse::Created().json(web::Json(Recorded { record, outcome })))
}

#[post("/other_income")]
async fn record_other_income(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, payload: web::Json<CreateOtherIncome>) -> Result<HttpResponse, actix_web::Error> {
    let payload = payload.into_inner();

    pages::check_amount("amount", payload.amount)?;

    let now = Local::now().fixed_offset();

    let model = other_income::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(Some(admin.id)),
        updated_by: Set(Some(admin.id)),
        driver_user_id: Set(payload.driver_user_id),
        income_date: Set(payload.income_date),
        description: Set(payload.description),
        income_type: Set(payload.income_type),
        amount: Set(payload.amount),
        reference_number: Set(payload.reference_number),
        ..Default::default()
    };

    let (record, outcome) = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .record(&admin, Entry {
            owner: payload.driver_user_id,
            date: payload.income_date,
            payment_period_id: payload.payment_period_id,
            model,
        }).await?;

    Ok(HttpResponse::Created().json(web::Json(Recorded { record, outcome })))
}

#[post("/loads")]
async fn record_load(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, payload: web::Json<CreateLoad>) -> Result<HttpResponse, actix_web::Error> {
    let payload = payload.into_inner();

    pages::check_amount("total_amount", payload.total_amount)?;

    let now = Local::now().fixed_offset();

    let model = load::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(Some(admin.id)),
        updated_by: Set(Some(admin.id)),
        driver_user_id: Set(payload.driver_user_id),
        load_number: Set(payload.load_number),
        delivery_date: Set(payload.delivery_date),
        total_amount: Set(payload.total_amount),
        ..Default::default()
    };

    let (record, outcome) = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .record(&admin, Entry {
            owner: payload.driver_user_id,
            date: payload.delivery_date,
            payment_period_id: payload.payment_period_id,
            model,
        }).await?;

    Ok(HttpResponse::Created().json(web::Json(Recorded { record, outcome })))
}

/// Deletes the transaction and settles the payroll it counted towards
#[delete("/{kind}/{transaction_id}")]
async fn remove_transaction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, path: web::Path<(TransactionKind, Uuid)>) -> Result<HttpResponse, actix_web::Error> {
    let (kind, transaction_id) = path.into_inner();
    let reconciler = Reconciler::new(db.get_ref(), *timeout.get_ref());

    let outcome = match kind {
        TransactionKind::FuelExpenses => reconciler.remove::<FuelExpense>(&admin, transaction_id).await?,
        TransactionKind::OtherIncome => reconciler.remove::<OtherIncome>(&admin, transaction_id).await?,
        TransactionKind::Loads => reconciler.remove::<Load>(&admin, transaction_id).await?,
    };

    Ok(HttpResponse::Ok().json(web::Json(outcome)))
}

#[post("/{kind}/{transaction_id}/reassign")]
async fn reassign_transaction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, path: web::Path<(TransactionKind, Uuid)>, payload: web::Json<ReassignTarget>) -> Result<HttpResponse, actix_web::Error> {
    let (kind, transaction_id) = path.into_inner();
    let reconciler = Reconciler::new(db.get_ref(), *timeout.get_ref());
    let target = payload.payment_period_id;

    let response = match kind {
        TransactionKind::FuelExpenses => {
            let (record, outcome) = reconciler.reassign::<FuelExpense>(&admin, transaction_id, target).await?;
            HttpResponse::Ok().json(web::Json(Recorded { record, outcome }))
        },
        TransactionKind::OtherIncome => {
            let (record, outcome) = reconciler.reassign::<OtherIncome>(&admin, transaction_id, target).await?;
            HttpResponse::Ok().json(web::Json(Recorded { record, outcome }))
        },
        TransactionKind::Loads => {
            let (record, outcome) = reconciler.reassign::<Load>(&admin, transaction_id, target).await?;
            HttpResponse::Ok().json(web::Json(Recorded { record, outcome }))
        },
    };

    Ok(response)
}
