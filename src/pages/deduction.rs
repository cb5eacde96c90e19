use actix_web::{post, web, HttpResponse};
use chrono::Local;
use sea_orm::{ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Admin,
    entity::{expense_instance, prelude::*, sea_orm_active_enums::ExpenseStatus},
    pages::{self, ReassignTarget, Recorded},
    reconcile::{CallTimeout, Entry, Reconciler},
};

use model::*;

mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(create_deduction)
        .service(reactivate_deduction)
        .service(cancel_deduction)
        .service(reassign_deduction);
}

#[post("")]
async fn create_deduction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, payload: web::Json<CreateDeduction>) -> Result<HttpResponse, actix_web::Error> {
    let payload = payload.into_inner();

    pages::check_amount("amount", payload.amount)?;

    let now = Local::now().fixed_offset();

    let model = expense_instance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(Some(admin.id)),
        updated_by: Set(Some(admin.id)),
        user_id: Set(payload.user_id),
        expense_date: Set(payload.expense_date),
        description: Set(payload.description),
        amount: Set(payload.amount),
        status: Set(ExpenseStatus::Planned),
        notes: Set(payload.notes),
        ..Default::default()
    };

    let (record, outcome) = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .record(&admin, Entry {
            owner: payload.user_id,
            date: payload.expense_date,
            payment_period_id: payload.payment_period_id,
            model,
        }).await?;

    Ok(HttpResponse::Created().json(web::Json(Recorded { record, outcome })))
}

#[post("/{instance_id}/reactivate")]
async fn reactivate_deduction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, instance_id: web::Path<Uuid>, payload: Option<web::Json<StatusNote>>) -> Result<HttpResponse, actix_web::Error> {
    let note = payload.and_then(|payload| payload.into_inner().note);

    let outcome = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .reactivate_deduction(&admin, instance_id.into_inner(), note).await?;

    Ok(HttpResponse::Ok().json(web::Json(outcome)))
}

#[post("/{instance_id}/cancel")]
async fn cancel_deduction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, instance_id: web::Path<Uuid>, payload: Option<web::Json<StatusNote>>) -> Result<HttpResponse, actix_web::Error> {
    let note = payload.and_then(|payload| payload.into_inner().note);

    let outcome = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .cancel_deduction(&admin, instance_id.into_inner(), note).await?;

    Ok(HttpResponse::Ok().json(web::Json(outcome)))
}

#[post("/{instance_id}/reassign")]
async fn reassign_deduction(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, admin: Admin, instance_id: web::Path<Uuid>, payload: web::Json<ReassignTarget>) -> Result<HttpResponse, actix_web::Error> {
    let (record, outcome) = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .reassign::<ExpenseInstance>(&admin, instance_id.into_inner(), payload.payment_period_id).await?;

    Ok(HttpResponse::Ok().json(web::Json(Recorded { record, outcome })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use sea_orm::MockExecResult;

    use crate::{
        auth::Authority,
        entity::{sea_orm_active_enums::{PaymentFrequency, RoleType}, user_payroll},
        pages::testing::*,
        reconcile::{fixtures::*, PayrollTotals, ReconcileOutcome, Relinked},
    };

    use super::*;

    #[actix_web::test]
    async fn test_reactivate_without_payroll() {
        let company = company(PaymentFrequency::Biweekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let covering = period(&company, date(2025, 7, 9), date(2025, 7, 22));
        let deferred = instance(driver.id, ExpenseStatus::Deferred, None);
        let reactivated = expense_instance::Model {
            status: ExpenseStatus::Planned,
            payment_period_id: Some(covering.id),
            notes: Some("back on schedule".to_string()),
            ..deferred.clone()
        };

        let db = mock()
            .append_query_results([vec![ deferred.clone() ]])
            .append_query_results([vec![ driver.clone() ]])
            .append_query_results([vec![ company.clone() ]])
            .append_query_results([vec![ covering.clone() ]])
            .append_query_results([vec![ reactivated.clone() ]])
            .append_query_results([Vec::<user_payroll::Model>::new()]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(CallTimeout::default()))
                .service(web::scope("/deductions").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/deductions/{}/reactivate", deferred.id))
            .method(Method::POST)
            .insert_header(bearer(&admin))
            .set_json(StatusNote { note: Some("back on schedule".to_string()) })
            .to_request();

        let outcome: ReconcileOutcome = test::call_and_read_body_json(&app, req).await;
        assert_eq!(outcome, ReconcileOutcome { payment_period_id: Some(covering.id), recalculated: false, payroll_deleted: false });
    }

    #[actix_web::test]
    async fn test_cancel_twice_conflicts() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let cancelled = instance(driver.id, ExpenseStatus::Cancelled, None);

        let db = mock()
            .append_query_results([vec![ cancelled.clone() ]])
            .append_query_results([vec![ driver.clone() ]])
            .append_query_results([vec![ company.clone() ]])
            .append_query_results([Vec::<expense_instance::Model>::new()]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(CallTimeout::default()))
                .service(web::scope("/deductions").configure(config))
        ).await;

        {
            let req = test::TestRequest::default()
                .uri(&format!("/deductions/{}/cancel", cancelled.id))
                .method(Method::POST)
                .insert_header(bearer(&admin))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::CONFLICT);
        }

        {
            let req = test::TestRequest::default()
                .uri(&format!("/deductions/{}/cancel", Uuid::new_v4()))
                .method(Method::POST)
                .insert_header(bearer(&admin))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn test_reassign_deduction() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let first = period(&company, date(2025, 7, 14), date(2025, 7, 20));
        let second = period(&company, date(2025, 7, 21), date(2025, 7, 27));
        let planned = instance(driver.id, ExpenseStatus::Planned, Some(first.id));
        let emptied = payroll(&first, driver.id, PayrollTotals { total_deductions: planned.amount, ..Default::default() });
        let fresh = payroll(&second, driver.id, PayrollTotals::default());
        let charged = payroll(&second, driver.id, PayrollTotals { total_deductions: planned.amount, ..Default::default() });

        let moved = expense_instance::Model {
            payment_period_id: Some(second.id),
            updated_by: Some(admin.id),
            ..planned.clone()
        };

        let db = mock()
            .append_query_results([vec![ planned.clone() ]])
            .append_query_results([vec![ driver.clone() ]])
            .append_query_results([vec![ company.clone() ]])
            .append_query_results([vec![ second.clone() ]])
            .append_query_results([vec![ first.clone() ]])
            .append_query_results([vec![ moved.clone() ]])
            .append_query_results([vec![ emptied.clone() ]])
            .append_query_results([vec![ emptied.clone() ]])
            .append_query_results(sums([0, 0, 0, 0]))
            .append_query_results([vec![ payroll(&first, driver.id, PayrollTotals::default()) ]])
            .append_query_results([Vec::<user_payroll::Model>::new()])
            .append_query_results([vec![ fresh.clone() ]])
            .append_query_results([vec![ fresh.clone() ]])
            .append_query_results(sums([0, 0, 0, planned.amount]))
            .append_query_results([vec![ charged.clone() ]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(CallTimeout::default()))
                .service(web::scope("/deductions").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/deductions/{}/reassign", planned.id))
            .method(Method::POST)
            .insert_header(bearer(&admin))
            .set_json(ReassignTarget { payment_period_id: second.id })
            .to_request();

        let reassigned: Recorded<expense_instance::Model, Relinked> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(reassigned.record.payment_period_id, Some(second.id));
        assert_eq!(reassigned.outcome.previous, Some(ReconcileOutcome { payment_period_id: Some(first.id), recalculated: true, payroll_deleted: true }));
        assert_eq!(reassigned.outcome.current, ReconcileOutcome { payment_period_id: Some(second.id), recalculated: true, payroll_deleted: false });
    }

    #[actix_web::test]
    async fn test_create_deduction_rejects_negative_amount() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(mock().into_connection()))
                .app_data(web::Data::new(CallTimeout::default()))
                .service(web::scope("/deductions").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri("/deductions")
            .method(Method::POST)
            .insert_header(bearer(&admin))
            .set_json(CreateDeduction {
                user_id: Uuid::new_v4(),
                expense_date: date(2025, 7, 16),
                description: "Truck lease".to_string(),
                amount: -45_000,
                notes: None,
                payment_period_id: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
