use std::str::FromStr;

use actix_web::{dev, get, post, web, FromRequest, HttpRequest, HttpResponse, Responder};
use futures_util::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::{
    auth::Admin,
    entity::{prelude::*, sea_orm_active_enums::RoleType, user, user_payroll},
    pages,
    reconcile::{CallTimeout, PayrollError, Reconciler},
};

mod extractor;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_payroll)
        .service(recalculate_payroll);
}

#[get("/{payroll_id}")]
async fn get_payroll(payroll: user_payroll::Model) -> impl Responder {
    web::Json(payroll)
}

/// Re-sums the payroll on demand. An empty result deletes the row and reports so.
#[post("/{payroll_id}/recalculate")]
async fn recalculate_payroll(db: web::Data<DatabaseConnection>, timeout: web::Data<CallTimeout>, _admin: Admin, payroll: user_payroll::Model) -> Result<HttpResponse, actix_web::Error> {
    let report = Reconciler::new(db.get_ref(), *timeout.get_ref())
        .recalculate(payroll.id).await?;

    Ok(HttpResponse::Ok().json(web::Json(report)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use sea_orm::MockExecResult;

    use crate::{auth::Authority, entity::sea_orm_active_enums::PaymentFrequency, pages::testing::*, reconcile::{fixtures::*, PayrollTotals, RecalcReport}};

    use super::*;

    #[actix_web::test]
    async fn test_recalculate_payroll() {
        let company = company(PaymentFrequency::Weekly);
        let admin = user(&company, RoleType::Admin);
        let driver = user(&company, RoleType::Driver);
        let period = period(&company, date(2025, 7, 14), date(2025, 7, 20));
        let totals = PayrollTotals { gross_earnings: 150_000, other_income: 2_500, fuel_expenses: 40_000, total_deductions: 45_000 };
        let stale = payroll(&period, driver.id, PayrollTotals::default());
        let fresh = payroll(&period, driver.id, totals);

        let db = mock()
            .append_query_results([vec![ stale.clone() ]])
            .append_query_results([vec![ stale.clone() ]])
            .append_query_results(sums([150_000, 2_500, 40_000, 45_000]))
            .append_query_results([vec![ fresh.clone() ]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(CallTimeout::default()))
                .service(web::scope("/payrolls").configure(config))
        ).await;

        {
            let driver_req = test::TestRequest::default()
                .uri(&format!("/payrolls/{}/recalculate", stale.id))
                .method(Method::POST)
                .insert_header(bearer(&driver))
                .to_request();

            let response = test::call_service(&app, driver_req).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        {
            let admin_req = test::TestRequest::default()
                .uri(&format!("/payrolls/{}/recalculate", stale.id))
                .method(Method::POST)
                .insert_header(bearer(&admin))
                .to_request();

            let report: RecalcReport = test::call_and_read_body_json(&app, admin_req).await;
            assert_eq!(report.totals, totals);
            assert_eq!(report.totals.net_payment(), Some(67_500));
            assert!(!report.payroll_deleted);
        }
    }
}
