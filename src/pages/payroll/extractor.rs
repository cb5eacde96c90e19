use super::*;

/// Loads the payroll named by `payroll_id`. Drivers only see their own, admins see their company's.
impl FromRequest for user_payroll::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let user = user::Model::from_request(&req, &mut dev::Payload::None).await?;

            let Ok(payroll_id) = Uuid::from_str(req.match_info().query("payroll_id")) else {
                return Err(actix_web::error::ErrorBadRequest("invalid `payroll_id`"))
            };

            let (db, timeout) = pages::app_state(&req)?;

            let Some(payroll) = Reconciler::new(db, timeout)
                .bounded("find_payroll", UserPayroll::find_by_id(payroll_id).one(db)).await?
            else {
                return Err(PayrollError::PayrollNotFound.into())
            };

            let visible = match user.role {
                RoleType::Admin => user.company_id == Some(payroll.company_id),
                RoleType::Driver => user.id == payroll.user_id,
            };

            if !visible {
                return Err(actix_web::error::ErrorForbidden("forbidden"))
            }

            Ok(payroll)
        })
    }
}
