use std::ops::Deref;

use super::*;

/// Loads the period named by the `period_id` segment, hiding periods of other companies
impl FromRequest for payment_period::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let user = user::Model::from_request(&req, &mut dev::Payload::None).await?;

            let Ok(period_id) = Uuid::from_str(req.match_info().query("period_id")) else {
                return Err(actix_web::error::ErrorBadRequest("invalid `period_id`"))
            };

            let (db, timeout) = pages::app_state(&req)?;

            let Some(period) = Reconciler::new(db, timeout)
                .bounded("find_payment_period", PaymentPeriod::find_by_id(period_id).one(db)).await?
            else {
                return Err(PayrollError::PeriodNotFound.into())
            };

            if user.company_id != Some(period.company_id) {
                return Err(PayrollError::PeriodNotFound.into())
            }

            Ok(period)
        })
    }
}

pub(super) struct UnlockedPeriod(pub(super) payment_period::Model);

impl Deref for UnlockedPeriod {
    type Target = payment_period::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for UnlockedPeriod {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let period = payment_period::Model::from_request(&req, &mut dev::Payload::None).await?;

            if period.is_locked {
                return Err(PayrollError::PeriodLocked(period.id).into());
            }

            Ok(Self(period))
        })
    }
}
