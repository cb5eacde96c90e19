use actix_web::{get, post, web, Responder};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{auth::Authority, entity::{prelude::*, user}, reconcile::PayrollError};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(login)
        .service(whoami);
}

#[derive(Debug, Serialize, Deserialize)]
struct Login {
    username: String,
    password: String,
}

#[post("/login")]
async fn login(db: web::Data<DatabaseConnection>, authority: web::Data<Authority>, credentials: web::Json<Login>) -> Result<String, actix_web::Error> {
    let hashed_password = &Sha256::digest(&format!("{}:{}", credentials.password, credentials.username))[..];
    
    let user = User::find()
        .filter(user::Column::Username.eq(&credentials.username))
        .filter(user::Column::Password.eq(hashed_password))
        .one(db.get_ref()).await
        .map_err(PayrollError::from)?;

    let Some(user) = user else {
        warn!(username = %credentials.username, "rejected login");
        return Err(actix_web::error::ErrorForbidden("invalid credentials"));
    };

    info!(user_id = %user.id, role = ?user.role, "issued token");

    Ok(
        authority.issue_for(&user)?
    )
}

#[get("")]
async fn whoami(user: user::Model) -> impl Responder {
    web::Json(user)
}
