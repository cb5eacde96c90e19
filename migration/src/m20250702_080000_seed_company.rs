use sea_orm_migration::prelude::*;
use sha2::Digest as _;

use crate::m20250701_090000_init::{Company, User};

#[derive(DeriveMigrationName)]
pub struct Migration;

const COMPANY_ID: u128 = 1;
const ADMIN_ID: u128 = 12345;
const DRIVER_COUNT: u128 = 10;

fn seed_uuid(n: u128) -> SimpleExpr {
    Expr::val(format!("{:032x}", n)).cast_as("uuid")
}

/// Drivers take ids right after the company so they stay stable across reseeds
fn driver_id(i: u128) -> u128 {
    COMPANY_ID + i
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let time = Expr::val("2025-07-02T08:00:00.000Z").cast_as("timestamptz");

        manager
            .exec_stmt(Query::insert()
                .into_table(Company::Table)
                .columns(["id", "created_at", "updated_at", "name", "default_payment_frequency", "payment_cycle_start_day"])
                .values_panic([seed_uuid(COMPANY_ID), time.clone(), time.clone(), "Acme Freight".into(), Expr::val("weekly").cast_as("payment_frequency"), 1.into()])
                .to_owned()
            ).await?;

        for i in 1..=DRIVER_COUNT {
            let username = format!("driver{i}");

            let hashed_password = &sha2::Sha256::digest(&format!("{}:{}", username, username))[..];

            manager
                .exec_stmt(Query::insert()
                    .into_table(User::Table)
                    .columns(["id", "created_at", "updated_at", "username", "password", "role", "company_id"])
                    .values_panic([seed_uuid(driver_id(i)), time.clone(), time.clone(), username.into(), hashed_password.into(), Expr::val("driver").cast_as("role_type"), seed_uuid(COMPANY_ID)])
                    .to_owned()
            ).await?;
        }

        // Create an admin

        let hashed_password = &sha2::Sha256::digest("admin:admin")[..];

        manager
            .exec_stmt(Query::insert()
                .into_table(User::Table)
                .columns(["id", "created_at", "updated_at", "username", "password", "role", "company_id"])
                .values_panic([seed_uuid(ADMIN_ID), time.clone(), time.clone(), "admin".into(), hashed_password.into(), Expr::val("admin").cast_as("role_type"), seed_uuid(COMPANY_ID)])
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let user_ids = (1..=DRIVER_COUNT)
            .map(driver_id)
            .chain([ADMIN_ID])
            .map(seed_uuid);

        manager
            .exec_stmt(Query::delete()
                .from_table(User::Table)
                .and_where(Expr::col("id").is_in(user_ids))
                .to_owned()
            ).await?;

        manager
            .exec_stmt(Query::delete()
                .from_table(Company::Table)
                .and_where(Expr::col("id").eq(seed_uuid(COMPANY_ID)))
                .to_owned()
            ).await?;

        Ok(())
    }
}
