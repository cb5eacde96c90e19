use sea_orm_migration::{prelude::{extension::postgres::TypeDropStatement, *}, sea_orm::{ActiveEnum, DbBackend, DeriveActiveEnum, EnumIter, Schema}};

use crate::{setup_user_table_fk, util::{default_table_statement, default_user_table_statement, foreign_key}};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(DbBackend::Postgres);

        manager.create_type(schema.create_enum_from_active_enum::<RoleType>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<PaymentFrequency>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<PeriodStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<PaymentStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<ExpenseStatus>()).await?;

        manager
            .create_table(default_table_statement()
                .table(Company::Table)
                .col(ColumnDef::new(Company::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Company::DefaultPaymentFrequency)
                    .custom(PaymentFrequency::name())
                    .not_null()
                    .default("weekly"))
                .col(ColumnDef::new(Company::PaymentCycleStartDay)
                    .small_integer()
                    .default(1))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(User::Table)
                .col(ColumnDef::new(User::Username)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(User::Password)
                    .binary()
                    .not_null()) // SHA-256 of `password:username`
                .col(ColumnDef::new(User::Role)
                    .custom(RoleType::name())
                    .not_null())
                .col(ColumnDef::new(User::CompanyId)
                    .uuid())
                .take()
            ).await?;

        manager.create_foreign_key(foreign_key((User::Table, User::CompanyId), Company::Table, ForeignKeyAction::SetNull)).await?;

        manager
            .create_table(default_user_table_statement()
                .table(PaymentPeriod::Table)
                .col(ColumnDef::new(PaymentPeriod::CompanyId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(PaymentPeriod::PeriodStartDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(PaymentPeriod::PeriodEndDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(PaymentPeriod::PeriodFrequency)
                    .custom(PaymentFrequency::name())
                    .not_null())
                .col(ColumnDef::new(PaymentPeriod::Status)
                    .custom(PeriodStatus::name())
                    .not_null()
                    .default("draft"))
                .col(ColumnDef::new(PaymentPeriod::IsLocked)
                    .boolean()
                    .not_null()
                    .default(false))
                .check(Expr::col(PaymentPeriod::PeriodStartDate).lte(Expr::col(PaymentPeriod::PeriodEndDate)))
                .take()
            ).await?;
        setup_user_table_fk!(manager, PaymentPeriod::Table);

        manager.create_foreign_key(foreign_key((PaymentPeriod::Table, PaymentPeriod::CompanyId), Company::Table, ForeignKeyAction::Cascade)).await?;

        // Racing creators converge on this key
        manager
            .create_index(Index::create()
                .name("payment_period_company_bounds_key")
                .table(PaymentPeriod::Table)
                .col(PaymentPeriod::CompanyId)
                .col(PaymentPeriod::PeriodStartDate)
                .col(PaymentPeriod::PeriodEndDate)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(UserPayroll::Table)
                .col(ColumnDef::new(UserPayroll::CompanyId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(UserPayroll::PaymentPeriodId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(UserPayroll::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(UserPayroll::GrossEarnings)
                    .big_integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(UserPayroll::OtherIncome)
                    .big_integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(UserPayroll::FuelExpenses)
                    .big_integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(UserPayroll::TotalDeductions)
                    .big_integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(UserPayroll::NetPayment)
                    .big_integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(UserPayroll::HasNegativeBalance)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(UserPayroll::PaymentStatus)
                    .custom(PaymentStatus::name())
                    .not_null()
                    .default("pending"))
                .take()
            ).await?;

        manager.create_foreign_key(foreign_key((UserPayroll::Table, UserPayroll::CompanyId), Company::Table, ForeignKeyAction::Cascade)).await?;
        manager.create_foreign_key(foreign_key((UserPayroll::Table, UserPayroll::PaymentPeriodId), PaymentPeriod::Table, ForeignKeyAction::Cascade)).await?;
        manager.create_foreign_key(foreign_key((UserPayroll::Table, UserPayroll::UserId), User::Table, ForeignKeyAction::Cascade)).await?;

        manager
            .create_index(Index::create()
                .name("user_payroll_period_user_key")
                .table(UserPayroll::Table)
                .col(UserPayroll::PaymentPeriodId)
                .col(UserPayroll::UserId)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_user_table_statement()
                .table(FuelExpense::Table)
                .col(ColumnDef::new(FuelExpense::DriverUserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(FuelExpense::PaymentPeriodId)
                    .uuid())
                .col(ColumnDef::new(FuelExpense::TransactionDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(FuelExpense::FuelType)
                    .text()
                    .not_null())
                .col(ColumnDef::new(FuelExpense::GallonsPurchased)
                    .double()
                    .not_null())
                .col(ColumnDef::new(FuelExpense::TotalAmount)
                    .big_integer()
                    .not_null())
                .col(ColumnDef::new(FuelExpense::StationName)
                    .text())
                .take()
            ).await?;
        setup_user_table_fk!(manager, FuelExpense::Table);
        link_transaction_table(manager, FuelExpense::Table, FuelExpense::DriverUserId, FuelExpense::PaymentPeriodId).await?;

        manager
            .create_table(default_user_table_statement()
                .table(OtherIncome::Table)
                .col(ColumnDef::new(OtherIncome::DriverUserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(OtherIncome::PaymentPeriodId)
                    .uuid())
                .col(ColumnDef::new(OtherIncome::IncomeDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(OtherIncome::Description)
                    .text()
                    .not_null())
                .col(ColumnDef::new(OtherIncome::IncomeType)
                    .text()
                    .not_null())
                .col(ColumnDef::new(OtherIncome::Amount)
                    .big_integer()
                    .not_null())
                .col(ColumnDef::new(OtherIncome::ReferenceNumber)
                    .text())
                .take()
            ).await?;
        setup_user_table_fk!(manager, OtherIncome::Table);
        link_transaction_table(manager, OtherIncome::Table, OtherIncome::DriverUserId, OtherIncome::PaymentPeriodId).await?;

        manager
            .create_table(default_user_table_statement()
                .table(Load::Table)
                .col(ColumnDef::new(Load::DriverUserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Load::PaymentPeriodId)
                    .uuid())
                .col(ColumnDef::new(Load::LoadNumber)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Load::DeliveryDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Load::TotalAmount)
                    .big_integer()
                    .not_null())
                .take()
            ).await?;
        setup_user_table_fk!(manager, Load::Table);
        link_transaction_table(manager, Load::Table, Load::DriverUserId, Load::PaymentPeriodId).await?;

        manager
            .create_table(default_user_table_statement()
                .table(ExpenseInstance::Table)
                .col(ColumnDef::new(ExpenseInstance::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(ExpenseInstance::PaymentPeriodId)
                    .uuid())
                .col(ColumnDef::new(ExpenseInstance::ExpenseDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(ExpenseInstance::Description)
                    .text()
                    .not_null())
                .col(ColumnDef::new(ExpenseInstance::Amount)
                    .big_integer()
                    .not_null())
                .col(ColumnDef::new(ExpenseInstance::Status)
                    .custom(ExpenseStatus::name())
                    .not_null()
                    .default("planned"))
                .col(ColumnDef::new(ExpenseInstance::Notes)
                    .text())
                .take()
            ).await?;
        setup_user_table_fk!(manager, ExpenseInstance::Table);
        link_transaction_table(manager, ExpenseInstance::Table, ExpenseInstance::UserId, ExpenseInstance::PaymentPeriodId).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(TableDropStatement::new().table(ExpenseInstance::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(Load::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(OtherIncome::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(FuelExpense::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(UserPayroll::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(PaymentPeriod::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(User::Table).take()).await?;
        manager.drop_table(TableDropStatement::new().table(Company::Table).take()).await?;

        for name in [
            ExpenseStatus::name(),
            PaymentStatus::name(),
            PeriodStatus::name(),
            PaymentFrequency::name(),
            RoleType::name(),
        ] {
            manager
                .drop_type(
                    TypeDropStatement::new()
                        .name(name)
                        .to_owned()
                ).await?;
        }

        Ok(())
    }
}

/// Owner and period foreign keys of a transaction table, plus the index the payroll sums run on
async fn link_transaction_table(manager: &SchemaManager<'_>, table: impl Iden + Copy + 'static, owner: impl Iden + Copy + 'static, period: impl Iden + Copy + 'static) -> Result<(), DbErr> {
    manager.create_foreign_key(foreign_key((table, owner), User::Table, ForeignKeyAction::Cascade)).await?;
    manager.create_foreign_key(foreign_key((table, period), PaymentPeriod::Table, ForeignKeyAction::SetNull)).await?;

    manager
        .create_index(Index::create()
            .name(format!("{}_period_owner_idx", table.to_string()))
            .table(table)
            .col(period)
            .col(owner)
            .take()
        ).await
}

#[derive(Iden)]
pub(crate) enum Company {
    Table,
    Name,
    DefaultPaymentFrequency,
    PaymentCycleStartDay,
}

#[derive(Iden)]
pub(crate) enum User {
    Table,
    Username,
    Password,
    Role,
    CompanyId,
}

#[derive(Iden, Clone, Copy)]
enum PaymentPeriod {
    Table,
    CompanyId,
    PeriodStartDate,
    PeriodEndDate,
    PeriodFrequency,
    Status,
    IsLocked,
}

#[derive(Iden)]
enum UserPayroll {
    Table,
    CompanyId,
    PaymentPeriodId,
    UserId,
    GrossEarnings,
    OtherIncome,
    FuelExpenses,
    TotalDeductions,
    NetPayment,
    HasNegativeBalance,
    PaymentStatus,
}

#[derive(Iden, Clone, Copy)]
enum FuelExpense {
    Table,
    DriverUserId,
    PaymentPeriodId,
    TransactionDate,
    FuelType,
    GallonsPurchased,
    TotalAmount,
    StationName,
}

#[derive(Iden, Clone, Copy)]
enum OtherIncome {
    Table,
    DriverUserId,
    PaymentPeriodId,
    IncomeDate,
    Description,
    IncomeType,
    Amount,
    ReferenceNumber,
}

#[derive(Iden, Clone, Copy)]
enum Load {
    Table,
    DriverUserId,
    PaymentPeriodId,
    LoadNumber,
    DeliveryDate,
    TotalAmount,
}

#[derive(Iden, Clone, Copy)]
enum ExpenseInstance {
    Table,
    UserId,
    PaymentPeriodId,
    ExpenseDate,
    Description,
    Amount,
    Status,
    Notes,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "role_type")]
enum RoleType {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "driver")]
    Driver,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_frequency")]
enum PaymentFrequency {
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "biweekly")]
    Biweekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_status")]
enum PeriodStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "expense_status")]
enum ExpenseStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "applied")]
    Applied,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "deferred")]
    Deferred,
}
