use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Routines {
    Table,
    UserId,
    WakeUpTime,
    SleepTime,
    BreakfastTime,
    LunchTime,
    DinnerTime,
    WorkStartTime,
    WorkEndTime,
    ExerciseTime,
    Notes,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Routines::Table)
                    .if_not_exists()
                    .col(string(Routines::UserId).primary_key())
                    .col(string_null(Routines::WakeUpTime))
                    .col(string_null(Routines::SleepTime))
                    .col(string_null(Routines::BreakfastTime))
                    .col(string_null(Routines::LunchTime))
                    .col(string_null(Routines::DinnerTime))
                    .col(string_null(Routines::WorkStartTime))
                    .col(string_null(Routines::WorkEndTime))
                    .col(string_null(Routines::ExerciseTime))
                    .col(text_null(Routines::Notes))
                    .col(
                        timestamp_with_time_zone(Routines::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Routines::Table).to_owned())
            .await
    }
}
