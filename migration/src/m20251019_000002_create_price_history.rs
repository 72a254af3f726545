use sea_orm_migration::prelude::*;

use super::m20251019_000001_create_items::Items;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PriceHistory::ItemId).integer())
                    .col(
                        ColumnDef::new(PriceHistory::Price)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    // Seconds since epoch as reported by the provider
                    .col(
                        ColumnDef::new(PriceHistory::Timestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_price_history_item_id")
                            .from(PriceHistory::Table, PriceHistory::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One point per item and timestamp; also the insert-or-ignore conflict target
        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_item_timestamp_unique")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::ItemId)
                    .col(PriceHistory::Timestamp)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_item_id")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::ItemId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_timestamp")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::Timestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PriceHistory {
    Table,
    Id,
    ItemId,
    Price,
    Timestamp,
    CreatedAt,
}
