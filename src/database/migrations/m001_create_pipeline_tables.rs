use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create imports table
        manager
            .create_table(
                Table::create()
                    .table(Imports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Imports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Imports::OrganizationId).string().not_null())
                    .col(ColumnDef::new(Imports::Name).string().not_null())
                    .col(ColumnDef::new(Imports::Filename).string().not_null())
                    .col(ColumnDef::new(Imports::TableName).string())
                    .col(
                        ColumnDef::new(Imports::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Imports::ErrorMessage).text())
                    .col(ColumnDef::new(Imports::RowCount).big_integer())
                    .col(ColumnDef::new(Imports::Context).text())
                    .col(ColumnDef::new(Imports::DataQuality).text())
                    .col(ColumnDef::new(Imports::CreatedBy).string())
                    .col(ColumnDef::new(Imports::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Imports::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_imports_organization_id")
                    .table(Imports::Table)
                    .col(Imports::OrganizationId)
                    .to_owned(),
            )
            .await?;

        // Create import_rows staging table
        manager
            .create_table(
                Table::create()
                    .table(ImportRows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportRows::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImportRows::ImportId).integer().not_null())
                    .col(ColumnDef::new(ImportRows::RowNumber).integer().not_null())
                    .col(ColumnDef::new(ImportRows::Data).json_binary().not_null())
                    .col(ColumnDef::new(ImportRows::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_import_rows_import_id")
                            .from(ImportRows::Table, ImportRows::ImportId)
                            .to(Imports::Table, Imports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_import_rows_import_row")
                    .table(ImportRows::Table)
                    .col(ImportRows::ImportId)
                    .col(ImportRows::RowNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create import_columns table
        manager
            .create_table(
                Table::create()
                    .table(ImportColumns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportColumns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImportColumns::ImportId).integer().not_null())
                    .col(
                        ColumnDef::new(ImportColumns::OriginalName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportColumns::DisplayName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ImportColumns::Description).text())
                    .col(ColumnDef::new(ImportColumns::DataType).string().not_null())
                    .col(
                        ColumnDef::new(ImportColumns::SampleValues)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(ImportColumns::Statistics).text())
                    .col(
                        ColumnDef::new(ImportColumns::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportColumns::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_import_columns_import_id")
                            .from(ImportColumns::Table, ImportColumns::ImportId)
                            .to(Imports::Table, Imports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_import_columns_import_name")
                    .table(ImportColumns::Table)
                    .col(ImportColumns::ImportId)
                    .col(ImportColumns::OriginalName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create analyses table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(Analyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Analyses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Analyses::ImportId).integer().not_null())
                    .col(ColumnDef::new(Analyses::AnalysisType).string().not_null())
                    .col(
                        ColumnDef::new(Analyses::Configuration)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Analyses::Results)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Analyses::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_analyses_import_id")
                            .from(Analyses::Table, Analyses::ImportId)
                            .to(Imports::Table, Imports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transformations audit table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(Transformations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transformations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transformations::ImportId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transformations::ColumnName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transformations::TransformationType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transformations::Parameters)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Transformations::RowsAffected)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Transformations::AppliedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transformations_import_id")
                            .from(Transformations::Table, Transformations::ImportId)
                            .to(Imports::Table, Imports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transformations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Analyses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ImportColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ImportRows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Imports::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Imports {
    Table,
    Id,
    OrganizationId,
    Name,
    Filename,
    TableName,
    Status,
    ErrorMessage,
    RowCount,
    Context,
    DataQuality,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ImportRows {
    Table,
    Id,
    ImportId,
    RowNumber,
    Data,
    CreatedAt,
}

#[derive(Iden)]
enum ImportColumns {
    Table,
    Id,
    ImportId,
    OriginalName,
    DisplayName,
    Description,
    DataType,
    SampleValues,
    Statistics,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Analyses {
    Table,
    Id,
    ImportId,
    AnalysisType,
    Configuration,
    Results,
    CreatedAt,
}

#[derive(Iden)]
enum Transformations {
    Table,
    Id,
    ImportId,
    ColumnName,
    TransformationType,
    Parameters,
    RowsAffected,
    AppliedAt,
}
