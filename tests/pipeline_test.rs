//! End-to-end pipeline tests: ingest → profile → materialize → analyze → fix,
//! against a temp sqlite database with migrations applied.

use anyhow::Result;
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Statement,
};
use tempfile::NamedTempFile;

use datalens::database::entities::common_types::{DataType, FixType, ImportStatus};
use datalens::database::entities::{analyses, import_columns, imports, transformations};
use datalens::database::setup_database;
use datalens::errors::PipelineError;
use datalens::services::import_service::ColumnLabelEdit;
use datalens::services::materialize_service::ColumnSpec;
use datalens::services::{
    FixService, ImportService, IngestService, MaterializeService, ProfileService, QualityService,
};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

const ORG: &str = "org-123";

async fn ingest_csv(db: &DatabaseConnection, csv: &str) -> Result<i32> {
    let outcome = IngestService::new(db.clone())
        .ingest_file(ORG, None, "upload.csv", csv.as_bytes())
        .await?;
    Ok(outcome.file_id)
}

/// Ingest + materialize into `table`, defaulting columns and rows from staging.
async fn ingest_and_materialize(
    db: &DatabaseConnection,
    csv: &str,
    table: &str,
) -> Result<(i32, String)> {
    let import_id = ingest_csv(db, csv).await?;
    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;

    let columns: Vec<ColumnSpec> = imports_svc
        .columns_of(import_id)
        .await?
        .into_iter()
        .map(|c| ColumnSpec {
            name: c.original_name.clone(),
            data_type: c.data_type(),
            description: None,
        })
        .collect();

    let rows = imports_svc
        .staged_rows_page(import_id, 1, 1000)
        .await?
        .data;

    let outcome = MaterializeService::new(db.clone())
        .materialize(&import, table, &columns, ORG, &rows)
        .await?;

    Ok((import_id, outcome.table_name))
}

async fn count_rows(db: &DatabaseConnection, sql: &str) -> Result<i64> {
    let row = db
        .query_one(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
        .await?
        .expect("count query returns a row");
    Ok(row.try_get::<i64>("", "n")?)
}

#[tokio::test]
async fn ingest_infers_types_and_stages_rows() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let outcome = IngestService::new(db.clone())
        .ingest_file(
            ORG,
            Some("People".to_string()),
            "people.csv",
            b"name,age,active\nAna,34,true\nBob,,false\n",
        )
        .await?;

    assert_eq!(outcome.total_rows, 2);
    assert_eq!(outcome.preview_data.len(), 2);
    assert_eq!(outcome.columns.len(), 3);
    assert_eq!(outcome.columns[0].data_type, DataType::Text);
    assert_eq!(outcome.columns[1].data_type, DataType::Integer);
    assert_eq!(outcome.columns[2].data_type, DataType::Boolean);
    assert_eq!(outcome.columns[1].sample_values, vec!["34", ""]);

    let import = imports::Entity::find_by_id(outcome.file_id)
        .one(&db)
        .await?
        .expect("import exists");
    assert_eq!(import.status(), Some(ImportStatus::Analyzing));
    assert_eq!(import.row_count, Some(2));
    assert_eq!(import.organization_id, ORG);

    let page = ImportService::new(db.clone())
        .staged_rows_page(outcome.file_id, 1, 100)
        .await?;
    assert_eq!(page.total_rows, 2);
    assert_eq!(page.data[0]["name"], "Ana");
    assert_eq!(page.data[1]["age"], "");

    Ok(())
}

#[tokio::test]
async fn ingest_rejects_files_without_data_rows() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let err = IngestService::new(db.clone())
        .ingest_file(ORG, None, "empty.csv", b"name,age\n")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::MalformedFile(_)));

    // The import record survives in error state with the message captured
    let import = imports::Entity::find()
        .filter(imports::Column::OrganizationId.eq(ORG))
        .one(&db)
        .await?
        .expect("import record exists");
    assert_eq!(import.status(), Some(ImportStatus::Error));
    assert!(import.error_message.is_some());

    Ok(())
}

#[tokio::test]
async fn ingest_rejects_unknown_extensions() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let err = IngestService::new(db.clone())
        .ingest_file(ORG, None, "data.parquet", b"whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));

    Ok(())
}

#[tokio::test]
async fn ingest_reads_xlsx_workbooks() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let outcome = IngestService::new(db.clone())
        .ingest_file(
            ORG,
            None,
            "inventory.xlsx",
            include_bytes!("fixtures/inventory.xlsx"),
        )
        .await?;

    assert_eq!(outcome.total_rows, 2);
    let names: Vec<&str> = outcome.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["item", "qty", "price"]);
    assert_eq!(outcome.columns[0].data_type, DataType::Text);
    assert_eq!(outcome.columns[1].data_type, DataType::Integer);
    assert_eq!(outcome.columns[2].data_type, DataType::Numeric);

    // Whole-number cells stringify without a trailing .0, fractions keep it
    let page = ImportService::new(db.clone())
        .staged_rows_page(outcome.file_id, 1, 100)
        .await?;
    assert_eq!(page.data[0]["item"], "Widget");
    assert_eq!(page.data[0]["qty"], "3");
    assert_eq!(page.data[0]["price"], "10.5");
    assert_eq!(page.data[1]["qty"], "12");
    assert_eq!(page.data[1]["price"], "0.25");

    Ok(())
}

#[tokio::test]
async fn staged_rows_paginate_in_upload_order() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let mut csv = String::from("id_col\n");
    for i in 0..25 {
        csv.push_str(&format!("row{i}\n"));
    }
    let import_id = ingest_csv(&db, &csv).await?;

    let service = ImportService::new(db.clone());
    let first = service.staged_rows_page(import_id, 1, 10).await?;
    assert_eq!(first.total_rows, 25);
    assert_eq!(first.data.len(), 10);
    assert_eq!(first.data[0]["id_col"], "row0");

    let last = service.staged_rows_page(import_id, 3, 10).await?;
    assert_eq!(last.data.len(), 5);
    assert_eq!(last.data[4]["id_col"], "row24");

    Ok(())
}

#[tokio::test]
async fn profiler_counts_nulls_distincts_and_numeric_aggregates() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    // Second column keeps rows with an empty score from reading as blank lines
    let import_id = ingest_csv(&db, "score,tag\n10,a\n20,a\n20,a\n,a\n30,a\n").await?;
    let stats = ProfileService::new(db.clone())
        .profile_column(import_id, "score")
        .await?;

    assert_eq!(stats.total_rows, 5);
    assert_eq!(stats.null_count, 1);
    assert_eq!(stats.distinct_count, 3);
    assert_eq!(stats.completeness, Some(0.8));
    assert_eq!(stats.min, Some(10.0));
    assert_eq!(stats.max, Some(30.0));
    assert_eq!(stats.mean, Some(20.0));
    assert_eq!(stats.distribution.get("20"), Some(&2));
    assert_eq!(stats.mode.first().map(String::as_str), Some("20"));

    let err = ProfileService::new(db.clone())
        .profile_column(import_id, "missing_column")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn materialization_round_trips_all_rows() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let (import_id, table) = ingest_and_materialize(
        &db,
        "name,amount,active\nAna,10.5,true\nBob,3,no\nCarla,7.25,sim\n",
        "sales data",
    )
    .await?;

    assert_eq!(table, "sales_data");

    let import = imports::Entity::find_by_id(import_id)
        .one(&db)
        .await?
        .expect("import exists");
    assert_eq!(import.status(), Some(ImportStatus::Completed));
    assert_eq!(import.table_name.as_deref(), Some("sales_data"));
    assert_eq!(import.row_count, Some(3));

    let n = count_rows(&db, "SELECT COUNT(*) AS n FROM \"sales_data\"").await?;
    assert_eq!(n, 3);

    // Cells come back type-coerced: booleans from the truthy set, text intact
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT name, amount, active FROM \"sales_data\" ORDER BY id LIMIT 1".to_string(),
        ))
        .await?
        .expect("first row");
    assert_eq!(row.try_get::<String>("", "name")?, "Ana");
    assert_eq!(row.try_get::<f64>("", "amount")?, 10.5);
    assert!(row.try_get::<bool>("", "active")?);

    let truthy = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM \"sales_data\" WHERE active = true",
    )
    .await?;
    assert_eq!(truthy, 2);

    Ok(())
}

#[tokio::test]
async fn materialization_is_idempotent_per_table_name() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let (import_id, _) = ingest_and_materialize(&db, "a\n1\n2\n", "twice").await?;

    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;
    let columns = vec![ColumnSpec {
        name: "a".to_string(),
        data_type: DataType::Integer,
        description: None,
    }];

    // Second invocation with the same table name and column map must not error
    let outcome = MaterializeService::new(db.clone())
        .materialize(&import, "twice", &columns, ORG, &[])
        .await?;
    assert_eq!(outcome.table_name, "twice");
    assert_eq!(outcome.rows_inserted, 0);

    // Still one physical table
    let n = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'twice'",
    )
    .await?;
    assert_eq!(n, 1);

    Ok(())
}

#[tokio::test]
async fn materialization_rejects_an_import_already_processing() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "a\n1\n2\n").await?;
    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;

    // Another materializer holds the gate
    imports_svc
        .transition(import_id, &[ImportStatus::Analyzing], ImportStatus::Processing)
        .await?;

    let columns = vec![ColumnSpec {
        name: "a".to_string(),
        data_type: DataType::Integer,
        description: None,
    }];
    let rows = imports_svc.staged_rows_page(import_id, 1, 100).await?.data;

    let err = MaterializeService::new(db.clone())
        .materialize(&import, "contended", &columns, ORG, &rows)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)));

    // The losing run inserted nothing
    let n = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'contended'",
    )
    .await?;
    assert_eq!(n, 0);

    Ok(())
}

#[tokio::test]
async fn coercion_failure_aborts_the_whole_batch() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "score\n10\nabc\n").await?;
    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;

    let columns = vec![ColumnSpec {
        name: "score".to_string(),
        data_type: DataType::Numeric,
        description: None,
    }];
    let rows = imports_svc.staged_rows_page(import_id, 1, 100).await?.data;

    let err = MaterializeService::new(db.clone())
        .materialize(&import, "scores", &columns, ORG, &rows)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Coercion { .. }));

    // Zero rows persisted and the import keeps its prior non-terminal state
    let n = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'scores'",
    )
    .await?;
    assert_eq!(n, 0);

    let import = imports_svc.find_for_org(import_id, ORG).await?;
    assert_eq!(import.status(), Some(ImportStatus::Analyzing));
    assert!(import.table_name.is_none());

    Ok(())
}

#[tokio::test]
async fn quality_analysis_flags_incomplete_columns() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    // 100 rows in `customer`: 10 empty, 85 distinct values, 5 repeats of v0.
    // `seg` is constant so empty-customer rows survive CSV parsing.
    let mut csv = String::from("customer,seg\n");
    for i in 0..85 {
        csv.push_str(&format!("v{i},a\n"));
    }
    for _ in 0..5 {
        csv.push_str("v0,a\n");
    }
    for _ in 0..10 {
        csv.push_str(",a\n");
    }
    let (import_id, table) = ingest_and_materialize(&db, &csv, "customers").await?;

    let report = QualityService::new(db.clone())
        .run_quality_analysis(import_id, &table, ORG)
        .await?;

    assert_eq!(report.columns.len(), 2);
    let customer = report
        .columns
        .iter()
        .find(|c| c.column == "customer")
        .expect("customer analyzed");
    assert!((customer.completeness - 0.90).abs() < 1e-9);
    assert!((customer.uniqueness - 0.85).abs() < 1e-9);

    // Only `customer` dips below the 0.95 gate, between 0.8 and 0.95
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].column, "customer");
    assert_eq!(report.issues[0].severity, "medium");

    let seg_quality = 0.7 * 1.0 + 0.3 * 0.01;
    let customer_quality = 0.7 * 0.90 + 0.3 * 0.85;
    let expected_overall = (seg_quality + customer_quality) / 2.0;
    assert!((report.overall_quality - expected_overall).abs() < 1e-9);
    assert!((report.overall_completeness - (0.90 + 1.0) / 2.0).abs() < 1e-9);

    // Statistics written back into the column metadata wholesale
    let column = import_columns::Entity::find()
        .filter(import_columns::Column::ImportId.eq(import_id))
        .filter(import_columns::Column::OriginalName.eq("customer"))
        .one(&db)
        .await?
        .expect("column exists");
    let stats = column.statistics().expect("statistics recorded");
    assert_eq!(stats.null_count, 10);
    assert_eq!(stats.distinct_count, 85);

    // Denormalized summary lands on the import, and the status gate is
    // released back to completed
    let import = imports::Entity::find_by_id(import_id)
        .one(&db)
        .await?
        .expect("import exists");
    let summary: serde_json::Value =
        serde_json::from_str(import.data_quality.as_deref().expect("summary set"))?;
    assert_eq!(summary["issues_count"], 1);
    assert_eq!(summary["last_analysis_id"], report.analysis_id);
    assert_eq!(import.status(), Some(ImportStatus::Completed));

    // A later sequential rerun passes the gate again
    QualityService::new(db.clone())
        .run_quality_analysis(import_id, &table, ORG)
        .await?;

    Ok(())
}

#[tokio::test]
async fn quality_analysis_rejects_a_run_already_in_flight() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let (import_id, table) = ingest_and_materialize(&db, "a,b\n1,x\n2,y\n", "inflight").await?;

    // Another analyzer holds the gate
    let imports_svc = ImportService::new(db.clone());
    imports_svc
        .transition(import_id, &[ImportStatus::Completed], ImportStatus::Processing)
        .await?;

    let err = QualityService::new(db.clone())
        .run_quality_analysis(import_id, &table, ORG)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)));

    // The losing run wrote nothing
    let analyses_count = analyses::Entity::find()
        .filter(analyses::Column::ImportId.eq(import_id))
        .all(&db)
        .await?
        .len();
    assert_eq!(analyses_count, 0);

    Ok(())
}

#[tokio::test]
async fn quality_analysis_requires_a_materialized_import() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "a\n1\n").await?;
    let err = QualityService::new(db.clone())
        .run_quality_analysis(import_id, "nowhere", ORG)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn empty_tables_produce_no_quality_issues() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "a,b\n1,x\n").await?;
    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;

    let columns = vec![
        ColumnSpec {
            name: "a".to_string(),
            data_type: DataType::Integer,
            description: None,
        },
        ColumnSpec {
            name: "b".to_string(),
            data_type: DataType::Text,
            description: None,
        },
    ];

    // Materialize the table shape with zero rows
    MaterializeService::new(db.clone())
        .materialize(&import, "empty_t", &columns, ORG, &[])
        .await?;

    let report = QualityService::new(db.clone())
        .run_quality_analysis(import_id, "empty_t", ORG)
        .await?;

    // Undefined ratios: nothing flagged, nothing scored
    assert!(report.issues.is_empty());
    assert!(report.columns.is_empty());
    assert_eq!(report.overall_quality, 0.0);

    // Counts are still recorded, with the ratios left unset
    let column = import_columns::Entity::find()
        .filter(import_columns::Column::ImportId.eq(import_id))
        .filter(import_columns::Column::OriginalName.eq("a"))
        .one(&db)
        .await?
        .expect("column exists");
    let stats = column.statistics().expect("statistics recorded");
    assert_eq!(stats.total_rows, 0);
    assert_eq!(stats.completeness, None);
    assert_eq!(stats.uniqueness, None);

    Ok(())
}

#[tokio::test]
async fn fill_nulls_borrows_the_most_frequent_text_value() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    // 10 rows: 3 empty statuses, "N/A" x4, "ok" x2, "x" x1
    let csv = "status,k\nN/A,1\nN/A,1\n,1\nok,1\nN/A,1\n,1\nx,1\nok,1\nN/A,1\n,1\n";
    let (import_id, _) = ingest_and_materialize(&db, csv, "statuses").await?;

    let outcome = FixService::new(db.clone())
        .apply_fix(import_id, FixType::FillNulls, Some("status"), ORG)
        .await?;
    assert_eq!(outcome.rows_affected, 3);

    let n = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM \"statuses\" WHERE status = 'N/A'",
    )
    .await?;
    assert_eq!(n, 7);

    // Exactly one audit record, with the affected count
    let audit = transformations::Entity::find()
        .filter(transformations::Column::ImportId.eq(import_id))
        .all(&db)
        .await?;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].rows_affected, 3);
    assert_eq!(audit[0].transformation_type, "fill_nulls");
    assert_eq!(audit[0].column_name, "status");

    Ok(())
}

#[tokio::test]
async fn fill_nulls_uses_type_defaults_for_numeric_columns() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let (import_id, _) =
        ingest_and_materialize(&db, "qty,k\n5,1\n,1\n,1\n", "quantities").await?;

    let outcome = FixService::new(db.clone())
        .apply_fix(import_id, FixType::FillNulls, Some("qty"), ORG)
        .await?;
    assert_eq!(outcome.rows_affected, 2);

    let zeros = count_rows(&db, "SELECT COUNT(*) AS n FROM \"quantities\" WHERE qty = 0").await?;
    assert_eq!(zeros, 2);

    Ok(())
}

#[tokio::test]
async fn handle_duplicates_keeps_the_first_seen_row() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let csv = "email\na@x.com\nb@x.com\na@x.com\nc@x.com\na@x.com\n";
    let (import_id, _) = ingest_and_materialize(&db, csv, "emails").await?;

    let outcome = FixService::new(db.clone())
        .apply_fix(import_id, FixType::HandleDuplicates, Some("email"), ORG)
        .await?;
    assert_eq!(outcome.rows_affected, 2);

    let n = count_rows(&db, "SELECT COUNT(*) AS n FROM \"emails\"").await?;
    assert_eq!(n, 3);

    // The surviving a@x.com is the lowest id (first inserted)
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT MIN(id) AS n FROM \"emails\"".to_string(),
        ))
        .await?
        .expect("row");
    assert_eq!(row.try_get::<i64>("", "n")?, 1);

    Ok(())
}

#[tokio::test]
async fn standardize_format_rejects_unsupported_types() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let (import_id, _) = ingest_and_materialize(&db, "flag,label\ntrue, MiXeD \n", "flags").await?;

    let err = FixService::new(db.clone())
        .apply_fix(import_id, FixType::StandardizeFormat, Some("flag"), ORG)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedType(_)));

    let outcome = FixService::new(db.clone())
        .apply_fix(import_id, FixType::StandardizeFormat, Some("label"), ORG)
        .await?;
    assert_eq!(outcome.rows_affected, 1);

    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT label FROM \"flags\"".to_string(),
        ))
        .await?
        .expect("row");
    assert_eq!(row.try_get::<String>("", "label")?, "mixed");

    Ok(())
}

#[tokio::test]
async fn standardize_format_rewrites_timestamps_to_iso() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    // Store the raw strings by materializing `when` as text; the recorded
    // column type stays timestamp, which is what the fix dispatches on
    let csv = "when,k\n2024-03-01 10:30:00,1\n01/03/2024 08:00:00,2\nnot a date,3\n";
    let import_id = ingest_csv(&db, csv).await?;
    let imports_svc = ImportService::new(db.clone());
    let import = imports_svc.find_for_org(import_id, ORG).await?;
    assert_eq!(
        imports_svc.columns_of(import_id).await?[0].data_type(),
        DataType::Timestamp
    );

    let columns = vec![
        ColumnSpec {
            name: "when".to_string(),
            data_type: DataType::Text,
            description: None,
        },
        ColumnSpec {
            name: "k".to_string(),
            data_type: DataType::Integer,
            description: None,
        },
    ];
    let rows = imports_svc.staged_rows_page(import_id, 1, 100).await?.data;
    MaterializeService::new(db.clone())
        .materialize(&import, "events", &columns, ORG, &rows)
        .await?;

    let outcome = FixService::new(db.clone())
        .apply_fix(import_id, FixType::StandardizeFormat, Some("when"), ORG)
        .await?;
    assert_eq!(outcome.rows_affected, 2);

    let iso = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM \"events\" WHERE \"when\" IN \
         ('2024-03-01T10:30:00+00:00', '2024-03-01T08:00:00+00:00')",
    )
    .await?;
    assert_eq!(iso, 2);

    // Unparseable values stay exactly as uploaded
    let untouched = count_rows(
        &db,
        "SELECT COUNT(*) AS n FROM \"events\" WHERE \"when\" = 'not a date'",
    )
    .await?;
    assert_eq!(untouched, 1);

    Ok(())
}

#[tokio::test]
async fn accepted_suggestions_update_labels_and_context() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "vlr_tot,k\n10.5,1\n").await?;
    let service = ImportService::new(db.clone());

    service
        .set_context(import_id, "monthly sales export")
        .await?;
    let updated = service
        .update_column_labels(
            import_id,
            &[ColumnLabelEdit {
                original_name: "vlr_tot".to_string(),
                display_name: Some("Total Value".to_string()),
                description: Some("Invoice total".to_string()),
            }],
        )
        .await?;
    assert_eq!(updated, 1);

    let import = service.find_for_org(import_id, ORG).await?;
    assert_eq!(import.context.as_deref(), Some("monthly sales export"));

    let column = import_columns::Entity::find()
        .filter(import_columns::Column::ImportId.eq(import_id))
        .filter(import_columns::Column::OriginalName.eq("vlr_tot"))
        .one(&db)
        .await?
        .expect("column exists");
    assert_eq!(column.original_name, "vlr_tot");
    assert_eq!(column.display_name, "Total Value");
    assert_eq!(column.description.as_deref(), Some("Invoice total"));

    Ok(())
}

#[tokio::test]
async fn audit_records_are_immutable_across_fixes() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let csv = "city,k\nRecife,1\nRecife,2\n,3\n";
    let (import_id, table) = ingest_and_materialize(&db, csv, "cities").await?;

    QualityService::new(db.clone())
        .run_quality_analysis(import_id, &table, ORG)
        .await?;
    let analysis_before = analyses::Entity::find()
        .filter(analyses::Column::ImportId.eq(import_id))
        .one(&db)
        .await?
        .expect("analysis exists");

    FixService::new(db.clone())
        .apply_fix(import_id, FixType::FillNulls, Some("city"), ORG)
        .await?;
    let first_fix = transformations::Entity::find()
        .filter(transformations::Column::ImportId.eq(import_id))
        .one(&db)
        .await?
        .expect("first transformation exists");

    // A second, different fix appends a new record and touches neither the
    // analysis snapshot nor the earlier transformation
    FixService::new(db.clone())
        .apply_fix(import_id, FixType::HandleDuplicates, Some("city"), ORG)
        .await?;

    let analysis_after = analyses::Entity::find_by_id(analysis_before.id)
        .one(&db)
        .await?
        .expect("analysis still present");
    assert_eq!(analysis_before, analysis_after);

    let first_fix_after = transformations::Entity::find_by_id(first_fix.id)
        .one(&db)
        .await?
        .expect("first transformation still present");
    assert_eq!(first_fix, first_fix_after);

    let all_fixes = transformations::Entity::find()
        .filter(transformations::Column::ImportId.eq(import_id))
        .all(&db)
        .await?;
    assert_eq!(all_fixes.len(), 2);

    Ok(())
}

#[tokio::test]
async fn fixes_require_a_materialized_table() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "a\n1\n").await?;
    let err = FixService::new(db.clone())
        .apply_fix(import_id, FixType::FillNulls, Some("a"), ORG)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn tenant_isolation_hides_other_organizations_imports() -> Result<()> {
    let (db, _guard) = setup_test_db().await?;

    let import_id = ingest_csv(&db, "a\n1\n").await?;
    let err = ImportService::new(db.clone())
        .find_for_org(import_id, "someone-else")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));

    Ok(())
}
