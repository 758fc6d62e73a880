use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::NaiveDate;
use regex::Regex;
use rust_xlsxwriter::Workbook;

use formsheet::excel::codec::{DataSheet, decode};
use formsheet::excel::layout::{FIRST_DATA_ROW, LABEL_ROW, NAME_ROW, OPTIONS_SHEET, TYPE_ROW};
use formsheet::excel::{ImportOptions, ImportOutcome, TemplateLayout};
use formsheet::reference::MemoryReferences;
use formsheet::schema::SchemaRegistry;
use formsheet::sink::MemorySink;
use formsheet::types::Value;
use formsheet::upload::Upload;
use formsheet::{ImportResponse, SchemaError, UploadFormatError, Workbench};

const SCHEMAS: &str = include_str!("../../demos/schemas.toml");

fn workbench() -> Workbench {
    let registry = SchemaRegistry::from_toml_str(SCHEMAS).unwrap();
    let mut references = MemoryReferences::new();
    references.insert("Customer", 2, [("name", "GLOBEX")]);
    references.insert("Customer", 1, [("name", "ACME")]);
    Workbench::new(registry, references)
}

/// Workbook filled the way a user would: field names in the hidden row,
/// values typed from the first data row down.
fn filled(columns: &[&str], rows: &[&[&str]]) -> Upload {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Person").unwrap();
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string(NAME_ROW, col as u16, *name).unwrap();
        sheet.write_string(LABEL_ROW, col as u16, *name).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, text) in row.iter().enumerate() {
            if !text.is_empty() {
                sheet
                    .write_string(FIRST_DATA_ROW + i as u32, col as u16, *text)
                    .unwrap();
            }
        }
    }
    Upload::new("Person.xlsx", workbook.save_to_buffer().unwrap())
}

fn import(bench: &Workbench, upload: &Upload, discard_valid: bool) -> ImportOutcome {
    bench
        .import(Some(upload), "person", ImportOptions { discard_valid })
        .unwrap()
}

/// Text of one part inside the xlsx package
fn xlsx_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

fn sheet_row(sheet: &DataSheet, row: u32, width: u32) -> Vec<String> {
    (0..width).map(|col| sheet.cell_text(row, col)).collect()
}

#[test]
fn test_exported_template_layout() {
    let download = workbench().export("person").unwrap();
    assert_eq!(download.filename, "Person.xlsx");

    let sheet = decode(&download.content).unwrap();
    assert_eq!(sheet.name, "Person");
    assert_eq!(
        sheet_row(&sheet, NAME_ROW, 8),
        vec![
            "last_name",
            "first_name",
            "customer_id",
            "gender",
            "is_minor",
            "age",
            "birth_date",
            "email"
        ]
    );
    assert_eq!(sheet.cell_text(LABEL_ROW, 0), "Last name *");
    assert_eq!(sheet.cell_text(LABEL_ROW, 2), "Customer");
    assert_eq!(sheet.cell_text(TYPE_ROW, 2), "Reference");
    assert_eq!(sheet.cell_text(TYPE_ROW, 3), "List");
    assert_eq!(sheet.cell_text(TYPE_ROW, 6), "Date");
}

#[test]
fn test_exported_options_sheet() {
    use calamine::{Reader, Xlsx};

    let download = workbench().export("Person").unwrap();
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(download.content)).unwrap();
    let options = workbook.worksheet_range(OPTIONS_SHEET).unwrap();

    let text = |row: u32, col: u32| {
        options
            .get_value((row, col))
            .map(|c| c.to_string())
            .unwrap_or_default()
    };
    // References are sorted by primary key
    assert_eq!(text(0, 2), "1 - ACME");
    assert_eq!(text(1, 2), "2 - GLOBEX");
    assert_eq!(text(0, 3), "Female");
    assert_eq!(text(2, 3), "Other");
    assert_eq!(text(0, 0), "");
}

#[test]
fn test_untouched_template_is_accepted_empty() {
    let bench = workbench();
    let download = bench.export("Person").unwrap();
    let upload = Upload::new(download.filename, download.content);

    match import(&bench, &upload, false) {
        ImportOutcome::Accepted { records, report } => {
            assert!(records.is_empty());
            assert_eq!(report.rows_read, 0);
        }
        ImportOutcome::Rejected { report, .. } => panic!("rejected: {:?}", report.errors),
    }
}

#[test]
fn test_reordered_columns_are_matched_by_name() {
    let bench = workbench();
    let upload = filled(
        &["birth_date", "is_minor", "age", "last_name", "customer_id", "gender"],
        &[
            &["12/03/2010", "oui", "12", " doe ", "1 - ACME", "female"],
            &["", "", "", "Roe", "", ""],
        ],
    );

    let ImportOutcome::Accepted { records, report } = import(&bench, &upload, false) else {
        panic!("expected acceptance");
    };
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_valid, 2);

    let doe = &records[0];
    assert_eq!(doe.entity(), "Person");
    assert_eq!(doe.get("last_name"), Some(&Value::Text("DOE".into())));
    assert_eq!(doe.get("customer_id"), Some(&Value::Int(1)));
    assert_eq!(doe.get("gender"), Some(&Value::Text("FEMALE".into())));
    assert_eq!(doe.get("is_minor"), Some(&Value::Bool(true)));
    assert_eq!(doe.get("age"), Some(&Value::Int(12)));
    assert_eq!(
        doe.get("birth_date"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2010, 3, 12).unwrap()))
    );
    // Missing column reads as empty
    assert_eq!(doe.get("email"), Some(&Value::Null));

    let roe = &records[1];
    assert_eq!(roe.get("customer_id"), Some(&Value::Null));
    assert_eq!(roe.get("is_minor"), Some(&Value::Bool(false)));
    assert_eq!(roe.get("age"), Some(&Value::Int(0)));
    assert_eq!(roe.get("birth_date"), Some(&Value::Null));
}

#[test]
fn test_one_bad_cell_rejects_the_whole_submission() {
    let bench = workbench();
    let upload = filled(
        &["last_name", "first_name", "age"],
        &[
            &["Doe", "John", "40"],
            &["Smith", "Jane", "forty"],
            &["Roe", "Richard", "51"],
        ],
    );

    let ImportOutcome::Rejected { workbook, report } = import(&bench, &upload, false) else {
        panic!("expected rejection");
    };
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_valid, 2);
    assert_eq!(report.errors.len(), 1);

    let error = &report.errors[0];
    assert_eq!(error.row, FIRST_DATA_ROW + 2);
    assert_eq!(error.column, Some(3));
    assert_eq!(error.field, "age");
    assert_eq!(error.message, "'forty' is not a valid integer");

    // Annotated copy keeps every row in template column order
    let sheet = decode(&workbook).unwrap();
    assert_eq!(sheet.cell_text(NAME_ROW, 0), "last_name");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW, 0), "Doe");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 1, 0), "Smith");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 1, 5), "forty");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 2, 0), "Roe");
}

#[test]
fn test_annotated_workbook_marks_exactly_one_cell() {
    let bench = workbench();
    let upload = filled(
        &["last_name", "age"],
        &[&["Doe", "40"], &["Smith", "forty"], &["Roe", "51"]],
    );

    let ImportOutcome::Rejected { workbook, .. } = import(&bench, &upload, false) else {
        panic!("expected rejection");
    };

    // One note, anchored on the failing age cell (column F, row 5)
    let comments = xlsx_part(&workbook, "xl/comments1.xml");
    assert_eq!(comments.matches("<comment ").count(), 1);
    assert!(comments.contains(r#"ref="F5""#));
    assert!(comments.contains("is not a valid integer"));

    // The failing cell is the only one carrying the red error style
    let styles = xlsx_part(&workbook, "xl/styles.xml");
    assert!(styles.contains("FFFF0000"));

    let sheet = xlsx_part(&workbook, "xl/worksheets/sheet1.xml");
    let cell = Regex::new(r#"<c r="([A-Z]+[0-9]+)" s="([0-9]+)""#).unwrap();
    let styles_by_cell: HashMap<String, String> = cell
        .captures_iter(&sheet)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();
    let error_style = &styles_by_cell["F5"];
    let marked: Vec<_> = styles_by_cell
        .iter()
        .filter(|(_, s)| *s == error_style)
        .map(|(r, _)| r.as_str())
        .collect();
    assert_eq!(marked, vec!["F5"]);
}

#[test]
fn test_rows_past_the_row_limit_are_validated() {
    let bench = workbench().with_layout(TemplateLayout::new(5));

    let valid = filled(
        &["last_name"],
        &[&["Doe"], &["Roe"], &["Poe"], &["Moe"]],
    );
    let ImportOutcome::Accepted { records, report } = import(&bench, &valid, false) else {
        panic!("expected acceptance");
    };
    assert_eq!(report.rows_read, 4);
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].get("last_name"), Some(&Value::Text("MOE".into())));

    let invalid = filled(
        &["last_name", "gender"],
        &[&["Doe", ""], &["Roe", ""], &["Poe", "bogus"], &["Moe", ""]],
    );
    let ImportOutcome::Rejected { workbook, report } = import(&bench, &invalid, false) else {
        panic!("expected rejection");
    };
    assert_eq!(report.rows_read, 4);
    assert_eq!(report.rows_valid, 3);
    assert_eq!(report.errors[0].row, FIRST_DATA_ROW + 3);
    assert_eq!(report.errors[0].field, "gender");

    let sheet = decode(&workbook).unwrap();
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 2, 3), "bogus");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 3, 0), "Moe");
}

#[test]
fn test_missing_column_is_reported_without_a_position() {
    let bench = workbench();
    let upload = filled(&["first_name"], &[&["John"]]);

    let ImportOutcome::Rejected { report, .. } = import(&bench, &upload, false) else {
        panic!("expected rejection");
    };
    let error = &report.errors[0];
    assert_eq!(error.field, "last_name");
    assert_eq!(error.column, None);
    assert_eq!(error.row, FIRST_DATA_ROW + 1);
    assert_eq!(
        error.to_string(),
        "row 4, missing column (last_name): Value required"
    );
}

#[test]
fn test_discard_valid_compacts_failing_rows() {
    let bench = workbench();
    let upload = filled(
        &["last_name", "email"],
        &[
            &["Doe", "john@example.com"],
            &["", "orphan@example.com"],
            &["Roe", ""],
            &["Poe", "not-an-address"],
        ],
    );

    let ImportOutcome::Rejected { workbook, report } = import(&bench, &upload, true) else {
        panic!("expected rejection");
    };
    assert_eq!(report.rows_invalid(), 2);
    assert_eq!(report.errors[0].row, FIRST_DATA_ROW + 2);
    assert_eq!(report.errors[0].message, "Value required");
    assert_eq!(report.errors[1].row, FIRST_DATA_ROW + 4);
    assert_eq!(report.errors[1].field, "email");

    let sheet = decode(&workbook).unwrap();
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW, 0), "");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW, 7), "orphan@example.com");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 1, 0), "Poe");
    assert_eq!(sheet.cell_text(FIRST_DATA_ROW + 2, 0), "");
}

#[test]
fn test_conditionally_required_age() {
    let bench = workbench();
    let upload = filled(
        &["last_name", "is_minor", "age"],
        &[&["Doe", "Y", ""], &["Roe", "N", ""]],
    );

    let ImportOutcome::Rejected { report, .. } = import(&bench, &upload, false) else {
        panic!("expected rejection");
    };
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, FIRST_DATA_ROW + 1);
    assert_eq!(report.errors[0].field, "age");
    assert!(report.errors[0].message.contains("is_minor"));
}

#[test]
fn test_malformed_reference() {
    let bench = workbench();
    let upload = filled(&["last_name", "customer_id"], &[&["Doe", "ACME"]]);

    let ImportOutcome::Rejected { report, .. } = import(&bench, &upload, false) else {
        panic!("expected rejection");
    };
    assert_eq!(report.errors[0].field, "customer_id");
    assert!(report.errors[0].message.contains("not a valid reference"));
}

#[test]
fn test_upload_and_entity_errors() {
    let bench = workbench();

    let err = bench
        .import(None, "Person", ImportOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UploadFormatError>(),
        Some(UploadFormatError::Missing)
    ));

    let csv = Upload::new("people.csv", b"last_name\nDoe\n".to_vec());
    let err = bench
        .import(Some(&csv), "Person", ImportOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UploadFormatError>(),
        Some(UploadFormatError::WrongExtension { .. })
    ));

    let err = bench.export("Invoice").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::UnknownEntity { .. })
    ));
}

#[tokio::test]
async fn test_import_and_commit() {
    let bench = workbench();
    let mut sink = MemorySink::new();

    let good = filled(&["last_name", "customer_id"], &[&["Doe", "2 - GLOBEX"]]);
    let response = bench
        .import_and_commit(Some(&good), "person", ImportOptions::default(), &mut sink)
        .await
        .unwrap();
    assert!(matches!(
        response,
        ImportResponse::Success { committed: 1, .. }
    ));
    assert_eq!(sink.committed("Person").len(), 1);
    assert_eq!(
        sink.committed("Person")[0].get("customer_id"),
        Some(&Value::Int(2))
    );

    let bad = filled(&["last_name", "age"], &[&["Roe", "12"], &["Poe", "-1"]]);
    let response = bench
        .import_and_commit(Some(&bad), "person", ImportOptions::default(), &mut sink)
        .await
        .unwrap();
    match response {
        ImportResponse::Annotated { download, report } => {
            assert_eq!(download.filename, "Person.xlsx");
            assert_eq!(report.errors.len(), 1);
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert_eq!(sink.committed("Person").len(), 1);
    assert_eq!(sink.staged_count(), 0);
}
