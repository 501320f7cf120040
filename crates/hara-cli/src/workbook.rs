//! Workbook files: spreadsheet and JSON readers, xlsx and JSON writers.
//!
//! Spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with calamine; the
//! first row of every sheet is its header. Only `.xlsx` can be written.
//! `.json` files hold a serialized [`Workbook`].

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use hara_core::asil::AsilLevel;
use hara_core::result::ResultTable;
use hara_core::sheet::{Cell, Sheet, Workbook};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;

const HEADER_FILL: u32 = 0x1E3A5F;

/// On-disk workbook encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Spreadsheet,
    Json,
}

impl WorkbookFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(WorkbookFormat::Spreadsheet),
            "json" => Ok(WorkbookFormat::Json),
            _ => bail!(
                "unsupported workbook type '{}': expected .xlsx, .xls, .ods or .json",
                path.display()
            ),
        }
    }

    /// Whether files of this kind can be written back.
    pub fn writable(path: &Path) -> bool {
        match Self::from_path(path) {
            Ok(WorkbookFormat::Json) => true,
            Ok(WorkbookFormat::Spreadsheet) => path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("xlsx")),
            Err(_) => false,
        }
    }
}

// ─── Reading ───────────────────────────────────────────────────────────

pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let workbook = match WorkbookFormat::from_path(path)? {
        WorkbookFormat::Spreadsheet => read_spreadsheet(path)?,
        WorkbookFormat::Json => {
            let contents = std::fs::read_to_string(path)
                .context(format!("failed to read workbook: {}", path.display()))?;
            serde_json::from_str(&contents)
                .context(format!("failed to parse workbook JSON: {}", path.display()))?
        }
    };
    tracing::info!(
        path = %path.display(),
        sheets = workbook.sheets.len(),
        "loaded workbook"
    );
    Ok(workbook)
}

fn read_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut book = open_workbook_auto(path)
        .context(format!("failed to open workbook: {}", path.display()))?;
    let names = book.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = book
            .worksheet_range(&name)
            .context(format!("failed to read sheet '{name}' in {}", path.display()))?;
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|d| to_cell(d).to_string().trim().to_string()).collect())
            .unwrap_or_default();
        let data = rows.map(|row| row.iter().map(to_cell).collect()).collect();
        sheets.push(Sheet {
            name,
            headers,
            rows: data,
        });
    }
    Ok(Workbook::new(sheets))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::from(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::text(s.as_str()),
        other => Cell::text(other.to_string()),
    }
}

// ─── Writing ───────────────────────────────────────────────────────────

/// Write `workbook` to `path`. In xlsx output, `result_sheet` (if present)
/// gets a styled header and per-grade ASIL colours.
pub fn write_workbook(path: &Path, workbook: &Workbook, result_sheet: Option<&str>) -> Result<()> {
    match WorkbookFormat::from_path(path)? {
        WorkbookFormat::Json => {
            let json = serde_json::to_string_pretty(workbook)?;
            std::fs::write(path, json)
                .context(format!("failed to write workbook: {}", path.display()))?;
        }
        WorkbookFormat::Spreadsheet => {
            if !WorkbookFormat::writable(path) {
                bail!(
                    "cannot write {}: only .xlsx and .json workbooks can be written",
                    path.display()
                );
            }
            let mut book = XlsxWorkbook::new();
            for sheet in &workbook.sheets {
                let worksheet = book.add_worksheet();
                worksheet
                    .set_name(&sheet.name)
                    .context(format!("invalid sheet name '{}'", sheet.name))?;
                write_sheet(worksheet, sheet, result_sheet == Some(sheet.name.as_str()))?;
            }
            book.save(path)
                .context(format!("failed to save workbook: {}", path.display()))?;
        }
    }
    tracing::info!(path = %path.display(), sheets = workbook.sheets.len(), "wrote workbook");
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, styled: bool) -> Result<()> {
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);
    let asil_col = sheet.headers.iter().position(|h| h == "ASIL");

    for (col, header) in sheet.headers.iter().enumerate() {
        let col = u16::try_from(col).context("too many columns for xlsx")?;
        if styled {
            worksheet.write_string_with_format(0, col, header, &header_format)?;
            worksheet.set_column_width(col, 18)?;
        } else {
            worksheet.write_string(0, col, header)?;
        }
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let r = u32::try_from(index + 1).context("too many rows for xlsx")?;
        for (col, cell) in row.iter().enumerate() {
            let asil = if styled && Some(col) == asil_col {
                cell.trimmed().and_then(|g| g.parse::<AsilLevel>().ok())
            } else {
                None
            };
            let c = u16::try_from(col).context("too many columns for xlsx")?;
            match (cell, asil) {
                (_, Some(level)) => {
                    let format = Format::new()
                        .set_bold()
                        .set_font_color(Color::White)
                        .set_background_color(Color::RGB(level.color()));
                    worksheet.write_string_with_format(r, c, level.grade(), &format)?;
                }
                (Cell::Empty, None) => {}
                (Cell::Number(n), None) => {
                    worksheet.write_number(r, c, *n)?;
                }
                (Cell::Bool(b), None) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                (Cell::Text(s), None) => {
                    worksheet.write_string(r, c, s)?;
                }
            }
        }
    }

    if styled {
        worksheet.set_freeze_panes(1, 0)?;
    }
    Ok(())
}

/// Add (or replace) the result sheet in the source workbook and write it
/// back to the same file. Other sheets are rewritten with the values read.
pub fn save_into_source(
    path: &Path,
    mut workbook: Workbook,
    table: &ResultTable,
    sheet_name: &str,
) -> Result<()> {
    if !WorkbookFormat::writable(path) {
        bail!(
            "cannot save into {}: only .xlsx and .json workbooks can be updated; use --output to export",
            path.display()
        );
    }
    workbook.upsert_sheet(table.to_sheet(sheet_name));
    write_workbook(path, &workbook, Some(sheet_name))
}

/// Write a fresh workbook holding only the result sheet.
pub fn export(path: &Path, table: &ResultTable, sheet_name: &str) -> Result<()> {
    let workbook = Workbook::new(vec![table.to_sheet(sheet_name)]);
    write_workbook(path, &workbook, Some(sheet_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hara_core::matcher::{MatchKind, MatchSummary};
    use hara_core::result::ResultRow;

    fn sample_table() -> ResultTable {
        let mut row = ResultRow {
            scenario: "Vehicle parked on slope".into(),
            exposure: 3,
            match_kind: MatchKind::ExactScenario,
            match_score: 100.0,
            severity: Some(2),
            controllability: Some(2),
            ..ResultRow::default()
        };
        row.determine_asil();
        ResultTable::new(
            vec![row],
            MatchSummary {
                exact: 1,
                ..MatchSummary::default()
            },
        )
    }

    fn source() -> Workbook {
        Workbook::new(vec![
            Sheet::from_rows(
                "Operating Scenarios",
                ["Operating Scenario", "E"],
                vec![vec![Cell::text("Vehicle parked on slope"), Cell::from(3)]],
            ),
            Sheet::from_rows("RESULT", ["stale"], Vec::new()),
        ])
    }

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(
            WorkbookFormat::from_path(Path::new("hara.XLSX")).unwrap(),
            WorkbookFormat::Spreadsheet
        );
        assert_eq!(
            WorkbookFormat::from_path(Path::new("hara.json")).unwrap(),
            WorkbookFormat::Json
        );
        assert!(WorkbookFormat::from_path(Path::new("hara.csv")).is_err());
        assert!(WorkbookFormat::writable(Path::new("a.xlsx")));
        assert!(!WorkbookFormat::writable(Path::new("a.xls")));
    }

    #[test]
    fn json_save_replaces_result_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hara.json");
        write_workbook(&path, &source(), None).unwrap();

        let loaded = read_workbook(&path).unwrap();
        save_into_source(&path, loaded, &sample_table(), "RESULT").unwrap();

        let saved = read_workbook(&path).unwrap();
        assert_eq!(saved.sheet_names(), vec!["Operating Scenarios", "RESULT"]);
        let result = saved.sheet("RESULT").unwrap();
        assert_eq!(result.headers.last().map(String::as_str), Some("ASIL"));
        assert_eq!(result.cell(0, 13), &Cell::text("A"));
    }

    #[test]
    fn xlsx_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.xlsx");
        export(&path, &sample_table(), "RESULT").unwrap();

        let book = read_workbook(&path).unwrap();
        assert_eq!(book.sheet_names(), vec!["RESULT"]);
        let sheet = book.sheet("RESULT").unwrap();
        assert_eq!(sheet.headers[0], "Operating Scenario");
        assert_eq!(sheet.cell(0, 0), &Cell::text("Vehicle parked on slope"));
        assert_eq!(sheet.cell(0, 1).parse_int(), Some(3));
        assert_eq!(sheet.cell(0, 3), &Cell::text("Exact (OS)"));
        assert_eq!(sheet.cell(0, 13), &Cell::text("A"));
    }

    #[test]
    fn legacy_formats_cannot_be_saved_into() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.xls");
        let err = save_into_source(&path, source(), &sample_table(), "RESULT").unwrap_err();
        assert!(err.to_string().contains("--output"));
    }
}
