use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Format, FormatAlign, FormatUnderline, Workbook, Worksheet};
use tracing::info;

use super::richtext::{to_runs, RunStyle, TextRun};
use crate::error::ExportError;
use crate::scrape::ProductRecord;

pub const SHEET_NAME: &str = "Products";

/// 列順は固定
pub const HEADERS: [&str; 4] = ["URL", "Name", "Price", "Description"];

const COLUMN_WIDTHS: [f64; 4] = [50.0, 40.0, 12.0, 80.0];

const COL_URL: u16 = 0;
const COL_NAME: u16 = 1;
const COL_PRICE: u16 = 2;
const COL_DESCRIPTION: u16 = 3;

/// Excel のセル文字数上限
pub const MAX_CELL_CHARS: usize = 32_767;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// レコード列を XLSX に変換する（1 レコード 1 行、入力順）
pub fn export(records: &[ProductRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string(0, col, *header)?;
        worksheet.set_column_width(col, COLUMN_WIDTHS[col as usize])?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    let wrap = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Top);

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_string(row, COL_URL, fit_cell(&record.source_url, MAX_CELL_CHARS))?;
        worksheet.write_string(row, COL_NAME, fit_cell(&record.name, MAX_CELL_CHARS))?;
        if let Some(price) = &record.price {
            worksheet.write_string(row, COL_PRICE, fit_cell(price, MAX_CELL_CHARS))?;
        }
        write_description(worksheet, row, &record.description, &wrap)?;
    }

    let buffer = workbook.save_to_buffer()?;
    info!("XLSX生成完了: {}件, {}bytes", records.len(), buffer.len());
    Ok(buffer)
}

fn write_description(
    worksheet: &mut Worksheet,
    row: u32,
    html: &str,
    wrap: &Format,
) -> Result<(), ExportError> {
    let runs = fit_runs(to_runs(html), MAX_CELL_CHARS);
    match runs.as_slice() {
        [] => {}
        [single] => {
            let format = apply_style(wrap.clone(), single.style);
            worksheet.write_string_with_format(row, COL_DESCRIPTION, &single.text, &format)?;
        }
        _ => {
            let formats: Vec<Format> = runs.iter().map(|r| apply_style(Format::new(), r.style)).collect();
            let segments: Vec<(&Format, &str)> = formats
                .iter()
                .zip(runs.iter())
                .map(|(format, run): (&Format, &TextRun)| (format, run.text.as_str()))
                .collect();
            worksheet.write_rich_string_with_format(row, COL_DESCRIPTION, &segments, wrap)?;
        }
    }
    Ok(())
}

/// 文字境界で `max_chars` 文字に切り詰める
fn fit_cell(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// ラン全体の合計文字数を `max_chars` に収める（空になったランは捨てる）
fn fit_runs(runs: Vec<TextRun>, max_chars: usize) -> Vec<TextRun> {
    let mut remaining = max_chars;
    let mut fitted = Vec::with_capacity(runs.len());
    for mut run in runs {
        if remaining == 0 {
            break;
        }
        let kept = fit_cell(&run.text, remaining).len();
        run.text.truncate(kept);
        remaining -= run.text.chars().count();
        if !run.text.is_empty() {
            fitted.push(run);
        }
    }
    fitted
}

fn apply_style(mut format: Format, style: RunStyle) -> Format {
    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if style.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    format
}

/// ダウンロード用ファイル名（例: `products_20240131_235959.xlsx`）
pub fn export_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("products_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}
