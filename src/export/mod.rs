//! XLSX エクスポートモジュール
//!
//! 説明文の HTML は Excel のリッチテキスト（太字・斜体・改行）に変換して書き込む

mod richtext;
mod xlsx;

pub use richtext::{plain_text, to_runs, RunStyle, TextRun};
pub use xlsx::{export, export_filename, HEADERS, MAX_CELL_CHARS, SHEET_NAME, XLSX_CONTENT_TYPE};
