//! 説明文 HTML → リッチテキストのラン列
//!
//! 対応タグ:
//! - `b` / `strong`: 太字
//! - `i` / `em`: 斜体
//! - `u`: 下線
//! - `br`: 改行
//! - `p` / `div`: 段落（前後で改行）
//! - `li`: 箇条書き行（`• ` を付与）
//!
//! `script` / `style` は中身ごと無視し、それ以外のタグは外してテキストのみ残す。

use scraper::{ElementRef, Html, Node};

use crate::scrape::collapse_whitespace;

const BULLET: &str = "• ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl RunStyle {
    pub fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle {
                bold: true,
                ..RunStyle::default()
            },
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle {
                italic: true,
                ..RunStyle::default()
            },
        }
    }
}

/// HTML 断片をラン列に変換する。隣接する同一スタイルのランは結合される。
pub fn to_runs(html: &str) -> Vec<TextRun> {
    let fragment = Html::parse_fragment(html);
    let mut builder = RunBuilder::default();
    builder.children(fragment.root_element(), RunStyle::default());
    builder.finish()
}

/// ランを連結したプレーンテキスト
pub fn plain_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

#[derive(Default)]
struct RunBuilder {
    runs: Vec<TextRun>,
}

impl RunBuilder {
    fn children(&mut self, element: ElementRef<'_>, style: RunStyle) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text, style),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.element(el, style);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>, style: RunStyle) {
        let name = el.value().name().to_ascii_lowercase();
        match name.as_str() {
            "script" | "style" => {}
            "br" => self.push("\n", style),
            "b" | "strong" => self.children(el, RunStyle { bold: true, ..style }),
            "i" | "em" => self.children(el, RunStyle { italic: true, ..style }),
            "u" => self.children(el, RunStyle { underline: true, ..style }),
            "p" | "div" => {
                self.line_break(style);
                self.children(el, style);
                self.line_break(style);
            }
            "li" => {
                self.line_break(style);
                self.push(BULLET, style);
                self.children(el, style);
                self.line_break(style);
            }
            _ => self.children(el, style),
        }
    }

    fn text(&mut self, raw: &str, style: RunStyle) {
        let mut text = collapse_whitespace(raw);
        if text.starts_with(' ') && matches!(self.last_char(), None | Some(' ') | Some('\n')) {
            text.remove(0);
        }
        if !text.is_empty() {
            self.push(&text, style);
        }
    }

    /// 行頭でなければ改行を入れる
    fn line_break(&mut self, style: RunStyle) {
        match self.last_char() {
            None | Some('\n') => {}
            Some(' ') => {
                self.trim_trailing_spaces();
                self.line_break(style);
            }
            Some(_) => self.push("\n", style),
        }
    }

    fn push(&mut self, text: &str, style: RunStyle) {
        match self.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.runs.push(TextRun {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn last_char(&self) -> Option<char> {
        self.runs.last().and_then(|r| r.text.chars().last())
    }

    fn trim_trailing_spaces(&mut self) {
        while let Some(last) = self.runs.last_mut() {
            let trimmed_len = last.text.trim_end_matches(' ').len();
            last.text.truncate(trimmed_len);
            if last.text.is_empty() {
                self.runs.pop();
            } else {
                break;
            }
        }
    }

    fn finish(mut self) -> Vec<TextRun> {
        while let Some(last) = self.runs.last_mut() {
            let trimmed_len = last.text.trim_end().len();
            last.text.truncate(trimmed_len);
            if last.text.is_empty() {
                self.runs.pop();
            } else {
                break;
            }
        }
        self.runs
    }
}
