//! 説明文 HTML の整形
//!
//! 許可タグ以外は外して中身のテキストだけ残す。`script` などは中身ごと捨てる。

use scraper::{ElementRef, Html, Node};

/// そのまま残すタグ
pub const KEPT_TAGS: &[&str] = &["p", "br", "b", "strong", "i", "em", "u", "ul", "ol", "li"];

/// 中身ごと捨てるタグ
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "button", "form", "select",
    "input", "textarea", "head", "title", "meta", "link", "img", "video", "picture",
];

/// 改行相当として扱うブロック要素
const BLOCK_TAGS: &[&str] = &[
    "div", "section", "article", "table", "tr", "dl", "dt", "dd", "blockquote",
];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// HTML 断片を整形する
pub fn sanitize_fragment(html: &str, max_chars: usize) -> String {
    let fragment = Html::parse_fragment(html);
    sanitize_element(fragment.root_element(), max_chars)
}

/// 要素の子孫を整形する（要素自身のタグは出力しない）
pub fn sanitize_element(element: ElementRef<'_>, max_chars: usize) -> String {
    let mut writer = Writer {
        out: String::new(),
        remaining: max_chars,
        truncated: false,
    };
    writer.children(element);
    writer.finish()
}

struct Writer {
    out: String,
    remaining: usize,
    truncated: bool,
}

impl Writer {
    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if self.truncated {
                return;
            }
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.element(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, node: ElementRef<'_>) {
        let name = node.value().name().to_ascii_lowercase();
        let name = name.as_str();

        if DROPPED_TAGS.contains(&name) {
            return;
        }
        if name == "br" {
            self.out.push_str("<br>");
            return;
        }
        if KEPT_TAGS.contains(&name) {
            self.wrapped(node, &[name]);
        } else if HEADING_TAGS.contains(&name) {
            self.wrapped(node, &["p", "b"]);
        } else if BLOCK_TAGS.contains(&name) {
            let start = self.out.len();
            self.children(node);
            if self.out.len() > start && !ends_with_block(&self.out) {
                self.out.push_str("<br>");
            }
        } else {
            self.children(node);
        }
    }

    /// 子孫をタグで囲む。中身が空ならタグごと出力しない。
    fn wrapped(&mut self, node: ElementRef<'_>, tags: &[&str]) {
        let start = self.out.len();
        for tag in tags {
            self.out.push('<');
            self.out.push_str(tag);
            self.out.push('>');
        }
        let opened = self.out.len();
        self.children(node);
        if self.out[opened..].trim().is_empty() {
            self.out.truncate(start);
            return;
        }
        for tag in tags.iter().rev() {
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push('>');
        }
    }

    fn text(&mut self, raw: &str) {
        let mut text = collapse_whitespace(raw);
        if text.starts_with(' ') && (self.out.is_empty() || self.out.ends_with(' ')) {
            text.remove(0);
        }
        if text.is_empty() {
            return;
        }

        let len = text.chars().count();
        if len > self.remaining {
            let kept: String = text.chars().take(self.remaining).collect();
            push_escaped(&mut self.out, kept.trim_end());
            self.out.push_str("...");
            self.remaining = 0;
            self.truncated = true;
        } else {
            push_escaped(&mut self.out, &text);
            self.remaining -= len;
        }
    }

    fn finish(self) -> String {
        let mut out = self.out.trim().to_string();
        while let Some(stripped) = out.strip_suffix("<br>") {
            out = stripped.trim_end().to_string();
        }
        out
    }
}

fn ends_with_block(out: &str) -> bool {
    let trimmed = out.trim_end();
    ["</p>", "</ul>", "</ol>", "</li>", "<br>"]
        .iter()
        .any(|tag| trimmed.ends_with(tag))
}

/// 連続する空白を 1 つにまとめる（前後の空白は 1 つだけ残す）
pub fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    if pending_space {
        out.push(' ');
    }
    out
}

/// `&` `<` `>` をエスケープして追記する
pub(crate) fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_emphasis_is_kept() {
        assert_eq!(
            sanitize_fragment("<b>Durable</b> widget", 2000),
            "<b>Durable</b> widget"
        );
    }

    #[test]
    fn test_scripts_comments_and_wrappers_are_removed() {
        let html = r#"<div class="x"><p>Hello <script>alert(1)</script><span style="color:red">world</span></p><!-- note --></div>"#;
        assert_eq!(sanitize_fragment(html, 2000), "<p>Hello world</p>");
    }

    #[test]
    fn test_lists_and_breaks() {
        let html = "<ul>\n  <li>One</li>\n  <li><em>Two</em></li>\n</ul>Line<br/>Next";
        assert_eq!(
            sanitize_fragment(html, 2000),
            "<ul> <li>One</li> <li><em>Two</em></li> </ul>Line<br>Next"
        );
    }

    #[test]
    fn test_headings_become_bold_paragraphs() {
        assert_eq!(
            sanitize_fragment("<h3>Specs</h3><p>Steel</p>", 2000),
            "<p><b>Specs</b></p><p>Steel</p>"
        );
    }

    #[test]
    fn test_empty_tags_are_dropped() {
        assert_eq!(sanitize_fragment("<p> </p><b></b><p>Text</p>", 2000), "<p>Text</p>");
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(
            sanitize_fragment("<p>Fish &amp; Chips &lt;3</p>", 2000),
            "<p>Fish &amp; Chips &lt;3</p>"
        );
    }

    #[test]
    fn test_truncation_keeps_tags_balanced() {
        assert_eq!(
            sanitize_fragment("<p>Hello <b>wonderful</b> world</p><p>More</p>", 8),
            "<p>Hello <b>wo...</b></p>"
        );
    }
}
