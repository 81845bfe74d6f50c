//! 商品ページ HTML からの項目抽出

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use md5::{Digest, Md5};

use super::markup::{collapse_whitespace, push_escaped, sanitize_element, sanitize_fragment};
use super::types::ProductRecord;
use crate::error::ScrapeError;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("静的セレクタ")
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));

/// 説明文コンテナ（優先順）
static DESCRIPTION_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[itemprop="description"]"#,
        r#"div[class*="product-description"]"#,
        r#"div[class*="description"]"#,
        "div#description",
        r#"section[class*="description"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static META_DESCRIPTIONS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="og:description"]"#,
        r#"meta[name="description"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static PRICE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[itemprop="price"]"#,
        r#"meta[property="product:price:amount"]"#,
        r#"meta[property="og:price:amount"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static SRCSET: Lazy<Selector> = Lazy::new(|| selector("[srcset]"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));

static JSON_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""price"\s*:\s*"?([0-9][0-9.,]*)"#).expect("静的正規表現"));
static JSON_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""image"\s*:\s*\[?\s*"([^"]+)""#).expect("静的正規表現"));
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)").expect("静的正規表現"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)?$").expect("静的正規表現"));
static SRCSET_WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)w$").expect("静的正規表現"));

/// 高解像度メディアパス（`/media/1024x1366/...`）
static HIGH_RES_MEDIA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["'](https?://[^"']*/media/\d{3,4}x\d{3,4}/[^"']+\.(?:jpg|jpeg|png|webp))["']"#)
        .expect("静的正規表現")
});
static SMALL_DIMENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_?\d{1,3}x\d{1,3}[._]").expect("静的正規表現"));
static SIZED_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{3,4}x\d{3,4}/").expect("静的正規表現"));
static DIMENSION_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"x\d+").expect("静的正規表現"));
static DIMENSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\d+x\d+(\.[a-z]+)$").expect("静的正規表現"));
static DIMENSION_SUFFIX_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\d+x\d+\.").expect("静的正規表現"));
static DIMENSION_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+x\d+/").expect("静的正規表現"));

static PRODUCT_CLASS_IMG: Lazy<Selector> = Lazy::new(|| selector(r#"img[class*="product"][src]"#));
static PRODUCT_ID_IMG: Lazy<Selector> = Lazy::new(|| selector(r#"img[id*="product"][src]"#));
static LAZY_IMG: Lazy<Selector> = Lazy::new(|| selector("img[data-src]"));

/// 高解像度版のパス寸法
const FULL_SIZE_PATH: &str = "/1024x1366/";

/// 画像候補から除外するキーワード
const IMAGE_SKIP_WORDS: &[&str] = &[
    "thumbnail", "_thumb", "/thumb/", "placeholder", "loading", "logo", "icon", "_sm", "_xs",
];

/// 商品名の最大文字数
pub const MAX_NAME_CHARS: usize = 255;

/// HTML から商品レコードを組み立てる
///
/// 商品名が見つからない場合のみ `ScrapeError::Parse`。価格・画像は任意、説明文は空でも可。
pub fn extract_product(
    url: &str,
    html: &str,
    max_description_chars: usize,
) -> Result<ProductRecord, ScrapeError> {
    let document = Html::parse_document(html);

    let name = extract_name(&document)
        .ok_or_else(|| ScrapeError::Parse(format!("商品名が見つかりません: {}", url)))?;
    let description = extract_description(&document, max_description_chars);
    let price = extract_price(&document, html);
    let image_url = extract_image(&document, html, url);

    debug!(
        "抽出結果: name={:?}, price={:?}, description={}chars, image={:?}",
        name,
        price,
        description.len(),
        image_url
    );

    Ok(ProductRecord {
        sku: generate_sku(&name, url),
        source_url: url.to_string(),
        name,
        price,
        description,
        image_url,
        scraped_at: Utc::now(),
    })
}

fn extract_name(document: &Html) -> Option<String> {
    let og = document
        .select(&OG_TITLE)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|s| !s.is_empty());
    og.or_else(|| {
        document
            .select(&TITLE)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .find(|s| !s.is_empty())
    })
    .map(|name| truncate_chars(name, MAX_NAME_CHARS))
}

/// 文字単位で切り詰める（末尾の空白も落とす）
fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
    }
    text
}

fn extract_description(document: &Html, max_chars: usize) -> String {
    for container in DESCRIPTION_CONTAINERS.iter() {
        if let Some(found) = document
            .select(container)
            .filter(|el| !is_meta(el))
            .map(|el| sanitize_element(el, max_chars))
            .find(|s| !s.is_empty())
        {
            return found;
        }
    }

    // メタ情報はプレーンテキストなので段落で包む
    for meta in META_DESCRIPTIONS.iter() {
        if let Some(content) = document
            .select(meta)
            .filter_map(|el| el.value().attr("content"))
            .map(clean_text)
            .find(|s| !s.is_empty())
        {
            let mut wrapped = String::from("<p>");
            push_escaped(&mut wrapped, &content);
            wrapped.push_str("</p>");
            return sanitize_fragment(&wrapped, max_chars);
        }
    }

    String::new()
}

fn is_meta(el: &ElementRef<'_>) -> bool {
    el.value().name() == "meta"
}

fn extract_price(document: &Html, raw_html: &str) -> Option<String> {
    for sel in PRICE_META.iter() {
        for el in document.select(sel) {
            let value = el
                .value()
                .attr("content")
                .map(str::to_string)
                .unwrap_or_else(|| el.text().collect::<String>());
            if let Some(price) = normalize_price(&value) {
                return Some(price);
            }
        }
    }

    if let Some(price) = JSON_PRICE
        .captures_iter(raw_html)
        .find_map(|c| normalize_price(&c[1]))
    {
        return Some(price);
    }

    let text = document
        .select(&BODY)
        .next()
        .map(|body| body.text().collect::<String>())
        .unwrap_or_default();
    DOLLAR_AMOUNT
        .captures_iter(&text)
        .find_map(|c| normalize_price(&c[1]))
}

/// 価格文字列を小数表記にそろえる（"1,299.00" → "1299.00"）
pub fn normalize_price(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim_end_matches('.');
    if DECIMAL.is_match(cleaned) {
        Some(cleaned.to_string())
    } else {
        None
    }
}

fn extract_image(document: &Html, raw_html: &str, page_url: &str) -> Option<String> {
    let mut best: Option<(u32, &str)> = None;
    for el in document.select(&SRCSET) {
        let Some(srcset) = el.value().attr("srcset") else {
            continue;
        };
        for candidate in srcset.split(',') {
            let mut parts = candidate.split_whitespace();
            let (Some(src), Some(descriptor)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Some(width) = SRCSET_WIDTH
                .captures(descriptor)
                .and_then(|c| c[1].parse::<u32>().ok())
            else {
                continue;
            };
            if is_skipped_image(src) {
                continue;
            }
            if best.map_or(true, |(w, _)| width > w) {
                best = Some((width, src));
            }
        }
    }

    let found = match best {
        Some((_, src)) => src.to_string(),
        None => fallback_image(document, raw_html)?,
    };

    resolve_url(page_url, &upgrade_image(found.trim()))
}

/// srcset がない場合の候補（優先順）
fn fallback_image(document: &Html, raw_html: &str) -> Option<String> {
    let attr_of = move |sel: &'static Lazy<Selector>, attr: &'static str| {
        document
            .select(sel)
            .filter_map(move |el| el.value().attr(attr))
            .map(str::to_string)
    };

    HIGH_RES_MEDIA
        .captures_iter(raw_html)
        .map(|c| c[1].to_string())
        .chain(attr_of(&OG_IMAGE, "content"))
        .chain(JSON_IMAGE.captures_iter(raw_html).map(|c| c[1].to_string()))
        .chain(attr_of(&PRODUCT_CLASS_IMG, "src"))
        .chain(attr_of(&PRODUCT_ID_IMG, "src"))
        .chain(attr_of(&LAZY_IMG, "data-src"))
        .map(|src| src.trim().to_string())
        .find(|src| is_preferred_image(src))
}

/// 小さいサイズ表記を含まず、寸法表記があるなら高解像度パスのもの
fn is_preferred_image(src: &str) -> bool {
    !src.is_empty()
        && !is_skipped_image(src)
        && !SMALL_DIMENSION.is_match(src)
        && (SIZED_PATH.is_match(src) || !DIMENSION_MARK.is_match(src))
}

/// サムネイル URL をフルサイズ版に書き換える
///
/// - 末尾の `_WxH.ext` を外す
/// - `/thumbnail/` を `/media/1024x1366/` に置き換える
/// - `/WxH/` のパス寸法を `/1024x1366/` に置き換える
pub fn upgrade_image(src: &str) -> String {
    if !src.contains("thumbnail") && !DIMENSION_SUFFIX_ANYWHERE.is_match(src) {
        return src.to_string();
    }
    let mut image = DIMENSION_SUFFIX.replace(src, "$1").into_owned();
    if image.contains("/thumbnail/") {
        image = image.replace("/thumbnail/", "/media/1024x1366/");
    }
    if DIMENSION_PATH.is_match(&image) {
        image = DIMENSION_PATH.replace_all(&image, FULL_SIZE_PATH).into_owned();
    }
    if image != src {
        debug!("画像URLをフルサイズに変換: {} -> {}", src, image);
    }
    image
}

fn is_skipped_image(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    IMAGE_SKIP_WORDS.iter().any(|w| lower.contains(w))
}

fn resolve_url(base: &str, href: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .ok()
        .map(|u| u.to_string())
}

/// 制御文字を除去し空白を詰める
pub fn clean_text(raw: &str) -> String {
    let without_controls: String = raw.chars().filter(|c| !c.is_control() || c.is_whitespace()).collect();
    collapse_whitespace(&without_controls).trim().to_string()
}

/// 商品名の英字 5 文字 + URL の MD5 由来の 4 桁番号
pub fn generate_sku(name: &str, url: &str) -> String {
    let mut prefix: String = name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(5)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 5 {
        prefix.push('X');
    }
    format!("{}{}", prefix, url_number(url))
}

/// URL の MD5 ダイジェスト（128bit 整数）を 1000..=9999 に写す
fn url_number(url: &str) -> u128 {
    let digest = Md5::digest(url.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    u128::from_be_bytes(bytes) % 9000 + 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRODUCT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Fallback Title | Shop</title>
  <meta property="og:title" content="Widget &amp; Co">
  <meta property="og:image" content="/media/widget-og.jpg">
  <meta name="description" content="meta description">
</head>
<body>
  <img srcset="/img/widget_thumbnail.jpg 2000w, /img/widget-600.jpg 600w, /img/widget-1200.jpg 1200w">
  <div class="product-description rte">
    <p><strong>Durable</strong> widget for <em>everyday</em> use.</p>
    <script>track();</script>
    <ul><li>Steel</li></ul>
  </div>
  <span itemprop="price" content="1,299.00">$1,299.00</span>
</body>
</html>"#;

    #[test]
    fn test_extract_full_page() {
        let record = extract_product("https://shop.example/p/widget", PRODUCT_PAGE, 2000).unwrap();
        assert_eq!(record.name, "Widget & Co");
        assert_eq!(record.price.as_deref(), Some("1299.00"));
        assert_eq!(
            record.description,
            "<p><strong>Durable</strong> widget for <em>everyday</em> use.</p> <ul><li>Steel</li></ul>"
        );
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://shop.example/img/widget-1200.jpg")
        );
        assert_eq!(record.source_url, "https://shop.example/p/widget");
        assert!(record.sku.starts_with("WIDGE"));
    }

    #[test]
    fn test_title_and_meta_fallbacks() {
        let html = r#"<html><head><title>  Plain
            Lamp </title><meta property="og:description" content="Warm &lt;light&gt;"></head>
            <body><script type="application/ld+json">{"offers":{"price":"24.5"},"image":["https://cdn.example/lamp.png"]}</script></body></html>"#;
        let record = extract_product("https://shop.example/lamp", html, 2000).unwrap();
        assert_eq!(record.name, "Plain Lamp");
        assert_eq!(record.description, "<p>Warm &lt;light&gt;</p>");
        assert_eq!(record.price.as_deref(), Some("24.5"));
        assert_eq!(record.image_url.as_deref(), Some("https://cdn.example/lamp.png"));
    }

    #[test]
    fn test_dollar_amount_fallback() {
        let html = "<html><head><title>Mug</title></head><body><p>Now only $ 12.00!</p></body></html>";
        let record = extract_product("https://shop.example/mug", html, 2000).unwrap();
        assert_eq!(record.price.as_deref(), Some("12.00"));
        assert_eq!(record.description, "");
        assert_eq!(record.image_url, None);
    }

    #[test]
    fn test_missing_name_is_parse_error() {
        let html = "<html><head></head><body><div class='description'>x</div></body></html>";
        let err = extract_product("https://shop.example/x", html, 2000).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn test_normalize_price() {
        assert_eq!(normalize_price("9.99"), Some("9.99".into()));
        assert_eq!(normalize_price(" $1,234.50 "), Some("1234.50".into()));
        assert_eq!(normalize_price("15."), Some("15".into()));
        assert_eq!(normalize_price("free"), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn test_sku_is_stable() {
        let a = generate_sku("Widget", "https://shop.example/a");
        let b = generate_sku("Widget", "https://shop.example/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 9);
        assert!(a.starts_with("WIDGE"));
        let n: u64 = a[5..].parse().unwrap();
        assert!((1000..=9999).contains(&n));

        assert!(generate_sku("3D", "https://x").starts_with("DXXXX"));
    }

    #[test]
    fn test_sku_number_is_md5_of_url() {
        assert_eq!(generate_sku("Widget", "https://shop.example/a"), "WIDGE5591");
        assert_eq!(
            generate_sku("Widget & Co", "https://shop.example/p/widget"),
            "WIDGE4132"
        );
    }

    #[test]
    fn test_long_title_is_capped() {
        let html = format!(
            "<html><head><title>{}</title></head><body></body></html>",
            "a".repeat(40_000)
        );
        let record = extract_product("https://shop.example/long", &html, 2000).unwrap();
        assert_eq!(record.name.chars().count(), MAX_NAME_CHARS);

        let multibyte = truncate_chars("商品".repeat(300), MAX_NAME_CHARS);
        assert_eq!(multibyte.chars().count(), MAX_NAME_CHARS);
        assert_eq!(truncate_chars("short".into(), MAX_NAME_CHARS), "short");
    }

    fn image_of(body: &str) -> Option<String> {
        let html = format!("<html><head><title>Item</title></head><body>{}</body></html>", body);
        extract_product("https://shop.example/p/item", &html, 2000)
            .unwrap()
            .image_url
    }

    #[test]
    fn test_high_res_media_path_wins_over_og_image() {
        let html = r#"<html><head><title>Ski</title>
            <meta property="og:image" content="https://shop.example/og.jpg"></head>
            <body><a data-zoom="https://cdn.example/media/1024x1366/catalog/ski.jpg">zoom</a></body></html>"#;
        let record = extract_product("https://shop.example/ski", html, 2000).unwrap();
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://cdn.example/media/1024x1366/catalog/ski.jpg")
        );
    }

    #[test]
    fn test_product_img_and_lazy_fallbacks() {
        assert_eq!(
            image_of(r#"<img class="main-product-image" src="/img/boot.jpg">"#).as_deref(),
            Some("https://shop.example/img/boot.jpg")
        );
        assert_eq!(
            image_of(r#"<img id="product-photo" src="/img/boot-id.jpg">"#).as_deref(),
            Some("https://shop.example/img/boot-id.jpg")
        );
        assert_eq!(
            image_of(r#"<img class="lazy" data-src="https://cdn.example/boot.webp">"#).as_deref(),
            Some("https://cdn.example/boot.webp")
        );
    }

    #[test]
    fn test_small_and_placeholder_images_are_skipped() {
        assert_eq!(
            image_of(
                r#"<img class="product" src="/img/boot_100x100.jpg">
                   <img data-src="/img/loading.gif">
                   <img data-src="/img/boot-large.jpg">"#
            )
            .as_deref(),
            Some("https://shop.example/img/boot-large.jpg")
        );
        assert_eq!(image_of(r#"<img data-src="/img/site-logo.png">"#), None);
    }

    #[test]
    fn test_upgrade_image_to_full_size() {
        assert_eq!(
            upgrade_image("https://cdn.example/p/boot_280x280.jpg"),
            "https://cdn.example/p/boot.jpg"
        );
        assert_eq!(
            upgrade_image("https://cdn.example/thumbnail/a/b/c/boot_280x280.png"),
            "https://cdn.example/media/1024x1366/a/b/c/boot.png"
        );
        assert_eq!(
            upgrade_image("https://cdn.example/cache/280x280/boot_280x280.jpg"),
            "https://cdn.example/cache/1024x1366/boot.jpg"
        );
        assert_eq!(
            upgrade_image("https://cdn.example/p/boot.jpg"),
            "https://cdn.example/p/boot.jpg"
        );
    }

    #[test]
    fn test_srcset_thumbnail_size_is_upgraded() {
        assert_eq!(
            image_of(r#"<img srcset="/img/boot_600x600.jpg 600w, /img/boot_300x300.jpg 300w">"#)
                .as_deref(),
            Some("https://shop.example/img/boot.jpg")
        );
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\u{0007}b \n\t c "), "ab c");
    }
}
