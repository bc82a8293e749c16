use std::io::Cursor;

use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{render::svg, EcLevel, QrCode};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// Whole naira with thousands separators, e.g. `15000` → `₦15,000`.
pub fn format_naira(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}₦{}", sign, group_thousands(amount.unsigned_abs()))
}

/// Rounded to whole liters, e.g. `1049.6` → `1,050L`.
pub fn format_liters(liters: f64) -> String {
    let rounded = liters.max(0.0).round() as u64;
    format!("{}L", group_thousands(rounded))
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Page {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Page { limit, offset }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Slices an already filtered list. Limits are clamped to `1..=MAX_PAGE_SIZE`.
pub fn paginate<T>(items: Vec<T>, page: Page) -> Paged<T> {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = page.offset.unwrap_or(0);
    let total = items.len();

    let items = items.into_iter().skip(offset).take(limit).collect();

    Paged {
        items,
        total,
        limit,
        offset,
    }
}

fn encode_qr(payload: &str) -> Result<QrCode> {
    QrCode::with_error_correction_level(payload, EcLevel::M)
        .map_err(|e| anyhow!("Failed to generate QR code: {}", e))
}

pub fn generate_qr_svg(payload: &str, size: u32) -> Result<String> {
    let code = encode_qr(payload)?;

    let svg = code
        .render()
        .min_dimensions(size, size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(svg)
}

pub fn generate_qr_png(payload: &str, size: u32) -> Result<Vec<u8>> {
    let code = encode_qr(payload)?;
    let image = code.render::<Luma<u8>>().min_dimensions(size, size).build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| anyhow!("Failed to encode PNG: {}", e))?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naira_has_separators_and_no_decimals() {
        assert_eq!(format_naira(15_000), "₦15,000");
        assert_eq!(format_naira(0), "₦0");
        assert_eq!(format_naira(999), "₦999");
        assert_eq!(format_naira(1_000), "₦1,000");
        assert_eq!(format_naira(25_000_000), "₦25,000,000");
        assert_eq!(format_naira(-1_500), "-₦1,500");
    }

    #[test]
    fn liters_round_to_whole_units() {
        assert_eq!(format_liters(0.4), "0L");
        assert_eq!(format_liters(12.5), "13L");
        assert_eq!(format_liters(12_345.0), "12,345L");
    }

    #[test]
    fn case_insensitive_contains() {
        assert!(contains_ignore_case("Jane Smith", "SMITH"));
        assert!(!contains_ignore_case("Jane Smith", "john"));
    }

    #[test]
    fn paginate_clamps_and_counts() {
        let page = paginate((1..=10).collect::<Vec<_>>(), Page::new(Some(3), Some(8)));
        assert_eq!(page.items, vec![9, 10]);
        assert_eq!(page.total, 10);
        assert_eq!(page.limit, 3);

        let page = paginate((1..=10).collect::<Vec<_>>(), Page::new(Some(0), None));
        assert_eq!(page.items, vec![1]);

        let page = paginate((1..=300).collect::<Vec<_>>(), Page::default());
        assert_eq!(page.items.len(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn renders_svg_and_png() {
        let svg = generate_qr_svg("{\"pumpId\":\"PUMP-01\"}", 200).unwrap();
        assert!(svg.contains("<svg"));

        let png = generate_qr_png("{\"pumpId\":\"PUMP-01\"}", 200).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
