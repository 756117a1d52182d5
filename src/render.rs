use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use crate::categorize::{CategorizedReport, CategoryKey, CategoryRule};
use crate::error::{Error, Result};

const HEADER_TEMPLATE: &str = "header_template.png";
const CONTENT_TEMPLATE: &str = "content_template.png";
const FOOTER_TEMPLATE: &str = "footer_template.png";

const TEXT_FONT_SIZE: f32 = 32.0;
// 3x the issue text size
const HEADER_FONT_SIZE: f32 = 96.0;
const FALLBACK_TEXT_SIZE: f32 = 16.0;
const FALLBACK_HEADER_SIZE: f32 = 48.0;

const MARGIN: u32 = 60;
const COL_SPACING: u32 = 70;
const ITEM_HEIGHT: u32 = 60;
const TOP_PADDING: u32 = 40;
const BOTTOM_PADDING: u32 = 40;
const LINE_ADVANCE: i32 = 50;
const ISSUE_SPACING: i32 = 20;
const TEXT_INSET: i32 = 30;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

const HEADER_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/Library/Fonts/DejaVuSans-Bold.ttf",
];

const TEXT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/DejaVuSans.ttf",
];

pub struct ReportFonts {
    pub header: FontVec,
    pub text: FontVec,
    pub header_size: f32,
    pub text_size: f32,
}

fn load_font(paths: &[&str]) -> Option<FontVec> {
    for path in paths {
        if let Ok(bytes) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(bytes)
        {
            return Some(font);
        }
    }
    None
}

/// First loadable TrueType font anywhere under `dir`.
fn scan_fonts(dir: &Path) -> Option<FontVec> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"))
            && let Ok(bytes) = std::fs::read(&path)
            && let Ok(font) = FontVec::try_from_vec(bytes)
        {
            return Some(font);
        }
    }
    subdirs.into_iter().find_map(|dir| scan_fonts(&dir))
}

fn any_system_font() -> Option<FontVec> {
    scan_fonts(Path::new("/usr/share/fonts"))
}

/// Load the report fonts, preferring DejaVu Sans. When it is not installed,
/// fall back to the first usable system font at fixed fallback sizes.
pub fn load_report_fonts() -> Result<ReportFonts> {
    if let (Some(header), Some(text)) = (load_font(HEADER_FONT_PATHS), load_font(TEXT_FONT_PATHS)) {
        return Ok(ReportFonts {
            header,
            text,
            header_size: HEADER_FONT_SIZE,
            text_size: TEXT_FONT_SIZE,
        });
    }

    warn!("DejaVu Sans not found, falling back to the first usable system font");
    match (any_system_font(), any_system_font()) {
        (Some(header), Some(text)) => Ok(ReportFonts {
            header,
            text,
            header_size: FALLBACK_HEADER_SIZE,
            text_size: FALLBACK_TEXT_SIZE,
        }),
        _ => Err(Error::Render(
            "no usable font found on this system".to_string(),
        )),
    }
}

/// Equal-width columns between the margins: column width and each column's
/// left edge.
fn column_layout(width: u32, num_cols: usize) -> (i32, Vec<i32>) {
    let n = num_cols.max(1) as u32;
    let col_width = width.saturating_sub(2 * MARGIN + (n - 1) * COL_SPACING) / n;
    let xs = (0..n)
        .map(|i| (MARGIN + i * (col_width + COL_SPACING)) as i32)
        .collect();
    (col_width as i32, xs)
}

/// Content band height grows with the largest per-column closed-issue
/// count, floored at the template's own height.
fn content_band_height(max_items: usize, template_height: u32) -> u32 {
    let computed = TOP_PADDING + max_items as u32 * ITEM_HEIGHT + BOTTOM_PADDING;
    computed.max(template_height)
}

/// Greedy word wrap by incremental measurement: append a word, measure the
/// candidate line, break on overflow. An over-wide single word keeps its
/// own line.
pub fn wrap_text(text: &str, max_width: i32, measure: impl Fn(&str) -> i32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) < max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Compose the image report: header template, content band stretched to fit
/// the longest column, footer template, one column of closed issues per
/// configured category.
pub fn render_image_report(
    report: &CategorizedReport,
    rules: &[CategoryRule],
    output: &Path,
    template_dir: &Path,
) -> Result<()> {
    debug!("starting image report render");

    let header_img = image::open(template_dir.join(HEADER_TEMPLATE))?.to_rgb8();
    let content_img = image::open(template_dir.join(CONTENT_TEMPLATE))?.to_rgb8();
    let footer_img = image::open(template_dir.join(FOOTER_TEMPLATE))?.to_rgb8();

    let fonts = load_report_fonts()?;

    let width = header_img.width();
    let header_height = header_img.height();
    let footer_height = footer_img.height();

    let (col_width, col_xs) = column_layout(width, rules.len());

    let max_items = rules
        .iter()
        .map(|rule| closed_issues(report, &rule.name).map_or(0, |issues| issues.len()))
        .max()
        .unwrap_or(0);
    let content_height = content_band_height(max_items, content_img.height());

    let content_resized = imageops::resize(
        &content_img,
        width,
        content_height,
        imageops::FilterType::CatmullRom,
    );

    let total_height = header_height + content_height + footer_height;
    let mut canvas = RgbImage::from_pixel(width, total_height, WHITE);
    imageops::replace(&mut canvas, &header_img, 0, 0);
    imageops::replace(&mut canvas, &content_resized, 0, header_height as i64);
    imageops::replace(
        &mut canvas,
        &footer_img,
        0,
        (header_height + content_height) as i64,
    );

    let header_scale = PxScale::from(fonts.header_size);
    let text_scale = PxScale::from(fonts.text_size);

    for (idx, rule) in rules.iter().enumerate() {
        let x0 = col_xs[idx];
        let issues = closed_issues(report, &rule.name);
        debug!(
            category = %rule.name,
            issues = issues.map_or(0, |map| map.len()),
            "rendering column"
        );

        // column header, centered, overlapping the bottom of the header band
        let (name_width, _) = text_size(header_scale, &fonts.header, &rule.name);
        let header_y = header_height as i32 + 20 - fonts.header_size as i32;
        draw_text_mut(
            &mut canvas,
            WHITE,
            x0 + (col_width - name_width as i32) / 2,
            header_y,
            header_scale,
            &fonts.header,
            &rule.name,
        );

        let Some(issues) = issues else { continue };
        let mut y = header_height as i32 + TOP_PADDING as i32 + 80;
        for (summary, issue) in issues {
            let text = format!("[{}] {summary}", issue.key);
            debug!(key = %issue.key, x = x0 + TEXT_INSET, y, "drawing issue");
            let lines = wrap_text(&text, col_width - 2 * TEXT_INSET, |line| {
                text_size(text_scale, &fonts.text, line).0 as i32
            });
            for line in lines {
                draw_text_mut(
                    &mut canvas,
                    WHITE,
                    x0 + TEXT_INSET,
                    y,
                    text_scale,
                    &fonts.text,
                    &line,
                );
                y += LINE_ADVANCE;
            }
            y += ISSUE_SPACING;
        }
    }

    canvas.save(output)?;
    debug!("image report saved to {}", output.display());
    Ok(())
}

fn closed_issues<'a>(
    report: &'a CategorizedReport,
    name: &str,
) -> Option<&'a crate::categorize::IssueMap> {
    report
        .get(&CategoryKey::Named(name.to_string()))
        .map(|bucket| &bucket.closed)
}
