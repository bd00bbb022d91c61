//! Parser for Tesseract's TSV output.
//!
//! Each row describes one layout element:
//!
//! ```text
//! level page_num block_num par_num line_num word_num left top width height conf text
//! ```
//!
//! Levels are 1 = page, 2 = block, 3 = paragraph, 4 = line, 5 = word. Blocks
//! become [`DetectionRegion`]s, lines become [`DetectionLine`]s and words are
//! joined into the line text.

use super::types::{BoundingBox, DetectionLine, DetectionRegion};

const LEVEL_BLOCK: u8 = 2;
const LEVEL_LINE: u8 = 4;
const LEVEL_WORD: u8 = 5;

struct Row<'a> {
    level: u8,
    left: i64,
    top: i64,
    width: i64,
    height: i64,
    conf: f32,
    text: &'a str,
}

fn parse_row(raw: &str) -> Option<Row<'_>> {
    let fields: Vec<&str> = raw.splitn(12, '\t').collect();
    if fields.len() < 11 {
        return None;
    }

    Some(Row {
        level: fields[0].trim().parse().ok()?,
        left: fields[6].trim().parse().ok()?,
        top: fields[7].trim().parse().ok()?,
        width: fields[8].trim().parse().ok()?,
        height: fields[9].trim().parse().ok()?,
        conf: fields[10].trim().parse().ok()?,
        text: fields.get(11).copied().unwrap_or("").trim_end_matches(['\r', '\n']),
    })
}

fn clamp_px(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

#[derive(Default)]
struct LineBuilder {
    words: Vec<String>,
    conf_sum: f32,
}

impl LineBuilder {
    fn push(&mut self, word: &str, conf: f32) {
        self.words.push(word.to_string());
        self.conf_sum += conf.max(0.0);
    }

    fn finish(self) -> Option<DetectionLine> {
        if self.words.is_empty() {
            return None;
        }
        let mean = self.conf_sum / self.words.len() as f32;
        Some(DetectionLine::new(
            self.words.join(" "),
            (mean / 100.0).clamp(0.0, 1.0),
        ))
    }
}

fn close_line(regions: &mut Vec<DetectionRegion>, line: Option<LineBuilder>) {
    let Some(line) = line.and_then(LineBuilder::finish) else {
        return;
    };
    if regions.is_empty() {
        regions.push(DetectionRegion::default());
    }
    if let Some(region) = regions.last_mut() {
        region.lines.push(line);
    }
}

/// Build regions and lines from Tesseract TSV text.
///
/// Header and malformed rows are skipped. Lines without any non-blank word are
/// dropped, while blocks are kept even when they end up empty.
pub fn parse_tsv(tsv: &str) -> Vec<DetectionRegion> {
    let mut regions: Vec<DetectionRegion> = Vec::new();
    let mut line: Option<LineBuilder> = None;

    for row in tsv.lines().filter_map(parse_row) {
        match row.level {
            LEVEL_BLOCK => {
                close_line(&mut regions, line.take());
                regions.push(DetectionRegion::new(
                    BoundingBox::new(
                        clamp_px(row.left),
                        clamp_px(row.top),
                        clamp_px(row.width),
                        clamp_px(row.height),
                    ),
                    Vec::new(),
                ));
            }
            LEVEL_LINE => {
                close_line(&mut regions, line.take());
                line = Some(LineBuilder::default());
            }
            LEVEL_WORD => {
                let word = row.text.trim();
                if !word.is_empty() {
                    line.get_or_insert_with(LineBuilder::default)
                        .push(word, row.conf);
                }
            }
            _ => {}
        }
    }
    close_line(&mut regions, line.take());

    regions
}
