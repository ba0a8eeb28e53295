//! Taxonomy Loader: turns an uploaded framework spreadsheet into `SkillRecord`s.
//!
//! Columns are located by header text, not position, because framework exports
//! differ in column order and often carry title rows above the header.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::LazyLock;

use calamine::Reader;
use regex::Regex;
use tracing::info;

use crate::taxonomy::models::{SkillRecord, Taxonomy};
use crate::taxonomy::TaxonomyError;

/// How many leading rows are searched for the header row.
const HEADER_SEARCH_ROWS: usize = 10;

const SKILL_HEADERS: &[&str] = &[
    "skill",
    "skills",
    "skill name",
    "skill title",
    "tsc title",
    "tsc_ccs title",
    "tsc/ccs title",
    "title",
];

static LEVEL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:proficiency\s*level|level|proficiency)\s*[_\-]?\s*([1-6])\b")
        .expect("level header regex is valid")
});

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    sector: Option<usize>,
    track: Option<usize>,
    skill: usize,
    description: Option<usize>,
    levels: Vec<(u8, usize)>,
}

/// Parses a framework file (xlsx/xls/xlsm/ods/csv) into a de-duplicated taxonomy.
pub fn load_taxonomy(file_name: &str, bytes: &[u8]) -> Result<Taxonomy, TaxonomyError> {
    let rows = read_rows(file_name, bytes)?;
    let records = records_from_rows(&rows)?;
    let taxonomy = Taxonomy::from_records(records);

    if taxonomy.is_empty() {
        return Err(TaxonomyError::Empty);
    }

    info!(
        "Loaded taxonomy '{}': {} skills ({} duplicates dropped)",
        file_name,
        taxonomy.len(),
        taxonomy.duplicates_dropped()
    );
    Ok(taxonomy)
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

fn extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Whether `load_taxonomy` can read this file type. Checked at upload time.
pub fn is_supported_file(file_name: &str) -> bool {
    let ext = extension(file_name);
    ext == "csv" || WORKBOOK_EXTENSIONS.contains(&ext.as_str())
}

fn read_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, TaxonomyError> {
    let ext = extension(file_name);
    if ext == "csv" {
        read_csv_rows(bytes)
    } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        read_workbook_rows(bytes)
    } else {
        Err(TaxonomyError::UnsupportedFormat(file_name.to_string()))
    }
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, TaxonomyError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, TaxonomyError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TaxonomyError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TaxonomyError::NoWorksheet)?
        .map_err(|e| TaxonomyError::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect())
}

/// Converts raw rows (header row somewhere near the top) into skill records.
pub fn records_from_rows(rows: &[Vec<String>]) -> Result<Vec<SkillRecord>, TaxonomyError> {
    let (header_index, columns) = rows
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .enumerate()
        .find_map(|(i, row)| resolve_columns(row).map(|c| (i, c)))
        .ok_or(TaxonomyError::MissingSkillColumn)?;

    let cell = |row: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    let records = rows
        .iter()
        .skip(header_index + 1)
        .filter_map(|row| {
            let skill = cell(row, Some(columns.skill));
            if skill.is_empty() {
                return None;
            }
            let descriptors: BTreeMap<u8, String> = columns
                .levels
                .iter()
                .filter_map(|&(level, idx)| {
                    let text = cell(row, Some(idx));
                    (!text.is_empty()).then_some((level, text))
                })
                .collect();
            let description = Some(cell(row, columns.description)).filter(|d| !d.is_empty());

            Some(SkillRecord {
                sector: cell(row, columns.sector),
                track: cell(row, columns.track),
                skill,
                description,
                descriptors,
            })
        })
        .collect();

    Ok(records)
}

fn resolve_columns(header: &[String]) -> Option<Columns> {
    let normalised: Vec<String> = header
        .iter()
        .map(|h| h.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .collect();

    let skill = normalised
        .iter()
        .position(|h| SKILL_HEADERS.contains(&h.as_str()))
        .or_else(|| {
            normalised
                .iter()
                .position(|h| {
                    h.split(' ').any(|w| w == "skill" || w == "skills") && !LEVEL_HEADER.is_match(h)
                })
        })?;

    let mut columns = Columns {
        skill,
        ..Columns::default()
    };

    for (i, h) in normalised.iter().enumerate() {
        if i == skill {
            continue;
        }
        if let Some(caps) = LEVEL_HEADER.captures(h) {
            if let Ok(level) = caps[1].parse::<u8>() {
                if !columns.levels.iter().any(|&(l, _)| l == level) {
                    columns.levels.push((level, i));
                }
            }
        } else if columns.sector.is_none() && h.contains("sector") {
            columns.sector = Some(i);
        } else if columns.track.is_none() && (h.contains("track") || h.contains("pathway")) {
            columns.track = Some(i);
        } else if columns.description.is_none() && h.contains("description") {
            columns.description = Some(i);
        }
    }
    columns.levels.sort_unstable();

    Some(columns)
}
