//! Office Open XML text extraction (DOCX paragraphs, XLSX sheets).
//!
//! Both formats are zip containers of XML parts. Only the handful of
//! elements that carry text are read; styling and layout are ignored.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{ProcessingError, ServiceResult};

static DOCX_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)").expect("valid paragraph regex")
});

static DOCX_RUN_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br(?:\s[^>]*)?/>|<w:cr/>")
        .expect("valid run regex")
});

static XLSX_SHEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<sheet\s([^>]*?)/?>").expect("valid sheet regex"));

static XLSX_RELATIONSHIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Relationship\s([^>]*?)/?>").expect("valid rel regex"));

static XLSX_SHARED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<si>(.*?)</si>").expect("valid si regex"));

static XLSX_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>([^<]*)</t>").expect("valid t regex"));

static XLSX_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<row(?:\s[^>]*?)?(?:/>|>(.*?)</row>)").expect("valid row regex"));

static XLSX_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<c(?:\s([^>]*?))?(?:/>|>(.*?)</c>)").expect("valid cell regex")
});

static XLSX_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<v>([^<]*)</v>").expect("valid v regex"));

static XML_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*"([^"]*)""#).expect("valid attribute regex")
});

/// Extract paragraph text from a DOCX file, one paragraph per line.
pub fn extract_docx(path: &Path) -> ServiceResult<String> {
    let mut archive = open_archive(path)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    Ok(docx_paragraphs(&xml).join("\n"))
}

/// Extract all sheets of an XLSX workbook as `Sheet: {name}` headers
/// followed by tab-separated rows.
pub fn extract_xlsx(path: &Path) -> ServiceResult<String> {
    let mut archive = open_archive(path)?;

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml),
        Err(_) => Vec::new(),
    };

    let workbook = read_part(&mut archive, "xl/workbook.xml")?;
    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let targets = parse_relationship_targets(&rels);

    let mut parts = Vec::new();
    for (name, rel_id) in parse_sheets(&workbook) {
        let Some(target) = targets.get(&rel_id) else {
            debug!(sheet = %name, rel_id = %rel_id, "Sheet has no relationship target, skipping");
            continue;
        };
        let sheet_xml = read_part(&mut archive, &resolve_target(target))?;

        parts.push(format!("Sheet: {}", name));
        for row in parse_rows(&sheet_xml, &shared_strings) {
            parts.push(row.join("\t"));
        }
    }

    Ok(parts.join("\n"))
}

fn open_archive(path: &Path) -> ServiceResult<ZipArchive<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(ProcessingError::Io)?;
    let archive = ZipArchive::new(file).map_err(|e| ProcessingError::TextExtraction {
        page: 0,
        source: Box::new(e),
    })?;
    Ok(archive)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> ServiceResult<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ProcessingError::TextExtraction {
            page: 0,
            source: Box::new(e),
        })?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(ProcessingError::Io)?;
    Ok(xml)
}

fn docx_paragraphs(xml: &str) -> Vec<String> {
    DOCX_PARAGRAPH
        .captures_iter(xml)
        .map(|para| {
            let Some(inner) = para.get(1) else {
                return String::new();
            };
            let mut text = String::new();
            for run in DOCX_RUN_CONTENT.captures_iter(inner.as_str()) {
                match run.get(1) {
                    Some(t) => text.push_str(&decode_xml_entities(t.as_str())),
                    None => {
                        let tag = run.get(0).map(|m| m.as_str()).unwrap_or_default();
                        if tag.starts_with("<w:tab") {
                            text.push('\t');
                        } else {
                            text.push('\n');
                        }
                    }
                }
            }
            text
        })
        .collect()
}

fn attributes(tag_body: &str) -> HashMap<String, String> {
    XML_ATTRIBUTE
        .captures_iter(tag_body)
        .map(|c| (c[1].to_string(), decode_xml_entities(&c[2])))
        .collect()
}

/// `(sheet name, relationship id)` in workbook order
fn parse_sheets(workbook_xml: &str) -> Vec<(String, String)> {
    XLSX_SHEET
        .captures_iter(workbook_xml)
        .filter_map(|c| {
            let attrs = attributes(&c[1]);
            Some((attrs.get("name")?.clone(), attrs.get("r:id")?.clone()))
        })
        .collect()
}

fn parse_relationship_targets(rels_xml: &str) -> HashMap<String, String> {
    XLSX_RELATIONSHIP
        .captures_iter(rels_xml)
        .filter_map(|c| {
            let attrs = attributes(&c[1]);
            Some((attrs.get("Id")?.clone(), attrs.get("Target")?.clone()))
        })
        .collect()
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn parse_shared_strings(xml: &str) -> Vec<String> {
    XLSX_SHARED_STRING
        .captures_iter(xml)
        .map(|si| {
            XLSX_TEXT
                .captures_iter(&si[1])
                .map(|t| decode_xml_entities(&t[1]))
                .collect::<String>()
        })
        .collect()
}

fn parse_rows(sheet_xml: &str, shared_strings: &[String]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    for row in XLSX_ROW.captures_iter(sheet_xml) {
        let Some(row_body) = row.get(1) else {
            rows.push(Vec::new());
            continue;
        };

        let mut cells: Vec<String> = Vec::new();
        for cell in XLSX_CELL.captures_iter(row_body.as_str()) {
            let attrs = cell.get(1).map(|a| attributes(a.as_str())).unwrap_or_default();
            let body = cell.get(2).map(|b| b.as_str()).unwrap_or_default();

            let value = cell_value(attrs.get("t").map(String::as_str), body, shared_strings);

            // Place the value at its column, padding skipped cells
            let column = attrs
                .get("r")
                .and_then(|r| column_index(r))
                .unwrap_or(cells.len());
            if column >= cells.len() {
                cells.resize(column, String::new());
                cells.push(value);
            } else {
                cells[column] = value;
            }
        }
        rows.push(cells);
    }

    rows
}

fn cell_value(cell_type: Option<&str>, body: &str, shared_strings: &[String]) -> String {
    match cell_type {
        Some("inlineStr") => XLSX_TEXT
            .captures_iter(body)
            .map(|t| decode_xml_entities(&t[1]))
            .collect(),
        Some("s") => XLSX_VALUE
            .captures(body)
            .and_then(|v| v[1].trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx).cloned())
            .unwrap_or_default(),
        Some("b") => match XLSX_VALUE.captures(body).map(|v| v[1].to_string()) {
            Some(v) if v == "1" => "True".to_string(),
            Some(_) => "False".to_string(),
            None => String::new(),
        },
        _ => XLSX_VALUE
            .captures(body)
            .map(|v| decode_xml_entities(&v[1]))
            .unwrap_or_default(),
    }
}

/// Zero-based column index of a cell reference such as `C12`
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let index = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    Some(index - 1)
}

/// Decode the predefined XML entities and numeric character references
fn decode_xml_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';') else {
            result.push_str(after);
            return result;
        };
        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => result.push(c),
            None => result.push_str(&after[..=semi]),
        }
        rest = &after[semi + 1..];
    }
    result.push_str(rest);
    result
}
