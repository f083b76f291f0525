//! Shared fixtures: CSV and xlsx files in a temporary data directory.

#![allow(dead_code)]

use conflict_dash::config::AppConfig;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const VIOLENCE_CSV: &str = "\
Year,Month,Events,Fatalities,Admin1,Admin2
2023,January,10,2,West Bank,Jenin
2023,February,12,0,West Bank,Nablus
2023,October,40,700,Gaza Strip,Gaza
2023,November,55,900,Gaza Strip,Khan Yunis
2024,January,30,400,Gaza Strip,Gaza
2024,February,8,1,West Bank,Jenin
2024,March,20,250,Gaza Strip,Rafah
";

pub fn data_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A catalog whose data directory is `dir`.
pub fn catalog(dir: &Path, dashboards: &str) -> AppConfig {
    let json = format!(r#"{{ "dashboards": [{}] }}"#, dashboards);
    let mut config = AppConfig::from_json(&json).unwrap();
    config.data_dir = dir.to_path_buf();
    config
}

/// Political violence dashboard over `file`, filterable by year and region.
pub fn violence_dashboard(label: &str, file: &str) -> String {
    format!(
        r#"{{
            "label": "{label}",
            "title": "{label}",
            "sources": [{{
                "id": "political-violence",
                "path": "{file}",
                "required": ["Year", "Month", "Events", "Fatalities", "Admin1", "Admin2"],
                "numbers": [
                    {{ "column": "Year", "on_invalid": "drop_row" }},
                    {{ "column": "Events" }},
                    {{ "column": "Fatalities", "on_invalid": "fail" }}
                ],
                "derive": [
                    {{ "op": "month_year_label", "month": "Month", "year": "Year", "output": "month_of_year" }},
                    {{ "op": "month_start", "month": "Month", "year": "Year", "output": "Period" }}
                ]
            }}],
            "filters": [
                {{ "column": "Year", "label": "Years" }},
                {{ "column": "Admin1", "label": "Regions" }}
            ],
            "headline": [
                {{ "name": "events", "label": "Total Events", "source": "political-violence", "column": "Events", "op": "sum" }},
                {{ "name": "fatalities", "label": "Total Fatalities", "source": "political-violence", "column": "Fatalities", "op": "sum" }},
                {{ "name": "records", "label": "Records", "source": "political-violence", "op": "count" }}
            ],
            "summary": {{ "source": "political-violence", "columns": ["Events", "Fatalities"] }},
            "charts": [
                {{
                    "title": "Totals by Year",
                    "source": "political-violence",
                    "kind": "bar",
                    "aggregate": {{
                        "type": "grouped",
                        "keys": ["Year"],
                        "metrics": [
                            {{ "name": "Total Events", "column": "Events", "op": "sum" }},
                            {{ "name": "Total Fatalities", "column": "Fatalities", "op": "sum" }}
                        ]
                    }},
                    "caption": "{{fatalities}} fatalities"
                }},
                {{
                    "title": "Fatalities by Region and Year",
                    "source": "political-violence",
                    "kind": "heatmap",
                    "aggregate": {{ "type": "pivot", "row": "Admin2", "column": "Year", "value": "Fatalities", "op": "sum" }}
                }}
            ]
        }}"#
    )
}

/// One worksheet: a header row followed by data rows. Cells that parse as
/// numbers are written as numbers, everything else as inline strings.
pub struct Sheet<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<&'a str>>,
}

fn column_letter(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

fn sheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in sheet.rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell_ref = format!("{}{}", column_letter(c), r + 1);
            if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value));
            } else {
                xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref, value
                ));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Write a minimal xlsx workbook.
pub fn write_xlsx(dir: &Path, name: &str, sheets: &[Sheet]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = FileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            sheet.name
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str("</Relationships>");

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types),
        ("_rels/.rels".to_string(), root_rels.to_string()),
        ("xl/workbook.xml".to_string(), workbook),
        ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels),
    ];
    for (i, sheet) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet)));
    }
    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}
