//! XLSX package writing: new workbooks and single-sheet replacement

use crate::reader::CellValue;
use crate::violation::CellReference;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const OFFICE_DOCUMENT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

/// Contents and presentation of one worksheet to be written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetSpec {
    pub name: String,
    /// Row-major cells starting at A1
    pub rows: Vec<Vec<CellValue>>,
    /// Column widths in characters, from column A
    pub column_widths: Vec<f64>,
    /// Merged ranges such as "A1:C1"
    pub merges: Vec<String>,
}

impl SheetSpec {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
            ..Default::default()
        }
    }

    pub fn with_column_widths(mut self, widths: &[f64]) -> Self {
        self.column_widths = widths.to_vec();
        self
    }

    pub fn with_merge(mut self, range: impl Into<String>) -> Self {
        self.merges.push(range.into());
        self
    }
}

/// Write a new workbook holding `sheets` in order
pub fn write_workbook_xlsx(path: &Path, sheets: &[SheetSpec]) -> Result<()> {
    if sheets.is_empty() {
        anyhow::bail!("A workbook needs at least one sheet");
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types_xml(sheets.len())?)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&root_rels_xml()?)?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(&workbook_xml(sheets)?)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(&workbook_rels_xml(sheets.len())?)?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(&worksheet_xml(sheet)?)?;
    }

    zip.finish()?;
    Ok(())
}

/// Copy the package at `input_path` to `output_path`, replacing the worksheet
/// named `sheet.name` or appending it as a new sheet
pub fn upsert_sheet_xlsx(input_path: &Path, output_path: &Path, sheet: &SheetSpec) -> Result<()> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let workbook = read_file_from_zip(&mut archive, "xl/workbook.xml")?;
    let rels = read_file_from_zip(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let sheets = parse_sheet_entries(&workbook)?;
    let relationships = parse_relationships(&rels)?;

    let existing_part = sheets
        .iter()
        .find(|entry| entry.name == sheet.name)
        .and_then(|entry| relationships.iter().find(|rel| rel.id == entry.rel_id))
        .map(|rel| part_name(&rel.target));

    let output_file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut zip_writer = ZipWriter::new(output_file);
    let options = SimpleFileOptions::default();
    let sheet_content = worksheet_xml(sheet)?;

    match existing_part {
        Some(target_part) => {
            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                let name = file.name().to_string();
                zip_writer.start_file(name.as_str(), options)?;
                if name == target_part {
                    zip_writer.write_all(&sheet_content)?;
                } else {
                    let mut buffer = Vec::new();
                    file.read_to_end(&mut buffer)?;
                    zip_writer.write_all(&buffer)?;
                }
            }
        }
        None => {
            let mut part_number = 1;
            while archive
                .by_name(&format!("xl/worksheets/sheet{}.xml", part_number))
                .is_ok()
            {
                part_number += 1;
            }
            let new_part = format!("xl/worksheets/sheet{}.xml", part_number);
            let rel_id = format!(
                "rId{}",
                relationships
                    .iter()
                    .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
                    .max()
                    .unwrap_or(0)
                    + 1
            );
            let sheet_id = sheets.iter().map(|entry| entry.sheet_id).max().unwrap_or(0) + 1;

            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                let name = file.name().to_string();
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;

                let content = match name.as_str() {
                    "xl/workbook.xml" => {
                        let mut sheet_el = BytesStart::new("sheet");
                        sheet_el.push_attribute(("name", sheet.name.as_str()));
                        sheet_el.push_attribute(("sheetId", sheet_id.to_string().as_str()));
                        sheet_el.push_attribute(("r:id", rel_id.as_str()));
                        insert_before_end(&buffer, b"sheets", sheet_el)?
                    }
                    "xl/_rels/workbook.xml.rels" => {
                        let mut rel_el = BytesStart::new("Relationship");
                        rel_el.push_attribute(("Id", rel_id.as_str()));
                        rel_el.push_attribute(("Type", WORKSHEET_REL_TYPE));
                        rel_el.push_attribute((
                            "Target",
                            format!("worksheets/sheet{}.xml", part_number).as_str(),
                        ));
                        insert_before_end(&buffer, b"Relationships", rel_el)?
                    }
                    "[Content_Types].xml" => {
                        let mut override_el = BytesStart::new("Override");
                        override_el
                            .push_attribute(("PartName", format!("/{}", new_part).as_str()));
                        override_el.push_attribute(("ContentType", WORKSHEET_CONTENT_TYPE));
                        insert_before_end(&buffer, b"Types", override_el)?
                    }
                    _ => buffer,
                };

                zip_writer.start_file(name.as_str(), options)?;
                zip_writer.write_all(&content)?;
            }

            zip_writer.start_file(new_part.as_str(), options)?;
            zip_writer.write_all(&sheet_content)?;
        }
    }

    zip_writer.finish()?;
    Ok(())
}

// Helper functions

#[derive(Debug)]
struct SheetEntry {
    name: String,
    sheet_id: u32,
    rel_id: String,
}

#[derive(Debug)]
struct Relationship {
    id: String,
    target: String,
}

fn read_file_from_zip(archive: &mut ZipArchive<BufReader<File>>, filename: &str) -> Result<String> {
    let mut file = archive
        .by_name(filename)
        .with_context(|| format!("Workbook package has no {}", filename))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Zip entry name of a relationship target relative to `xl/`
fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn parse_sheet_entries(workbook_xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let mut entry = SheetEntry {
                    name: String::new(),
                    sheet_id: 0,
                    rel_id: String::new(),
                };

                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"name" => entry.name = attr.unescape_value()?.into_owned(),
                        b"sheetId" => entry.sheet_id = attr.unescape_value()?.parse()?,
                        b"r:id" => entry.rel_id = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }

                sheets.push(entry);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(rels_xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => rel.id = attr.unescape_value()?.into_owned(),
                        b"Target" => rel.target = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Re-emit `xml`, adding `element` as the last child of the first `parent`
fn insert_before_end(xml: &[u8], parent: &[u8], element: BytesStart<'_>) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut inserted = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::End(e)) if !inserted && e.local_name().as_ref() == parent => {
                writer.write_event(Event::Empty(element.borrow()))?;
                writer.write_event(Event::End(e))?;
                inserted = true;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        }
        buf.clear();
    }

    if !inserted {
        anyhow::bail!(
            "Element <{}> not found in package part",
            String::from_utf8_lossy(parent)
        );
    }

    Ok(writer.into_inner().into_inner())
}

fn new_writer() -> Result<Writer<Cursor<Vec<u8>>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let mut types = BytesStart::new("Types");
    types.push_attribute(("xmlns", CONTENT_TYPES_NS));
    writer.write_event(Event::Start(types))?;

    for (extension, content_type) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
    ] {
        let mut default = BytesStart::new("Default");
        default.push_attribute(("Extension", extension));
        default.push_attribute(("ContentType", content_type));
        writer.write_event(Event::Empty(default))?;
    }

    let mut workbook = BytesStart::new("Override");
    workbook.push_attribute(("PartName", "/xl/workbook.xml"));
    workbook.push_attribute(("ContentType", WORKBOOK_CONTENT_TYPE));
    writer.write_event(Event::Empty(workbook))?;

    for i in 1..=sheet_count {
        let mut sheet = BytesStart::new("Override");
        sheet.push_attribute(("PartName", format!("/xl/worksheets/sheet{}.xml", i).as_str()));
        sheet.push_attribute(("ContentType", WORKSHEET_CONTENT_TYPE));
        writer.write_event(Event::Empty(sheet))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(writer.into_inner().into_inner())
}

fn root_rels_xml() -> Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", PACKAGE_REL_NS));
    writer.write_event(Event::Start(root))?;

    let mut rel = BytesStart::new("Relationship");
    rel.push_attribute(("Id", "rId1"));
    rel.push_attribute(("Type", OFFICE_DOCUMENT_REL_TYPE));
    rel.push_attribute(("Target", "xl/workbook.xml"));
    writer.write_event(Event::Empty(rel))?;

    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner().into_inner())
}

fn workbook_xml(sheets: &[SheetSpec]) -> Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let mut root = BytesStart::new("workbook");
    root.push_attribute(("xmlns", MAIN_NS));
    root.push_attribute(("xmlns:r", REL_NS));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;

    for (i, sheet) in sheets.iter().enumerate() {
        let id = (i + 1).to_string();
        let mut el = BytesStart::new("sheet");
        el.push_attribute(("name", sheet.name.as_str()));
        el.push_attribute(("sheetId", id.as_str()));
        el.push_attribute(("r:id", format!("rId{}", id).as_str()));
        writer.write_event(Event::Empty(el))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner().into_inner())
}

fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", PACKAGE_REL_NS));
    writer.write_event(Event::Start(root))?;

    for i in 1..=sheet_count {
        let mut rel = BytesStart::new("Relationship");
        rel.push_attribute(("Id", format!("rId{}", i).as_str()));
        rel.push_attribute(("Type", WORKSHEET_REL_TYPE));
        rel.push_attribute(("Target", format!("worksheets/sheet{}.xml", i).as_str()));
        writer.write_event(Event::Empty(rel))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner().into_inner())
}

/// Worksheet part with inline strings, so no shared string table is needed
fn worksheet_xml(sheet: &SheetSpec) -> Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", MAIN_NS));
    root.push_attribute(("xmlns:r", REL_NS));
    writer.write_event(Event::Start(root))?;

    if !sheet.column_widths.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("cols")))?;
        for (i, width) in sheet.column_widths.iter().enumerate() {
            let col = (i + 1).to_string();
            let mut el = BytesStart::new("col");
            el.push_attribute(("min", col.as_str()));
            el.push_attribute(("max", col.as_str()));
            el.push_attribute(("width", width.to_string().as_str()));
            el.push_attribute(("customWidth", "1"));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("cols")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (r, row) in sheet.rows.iter().enumerate() {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }

        let mut row_el = BytesStart::new("row");
        row_el.push_attribute(("r", (r + 1).to_string().as_str()));
        writer.write_event(Event::Start(row_el))?;
        for (c, value) in row.iter().enumerate() {
            let cell_ref = CellReference::new(r as u32, c as u32).to_excel_ref();
            write_cell(&mut writer, &cell_ref, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;

    if !sheet.merges.is_empty() {
        let mut merges = BytesStart::new("mergeCells");
        merges.push_attribute(("count", sheet.merges.len().to_string().as_str()));
        writer.write_event(Event::Start(merges))?;
        for range in &sheet.merges {
            let mut el = BytesStart::new("mergeCell");
            el.push_attribute(("ref", range.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("mergeCells")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_cell(writer: &mut Writer<Cursor<Vec<u8>>>, cell_ref: &str, value: &CellValue) -> Result<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", cell_ref));

    match value {
        CellValue::Empty => return Ok(()),
        CellValue::Number(n) if !n.is_finite() => return Ok(()),
        CellValue::Number(n) => {
            writer.write_event(Event::Start(cell))?;
            write_value(writer, &n.to_string())?;
        }
        CellValue::Boolean(b) => {
            cell.push_attribute(("t", "b"));
            writer.write_event(Event::Start(cell))?;
            write_value(writer, if *b { "1" } else { "0" })?;
        }
        CellValue::Error(e) => {
            cell.push_attribute(("t", "e"));
            writer.write_event(Event::Start(cell))?;
            write_value(writer, e)?;
        }
        CellValue::Text(s) => {
            cell.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(cell))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            if s.trim() != s {
                t.push_attribute(("xml:space", "preserve"));
            }
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(s)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_value(writer: &mut Writer<Cursor<Vec<u8>>>, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(sheet: &SheetSpec) -> String {
        String::from_utf8(worksheet_xml(sheet).unwrap()).unwrap()
    }

    #[test]
    fn test_worksheet_cells() {
        let sheet = SheetSpec::new(
            "Weightages",
            vec![
                vec!["OKR Weightages".into()],
                vec![],
                vec!["arr".into(), "A & B".into(), 25.0.into()],
            ],
        )
        .with_column_widths(&[18.0])
        .with_merge("A1:C1");

        let xml = render(&sheet);
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t>OKR Weightages</t></is></c>"#));
        assert!(!xml.contains(r#"<row r="2">"#));
        assert!(xml.contains(r#"<c r="B3" t="inlineStr"><is><t>A &amp; B</t></is></c>"#));
        assert!(xml.contains(r#"<c r="C3"><v>25</v></c>"#));
        assert!(xml.contains(r#"<col min="1" max="1" width="18" customWidth="1"/>"#));
        assert!(xml.contains(r#"<mergeCell ref="A1:C1"/>"#));
    }

    #[test]
    fn test_special_cells() {
        let sheet = SheetSpec::new(
            "S",
            vec![vec![
                CellValue::Boolean(true),
                CellValue::Error("#N/A".into()),
                CellValue::Number(f64::NAN),
                CellValue::Empty,
                CellValue::Number(-0.85),
            ]],
        );
        let xml = render(&sheet);
        assert!(xml.contains(r#"<c r="A1" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="B1" t="e"><v>#N/A</v></c>"#));
        assert!(!xml.contains(r#"r="C1""#));
        assert!(!xml.contains(r#"r="D1""#));
        assert!(xml.contains(r#"<c r="E1"><v>-0.85</v></c>"#));
    }

    #[test]
    fn test_part_name() {
        assert_eq!(part_name("worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(part_name("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_insert_before_end() {
        let xml = br#"<Types><Default Extension="xml"/></Types>"#;
        let mut el = BytesStart::new("Override");
        el.push_attribute(("PartName", "/xl/worksheets/sheet9.xml"));
        let out = String::from_utf8(insert_before_end(xml, b"Types", el).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<Types><Default Extension="xml"/><Override PartName="/xl/worksheets/sheet9.xml"/></Types>"#
        );

        let missing = insert_before_end(b"<a/>", b"Types", BytesStart::new("x"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_empty_workbook_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_workbook_xlsx(&dir.path().join("empty.xlsx"), &[]).is_err());
    }
}
