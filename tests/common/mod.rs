//! Synthesized .docx fixtures shared by the integration tests
#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="TOC1"><w:name w:val="toc 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="TOC2"><w:name w:val="toc 2"/></w:style>
</w:styles>"#;

/// A .docx written to a temporary directory that lives as long as the fixture
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

pub fn write_docx(body: &str, styles: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("RAN1_116_report.docx");

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    if let Some(styles) = styles {
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(styles.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    Fixture { _dir: dir, path }
}

pub fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

pub fn para(text: &str) -> String {
    format!("<w:p>{}</w:p>", run(text))
}

pub fn heading(level: u8, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:bookmarkStart w:id="0" w:name="_Ref{level}"/>{}</w:p>"#,
        run(text)
    )
}

/// A generated TOC line: number, tab, title, tab, page, inside a hyperlink
pub fn toc_line(depth: u8, number: Option<&str>, title: &str, page: u32) -> String {
    let number = number
        .map(|number| format!("{}<w:r><w:tab/></w:r>", run(number)))
        .unwrap_or_default();
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="TOC{depth}"/></w:pPr><w:hyperlink w:anchor="_Toc{page}">{number}{}<w:r><w:tab/></w:r>{}</w:hyperlink></w:p>"#,
        run(title),
        run(&page.to_string())
    )
}

/// Word wraps generated TOCs in a content control
pub fn toc(lines: &[String]) -> String {
    format!("<w:sdt><w:sdtContent>{}</w:sdtContent></w:sdt>", lines.concat())
}

pub fn math(text: &str) -> String {
    format!("<m:oMath><m:r><m:t>{text}</m:t></m:r></m:oMath>")
}
