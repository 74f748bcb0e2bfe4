//! Multi-format file parser

use crate::error::{Error, Result};
use crate::types::FileType;

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename);

        let parsed = match file_type {
            FileType::Txt | FileType::Markdown => Self::parse_text(filename, data, file_type),
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Unknown => {
                let ext = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or(filename);
                return Err(Error::UnsupportedFormat(ext.to_lowercase()));
            }
        }?;

        if parsed.content.trim().is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }
        Ok(parsed)
    }

    /// Plain text and Markdown are taken verbatim
    fn parse_text(filename: &str, data: &[u8], file_type: FileType) -> Result<ParsedDocument> {
        let content = match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(_) => {
                tracing::warn!(filename, "File is not valid UTF-8, replacing invalid bytes");
                String::from_utf8_lossy(data).into_owned()
            }
        };

        Ok(ParsedDocument {
            file_type,
            content,
            total_pages: None,
        })
    }

    /// PDF text, one `[Page N]` section per page with text
    #[cfg(feature = "pdf")]
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        let mut sections = Vec::new();
        for page in &page_numbers {
            match doc.extract_text(&[*page]) {
                Ok(text) => {
                    let text = cleanup_pdf_text(&text);
                    if !text.is_empty() {
                        sections.push(format!("[Page {}]\n{}", page, text));
                    }
                }
                Err(e) => {
                    tracing::debug!(filename, page, error = %e, "Could not extract page text")
                }
            }
        }

        // lopdf misses text in some font encodings; pdf-extract handles more of them
        if sections.is_empty() {
            tracing::warn!(filename, "Per-page extraction found no text, trying pdf-extract");
            let text = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::file_parse(filename, e.to_string()))?;
            let text = cleanup_pdf_text(&text);
            if !text.is_empty() {
                sections.push(format!("[Page 1]\n{}", text));
            }
        }

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content: sections.join("\n\n"),
            total_pages: Some(total_pages),
        })
    }

    #[cfg(not(feature = "pdf"))]
    fn parse_pdf(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFormat("pdf (built without the `pdf` feature)".to_string()))
    }

    /// DOCX body paragraphs, non-empty ones separated by blank lines
    #[cfg(feature = "docx")]
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            match child {
                                docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => text.push('\t'),
                                _ => {}
                            }
                        }
                    }
                }
                let text = text.trim();
                if !text.is_empty() {
                    paragraphs.push(text.to_string());
                }
            }
        }

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content: paragraphs.join("\n\n"),
            total_pages: None,
        })
    }

    #[cfg(not(feature = "docx"))]
    fn parse_docx(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFormat("docx (built without the `docx` feature)".to_string()))
    }
}

/// Strip NULs and blank lines, expand common ligatures
#[cfg(feature = "pdf")]
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text() {
        let parsed =
            FileParser::parse("policy.txt", b"Employees receive 15 vacation days per year.")
                .unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "Employees receive 15 vacation days per year.");
    }

    #[test]
    fn test_markdown_kept_verbatim() {
        let parsed = FileParser::parse("guide.md", b"# Title\n\n- item").unwrap();
        assert_eq!(parsed.file_type, FileType::Markdown);
        assert_eq!(parsed.content, "# Title\n\n- item");
    }

    #[test]
    fn test_unsupported_format() {
        let err = FileParser::parse("budget.xlsx", b"data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn test_empty_document() {
        let err = FileParser::parse("blank.txt", b"  \n\t ").unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(_)));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let parsed = FileParser::parse("latin.txt", &[b'c', b'a', b'f', 0xE9]).unwrap();
        assert!(parsed.content.starts_with("caf"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_corrupt_pdf() {
        let err = FileParser::parse("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_cleanup_pdf_text() {
        assert_eq!(cleanup_pdf_text("  of\u{FB01}ce \0\n\n  hours  "), "office\nhours");
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_docx_paragraphs() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Leave policy")))
            .add_paragraph(Paragraph::new())
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("15 days per year")))
            .build()
            .pack(&mut buf)
            .unwrap();

        let parsed = FileParser::parse("policy.docx", buf.get_ref()).unwrap();
        assert_eq!(parsed.content, "Leave policy\n\n15 days per year");
    }
}
