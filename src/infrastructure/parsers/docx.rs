//! DOCX document parser

use async_trait::async_trait;
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, DocumentSection, ParsedDocument, ParserInput, ParserType,
};
use crate::domain::RagError;

/// Parser for DOCX files. Paragraphs styled `Heading1..9` delimit sections;
/// tables are flattened to `cell | cell` lines.
#[derive(Debug, Clone, Default)]
pub struct DocxParser;

struct SectionBuilder {
    title: String,
    level: u8,
    parts: Vec<String>,
}

impl DocxParser {
    /// Create a new DOCX parser
    pub fn new() -> Self {
        Self
    }

    fn paragraph_text(paragraph: &Paragraph) -> String {
        let mut text = String::new();

        for child in &paragraph.children {
            match child {
                ParagraphChild::Run(run) => {
                    for run_child in &run.children {
                        match run_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                ParagraphChild::Hyperlink(link) => {
                    for link_child in &link.children {
                        if let ParagraphChild::Run(run) = link_child {
                            for run_child in &run.children {
                                if let RunChild::Text(t) = run_child {
                                    text.push_str(&t.text);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        text
    }

    fn heading_level(paragraph: &Paragraph) -> Option<u8> {
        let style = paragraph.property.style.as_ref()?;
        let val = style.val.to_lowercase();
        let rest = val.strip_prefix("heading")?;

        Some(rest.trim().parse::<u8>().unwrap_or(1).clamp(1, 9))
    }

    fn table_text(table: &Table) -> String {
        let mut lines = Vec::new();

        for row in &table.rows {
            #[allow(irrefutable_let_patterns)]
            let TableChild::TableRow(row) = row
            else {
                continue;
            };

            let mut cells = Vec::new();

            for cell in &row.cells {
                #[allow(irrefutable_let_patterns)]
                let TableRowChild::TableCell(cell) = cell
                else {
                    continue;
                };

                let mut cell_text = String::new();

                for content in &cell.children {
                    if let TableCellContent::Paragraph(paragraph) = content {
                        let text = Self::paragraph_text(paragraph);
                        if !text.trim().is_empty() {
                            if !cell_text.is_empty() {
                                cell_text.push(' ');
                            }
                            cell_text.push_str(text.trim());
                        }
                    }
                }

                if !cell_text.is_empty() {
                    cells.push(cell_text);
                }
            }

            if !cells.is_empty() {
                lines.push(cells.join(" | "));
            }
        }

        lines.join("\n")
    }

    fn finish_section(builder: SectionBuilder, sections: &mut Vec<DocumentSection>) {
        if !builder.parts.is_empty() {
            sections.push(DocumentSection::titled(
                builder.title,
                builder.level,
                builder.parts.join("\n\n"),
            ));
        }
    }
}

#[async_trait]
impl DocumentParser for DocxParser {
    fn parser_type(&self) -> ParserType {
        ParserType::Docx
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &[
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/msword",
        ]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let bytes = input.content.as_bytes();

        let docx = read_docx(&bytes)
            .map_err(|e| RagError::malformed_input(format!("Failed to load DOCX: {:?}", e)))?;

        let mut full_text = Vec::new();
        let mut sections = Vec::new();
        let mut current: Option<SectionBuilder> = None;

        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => {
                    let text = Self::paragraph_text(paragraph).trim().to_string();
                    if text.is_empty() {
                        continue;
                    }

                    if let Some(level) = Self::heading_level(paragraph) {
                        if let Some(builder) = current.take() {
                            Self::finish_section(builder, &mut sections);
                        }

                        current = Some(SectionBuilder {
                            title: text,
                            level,
                            parts: Vec::new(),
                        });
                    } else {
                        full_text.push(text.clone());
                        if let Some(ref mut builder) = current {
                            builder.parts.push(text);
                        }
                    }
                }
                DocumentChild::Table(table) => {
                    let text = Self::table_text(table);
                    if !text.is_empty() {
                        full_text.push(text.clone());
                        if let Some(ref mut builder) = current {
                            builder.parts.push(text);
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(builder) = current.take() {
            Self::finish_section(builder, &mut sections);
        }

        let mut metadata = DocumentMetadata::new()
            .with_mime_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            )
            .with_custom("sections_count", serde_json::json!(sections.len()));

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(
            ParsedDocument::new(full_text.join("\n\n"), metadata, ParserType::Docx)
                .with_sections(sections),
        )
    }
}
