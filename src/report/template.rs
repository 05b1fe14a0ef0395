use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::util::ensure_directory;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="52"/></w:rPr></w:style></w:styles>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;
const DOCUMENT_CLOSE: &str = "<w:sectPr/></w:body></w:document>";

#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    data: Vec<u8>,
}

struct Patterns {
    paragraph: Regex,
    text_node: Regex,
    placeholder: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            paragraph: Regex::new(r"(?s)<w:p(?:\s[^>]*[^/])?>.*?</w:p>")
                .context("failed to compile paragraph regex")?,
            text_node: Regex::new(r"(?s)<w:t(?:\s[^>]*[^/])?>(.*?)</w:t>")
                .context("failed to compile text node regex")?,
            placeholder: Regex::new(r"\{\{([^{}]+)\}\}")
                .context("failed to compile placeholder regex")?,
        })
    }
}

pub struct TemplateDocument {
    entries: Vec<ArchiveEntry>,
    document_index: usize,
    body: String,
    patterns: Patterns,
}

impl TemplateDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open template {}", path.display()))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("template is not a docx archive: {}", path.display()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .with_context(|| format!("failed to read entry {index} of {}", path.display()))?;
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("failed to read {} in {}", entry.name(), path.display()))?;
            entries.push(ArchiveEntry {
                name: entry.name().to_string(),
                data,
            });
        }

        Self::from_entries(entries)
            .with_context(|| format!("invalid docx template {}", path.display()))
    }

    pub fn fallback(title: &str, lines: &[String]) -> Result<Self> {
        let mut body = String::from(DOCUMENT_OPEN);
        body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(title)
        ));
        for line in lines {
            body.push_str(&format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                escape_xml(line)
            ));
        }
        body.push_str(DOCUMENT_CLOSE);

        Self::from_entries(vec![
            ArchiveEntry {
                name: "[Content_Types].xml".to_string(),
                data: CONTENT_TYPES_XML.as_bytes().to_vec(),
            },
            ArchiveEntry {
                name: "_rels/.rels".to_string(),
                data: PACKAGE_RELS_XML.as_bytes().to_vec(),
            },
            ArchiveEntry {
                name: "word/_rels/document.xml.rels".to_string(),
                data: DOCUMENT_RELS_XML.as_bytes().to_vec(),
            },
            ArchiveEntry {
                name: STYLES_PART.to_string(),
                data: STYLES_XML.as_bytes().to_vec(),
            },
            ArchiveEntry {
                name: DOCUMENT_PART.to_string(),
                data: body.into_bytes(),
            },
        ])
    }

    fn from_entries(entries: Vec<ArchiveEntry>) -> Result<Self> {
        let Some(document_index) = entries.iter().position(|entry| entry.name == DOCUMENT_PART)
        else {
            bail!("archive has no {DOCUMENT_PART}");
        };
        let body = String::from_utf8(entries[document_index].data.clone())
            .context("main document part is not valid UTF-8")?;

        Ok(Self {
            entries,
            document_index,
            body,
            patterns: Patterns::new()?,
        })
    }

    pub fn apply(&mut self, substitutions: &Substitutions) -> usize {
        let patterns = &self.patterns;
        let mut changed = 0usize;

        let body = patterns
            .paragraph
            .replace_all(&self.body, |paragraph: &Captures| {
                let xml = &paragraph[0];
                match fill_paragraph(patterns, xml, substitutions) {
                    Some(filled) => {
                        changed += 1;
                        filled
                    }
                    None => xml.to_string(),
                }
            })
            .into_owned();

        self.body = body;
        debug!(paragraphs = changed, "filled template placeholders");
        changed
    }

    pub fn paragraph_texts(&self) -> Vec<String> {
        self.patterns
            .paragraph
            .find_iter(&self.body)
            .map(|paragraph| paragraph_text(&self.patterns, paragraph.as_str()))
            .collect()
    }

    pub fn unresolved_placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        for text in self.paragraph_texts() {
            for captures in self.patterns.placeholder.captures_iter(&text) {
                let name = captures[1].trim().to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.name.ends_with('/') {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .with_context(|| format!("failed to add {} to {}", entry.name, path.display()))?;
                continue;
            }

            writer
                .start_file(entry.name.as_str(), options)
                .with_context(|| format!("failed to add {} to {}", entry.name, path.display()))?;
            let data = if index == self.document_index {
                self.body.as_bytes()
            } else {
                entry.data.as_slice()
            };
            writer
                .write_all(data)
                .with_context(|| format!("failed to write {} to {}", entry.name, path.display()))?;
        }

        writer
            .finish()
            .with_context(|| format!("failed to finalize {}", path.display()))?;
        Ok(())
    }
}

fn paragraph_text(patterns: &Patterns, paragraph: &str) -> String {
    patterns
        .text_node
        .captures_iter(paragraph)
        .map(|captures| unescape_xml(&captures[1]))
        .collect()
}

fn fill_paragraph(patterns: &Patterns, paragraph: &str, substitutions: &Substitutions) -> Option<String> {
    let text = paragraph_text(patterns, paragraph);
    if !text.contains("{{") {
        return None;
    }

    let filled = patterns
        .placeholder
        .replace_all(&text, |captures: &Captures| {
            substitutions
                .get(captures[1].trim())
                .map(str::to_string)
                .unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned();
    if filled == text {
        return None;
    }

    let mut first = true;
    let rebuilt = patterns
        .text_node
        .replace_all(paragraph, |_: &Captures| {
            if first {
                first = false;
                text_node(&filled)
            } else {
                "<w:t></w:t>".to_string()
            }
        })
        .into_owned();
    Some(rebuilt)
}

fn text_node(text: &str) -> String {
    text.split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape_xml(line)))
        .collect::<Vec<String>>()
        .join("<w:br/>")
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\r' => {}
            character => escaped.push(character),
        }
    }
    escaped
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
