//! Document, record, and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Supported content types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Comma-separated values
    Csv,
    /// Spreadsheet workbook (.xlsx, .xls, .ods)
    Spreadsheet,
    /// PDF document
    Pdf,
    /// Plain text (also .md, .log)
    Text,
}

impl ContentType {
    /// Detect content type from a filename extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" | "markdown" | "log" => Some(Self::Text),
            _ => None,
        }
    }

    /// Detect content type from a declared MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_lowercase();
        match mime.as_str() {
            "text/csv" => Some(Self::Csv),
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Spreadsheet),
            _ if mime.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }

    /// Resolve a content type from the filename, falling back to the
    /// MIME type declared by the uploader.
    pub fn resolve(filename: &str, declared_mime: Option<&str>) -> crate::error::Result<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("");
        if let Some(ct) = Self::from_extension(ext) {
            return Ok(ct);
        }
        if let Some(ct) = declared_mime.and_then(Self::from_mime) {
            return Ok(ct);
        }
        Err(crate::error::Error::UnsupportedContentType(format!(
            "{} ({})",
            filename,
            declared_mime.unwrap_or("no declared type")
        )))
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Csv => "CSV",
            Self::Spreadsheet => "Spreadsheet",
            Self::Pdf => "PDF",
            Self::Text => "Text",
        }
    }
}

/// An uploaded document tracked by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded
    pub filename: String,
    /// Content type
    pub content_type: ContentType,
    /// Content hash of the raw bytes
    pub content_hash: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Number of chunks indexed for this document
    pub total_chunks: u32,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(
        filename: String,
        content_type: ContentType,
        content_hash: String,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            content_type,
            content_hash,
            size_bytes,
            total_chunks: 0,
            uploaded_at: chrono::Utc::now(),
        }
    }
}

/// Hash raw file bytes for the document registry
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Position of a single extracted record within its source file.
/// Records are consumed within the ingestion pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPosition {
    /// Table row (0-based, header excluded); sheet name for workbooks
    Row { sheet: Option<String>, index: u32 },
    /// PDF page (1-based)
    Page(u32),
    /// Starting line of a text window (1-based)
    Line(u32),
    /// The whole file
    Whole,
}

impl RecordPosition {
    /// Whether two positions belong to the same locator family.
    /// Chunks only merge positions within one family, so a locator
    /// range never mixes sheets or kinds.
    pub fn same_family(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Row { sheet: a, .. }, Self::Row { sheet: b, .. }) => a == b,
            (Self::Page(_), Self::Page(_)) => true,
            (Self::Line(_), Self::Line(_)) => true,
            (Self::Whole, Self::Whole) => true,
            _ => false,
        }
    }
}

/// One atomic unit of extracted text, consumed by the chunker.
/// Never persisted.
#[derive(Debug, Clone)]
pub struct Record {
    /// Where the text came from
    pub position: RecordPosition,
    /// Normalized text
    pub text: String,
}

impl Record {
    /// Create a new record
    pub fn new(position: RecordPosition, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

/// Source range covered by a chunk, used for citations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Row range, optionally scoped to a sheet
    Rows {
        sheet: Option<String>,
        start: u32,
        end: u32,
    },
    /// Page range
    Pages { start: u32, end: u32 },
    /// Line range (starting lines of the first and last window)
    Lines { start: u32, end: u32 },
    /// The whole file
    Whole,
}

impl Locator {
    /// Build a locator spanning the first and last record positions of a
    /// chunk. The chunker guarantees both belong to the same family; a
    /// mismatch falls back to the first position alone.
    pub fn from_positions(first: &RecordPosition, last: &RecordPosition) -> Self {
        match (first, last) {
            (
                RecordPosition::Row { sheet, index: a },
                RecordPosition::Row { sheet: sheet_b, index: b },
            ) if sheet == sheet_b => Self::Rows {
                sheet: sheet.clone(),
                start: *a.min(b),
                end: *a.max(b),
            },
            (RecordPosition::Page(a), RecordPosition::Page(b)) => Self::Pages {
                start: *a.min(b),
                end: *a.max(b),
            },
            (RecordPosition::Line(a), RecordPosition::Line(b)) => Self::Lines {
                start: *a.min(b),
                end: *a.max(b),
            },
            (RecordPosition::Whole, _) | (_, RecordPosition::Whole) => Self::Whole,
            (first, _) => Self::from_positions(first, first),
        }
    }

    /// Human-readable label, e.g. "rows 0-2" or "page 3"
    pub fn label(&self) -> String {
        match self {
            Self::Rows { sheet, start, end } => {
                let rows = if start == end {
                    format!("row {}", start)
                } else {
                    format!("rows {}-{}", start, end)
                };
                match sheet {
                    Some(name) => format!("sheet {}, {}", name, rows),
                    None => rows,
                }
            }
            Self::Pages { start, end } => {
                if start == end {
                    format!("page {}", start)
                } else {
                    format!("pages {}-{}", start, end)
                }
            }
            Self::Lines { start, end } => {
                if start == end {
                    format!("line {}", start)
                } else {
                    format!("lines {}-{}", start, end)
                }
            }
            Self::Whole => "full text".to_string(),
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Original filename as uploaded
    pub filename: String,
    /// Content type
    pub content_type: ContentType,
    /// Range of the source the chunk covers
    pub locator: Locator,
}

impl ChunkSource {
    /// Format source for display
    pub fn format_citation(&self) -> String {
        match self.locator {
            Locator::Whole => self.filename.clone(),
            _ => format!("{}, {}", self.filename, self.locator.label()),
        }
    }
}

/// A bounded span of text assembled from one or more adjacent records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic chunk ID derived from (document id, chunk index)
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content, including the overlap carried from the previous chunk
    pub text: String,
    /// Embedding vector, filled in by the indexer
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Byte range of the chunk's own (non-overlap) content within the
    /// document's joined extracted text
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within the document
    pub chunk_index: u32,
}

impl Chunk {
    /// Deterministic chunk id: a pure function of (document id, index),
    /// so re-chunking an unchanged document reproduces identical ids.
    pub fn id_for(document_id: &Uuid, index: u32) -> Uuid {
        Uuid::new_v5(document_id, &index.to_be_bytes())
    }

    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        text: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Self::id_for(&document_id, chunk_index),
            document_id,
            text,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}
