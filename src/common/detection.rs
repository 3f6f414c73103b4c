//! File format detection utilities.
//!
//! Detection is a priority-ordered trial sequence over container sniffers,
//! not a single signature check: ZIP-based formats are probed first (ODF by
//! mimetype, then OOXML by package structure), then CFB-based formats by
//! required-stream presence.

/// Magic number of a ZIP local file header.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Magic number of a Compound File Binary header.
pub const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Concrete document variants this library can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// OpenDocument Text (.odt)
    OdfText,
    /// OpenDocument Spreadsheet (.ods)
    OdfSpreadsheet,
    /// OpenDocument Presentation (.odp)
    OdfPresentation,
    /// Office Open XML package (.docx, .xlsx, .pptx), plain or decrypted
    OfficeOpenXml,
    /// Legacy Word document (.doc)
    LegacyWordDocument,
    /// Legacy PowerPoint presentation (.ppt)
    LegacyPowerpointPresentation,
    /// Legacy Excel worksheets (.xls)
    LegacyExcelWorksheets,
    /// A Compound File Binary container with no recognized payload
    CompoundFileBinary,
    /// Nothing recognized the bytes
    Unknown,
}

impl FileType {
    /// Legacy binary variants support detection only.
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            FileType::LegacyWordDocument
                | FileType::LegacyPowerpointPresentation
                | FileType::LegacyExcelWorksheets
        )
    }

    pub fn is_odf(&self) -> bool {
        matches!(
            self,
            FileType::OdfText | FileType::OdfSpreadsheet | FileType::OdfPresentation
        )
    }
}

/// Per-sheet metadata reported for spreadsheet documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub name: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// Detection result for an opened file.
///
/// Re-derived after a successful decryption, at which point `encrypted`
/// flips to false and `entries` becomes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub file_type: FileType,
    pub encrypted: bool,
    pub entries: Vec<EntryMeta>,
}

/// Classify an ODF package by the content of its `mimetype` entry.
pub fn detect_odf_type(mimetype: &str) -> Option<FileType> {
    match mimetype.trim() {
        "application/vnd.oasis.opendocument.text" => Some(FileType::OdfText),
        "application/vnd.oasis.opendocument.spreadsheet" => Some(FileType::OdfSpreadsheet),
        "application/vnd.oasis.opendocument.presentation" => Some(FileType::OdfPresentation),
        _ => None,
    }
}

/// Cheap signature check for the ZIP sniffer.
pub fn has_zip_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == ZIP_SIGNATURE
}

/// Cheap signature check for the CFB sniffer.
pub fn has_cfb_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 8 && bytes[0..8] == CFB_SIGNATURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odf_mimetypes() {
        assert_eq!(
            detect_odf_type("application/vnd.oasis.opendocument.text"),
            Some(FileType::OdfText)
        );
        assert_eq!(
            detect_odf_type("application/vnd.oasis.opendocument.spreadsheet\n"),
            Some(FileType::OdfSpreadsheet)
        );
        assert_eq!(detect_odf_type("application/zip"), None);
    }

    #[test]
    fn test_signatures() {
        assert!(has_zip_signature(b"PK\x03\x04rest"));
        assert!(!has_zip_signature(b"PK"));
        assert!(has_cfb_signature(&[
            0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00
        ]));
        assert!(!has_cfb_signature(b"PK\x03\x04xxxx"));
    }

    #[test]
    fn test_legacy_classification() {
        assert!(FileType::LegacyWordDocument.is_legacy());
        assert!(!FileType::OfficeOpenXml.is_legacy());
        assert!(FileType::OdfSpreadsheet.is_odf());
        assert!(!FileType::CompoundFileBinary.is_odf());
    }
}
