use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::canvas_models::ExportedFile;

const TEXT_EXTENSIONS: [&str; 3] = [".txt", ".html", ".htm"];

/// Pulls the readable text files out of a course export archive.
///
/// Only `.txt`, `.html` and `.htm` entries are read; anything else (PDFs,
/// Office documents, images) is skipped, as are entries that are not valid
/// UTF-8.
pub fn extract_text_files(zip_bytes: &[u8]) -> Result<Vec<ExportedFile>, zip::result::ZipError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))?;
    let mut files = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let lower = name.to_lowercase();
        if !TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            tracing::debug!(file = %name, "Skipping non-text export entry");
            continue;
        }

        let mut content = String::new();
        if let Err(e) = entry.read_to_string(&mut content) {
            tracing::warn!(file = %name, error = %e, "Failed to read export entry");
            continue;
        }

        files.push(ExportedFile {
            filename: name,
            content: content.trim().to_string(),
            file_type: "text".to_string(),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in entries {
            zip.start_file(*name, opts).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_only_text_entries_are_extracted() {
        let bytes = build_zip(&[
            ("syllabus.html", b"  <h1>Syllabus</h1>\n"),
            ("notes/README.TXT", b"read me"),
            ("slides.pdf", b"%PDF-1.4"),
            ("essay.docx", b"PK"),
        ]);

        let files = extract_text_files(&bytes).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "syllabus.html");
        assert_eq!(files[0].content, "<h1>Syllabus</h1>");
        assert_eq!(files[1].filename, "notes/README.TXT");
        assert!(files.iter().all(|f| f.file_type == "text"));
    }

    #[test]
    fn test_invalid_utf8_entry_is_skipped() {
        let bytes = build_zip(&[("bad.txt", &[0xff, 0xfe, 0x00]), ("good.htm", b"ok")]);

        let files = extract_text_files(&bytes).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "good.htm");
    }

    #[test]
    fn test_not_a_zip() {
        assert!(extract_text_files(b"definitely not a zip").is_err());
    }
}
