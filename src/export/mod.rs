//! Result serialization and packaging
//!
//! Consumers of a [`ScrapeResult`](crate::ScrapeResult) get three surfaces:
//! CSV with a fixed column order, an indented JSON array of records, and a
//! ZIP archive bundling every record's image. Image fetches reuse the
//! engine's pooled transport and the same bounded fan-out width as the
//! enricher.

use crate::extract::Record;
use crate::scrape::{ScrapeContext, ENRICH_CONCURRENCY};
use crate::transport::Transport;
use crate::Result;
use futures::stream::{self, StreamExt};
use std::io::{Cursor, Write};
use url::Url;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// CSV column order, fixed for consumer compatibility
const CSV_COLUMNS: &[&str] = &[
    "index",
    "tag",
    "text",
    "href",
    "attribute_value",
    "image_url",
    "html",
];

/// Longest sanitized basename kept in archive filenames
const MAX_BASENAME: usize = 120;

/// Serializes records to CSV with the fixed column order
pub fn to_csv(records: &[Record]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.write_record([
            record.index.to_string(),
            record.tag.clone(),
            record.text.clone(),
            record.href.clone().unwrap_or_default(),
            record.attribute_value.clone().unwrap_or_default(),
            record.image_url.clone().unwrap_or_default(),
            record.html.clone(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serializes records to an indented JSON array
pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Fetches every record's image and packages them into a ZIP archive
///
/// One fetch per record with a non-empty `image_url`, `ENRICH_CONCURRENCY`
/// wide. A failed fetch skips that entry; the archive still contains the
/// rest. Entries are written in record order with deterministic names:
/// zero-padded index, sanitized basename, inferred extension.
pub async fn bundle_images(
    transport: &Transport,
    records: &[Record],
    ctx: &ScrapeContext<'_>,
) -> Result<Vec<u8>> {
    let targets: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            record
                .image_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .map(|url| (index, url.to_string()))
        })
        .collect();

    let fetches = targets.into_iter().map(|(index, url)| async move {
        match transport.get_bytes(&url).await {
            Ok((bytes, content_type)) => Some((index, url, bytes, content_type)),
            Err(e) => {
                tracing::debug!("image fetch failed for {}: {}", url, e);
                None
            }
        }
    });
    let mut results = stream::iter(fetches).buffer_unordered(ENRICH_CONCURRENCY);

    let mut fetched = Vec::new();
    while let Some(result) = results.next().await {
        ctx.check_canceled()?;
        if let Some(entry) = result {
            fetched.push(entry);
        }
    }
    fetched.sort_by_key(|(index, ..)| *index);

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (index, url, bytes, content_type) in fetched {
        let name = archive_name(index, &url, content_type.as_deref());
        archive.start_file(name, options)?;
        archive.write_all(&bytes)?;
    }
    Ok(archive.finish()?.into_inner())
}

/// Builds the archive entry name for one image
///
/// `{index:04}_{sanitized basename}{extension}`, with the extension taken
/// from the URL path, else inferred from the content type, else `.jpg`.
fn archive_name(index: usize, url: &str, content_type: Option<&str>) -> String {
    let basename = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(|s| s.to_string()))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("image_{}", index));

    let (stem, extension) = match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (basename, extension_from_content_type(content_type)),
    };

    format!("{:04}_{}{}", index, sanitize(&stem), extension)
}

/// Picks an extension from a declared content type, defaulting to `.jpg`
fn extension_from_content_type(content_type: Option<&str>) -> String {
    let ct = content_type.unwrap_or_default();
    let extension = if ct.contains("png") {
        ".png"
    } else if ct.contains("webp") {
        ".webp"
    } else if ct.contains("gif") {
        ".gif"
    } else {
        ".jpg"
    };
    extension.to_string()
}

/// Replaces filesystem-hostile characters and caps the length
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASENAME)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize) -> Record {
        Record {
            index,
            tag: "a".to_string(),
            text: format!("item {}", index),
            href: Some(format!("https://a.test/items/{}", index)),
            attribute_value: None,
            image_url: Some(format!("https://a.test/img/{}.png", index)),
            detail_url: None,
            html: format!("<a>item {}</a>", index),
        }
    }

    #[test]
    fn test_csv_header_order() {
        let csv = to_csv(&[record(0)]).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, "index,tag,text,href,attribute_value,image_url,html");
    }

    #[test]
    fn test_csv_row_content() {
        let csv = to_csv(&[record(0), record(1)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,a,item 0,https://a.test/items/0"));
        assert!(lines[2].starts_with("1,a,item 1"));
    }

    #[test]
    fn test_csv_missing_fields_empty() {
        let mut r = record(0);
        r.href = None;
        r.image_url = None;
        let csv = to_csv(&[r]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",,"));
    }

    #[test]
    fn test_json_is_indented_array() {
        let json = to_json(&[record(0)]).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\n  "));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["index"], 0);
        assert_eq!(parsed[0]["text"], "item 0");
    }

    #[test]
    fn test_archive_name_from_path() {
        let name = archive_name(3, "https://a.test/img/photo.png", None);
        assert_eq!(name, "0003_photo.png");
    }

    #[test]
    fn test_archive_name_sanitized() {
        let name = archive_name(0, "https://a.test/img/we%20ird name!.jpg", None);
        assert!(name.starts_with("0000_"));
        assert!(name.ends_with(".jpg"));
        assert!(!name.contains(' '));
        assert!(!name.contains('!'));
    }

    #[test]
    fn test_archive_name_extension_from_content_type() {
        let name = archive_name(1, "https://a.test/img/raw", Some("image/webp"));
        assert_eq!(name, "0001_raw.webp");
    }

    #[test]
    fn test_archive_name_defaults_to_jpg() {
        let name = archive_name(2, "https://a.test/img/raw", None);
        assert_eq!(name, "0002_raw.jpg");
    }

    #[test]
    fn test_archive_name_empty_path() {
        let name = archive_name(7, "https://a.test/", Some("image/png"));
        assert_eq!(name, "0007_image_7.png");
    }

    #[test]
    fn test_sanitize_keeps_safe_chars() {
        assert_eq!(sanitize("photo_01.final-v2"), "photo_01.final-v2");
        assert_eq!(sanitize("a b/c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize(&long).len(), MAX_BASENAME);
    }
}
