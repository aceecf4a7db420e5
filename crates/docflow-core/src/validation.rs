//! Upload input validation: filename sanitization and content-type checks.

use regex::Regex;
use std::sync::OnceLock;

use crate::AppError;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("valid regex"))
}

fn collapsed_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid regex"))
}

/// Sanitize an original filename into something safe for storage keys and
/// URLs: special characters become underscores, runs of underscores collapse,
/// and the extension is preserved.
pub fn sanitize_filename(filename: &str) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    let mut safe = unsafe_chars().replace_all(stem, "_").to_string();
    safe = collapsed_underscores().replace_all(&safe, "_").to_string();
    let safe = safe.trim_matches('_');

    let stem = if safe.is_empty() { "file" } else { safe };
    match ext {
        Some(ext) => format!("{}.{}", stem, ext.to_lowercase()),
        None => stem.to_string(),
    }
}

/// Validate a filename's extension against the configured allowlist. An
/// empty allowlist disables the check.
pub fn validate_extension(file_name: &str, allowed: &[String]) -> Result<(), AppError> {
    if allowed.is_empty() {
        return Ok(());
    }

    let ext = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => {
            return Err(AppError::InvalidInput(format!(
                "File '{}' has no extension",
                file_name
            )))
        }
    };

    if allowed.iter().any(|a| a == &ext) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Unsupported file extension: .{}",
            ext
        )))
    }
}

/// Validate an upload's content type against the configured allowlist.
pub fn validate_content_type(content_type: &str, allowed: &[String]) -> Result<(), AppError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase();

    if allowed.iter().any(|a| a == &normalized) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Unsupported file format: {}",
            content_type
        )))
    }
}

/// Validate an upload's size against the configured limit.
pub fn validate_file_size(size: usize, max_bytes: usize) -> Result<(), AppError> {
    if size > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            size, max_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_preserves_extension() {
        assert_eq!(sanitize_filename("Quarterly Report (v2).pdf"), "Quarterly_Report_v2.pdf");
        assert_eq!(sanitize_filename("data.XLSX"), "data.xlsx");
    }

    #[test]
    fn test_sanitize_collapses_and_trims_underscores() {
        assert_eq!(sanitize_filename("__a///b__.txt"), "a_b.txt");
        assert_eq!(sanitize_filename("???"), "file");
    }

    #[test]
    fn test_sanitize_no_extension() {
        assert_eq!(sanitize_filename("README"), "README");
    }

    #[test]
    fn test_extension_allowlist() {
        let allowed = vec!["pdf".to_string(), "docx".to_string()];
        assert!(validate_extension("report.pdf", &allowed).is_ok());
        assert!(validate_extension("report.PDF", &allowed).is_ok());
        assert!(validate_extension("payload.exe", &allowed).is_err());
        assert!(validate_extension("README", &allowed).is_err());
        assert!(validate_extension(".env", &allowed).is_err());
    }

    #[test]
    fn test_empty_extension_allowlist_admits_everything() {
        assert!(validate_extension("anything.xyz", &[]).is_ok());
        assert!(validate_extension("README", &[]).is_ok());
    }

    #[test]
    fn test_content_type_allowlist() {
        let allowed = vec!["application/pdf".to_string(), "text/plain".to_string()];
        assert!(validate_content_type("application/pdf", &allowed).is_ok());
        assert!(validate_content_type("text/plain; charset=utf-8", &allowed).is_ok());
        assert!(validate_content_type("application/zip", &allowed).is_err());
    }

    #[test]
    fn test_file_size_limit() {
        assert!(validate_file_size(10, 100).is_ok());
        assert!(validate_file_size(101, 100).is_err());
    }
}
