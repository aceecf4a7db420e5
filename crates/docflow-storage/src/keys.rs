//! Storage key generation, shared by all backends.

/// Storage keys are scoped by processing id: `uploads/{processing_id}/{filename}`.
pub(crate) fn document_key(processing_id: &str, filename: &str) -> String {
    format!("uploads/{}/{}", processing_id, filename)
}

/// Keys are rejected if they could escape the storage root.
pub(crate) fn is_valid_key(storage_key: &str) -> bool {
    !storage_key.is_empty() && !storage_key.contains("..") && !storage_key.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_layout() {
        assert_eq!(
            document_key("doc_1700000000000_abcdefghi", "report.pdf"),
            "uploads/doc_1700000000000_abcdefghi/report.pdf"
        );
    }

    #[test]
    fn test_traversal_keys_rejected() {
        assert!(is_valid_key("uploads/doc_1_abcdefghi/report.pdf"));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("uploads/../../etc/passwd"));
        assert!(!is_valid_key("/etc/passwd"));
        assert!(!is_valid_key(""));
    }
}
