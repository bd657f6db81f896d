//! Helpers for untrusted filenames and for data entering tracing spans.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the
/// server's directory layout.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Longest accepted upload name in bytes. Leaves room under the usual
/// 255 byte file system limit for a conflict number and the output prefix.
pub const MAX_FILENAME_BYTES: usize = 200;

/// Reduces a client-supplied filename to a bare file name that is safe to
/// join onto a job directory.
///
/// Both `/` and `\` are treated as separators so Windows-style uploads are
/// stripped too. Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// True when `name` can be used as-is inside a job directory.
pub fn is_plain_filename(name: &str) -> bool {
    sanitize_filename(name).as_deref() == Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/srv/uploads/1234/invoice.pdf")),
            "invoice.pdf"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(
            sanitize_filename("../../etc/passwd.pdf").as_deref(),
            Some("passwd.pdf")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\report.docx").as_deref(),
            Some("report.docx")
        );
    }

    #[test]
    fn test_sanitize_rejects_empty_and_dots() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("   "), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("."), None);
    }

    #[test]
    fn test_sanitize_drops_control_characters() {
        assert_eq!(
            sanitize_filename("rep\u{0}ort.pdf").as_deref(),
            Some("report.pdf")
        );
    }

    #[test]
    fn test_is_plain_filename() {
        assert!(is_plain_filename("processed_a.docx"));
        assert!(!is_plain_filename("../processed_a.docx"));
        assert!(!is_plain_filename("sub/processed_a.docx"));
        assert!(!is_plain_filename(".."));
    }
}
