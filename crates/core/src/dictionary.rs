//! Dictionary-level constants, the bulk-import row shape, structural row
//! validation, and the per-dictionary advisory-lock key derivation.
//!
//! Row validation here is deliberately thin: upstream parsing and column
//! mapping already happened, so this only enforces the structural rules
//! the import executor assumes (non-empty code and default name, in-file
//! uniqueness, length limits).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The fixed set of localized-name suffixes a dictionary item carries.
pub const LOCALES: &[&str] = &["en", "ru", "uz"];

/// Maximum number of rows accepted in a single import upload.
pub const MAX_IMPORT_ROWS: usize = 10_000;

/// Maximum length of a dictionary code or item code.
pub const MAX_CODE_LEN: usize = 64;

/// Maximum length of a display name.
pub const MAX_NAME_LEN: usize = 255;

/// Namespace constant for per-dictionary advisory lock keys.
/// Mixed with a hash of the dictionary code so unrelated dictionaries
/// never contend for the same lock.
pub const DICTIONARY_LOCK_NAMESPACE: i64 = 731_405_962;

// ---------------------------------------------------------------------------
// Import row
// ---------------------------------------------------------------------------

/// One already-parsed row of a bulk-import upload.
///
/// Produced by the upstream row validator; optional fields that are absent
/// mean "keep the existing value" on update and "use the default" on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub code: String,
    pub name: String,
    pub name_en: Option<String>,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub symbol: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a dictionary code is non-empty and within length limits.
pub fn validate_dictionary_code(code: &str) -> Result<(), CoreError> {
    if code.trim().is_empty() {
        return Err(CoreError::Validation(
            "Dictionary code must not be empty".to_string(),
        ));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(CoreError::Validation(format!(
            "Dictionary code exceeds maximum length of {MAX_CODE_LEN} characters"
        )));
    }
    Ok(())
}

/// Structural validation of an import upload.
///
/// Enforces: non-empty upload, row-count limit, non-empty `code` and `name`
/// per row, length limits, and in-upload code uniqueness (two rows with the
/// same code would make journal replay order ambiguous).
pub fn validate_rows(rows: &[ImportRow]) -> Result<(), CoreError> {
    if rows.is_empty() {
        return Err(CoreError::Validation(
            "Import contains no rows".to_string(),
        ));
    }
    if rows.len() > MAX_IMPORT_ROWS {
        return Err(CoreError::Validation(format!(
            "Import exceeds maximum of {MAX_IMPORT_ROWS} rows"
        )));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        if row.code.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Row {row_no}: code must not be empty"
            )));
        }
        if row.code.len() > MAX_CODE_LEN {
            return Err(CoreError::Validation(format!(
                "Row {row_no}: code exceeds maximum length of {MAX_CODE_LEN} characters"
            )));
        }
        if row.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Row {row_no}: name must not be empty"
            )));
        }
        if row.name.len() > MAX_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Row {row_no}: name exceeds maximum length of {MAX_NAME_LEN} characters"
            )));
        }
        if !seen.insert(row.code.as_str()) {
            return Err(CoreError::Validation(format!(
                "Row {row_no}: duplicate code '{}' within upload",
                row.code
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Advisory lock key
// ---------------------------------------------------------------------------

/// Derive the stable advisory-lock key for a dictionary.
///
/// FNV-1a 64-bit over the code bytes, folded into the namespace constant.
/// All mutating operations (import, undo, redo) on the same dictionary
/// serialize on this key; different dictionaries get independent keys.
pub fn dictionary_lock_key(dictionary_code: &str) -> i64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in dictionary_code.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    DICTIONARY_LOCK_NAMESPACE ^ (hash as i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, name: &str) -> ImportRow {
        ImportRow {
            code: code.to_string(),
            name: name.to_string(),
            name_en: None,
            name_ru: None,
            name_uz: None,
            icon: None,
            color: None,
            symbol: None,
            sort_order: None,
            is_active: None,
        }
    }

    // -- validate_dictionary_code ---------------------------------------------

    #[test]
    fn valid_dictionary_code() {
        assert!(validate_dictionary_code("machine_types").is_ok());
    }

    #[test]
    fn empty_dictionary_code_rejected() {
        assert!(validate_dictionary_code("").is_err());
        assert!(validate_dictionary_code("   ").is_err());
    }

    #[test]
    fn long_dictionary_code_rejected() {
        let long = "x".repeat(MAX_CODE_LEN + 1);
        assert!(validate_dictionary_code(&long).is_err());
    }

    // -- validate_rows --------------------------------------------------------

    #[test]
    fn valid_rows_accepted() {
        let rows = vec![row("A", "Alpha"), row("B", "Beta")];
        assert!(validate_rows(&rows).is_ok());
    }

    #[test]
    fn empty_upload_rejected() {
        assert!(validate_rows(&[]).is_err());
    }

    #[test]
    fn too_many_rows_rejected() {
        let rows: Vec<ImportRow> = (0..MAX_IMPORT_ROWS + 1)
            .map(|i| row(&format!("C{i}"), "Name"))
            .collect();
        assert!(validate_rows(&rows).is_err());
    }

    #[test]
    fn empty_code_rejected_with_row_number() {
        let rows = vec![row("A", "Alpha"), row("", "Beta")];
        let msg = validate_rows(&rows).unwrap_err().to_string();
        assert!(msg.contains("Row 2"));
    }

    #[test]
    fn empty_name_rejected() {
        let rows = vec![row("A", "")];
        assert!(validate_rows(&rows).is_err());
    }

    #[test]
    fn whitespace_only_name_rejected() {
        let rows = vec![row("A", "   ")];
        assert!(validate_rows(&rows).is_err());
    }

    #[test]
    fn long_code_rejected() {
        let rows = vec![row(&"x".repeat(MAX_CODE_LEN + 1), "Name")];
        assert!(validate_rows(&rows).is_err());
    }

    #[test]
    fn long_name_rejected() {
        let rows = vec![row("A", &"x".repeat(MAX_NAME_LEN + 1))];
        assert!(validate_rows(&rows).is_err());
    }

    #[test]
    fn duplicate_code_rejected() {
        let rows = vec![row("A", "Alpha"), row("B", "Beta"), row("A", "Again")];
        let msg = validate_rows(&rows).unwrap_err().to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("duplicate"));
    }

    // -- dictionary_lock_key --------------------------------------------------

    #[test]
    fn lock_key_is_stable() {
        assert_eq!(
            dictionary_lock_key("machine_types"),
            dictionary_lock_key("machine_types")
        );
    }

    #[test]
    fn lock_key_differs_per_dictionary() {
        assert_ne!(
            dictionary_lock_key("machine_types"),
            dictionary_lock_key("units")
        );
    }

    #[test]
    fn lock_key_empty_code_is_namespace_fold() {
        // Empty input hashes to the FNV offset basis; key must still be stable.
        assert_eq!(dictionary_lock_key(""), dictionary_lock_key(""));
        assert_ne!(dictionary_lock_key(""), dictionary_lock_key("a"));
    }
}
