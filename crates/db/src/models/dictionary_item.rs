//! Dictionary item models and the journal snapshot payload.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use refdata_core::error::CoreError;
use refdata_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `dictionary_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DictionaryItem {
    pub id: DbId,
    pub dictionary_code: String,
    pub code: String,
    pub name: String,
    pub name_en: Option<String>,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub symbol: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for inserting a new dictionary item. Inserts start at `version = 1`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDictionaryItem {
    pub dictionary_code: String,
    pub code: String,
    pub name: String,
    pub name_en: Option<String>,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub symbol: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Merge-update DTO: `name` always rewrites; `None` in any optional field
/// preserves the stored value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemFields {
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
// Snapshot
// ---------------------------------------------------------------------------

/// The full item state persisted in a journal entry's JSONB columns.
///
/// Carries every column, including `version` and timestamps, so undo/redo
/// restores are exact and the follow-up version check is well-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: DbId,
    pub dictionary_code: String,
    pub code: String,
    pub name: String,
    pub name_en: Option<String>,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub symbol: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&DictionaryItem> for ItemSnapshot {
    fn from(item: &DictionaryItem) -> Self {
        Self {
            id: item.id,
            dictionary_code: item.dictionary_code.clone(),
            code: item.code.clone(),
            name: item.name.clone(),
            name_en: item.name_en.clone(),
            name_ru: item.name_ru.clone(),
            name_uz: item.name_uz.clone(),
            icon: item.icon.clone(),
            color: item.color.clone(),
            symbol: item.symbol.clone(),
            sort_order: item.sort_order,
            is_active: item.is_active,
            version: item.version,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl ItemSnapshot {
    /// Serialize for a JSONB journal column.
    pub fn to_value(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self)
            .map_err(|e| CoreError::Internal(format!("Snapshot serialization failed: {e}")))
    }

    /// Deserialize from a JSONB journal column.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Internal(format!("Snapshot deserialization failed: {e}")))
    }
}
