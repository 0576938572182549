//! Repository for the `dictionary_items` table.
//!
//! All writes except `insert` are version-checked: the statement matches on
//! `(id, version)` and affects zero rows when the stored version moved on,
//! which callers surface as a conflict. Restore methods write the snapshot
//! exactly, version and timestamps included, so undo/redo round-trips are
//! bit-exact.

use sqlx::PgExecutor;

use refdata_core::types::DbId;

use crate::models::dictionary_item::{
    CreateDictionaryItem, DictionaryItem, ItemSnapshot, UpdateItemFields,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, dictionary_code, code, name, name_en, name_ru, name_uz, \
    icon, color, symbol, sort_order, is_active, version, created_at, updated_at";

/// Provides version-checked access to dictionary items.
pub struct DictionaryItemRepo;

impl DictionaryItemRepo {
    /// Find an item by its `(dictionary_code, code)` identity.
    pub async fn find_by_code(
        executor: impl PgExecutor<'_>,
        dictionary_code: &str,
        code: &str,
    ) -> Result<Option<DictionaryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dictionary_items \
             WHERE dictionary_code = $1 AND code = $2"
        );
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(dictionary_code)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    /// Find an item by primary key.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<DictionaryItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dictionary_items WHERE id = $1");
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a new item at `version = 1`, returning the created row.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        body: &CreateDictionaryItem,
    ) -> Result<DictionaryItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO dictionary_items \
                (dictionary_code, code, name, name_en, name_ru, name_uz, \
                 icon, color, symbol, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(&body.dictionary_code)
            .bind(&body.code)
            .bind(&body.name)
            .bind(&body.name_en)
            .bind(&body.name_ru)
            .bind(&body.name_uz)
            .bind(&body.icon)
            .bind(&body.color)
            .bind(&body.symbol)
            .bind(body.sort_order)
            .bind(body.is_active)
            .fetch_one(executor)
            .await
    }

    /// Merge-update an item: `name` always rewrites, optional fields keep
    /// their stored value when `None`. Bumps `version` and `updated_at`.
    ///
    /// Returns `None` when the `(id, version)` pair no longer matches.
    pub async fn update_merge_checked(
        executor: impl PgExecutor<'_>,
        id: DbId,
        expected_version: i64,
        fields: &UpdateItemFields,
    ) -> Result<Option<DictionaryItem>, sqlx::Error> {
        let query = format!(
            "UPDATE dictionary_items SET \
                name = $3, \
                name_en = COALESCE($4, name_en), \
                name_ru = COALESCE($5, name_ru), \
                name_uz = COALESCE($6, name_uz), \
                icon = COALESCE($7, icon), \
                color = COALESCE($8, color), \
                symbol = COALESCE($9, symbol), \
                sort_order = COALESCE($10, sort_order), \
                is_active = COALESCE($11, is_active), \
                version = version + 1, \
                updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(&fields.name)
            .bind(&fields.name_en)
            .bind(&fields.name_ru)
            .bind(&fields.name_uz)
            .bind(&fields.icon)
            .bind(&fields.color)
            .bind(&fields.symbol)
            .bind(fields.sort_order)
            .bind(fields.is_active)
            .fetch_optional(executor)
            .await
    }

    /// Overwrite an item with a snapshot, exactly as recorded (version and
    /// timestamps included).
    ///
    /// Returns `None` when the `(id, version)` pair no longer matches.
    pub async fn restore_checked(
        executor: impl PgExecutor<'_>,
        expected_version: i64,
        snapshot: &ItemSnapshot,
    ) -> Result<Option<DictionaryItem>, sqlx::Error> {
        let query = format!(
            "UPDATE dictionary_items SET \
                dictionary_code = $3, code = $4, name = $5, \
                name_en = $6, name_ru = $7, name_uz = $8, \
                icon = $9, color = $10, symbol = $11, \
                sort_order = $12, is_active = $13, \
                version = $14, created_at = $15, updated_at = $16 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(snapshot.id)
            .bind(expected_version)
            .bind(&snapshot.dictionary_code)
            .bind(&snapshot.code)
            .bind(&snapshot.name)
            .bind(&snapshot.name_en)
            .bind(&snapshot.name_ru)
            .bind(&snapshot.name_uz)
            .bind(&snapshot.icon)
            .bind(&snapshot.color)
            .bind(&snapshot.symbol)
            .bind(snapshot.sort_order)
            .bind(snapshot.is_active)
            .bind(snapshot.version)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .fetch_optional(executor)
            .await
    }

    /// Re-insert a previously deleted item from its snapshot, keeping the
    /// original id. Callers must run [`Self::sync_id_sequence`] afterwards
    /// so default-id inserts cannot collide with restored ids.
    pub async fn restore_created(
        executor: impl PgExecutor<'_>,
        snapshot: &ItemSnapshot,
    ) -> Result<DictionaryItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO dictionary_items \
                (id, dictionary_code, code, name, name_en, name_ru, name_uz, \
                 icon, color, symbol, sort_order, is_active, version, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DictionaryItem>(&query)
            .bind(snapshot.id)
            .bind(&snapshot.dictionary_code)
            .bind(&snapshot.code)
            .bind(&snapshot.name)
            .bind(&snapshot.name_en)
            .bind(&snapshot.name_ru)
            .bind(&snapshot.name_uz)
            .bind(&snapshot.icon)
            .bind(&snapshot.color)
            .bind(&snapshot.symbol)
            .bind(snapshot.sort_order)
            .bind(snapshot.is_active)
            .bind(snapshot.version)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .fetch_one(executor)
            .await
    }

    /// Delete an item, but only if its stored version still matches.
    /// Returns `false` on version mismatch or missing row.
    pub async fn delete_checked(
        executor: impl PgExecutor<'_>,
        id: DbId,
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dictionary_items WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Advance the identity sequence past the highest id in the table.
    /// Required after `restore_created` wrote explicit ids.
    pub async fn sync_id_sequence(executor: impl PgExecutor<'_>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('dictionary_items', 'id'), \
                    GREATEST((SELECT COALESCE(MAX(id), 1) FROM dictionary_items), 1), true)",
        )
        .execute(executor)
        .await
        .map(|_| ())
    }
}
