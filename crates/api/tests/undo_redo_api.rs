//! HTTP-level integration tests for undo/redo: round-trip exactness,
//! stack-top enforcement, redo invalidation by new imports, conflict
//! handling, and history purge rules.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, post_json};
use sqlx::PgPool;

use refdata_db::models::dictionary_item::{
    CreateDictionaryItem, ItemSnapshot, UpdateItemFields,
};
use refdata_db::repositories::DictionaryItemRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed_item(dictionary_code: &str, code: &str, name: &str) -> CreateDictionaryItem {
    CreateDictionaryItem {
        dictionary_code: dictionary_code.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        name_en: None,
        name_ru: None,
        name_uz: None,
        icon: None,
        color: None,
        symbol: None,
        sort_order: 0,
        is_active: true,
    }
}

fn merge_name(name: &str) -> UpdateItemFields {
    UpdateItemFields {
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

/// Run an import over HTTP and return the created batch id.
async fn import(app: axum::Router, dictionary: &str, rows: serde_json::Value) -> i64 {
    let response = post_json(
        app,
        &format!("/api/v1/dictionaries/{dictionary}/import"),
        serde_json::json!({ "import_mode": "upsert", "rows": rows }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "completed");
    json["data"]["id"].as_i64().unwrap()
}

async fn undo(app: axum::Router, batch_id: i64) -> axum::response::Response {
    post_json(
        app,
        &format!("/api/v1/import/batches/{batch_id}/undo"),
        serde_json::json!({ "performed_by": "admin" }),
    )
    .await
}

async fn redo(app: axum::Router, batch_id: i64) -> axum::response::Response {
    post_json(
        app,
        &format!("/api/v1/import/batches/{batch_id}/redo"),
        serde_json::json!({}),
    )
    .await
}

async fn capabilities(app: axum::Router, batch_id: i64) -> serde_json::Value {
    let json = body_json(
        get(
            app,
            &format!("/api/v1/import/batches/{batch_id}/capabilities"),
        )
        .await,
    )
    .await;
    json["data"].clone()
}

// ---------------------------------------------------------------------------
// Undo restores the exact pre-import state
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn undo_restores_pre_import_state(pool: PgPool) {
    let seeded = DictionaryItemRepo::insert(&pool, &seed_item("units", "A", "Old-A"))
        .await
        .unwrap();
    let before_import = ItemSnapshot::from(&seeded);

    let app = build_test_app(pool.clone());
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([
            { "code": "A", "name": "Alpha" },
            { "code": "B", "name": "Beta" },
            { "code": "C", "name": "Gamma" },
        ]),
    )
    .await;

    let response = undo(app.clone(), batch_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["batch"]["status"], "rolled_back");
    assert_eq!(json["data"]["entries_total"], 3);
    assert_eq!(json["data"]["entries_applied"], 3);
    assert!(json["data"]["conflicts"].as_array().unwrap().is_empty());
    assert_eq!(json["data"]["batch"]["rolled_back_by"], "admin");
    assert!(!json["data"]["batch"]["rolled_back_at"].is_null());

    // A is bit-exact its pre-import self; B and C are gone.
    let a = DictionaryItemRepo::find_by_code(&pool, "units", "A")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ItemSnapshot::from(&a), before_import);
    for code in ["B", "C"] {
        assert!(DictionaryItemRepo::find_by_code(&pool, "units", code)
            .await
            .unwrap()
            .is_none());
    }
}

// ---------------------------------------------------------------------------
// Redo re-applies exactly what the import produced
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn redo_after_undo_restores_import_state_exactly(pool: PgPool) {
    DictionaryItemRepo::insert(&pool, &seed_item("units", "A", "Old-A"))
        .await
        .unwrap();

    let app = build_test_app(pool.clone());
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([
            { "code": "A", "name": "Alpha" },
            { "code": "B", "name": "Beta", "color": "#00ff00", "sort_order": 5 },
        ]),
    )
    .await;

    // Capture the state the import produced.
    let mut post_import = Vec::new();
    for code in ["A", "B"] {
        let item = DictionaryItemRepo::find_by_code(&pool, "units", code)
            .await
            .unwrap()
            .unwrap();
        post_import.push(ItemSnapshot::from(&item));
    }

    assert_eq!(undo(app.clone(), batch_id).await.status(), StatusCode::OK);

    let response = redo(app.clone(), batch_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["batch"]["status"], "completed");
    assert_eq!(json["data"]["entries_applied"], 2);
    assert!(json["data"]["batch"]["rolled_back_at"].is_null());

    // Items match the post-import state exactly, original ids included.
    for snapshot in &post_import {
        let item = DictionaryItemRepo::find_by_code(&pool, "units", &snapshot.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&ItemSnapshot::from(&item), snapshot);
    }

    // The batch is undoable again, not redoable.
    let caps = capabilities(app, batch_id).await;
    assert_eq!(caps["can_undo"], true);
    assert_eq!(caps["can_redo"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn capabilities_flip_across_undo(pool: PgPool) {
    let app = build_test_app(pool);
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;

    let caps = capabilities(app.clone(), batch_id).await;
    assert_eq!(caps["can_undo"], true);
    assert_eq!(caps["can_redo"], false);

    undo(app.clone(), batch_id).await;

    let caps = capabilities(app, batch_id).await;
    assert_eq!(caps["can_undo"], false);
    assert_eq!(caps["can_redo"], true);
}

// ---------------------------------------------------------------------------
// Stack-top enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn only_the_stack_top_may_be_undone(pool: PgPool) {
    let app = build_test_app(pool);
    let first = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;
    let second = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha-2" }]),
    )
    .await;

    // The older batch is not the top.
    let response = undo(app.clone(), first).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_TOP_OF_STACK");

    // Undo in stack order works, and the top recedes.
    assert_eq!(undo(app.clone(), second).await.status(), StatusCode::OK);
    assert_eq!(undo(app, first).await.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn new_import_invalidates_stale_redo(pool: PgPool) {
    let app = build_test_app(pool);
    let first = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;
    undo(app.clone(), first).await;

    // A brand-new import supersedes the undone batch.
    import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "B", "name": "Beta" }]),
    )
    .await;

    let caps = capabilities(app.clone(), first).await;
    assert_eq!(caps["can_redo"], false);

    let response = redo(app, first).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_TOP_OF_STACK");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cross_dictionary_stacks_are_independent(pool: PgPool) {
    let app = build_test_app(pool);
    let units = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;
    let machines = import(
        app.clone(),
        "machine_types",
        serde_json::json!([{ "code": "M1", "name": "Lathe" }]),
    )
    .await;

    // Each batch is its own dictionary's top, regardless of global order.
    assert_eq!(undo(app.clone(), units).await.status(), StatusCode::OK);
    assert_eq!(undo(app, machines).await.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Status preconditions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn undoing_a_failed_batch_is_invalid_state(pool: PgPool) {
    DictionaryItemRepo::insert(&pool, &seed_item("units", "A", "Old-A"))
        .await
        .unwrap();

    let app = build_test_app(pool);
    let response = post_json(
        app.clone(),
        "/api/v1/dictionaries/units/import",
        serde_json::json!({
            "import_mode": "create",
            "skip_errors": false,
            "rows": [{ "code": "A", "name": "Alpha" }],
        }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
    let batch_id = json["data"]["id"].as_i64().unwrap();

    let response = undo(app, batch_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_STATE");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn redoing_a_completed_batch_is_invalid_state(pool: PgPool) {
    let app = build_test_app(pool);
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;

    let response = redo(app, batch_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_STATE");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn undoing_an_unknown_batch_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let response = undo(app, 4242).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Conflicts: intervening edits block the stack without losing work
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn undo_conflict_reports_and_keeps_batch_completed(pool: PgPool) {
    DictionaryItemRepo::insert(&pool, &seed_item("units", "A", "Old-A"))
        .await
        .unwrap();

    let app = build_test_app(pool.clone());
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([
            { "code": "A", "name": "Alpha" },
            { "code": "B", "name": "Beta" },
        ]),
    )
    .await;

    // An operator edits B directly after the import.
    let b = DictionaryItemRepo::find_by_code(&pool, "units", "B")
        .await
        .unwrap()
        .unwrap();
    DictionaryItemRepo::update_merge_checked(&pool, b.id, b.version, &merge_name("Beta-edited"))
        .await
        .unwrap()
        .unwrap();

    let response = undo(app.clone(), batch_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    // The conflicting entry is reported; the clean entry was reverted.
    let conflicts = json["data"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["item_id"].as_i64(), Some(b.id));
    assert_eq!(json["data"]["entries_applied"], 1);

    // The batch did not transition and is still the undo top.
    assert_eq!(json["data"]["batch"]["status"], "completed");
    let caps = capabilities(app, batch_id).await;
    assert_eq!(caps["can_undo"], true);

    // The operator's edit survives; A was reverted to its pre-import name.
    let b = DictionaryItemRepo::find_by_code(&pool, "units", "B")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b.name, "Beta-edited");
    let a = DictionaryItemRepo::find_by_code(&pool, "units", "A")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.name, "Old-A");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn redo_conflict_reports_and_keeps_batch_rolled_back(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let batch_id = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "B", "name": "Beta" }]),
    )
    .await;
    assert_eq!(undo(app.clone(), batch_id).await.status(), StatusCode::OK);

    // Someone recreates the code while the batch sits undone.
    DictionaryItemRepo::insert(&pool, &seed_item("units", "B", "Beta-manual"))
        .await
        .unwrap();

    let response = redo(app.clone(), batch_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["conflicts"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["batch"]["status"], "rolled_back");

    // Redo availability is retained for after the operator resolves it.
    let caps = capabilities(app, batch_id).await;
    assert_eq!(caps["can_redo"], true);

    let b = DictionaryItemRepo::find_by_code(&pool, "units", "B")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b.name, "Beta-manual");
}

// ---------------------------------------------------------------------------
// History purge
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn purging_history_respects_stack_tops(pool: PgPool) {
    let app = build_test_app(pool);
    let first = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha" }]),
    )
    .await;
    let second = import(
        app.clone(),
        "units",
        serde_json::json!([{ "code": "A", "name": "Alpha-2" }]),
    )
    .await;

    // The current undo top cannot be purged.
    let response = delete(app.clone(), &format!("/api/v1/import/batches/{second}")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // An older, non-top batch can.
    let response = delete(app.clone(), &format!("/api/v1/import/batches/{first}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get(app.clone(), &format!("/api/v1/import/batches/{first}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // After an undo the batch is the redo top -- still protected.
    assert_eq!(undo(app.clone(), second).await.status(), StatusCode::OK);
    let response = delete(app.clone(), &format!("/api/v1/import/batches/{second}")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete(app, "/api/v1/import/batches/4242").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
