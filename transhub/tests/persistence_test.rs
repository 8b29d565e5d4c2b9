//! Persistence against real storage backends.

use std::sync::Arc;
use tempfile::TempDir;
use transhub::catalog::ReferenceCatalog;
use transhub::coords::Rect;
use transhub::editor::{EditorSettings, MappingEditor};
use transhub::model::{create_column_field, create_field, FieldUpdate, MappingSet, SourceKind};
use transhub::persistence::{PersistenceAdapter, TemplateRecord};
use transhub::source::Asset;
use transhub::Error;
use transhub_storage::{LocalStorage, MemoryStorage};

fn pdf_set(id: &str, name: &str) -> MappingSet {
    let catalog = ReferenceCatalog::builtin();
    let mut set = MappingSet::new(name, SourceKind::Pdf).with_id(id);
    set.asset_name = Some(format!("{}.pdf", id));

    let mut field = create_field(Rect::new(10.0, 20.0, 50.0, 10.0), 1, "Иванов", "customers");
    let sub_id = field.add_sub_field().id.clone();
    let field_id = field.id.clone();
    set.push(field);
    set.update_field(&field_id, &FieldUpdate::new().column("name"), &catalog)
        .unwrap();
    set.update_subfield(
        &field_id,
        &sub_id,
        &FieldUpdate::new().column("inn").max_length(12),
        &catalog,
    )
    .unwrap();
    set
}

fn local_adapter(dir: &TempDir) -> PersistenceAdapter {
    let storage = Arc::new(LocalStorage::new(dir.path()));
    PersistenceAdapter::from_storage(
        storage.clone(),
        storage,
        Arc::new(ReferenceCatalog::builtin()),
    )
}

#[tokio::test]
async fn test_local_round_trip() {
    let dir = TempDir::new().unwrap();
    let adapter = local_adapter(&dir);

    let saved = adapter.save(&pdf_set("ttn", "ТТН")).await.unwrap();
    assert!(dir.path().join("templates/ttn/template.json").exists());

    // A fresh adapter over the same directory sees the same template
    let reopened = local_adapter(&dir);
    let loaded = reopened.load("ttn").await.unwrap();
    assert_eq!(loaded.fields(), saved.fields());
    assert_eq!(loaded.name, "ТТН");
    assert_eq!(loaded.version, 1);

    let sub = &loaded.fields()[0].sub_fields[0];
    assert_eq!(sub.binding.qualified(), "customers.inn");
    assert_eq!(sub.max_length.map(|n| n.get()), Some(12));
}

#[tokio::test]
async fn test_record_is_camel_case_json() {
    let dir = TempDir::new().unwrap();
    let adapter = local_adapter(&dir);
    adapter.save(&pdf_set("ttn", "ТТН")).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("templates/ttn/template.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["sourceType"], "pdf");
    assert_eq!(json["fields"][0]["tableName"], "customers");
    assert_eq!(json["fields"][0]["columnName"], "name");
    assert_eq!(json["fields"][0]["page"], 1);
    assert_eq!(json["fields"][0]["subFields"][0]["maxLength"], 12);

    let record: TemplateRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.fields.len(), 1);
}

#[tokio::test]
async fn test_list_and_delete() {
    let dir = TempDir::new().unwrap();
    let adapter = local_adapter(&dir);

    adapter.save(&pdf_set("b", "Договор")).await.unwrap();
    adapter.save(&pdf_set("a", "Акт")).await.unwrap();
    adapter
        .put_asset("a", &Asset::new(SourceKind::Pdf, "a.pdf", &b"%PDF-1.4"[..]))
        .await
        .unwrap();

    let listed = adapter.list().await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(listed[0].field_count, 1);

    adapter.delete("a").await.unwrap();
    assert!(!dir.path().join("assets/a/source").exists());
    assert_eq!(adapter.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_evicted_asset_is_unavailable_not_missing() {
    let dir = TempDir::new().unwrap();
    let metadata = Arc::new(LocalStorage::new(dir.path()));
    let assets = Arc::new(MemoryStorage::with_capacity(16));
    let adapter = PersistenceAdapter::from_storage(
        metadata,
        assets.clone(),
        Arc::new(ReferenceCatalog::builtin()),
    );

    adapter.save(&pdf_set("a", "A")).await.unwrap();
    adapter.save(&pdf_set("b", "B")).await.unwrap();
    adapter
        .put_asset("a", &Asset::new(SourceKind::Pdf, "a.pdf", vec![b'a'; 10]))
        .await
        .unwrap();
    adapter
        .put_asset("b", &Asset::new(SourceKind::Pdf, "b.pdf", vec![b'b'; 10]))
        .await
        .unwrap();

    let err = adapter.load_asset("a").await.unwrap_err();
    assert!(matches!(err, Error::AssetUnavailable(_)));

    // Metadata survives eviction
    assert_eq!(adapter.load("a").await.unwrap().len(), 1);

    let b = adapter.load_asset("b").await.unwrap();
    assert_eq!(b.file_name, "b.pdf");
    assert_eq!(b.kind, SourceKind::Pdf);

    assert!(matches!(
        adapter.load_asset("missing").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_spreadsheet_template_round_trip() {
    let dir = TempDir::new().unwrap();
    let adapter = local_adapter(&dir);
    let catalog = ReferenceCatalog::builtin();

    let mut set = MappingSet::new("Реестр", SourceKind::Excel).with_id("registry");
    set.sheet_name = Some("Лист1".to_string());
    let field = create_column_field(3, "Сумма", "contracts");
    let id = field.id.clone();
    set.push(field);
    set.update_field(&id, &FieldUpdate::new().column("amount"), &catalog)
        .unwrap();

    adapter.save(&set).await.unwrap();
    let loaded = adapter.load("registry").await.unwrap();
    assert_eq!(loaded.source_kind, SourceKind::Excel);
    assert_eq!(loaded.sheet_name.as_deref(), Some("Лист1"));
    assert_eq!(loaded.fields()[0].placement.column_index(), Some(3));
}

#[tokio::test]
async fn test_consecutive_saves_advance_version() {
    let adapter = PersistenceAdapter::from_storage(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryStorage::new()),
        Arc::new(ReferenceCatalog::builtin()),
    );
    let mut editor = MappingEditor::new(
        pdf_set("ttn", "ТТН"),
        Arc::new(ReferenceCatalog::builtin()),
        EditorSettings::default(),
    )
    .unwrap();

    let first = adapter.save(&editor.save().unwrap()).await.unwrap();
    assert_eq!(first.version, 1);
    editor.mark_saved(&first).unwrap();

    let second = adapter.save(&editor.save().unwrap()).await.unwrap();
    assert_eq!(second.version, 2);
    editor.mark_saved(&second).unwrap();

    assert_eq!(adapter.load("ttn").await.unwrap().version, 2);
    assert_eq!(editor.mapping_set().version, 2);
}
