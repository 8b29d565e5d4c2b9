use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use transhub::model::{column_letter, Field, Placement};
use transhub::persistence::{deserialize, PersistenceAdapter, TemplateRecord};
use transhub::source::Asset;
use transhub::Config;

use super::RULE;

fn open(config: &Config) -> Result<PersistenceAdapter> {
    let catalog = Arc::new(config.catalog.load()?);
    let storage = config.storage.create_storage()?;
    Ok(PersistenceAdapter::from_storage(
        storage.clone(),
        storage,
        catalog,
    ))
}

fn describe_placement(field: &Field) -> String {
    match field.placement {
        Placement::Region { page, rect } => format!(
            "p.{} [{:.0},{:.0} {:.0}x{:.0}]",
            page, rect.x, rect.y, rect.width, rect.height
        ),
        Placement::Column { index } => format!("col {}", column_letter(index)),
    }
}

fn describe_binding(table: &str, column: &str) -> String {
    if column.is_empty() {
        format!("{}.?", table)
    } else {
        format!("{}.{}", table, column)
    }
}

pub async fn list(config: &Config) -> Result<()> {
    let adapter = open(config)?;
    let templates = adapter.list().await?;

    if templates.is_empty() {
        println!("No templates stored in {:?}", config.storage.data_dir);
        return Ok(());
    }

    println!();
    println!(
        "{:<38} {:<28} {:<6} {:>6} {:>8}  {}",
        "Id", "Name", "Type", "Fields", "Version", "Updated"
    );
    println!("{}", RULE);
    for t in &templates {
        println!(
            "{:<38} {:<28} {:<6} {:>6} {:>8}  {}",
            t.id,
            t.name,
            t.source_type,
            t.field_count,
            t.version,
            t.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("{} template(s)", templates.len());
    Ok(())
}

pub async fn show(config: &Config, id: &str) -> Result<()> {
    let adapter = open(config)?;
    let set = adapter
        .load(id)
        .await
        .with_context(|| format!("Failed to load template '{}'", id))?;
    let status = set.completion_status();

    println!();
    println!("Template: {} ({})", set.name, set.id);
    println!("{}", RULE);
    println!("  Source type:   {}", set.source_kind);
    if let Some(ref sheet) = set.sheet_name {
        println!("  Sheet:         {}", sheet);
    }
    if let Some(ref asset) = set.asset_name {
        println!("  Document:      {}", asset);
    }
    if let Some(ref description) = set.description {
        println!("  Description:   {}", description);
    }
    println!("  Version:       {}", set.version);
    println!(
        "  Configured:    {}/{}",
        status.configured_count, status.total_count
    );

    println!();
    println!(
        "  {:<24} {:<28} {:<28} {}",
        "Label", "Placement", "Binding", "Type"
    );
    for field in set.fields() {
        let ty = match field.max_length {
            Some(n) => format!("{} (max {})", field.field_type, n),
            None => field.field_type.to_string(),
        };
        println!(
            "  {:<24} {:<28} {:<28} {}",
            field.label,
            describe_placement(field),
            describe_binding(&field.binding.table_name, &field.binding.column_name),
            ty
        );
        for sub in &field.sub_fields {
            println!(
                "    - {:<20} {:<28} {:<28} {}",
                sub.label,
                "",
                describe_binding(&sub.binding.table_name, &sub.binding.column_name),
                sub.field_type
            );
        }
    }
    println!();
    Ok(())
}

pub async fn export(config: &Config, id: &str, output: Option<&Path>) -> Result<()> {
    let adapter = open(config)?;
    let record = adapter
        .load_record(id)
        .await
        .with_context(|| format!("Failed to load template '{}'", id))?;
    let json = serde_json::to_string_pretty(&record)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Exported '{}' to {:?}", id, path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn import(config: &Config, file: &Path, asset: Option<&Path>) -> Result<()> {
    let adapter = open(config)?;
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let record: TemplateRecord =
        serde_json::from_slice(&data).with_context(|| format!("Invalid record {:?}", file))?;

    // Bindings the catalog does not know are cleared here
    let mut set = deserialize(record, adapter.catalog())?;

    let document = match asset {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let document = Asset::detect(name.clone(), bytes);
            if document.kind != set.source_kind {
                anyhow::bail!(
                    "{} document cannot back a {} template",
                    document.kind,
                    set.source_kind
                );
            }
            set.asset_name = Some(name);
            Some(document)
        }
        None => None,
    };

    let saved = adapter.save(&set).await?;
    if let Some(document) = document {
        adapter.put_asset(&saved.id, &document).await?;
    }

    println!(
        "Imported '{}' ({} fields, version {})",
        saved.id,
        saved.len(),
        saved.version
    );
    Ok(())
}

pub async fn delete(config: &Config, id: &str, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!(
            "Refusing to delete '{}' without --yes (this also removes its document)",
            id
        );
    }
    let adapter = open(config)?;
    adapter
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete template '{}'", id))?;
    println!("Deleted '{}'", id);
    Ok(())
}
