use anyhow::{Context, Result};
use std::path::Path;
use transhub::loader::SourceLoader;
use transhub::model::{column_letter, SourceKind};
use transhub::source::{Asset, DocumentSource};

use super::RULE;

/// Parse a document the way the editor does and print its structure
pub async fn run_inspect(file: &Path, sheet: Option<String>) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let asset = Asset::detect(file_name.clone(), bytes);
    let loader = SourceLoader::default();
    let source = match loader.load(asset, sheet).await {
        Ok(outcome) => outcome
            .into_source()
            .context("Load was superseded")?,
        Err(e) => {
            let hint = e.user_message().unwrap_or("cannot open document");
            anyhow::bail!("{}: {} ({})", file_name, hint, e);
        }
    };

    println!();
    println!("Document: {} ({})", file_name, source.kind());
    println!("{}", RULE);

    match source.kind() {
        SourceKind::Pdf => print_pages(&*source),
        SourceKind::Excel => print_columns(&*source),
    }

    println!();
    Ok(())
}

fn print_pages(source: &dyn DocumentSource) {
    println!("  Pages: {}", source.page_count());
    println!();
    println!("  {:>5}  {:>10}  {:>10}", "Page", "Width", "Height");
    for page in 1..=source.page_count() {
        if let Some((w, h)) = source.page_size(page) {
            println!("  {:>5}  {:>10.1}  {:>10.1}", page, w, h);
        }
    }
}

fn print_columns(source: &dyn DocumentSource) {
    if let Some(sheet) = source.sheet_name() {
        println!("  Sheet:  {}", sheet);
    }
    let sheets = source.sheet_names();
    if sheets.len() > 1 {
        println!("  Sheets: {}", sheets.join(", "));
    }
    println!("  Columns: {}", source.unit_count());
    println!();
    println!("  {:<4} {:<28} {}", "Col", "Header", "Samples");
    for index in 0..source.unit_count() {
        let header = source.header_at(index).unwrap_or_default();
        let samples = source.samples_at(index);
        println!(
            "  {:<4} {:<28} {}",
            column_letter(index),
            header,
            samples.join(" | ")
        );
    }
}
