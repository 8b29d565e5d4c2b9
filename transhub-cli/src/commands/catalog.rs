use anyhow::Result;
use transhub::Config;

use super::RULE;

/// Print every reference table with its columns
pub fn run_catalog(config: &Config) -> Result<()> {
    let catalog = config.catalog.load()?;

    let source = match &config.catalog.path {
        Some(path) => format!("{:?}", path),
        None => "built-in".to_string(),
    };

    println!();
    println!("Reference catalog ({}, {} tables)", source, catalog.tables().len());
    println!("{}", RULE);
    println!("{:<20} {:<24} {}", "Table", "Label", "Columns");
    println!("{}", RULE);

    for (i, table) in catalog.tables().iter().enumerate() {
        let marker = if i == 0 { " *" } else { "" };
        println!(
            "{:<20} {:<24} {}",
            format!("{}{}", table.name, marker),
            table.label,
            table.columns.join(", ")
        );
    }

    println!();
    println!("  * default table for new fields");
    println!();
    Ok(())
}
