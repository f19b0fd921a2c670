use anyhow::Context;
use blobref_sdk::{describe_refs, BlobRef, BlobRefConfig, Document, FieldName, Record};
use colored::Colorize;
use serde_json::{json, Value};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Config(args) => cmd_config(args, &cli.format),
        Command::Demo(args) => cmd_demo(args, &cli.format).await,
    }
}

fn cmd_config(args: ConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = BlobRefConfig::load(&args.path)
        .with_context(|| format!("invalid configuration in {}", args.path.display()))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            println!("{} {} is valid", "✓".green().bold(), args.path.display().to_string().bold());
            println!();
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

/// Sample value for the `index`-th externalized field.
fn sample_value(index: usize) -> Value {
    if index == 0 {
        json!("anyFetch is cool")
    } else {
        json!({ "some": { "complicated": { "stuff": true } } })
    }
}

fn print_refs(doc: &Document) {
    let refs = describe_refs(doc);
    if refs.is_empty() {
        println!("  refs: {}", "(none)".dimmed());
    }
    for (field, blob) in refs {
        println!("  {} → {}", field.cyan(), blob.short_id().yellow());
    }
}

async fn cmd_demo(args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => BlobRefConfig::load(path)
            .with_context(|| format!("invalid configuration in {}", path.display()))?,
        None => BlobRefConfig::new(["content", "complement"]),
    };
    let fields: Vec<FieldName> = config.to_sync_config()?.field_names;
    let blobref = BlobRef::open(config).await?;

    let mut doc = blobref.new_document();
    doc.set("name", "huge.txt")?;
    for (i, field) in fields.iter().enumerate() {
        doc.set_field(field, Some(sample_value(i)));
    }

    blobref.save(&mut doc).await?;
    let fetched = blobref.fetch(&doc.id()).await?;
    let blobs_after_save = blobref.blob_count().await?;

    if let OutputFormat::Json = format {
        let values: serde_json::Map<String, Value> = fields
            .iter()
            .filter_map(|f| fetched.field(f).map(|v| (f.to_string(), v)))
            .collect();
        let refs: serde_json::Map<String, Value> = describe_refs(&doc)
            .into_iter()
            .map(|(f, b)| (f, Value::String(b.to_string())))
            .collect();
        if !args.keep {
            let mut fetched = fetched;
            blobref.remove(&mut fetched).await?;
        }
        let report = json!({
            "record": doc.id().to_string(),
            "refs": refs,
            "values": values,
            "blobs_after_save": blobs_after_save,
            "blobs_remaining": blobref.blob_count().await?,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Saved {} ({})", "✓".green().bold(), "huge.txt".bold(), doc.id().short_id().yellow());
    print_refs(&doc);
    println!("  blobs in bucket {}: {}", blobref.config().bucket.cyan(), blobs_after_save);

    println!("{} Fetched fresh copy", "✓".green().bold());
    for field in &fields {
        let shown = fetched
            .field(field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(unset)".into());
        println!("  {} = {}", field.as_str().cyan(), shown);
    }

    if args.keep {
        println!("{} Kept record {}", "✓".green().bold(), doc.id().to_string().yellow());
        return Ok(());
    }

    let mut fresh = blobref
        .load(&doc.id())
        .await?
        .context("saved record disappeared")?;
    blobref.unlink(&mut fresh).await?;
    println!("{} Unlinked blobs", "✓".green().bold());
    print_refs(&fresh);
    println!("  blobs in bucket {}: {}", blobref.config().bucket.cyan(), blobref.blob_count().await?);

    blobref.remove(&mut fresh).await?;
    println!("{} Removed record", "✓".green().bold());
    Ok(())
}
