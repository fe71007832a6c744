use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use stash_catalog::JsonCatalog;
use stash_persist::PersistenceManager;
use stash_store::FsBlobStore;
use stash_types::Kind;
use tracing::debug;

use crate::cli::*;
use crate::config::StashConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = StashConfig::load(cli.config.as_deref())?;
    let manager = open(&config)?;
    let format = cli.format;
    match cli.command {
        Command::Status(args) => cmd_status(&manager, &args, format),
        Command::Unreferenced(args) => cmd_unreferenced(&manager, &args, format),
        Command::Empty(args) => cmd_empty(&manager, &args, format),
        Command::Duplicates(args) => cmd_duplicates(&manager, &args, format),
        Command::Gc(args) => cmd_gc(&manager, &args, format),
        Command::DeleteUnreferenced(args) => per_kind_count(&args, format, "blobs deleted", |kind| {
            Ok(manager.delete_unreferenced_blobs(kind)?)
        }),
        Command::DeleteEmpty(args) => per_kind_count(&args, format, "records deleted", |kind| {
            Ok(manager.delete_empty_records(kind)?)
        }),
        Command::DeleteDuplicates(args) => per_kind_count(&args, format, "duplicates deleted", |kind| {
            Ok(manager.delete_duplicate_blobs(kind)?)
        }),
        Command::Reconcile(args) => per_kind_count(&args, format, "records created", |kind| {
            Ok(manager.reconcile_orphan_blobs(kind)?)
        }),
    }
}

fn open(config: &StashConfig) -> anyhow::Result<PersistenceManager> {
    let store = FsBlobStore::open(config.store_config())
        .with_context(|| format!("opening blob store at {}", config.root.display()))?;
    let catalog = JsonCatalog::open(&config.catalog)
        .with_context(|| format!("opening catalog {}", config.catalog.display()))?;
    debug!(root = %config.root.display(), catalog = %config.catalog.display(), codec = %config.codec, "repository opened");
    Ok(PersistenceManager::new(
        Arc::new(store),
        Arc::new(catalog),
        config.codec,
    ))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run `op` for each selected kind and collect the results by kind name.
fn by_kind<T>(
    args: &KindArgs,
    mut op: impl FnMut(Kind) -> anyhow::Result<T>,
) -> anyhow::Result<BTreeMap<&'static str, T>> {
    args.kinds()
        .into_iter()
        .map(|kind| Ok::<_, anyhow::Error>((kind.as_str(), op(kind)?)))
        .collect()
}

fn per_kind_count(
    args: &KindArgs,
    format: OutputFormat,
    label: &str,
    op: impl FnMut(Kind) -> anyhow::Result<usize>,
) -> anyhow::Result<()> {
    let counts = by_kind(args, op)?;
    if format == OutputFormat::Json {
        return print_json(&counts);
    }
    for (kind, count) in &counts {
        let count = if *count > 0 {
            count.to_string().yellow().bold()
        } else {
            count.to_string().dimmed()
        };
        println!("{:<18} {} {}", kind.bold(), count, label);
    }
    println!("{} Done.", "✓".green().bold());
    Ok(())
}

fn cmd_status(manager: &PersistenceManager, args: &KindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reports = by_kind(args, |kind| Ok(manager.audit(kind)?))?;
    if format == OutputFormat::Json {
        return print_json(&reports);
    }
    let mut clean = true;
    for (kind, report) in &reports {
        let state = if report.is_clean() {
            "clean".green()
        } else {
            clean = false;
            "needs attention".yellow()
        };
        println!(
            "{:<18} {} blobs, {} records, {} unreferenced, {} empty, {} duplicates  [{}]",
            kind.bold(),
            report.blob_count,
            report.record_count,
            report.unreferenced.len(),
            report.empty.len(),
            report.duplicate_count(),
            state,
        );
    }
    if clean {
        println!("{} Blob store and catalog are consistent.", "✓".green().bold());
    } else {
        println!("Run {} to clean up.", "stash gc".bold());
    }
    Ok(())
}

fn cmd_unreferenced(manager: &PersistenceManager, args: &KindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let blobs = by_kind(args, |kind| Ok(manager.unreferenced_blobs(kind)?))?;
    if format == OutputFormat::Json {
        return print_json(&blobs);
    }
    let mut total = 0;
    for keys in blobs.values() {
        for key in keys {
            println!("  {} {}", "unreferenced:".yellow(), key);
            total += 1;
        }
    }
    println!("{} unreferenced blob(s).", total.to_string().bold());
    Ok(())
}

fn cmd_empty(manager: &PersistenceManager, args: &KindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let rows = by_kind(args, |kind| Ok(manager.empty_records(kind)?))?;
    if format == OutputFormat::Json {
        return print_json(&rows);
    }
    let mut total = 0;
    for rows in rows.values() {
        for row in rows {
            println!(
                "  {} {} {} {}",
                "empty:".red(),
                row.id.to_string().yellow(),
                row.object_hash.short_hex().dimmed(),
                row.blob_key
            );
            total += 1;
        }
    }
    println!("{} empty record(s).", total.to_string().bold());
    Ok(())
}

fn cmd_duplicates(manager: &PersistenceManager, args: &KindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let groups = by_kind(args, |kind| Ok(manager.duplicate_blobs(kind)?))?;
    if format == OutputFormat::Json {
        return print_json(&groups);
    }
    let mut total = 0;
    for groups in groups.values() {
        for group in groups {
            println!("{} {}", "keep".green(), group.keep);
            for key in &group.duplicates {
                println!("  {} {}", "duplicate:".yellow(), key);
                total += 1;
            }
        }
    }
    println!("{} duplicate blob(s).", total.to_string().bold());
    Ok(())
}

fn cmd_gc(manager: &PersistenceManager, args: &GcArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reports = if args.dry_run {
        by_kind(&args.kind, |kind| Ok(manager.audit(kind)?.gc_preview()))?
    } else {
        by_kind(&args.kind, |kind| Ok(manager.collect_garbage(kind)?))?
    };
    if format == OutputFormat::Json {
        return print_json(&reports);
    }
    let verb = if args.dry_run { "would remove" } else { "removed" };
    for (kind, report) in &reports {
        println!(
            "{:<18} {} {} duplicate(s), {} unreferenced blob(s), {} empty record(s)",
            kind.bold(),
            verb,
            report.duplicates_removed,
            report.blobs_removed,
            report.records_removed,
        );
    }
    let total: usize = reports.values().map(|r| r.total()).sum();
    if args.dry_run {
        println!("Dry run: {} item(s) would be removed.", total.to_string().bold());
    } else {
        println!("{} GC: {} item(s) removed.", "✓".green(), total.to_string().bold());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use stash_catalog::Catalog;
    use stash_crypto::TypeTag;
    use stash_store::BlobStore;
    use stash_types::BlobKey;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// A repository with one intact record, one unreferenced blob and one
    /// empty record, all of kind `data_set`.
    fn messy_repo(dir: &Path) -> PathBuf {
        let config_path = dir.join("stash.toml");
        fs::write(&config_path, "root = \"files\"\ncatalog = \"catalog.json\"\n").unwrap();
        let config = StashConfig::load(Some(&config_path)).unwrap();
        let manager = open(&config).unwrap();

        let store = manager.store();
        let tag = TypeTag::new(Kind::DataSet, "note");
        let mut keys = Vec::new();
        for text in ["kept", "orphan", "lost"] {
            let (bytes, hash) = manager.hasher().encode_and_hash(tag, &text.to_string()).unwrap();
            let key = BlobKey::canonical(Kind::DataSet, &hash);
            store.write(&key, &bytes).unwrap();
            keys.push(key);
        }
        assert_eq!(manager.reconcile_orphan_blobs(Kind::DataSet).unwrap(), 3);

        let orphan_row = manager
            .catalog()
            .filter_by_blob_key_in(Kind::DataSet, &[keys[1].clone()].into_iter().collect())
            .unwrap();
        manager.catalog().delete(Kind::DataSet, &[orphan_row[0].id]).unwrap();
        store.delete(&keys[2]).unwrap();
        config_path
    }

    fn run(config: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["stash", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn audit(config: &Path) -> stash_persist::AuditReport {
        let config = StashConfig::load(Some(config)).unwrap();
        open(&config).unwrap().audit(Kind::DataSet).unwrap()
    }

    #[test]
    fn read_only_commands_do_not_modify() {
        let dir = tempfile::tempdir().unwrap();
        let config = messy_repo(dir.path());
        for cmd in ["status", "unreferenced", "empty", "duplicates"] {
            run(&config, &[cmd]).unwrap();
            run(&config, &[cmd, "--format", "json", "--kind", "datasets"]).unwrap();
        }
        run(&config, &["gc", "--dry-run"]).unwrap();

        let report = audit(&config);
        assert_eq!(report.unreferenced.len(), 1);
        assert_eq!(report.empty.len(), 1);
    }

    #[test]
    fn gc_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = messy_repo(dir.path());
        run(&config, &["gc", "--kind", "data_set"]).unwrap();

        let report = audit(&config);
        assert!(report.is_clean());
        assert_eq!(report.record_count, 1);
        assert_eq!(report.blob_count, 1);
    }

    #[test]
    fn reconcile_then_delete_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = messy_repo(dir.path());
        run(&config, &["reconcile"]).unwrap();
        run(&config, &["delete-empty", "--format", "json"]).unwrap();

        let report = audit(&config);
        assert!(report.is_clean());
        assert_eq!(report.record_count, 2);
    }

    #[test]
    fn delete_unreferenced_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let config = messy_repo(dir.path());
        run(&config, &["delete-unreferenced", "-k", "data-set"]).unwrap();
        assert!(audit(&config).unreferenced.is_empty());
    }

    #[test]
    fn unknown_kind_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["stash", "status", "--kind", "model"]).is_err());
    }
}
