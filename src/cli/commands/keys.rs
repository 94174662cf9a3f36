//! Key maintenance commands. These work on the data directory directly,
//! so they are best run while the server is stopped.

use crate::config::Config;
use crate::db::{ContentStore, Document, Store};
use crate::domain::{KeyRecord, UNLIMITED_DURATION};
use crate::listing::{KeySort, sort_keys};
use crate::services::{JsonKeyService, KeyService};

fn key_service(config: &Config) -> (Store, JsonKeyService) {
    let data_dir = config.data_dir();
    let store = Store::new(&data_dir);
    let service = JsonKeyService::new(
        store.clone(),
        ContentStore::new(&data_dir),
        config.listing.admin_keys,
    );
    (store, service)
}

fn describe_duration(duration_hours: i64) -> String {
    if duration_hours == UNLIMITED_DURATION {
        "unlimited".to_string()
    } else {
        format!("{duration_hours}h")
    }
}

pub async fn cmd_keys_generate(config: &Config, count: usize, duration: i64) -> anyhow::Result<()> {
    let (store, service) = key_service(config);
    store.ensure_layout().await?;

    let keys = service.generate(count, duration).await?;

    println!("Generated {} key(s), {} each:", keys.len(), describe_duration(duration));
    for key in &keys {
        println!("  {}", key.code);
    }
    Ok(())
}

pub async fn cmd_keys_list(config: &Config, sort: Option<&str>) -> anyhow::Result<()> {
    let sort: KeySort = match sort {
        Some(raw) => raw.parse()?,
        None => KeySort::default(),
    };

    let (store, _) = key_service(config);
    let mut keys: Vec<KeyRecord> = store.load(Document::Keys).await;

    if keys.is_empty() {
        println!("No keys yet.");
        println!();
        println!("Create some with: keymark keys generate --count 10");
        return Ok(());
    }

    sort_keys(&mut keys, sort);

    println!("Keys ({} total, {})", keys.len(), sort.as_str());
    println!("{:-<78}", "");
    for key in &keys {
        println!(
            "{:<12} {:<8} {:>10}  {}",
            key.code,
            key.status.as_str(),
            describe_duration(key.duration_hours),
            key.bound_article_id.as_deref().unwrap_or("-"),
        );
        if let Some(expire) = key.expire_time {
            println!(
                "             expires {} | devices: {}",
                expire.format("%Y-%m-%d %H:%M:%S UTC"),
                key.fingerprints.len()
            );
        }
    }
    Ok(())
}

pub async fn cmd_keys_make_unlimited(config: &Config) -> anyhow::Result<()> {
    let (_, service) = key_service(config);
    let changed = service.make_unlimited().await?;
    println!("Updated {changed} key(s) to unlimited duration.");
    Ok(())
}

pub async fn cmd_keys_purge_orphans(config: &Config) -> anyhow::Result<()> {
    let (_, service) = key_service(config);
    let removed = service.purge_orphans().await?;

    if removed.is_empty() {
        println!("No orphaned keys found.");
    } else {
        println!("Deleted {} orphaned key(s):", removed.len());
        for code in &removed {
            println!("  {code}");
        }
    }
    Ok(())
}
