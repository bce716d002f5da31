use std::sync::Arc;

use edgecfg::{Category, Context, Environment, MemoryStore};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Stands in for etcd; the store is provisioned from a seed file.
    let store = Arc::new(MemoryStore::from_file("demos/seed.json")?);

    let ctx = Context::builder()
        .with_environment(Environment::from_pairs([
            ("AppName", "VideoIngestion"),
            ("DEV_MODE", "false"),
        ]))
        .with_store(store)
        .export_global_env(false)
        .build()?;

    println!("{} ({} mode)", ctx.app_name(), ctx.mode());

    for category in Category::ALL {
        let Ok(count) = ctx.count(category) else {
            continue;
        };
        for index in 0..count {
            let iface = ctx.interface_at(category, index)?;
            let config = iface.msgbus_config()?;
            println!(
                "\n{category}/{} -> {}\n{}",
                iface.name()?,
                iface.endpoint()?,
                serde_json::to_string_pretty(&config)?
            );
        }
    }

    Ok(())
}
