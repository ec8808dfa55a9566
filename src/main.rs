mod args;
mod demo;

use clap::Parser;

use holder::config::ConfigLoader;
use holder::logging::init_logging;
use holder::{CloseMode, Container, HolderConfig};

use args::Args;
use demo::{Pool, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::new().load_file(path)?,
        None => HolderConfig::load()?,
    };
    if let Some(preset) = args.log_preset {
        config.logging = preset.logging_config();
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    if args.exhaustive {
        config.close_mode = CloseMode::Exhaustive;
    }
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    let spec = demo::app_spec(args.fail_cache_close)?;
    let app = Container::new(&spec);

    for (name, child) in app.children() {
        println!("{name}: {}", child.slot_names().collect::<Vec<_>>().join(", "));
    }
    println!("aliases: {}", app.alias_names().collect::<Vec<_>>().join(", "));

    let pool = app.lookup_as_async::<Pool>("pool").await?;
    println!("pool: {} x {}", pool.url, pool.size);

    let cache = app.lookup_as::<Store>("cache")?;
    cache.lock().insert("greeting".to_string(), "hello".to_string());

    if let Err(err) = app.assign("settings", 0_u8) {
        println!("assign rejected: {err}");
    }

    if args.show_copy {
        let copy = app.copy(["db\\..*"])?;
        println!("copy holds: {}", copy.cached_names().join(", "));
        // 副本只拿到 db.pool 的清理记录，交给它自己的树去排空
        copy.close_async_with(config.close_mode).await?;
    }

    let stats = app.stats();
    println!(
        "resolutions: {}, cache hits: {}, factory calls: {}",
        stats.resolutions, stats.cache_hits, stats.factory_calls
    );

    app.close_async_with(config.close_mode).await?;
    Ok(())
}
