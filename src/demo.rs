//! 示例容器树：App { settings, db { url, pool }, cache { store } }

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{sleep, Duration};

use holder::{BoxError, CloseHandler, ContainerSpec, Factory, Result, Slot};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub pool_size: usize,
}

#[derive(Debug)]
pub struct Pool {
    pub url: String,
    pub size: usize,
}

pub type Store = Mutex<HashMap<String, String>>;

pub fn app_spec(fail_cache_close: bool) -> Result<Arc<ContainerSpec>> {
    let db = ContainerSpec::builder("Database")
        .slot(
            Slot::new(
                "url",
                Factory::sync(|_, root| {
                    let settings = root.resolve_as::<Settings>("settings")?;
                    Ok(settings.database_url.clone())
                }),
            )
            .alias("database_url"),
        )
        .slot(
            Slot::new(
                "pool",
                Factory::from_async(|db, root| async move {
                    let settings = root.resolve_as_async::<Settings>("settings").await?;
                    let url = db.resolve_as_async::<String>("url").await?;
                    // 模拟建立连接
                    sleep(Duration::from_millis(20)).await;
                    Ok::<_, BoxError>(Pool {
                        url: url.as_ref().clone(),
                        size: settings.pool_size,
                    })
                }),
            )
            .alias("pool")
            .on_close(CloseHandler::from_async(|owner, _, pool| async move {
                if let Some(pool) = pool.downcast_ref::<Pool>() {
                    sleep(Duration::from_millis(5)).await;
                    println!("closed pool of {} connection(s) to {} (owner: {})", pool.size, pool.url, owner.qualified_name());
                }
                Ok::<_, BoxError>(())
            })),
        )
        .build()?;

    let cache = ContainerSpec::builder("Cache")
        .slot(
            Slot::new("store", Factory::sync(|_, _| Ok(Store::default())))
                .alias("cache")
                .on_close(CloseHandler::sync(move |owner, _, store| {
                    if fail_cache_close {
                        return Err("cache flush refused".into());
                    }
                    let entries = store.downcast_ref::<Store>().map(|s| s.lock().len()).unwrap_or(0);
                    println!("flushed {entries} cache entr(ies) (owner: {})", owner.qualified_name());
                    Ok(())
                })),
        )
        .build()?;

    ContainerSpec::builder("App")
        .slot(
            Slot::new(
                "settings",
                Factory::value(Settings {
                    database_url: "postgres://localhost/holder".to_string(),
                    pool_size: 4,
                }),
            )
            .readonly()
            .alias("settings"),
        )
        .child("db", db)
        .child("cache", cache)
        .build()
}
