use std::path::Path;
use std::time::Duration;

use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub mod crud;
pub mod model;

pub use model::*;

pub type Database = SqlitePool;

/// 打开向量数据库并执行迁移
///
/// 多个工作任务会同时提交插入事务，写锁冲突时最多等待 `busy_timeout`
pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    info!("打开向量数据库: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .filename(filename)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(num_cpus::get().max(4) as u32)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}
