use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::VectorRecord;

/// 添加向量记录
pub async fn add_vector<'c, E>(executor: E, id: &str, vector: &[u8], inserted_at: i64) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO image_vector (id, vector, inserted_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(vector)
    .bind(inserted_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// 删除向量记录，返回被删除的行数
pub async fn delete_vector(executor: &SqlitePool, id: &str) -> Result<u64> {
    let result = sqlx::query(r#"DELETE FROM image_vector WHERE id = ?"#)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// 按 rowid 顺序读取 `after` 之后的向量记录
///
/// 以上一页最后一行的 `row_id` 作为下一页的 `after`，翻页之间的删除不会导致漏读
pub async fn get_vectors(executor: &SqlitePool, after: i64, limit: usize) -> Result<Vec<VectorRecord>> {
    sqlx::query_as::<_, VectorRecord>(
        r#"
        SELECT rowid AS row_id, id, vector FROM image_vector
        WHERE rowid > ?
        ORDER BY rowid
        LIMIT ?
        "#,
    )
    .bind(after)
    .bind(limit as i64)
    .fetch_all(executor)
    .await
}

/// 查询向量数量
pub async fn count_vectors(executor: &SqlitePool) -> Result<u64> {
    let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM image_vector"#)
        .fetch_one(executor)
        .await?;

    Ok(count as u64)
}

/// 读取元数据
pub async fn get_meta(executor: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(r#"SELECT value FROM meta WHERE key = ?"#)
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|(value,)| value))
}

/// 写入元数据
pub async fn set_meta(executor: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meta (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}
