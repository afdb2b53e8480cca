use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::Result;

const SCHEMA: &str = include_str!("../schema.sql");

/// Connect to Postgres and make sure every table exists. The schema is a
/// set of idempotent `CREATE TABLE IF NOT EXISTS` statements, so running it
/// on every startup is safe.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    info!("Connected to Postgres and verified schema");

    Ok(pool)
}

/// Discord snowflakes are u64 but Postgres only has signed BIGINT, so ids
/// round-trip through a bit-preserving cast.
pub fn encode_id(id: u64) -> i64 {
    id as i64
}

pub fn decode_id(id: i64) -> u64 {
    id as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_round_trip() {
        for id in [0u64, 1, 1238173217760219250, u64::MAX] {
            assert_eq!(decode_id(encode_id(id)), id);
        }
    }

    #[test]
    fn large_snowflakes_wrap_into_negative_bigints() {
        // Ids above i64::MAX must still store without loss.
        let id = u64::MAX - 5;
        assert!(encode_id(id) < 0);
        assert_eq!(decode_id(encode_id(id)), id);
    }
}
