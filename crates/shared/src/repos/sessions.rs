use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::table::DataTable;

use super::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct DataSessionRecord {
    pub id: Uuid,
    pub file_name: String,
    pub table: DataTable,
    pub summary: Value,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Persists an uploaded table as an immutable session snapshot.
    pub async fn create_data_session(
        &self,
        id: Uuid,
        file_name: &str,
        table: &DataTable,
        summary: &Value,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        if ttl_seconds <= 0 {
            return Err(StoreError::InvalidData(
                "data session ttl_seconds must be > 0".to_string(),
            ));
        }

        let table_json = serde_json::to_value(table)
            .map_err(|err| StoreError::InvalidData(format!("table not serializable: {err}")))?;
        let expires_at = now + Duration::seconds(ttl_seconds);

        sqlx::query(
            "INSERT INTO data_sessions (
                id,
                file_name,
                table_json,
                summary_json,
                created_at,
                expires_at
             ) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(file_name)
        .bind(table_json)
        .bind(summary)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_data_session(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<DataSessionRecord>, StoreError> {
        self.purge_expired_data_sessions(now).await?;

        let row = sqlx::query(
            "SELECT id, file_name, table_json, summary_json, created_at
             FROM data_sessions
             WHERE id = $1
               AND expires_at > $2",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let table_json: Value = row.try_get("table_json")?;
            let table = serde_json::from_value::<DataTable>(table_json)
                .map_err(|err| StoreError::InvalidData(format!("session table invalid: {err}")))?;

            Ok(DataSessionRecord {
                id: row.try_get("id")?,
                file_name: row.try_get("file_name")?,
                table,
                summary: row.try_get("summary_json")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// Appends a query and its reply to the session history. Callers treat
    /// failures as non-fatal; the reply has already been computed.
    pub async fn record_query(
        &self,
        session_id: Uuid,
        query: &str,
        response: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO query_history (session_id, query, response, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(query)
        .bind(response)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired_data_sessions(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM data_sessions
             WHERE expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
