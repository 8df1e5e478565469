//! Persistence port
//!
//! Stores a decoded envelope as two related rows: the person record and a
//! provenance row referencing it. Both inserts run in one transaction, so
//! a row pair is either fully committed or not present at all. The port
//! does not retry; retry policy belongs to the caller.

use async_trait::async_trait;
use chrono::Utc;
use person_contracts::{Person, PersonEnvelope};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Failures of the persistence port.
///
/// Connectivity problems and constraint violations both surface here as
/// typed errors; nothing from the underlying store panics past this
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for validated envelopes.
///
/// `save` returns the generated person id on success. The subject the
/// message was consumed from is part of the provenance row.
#[async_trait]
pub trait PersonStore: Send + Sync {
    async fn save(&self, envelope: &PersonEnvelope, subject: &str) -> Result<Uuid, PersistError>;
}

/// Postgres-backed implementation of [`PersonStore`].
pub struct PgPersonStore {
    pool: PgPool,
    /// Worker host identity recorded as the `consumer` of each envelope
    consumer_identity: String,
}

impl PgPersonStore {
    pub fn new(pool: PgPool, consumer_identity: String) -> Self {
        Self {
            pool,
            consumer_identity,
        }
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    async fn save(&self, envelope: &PersonEnvelope, subject: &str) -> Result<Uuid, PersistError> {
        // Connection is acquired from the pool for the scope of this
        // transaction and released on every exit path, including errors.
        let mut tx = self.pool.begin().await?;

        let person_id = insert_person(&mut tx, &envelope.person).await?;
        insert_provenance(&mut tx, person_id, envelope, subject, &self.consumer_identity).await?;

        tx.commit().await?;

        Ok(person_id)
    }
}

async fn insert_person(
    tx: &mut Transaction<'_, Postgres>,
    person: &Person,
) -> Result<Uuid, sqlx::Error> {
    let person_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO person (id, name, age, email, address, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(person_id)
    .bind(&person.name)
    .bind(person.age)
    .bind(&person.email)
    .bind(&person.address)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(person_id)
}

async fn insert_provenance(
    tx: &mut Transaction<'_, Postgres>,
    person_id: Uuid,
    envelope: &PersonEnvelope,
    subject: &str,
    consumer_identity: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO person_envelope
            (id, person_id, correlation_id, producer, consumer, subject, kernel, framework, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(person_id)
    .bind(envelope.correlation_id.as_deref())
    .bind(envelope.producer.as_deref())
    .bind(consumer_identity)
    .bind(subject)
    .bind(envelope.kernel.as_deref())
    .bind(envelope.framework.as_deref())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use person_contracts::Person;

    fn sample_envelope() -> PersonEnvelope {
        PersonEnvelope {
            person: Person {
                name: "Ada".to_string(),
                age: 30,
                email: "a@x.io".to_string(),
                address: "1 Main St".to_string(),
            },
            correlation_id: Some("c1".to_string()),
            producer: Some("person-api".to_string()),
            kernel: Some("linux x86_64".to_string()),
            framework: Some("rust/tokio".to_string()),
        }
    }

    // Requires Postgres; run with DATABASE_URL set and migrations applied:
    // cargo test -p person-worker -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_save_commits_record_and_provenance_together() {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&database_url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let store = PgPersonStore::new(pool.clone(), "test-host".to_string());
        let person_id = store
            .save(&sample_envelope(), "person.registered")
            .await
            .unwrap();

        let (name, age): (String, i32) =
            sqlx::query_as("SELECT name, age FROM person WHERE id = $1")
                .bind(person_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(age, 30);

        let (correlation_id, consumer, subject): (Option<String>, String, String) = sqlx::query_as(
            "SELECT correlation_id, consumer, subject FROM person_envelope WHERE person_id = $1",
        )
        .bind(person_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(correlation_id.as_deref(), Some("c1"));
        assert_eq!(consumer, "test-host");
        assert_eq!(subject, "person.registered");
    }
}
