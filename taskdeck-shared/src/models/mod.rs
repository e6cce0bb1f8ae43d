/// Database models for TaskDeck
///
/// Each model is a plain struct deriving `sqlx::FromRow` with its queries as
/// associated functions. Queries take any `PgExecutor`, so the same function
/// runs against the pool or inside a transaction.
///
/// # Models
///
/// - `tenant`: Organizations, the unit of isolation
/// - `user`: Accounts and their tenant-level role
/// - `project`: Project containers for tasks
/// - `task`: Tasks, filters and sort orders
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::project::{CreateProject, Project};
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(tenant_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, tenant_id, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod project;
pub mod task;
pub mod tenant;
pub mod user;

/// Serde helper for fields that distinguish "absent" from "null"
///
/// Use with `#[serde(default, deserialize_with = "nullable::deserialize")]` on
/// an `Option<Option<T>>`: a missing key stays `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(v))`.
pub mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    #[cfg(test)]
    mod tests {
        use serde::Deserialize;

        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "super::deserialize")]
            due: Option<Option<String>>,
        }

        #[test]
        fn test_absent_null_and_value() {
            let absent: Patch = serde_json::from_str("{}").unwrap();
            let null: Patch = serde_json::from_str(r#"{"due": null}"#).unwrap();
            let value: Patch = serde_json::from_str(r#"{"due": "2025-01-01"}"#).unwrap();

            assert_eq!(absent.due, None);
            assert_eq!(null.due, Some(None));
            assert_eq!(value.due, Some(Some("2025-01-01".to_string())));
        }
    }
}
