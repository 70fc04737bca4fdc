use embedsync_core::{CanonicalPost, CoreError, DatabaseError, ExistingPost, PostStore};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, error, info};


static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 5;

const SELECT_EXISTING: &str =
    "SELECT import_link, provider_name, video_id FROM video WHERE import_link IN (";

const INSERT_VIDEOS: &str = "INSERT INTO video \
    (import_link, provider_name, video_id, post_type, title, description, upload_time, last_sync) ";

#[derive(Debug, sqlx::FromRow)]
struct ExistingRow {
    import_link: String,
    provider_name: Option<String>,
    video_id: Option<String>,
}

impl From<ExistingRow> for ExistingPost {
    fn from(row: ExistingRow) -> Self {
        Self {
            import_link: row.import_link,
            provider_name: row.provider_name,
            video_id: row.video_id,
        }
    }
}

/// PostgreSQL-backed post table.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                }
            })?;

        info!("Connected to database");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        MIGRATOR.run(&self.pool).await.map_err(|e| {
            error!("Failed to run migrations: {}", e);
            DatabaseError::MigrationFailed {
                migration: e.to_string(),
            }
        })?;
        debug!("Database migrations are up to date");
        Ok(())
    }

    pub async fn find_existing(
        &self,
        posts: &[CanonicalPost],
    ) -> Result<Vec<ExistingPost>, CoreError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let (mut query, params) = existing_query(posts);
        let sql = query.sql().to_string();
        let rows = query
            .build_query_as::<ExistingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(e, sql, &params))?;

        debug!("{} of {} candidate post(s) already stored", rows.len(), posts.len());
        Ok(rows.into_iter().map(ExistingPost::from).collect())
    }

    pub async fn insert_posts(&self, posts: &[CanonicalPost]) -> Result<u64, CoreError> {
        if posts.is_empty() {
            return Ok(0);
        }

        let (mut query, params) = insert_query(posts);
        let sql = query.sql().to_string();
        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(e, sql, &params))?;

        info!("Inserted {} post(s)", result.rows_affected());
        Ok(result.rows_affected())
    }
}

impl PostStore for Database {
    async fn find_existing(
        &self,
        posts: &[CanonicalPost],
    ) -> Result<Vec<ExistingPost>, CoreError> {
        Database::find_existing(self, posts).await
    }

    async fn insert_posts(&self, posts: &[CanonicalPost]) -> Result<u64, CoreError> {
        Database::insert_posts(self, posts).await
    }
}

/// Selects rows sharing a link with any post, or a provider and video id with
/// any post that has both. `posts` must not be empty. Returns the bound values
/// alongside the query, in placeholder order.
fn existing_query(posts: &[CanonicalPost]) -> (QueryBuilder<'static, Postgres>, Vec<Value>) {
    let mut query = QueryBuilder::new(SELECT_EXISTING);
    let mut params = Vec::new();

    let mut links = query.separated(", ");
    for post in posts {
        links.push_bind(post.link.clone());
        params.push(json!(post.link));
    }
    links.push_unseparated(")");

    let pairs: Vec<(String, String)> = posts
        .iter()
        .filter_map(|post| {
            let provider = post.provider_name.as_ref().filter(|p| !p.is_empty())?;
            let id = post.resource_id.as_ref().filter(|id| !id.is_empty())?;
            Some((provider.clone(), id.clone()))
        })
        .collect();

    if !pairs.is_empty() {
        query.push(" OR (provider_name, video_id) IN");
        query.push_tuples(pairs, |mut tuple, (provider, id)| {
            params.push(json!(provider));
            params.push(json!(id));
            tuple.push_bind(provider).push_bind(id);
        });
    }

    (query, params)
}

/// One multi-row insert covering every post. `posts` must not be empty.
fn insert_query(posts: &[CanonicalPost]) -> (QueryBuilder<'static, Postgres>, Vec<Value>) {
    let mut query = QueryBuilder::new(INSERT_VIDEOS);
    let mut params = Vec::new();
    query.push_values(posts, |mut row, post| {
        params.extend([
            json!(post.link),
            json!(post.provider_name),
            json!(post.resource_id),
            json!(post.post_type.as_str()),
            json!(post.title),
            json!(post.description),
            json!(post.publish_time),
            json!(post.last_sync_time),
        ]);
        row.push_bind(post.link.clone())
            .push_bind(post.provider_name.clone())
            .push_bind(post.resource_id.clone())
            .push_bind(post.post_type.as_str().to_string())
            .push_bind(post.title.clone())
            .push_bind(post.description.clone())
            .push_bind(post.publish_time.clone())
            .push_unseparated("::timestamptz")
            .push_bind(post.last_sync_time.clone())
            .push_unseparated("::timestamptz");
    });
    (query, params)
}

fn query_error(e: sqlx::Error, sql: String, params: &[Value]) -> CoreError {
    error!(
        "Query failed: {}\nquery: {}\nparams: {}",
        e,
        sql,
        serde_json::Value::from(params)
    );

    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::ConstraintViolation {
                constraint: db.constraint().unwrap_or("unique").to_string(),
            }
            .into()
        }
        _ => DatabaseError::QueryFailed {
            query: sql,
            reason: e.to_string(),
        }
        .into(),
    }
}
