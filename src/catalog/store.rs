/// SQLite-backed photo catalog
use crate::{
    catalog::MetadataStore,
    db::{
        self,
        photo::{PhotoMetadata, PhotoRecord},
    },
    error::{CatalogError, CatalogResult},
};
use async_trait::async_trait;
use sqlx::{
    query::Query,
    sqlite::{Sqlite, SqliteArguments},
    SqlitePool,
};

const SELECT_RECORD: &str = r#"
    SELECT id, title, path, thumbnail_path100, thumbnail_path350, star_rating,
           country, area, locality, date_time_original, add_timestamp,
           lens_model, model, exposure_time, f_number, focal_len_in35mm_film,
           focal_length, iso_speed_ratings, altitude, latitude, longitude,
           object_name, caption
    FROM photos
"#;

const INSERT_RECORD: &str = r#"
    INSERT INTO photos (
        id, title, path, thumbnail_path100, thumbnail_path350, star_rating,
        country, area, locality, date_time_original, add_timestamp,
        lens_model, model, exposure_time, f_number, focal_len_in35mm_film,
        focal_length, iso_speed_ratings, altitude, latitude, longitude,
        object_name, caption
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
              ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
"#;

const UPSERT_CONFLICT: &str = r#"
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        path = excluded.path,
        thumbnail_path100 = excluded.thumbnail_path100,
        thumbnail_path350 = excluded.thumbnail_path350,
        star_rating = excluded.star_rating,
        country = excluded.country,
        area = excluded.area,
        locality = excluded.locality,
        date_time_original = excluded.date_time_original,
        add_timestamp = excluded.add_timestamp,
        lens_model = excluded.lens_model,
        model = excluded.model,
        exposure_time = excluded.exposure_time,
        f_number = excluded.f_number,
        focal_len_in35mm_film = excluded.focal_len_in35mm_film,
        focal_length = excluded.focal_length,
        iso_speed_ratings = excluded.iso_speed_ratings,
        altitude = excluded.altitude,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        object_name = excluded.object_name,
        caption = excluded.caption
"#;

const UPDATE_RECORD: &str = r#"
    UPDATE photos SET
        title = ?2, path = ?3, thumbnail_path100 = ?4, thumbnail_path350 = ?5,
        star_rating = ?6, country = ?7, area = ?8, locality = ?9,
        date_time_original = ?10, add_timestamp = ?11, lens_model = ?12,
        model = ?13, exposure_time = ?14, f_number = ?15,
        focal_len_in35mm_film = ?16, focal_length = ?17,
        iso_speed_ratings = ?18, altitude = ?19, latitude = ?20,
        longitude = ?21, object_name = ?22, caption = ?23
    WHERE id = ?1
"#;

/// Photo catalog over a SQLite pool
#[derive(Clone)]
pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Catalog over a fresh, migrated in-memory database
    pub async fn in_memory() -> CatalogResult<Self> {
        Ok(Self::new(db::create_memory_pool().await?))
    }

    /// List records, newest capture first
    pub async fn list(&self, limit: i64, offset: i64) -> CatalogResult<Vec<PhotoRecord>> {
        let sql = format!(
            "{} ORDER BY date_time_original DESC LIMIT ?1 OFFSET ?2",
            SELECT_RECORD
        );

        let records = sqlx::query_as::<_, PhotoRecord>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        Ok(records)
    }

    /// Insert a new record; a duplicate id is a conflict
    pub async fn insert(&self, record: &PhotoRecord) -> CatalogResult<()> {
        bind_record(sqlx::query(INSERT_RECORD), record)
            .execute(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    CatalogError::Conflict(format!("Photo already exists: {}", record.id))
                }
                other => CatalogError::Database(other),
            })?;

        Ok(())
    }

    /// Replace every field of an existing record
    ///
    /// The id in the path wins over any id carried in `record`. Returns
    /// false if no such record exists.
    pub async fn update(&self, id: &str, record: &PhotoRecord) -> CatalogResult<bool> {
        let record = PhotoRecord {
            id: id.to_string(),
            ..record.clone()
        };

        let result = bind_record(sqlx::query(UPDATE_RECORD), &record)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or overwrite a record
    pub async fn upsert(&self, record: &PhotoRecord) -> CatalogResult<()> {
        let sql = format!("{} {}", INSERT_RECORD, UPSERT_CONFLICT);

        bind_record(sqlx::query(&sql), record)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Fetch the reduced metadata projection for one record
    pub async fn get_metadata(&self, id: &str) -> CatalogResult<Option<PhotoMetadata>> {
        let metadata = sqlx::query_as::<_, PhotoMetadata>(
            r#"
            SELECT id, title, path, date_time_original, latitude, longitude, object_name
            FROM photos
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(metadata)
    }
}

#[async_trait]
impl MetadataStore for SqliteCatalog {
    async fn get_by_id(&self, id: &str) -> CatalogResult<Option<PhotoRecord>> {
        let sql = format!("{} WHERE id = ?1", SELECT_RECORD);

        let record = sqlx::query_as::<_, PhotoRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(record)
    }

    async fn count(&self) -> CatalogResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos")
            .fetch_one(&self.db)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn delete_by_id(&self, id: &str) -> CatalogResult<bool> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        let result = sqlx::query("DELETE FROM photos").execute(&self.db).await?;

        Ok(result.rows_affected())
    }
}

/// Bind every column in table order (`?1` = id ... `?23` = caption)
fn bind_record<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    record: &'q PhotoRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.path)
        .bind(&record.thumbnail_path100)
        .bind(&record.thumbnail_path350)
        .bind(record.star_rating)
        .bind(&record.country)
        .bind(&record.area)
        .bind(&record.locality)
        .bind(&record.date_time_original)
        .bind(&record.add_timestamp)
        .bind(&record.lens_model)
        .bind(&record.model)
        .bind(record.exposure_time)
        .bind(record.f_number)
        .bind(record.focal_len_in35mm_film)
        .bind(record.focal_length)
        .bind(record.iso_speed_ratings)
        .bind(record.altitude)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(&record.object_name)
        .bind(&record.caption)
}
