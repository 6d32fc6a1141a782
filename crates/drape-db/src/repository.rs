//! Search and outfit repository for PostgreSQL.
//!
//! # Testing
//!
//! Tests here cover row conversion and grouping only. The SQL paths need a
//! live PostgreSQL instance and are exercised through `drape init-db` and
//! `drape recommend`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use drape_core::error::AppError;
use drape_core::models::{
    ClothingRecommendation, NewSearch, OutfitVerdict, SearchRecord, TimeOfDay,
};
use drape_core::ports::SearchStore;
use sqlx::{PgPool, Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Column list for recommendation SELECTs. Must remain a const literal to
/// ensure SQL safety since format!() bypasses sqlx compile-time validation.
const RECOMMENDATION_COLUMNS: &str = "search_id, forecast_time, time_of_day, temperature, weather_description, location, advice_text, shopping_link, icon_url, fallback_note";

/// Repository for searches, their recommendations and outfit verdicts.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use drape_db::SearchRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/drape")
///     .await?;
///
/// let repo = SearchRepository::new(pool);
/// repo.ensure_schema().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SearchRepository {
    pool: Pool<Postgres>,
}

impl SearchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    async fn recommendations_for(
        &self,
        search_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<ClothingRecommendation>>, AppError> {
        if search_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            "SELECT {} FROM recommendations WHERE search_id = ANY($1) ORDER BY search_id, position",
            RECOMMENDATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecommendationRow>(&query)
            .bind(search_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        group_by_search(rows)
    }
}

#[async_trait]
impl SearchStore for SearchRepository {
    async fn create_search(&self, search: &NewSearch) -> Result<Uuid, AppError> {
        let rec: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO searches (user_id, location_label, start_date, end_date, lat, lon)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&search.user_id)
        .bind(&search.location_label)
        .bind(search.start_date)
        .bind(search.end_date)
        .bind(search.lat)
        .bind(search.lon)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    async fn add_recommendations(
        &self,
        search_id: Uuid,
        recommendations: &[ClothingRecommendation],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        for (position, rec) in recommendations.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO recommendations (
                    search_id,
                    position,
                    forecast_time,
                    time_of_day,
                    temperature,
                    weather_description,
                    location,
                    advice_text,
                    shopping_link,
                    icon_url,
                    fallback_note
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(search_id)
            .bind(position as i32)
            .bind(rec.timestamp)
            .bind(rec.time_of_day.as_str())
            .bind(rec.temperature_celsius)
            .bind(&rec.weather_description)
            .bind(&rec.location)
            .bind(&rec.advice_text)
            .bind(&rec.shopping_link)
            .bind(&rec.icon_url)
            .bind(&rec.fallback_note)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?;
        }

        tx.commit().await.map_err(AppError::DatabaseError)?;
        Ok(())
    }

    async fn upsert_outfit_analysis(
        &self,
        user_id: &str,
        image_url: &str,
        verdict: &OutfitVerdict,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_outfits (user_id, image_url, is_appropriate, feedback)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, image_url)
            DO UPDATE SET
                is_appropriate = EXCLUDED.is_appropriate,
                feedback = EXCLUDED.feedback,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(image_url)
        .bind(verdict.is_appropriate)
        .bind(&verdict.feedback_text)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    async fn list_recent_searches(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, AppError> {
        let searches: Vec<SearchRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, location_label, start_date, end_date, lat, lon, created_at
            FROM searches
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        let ids: Vec<Uuid> = searches.iter().map(|s| s.id).collect();
        let mut grouped = self.recommendations_for(&ids).await?;

        Ok(searches
            .into_iter()
            .map(|row| {
                let recommendations = grouped.remove(&row.id).unwrap_or_default();
                row.into_record(recommendations)
            })
            .collect())
    }
}

/// Buckets recommendation rows by search, keeping row order within a search.
fn group_by_search(
    rows: Vec<RecommendationRow>,
) -> Result<HashMap<Uuid, Vec<ClothingRecommendation>>, AppError> {
    let mut grouped: HashMap<Uuid, Vec<ClothingRecommendation>> = HashMap::new();
    for row in rows {
        let search_id = row.search_id;
        grouped
            .entry(search_id)
            .or_default()
            .push(row.into_recommendation()?);
    }
    Ok(grouped)
}

/// Helper struct for deserializing search rows
#[derive(sqlx::FromRow)]
struct SearchRow {
    id: Uuid,
    user_id: Option<String>,
    location_label: String,
    start_date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
    lat: Option<f64>,
    lon: Option<f64>,
    created_at: DateTime<Utc>,
}

impl SearchRow {
    fn into_record(self, recommendations: Vec<ClothingRecommendation>) -> SearchRecord {
        SearchRecord {
            id: self.id,
            user_id: self.user_id,
            location_label: self.location_label,
            start_date: self.start_date,
            end_date: self.end_date,
            lat: self.lat,
            lon: self.lon,
            recommendations,
            created_at: self.created_at,
        }
    }
}

/// Helper struct for deserializing recommendation rows
#[derive(sqlx::FromRow)]
struct RecommendationRow {
    search_id: Uuid,
    forecast_time: NaiveDateTime,
    time_of_day: String,
    temperature: f64,
    weather_description: String,
    location: String,
    advice_text: String,
    shopping_link: String,
    icon_url: String,
    fallback_note: Option<String>,
}

impl RecommendationRow {
    fn into_recommendation(self) -> Result<ClothingRecommendation, AppError> {
        let time_of_day: TimeOfDay = self.time_of_day.parse()?;
        Ok(ClothingRecommendation {
            timestamp: self.forecast_time,
            time_of_day,
            temperature_celsius: self.temperature,
            weather_description: self.weather_description,
            location: self.location,
            advice_text: self.advice_text,
            shopping_link: self.shopping_link,
            icon_url: self.icon_url,
            fallback_note: self.fallback_note,
        })
    }
}
