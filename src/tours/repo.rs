use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::tours::model::{slugify, Difficulty, Tour};

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
     ratings_average, ratings_quantity, price, price_discount, summary, description, \
     image_cover, images, start_dates, secret_tour, created_at";

/// Validated list filter. `order_by` is always one of the whitelisted clauses
/// from `dto::sort_clause`, never raw input.
#[derive(Debug)]
pub struct TourFilter {
    pub difficulty: Option<Difficulty>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub price_gte: Option<f64>,
    pub price_lte: Option<f64>,
    pub ratings_gte: Option<f64>,
    pub order_by: &'static str,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregation row for GET /tours/stats.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TourStats {
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

impl Tour {
    /// Secret tours are excluded from every read path.
    pub async fn list(db: &PgPool, filter: &TourFilter) -> Result<Vec<Tour>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE secret_tour = FALSE"
        ));
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty.as_str());
        }
        if let Some(duration) = filter.duration {
            qb.push(" AND duration = ").push_bind(duration);
        }
        if let Some(size) = filter.max_group_size {
            qb.push(" AND max_group_size = ").push_bind(size);
        }
        if let Some(price) = filter.price_gte {
            qb.push(" AND price >= ").push_bind(price);
        }
        if let Some(price) = filter.price_lte {
            qb.push(" AND price <= ").push_bind(price);
        }
        if let Some(rating) = filter.ratings_gte {
            qb.push(" AND ratings_average >= ").push_bind(rating);
        }
        qb.push(" ORDER BY ").push(filter.order_by);
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.offset);

        qb.build_query_as::<Tour>().fetch_all(db).await
    }

    pub async fn get(db: &PgPool, id: Uuid) -> Result<Option<Tour>, sqlx::Error> {
        sqlx::query_as::<_, Tour>(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND secret_tour = FALSE"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        name: &str,
        duration: i32,
        max_group_size: i32,
        difficulty: Difficulty,
        price: f64,
        price_discount: Option<f64>,
        summary: &str,
        description: &str,
        image_cover: &str,
        images: &[String],
        start_dates: &[time::OffsetDateTime],
        secret_tour: bool,
    ) -> Result<Tour, sqlx::Error> {
        sqlx::query_as::<_, Tour>(&format!(
            "INSERT INTO tours (name, slug, duration, max_group_size, difficulty, price,
                                price_discount, summary, description, image_cover, images,
                                start_dates, secret_tour)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {TOUR_COLUMNS}"
        ))
        .bind(name)
        .bind(slugify(name))
        .bind(duration)
        .bind(max_group_size)
        .bind(difficulty.as_str())
        .bind(price)
        .bind(price_discount)
        .bind(summary)
        .bind(description)
        .bind(image_cover)
        .bind(images)
        .bind(start_dates)
        .bind(secret_tour)
        .fetch_one(db)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        duration: Option<i32>,
        max_group_size: Option<i32>,
        difficulty: Option<Difficulty>,
        price: Option<f64>,
        price_discount: Option<f64>,
        summary: Option<&str>,
        description: Option<&str>,
        image_cover: Option<&str>,
        images: Option<&[String]>,
        start_dates: Option<&[time::OffsetDateTime]>,
    ) -> Result<Option<Tour>, sqlx::Error> {
        // Renaming a tour re-derives its slug.
        let slug = name.map(slugify);
        sqlx::query_as::<_, Tour>(&format!(
            "UPDATE tours SET
                 name = COALESCE($2, name),
                 slug = COALESCE($3, slug),
                 duration = COALESCE($4, duration),
                 max_group_size = COALESCE($5, max_group_size),
                 difficulty = COALESCE($6, difficulty),
                 price = COALESCE($7, price),
                 price_discount = COALESCE($8, price_discount),
                 summary = COALESCE($9, summary),
                 description = COALESCE($10, description),
                 image_cover = COALESCE($11, image_cover),
                 images = COALESCE($12, images),
                 start_dates = COALESCE($13, start_dates)
             WHERE id = $1
             RETURNING {TOUR_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(duration)
        .bind(max_group_size)
        .bind(difficulty.map(Difficulty::as_str))
        .bind(price)
        .bind(price_discount)
        .bind(summary)
        .bind(description)
        .bind(image_cover)
        .bind(images)
        .bind(start_dates)
        .fetch_optional(db)
        .await
    }

    /// Hard delete; returns whether a row existed.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tours WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(db: &PgPool) -> Result<Vec<TourStats>, sqlx::Error> {
        sqlx::query_as::<_, TourStats>(
            "SELECT difficulty,
                    COUNT(*) AS num_tours,
                    SUM(ratings_quantity)::BIGINT AS num_ratings,
                    AVG(ratings_average) AS avg_rating,
                    AVG(price) AS avg_price,
                    MIN(price) AS min_price,
                    MAX(price) AS max_price
             FROM tours
             WHERE secret_tour = FALSE
             GROUP BY difficulty
             ORDER BY avg_price",
        )
        .fetch_all(db)
        .await
    }
}
