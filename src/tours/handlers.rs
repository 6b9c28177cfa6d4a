use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::ApiError,
    state::AppState,
    tours::{
        dto::{
            sort_clause, CreateTourRequest, ListToursQuery, StatsEnvelope, StatsResponse,
            TourEnvelope, TourResponse, ToursEnvelope, ToursListResponse, UpdateTourRequest,
        },
        model::{Difficulty, Tour},
        repo::TourFilter,
    },
};

/// Path ids are parsed by hand so a malformed id reads as the validation
/// error it is, with the offending value in the message.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid id: {raw}")))
}

fn parse_difficulty(raw: String) -> Result<Difficulty, ApiError> {
    Difficulty::try_from(raw).map_err(|e| ApiError::validation(e.to_string()))
}

#[instrument(skip(state))]
pub async fn list_tours(
    State(state): State<AppState>,
    Query(query): Query<ListToursQuery>,
) -> Result<Json<ToursListResponse>, ApiError> {
    let order_by = sort_clause(&query.sort)
        .ok_or_else(|| ApiError::validation(format!("Cannot sort by: {}", query.sort)))?;

    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);
    let filter = TourFilter {
        difficulty: query.difficulty.map(parse_difficulty).transpose()?,
        duration: query.duration,
        max_group_size: query.max_group_size,
        price_gte: query.price_gte,
        price_lte: query.price_lte,
        ratings_gte: query.ratings_gte,
        order_by,
        limit,
        offset: (page - 1) * limit,
    };

    let tours = Tour::list(&state.db, &filter).await?;
    Ok(Json(ToursListResponse {
        status: "success",
        results: tours.len(),
        data: ToursEnvelope { tours },
    }))
}

#[instrument(skip(state))]
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TourResponse>, ApiError> {
    let id = parse_id(&id)?;
    let tour = Tour::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("No tour found with that ID"))?;
    Ok(Json(TourResponse {
        status: "success",
        data: TourEnvelope { tour },
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_tour(
    State(state): State<AppState>,
    Json(payload): Json<CreateTourRequest>,
) -> Result<(StatusCode, Json<TourResponse>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("A tour must have a name"));
    }
    if payload.price <= 0.0 {
        return Err(ApiError::validation("A tour price must be positive"));
    }
    let difficulty = parse_difficulty(payload.difficulty)?;

    let tour = Tour::create(
        &state.db,
        payload.name.trim(),
        payload.duration,
        payload.max_group_size,
        difficulty,
        payload.price,
        payload.price_discount,
        &payload.summary,
        &payload.description,
        &payload.image_cover,
        &payload.images,
        &payload.start_dates,
        payload.secret_tour,
    )
    .await?;

    info!(tour_id = %tour.id, name = %tour.name, "tour created");
    Ok((
        StatusCode::CREATED,
        Json(TourResponse {
            status: "success",
            data: TourEnvelope { tour },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTourRequest>,
) -> Result<Json<TourResponse>, ApiError> {
    let id = parse_id(&id)?;
    let difficulty = payload.difficulty.map(parse_difficulty).transpose()?;

    let tour = Tour::update(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.duration,
        payload.max_group_size,
        difficulty,
        payload.price,
        payload.price_discount,
        payload.summary.as_deref(),
        payload.description.as_deref(),
        payload.image_cover.as_deref(),
        payload.images.as_deref(),
        payload.start_dates.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("No tour found with that ID"))?;

    info!(tour_id = %tour.id, "tour updated");
    Ok(Json(TourResponse {
        status: "success",
        data: TourEnvelope { tour },
    }))
}

#[instrument(skip(state))]
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !Tour::delete(&state.db, id).await? {
        return Err(ApiError::not_found("No tour found with that ID"));
    }
    info!(tour_id = %id, "tour deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn tour_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = Tour::stats(&state.db).await?;
    Ok(Json(StatsResponse {
        status: "success",
        data: StatsEnvelope { stats },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_reports_the_bad_value() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
        assert!(parse_id("b7f9d8a0-3c2e-4f5a-9b1c-2d3e4f5a6b7c").is_ok());
    }
}
