pub mod dto;
pub mod handlers;
pub mod model;
pub mod repo;

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{delete, get, patch, post},
    Router,
};

use crate::{
    auth::guards::{authenticate, restrict_to},
    state::AppState,
    users::model::Role,
};

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::list_tours))
        .route("/stats", get(handlers::tour_stats))
        .route("/:id", get(handlers::get_tour));

    let protected = Router::new()
        .route("/", post(handlers::create_tour))
        .route("/:id", patch(handlers::update_tour))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let admin = Router::new()
        .route("/:id", delete(handlers::delete_tour))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            restrict_to(&[Role::Admin, Role::LeadGuide], req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new().nest("/tours", public.merge(protected).merge(admin))
}
