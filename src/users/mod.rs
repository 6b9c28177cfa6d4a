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
    auth::{
        guards::{authenticate, restrict_to},
        handlers as auth_handlers,
    },
    state::AppState,
    users::model::Role,
};

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
        .route("/forgotPassword", post(auth_handlers::forgot_password))
        .route("/resetPassword/:token", patch(auth_handlers::reset_password));

    let protected = Router::new()
        .route("/updatePassword", patch(auth_handlers::update_password))
        .route("/updateMe", patch(handlers::update_me))
        .route("/deleteMe", delete(handlers::delete_me))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let admin = Router::new()
        .route("/", get(handlers::list_users))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            restrict_to(&[Role::Admin], req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new().nest("/users", public.merge(protected).merge(admin))
}
