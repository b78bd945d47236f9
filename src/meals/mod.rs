pub mod compose;
mod dto;
pub mod handlers;
pub mod model;
mod repo;
mod store;

use axum::Router;

use crate::state::AppState;

pub use compose::{compose, Composition};
pub use model::{Detection, LoggedFoodItem, Meal, MealDraft, MealError};
pub use repo::PgMealStore;
pub use store::{InMemoryMealStore, MealStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
