use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod categories;
mod debts;
mod events;
mod family;
mod history;
mod household;
mod orders;
mod profile;
mod server;

pub mod types {
    pub mod family {
        pub use api_types::family::{FamilyJoin, FamilyNew, FamilyView};
    }

    pub mod user {
        pub use api_types::user::{ProfileUpdate, ProfileView, Signup, SignupCreated, UserView};
    }

    pub mod household {
        pub use api_types::household::{
            HouseholdListResponse, HouseholdTransactionNew, HouseholdTransactionUpdate,
            HouseholdTransactionView, ListQuery, SummaryQuery, SummaryView,
        };
    }

    pub mod category {
        pub use api_types::category::{CategoriesResponse, CategoryNew, CategoryUpdate, CategoryView};
    }

    pub mod order {
        pub use api_types::order::{
            ExpenseNew, ExpenseView, OrderDetailResponse, OrderListResponse, OrderNew,
            OrderUpdate, OrderView,
        };
    }

    pub mod debt {
        pub use api_types::debt::{
            DebtDetailResponse, DebtListResponse, DebtNew, DebtUpdate, DebtView, PaymentNew,
            PaymentView,
        };
    }

    pub mod history {
        pub use api_types::history::{HistoryQuery, HistoryResponse, HistoryView};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound(_) | EngineError::FamilyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::AlreadyInFamily(_)
        | EngineError::RoleSlotTaken(_)
        | EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        EngineError::Timeout(_) | EngineError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidCursor(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::ProfileProvisioningFailed(_)
        | EngineError::RefreshFailed(_)
        | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Role;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::NotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn family_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::FamilyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn role_slot_taken_maps_to_409() {
        let res = ServerError::from(EngineError::RoleSlotTaken(Role::Ayah)).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn already_in_family_maps_to_409() {
        let res = ServerError::from(EngineError::AlreadyInFamily("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn permission_denied_maps_to_403() {
        let res =
            ServerError::from(EngineError::PermissionDenied("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn timeout_maps_to_503() {
        let res = ServerError::from(EngineError::Timeout("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
