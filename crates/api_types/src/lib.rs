use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Household role of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ayah,
    Ibu,
}

impl Role {
    /// Returns the canonical role string used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ayah => "ayah",
            Self::Ibu => "ibu",
        }
    }
}

pub mod user {
    use super::*;

    /// Request body for creating an identity (sign-up).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Signup {
        pub email: String,
        pub password: String,
        pub name: String,
        pub role: Option<Role>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignupCreated {
        pub identity_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub name: String,
        pub role: Role,
        pub family_id: Option<Uuid>,
    }

    /// The resolved profile: user plus, when linked, the family.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileView {
        pub user: UserView,
        pub family: Option<super::family::FamilyView>,
    }

    /// Request body for profile updates. Absent fields stay unchanged.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub name: Option<String>,
        pub role: Option<Role>,
    }
}

pub mod family {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FamilyNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FamilyJoin {
        pub family_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FamilyView {
        pub id: Uuid,
        pub name: String,
        pub members: Vec<super::user::UserView>,
    }
}

pub mod household {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FlowKind {
        Income,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdTransactionNew {
        pub kind: FlowKind,
        pub category_id: Option<Uuid>,
        pub amount_minor: i64,
        pub note: Option<String>,
        /// RFC3339 timestamp.
        pub occurred_at: DateTime<Utc>,
    }

    /// Full replacement of the editable fields.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdTransactionUpdate {
        pub kind: FlowKind,
        pub category_id: Option<Uuid>,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdTransactionView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub family_id: Option<Uuid>,
        pub kind: FlowKind,
        pub category_id: Option<Uuid>,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListQuery {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdListResponse {
        pub transactions: Vec<HouseholdTransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub is_default: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoriesResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod order {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderStatus {
        Pending,
        InProgress,
        Done,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderNew {
        pub customer: String,
        pub note: Option<String>,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub ordered_at: DateTime<Utc>,
    }

    /// Full replacement of the editable fields.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderUpdate {
        pub customer: String,
        pub note: Option<String>,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub status: OrderStatus,
        pub ordered_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub family_id: Option<Uuid>,
        pub customer: String,
        pub note: Option<String>,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub status: OrderStatus,
        pub ordered_at: DateTime<Utc>,
        /// Derived: `quantity × unit_price_minor`.
        pub total_income_minor: i64,
        /// Derived: sum of the order's expense rows.
        pub expenses_minor: i64,
        /// Derived: `total_income_minor − expenses_minor`.
        pub profit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderListResponse {
        pub orders: Vec<OrderView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderDetailResponse {
        pub order: OrderView,
        pub expenses: Vec<ExpenseView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub name: String,
        pub amount_minor: i64,
        pub spent_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub order_id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub spent_at: DateTime<Utc>,
    }
}

pub mod debt {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DebtDirection {
        Owed,
        Receivable,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtNew {
        pub counterparty: String,
        pub direction: DebtDirection,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub due_date: Option<DateTime<Utc>>,
        pub occurred_at: DateTime<Utc>,
    }

    /// Full replacement of the editable fields.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtUpdate {
        pub counterparty: String,
        pub direction: DebtDirection,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub due_date: Option<DateTime<Utc>>,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub family_id: Option<Uuid>,
        pub counterparty: String,
        pub direction: DebtDirection,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub due_date: Option<DateTime<Utc>>,
        pub occurred_at: DateTime<Utc>,
        /// Derived: sum of payments.
        pub paid_minor: i64,
        /// Derived: `amount_minor − paid_minor`.
        pub remaining_minor: i64,
        /// Derived: `remaining_minor ≤ 0`.
        pub settled: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtListResponse {
        pub debts: Vec<DebtView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtDetailResponse {
        pub debt: DebtView,
        pub payments: Vec<PaymentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount_minor: i64,
        pub note: Option<String>,
        pub paid_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub debt_id: Uuid,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub paid_at: DateTime<Utc>,
    }
}

pub mod history {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EditAction {
        Created,
        Updated,
        Deleted,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryQuery {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryView {
        pub id: Uuid,
        pub collection: String,
        pub record_id: Uuid,
        pub action: EditAction,
        pub editor_id: Uuid,
        pub at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryResponse {
        pub entries: Vec<HistoryView>,
    }
}

pub mod events {
    use super::*;

    /// One change-feed notification, as streamed to clients. Carries no
    /// payload: the contract is refetch-on-any-event.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChangeEventView {
        pub collection: String,
        pub kind: String,
        pub record_id: Uuid,
    }
}
