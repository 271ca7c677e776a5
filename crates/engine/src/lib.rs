pub use debts::{Debt, DebtDirection, DebtWithStatus};
pub use debt_payments::DebtPayment;
pub use categories::HouseholdCategory;
pub use edit_history::{EditAction, EditEntry};
pub use error::EngineError;
pub use families::Family;
pub use household::{FlowKind, HouseholdTransaction};
pub use orders::{Order, OrderStatus, OrderWithTotals};
pub use order_expenses::OrderExpense;
pub use users::{Role, User};
pub use watch::{
    ChangeEvent, ChangeKind, Collection, FamilyWatcher, RefetchBridge, WatchMessage, WatchScope,
};

pub mod categories;
pub mod debt_payments;
pub mod debts;
pub mod edit_history;
mod error;
pub mod families;
pub mod household;
pub mod identities;
pub mod order_expenses;
pub mod orders;
mod ops;
pub mod users;
mod util;
mod watch;

pub use ops::{
    DebtPatch, Engine, EngineBuilder, HouseholdPatch, HouseholdSummary, NewDebt,
    NewHouseholdTransaction, NewOrder, OrderPatch, Profile, ProfilePatch, RetryPolicy,
};

type ResultEngine<T> = Result<T, EngineError>;
