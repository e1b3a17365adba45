mod board;
mod state;

pub use board::{local_today, mutate_then_reconcile, BulkReport, TaskBoard};
pub use state::{keys, BoardState, LoadState, Outcome, Toast, ToastKind};
