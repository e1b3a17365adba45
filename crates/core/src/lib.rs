pub mod capture;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod repository;
pub mod seeding;
pub mod selection;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod view;

pub use capture::{CategoryInput, TaskInput, ValidationError};
pub use config::{AppConfig, StoreBackend};
pub use model::*;
pub use repository::{CategoryRepository, Entity, Repository, TaskRepository};
pub use selection::Selection;
pub use services::{BoardState, BulkReport, LoadState, Outcome, TaskBoard, Toast, ToastKind};
pub use store::{Collection, LocalStore, Record, RecordStore, RemoteStore, StoreError};
pub use view::{BoardView, EmptyState, ProgressStats, SidebarEntry, TaskRow};
