//! Service layer - request orchestration

pub mod reaging_service;
pub mod types;

pub use reaging_service::ReagingService;
pub use types::*;
