//! # approval-workflow
//!
//! Human review for entity writes. A write to a registered entity type is
//! captured as a pending approval record holding a snapshot of the proposed
//! state; a reviewer later approves it (the change is applied) or rejects
//! it (the change is discarded).
//!
//! ```ignore
//! let config = AppConfig::load("production")?;
//! init_logging(&config.logging)?;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register_type::<Widget>()?;
//! let mut policies = PolicyRegistry::new(&config.approval);
//! policies.register_type::<Widget>();
//!
//! let engine = ApprovalEngine::connect(&config, registry, policies).await?;
//! ```

pub mod engine;
pub mod logging;

pub use engine::ApprovalEngine;
pub use logging::init_logging;

pub use approval_core::config::AppConfig;
pub use approval_core::error::{AppError, ErrorKind};
pub use approval_core::result::AppResult;
pub use approval_service::{ActorContext, ChangeRequest, PolicyRegistry, SubmissionOutcome};
