// Answer-sheet service: request models, the generation orchestrator, the
// persisted position map, artifact storage, grading hand-off and HTTP handlers.

pub mod grading;
pub mod handlers;
pub mod models;
pub mod position_map;
pub mod service;
pub mod storage;

pub use service::TemplateService;
pub use storage::ArtifactStore;
