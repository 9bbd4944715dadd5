//! Command controller for Deskpilot.
//!
//! This crate turns free-text commands into executed plans:
//! - `classifier`: ordered keyword rules mapping a command to a workflow tag
//! - `entities` and `fuzzy`: entity names from a catalog or on-screen candidates
//! - `decomposer`: table-driven workflow templates producing plans
//! - `executor`: sequential, partial-failure tolerant plan execution
//! - `context`: screen-derived situational context
//! - `pipeline`: the `CommandHandler` tying these together, with run tracking

pub mod builder;
pub mod cancel;
pub mod classifier;
pub mod context;
pub mod decomposer;
pub mod entities;
pub mod executor;
pub mod fuzzy;
pub mod pipeline;

pub use builder::PipelineBuilder;
pub use cancel::{CancelHandle, CancelToken};
pub use classifier::{default_rules, ClassificationRule, RuleClassifier};
pub use context::{infer_operations, ScreenContextProvider, ScreenTextParser};
pub use decomposer::{default_templates, ParamSpec, PlanDecomposer, StepTemplate, WorkflowTemplate};
pub use entities::{EntityCatalog, EntityExtractor, EntityKind};
pub use executor::{PlanExecutor, SettlePolicy};
pub use fuzzy::{best_match, similarity};
pub use pipeline::CommandPipeline;
