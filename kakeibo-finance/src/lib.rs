//! kakeibo-finance: category enrichment, collaborator interfaces and the summary pipeline

pub mod advisor;
pub mod classifier;
pub mod intent;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod resolver;
pub mod storage;

pub use advisor::Advisor;
pub use classifier::{CandidateSet, Classification, ClassificationOracle, ClassifyRequest, LlmOracle};
pub use intent::{route_message, Intent};
pub use llm::{ChatClient, ChatCompletion, LlmConfig, Provider};
pub use notify::{deliver, LineNotifier, LogNotifier, Notifier};
pub use pipeline::{artifact_key, report_key, Pipeline, PipelineError, RunOutcome};
pub use profile::{JsonProfileStore, ProfileStore, UserProfile};
pub use report::{ReportRenderer, TextReport};
pub use resolver::{CategoryResolver, Resolution, ResolveReport, ResolverOptions};
pub use storage::{FsObjectStore, MemoryStore, ObjectStore};
