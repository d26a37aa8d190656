pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod result;
pub mod routes;
pub mod settings;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;
pub use error::{ErrorKind, GenerationError};
pub use pipeline::CodeGenerator;
pub use result::{ArtifactRole, GeneratedArtifactFile, GenerationResult};
pub use settings::{Backend, GenerationSettings, Language};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub generator: Arc<CodeGenerator>,
}
