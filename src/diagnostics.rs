use crate::store::TaskRepository;
use tracing::warn;

const UNKNOWN: &str = "unknown";
const ERROR: &str = "error";

/// Store details shown in the footer. Never used for control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub engine_version: String,
    pub schema_version: String,
}

impl Diagnostics {
    pub fn fetch<R: TaskRepository + ?Sized>(repo: &R) -> Self {
        let engine_version = match repo.engine_version() {
            Ok(v) if v.trim().is_empty() => UNKNOWN.to_string(),
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "could not read engine version");
                ERROR.to_string()
            }
        };
        let schema_version = match repo.schema_version() {
            Ok(v) => v.to_string(),
            Err(err) => {
                warn!(error = %err, "could not read schema version");
                ERROR.to_string()
            }
        };
        Self {
            engine_version,
            schema_version,
        }
    }
}
