use std::fmt::{Display, Formatter};

use ratiorank_core::{EnvelopeMeta, ProviderId, UtcDateTime, ValidationError};
use uuid::Uuid;

/// Request identifier (UUID v4) stamped on every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Builds envelope metadata for one command run.
pub fn envelope_meta(
    provider: ProviderId,
    latency_ms: u64,
    generated_at: Option<UtcDateTime>,
    warnings: Vec<String>,
) -> Result<EnvelopeMeta, ValidationError> {
    let mut meta = EnvelopeMeta::new(RequestId::new_v4().to_string(), provider, latency_ms)?;
    if let Some(generated_at) = generated_at {
        meta = meta.with_generated_at(generated_at);
    }
    for warning in warnings {
        meta.push_warning(warning);
    }
    Ok(meta)
}
