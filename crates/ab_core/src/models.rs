use async_trait::async_trait;

use crate::Result;

/// A generative text API.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Send a natural-language prompt and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A generative image API returning raw image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_image(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditVerdict {
    Pass,
    Fail(String),
}

impl AuditVerdict {
    /// Interprets a one-line reviewer answer: anything not starting with `PASS` fails.
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim();
        if reply.starts_with("PASS") {
            AuditVerdict::Pass
        } else {
            AuditVerdict::Fail(reply.to_string())
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, AuditVerdict::Pass)
    }
}

/// Quality gate applied to a generated image before it is published.
#[async_trait]
pub trait ImageAuditor: Send + Sync {
    async fn audit(&self, image: &[u8], description: &str) -> Result<AuditVerdict>;
}

/// Auditor used when no vision model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

#[async_trait]
impl ImageAuditor for AcceptAll {
    async fn audit(&self, _image: &[u8], _description: &str) -> Result<AuditVerdict> {
        Ok(AuditVerdict::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_reply() {
        assert_eq!(AuditVerdict::from_reply("PASS"), AuditVerdict::Pass);
        assert_eq!(AuditVerdict::from_reply("  PASS - looks fine\n"), AuditVerdict::Pass);
        assert_eq!(
            AuditVerdict::from_reply("FAIL: distorted hands"),
            AuditVerdict::Fail("FAIL: distorted hands".to_string())
        );
        assert!(!AuditVerdict::from_reply("pass").passed());
    }
}
