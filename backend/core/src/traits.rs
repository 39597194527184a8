use async_trait::async_trait;

use crate::error::CredentialError;
use crate::types::{Credential, SiteId};

/// Issues short-lived access credentials scoped to one site.
///
/// Called once per activation of a chat session. Implementations must not
/// retry internally; a failure ends that activation attempt.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    async fn issue_session(&self, site_id: SiteId) -> Result<Credential, CredentialError>;
}
