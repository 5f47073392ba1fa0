//! Deployment triggers.
//!
//! Two entry points end in the same [`Deployer`]: a webhook from the source
//! control host, which must carry a valid HMAC-SHA256 signature and target the
//! deploy branch, and a manual push by an operator, which is only available
//! outside production.

use crate::deploy::{Environment, LaunchReceipt, PushReport};
use crate::error::*;
use crate::traits::Deployer;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Preferred signature header.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Fallback signature header.
pub const LEGACY_SIGNATURE_HEADER: &str = "x-hub-signature";
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the `sha256=<hex>` signature of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the HMAC-SHA256 of the raw `body`.
///
/// Fails closed: no secret, no signature, or undecodable hex are all rejections.
/// The digest comparison is constant time.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), AuthError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::SecretNotConfigured)?;
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingSignature)?;

    let digest = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(signature);
    let expected = hex::decode(digest).map_err(|_| AuthError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::SecretNotConfigured)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AuthError::InvalidSignature)
}

/// The parts of a push event that matter here.
///
/// Any JSON value is accepted. Fields that are missing, `null` or of another
/// type read as absent, so odd events end up ignored rather than rejected.
#[derive(Debug, Default)]
struct PushEvent {
    git_ref: String,
    has_repository: bool,
    head_commit: Option<String>,
}

impl From<serde_json::Value> for PushEvent {
    fn from(payload: serde_json::Value) -> Self {
        let text = |value: Option<&serde_json::Value>| {
            value
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            git_ref: text(payload.get("ref")).unwrap_or_default(),
            has_repository: payload
                .get("repository")
                .is_some_and(|r| !r.is_null() && r.as_bool() != Some(false)),
            head_commit: text(payload.pointer("/head_commit/id")),
        }
    }
}

impl PushEvent {
    fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The deploy script was started (or its launch failure was logged).
    Triggered {
        branch: String,
        commit: String,
        launch: Option<LaunchReceipt>,
    },
    /// A verified event that does not concern the deploy branch.
    Ignored { branch: String },
}

#[derive(Clone)]
pub struct DeployTrigger<D: Deployer> {
    deployer: D,
    secret: Option<String>,
    target_branch: String,
    environment: Environment,
}

impl<D: Deployer> DeployTrigger<D> {
    pub fn new(
        deployer: D,
        secret: Option<String>,
        target_branch: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            deployer,
            secret,
            target_branch: target_branch.into(),
            environment,
        }
    }

    pub fn deployer(&self) -> &D {
        &self.deployer
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Verifies, filters and (on the target branch) launches a deployment.
    ///
    /// Launch failures are logged and do not turn into an error: the sender is
    /// acknowledged as soon as the event is accepted.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, TriggerError> {
        if let Err(e) = verify_signature(self.secret.as_deref(), body, signature) {
            warn!("Webhook rejected: {e}");
            return Err(e.into());
        }

        let event = PushEvent::from(serde_json::from_slice::<serde_json::Value>(body)?);
        let branch = event.branch().to_string();

        if !event.has_repository || branch != self.target_branch {
            info!(%branch, "Webhook event ignored");
            return Ok(WebhookOutcome::Ignored { branch });
        }

        let commit = event
            .head_commit
            .unwrap_or_else(|| "unknown".to_string());
        info!(%branch, %commit, "Push event received, launching deploy");

        let launch = match self.deployer.launch().await {
            Ok(receipt) => {
                info!(log = %receipt.log_file, pid = ?receipt.pid, "Deploy script started");
                Some(receipt)
            }
            Err(e) => {
                error!("Failed to launch deploy script: {e}");
                None
            }
        };

        Ok(WebhookOutcome::Triggered {
            branch,
            commit,
            launch,
        })
    }

    /// Operator-initiated stage, commit and push.
    pub async fn manual_push(&self) -> Result<PushReport, DeployError> {
        if !self.environment.allows_manual_push() {
            return Err(DeployError::Forbidden(self.environment.to_string()));
        }
        let report = self.deployer.push().await?;
        info!(message = %report.commit_message, committed = report.committed, "Pushed");
        Ok(report)
    }
}
