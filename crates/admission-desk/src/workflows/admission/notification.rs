use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::Proposition;
use super::supervision::Signature;

pub const TPL_SIGNATURE_REQUEST_ACTOR: &str = "admission-signature-request-actor";
pub const TPL_SIGNATURE_REQUEST_CANDIDATE: &str = "admission-signature-request-candidate";
pub const TPL_SIGNATURE_REFUSAL_CANDIDATE: &str = "admission-signature-refusal-candidate";
pub const TPL_SUBMISSION_CANDIDATE: &str = "admission-submission-candidate";
pub const TPL_CDD_REFUSAL_CANDIDATE: &str = "admission-cdd-refusal-candidate";
pub const TPL_CDD_APPROVAL_CANDIDATE: &str = "admission-cdd-approval-candidate";
pub const TPL_SIC_REFUSAL_CANDIDATE: &str = "admission-sic-refusal-candidate";
pub const TPL_SIC_APPROVAL_CANDIDATE: &str = "admission-sic-approval-candidate";

/// Templated message handed to the mail pipeline: a template identifier plus
/// the token map the template is rendered with downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub template: String,
    pub recipient: String,
    pub tokens: BTreeMap<String, String>,
}

/// Trait describing the outbound mail boundary.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, message: OutboundMessage) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

impl<T: NotificationPublisher + ?Sized> NotificationPublisher for std::sync::Arc<T> {
    fn publish(&self, message: OutboundMessage) -> Result<(), NotificationError> {
        (**self).publish(message)
    }
}

/// Builds and dispatches the workflow notifications. Token names follow the
/// placeholders of the mail templates.
pub struct Notifier<P> {
    publisher: P,
    sender_email: String,
}

impl<P: NotificationPublisher> Notifier<P> {
    pub fn new(publisher: P, sender_email: impl Into<String>) -> Self {
        Self {
            publisher,
            sender_email: sender_email.into(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    fn common_tokens(&self, proposition: &Proposition) -> BTreeMap<String, String> {
        let mut tokens = BTreeMap::new();
        tokens.insert(
            "candidate_first_name".to_string(),
            proposition.candidate.first_name.clone(),
        );
        tokens.insert(
            "candidate_last_name".to_string(),
            proposition.candidate.last_name.clone(),
        );
        tokens.insert(
            "admission_reference".to_string(),
            proposition.reference.clone(),
        );
        tokens.insert(
            "training_title".to_string(),
            proposition.training.title.clone(),
        );
        tokens.insert(
            "training_acronym".to_string(),
            proposition.training.acronym.clone(),
        );
        tokens.insert("sender_email".to_string(), self.sender_email.clone());
        tokens
    }

    fn send(
        &self,
        template: &str,
        recipient: &str,
        tokens: BTreeMap<String, String>,
    ) -> Result<(), NotificationError> {
        self.publisher.publish(OutboundMessage {
            template: template.to_string(),
            recipient: recipient.to_string(),
            tokens,
        })
    }

    /// One invitation per freshly invited signatory, plus a recap to the
    /// candidate.
    pub fn signature_requests(
        &self,
        proposition: &Proposition,
        invited: &[&Signature],
    ) -> Result<(), NotificationError> {
        for signature in invited {
            let mut tokens = self.common_tokens(proposition);
            tokens.insert(
                "signatory_name".to_string(),
                signature.display_name.clone(),
            );
            self.send(TPL_SIGNATURE_REQUEST_ACTOR, &signature.email, tokens)?;
        }
        self.send(
            TPL_SIGNATURE_REQUEST_CANDIDATE,
            &proposition.candidate.email,
            self.common_tokens(proposition),
        )
    }

    pub fn signature_declined(
        &self,
        proposition: &Proposition,
        signature: &Signature,
    ) -> Result<(), NotificationError> {
        let mut tokens = self.common_tokens(proposition);
        tokens.insert(
            "signatory_name".to_string(),
            signature.display_name.clone(),
        );
        tokens.insert(
            "refusal_comment".to_string(),
            signature.external_comment.clone(),
        );
        self.send(
            TPL_SIGNATURE_REFUSAL_CANDIDATE,
            &proposition.candidate.email,
            tokens,
        )
    }

    pub fn submitted(&self, proposition: &Proposition) -> Result<(), NotificationError> {
        self.send(
            TPL_SUBMISSION_CANDIDATE,
            &proposition.candidate.email,
            self.common_tokens(proposition),
        )
    }

    pub fn cdd_refusal(
        &self,
        proposition: &Proposition,
        reasons: &[String],
    ) -> Result<(), NotificationError> {
        let mut tokens = self.common_tokens(proposition);
        tokens.insert("refusal_reasons".to_string(), reasons.join("\n"));
        self.send(
            TPL_CDD_REFUSAL_CANDIDATE,
            &proposition.candidate.email,
            tokens,
        )
    }

    pub fn cdd_approval(&self, proposition: &Proposition) -> Result<(), NotificationError> {
        self.send(
            TPL_CDD_APPROVAL_CANDIDATE,
            &proposition.candidate.email,
            self.common_tokens(proposition),
        )
    }

    pub fn sic_refusal(&self, proposition: &Proposition) -> Result<(), NotificationError> {
        self.send(
            TPL_SIC_REFUSAL_CANDIDATE,
            &proposition.candidate.email,
            self.common_tokens(proposition),
        )
    }

    pub fn sic_approval(&self, proposition: &Proposition) -> Result<(), NotificationError> {
        self.send(
            TPL_SIC_APPROVAL_CANDIDATE,
            &proposition.candidate.email,
            self.common_tokens(proposition),
        )
    }
}
