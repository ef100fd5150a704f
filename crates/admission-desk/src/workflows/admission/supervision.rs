use serde::{Deserialize, Serialize};

use super::domain::PropositionId;

/// Identifier wrapper for supervisory-group signatories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatoryId(pub String);

/// Role of a signatory within the supervisory group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatoryRole {
    Promoter,
    CommitteeMember,
}

impl SignatoryRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Promoter => "Promoter",
            Self::CommitteeMember => "Committee member",
        }
    }
}

/// Signature lifecycle for one signatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    NotInvited,
    Invited,
    Approved,
    Declined,
}

impl SignatureState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotInvited => "Not invited",
            Self::Invited => "Invited",
            Self::Approved => "Approved",
            Self::Declined => "Declined",
        }
    }
}

/// One signatory's opinion on the proposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signatory: SignatoryId,
    pub display_name: String,
    pub email: String,
    pub state: SignatureState,
    #[serde(default)]
    pub internal_comment: String,
    #[serde(default)]
    pub external_comment: String,
    #[serde(default)]
    pub refusal_reason: String,
    /// Storage keys of a scanned approval uploaded on the signatory's behalf.
    #[serde(default)]
    pub pdf: Vec<String>,
}

impl Signature {
    fn new(signatory: SignatoryId, display_name: String, email: String) -> Self {
        Self {
            signatory,
            display_name,
            email,
            state: SignatureState::NotInvited,
            internal_comment: String::new(),
            external_comment: String::new(),
            refusal_reason: String::new(),
            pdf: Vec::new(),
        }
    }
}

/// Errors raised by supervisory-group operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SupervisionError {
    #[error("signatory not found")]
    SignatoryNotFound,
    #[error("promoter not found")]
    PromoterNotFound,
    #[error("committee member not found")]
    MemberNotFound,
    #[error("signatory is already part of the supervisory group")]
    DuplicateSignatory,
    #[error("signatory already gave an opinion")]
    AlreadyDecided,
    #[error("signatures have already been sent out")]
    SignaturesAlreadySent,
    #[error("every signatory must approve before submission")]
    MissingApprovals,
}

/// The supervisory group attached to a proposition: promoter signatures and
/// committee-member signatures, with an optional lead promoter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisionGroup {
    pub proposition_id: Option<PropositionId>,
    pub promoters: Vec<Signature>,
    pub members: Vec<Signature>,
    pub lead_promoter: Option<SignatoryId>,
}

impl SupervisionGroup {
    pub fn for_proposition(proposition_id: PropositionId) -> Self {
        Self {
            proposition_id: Some(proposition_id),
            ..Self::default()
        }
    }

    pub fn add_promoter(
        &mut self,
        signatory: SignatoryId,
        display_name: &str,
        email: &str,
    ) -> Result<(), SupervisionError> {
        if self.signature(&signatory).is_some() {
            return Err(SupervisionError::DuplicateSignatory);
        }
        self.promoters.push(Signature::new(
            signatory,
            display_name.to_string(),
            email.to_string(),
        ));
        Ok(())
    }

    pub fn add_member(
        &mut self,
        signatory: SignatoryId,
        display_name: &str,
        email: &str,
    ) -> Result<(), SupervisionError> {
        if self.signature(&signatory).is_some() {
            return Err(SupervisionError::DuplicateSignatory);
        }
        self.members.push(Signature::new(
            signatory,
            display_name.to_string(),
            email.to_string(),
        ));
        Ok(())
    }

    pub fn signature(&self, signatory: &SignatoryId) -> Option<&Signature> {
        self.promoters
            .iter()
            .chain(self.members.iter())
            .find(|signature| &signature.signatory == signatory)
    }

    pub fn role_of(&self, signatory: &SignatoryId) -> Result<SignatoryRole, SupervisionError> {
        if self
            .promoters
            .iter()
            .any(|signature| &signature.signatory == signatory)
        {
            return Ok(SignatoryRole::Promoter);
        }
        if self
            .members
            .iter()
            .any(|signature| &signature.signatory == signatory)
        {
            return Ok(SignatoryRole::CommitteeMember);
        }
        Err(SupervisionError::SignatoryNotFound)
    }

    pub fn designate_lead_promoter(
        &mut self,
        signatory: SignatoryId,
    ) -> Result<(), SupervisionError> {
        if !self
            .promoters
            .iter()
            .any(|signature| signature.signatory == signatory)
        {
            return Err(SupervisionError::PromoterNotFound);
        }
        self.lead_promoter = Some(signatory);
        Ok(())
    }

    /// Invite every signatory still in the `NotInvited` or `Declined` state.
    /// Returns the signatories switched to `Invited`, for notification.
    pub fn invite_all(&mut self) -> Vec<SignatoryId> {
        let mut invited = Vec::new();
        for signature in self.promoters.iter_mut().chain(self.members.iter_mut()) {
            if matches!(
                signature.state,
                SignatureState::NotInvited | SignatureState::Declined
            ) {
                signature.state = SignatureState::Invited;
                signature.refusal_reason.clear();
                invited.push(signature.signatory.clone());
            }
        }
        invited
    }

    /// Guard used before re-sending invitations: no signatory may already
    /// have been invited or decided.
    pub fn verify_signatures_not_sent(&self) -> Result<(), SupervisionError> {
        let untouched = self
            .promoters
            .iter()
            .chain(self.members.iter())
            .all(|signature| signature.state == SignatureState::NotInvited);
        if untouched {
            Ok(())
        } else {
            Err(SupervisionError::SignaturesAlreadySent)
        }
    }

    pub fn approve(
        &mut self,
        signatory: &SignatoryId,
        internal_comment: Option<&str>,
        external_comment: Option<&str>,
    ) -> Result<SignatoryRole, SupervisionError> {
        let role = self.role_of(signatory)?;
        let signature = self.signature_mut(signatory)?;
        if signature.state == SignatureState::Approved {
            return Err(SupervisionError::AlreadyDecided);
        }
        signature.state = SignatureState::Approved;
        signature.internal_comment = internal_comment.unwrap_or_default().to_string();
        signature.external_comment = external_comment.unwrap_or_default().to_string();
        Ok(role)
    }

    /// Record an approval backed by an uploaded, signed PDF.
    pub fn approve_by_pdf(
        &mut self,
        signatory: &SignatoryId,
        pdf: Vec<String>,
    ) -> Result<SignatoryRole, SupervisionError> {
        let role = self.role_of(signatory)?;
        let signature = self.signature_mut(signatory)?;
        if signature.state == SignatureState::Approved {
            return Err(SupervisionError::AlreadyDecided);
        }
        signature.state = SignatureState::Approved;
        signature.pdf = pdf;
        Ok(role)
    }

    /// Record a refusal. A promoter decline resets every other promoter
    /// signature to `NotInvited`; a committee-member decline removes the
    /// member from the group.
    pub fn decline(
        &mut self,
        signatory: &SignatoryId,
        internal_comment: Option<&str>,
        external_comment: Option<&str>,
        refusal_reason: Option<&str>,
    ) -> Result<SignatoryRole, SupervisionError> {
        match self.role_of(signatory)? {
            SignatoryRole::Promoter => {
                for signature in &mut self.promoters {
                    if &signature.signatory == signatory {
                        signature.state = SignatureState::Declined;
                        signature.internal_comment =
                            internal_comment.unwrap_or_default().to_string();
                        signature.external_comment =
                            external_comment.unwrap_or_default().to_string();
                        signature.refusal_reason = refusal_reason.unwrap_or_default().to_string();
                    } else {
                        signature.state = SignatureState::NotInvited;
                    }
                }
                Ok(SignatoryRole::Promoter)
            }
            SignatoryRole::CommitteeMember => {
                self.members
                    .retain(|signature| &signature.signatory != signatory);
                Ok(SignatoryRole::CommitteeMember)
            }
        }
    }

    pub fn remove_promoter(&mut self, signatory: &SignatoryId) -> Result<(), SupervisionError> {
        let before = self.promoters.len();
        self.promoters
            .retain(|signature| &signature.signatory != signatory);
        if self.promoters.len() == before {
            return Err(SupervisionError::PromoterNotFound);
        }
        if self.lead_promoter.as_ref() == Some(signatory) {
            self.lead_promoter = None;
        }
        Ok(())
    }

    pub fn remove_member(&mut self, signatory: &SignatoryId) -> Result<(), SupervisionError> {
        let before = self.members.len();
        self.members
            .retain(|signature| &signature.signatory != signatory);
        if self.members.len() == before {
            return Err(SupervisionError::MemberNotFound);
        }
        Ok(())
    }

    pub fn all_approved(&self) -> bool {
        !self.promoters.is_empty()
            && self
                .promoters
                .iter()
                .chain(self.members.iter())
                .all(|signature| signature.state == SignatureState::Approved)
    }

    pub fn verify_all_approved(&self) -> Result<(), SupervisionError> {
        if self.all_approved() {
            Ok(())
        } else {
            Err(SupervisionError::MissingApprovals)
        }
    }

    fn signature_mut(
        &mut self,
        signatory: &SignatoryId,
    ) -> Result<&mut Signature, SupervisionError> {
        self.promoters
            .iter_mut()
            .chain(self.members.iter_mut())
            .find(|signature| &signature.signatory == signatory)
            .ok_or(SupervisionError::SignatoryNotFound)
    }
}
