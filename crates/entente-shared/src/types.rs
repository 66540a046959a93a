use serde::{Deserialize, Serialize};

// Contact identity = Ed25519 public key (32 bytes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub [u8; 32]);

impl ContactId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Group identifier assigned by the protocol layer (32 opaque bytes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub [u8; 32]);

impl GroupId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Authorization lifecycle
// ---------------------------------------------------------------------------

/// Authorization state of a contact record.
///
/// A contact reaches [`AuthStatus::Friend`] only after a completed two-sided
/// handshake: either the remote side confirmed our request, or we confirmed
/// theirs. The `*Failed` states are resumable, not terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    /// No outbound handshake initiated.
    Stranger,
    /// Our request is being sent.
    Requesting,
    /// Our request went out (outbound path) or theirs came in (inbound path).
    Requested,
    /// Sending our request failed; retryable via resend.
    RequestFailed,
    /// An ownership verification is in flight.
    VerificationInProgress,
    /// Ownership verified, not yet mutually confirmed.
    Verified,
    /// Verification failed; retryable.
    VerificationFailed,
    /// Our confirmation of their request is being sent.
    Confirming,
    /// Sending our confirmation failed; retryable.
    ConfirmationFailed,
    /// Two-sided handshake completed.
    Friend,
    /// Removed friend kept around so group rosters still render.
    Hidden,
}

impl AuthStatus {
    /// Stable TEXT representation stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stranger => "stranger",
            Self::Requesting => "requesting",
            Self::Requested => "requested",
            Self::RequestFailed => "requestFailed",
            Self::VerificationInProgress => "verificationInProgress",
            Self::Verified => "verified",
            Self::VerificationFailed => "verificationFailed",
            Self::Confirming => "confirming",
            Self::ConfirmationFailed => "confirmationFailed",
            Self::Friend => "friend",
            Self::Hidden => "hidden",
        }
    }

    /// Whether a handshake has been initiated or completed for this contact.
    ///
    /// Everything except [`AuthStatus::Stranger`]: such contacts are "known"
    /// during group admission and never receive a placeholder record.
    pub fn is_engaged(&self) -> bool {
        !matches!(self, Self::Stranger)
    }

    /// States from which `resend` may (re-)enter `Requesting`.
    pub fn can_resend(&self) -> bool {
        matches!(self, Self::Stranger | Self::RequestFailed | Self::Requesting)
    }
}

impl std::str::FromStr for AuthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stranger" => Ok(Self::Stranger),
            "requesting" => Ok(Self::Requesting),
            "requested" => Ok(Self::Requested),
            "requestFailed" => Ok(Self::RequestFailed),
            "verificationInProgress" => Ok(Self::VerificationInProgress),
            "verified" => Ok(Self::Verified),
            "verificationFailed" => Ok(Self::VerificationFailed),
            "confirming" => Ok(Self::Confirming),
            "confirmationFailed" => Ok(Self::ConfirmationFailed),
            "friend" => Ok(Self::Friend),
            "hidden" => Ok(Self::Hidden),
            other => Err(format!("unknown auth status: {other}")),
        }
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Participation state of a group record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum GroupStatus {
    /// Admitted via invitation, not yet joined locally.
    Pending,
    /// Actively participating (created locally, or joined).
    Participating,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Participating => "participating",
        }
    }
}

impl std::str::FromStr for GroupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "participating" => Ok(Self::Participating),
            other => Err(format!("unknown group status: {other}")),
        }
    }
}

/// Delivery state of a message record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Received,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Received => "received",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "received" => Ok(Self::Received),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// A typed, shareable identity attribute offered during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Fact {
    Username(String),
    Email(String),
    Phone(String),
}

impl Fact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Username(_) => "username",
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Username(v) | Self::Email(v) | Self::Phone(v) => v,
        }
    }
}
