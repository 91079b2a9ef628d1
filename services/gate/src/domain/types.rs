use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which flow a verification code belongs to. One table serves both flows,
/// discriminated by this field, so queries must always filter on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPurpose {
    Registration,
    PasswordReset,
}

impl VerificationPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::PasswordReset => "password_reset",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(Self::Registration),
            "password_reset" => Some(Self::PasswordReset),
            _ => None,
        }
    }

    /// Code TTL: 10 minutes for registration, 15 for password reset.
    pub fn ttl_secs(self) -> i64 {
        match self {
            Self::Registration => REGISTRATION_CODE_TTL_SECS,
            Self::PasswordReset => RESET_CODE_TTL_SECS,
        }
    }
}

/// A pending 6-digit verification code. The plaintext code never lands here,
/// only its argon2id hash.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub id: Uuid,
    pub purpose: VerificationPurpose,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub token: String,
    pub code_hash: Option<String>,
    pub attempt_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_active(&self) -> bool {
        self.verified_at.is_none() && self.expires_at > Utc::now()
    }

    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| until > Utc::now())
    }
}

/// Single-use passwordless login link.
#[derive(Debug, Clone)]
pub struct MagicLink {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
    pub ip_address: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MagicLink {
    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && self.expires_at > Utc::now()
    }
}

/// What an approval token authorizes when consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Deny,
    AutoLogin,
}

impl ApprovalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
            Self::AutoLogin => "auto_login",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "deny" => Some(Self::Deny),
            "auto_login" => Some(Self::AutoLogin),
            _ => None,
        }
    }

    pub fn ttl_secs(self) -> i64 {
        match self {
            Self::Approve | Self::Deny => APPROVAL_TOKEN_TTL_SECS,
            Self::AutoLogin => AUTO_LOGIN_TOKEN_TTL_SECS,
        }
    }
}

/// Single-use emailed token for admin approve/deny and user auto-login.
#[derive(Debug, Clone)]
pub struct ApprovalToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub action: ApprovalAction,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Latest approve/deny decision for a user. No record means pending.
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub user_id: Uuid,
    pub approved: bool,
    pub decided_by: Option<Uuid>,
    pub decided_at: DateTime<Utc>,
}

/// Successful session start, recorded for auditing.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: String,
    pub social_provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Role in the CMS, as far as the gate cares. Privileged accounts are never
/// moved by approval decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Member,
    Privileged,
}

impl Role {
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member => "member",
            Self::Privileged => "privileged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Self::Guest),
            "member" => Some(Self::Member),
            "privileged" => Some(Self::Privileged),
            _ => None,
        }
    }
}

/// Account data the gate reads from the CMS user store.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub email_verified: bool,
    pub suspended: bool,
}

/// Profile fields collected at registration, forwarded to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
}

impl RegistrationProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_owned()
    }
}

/// Email template ids understood by the notification sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    RegistrationCode,
    PasswordResetCode,
    MagicLink,
    AdminApprovalRequest,
    UserWelcome,
    AccountApproved,
    AccountDenied,
    AdminActionNotice,
}

impl Template {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistrationCode => "registration_code",
            Self::PasswordResetCode => "password_reset_code",
            Self::MagicLink => "magic_link",
            Self::AdminApprovalRequest => "admin_approval_request",
            Self::UserWelcome => "user_welcome",
            Self::AccountApproved => "account_approved",
            Self::AccountDenied => "account_denied",
            Self::AdminActionNotice => "admin_action_notice",
        }
    }
}

/// Rate-limited action kinds; each gets its own counter per IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    RegistrationCode,
    RegistrationVerify,
    PasswordReset,
    PasswordResetVerify,
    MagicLink,
}

impl RateLimitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistrationCode => "registration_code",
            Self::RegistrationVerify => "registration_verify",
            Self::PasswordReset => "password_reset",
            Self::PasswordResetVerify => "password_reset_verify",
            Self::MagicLink => "magic_link",
        }
    }
}

/// Registration code time-to-live in seconds (10 minutes).
pub const REGISTRATION_CODE_TTL_SECS: i64 = 600;

/// Password-reset code time-to-live in seconds (15 minutes).
pub const RESET_CODE_TTL_SECS: i64 = 900;

/// Minimum gap between two codes for the same email.
pub const CODE_RESEND_COOLDOWN_SECS: i64 = 60;

/// Wrong-code attempts before the record locks.
pub const CODE_MAX_ATTEMPTS: i32 = 5;

/// How long a locked record stays locked (15 minutes).
pub const CODE_LOCKOUT_SECS: i64 = 900;

/// Magic link time-to-live in seconds (15 minutes).
pub const MAGIC_LINK_TTL_SECS: i64 = 900;

/// Approve/deny token time-to-live (7 days).
pub const APPROVAL_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Auto-login token time-to-live (30 days); longer for user convenience.
pub const AUTO_LOGIN_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Rate-limit window shared by all actions (1 hour).
pub const RATE_LIMIT_WINDOW_SECS: i64 = 3600;

/// Max code/link requests per IP per window.
pub const REQUEST_RATE_LIMIT: u32 = 3;

/// Max code verification attempts per IP per window.
pub const VERIFY_RATE_LIMIT: u32 = 10;

/// Minimum length accepted for new passwords.
pub const MIN_PASSWORD_LEN: usize = 8;
