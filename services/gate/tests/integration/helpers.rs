use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use foyer_gate::domain::repository::{
    AccountGateway, ApprovalDecisionRepository, ApprovalTokenRepository, CaptchaVerifier,
    LoginEventRepository, MagicLinkRepository, Notifier, RateLimiter, VerificationCodeRepository,
};
use foyer_gate::domain::types::{
    Account, ApprovalAction, ApprovalDecision, ApprovalToken, LoginEvent, MagicLink,
    RateLimitAction, RegistrationProfile, Role, Template, VerificationCode, VerificationPurpose,
};
use foyer_gate::error::GateError;

// ── MockCodeRepo ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockCodeRepo {
    pub codes: Arc<Mutex<Vec<VerificationCode>>>,
}

impl MockCodeRepo {
    pub fn empty() -> Self {
        Self {
            codes: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with(codes: Vec<VerificationCode>) -> Self {
        Self {
            codes: Arc::new(Mutex::new(codes)),
        }
    }
}

impl VerificationCodeRepository for MockCodeRepo {
    async fn find_latest(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.purpose == purpose)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn find_active(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, GateError> {
        let now = Utc::now();
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| {
                c.email == email
                    && c.purpose == purpose
                    && c.verified_at.is_none()
                    && c.expires_at > now
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn delete_unverified(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), GateError> {
        self.codes
            .lock()
            .unwrap()
            .retain(|c| !(c.email == email && c.purpose == purpose && c.verified_at.is_none()));
        Ok(())
    }

    async fn create(&self, code: &VerificationCode) -> Result<(), GateError> {
        self.codes.lock().unwrap().push(code.clone());
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_secs: i64,
    ) -> Result<i32, GateError> {
        let mut codes = self.codes.lock().unwrap();
        let code = codes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GateError::Internal(anyhow::anyhow!("no such code")))?;
        code.attempt_count += 1;
        if code.attempt_count >= max_attempts && code.locked_until.is_none() {
            code.locked_until = Some(Utc::now() + Duration::seconds(lock_secs));
        }
        Ok(code.attempt_count)
    }

    async fn mark_verified(&self, id: Uuid, user_id: Uuid) -> Result<bool, GateError> {
        let mut codes = self.codes.lock().unwrap();
        let Some(code) = codes.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if code.verified_at.is_some() {
            return Ok(false);
        }
        code.verified_at = Some(Utc::now());
        code.code_hash = None;
        code.user_id = Some(user_id);
        Ok(true)
    }
}

// ── MockMagicLinkRepo ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockMagicLinkRepo {
    pub links: Arc<Mutex<Vec<MagicLink>>>,
}

impl MockMagicLinkRepo {
    pub fn empty() -> Self {
        Self {
            links: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with(links: Vec<MagicLink>) -> Self {
        Self {
            links: Arc::new(Mutex::new(links)),
        }
    }
}

impl MagicLinkRepository for MockMagicLinkRepo {
    async fn invalidate_unused(&self, user_id: Uuid) -> Result<(), GateError> {
        let now = Utc::now();
        for link in self.links.lock().unwrap().iter_mut() {
            if link.user_id == user_id && link.used_at.is_none() {
                link.used_at = Some(now);
            }
        }
        Ok(())
    }

    async fn create(&self, link: &MagicLink) -> Result<(), GateError> {
        self.links.lock().unwrap().push(link.clone());
        Ok(())
    }

    async fn consume(&self, token: &str, email: &str) -> Result<Option<MagicLink>, GateError> {
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();
        let Some(link) = links.iter_mut().find(|l| {
            l.token == token && l.email == email && l.used_at.is_none() && l.expires_at > now
        }) else {
            return Ok(None);
        };
        link.used_at = Some(now);
        Ok(Some(link.clone()))
    }
}

// ── MockApprovalTokenRepo ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockApprovalTokenRepo {
    pub tokens: Arc<Mutex<Vec<ApprovalToken>>>,
}

impl MockApprovalTokenRepo {
    pub fn empty() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with(tokens: Vec<ApprovalToken>) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(tokens)),
        }
    }
}

impl ApprovalTokenRepository for MockApprovalTokenRepo {
    async fn find_by_token(&self, token: &str) -> Result<Option<ApprovalToken>, GateError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn invalidate_unused(
        &self,
        user_id: Uuid,
        action: ApprovalAction,
    ) -> Result<(), GateError> {
        let now = Utc::now();
        for token in self.tokens.lock().unwrap().iter_mut() {
            if token.user_id == user_id && token.action == action && token.used_at.is_none() {
                token.used_at = Some(now);
            }
        }
        Ok(())
    }

    async fn create(&self, token: &ApprovalToken) -> Result<(), GateError> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn consume(&self, id: Uuid) -> Result<bool, GateError> {
        let mut tokens = self.tokens.lock().unwrap();
        let Some(token) = tokens.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        if token.used_at.is_some() {
            return Ok(false);
        }
        token.used_at = Some(Utc::now());
        Ok(true)
    }
}

// ── MockDecisionRepo ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockDecisionRepo {
    pub decisions: Arc<Mutex<HashMap<Uuid, ApprovalDecision>>>,
}

impl MockDecisionRepo {
    pub fn empty() -> Self {
        Self {
            decisions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with(decision: ApprovalDecision) -> Self {
        let repo = Self::empty();
        repo.decisions
            .lock()
            .unwrap()
            .insert(decision.user_id, decision);
        repo
    }
}

impl ApprovalDecisionRepository for MockDecisionRepo {
    async fn upsert(&self, decision: &ApprovalDecision) -> Result<(), GateError> {
        self.decisions
            .lock()
            .unwrap()
            .insert(decision.user_id, decision.clone());
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<ApprovalDecision>, GateError> {
        Ok(self.decisions.lock().unwrap().get(&user_id).cloned())
    }
}

// ── MockLoginEventRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockLoginEventRepo {
    pub events: Arc<Mutex<Vec<LoginEvent>>>,
    pub logouts: Arc<Mutex<Vec<Uuid>>>,
}

impl MockLoginEventRepo {
    pub fn empty() -> Self {
        Self {
            events: Arc::new(Mutex::new(vec![])),
            logouts: Arc::new(Mutex::new(vec![])),
        }
    }
}

impl LoginEventRepository for MockLoginEventRepo {
    async fn record_login(&self, event: &LoginEvent) -> Result<(), GateError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn record_logout(&self, user_id: Uuid) -> Result<(), GateError> {
        self.logouts.lock().unwrap().push(user_id);
        Ok(())
    }
}

// ── MockRateLimiter ──────────────────────────────────────────────────────────

/// Counts per (ip, action) without a time dimension; tests never wait out a
/// window.
#[derive(Clone)]
pub struct MockRateLimiter {
    pub counts: Arc<Mutex<HashMap<(String, &'static str), u32>>>,
}

impl MockRateLimiter {
    pub fn permissive() -> Self {
        Self {
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl RateLimiter for MockRateLimiter {
    async fn check_and_record(
        &self,
        ip: &str,
        action: RateLimitAction,
        max_attempts: u32,
        _window_secs: i64,
    ) -> Result<bool, GateError> {
        let mut counts = self.counts.lock().unwrap();
        let entry = counts.entry((ip.to_owned(), action.as_str())).or_insert(0);
        if *entry >= max_attempts {
            return Ok(false);
        }
        *entry += 1;
        Ok(true)
    }
}

// ── MockAccountGateway ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockAccountGateway {
    pub accounts: Arc<Mutex<Vec<Account>>>,
    pub passwords: Arc<Mutex<HashMap<Uuid, String>>>,
    pub approval_flags: Arc<Mutex<HashMap<Uuid, bool>>>,
    pub sessions: Arc<Mutex<Vec<Uuid>>>,
}

impl MockAccountGateway {
    pub fn empty() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(vec![])),
            passwords: Arc::new(Mutex::new(HashMap::new())),
            approval_flags: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with(accounts: Vec<Account>) -> Self {
        let gw = Self::empty();
        *gw.accounts.lock().unwrap() = accounts;
        gw
    }

    pub fn set_password_for(&self, user_id: Uuid, password: &str) {
        self.passwords
            .lock()
            .unwrap()
            .insert(user_id, password.to_owned());
    }

    pub fn account(&self, user_id: Uuid) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == user_id)
            .cloned()
    }
}

impl AccountGateway for MockAccountGateway {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, GateError> {
        Ok(self.account(id))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        profile: &RegistrationProfile,
    ) -> Result<Uuid, GateError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == email) {
            return Err(GateError::AccountExists);
        }
        let id = Uuid::new_v4();
        accounts.push(Account {
            id,
            email: email.to_owned(),
            display_name: profile.full_name(),
            role: Role::Guest,
            email_verified: false,
            suspended: false,
        });
        self.passwords
            .lock()
            .unwrap()
            .insert(id, password.to_owned());
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Uuid>, GateError> {
        let accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.iter().find(|a| a.email == email) else {
            return Ok(None);
        };
        let passwords = self.passwords.lock().unwrap();
        Ok(match passwords.get(&account.id) {
            Some(stored) if stored == password => Some(account.id),
            _ => None,
        })
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), GateError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.id == user_id) {
            if !account.role.is_privileged() {
                account.role = role;
            }
        }
        Ok(())
    }

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), GateError> {
        self.passwords
            .lock()
            .unwrap()
            .insert(user_id, new_password.to_owned());
        Ok(())
    }

    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), GateError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.id == user_id) {
            account.email_verified = true;
        }
        Ok(())
    }

    async fn set_suspended(&self, user_id: Uuid, suspended: bool) -> Result<(), GateError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.id == user_id) {
            account.suspended = suspended;
        }
        Ok(())
    }

    async fn set_approval_flag(&self, user_id: Uuid, approved: bool) -> Result<(), GateError> {
        self.approval_flags.lock().unwrap().insert(user_id, approved);
        Ok(())
    }

    async fn start_session(&self, user_id: Uuid) -> Result<String, GateError> {
        self.sessions.lock().unwrap().push(user_id);
        Ok(format!("session-{user_id}"))
    }

    async fn end_session(&self, user_id: Uuid) -> Result<(), GateError> {
        self.sessions.lock().unwrap().retain(|id| *id != user_id);
        Ok(())
    }
}

// ── MockNotifier ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<(String, Template, serde_json::Value)>>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn working() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
            fail: true,
        }
    }

    pub fn sent_to(&self, recipient: &str, template: Template) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, t, _)| r == recipient && *t == template)
            .map(|(_, _, d)| d.clone())
            .collect()
    }
}

impl Notifier for MockNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: serde_json::Value,
    ) -> Result<(), GateError> {
        if self.fail {
            return Err(GateError::ExternalService);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_owned(), template, data));
        Ok(())
    }
}

// ── MockCaptcha ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockCaptcha {
    pub ok: bool,
}

impl MockCaptcha {
    pub fn passing() -> Self {
        Self { ok: true }
    }

    pub fn failing() -> Self {
        Self { ok: false }
    }
}

impl CaptchaVerifier for MockCaptcha {
    async fn verify(
        &self,
        _token: &str,
        _remote_ip: &str,
        _action: &str,
    ) -> Result<bool, GateError> {
        Ok(self.ok)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_account(email: &str, role: Role) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        display_name: "Test User".to_owned(),
        role,
        email_verified: true,
        suspended: false,
    }
}

pub fn test_profile() -> RegistrationProfile {
    RegistrationProfile {
        first_name: "Grace".to_owned(),
        last_name: "Hopper".to_owned(),
        company_name: "Eckert-Mauchly".to_owned(),
    }
}

pub fn stored_code(
    email: &str,
    purpose: VerificationPurpose,
    plaintext: &str,
) -> VerificationCode {
    let now = Utc::now();
    VerificationCode {
        id: Uuid::new_v4(),
        purpose,
        email: email.to_owned(),
        user_id: None,
        token: Uuid::new_v4().simple().to_string(),
        code_hash: Some(foyer_gate::usecase::otp::hash_code(plaintext).unwrap()),
        attempt_count: 0,
        locked_until: None,
        expires_at: now + Duration::seconds(purpose.ttl_secs()),
        verified_at: None,
        created_at: now,
    }
}

pub fn stored_token(user_id: Uuid, action: ApprovalAction) -> ApprovalToken {
    let now = Utc::now();
    ApprovalToken {
        id: Uuid::new_v4(),
        user_id,
        token: Uuid::new_v4().simple().to_string(),
        action,
        expires_at: now + Duration::seconds(action.ttl_secs()),
        used_at: None,
        created_at: now,
    }
}
