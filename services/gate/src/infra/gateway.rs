use anyhow::Context as _;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::AccountGateway;
use crate::domain::types::{Account, RegistrationProfile, Role};
use crate::error::GateError;

/// Account and credential operations delegated to the CMS over its internal
/// HTTP API. The gate never stores passwords or roles itself.
#[derive(Clone)]
pub struct HttpAccountGateway {
    pub client: reqwest::Client,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    id: Uuid,
    email: String,
    display_name: String,
    role: Role,
    email_verified: bool,
    suspended: bool,
}

#[derive(Debug, Deserialize)]
struct IdDto {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SessionDto {
    token: String,
}

impl HttpAccountGateway {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn put_json(&self, path: &str, body: serde_json::Value) -> Result<(), GateError> {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("gateway PUT {path}"))?;
        if !resp.status().is_success() {
            return Err(GateError::Internal(anyhow::anyhow!(
                "gateway PUT {path} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

impl AccountGateway for HttpAccountGateway {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError> {
        let resp = self
            .client
            .get(self.url("/internal/accounts"))
            .query(&[("email", email)])
            .send()
            .await
            .context("gateway find account by email")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: AccountDto = resp
            .error_for_status()
            .context("gateway find account by email")?
            .json()
            .await
            .context("decode account")?;
        Ok(Some(account_from_dto(dto)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, GateError> {
        let resp = self
            .client
            .get(self.url(&format!("/internal/accounts/{id}")))
            .send()
            .await
            .context("gateway find account by id")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: AccountDto = resp
            .error_for_status()
            .context("gateway find account by id")?
            .json()
            .await
            .context("decode account")?;
        Ok(Some(account_from_dto(dto)))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        profile: &RegistrationProfile,
    ) -> Result<Uuid, GateError> {
        let resp = self
            .client
            .post(self.url("/internal/accounts"))
            .json(&json!({
                "email": email,
                "password": password,
                "first_name": profile.first_name,
                "last_name": profile.last_name,
                "company_name": profile.company_name,
            }))
            .send()
            .await
            .context("gateway create account")?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(GateError::AccountExists);
        }
        let dto: IdDto = resp
            .error_for_status()
            .context("gateway create account")?
            .json()
            .await
            .context("decode created account id")?;
        Ok(dto.id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Uuid>, GateError> {
        let resp = self
            .client
            .post(self.url("/internal/accounts/authenticate"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("gateway authenticate")?;
        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: IdDto = resp
            .error_for_status()
            .context("gateway authenticate")?
            .json()
            .await
            .context("decode authenticated id")?;
        Ok(Some(dto.id))
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), GateError> {
        self.put_json(
            &format!("/internal/accounts/{user_id}/role"),
            json!({ "role": role }),
        )
        .await
    }

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), GateError> {
        self.put_json(
            &format!("/internal/accounts/{user_id}/password"),
            json!({ "password": new_password }),
        )
        .await
    }

    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), GateError> {
        self.put_json(
            &format!("/internal/accounts/{user_id}/email-verified"),
            json!({ "email_verified": true }),
        )
        .await
    }

    async fn set_suspended(&self, user_id: Uuid, suspended: bool) -> Result<(), GateError> {
        self.put_json(
            &format!("/internal/accounts/{user_id}/suspended"),
            json!({ "suspended": suspended }),
        )
        .await
    }

    async fn set_approval_flag(&self, user_id: Uuid, approved: bool) -> Result<(), GateError> {
        self.put_json(
            &format!("/internal/accounts/{user_id}/approved"),
            json!({ "approved": approved }),
        )
        .await
    }

    async fn start_session(&self, user_id: Uuid) -> Result<String, GateError> {
        let dto: SessionDto = self
            .client
            .post(self.url(&format!("/internal/accounts/{user_id}/sessions")))
            .send()
            .await
            .context("gateway start session")?
            .error_for_status()
            .context("gateway start session")?
            .json()
            .await
            .context("decode session token")?;
        Ok(dto.token)
    }

    async fn end_session(&self, user_id: Uuid) -> Result<(), GateError> {
        self.client
            .delete(self.url(&format!("/internal/accounts/{user_id}/sessions")))
            .send()
            .await
            .context("gateway end session")?
            .error_for_status()
            .context("gateway end session")?;
        Ok(())
    }
}

fn account_from_dto(dto: AccountDto) -> Account {
    Account {
        id: dto.id,
        email: dto.email,
        display_name: dto.display_name,
        role: dto.role,
        email_verified: dto.email_verified,
        suspended: dto.suspended,
    }
}
