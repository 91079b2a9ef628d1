use serde::Deserialize;

use crate::domain::repository::CaptchaVerifier;
use crate::error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaProvider {
    RecaptchaV2,
    RecaptchaV3,
    Hcaptcha,
}

impl CaptchaProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recaptcha_v2" => Some(Self::RecaptchaV2),
            "recaptcha_v3" => Some(Self::RecaptchaV3),
            "hcaptcha" => Some(Self::Hcaptcha),
            _ => None,
        }
    }

    fn verify_url(self) -> &'static str {
        match self {
            Self::RecaptchaV2 | Self::RecaptchaV3 => {
                "https://www.google.com/recaptcha/api/siteverify"
            }
            Self::Hcaptcha => "https://api.hcaptcha.com/siteverify",
        }
    }
}

/// Verifies CAPTCHA response tokens against the configured provider's
/// siteverify endpoint. Disabled deployments verify everything as human.
#[derive(Clone)]
pub struct HttpCaptchaVerifier {
    pub client: reqwest::Client,
    pub enabled: bool,
    pub provider: CaptchaProvider,
    pub secret: String,
    pub min_score: f64,
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    score: Option<f64>,
    action: Option<String>,
}

impl CaptchaVerifier for HttpCaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: &str, action: &str) -> Result<bool, GateError> {
        if !self.enabled {
            return Ok(true);
        }
        if token.is_empty() {
            return Ok(false);
        }

        let params = [
            ("secret", self.secret.as_str()),
            ("response", token),
            ("remoteip", remote_ip),
        ];
        let result = self
            .client
            .post(self.provider.verify_url())
            .form(&params)
            .send()
            .await;
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(provider = ?self.provider, error = %e, "captcha provider unreachable");
                return Err(GateError::ExternalService);
            }
        };
        if !resp.status().is_success() {
            tracing::error!(provider = ?self.provider, status = %resp.status(), "captcha provider error");
            return Err(GateError::ExternalService);
        }
        let body: SiteverifyResponse = resp.json().await.map_err(|e| {
            tracing::error!(provider = ?self.provider, error = %e, "captcha response undecodable");
            GateError::ExternalService
        })?;

        if !body.success {
            return Ok(false);
        }
        if self.provider == CaptchaProvider::RecaptchaV3 {
            if let Some(expected) = body.action.as_deref() {
                if expected != action {
                    return Ok(false);
                }
            }
            return Ok(body.score.unwrap_or(0.0) >= self.min_score);
        }
        Ok(true)
    }
}
