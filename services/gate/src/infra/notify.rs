use serde_json::json;

use crate::domain::repository::Notifier;
use crate::domain::types::Template;
use crate::error::GateError;

/// Templated email dispatch through the mailer service. One POST per
/// message, bounded by the client timeout, never retried here; callers
/// decide whether a failed send is fatal.
#[derive(Clone)]
pub struct HttpNotifier {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl Notifier for HttpNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: serde_json::Value,
    ) -> Result<(), GateError> {
        let url = format!("{}/send", self.base_url.trim_end_matches('/'));
        let result = self
            .client
            .post(&url)
            .json(&json!({
                "recipient": recipient,
                "template": template.as_str(),
                "data": data,
            }))
            .send()
            .await;
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(template = template.as_str(), error = %e, "mailer unreachable");
                return Err(GateError::ExternalService);
            }
        };
        if !resp.status().is_success() {
            tracing::error!(
                template = template.as_str(),
                status = %resp.status(),
                "mailer rejected message"
            );
            return Err(GateError::ExternalService);
        }
        Ok(())
    }
}
