use webhook::client::WebhookClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditCategory {
    Admin,
    User,
    Content,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    pub culprit: String,
    pub category: AuditCategory,
    pub description: String,
}

impl AuditLog {
    pub fn title(&self) -> String {
        self.culprit.clone()
            + match self.category {
                AuditCategory::Admin => " did an admin action",
                AuditCategory::User => " did a user action",
                AuditCategory::Content => " changed content",
            }
    }
}

/// Posts the audit entry to the logging webhook, if one is configured.
pub fn send_audit(webhook_url: Option<&str>, audit: AuditLog) {
    tracing::info!(
        culprit = %audit.culprit,
        category = ?audit.category,
        description = %audit.description,
        "audit"
    );

    let Some(url) = webhook_url else {
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };

    let url = url.to_string();
    runtime.spawn(async move {
        let client = WebhookClient::new(&url);
        let user_url = format!("https://github.com/{}", audit.culprit);
        let title = audit.title();
        let result = client
            .send(move |message| {
                message.embed(|embed| {
                    embed
                        .title(&title)
                        .url(&user_url)
                        .description(&audit.description)
                })
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "audit webhook failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_name_the_culprit() {
        let audit = AuditLog {
            culprit: "octo".into(),
            category: AuditCategory::Admin,
            description: "migrated shards".into(),
        };
        assert_eq!(audit.title(), "octo did an admin action");
    }

    #[test]
    fn no_webhook_is_a_no_op() {
        send_audit(
            None,
            AuditLog {
                culprit: "octo".into(),
                category: AuditCategory::User,
                description: "joined".into(),
            },
        );
    }
}
