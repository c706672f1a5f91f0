//! Post-commit notifications.
//!
//! Flows build a list of [`Notification`]s after their primary write has
//! committed and hand it to [`dispatch`]. Delivery is best-effort: every
//! notification is attempted, each send is bounded by the configured timeout,
//! and failures are logged and counted but never returned to the caller.
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::repo_types::User;
use crate::config::MailConfig;
use crate::contacts::repo_types::Lead;
use crate::mailer::{EmailMessage, Mailer};

#[derive(Debug, Clone)]
pub enum Notification {
    /// Registration link for an invited agent.
    Invitation { email: String, link: String },
    /// Welcome message for a freshly registered agent.
    Welcome { email: String, first_name: String },
    /// Admin notice about a new agent account.
    AgentRegistered(User),
    /// Admin notice about a new lead.
    LeadForAdmin { lead: Lead, agent_username: String },
    /// Notice to the agent who referred the lead.
    LeadForAgent { lead: Lead, agent_email: String },
}

fn lead_details(lead: &Lead) -> String {
    format!(
        "Name: {}\nEmail: {}\nPhone: {}\n\nDestination: {}\nTravel date: {}\nTravelers: {}\nBudget: {}\n\nMessage:\n{}\n",
        lead.name,
        lead.email,
        lead.phone,
        lead.destination,
        lead.travel_date,
        lead.number_of_travelers,
        lead.budget,
        lead.message,
    )
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Invitation { .. } => "invitation",
            Notification::Welcome { .. } => "welcome",
            Notification::AgentRegistered(_) => "agent_registered",
            Notification::LeadForAdmin { .. } => "lead_for_admin",
            Notification::LeadForAgent { .. } => "lead_for_agent",
        }
    }

    pub fn render(&self, mail: &MailConfig) -> EmailMessage {
        match self {
            Notification::Invitation { email, link } => EmailMessage {
                to: email.clone(),
                reply_to: None,
                subject: "Your agent registration link".into(),
                text: format!(
                    "You have been invited to join as an agent.\n\nComplete your registration here:\n{link}\n\nThis link expires in 24 hours. If you did not expect this invitation, ignore this email.\n"
                ),
            },
            Notification::Welcome { email, first_name } => EmailMessage {
                to: email.clone(),
                reply_to: None,
                subject: "Welcome aboard".into(),
                text: format!(
                    "Welcome, {first_name}!\n\nYour agent account is ready. Log in to get your personal contact form link.\n"
                ),
            },
            Notification::AgentRegistered(user) => EmailMessage {
                to: mail.admin_recipient.clone(),
                reply_to: None,
                subject: "New agent registration".into(),
                text: format!(
                    "A new agent has registered:\n\n{} {}\nEmail: {}\nUsername: {}\n",
                    user.first_name, user.last_name, user.email, user.username
                ),
            },
            Notification::LeadForAdmin {
                lead,
                agent_username,
            } => EmailMessage {
                to: mail.admin_recipient.clone(),
                reply_to: Some(lead.email.clone()),
                subject: format!("New travel inquiry - {}", lead.destination),
                text: format!(
                    "{}\nReferred by agent: {agent_username}\n",
                    lead_details(lead)
                ),
            },
            Notification::LeadForAgent { lead, agent_email } => EmailMessage {
                to: agent_email.clone(),
                reply_to: Some(lead.email.clone()),
                subject: format!("New travel inquiry - {}", lead.destination),
                text: format!("New inquiry from your referral link:\n\n{}", lead_details(lead)),
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

pub async fn dispatch(
    mailer: &dyn Mailer,
    mail: &MailConfig,
    notifications: Vec<Notification>,
) -> DeliveryReport {
    let timeout = Duration::from_secs(mail.timeout_secs.max(1));
    let mut report = DeliveryReport::default();
    for n in notifications {
        let message = n.render(mail);
        match tokio::time::timeout(timeout, mailer.send(&message)).await {
            Ok(Ok(())) => {
                debug!(kind = n.kind(), to = %message.to, "notification sent");
                report.sent += 1;
            }
            Ok(Err(e)) => {
                warn!(kind = n.kind(), to = %message.to, error = %e, "notification failed");
                report.failed += 1;
            }
            Err(_) => {
                warn!(kind = n.kind(), to = %message.to, "notification timed out");
                report.failed += 1;
            }
        }
    }
    if report.failed > 0 {
        warn!(sent = report.sent, failed = report.failed, "notification batch incomplete");
    } else {
        debug!(sent = report.sent, "notification batch delivered");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct FlakyMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            if message.to.starts_with("broken") {
                anyhow::bail!("relay refused");
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn mail_config() -> MailConfig {
        MailConfig {
            from: "desk@example.com".into(),
            admin_recipient: "admin@example.com".into(),
            relay_url: None,
            relay_api_key: None,
            timeout_secs: 2,
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_notifications() {
        let mailer = FlakyMailer {
            sent: Mutex::new(Vec::new()),
        };
        let report = dispatch(
            &mailer,
            &mail_config(),
            vec![
                Notification::Welcome {
                    email: "broken@example.com".into(),
                    first_name: "Ann".into(),
                },
                Notification::Invitation {
                    email: "new@example.com".into(),
                    link: "http://frontend.test/register?token=t".into(),
                },
            ],
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 1, failed: 1 });
        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("register?token=t"));
    }

    #[test]
    fn admin_notices_go_to_configured_recipient() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: "ann@example.com".into(),
            username: "ann".into(),
            password_hash: String::new(),
            role: crate::auth::repo_types::Role::Agent,
            referral_code: "QWERTY".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };
        let msg = Notification::AgentRegistered(user).render(&mail_config());
        assert_eq!(msg.to, "admin@example.com");
        assert!(msg.text.contains("Username: ann"));
    }
}
