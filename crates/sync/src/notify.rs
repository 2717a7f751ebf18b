use async_trait::async_trait;
use eyre::Result;
use slotbook_core::models::appointment::Appointment;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, email: Email) -> Result<()>;
}

/// Notifier that only logs the emails it is asked to send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, email: Email) -> Result<()> {
        info!("Sending email to {} with subject {}", email.to, email.subject);
        Ok(())
    }
}

pub fn confirmation_email(appointment: &Appointment) -> Email {
    Email {
        to: appointment.client_email.clone(),
        subject: "Your appointment is confirmed".to_string(),
        html: format!(
            "<p>Hi {},</p><p>Your appointment on {} at {} is confirmed.</p>",
            appointment.client_name,
            appointment.day(),
            appointment.time.display_12h()
        ),
    }
}

pub fn cancellation_email(appointment: &Appointment) -> Email {
    Email {
        to: appointment.client_email.clone(),
        subject: "Your appointment was cancelled".to_string(),
        html: format!(
            "<p>Hi {},</p><p>Your appointment on {} at {} has been cancelled.</p>",
            appointment.client_name,
            appointment.day(),
            appointment.time.display_12h()
        ),
    }
}
