// src/notify/mod.rs
pub mod email;

use anyhow::Result;

use crate::alerts::Alert;

pub use email::EmailNotifier;

/// Delivery channel for alert messages.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log only. Used when no SMTP section is configured.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        tracing::info!(ticker = %alert.ticker, kind = ?alert.kind, "{}", alert.message);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Send every alert through every channel. A failing channel is logged and
/// skipped; returns how many (alert, channel) deliveries succeeded.
pub async fn dispatch(notifiers: &[Box<dyn Notifier>], alerts: &[Alert]) -> usize {
    let mut delivered = 0;
    for alert in alerts {
        for n in notifiers {
            match n.send(alert).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(error = ?e, notifier = n.name(), ticker = %alert.ticker, "alert delivery failed");
                }
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{check_alerts, AlertThresholds};
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl Notifier for Recording {
        async fn send(&self, alert: &Alert) -> Result<()> {
            self.0.lock().unwrap().push(alert.message.clone());
            Ok(())
        }
        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl Notifier for Broken {
        async fn send(&self, _alert: &Alert) -> Result<()> {
            Err(anyhow!("smtp down"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_others() {
        let alerts = check_alerts("AAPL", Some(4.8), None, &AlertThresholds::default());
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(Broken),
            Box::new(Recording(Mutex::new(vec![]))),
            Box::new(LogNotifier),
        ];
        let delivered = dispatch(&notifiers, &alerts).await;
        assert_eq!(delivered, 2);
    }
}
