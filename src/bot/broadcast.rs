use std::fmt::Display;
use std::future::Future;

use num_format::{Locale, ToFormattedString};
use teloxide::types::{ChatId, UserId};

use super::{impls, WBot};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn sent_text(&self) -> String {
        self.sent.to_formatted_string(&Locale::en)
    }
    pub fn failed_text(&self) -> String {
        self.failed.to_formatted_string(&Locale::en)
    }
}

/// Calls `send` for every recipient but `except`, one at a time. A failed send is
/// logged and counted.
pub async fn deliver<F, Fut, E>(recipients: &[UserId], except: UserId, mut send: F) -> BroadcastReport
where
    F: FnMut(UserId) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut report = BroadcastReport::default();
    for &user_id in recipients.iter().filter(|id| **id != except) {
        match send(user_id).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                log::warn!("could not send message to user {}: {}", user_id.0, e);
                report.failed += 1;
            }
        }
    }
    report
}

/// Sends the MarkdownV2 `text` to every registered user except the sender.
pub async fn broadcast(bot: &WBot, recipients: &[UserId], text: &str, except: UserId) -> BroadcastReport {
    let report = deliver(recipients, except, |user_id| async move {
        impls::send(bot, ChatId::from(user_id), text).await.map(|_| ())
    })
    .await;
    log::info!("broadcast delivered to {} users, {} failed", report.sent_text(), report.failed_text());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn sender_is_skipped_and_failures_are_counted() {
        let visited = Mutex::new(Vec::new());
        let recipients = [UserId(1), UserId(2), UserId(3), UserId(4)];
        let report = deliver(&recipients, UserId(2), |user_id| {
            visited.lock().unwrap().push(user_id);
            async move {
                if user_id == UserId(3) {
                    Err("bot was blocked by the user")
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert_eq!(report, BroadcastReport { sent: 2, failed: 1 });
        assert_eq!(*visited.lock().unwrap(), vec![UserId(1), UserId(3), UserId(4)]);
    }

    #[test]
    fn counts_are_formatted() {
        let report = BroadcastReport { sent: 12345, failed: 0 };
        assert_eq!(report.sent_text(), "12,345");
        assert_eq!(report.failed_text(), "0");
    }
}
