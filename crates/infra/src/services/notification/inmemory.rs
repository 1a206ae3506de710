use super::INotificationSender;
use obligations_domain::ReminderNotification;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

/// Records every notification instead of delivering it. Failures can be
/// injected to exercise the retry paths of the dispatcher.
pub struct InMemoryNotificationSender {
    sent: Mutex<Vec<ReminderNotification>>,
    failures_left: AtomicUsize,
    fail_always: AtomicBool,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            failures_left: AtomicUsize::new(0),
            fail_always: AtomicBool::new(false),
        }
    }

    /// Successfully delivered notifications in the order they were sent
    pub fn sent(&self) -> Vec<ReminderNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// The next `count` sends will fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        if self.fail_always.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
    }
}

impl Default for InMemoryNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl INotificationSender for InMemoryNotificationSender {
    async fn send(&self, notification: &ReminderNotification) -> anyhow::Result<()> {
        if self.should_fail() {
            anyhow::bail!("Notification receiver is unavailable");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
