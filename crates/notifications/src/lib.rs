use std::sync::{Arc, Weak};
use std::time::Duration;

use core_types::NoticeKind;
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

pub type NoticeId = Uuid;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    /// Monotonic creation order within one centre.
    pub seq: u64,
    pub kind: NoticeKind,
    pub text: String,
    pub created_at: Instant,
    pub duration: Duration,
}

struct Entry {
    notice: Notice,
    timer: Option<AbortHandle>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    next_seq: u64,
}

/// Auto-expiring notices, each with its own timer.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    inner: Arc<Mutex<Inner>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, kind: NoticeKind, text: impl Into<String>) -> NoticeId {
        self.notify_for(kind, text, DEFAULT_DURATION)
    }

    pub fn notify_for(
        &self,
        kind: NoticeKind,
        text: impl Into<String>,
        duration: Duration,
    ) -> NoticeId {
        let id = NoticeId::new_v4();
        let mut inner = self.inner.lock();
        inner.next_seq += 1;
        let notice = Notice {
            id,
            seq: inner.next_seq,
            kind,
            text: text.into(),
            created_at: Instant::now(),
            duration,
        };
        debug!(?kind, text = %notice.text, "notice raised");

        let timer = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let weak = Arc::downgrade(&self.inner);
                let task = handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    expire(&weak, id);
                });
                Some(task.abort_handle())
            }
            Err(_) => {
                warn!("no async runtime; notice will stay until dismissed");
                None
            }
        };
        inner.entries.push(Entry { notice, timer });
        id
    }

    pub fn success(&self, text: impl Into<String>) -> NoticeId {
        self.notify(NoticeKind::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> NoticeId {
        self.notify(NoticeKind::Error, text)
    }

    pub fn warning(&self, text: impl Into<String>) -> NoticeId {
        self.notify(NoticeKind::Warning, text)
    }

    pub fn info(&self, text: impl Into<String>) -> NoticeId {
        self.notify(NoticeKind::Info, text)
    }

    /// Removes one notice and cancels its timer. Other notices are untouched.
    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut inner = self.inner.lock();
        let Some(pos) = inner.entries.iter().position(|e| e.notice.id == id) else {
            return false;
        };
        let entry = inner.entries.remove(pos);
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        true
    }

    /// Visible notices, oldest first.
    pub fn active(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.notice.clone())
            .collect()
    }

    /// Visible notices created after `seq`.
    pub fn since(&self, seq: u64) -> Vec<Notice> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.notice.seq > seq)
            .map(|e| e.notice.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expire(inner: &Weak<Mutex<Inner>>, id: NoticeId) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    inner.lock().entries.retain(|e| e.notice.id != id);
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;

    async fn settle(duration: Duration) {
        sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn notice_expires_after_default_duration() {
        let center = NotificationCenter::new();
        center.success("知识添加成功！");
        assert_eq!(center.len(), 1);

        settle(Duration::from_millis(2999)).await;
        assert_eq!(center.len(), 1);

        settle(Duration::from_millis(2)).await;
        assert!(center.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn notices_keep_creation_order() {
        let center = NotificationCenter::new();
        center.info("first");
        center.error("second");
        center.warning("third");

        let texts: Vec<_> = center.active().into_iter().map(|n| n.text).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(center.active()[1].kind, NoticeKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_only_affects_its_own_notice() {
        let center = NotificationCenter::new();
        let short = center.notify_for(NoticeKind::Info, "short", Duration::from_secs(1));
        let long = center.notify_for(NoticeKind::Info, "long", Duration::from_secs(5));
        let dismissed = center.notify_for(NoticeKind::Error, "gone", Duration::from_secs(5));

        assert!(center.dismiss(dismissed));
        assert!(!center.dismiss(dismissed));
        assert_eq!(center.len(), 2);

        settle(Duration::from_millis(1500)).await;
        let remaining: Vec<_> = center.active().into_iter().map(|n| n.id).collect();
        assert_eq!(remaining, vec![long]);
        assert!(!remaining.contains(&short));

        settle(Duration::from_secs(4)).await;
        assert!(center.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn since_returns_only_newer_notices() {
        let center = NotificationCenter::new();
        center.info("a");
        let seen = center.active().last().map(|n| n.seq).unwrap_or_default();
        center.info("b");

        let fresh = center.since(seen);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].text, "b");
    }

    #[test]
    fn without_runtime_notice_waits_for_dismissal() {
        let center = NotificationCenter::new();
        let id = center.warning("no timer");
        assert_eq!(center.len(), 1);
        assert!(center.dismiss(id));
        assert!(center.is_empty());
    }
}
