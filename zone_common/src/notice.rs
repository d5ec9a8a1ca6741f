use std::time::{Duration, Instant};

pub const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    raised_at: Instant,
    lifetime: Duration,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self::raised_at(kind, message, Instant::now())
    }

    pub fn raised_at(kind: NoticeKind, message: impl Into<String>, at: Instant) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at: at,
            lifetime: NOTICE_LIFETIME,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= self.lifetime
    }
}

/// Holds at most one notice; a new one replaces the old, and it disappears on expiry.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn show(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Error => tracing::warn!("{}", notice.message),
            _ => tracing::info!("{}", notice.message),
        }
        self.current = Some(notice);
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Returns the live notice, dropping it first if it has expired.
    pub fn current(&mut self, now: Instant) -> Option<&Notice> {
        if self.current.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.current = None;
        }
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_expires_after_five_seconds() {
        let t0 = Instant::now();
        let notice = Notice::raised_at(NoticeKind::Info, "hi", t0);
        assert!(!notice.is_expired(t0 + Duration::from_millis(4999)));
        assert!(notice.is_expired(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_board_replaces_and_expires() {
        let t0 = Instant::now();
        let mut board = NoticeBoard::default();
        board.show(Notice::raised_at(NoticeKind::Info, "first", t0));
        board.show(Notice::raised_at(NoticeKind::Error, "second", t0));
        assert_eq!(board.current(t0).map(|n| n.message.as_str()), Some("second"));
        assert!(board.current(t0 + NOTICE_LIFETIME).is_none());
        assert!(board.current(t0).is_none());
    }
}
