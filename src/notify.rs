/// User-facing notification channel. Fire-and-forget: senders never wait on
/// or observe delivery.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, note: Notification);
}

/// CLI notifier: successes to stdout, errors to stderr.
pub struct TermNotifier;

impl Notifier for TermNotifier {
    fn notify(&mut self, note: Notification) {
        match note.severity {
            Severity::Error => eprintln!("{}: {}", note.title, note.description),
            _ => println!("{}: {}", note.title, note.description),
        }
    }
}

/// Keeps only the most recent notification, for the TUI footer.
#[derive(Default)]
pub struct LastNotification(pub Option<Notification>);

impl Notifier for LastNotification {
    fn notify(&mut self, note: Notification) {
        self.0 = Some(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_notification_keeps_most_recent() {
        let mut sink = LastNotification::default();
        sink.notify(Notification::success("Success", "first"));
        sink.notify(Notification::error("Error", "second"));
        let kept = sink.0.unwrap();
        assert_eq!(kept.severity, Severity::Error);
        assert_eq!(kept.description, "second");
    }
}
