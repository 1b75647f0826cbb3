use std::time::{Duration, Instant};

use discconfig::DiscConfig;

use crate::capture::STATUS_DISPLAY;

/// Latest user-facing message with an expiry deadline.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `message` for the standard display interval.
    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.show_for(message, now, STATUS_DISPLAY);
    }

    pub fn show_for(&mut self, message: impl Into<String>, now: Instant, duration: Duration) {
        self.message = Some((message.into(), now + duration));
    }

    pub fn current(&self, now: Instant) -> Option<&str> {
        match &self.message {
            Some((message, deadline)) if now < *deadline => Some(message.as_str()),
            _ => None,
        }
    }

    /// Drops an expired message; returns true when something was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let expired = matches!(&self.message, Some((_, deadline)) if now >= *deadline);
        if expired {
            self.message = None;
        }
        expired
    }
}

/// Compact parameter summary used in the window title.
pub fn parameter_summary(config: &DiscConfig) -> String {
    format!(
        "spacing {:.1} | ellipse {:.2} | focus ({:+.2}, {:+.2}) | fov {:.0}°",
        config.spacing,
        config.eccentricity,
        config.focal_offset[0],
        config.focal_offset[1],
        config.field_of_view
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_expires_after_display_interval() {
        let now = Instant::now();
        let mut status = StatusLine::new();
        status.show("saved", now);

        assert_eq!(status.current(now + Duration::from_secs(1)), Some("saved"));
        assert!(!status.expire(now + Duration::from_secs(1)));
        assert_eq!(status.current(now + STATUS_DISPLAY), None);
        assert!(status.expire(now + STATUS_DISPLAY));
        assert!(!status.expire(now + STATUS_DISPLAY));
    }

    #[test]
    fn newer_message_replaces_older_one() {
        let now = Instant::now();
        let mut status = StatusLine::new();
        status.show("first", now);
        status.show_for("second", now, Duration::from_millis(10));
        assert_eq!(status.current(now), Some("second"));
        assert_eq!(status.current(now + Duration::from_millis(10)), None);
    }

    #[test]
    fn summary_lists_current_parameters() {
        let summary = parameter_summary(&DiscConfig::default());
        assert_eq!(
            summary,
            "spacing 0.5 | ellipse 1.00 | focus (+0.00, +0.00) | fov 50°"
        );
    }
}
