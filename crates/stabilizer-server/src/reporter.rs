//! Result reporting to the issue tracker.
//!
//! When a result retires a priority entry, the ticket that pinned the
//! package gets a comment with the verdict and where the build log was
//! archived. Without a tracker configured the report is only logged.
//! Delivery failures are logged and dropped.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use stabilizer_core::{Atom, PackageState, TicketId};

use crate::config::TrackerConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One finished stabilization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub ticket: TicketId,
    pub atom: Atom,
    /// Stable or Blocked.
    pub state: PackageState,
    pub log_path: PathBuf,
}

impl Report {
    /// Word used for the verdict in comments.
    pub fn verdict(&self) -> &'static str {
        match self.state {
            PackageState::Blocked => "unstable",
            _ => "stable",
        }
    }

    /// Comment body posted to the ticket.
    pub fn comment(&self) -> String {
        format!(
            "Automated stabilization build for {atom}.\n\
             The build appears to be {verdict} on this architecture.\n\
             Build log: {log}",
            atom = self.atom,
            verdict = self.verdict(),
            log = self.log_path.display(),
        )
    }
}

/// Where reports go.
#[derive(Debug, Clone)]
pub enum Reporter {
    /// Reports are written to the tracing log only.
    LogOnly,
    /// Reports are posted as comments on a Bugzilla-style REST tracker.
    Tracker {
        client: reqwest::Client,
        url: String,
        api_key: Option<String>,
    },
}

impl Reporter {
    pub fn from_config(tracker: Option<&TrackerConfig>) -> Self {
        match tracker {
            Some(tracker) => Reporter::Tracker {
                client: reqwest::Client::new(),
                url: tracker.url.clone(),
                api_key: tracker.api_key.clone(),
            },
            None => Reporter::LogOnly,
        }
    }

    /// Delivers `report`. Never fails.
    pub async fn report(&self, report: &Report) {
        tracing::info!(
            ticket = %report.ticket,
            atom = %report.atom,
            verdict = report.verdict(),
            log = %report.log_path.display(),
            "stabilization result"
        );

        let Reporter::Tracker {
            client,
            url,
            api_key,
        } = self
        else {
            return;
        };
        if !report.ticket.is_known() {
            tracing::debug!(atom = %report.atom, "no ticket number, comment skipped");
            return;
        }

        let endpoint = format!("{}/bug/{}/comment", url, report.ticket.0);
        let mut req = client
            .post(&endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "comment": report.comment() }));
        if let Some(key) = api_key {
            req = req.query(&[("api_key", key)]);
        }

        match req.send().await.and_then(|resp| resp.error_for_status()) {
            Ok(_) => tracing::debug!(ticket = %report.ticket, "comment posted"),
            Err(e) => tracing::warn!(
                ticket = %report.ticket,
                endpoint = %endpoint,
                error = %e,
                "failed to post result comment"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: PackageState) -> Report {
        Report {
            ticket: TicketId(581234),
            atom: Atom::new("dev-libs/foo-1.2").unwrap(),
            state,
            log_path: PathBuf::from("logs/foo.log"),
        }
    }

    #[test]
    fn comment_names_verdict_and_log() {
        let stable = report(PackageState::Stable).comment();
        assert!(stable.contains("dev-libs/foo-1.2"));
        assert!(stable.contains("stable"));
        assert!(stable.contains("logs/foo.log"));

        assert_eq!(report(PackageState::Blocked).verdict(), "unstable");
    }

    #[test]
    fn config_selects_variant() {
        assert!(matches!(Reporter::from_config(None), Reporter::LogOnly));
        let tracker = TrackerConfig {
            url: "https://bugs.example.org/rest".to_string(),
            api_key: None,
        };
        assert!(matches!(
            Reporter::from_config(Some(&tracker)),
            Reporter::Tracker { .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_tracker_is_not_fatal() {
        let tracker = TrackerConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: Some("key".to_string()),
        };
        Reporter::from_config(Some(&tracker))
            .report(&report(PackageState::Stable))
            .await;
    }
}
