use anyhow::Result;

use crate::db::Database;
use crate::models::{ApplicationStatus, JobApplication, Stats};

/// Status selector for the list view: everything, or one status exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(ApplicationStatus),
}

impl StatusFilter {
    /// all -> applied -> screening -> ... -> withdrawn -> all
    pub fn next(self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::Only(ApplicationStatus::ALL[0]),
            StatusFilter::Only(status) => {
                let idx = ApplicationStatus::ALL.iter().position(|s| *s == status);
                match idx {
                    Some(i) if i + 1 < ApplicationStatus::ALL.len() => {
                        StatusFilter::Only(ApplicationStatus::ALL[i + 1])
                    }
                    _ => StatusFilter::All,
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }

    pub fn parse(s: &str) -> Result<StatusFilter> {
        if s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            Ok(StatusFilter::Only(s.parse()?))
        }
    }
}

/// In-memory collection of the signed-in user's applications plus the
/// counts derived from it. The filtered view is recomputed on demand and
/// never stored.
#[derive(Default)]
pub struct Dashboard {
    applications: Vec<JobApplication>,
    stats: Stats,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the user's applications (newest first, company names joined
    /// in) and replace the collection. On failure the previous collection
    /// and stats stay as they were.
    pub fn load(&mut self, db: &Database, user_id: i64) -> Result<()> {
        let applications = db.list_applications(user_id)?;
        self.stats = compute_stats(&applications);
        self.applications = applications;
        Ok(())
    }

    pub fn applications(&self) -> &[JobApplication] {
        &self.applications
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// View of the collection matching both predicates, in load order.
    /// Pure and synchronous; cheap enough to re-run on every keystroke.
    pub fn filter<'a>(
        &'a self,
        search_term: &str,
        status_filter: StatusFilter,
    ) -> impl Iterator<Item = &'a JobApplication> {
        let term = search_term.to_lowercase();
        self.applications
            .iter()
            .filter(move |app| matches(app, &term, status_filter))
    }
}

/// An entry matches when its position title or company name contains the
/// (already lowercased) term, and its status passes the selector.
fn matches(app: &JobApplication, term_lower: &str, status_filter: StatusFilter) -> bool {
    let matches_search = app.position_title.to_lowercase().contains(term_lower)
        || app
            .company_name
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .contains(term_lower);
    let matches_status = match status_filter {
        StatusFilter::All => true,
        StatusFilter::Only(status) => app.status == status,
    };
    matches_search && matches_status
}

pub fn compute_stats(applications: &[JobApplication]) -> Stats {
    let count = |status: ApplicationStatus| {
        applications.iter().filter(|a| a.status == status).count()
    };
    Stats {
        total: applications.len(),
        applied: count(ApplicationStatus::Applied),
        interviews: count(ApplicationStatus::Interview),
        offers: count(ApplicationStatus::Offer),
        rejected: count(ApplicationStatus::Rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn app(title: &str, company: Option<&str>, status: ApplicationStatus) -> JobApplication {
        JobApplication {
            id: 0,
            user_id: 1,
            company_id: None,
            company_name: company.map(str::to_string),
            position_title: title.to_string(),
            application_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            status,
            location: None,
            work_type: None,
            salary_range: None,
            job_description: None,
            notes: None,
            created_at: String::new(),
        }
    }

    fn dashboard(apps: Vec<JobApplication>) -> Dashboard {
        let stats = compute_stats(&apps);
        Dashboard {
            applications: apps,
            stats,
        }
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let dash = dashboard(vec![
            app("Engineer", Some("Acme"), ApplicationStatus::Applied),
            app("Designer", Some("Globex"), ApplicationStatus::Interview),
            app("Analyst", None, ApplicationStatus::Rejected),
        ]);
        let titles: Vec<&str> = dash
            .filter("", StatusFilter::All)
            .map(|a| a.position_title.as_str())
            .collect();
        assert_eq!(titles, vec!["Engineer", "Designer", "Analyst"]);
    }

    #[test]
    fn test_search_matches_title_or_company_case_insensitively() {
        let dash = dashboard(vec![
            app("Engineer", Some("Acme"), ApplicationStatus::Applied),
            app("Designer", Some("Globex"), ApplicationStatus::Interview),
        ]);

        // Matches the title of one and the company of neither.
        let by_title: Vec<&str> = dash
            .filter("ENG", StatusFilter::All)
            .map(|a| a.position_title.as_str())
            .collect();
        assert_eq!(by_title, vec!["Engineer"]);

        // Matches only via company name.
        let by_company: Vec<&str> = dash
            .filter("glob", StatusFilter::All)
            .map(|a| a.position_title.as_str())
            .collect();
        assert_eq!(by_company, vec!["Designer"]);
    }

    #[test]
    fn test_filter_soundness_and_completeness() {
        let apps = vec![
            app("Engineer", Some("Acme"), ApplicationStatus::Applied),
            app("Senior Engineer", None, ApplicationStatus::Offer),
            app("Designer", Some("Engel & Sons"), ApplicationStatus::Applied),
            app("Manager", Some("Globex"), ApplicationStatus::Applied),
        ];
        let dash = dashboard(apps.clone());
        let term = "eng";

        let hits: Vec<&JobApplication> = dash.filter(term, StatusFilter::All).collect();
        for hit in &hits {
            let in_title = hit.position_title.to_lowercase().contains(term);
            let in_company = hit
                .company_name
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(term);
            assert!(in_title || in_company);
        }
        // Everything left out really fails the predicate.
        assert_eq!(hits.len(), 3);
        assert!(!hits.iter().any(|a| a.position_title == "Manager"));
    }

    #[test]
    fn test_status_filter_is_exact() {
        let dash = dashboard(vec![
            app("Engineer", Some("Acme"), ApplicationStatus::Applied),
            app("Designer", Some("Globex"), ApplicationStatus::Interview),
            app("Analyst", None, ApplicationStatus::Withdrawn),
        ]);
        let only: Vec<&str> = dash
            .filter("", StatusFilter::Only(ApplicationStatus::Interview))
            .map(|a| a.position_title.as_str())
            .collect();
        assert_eq!(only, vec!["Designer"]);
    }

    #[test]
    fn test_stats_count_each_named_bucket_exactly() {
        let apps = vec![
            app("A", None, ApplicationStatus::Applied),
            app("B", None, ApplicationStatus::Applied),
            app("C", None, ApplicationStatus::Interview),
            app("D", None, ApplicationStatus::Offer),
            app("E", None, ApplicationStatus::Rejected),
            app("F", None, ApplicationStatus::Screening),
            app("G", None, ApplicationStatus::Withdrawn),
        ];
        let stats = compute_stats(&apps);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.interviews, 1);
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.rejected, 1);
        // Screening and withdrawn have no bucket, so the named ones sum short.
        let named = stats.applied + stats.interviews + stats.offers + stats.rejected;
        assert!(named <= stats.total);
        assert_eq!(named, 5);
    }

    #[test]
    fn test_dashboard_scenario() {
        let dash = dashboard(vec![
            app("Engineer", Some("Acme"), ApplicationStatus::Applied),
            app("Designer", Some("Globex"), ApplicationStatus::Interview),
        ]);

        let eng: Vec<(&str, Option<&str>)> = dash
            .filter("eng", StatusFilter::All)
            .map(|a| (a.position_title.as_str(), a.company_name.as_deref()))
            .collect();
        assert_eq!(eng, vec![("Engineer", Some("Acme"))]);

        let interviews: Vec<(&str, Option<&str>)> = dash
            .filter("", StatusFilter::Only(ApplicationStatus::Interview))
            .map(|a| (a.position_title.as_str(), a.company_name.as_deref()))
            .collect();
        assert_eq!(interviews, vec![("Designer", Some("Globex"))]);

        assert_eq!(
            dash.stats(),
            Stats {
                total: 2,
                applied: 1,
                interviews: 1,
                offers: 0,
                rejected: 0,
            }
        );
    }

    #[test]
    fn test_status_filter_cycle_visits_every_status_then_wraps() {
        let mut filter = StatusFilter::All;
        let mut seen = Vec::new();
        for _ in 0..ApplicationStatus::ALL.len() {
            filter = filter.next();
            seen.push(filter);
        }
        for status in ApplicationStatus::ALL {
            assert!(seen.contains(&StatusFilter::Only(status)));
        }
        assert_eq!(filter.next(), StatusFilter::All);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(StatusFilter::parse("all").unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::parse("offer").unwrap(),
            StatusFilter::Only(ApplicationStatus::Offer)
        );
        assert!(StatusFilter::parse("maybe").is_err());
    }

    #[test]
    fn test_failed_load_keeps_previous_collection() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("me@example.com").unwrap();
        let mut dash = dashboard(vec![app("Kept", None, ApplicationStatus::Applied)]);

        // Drop the table out from under the view-model to force a read error.
        db.execute_batch("DROP TABLE job_applications").unwrap();
        assert!(dash.load(&db, user).is_err());
        assert_eq!(dash.applications().len(), 1);
        assert_eq!(dash.applications()[0].position_title, "Kept");
        assert_eq!(dash.stats().total, 1);
    }
}
