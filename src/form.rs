use chrono::{Local, NaiveDate};

use crate::db::Database;
use crate::models::{ApplicationStatus, WorkType};
use crate::notify::{Notification, Notifier};

/// The in-progress application form state. Free-text fields stay as plain
/// strings until submit; blanks become NULL at the store boundary.
/// `company_id` picks an existing company; `new_company_name` asks for one
/// to be created. Choosing one clears the other.
#[derive(Debug, Clone)]
pub struct Draft {
    pub position_title: String,
    pub company_id: Option<i64>,
    pub new_company_name: String,
    pub application_date: NaiveDate,
    pub status: ApplicationStatus,
    pub location: String,
    pub work_type: Option<WorkType>,
    pub salary_range: String,
    pub job_description: String,
    pub notes: String,
}

impl Draft {
    pub fn new() -> Self {
        Self {
            position_title: String::new(),
            company_id: None,
            new_company_name: String::new(),
            application_date: Local::now().date_naive(),
            status: ApplicationStatus::Applied,
            location: String::new(),
            work_type: None,
            salary_range: String::new(),
            job_description: String::new(),
            notes: String::new(),
        }
    }

    pub fn select_company(&mut self, id: Option<i64>) {
        self.company_id = id;
        if id.is_some() {
            self.new_company_name.clear();
        }
    }

    pub fn type_new_company(&mut self, name: String) {
        self.new_company_name = name;
        if !self.new_company_name.is_empty() {
            self.company_id = None;
        }
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate and write the draft. Returns true when an application was
/// saved, in which case the draft has been reset to defaults and the caller
/// should reload its list. On any failure the draft is left untouched so
/// the user can fix it and retry; the outcome lands on the notifier either
/// way.
pub fn submit(
    db: &Database,
    user_id: i64,
    draft: &mut Draft,
    notifier: &mut dyn Notifier,
) -> bool {
    if draft.position_title.trim().is_empty() {
        notifier.notify(Notification::error("Error", "Position title is required"));
        return false;
    }

    match db.submit_application(user_id, draft) {
        Ok(_) => {
            notifier.notify(Notification::success(
                "Success",
                "Job application added successfully!",
            ));
            *draft = Draft::new();
            true
        }
        Err(e) => {
            notifier.notify(Notification::error("Error", format!("{:#}", e)));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;

    struct Collecting(Vec<Notification>);

    impl Notifier for Collecting {
        fn notify(&mut self, note: Notification) {
            self.0.push(note);
        }
    }

    #[test]
    fn test_new_draft_defaults_to_today_and_applied() {
        let draft = Draft::new();
        assert_eq!(draft.application_date, Local::now().date_naive());
        assert_eq!(draft.status, ApplicationStatus::Applied);
        assert!(draft.position_title.is_empty());
        assert_eq!(draft.company_id, None);
    }

    #[test]
    fn test_selecting_company_and_typing_one_are_exclusive() {
        let mut draft = Draft::new();
        draft.type_new_company("Acme".to_string());
        assert_eq!(draft.company_id, None);

        draft.select_company(Some(3));
        assert!(draft.new_company_name.is_empty());

        draft.type_new_company("Globex".to_string());
        assert_eq!(draft.company_id, None);
        assert_eq!(draft.new_company_name, "Globex");
    }

    #[test]
    fn test_empty_title_rejected_before_any_write() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("me@example.com").unwrap();
        let mut notes = Collecting(Vec::new());

        let mut draft = Draft::new();
        draft.new_company_name = "Acme".to_string();
        assert!(!submit(&db, user, &mut draft, &mut notes));

        assert!(db.list_applications(user).unwrap().is_empty());
        assert!(db.list_companies(user).unwrap().is_empty());
        assert_eq!(notes.0.len(), 1);
        assert_eq!(notes.0[0].severity, Severity::Error);
        // Draft kept for retry.
        assert_eq!(draft.new_company_name, "Acme");
    }

    #[test]
    fn test_submit_with_new_company_creates_one_of_each() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("me@example.com").unwrap();
        let mut notes = Collecting(Vec::new());

        let mut draft = Draft::new();
        draft.position_title = "Engineer".to_string();
        draft.new_company_name = "Acme".to_string();
        assert!(submit(&db, user, &mut draft, &mut notes));

        let companies = db.list_companies(user).unwrap();
        let apps = db.list_applications(user).unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].company_id, Some(companies[0].id));
        assert_eq!(notes.0[0].severity, Severity::Success);
        // Draft reset to defaults.
        assert!(draft.position_title.is_empty());
        assert!(draft.new_company_name.is_empty());
    }

    #[test]
    fn test_submit_with_existing_company_creates_no_company() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("me@example.com").unwrap();
        let company_id = db.create_company(user, "Globex").unwrap();
        let mut notes = Collecting(Vec::new());

        let mut draft = Draft::new();
        draft.position_title = "Designer".to_string();
        draft.select_company(Some(company_id));
        assert!(submit(&db, user, &mut draft, &mut notes));

        assert_eq!(db.list_companies(user).unwrap().len(), 1);
        assert_eq!(db.list_applications(user).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_draft_and_reports_error() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("me@example.com").unwrap();
        let mut notes = Collecting(Vec::new());

        let mut draft = Draft::new();
        draft.position_title = "Engineer".to_string();
        draft.company_id = Some(9999); // no such company
        assert!(!submit(&db, user, &mut draft, &mut notes));

        assert!(db.list_applications(user).unwrap().is_empty());
        assert_eq!(notes.0[0].severity, Severity::Error);
        assert_eq!(draft.position_title, "Engineer");
    }
}
