mod dashboard;
mod db;
mod form;
mod models;
mod notify;
mod session;
mod tui;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dashboard::{Dashboard, StatusFilter};
use db::Database;
use form::Draft;
use models::{ApplicationStatus, JobApplication, WorkType};
use notify::TermNotifier;
use session::Session;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job application tracking - record, search, and review your applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage accounts and the signed-in session
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Add a job application
    Add {
        /// Position title
        position_title: String,

        /// Existing company name
        #[arg(short, long)]
        company: Option<String>,

        /// Create a company with this name
        #[arg(long)]
        new_company: Option<String>,

        /// Application date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Status (applied, screening, interview, offer, rejected, withdrawn)
        #[arg(short, long, default_value = "applied")]
        status: String,

        /// Work type (remote, hybrid, onsite)
        #[arg(short, long)]
        work_type: Option<String>,

        /// Location
        #[arg(short, long)]
        location: Option<String>,

        /// Salary range, free text
        #[arg(long)]
        salary: Option<String>,

        /// Job description
        #[arg(long)]
        description: Option<String>,

        /// Additional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List applications
    List {
        /// Match against position title or company name
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Filter by status, or 'all'
        #[arg(short, long)]
        status: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one application in full
    Show {
        /// Application ID
        id: i64,
    },

    /// Show aggregate counts per status
    Stats,

    /// Manage companies
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Open the interactive dashboard
    Dash,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account
    Create {
        /// Email address
        email: String,
    },

    /// Sign in as an existing account
    Login {
        /// Email address
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// List your companies
    List,

    /// Add a company
    Add {
        /// Company name
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::open()?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Account { command } => {
            db.ensure_initialized()?;
            match command {
                AccountCommands::Create { email } => {
                    let id = db.create_user(&email)?;
                    println!("Created account {} (ID: {})", email, id);
                }

                AccountCommands::Login { email } => {
                    let user = db
                        .find_user(&email)?
                        .ok_or_else(|| anyhow!("No account for {}. Run 'jobtrack account create {}' first.", email, email))?;
                    Session::sign_in(&user)?;
                    println!("Signed in as {}", user.email);
                }

                AccountCommands::Logout => {
                    if Session::sign_out()? {
                        println!("Signed out.");
                    } else {
                        println!("Not signed in.");
                    }
                }

                AccountCommands::Whoami => match Session::current()? {
                    Some(session) => match db.get_user(session.user_id)? {
                        Some(user) => println!("{} (ID: {})", user.email, user.id),
                        None => println!(
                            "Session for {} points at a missing account. Run 'jobtrack account logout'.",
                            session.email
                        ),
                    },
                    None => println!("Not signed in."),
                },
            }
        }

        Commands::Add {
            position_title,
            company,
            new_company,
            date,
            status,
            work_type,
            location,
            salary,
            description,
            notes,
        } => {
            db.ensure_initialized()?;
            let session = Session::require()?;

            let mut draft = Draft::new();
            draft.position_title = position_title;
            draft.status = status.parse::<ApplicationStatus>()?;
            if let Some(date) = date {
                draft.application_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|_| anyhow!("Invalid date '{}' (expected YYYY-MM-DD)", date))?;
            }
            if let Some(name) = company {
                let found = db
                    .find_company(session.user_id, &name)?
                    .ok_or_else(|| anyhow!("No company named '{}'. Use --new-company to create one.", name))?;
                draft.select_company(Some(found.id));
            }
            if let Some(name) = new_company {
                draft.type_new_company(name);
            }
            if let Some(wt) = work_type {
                draft.work_type = Some(wt.parse::<WorkType>()?);
            }
            draft.location = location.unwrap_or_default();
            draft.salary_range = salary.unwrap_or_default();
            draft.job_description = description.unwrap_or_default();
            draft.notes = notes.unwrap_or_default();

            // The notifier already printed the outcome; scripts still need
            // the exit code to tell a failed submit apart.
            if !form::submit(&db, session.user_id, &mut draft, &mut TermNotifier) {
                std::process::exit(1);
            }
        }

        Commands::List {
            search,
            status,
            json,
        } => {
            db.ensure_initialized()?;
            let session = Session::require()?;

            let status_filter = match status.as_deref() {
                Some(s) => StatusFilter::parse(s)?,
                None => StatusFilter::All,
            };
            let search = search.unwrap_or_default();

            let mut dash = Dashboard::new();
            dash.load(&db, session.user_id)?;
            let filtered: Vec<&JobApplication> = dash.filter(&search, status_filter).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&filtered)?);
            } else if filtered.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<12} {:<30} {:<20}",
                    "ID", "DATE", "STATUS", "POSITION", "COMPANY"
                );
                println!("{}", "-".repeat(84));
                for app in filtered {
                    println!(
                        "{:<6} {:<12} {:<12} {:<30} {:<20}",
                        app.id,
                        app.application_date.format("%Y-%m-%d"),
                        app.status.as_str(),
                        truncate(&app.position_title, 28),
                        truncate(app.company_name.as_deref().unwrap_or("-"), 18)
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            let session = Session::require()?;
            match db.get_application(session.user_id, id)? {
                Some(app) => {
                    println!("Application #{}", app.id);
                    println!("Position: {}", app.position_title);
                    if let Some(company) = &app.company_name {
                        println!("Company: {}", company);
                    }
                    println!("Applied: {}", app.application_date.format("%Y-%m-%d"));
                    println!("Status: {}", app.status);
                    if let Some(location) = &app.location {
                        println!("Location: {}", location);
                    }
                    if let Some(work_type) = app.work_type {
                        println!("Work type: {}", work_type);
                    }
                    if let Some(salary) = &app.salary_range {
                        println!("Salary: {}", salary);
                    }
                    if let Some(description) = &app.job_description {
                        println!("\n--- Description ---\n{}", description);
                    }
                    if let Some(notes) = &app.notes {
                        println!("\n--- Notes ---\n{}", notes);
                    }
                }
                None => {
                    println!("Application #{} not found.", id);
                }
            }
        }

        Commands::Stats => {
            db.ensure_initialized()?;
            let session = Session::require()?;

            let mut dash = Dashboard::new();
            dash.load(&db, session.user_id)?;
            let stats = dash.stats();
            println!("Total:      {}", stats.total);
            println!("Applied:    {}", stats.applied);
            println!("Interviews: {}", stats.interviews);
            println!("Offers:     {}", stats.offers);
            println!("Rejected:   {}", stats.rejected);
        }

        Commands::Company { command } => {
            db.ensure_initialized()?;
            let session = Session::require()?;
            match command {
                CompanyCommands::List => {
                    let companies = db.list_companies(session.user_id)?;
                    if companies.is_empty() {
                        println!("No companies found.");
                    } else {
                        println!("{:<6} {:<30} {:<20}", "ID", "NAME", "CREATED");
                        println!("{}", "-".repeat(58));
                        for company in companies {
                            println!(
                                "{:<6} {:<30} {:<20}",
                                company.id,
                                truncate(&company.name, 28),
                                truncate(&company.created_at, 18)
                            );
                        }
                    }
                }

                CompanyCommands::Add { name } => {
                    let id = db.create_company(session.user_id, &name)?;
                    println!("Added company '{}' (ID: {})", name, id);
                }
            }
        }

        Commands::Dash => {
            db.ensure_initialized()?;
            let session = Session::require()?;
            tui::run_dashboard(&db, &session)?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_cuts_multibyte_titles_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long position title", 10), "a very ...");
        // Accented and CJK titles must not split a character mid-byte.
        assert_eq!(truncate("ééééééééééé", 10), "ééééééé...");
        assert_eq!(truncate("ソフトウェアエンジニア", 8), "ソフトウェ...");
    }
}
