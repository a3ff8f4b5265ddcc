use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use jobboard::{
    cli::{self, SessionArgs},
    dashboard::{format_salary, hrd::{CompanyPage, JobRow}, HrdDashboard, Notice},
    jobs::JobForm,
    models::{Applicant, ApplicationStatus},
    profile::{CompanyInfoForm, ContactForm},
};

#[derive(Debug, Parser)]
#[command(name = "hrd", version, about = "Employer dashboard")]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,
    /// Print views as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Counters and the latest applicants.
    Overview,
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Applicants for one listing, or for every listing.
    Applicants {
        #[arg(long)]
        job: Option<Uuid>,
    },
    /// Move an application to another status.
    Status {
        id: Uuid,
        /// e.g. `pending`, `lolos-administrasi`, `diterima`.
        status: ApplicationStatus,
        /// Replaces the note; pass an empty string to clear it.
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the cover letter of an application.
    CoverLetter { id: Uuid },
    /// Status counters, overall or for one listing.
    Stats {
        #[arg(long)]
        job: Option<Uuid>,
    },
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Debug, Subcommand)]
enum JobsCommand {
    List,
    Show { id: Uuid },
    Create(JobArgs),
    Edit {
        id: Uuid,
        #[command(flatten)]
        form: JobArgs,
    },
    Delete { id: Uuid },
}

#[derive(Debug, Args)]
struct JobArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    company: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    requirements: String,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    salary_min: Option<i64>,
    #[arg(long)]
    salary_max: Option<i64>,
    #[arg(long)]
    employment_type: Option<String>,
}

impl From<JobArgs> for JobForm {
    fn from(args: JobArgs) -> Self {
        JobForm {
            title: args.title,
            company: args.company,
            description: args.description,
            requirements: args.requirements,
            location: args.location,
            category: args.category,
            salary_min: args.salary_min,
            salary_max: args.salary_max,
            employment_type: args.employment_type,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Show,
    Contact {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: Option<String>,
    },
    CompanyInfo {
        #[arg(long)]
        company_name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        linkedin_url: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },
    DeleteCompanyInfo,
    About { text: String },
    DeleteAbout,
    VisionMission {
        #[arg(long)]
        vision: Option<String>,
        #[arg(long)]
        mission: Option<String>,
    },
    DeleteVisionMission,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => cli::report(&err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let state = cli::bootstrap("hrd")?;
    let current = cli.session.sign_in(&state).await?;
    let mut dashboard = HrdDashboard::open(&state, current)?;
    cli::print_notices(dashboard.notices());
    let json = cli.json;

    match cli.command {
        Command::Overview => {
            let overview = dashboard.overview().await?;
            cli::emit(json, &overview, |overview| {
                println!(
                    "{} ({})",
                    cli::or_dash(overview.company_name.as_deref()),
                    if overview.is_verified { "verified" } else { "unverified" }
                );
                println!("jobs:        {} ({} active)", overview.total_jobs, overview.active_jobs);
                println!("applicants:  {}", overview.stats.total);
                println!("in progress: {}", overview.stats.in_progress());
                println!("accepted:    {}", overview.stats.accepted);
                if !overview.recent_applicants.is_empty() {
                    println!("\nRecent applicants:");
                    print_applicants(&overview.recent_applicants);
                }
            })?;
        }
        Command::Jobs(command) => jobs(&dashboard, json, command).await?,
        Command::Applicants { job } => {
            let applicants = dashboard.applicants(job).await?;
            cli::emit(json, &applicants, |applicants| print_applicants(applicants))?;
        }
        Command::Status { id, status, notes } => {
            let applicants = dashboard.set_status(id, status, notes.as_deref()).await?;
            eprintln!("{}", Notice::success(format!("Status changed to {status}.")));
            cli::emit(json, &applicants, |applicants| print_applicants(applicants))?;
        }
        Command::CoverLetter { id } => {
            let applicant = dashboard.applicant(id).await?;
            cli::emit(json, &applicant, |applicant| {
                let application = &applicant.application;
                match (&application.cover_letter, &application.cover_letter_url) {
                    (Some(text), _) if !text.trim().is_empty() => println!("{text}"),
                    (_, Some(url)) => println!("{url}"),
                    _ => println!("No cover letter."),
                }
            })?;
        }
        Command::Stats { job } => {
            let statistics = dashboard.statistics(job).await?;
            cli::emit(json, &statistics, |statistics| {
                let stats = &statistics.stats;
                println!("total:                {}", stats.total);
                for (status, count) in [
                    (ApplicationStatus::Pending, stats.pending),
                    (ApplicationStatus::PassedAdministration, stats.passed_administration),
                    (ApplicationStatus::PassedWrittenTest, stats.passed_written_test),
                    (ApplicationStatus::PassedInterview, stats.passed_interview),
                    (ApplicationStatus::Accepted, stats.accepted),
                    (ApplicationStatus::Rejected, stats.rejected),
                ] {
                    println!("{:<22}{count}", format!("{status}:"));
                }
                if !statistics.per_job.is_empty() {
                    println!();
                    print_jobs(&statistics.per_job);
                }
            })?;
        }
        Command::Profile(command) => profile(&mut dashboard, json, command).await?,
    }
    Ok(())
}

async fn jobs(dashboard: &HrdDashboard<'_>, json: bool, command: JobsCommand) -> Result<()> {
    let rows = match command {
        JobsCommand::List => dashboard.jobs().await?,
        JobsCommand::Show { id } => {
            let job = dashboard.job(id).await?;
            return cli::emit(json, &job, |job| {
                println!("{} @ {}", job.title, cli::or_dash(job.company.as_deref()));
                println!("status:   {}", if job.is_active { "active" } else { "closed" });
                println!("location: {}", cli::or_dash(job.location.as_deref()));
                println!("category: {}", cli::or_dash(job.category.as_deref()));
                println!(
                    "salary:   {}",
                    cli::or_dash(format_salary(job.salary_min, job.salary_max).as_deref())
                );
                println!("\n{}", job.description.as_deref().unwrap_or_default());
                println!("\nRequirements:\n{}", job.requirements.as_deref().unwrap_or_default());
            });
        }
        JobsCommand::Create(args) => {
            let rows = dashboard.create_job(&JobForm::from(args)).await?;
            eprintln!("{}", Notice::success("Job posted."));
            rows
        }
        JobsCommand::Edit { id, form } => {
            let rows = dashboard.update_job(id, &JobForm::from(form)).await?;
            eprintln!("{}", Notice::success("Job updated."));
            rows
        }
        JobsCommand::Delete { id } => {
            let rows = dashboard.delete_job(id).await?;
            eprintln!("{}", Notice::success("Job deleted."));
            rows
        }
    };
    cli::emit(json, &rows, |rows| print_jobs(rows))
}

async fn profile(dashboard: &mut HrdDashboard<'_>, json: bool, command: ProfileCommand) -> Result<()> {
    let (page, message) = match command {
        ProfileCommand::Show => (dashboard.company(), None),
        ProfileCommand::Contact {
            full_name,
            username,
            phone,
        } => {
            let form = ContactForm {
                full_name,
                username,
                phone,
            };
            (dashboard.save_contact(&form).await?, Some("Contact details saved."))
        }
        ProfileCommand::CompanyInfo {
            company_name,
            address,
            website,
            linkedin_url,
            industry,
            size,
        } => {
            let form = CompanyInfoForm {
                company_name,
                address,
                website,
                linkedin_url,
                industry,
                size,
            };
            (dashboard.save_company_info(&form).await?, Some("Company information saved."))
        }
        ProfileCommand::DeleteCompanyInfo => {
            (dashboard.delete_company_info().await?, Some("Company information deleted."))
        }
        ProfileCommand::About { text } => (dashboard.save_about(&text).await?, Some("About saved.")),
        ProfileCommand::DeleteAbout => (dashboard.delete_about().await?, Some("About deleted.")),
        ProfileCommand::VisionMission { vision, mission } => (
            dashboard
                .save_vision_mission(vision.as_deref(), mission.as_deref())
                .await?,
            Some("Vision and mission saved."),
        ),
        ProfileCommand::DeleteVisionMission => (
            dashboard.delete_vision_mission().await?,
            Some("Vision and mission deleted."),
        ),
    };
    if let Some(message) = message {
        eprintln!("{}", Notice::success(message));
    }
    cli::emit(json, &page, print_company)
}

fn print_company(page: &CompanyPage) {
    let company = &page.company;
    println!(
        "{} ({}% complete, {})",
        cli::or_dash(company.company_name.as_deref()),
        page.completeness,
        if company.is_verified { "verified" } else { "unverified" }
    );
    println!("contact:  {}", cli::or_dash(company.contact_name.as_deref()));
    println!("phone:    {}", cli::or_dash(company.phone.as_deref()));
    println!("address:  {}", cli::or_dash(company.address.as_deref()));
    println!("website:  {}", cli::or_dash(company.website.as_deref()));
    println!("linkedin: {}", cli::or_dash(company.linkedin_url.as_deref()));
    println!("industry: {}", cli::or_dash(company.industry.as_deref()));
    println!("size:     {}", cli::or_dash(company.size.as_deref()));
    if let Some(about) = &company.about {
        println!("\nAbout:\n{about}");
    }
    if company.vision.is_some() || company.mission.is_some() {
        println!("\nVision:\n{}", cli::or_dash(company.vision.as_deref()));
        println!("\nMission:\n{}", cli::or_dash(company.mission.as_deref()));
    }
}

fn print_jobs(rows: &[JobRow]) {
    if rows.is_empty() {
        println!("No jobs posted yet.");
        return;
    }
    for row in rows {
        println!(
            "{}  {}  {}  {} applicant(s)",
            row.job.id,
            row.job.title,
            if row.job.is_active { "active" } else { "closed" },
            row.applicants
        );
    }
}

fn print_applicants(applicants: &[Applicant]) {
    if applicants.is_empty() {
        println!("No applicants yet.");
        return;
    }
    for applicant in applicants {
        let name = applicant
            .profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref().or(p.username.as_deref()));
        println!(
            "{}  {}  {}  {}",
            applicant.application.id,
            cli::or_dash(name),
            cli::or_dash(applicant.job_title.as_deref()),
            applicant.application.status
        );
    }
}
