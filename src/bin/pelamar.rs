use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use jobboard::{
    applications::{ApplyForm, CoverLetter, DocumentUpdate},
    cli::{self, SessionArgs},
    dashboard::{format_date, format_period, pelamar::JobCard, Notice, PelamarDashboard},
    jobs::JobFilter,
    models::{ApplicationWithJob, CareerEntry, EducationEntry, LicenseEntry},
    profile::PersonalForm,
    records::{Career, CareerForm, Education, EducationForm, License, LicenseForm, RecordKind},
    validation::UploadFile,
};

#[derive(Debug, Parser)]
#[command(name = "pelamar", version, about = "Job-seeker dashboard")]
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
    /// Profile strength, counters and recent applications.
    Overview,
    /// Active job listings.
    Jobs {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// One listing, with your application to it if any.
    Job { id: Uuid },
    /// The newest listings.
    Recommendations,
    /// Apply to a listing with a PDF CV.
    Apply {
        job: Uuid,
        #[arg(long)]
        cv: PathBuf,
        #[arg(long, conflicts_with = "cover_letter")]
        cover_letter_file: Option<PathBuf>,
        #[arg(long)]
        cover_letter: Option<String>,
    },
    /// Your applications, newest first.
    Applications,
    /// Replace the CV or cover letter of an application still in progress.
    UpdateDocuments {
        id: Uuid,
        #[arg(long)]
        cv: Option<PathBuf>,
        #[arg(long)]
        cover_letter_file: Option<PathBuf>,
    },
    /// Withdraw an application still in progress.
    Withdraw { id: Uuid },
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Career(CareerCommand),
    #[command(subcommand)]
    Education(EducationCommand),
    #[command(subcommand)]
    License(LicenseCommand),
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Show,
    Edit {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        linkedin_url: Option<String>,
        #[arg(long)]
        portfolio_url: Option<String>,
    },
}

enum RecordAction<F> {
    List,
    Add(F),
    Edit(Uuid, F),
    Delete(Uuid),
}

macro_rules! record_command {
    ($command:ident, $args:ty, $form:ty) => {
        #[derive(Debug, Subcommand)]
        enum $command {
            List,
            Add($args),
            Edit {
                id: Uuid,
                #[command(flatten)]
                form: $args,
            },
            Delete {
                id: Uuid,
            },
        }

        impl From<$command> for RecordAction<$form> {
            fn from(command: $command) -> Self {
                match command {
                    $command::List => RecordAction::List,
                    $command::Add(args) => RecordAction::Add(args.into()),
                    $command::Edit { id, form } => RecordAction::Edit(id, form.into()),
                    $command::Delete { id } => RecordAction::Delete(id),
                }
            }
        }
    };
}

record_command!(CareerCommand, CareerArgs, CareerForm);
record_command!(EducationCommand, EducationArgs, EducationForm);
record_command!(LicenseCommand, LicenseArgs, LicenseForm);

#[derive(Debug, Args)]
struct CareerArgs {
    #[arg(long)]
    job_title: String,
    #[arg(long)]
    company_name: String,
    #[arg(long)]
    location: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    start_date: NaiveDate,
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    current: bool,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
struct EducationArgs {
    #[arg(long)]
    institution_name: String,
    #[arg(long)]
    degree: String,
    #[arg(long)]
    field_of_study: Option<String>,
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    current: bool,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
struct LicenseArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    issuing_organization: String,
    #[arg(long)]
    issue_date: Option<NaiveDate>,
    #[arg(long)]
    expiry_date: Option<NaiveDate>,
    #[arg(long)]
    credential_id: Option<String>,
    #[arg(long)]
    credential_url: Option<String>,
}

impl From<CareerArgs> for CareerForm {
    fn from(args: CareerArgs) -> Self {
        CareerForm {
            job_title: args.job_title,
            company_name: args.company_name,
            location: args.location,
            start_date: args.start_date,
            end_date: args.end_date,
            is_current: args.current,
            description: args.description,
        }
    }
}

impl From<EducationArgs> for EducationForm {
    fn from(args: EducationArgs) -> Self {
        EducationForm {
            institution_name: args.institution_name,
            degree: args.degree,
            field_of_study: args.field_of_study,
            start_date: args.start_date,
            end_date: args.end_date,
            is_current: args.current,
            description: args.description,
        }
    }
}

impl From<LicenseArgs> for LicenseForm {
    fn from(args: LicenseArgs) -> Self {
        LicenseForm {
            name: args.name,
            issuing_organization: args.issuing_organization,
            issue_date: args.issue_date,
            expiry_date: args.expiry_date,
            credential_id: args.credential_id,
            credential_url: args.credential_url,
        }
    }
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
    let state = cli::bootstrap("pelamar")?;
    let current = cli.session.sign_in(&state).await?;
    let mut dashboard = PelamarDashboard::open(&state, current)?;
    cli::print_notices(dashboard.notices());
    let json = cli.json;

    match cli.command {
        Command::Overview => {
            let overview = dashboard.overview().await?;
            cli::emit(json, &overview, |overview| {
                println!("{} ({}% profile strength)", overview.display_name, overview.profile_strength);
                println!("applications: {}", overview.total);
                println!("in progress:  {}", overview.in_progress);
                println!("accepted:     {}", overview.accepted);
                if !overview.recent.is_empty() {
                    println!("\nRecent applications:");
                    print_applications(&overview.recent);
                }
            })?;
        }
        Command::Jobs {
            category,
            location,
            search,
        } => {
            let filter = JobFilter {
                category,
                location,
                search,
            };
            let cards = dashboard.jobs(&filter).await?;
            cli::emit(json, &cards, |cards| print_cards(cards))?;
        }
        Command::Job { id } => {
            let detail = dashboard.job(id).await?;
            cli::emit(json, &detail, |detail| {
                let job = &detail.card.job;
                println!("{} @ {}", job.title, cli::or_dash(job.company.as_deref()));
                println!("location: {}", cli::or_dash(job.location.as_deref()));
                println!("category: {}", cli::or_dash(job.category.as_deref()));
                println!("type:     {}", cli::or_dash(job.employment_type.as_deref()));
                println!("salary:   {}", cli::or_dash(detail.card.salary.as_deref()));
                println!("\n{}", job.description.as_deref().unwrap_or_default());
                println!("\nRequirements:\n{}", job.requirements.as_deref().unwrap_or_default());
                if let Some(application) = &detail.application {
                    println!("\nYou applied: {}", application.status);
                }
            })?;
        }
        Command::Recommendations => {
            let cards = dashboard.recommendations().await?;
            cli::emit(json, &cards, |cards| print_cards(cards))?;
        }
        Command::Apply {
            job,
            cv,
            cover_letter_file,
            cover_letter,
        } => {
            let cover_letter = match (cover_letter_file, cover_letter) {
                (Some(path), _) => Some(CoverLetter::File(UploadFile::from_path(&path).await?)),
                (None, Some(text)) => Some(CoverLetter::Text(text)),
                (None, None) => None,
            };
            let form = ApplyForm {
                cv: UploadFile::from_path(&cv).await?,
                cover_letter,
            };
            let applications = dashboard.apply(job, &form).await?;
            eprintln!("{}", Notice::success("Application sent."));
            cli::emit(json, &applications, |applications| print_applications(applications))?;
        }
        Command::Applications => {
            let applications = dashboard.applications().await?;
            cli::emit(json, &applications, |applications| print_applications(applications))?;
        }
        Command::UpdateDocuments {
            id,
            cv,
            cover_letter_file,
        } => {
            let update = DocumentUpdate {
                cv: match cv {
                    Some(path) => Some(UploadFile::from_path(&path).await?),
                    None => None,
                },
                cover_letter: match cover_letter_file {
                    Some(path) => Some(UploadFile::from_path(&path).await?),
                    None => None,
                },
            };
            let applications = dashboard.update_documents(id, &update).await?;
            eprintln!("{}", Notice::success("Documents updated."));
            cli::emit(json, &applications, |applications| print_applications(applications))?;
        }
        Command::Withdraw { id } => {
            let applications = dashboard.withdraw(id).await?;
            eprintln!("{}", Notice::success("Application withdrawn."));
            cli::emit(json, &applications, |applications| print_applications(applications))?;
        }
        Command::Profile(ProfileCommand::Show) => {
            let page = dashboard.profile();
            cli::emit(json, &page, print_personal)?;
        }
        Command::Profile(ProfileCommand::Edit {
            full_name,
            username,
            phone,
            address,
            bio,
            linkedin_url,
            portfolio_url,
        }) => {
            let form = PersonalForm {
                full_name,
                username,
                phone,
                address,
                bio,
                linkedin_url,
                portfolio_url,
            };
            let page = dashboard.save_profile(&form).await?;
            eprintln!("{}", Notice::success("Profile saved."));
            cli::emit(json, &page, print_personal)?;
        }
        Command::Career(command) => {
            let entries = records::<Career>(&dashboard, command.into()).await?;
            cli::emit(json, &entries, |entries| print_career(entries))?;
        }
        Command::Education(command) => {
            let entries = records::<Education>(&dashboard, command.into()).await?;
            cli::emit(json, &entries, |entries| print_education(entries))?;
        }
        Command::License(command) => {
            let entries = records::<License>(&dashboard, command.into()).await?;
            cli::emit(json, &entries, |entries| print_licenses(entries))?;
        }
    }
    Ok(())
}

async fn records<K: RecordKind>(
    dashboard: &PelamarDashboard<'_>,
    action: RecordAction<K::Form>,
) -> Result<Vec<K::Entry>> {
    let (entries, done) = match action {
        RecordAction::List => return Ok(dashboard.records::<K>().await?),
        RecordAction::Add(form) => (dashboard.add_record::<K>(&form).await?, "added"),
        RecordAction::Edit(id, form) => (dashboard.edit_record::<K>(id, &form).await?, "updated"),
        RecordAction::Delete(id) => (dashboard.delete_record::<K>(id).await?, "deleted"),
    };
    eprintln!("{}", Notice::success(format!("The {} was {done}.", K::LABEL)));
    Ok(entries)
}

fn print_personal(page: &jobboard::dashboard::pelamar::PersonalPage) {
    let profile = &page.profile;
    println!("{} ({}% profile strength)", profile.display_name(), page.profile_strength);
    println!("username:  {}", cli::or_dash(profile.username.as_deref()));
    println!("email:     {}", cli::or_dash(page.email.as_deref()));
    println!("phone:     {}", cli::or_dash(profile.phone.as_deref()));
    println!("address:   {}", cli::or_dash(profile.address.as_deref()));
    println!("linkedin:  {}", cli::or_dash(profile.linkedin_url.as_deref()));
    println!("portfolio: {}", cli::or_dash(profile.portfolio_url.as_deref()));
    if let Some(bio) = &profile.bio {
        println!("\n{bio}");
    }
}

fn print_cards(cards: &[JobCard]) {
    if cards.is_empty() {
        println!("No jobs found.");
        return;
    }
    for card in cards {
        println!(
            "{}  {}  {}  {}{}",
            card.job.id,
            card.job.title,
            cli::or_dash(card.job.company.as_deref()),
            cli::or_dash(card.salary.as_deref()),
            if card.applied { "  [applied]" } else { "" }
        );
    }
}

fn print_applications(applications: &[ApplicationWithJob]) {
    if applications.is_empty() {
        println!("No applications yet.");
        return;
    }
    for item in applications {
        let title = item.job.as_ref().map(|job| job.title.as_str());
        let applied_on = item
            .application
            .created_at
            .map(|at| format_date(at.date_naive()));
        println!(
            "{}  {}  {}  {}",
            item.application.id,
            cli::or_dash(title),
            item.application.status,
            cli::or_dash(applied_on.as_deref())
        );
    }
}

fn print_career(entries: &[CareerEntry]) {
    if entries.is_empty() {
        println!("No career history yet.");
    }
    for entry in entries {
        println!(
            "{}  {} @ {}  {}",
            entry.id,
            entry.job_title,
            entry.company_name,
            format_period(Some(entry.start_date), entry.end_date, entry.is_current)
        );
    }
}

fn print_education(entries: &[EducationEntry]) {
    if entries.is_empty() {
        println!("No education yet.");
    }
    for entry in entries {
        println!(
            "{}  {} {}  {}",
            entry.id,
            entry.degree,
            entry.institution_name,
            format_period(entry.start_date, entry.end_date, entry.is_current)
        );
    }
}

fn print_licenses(entries: &[LicenseEntry]) {
    if entries.is_empty() {
        println!("No licenses yet.");
    }
    for entry in entries {
        let issued = entry.issue_date.map(format_date);
        println!(
            "{}  {} ({})  {}",
            entry.id,
            entry.name,
            entry.issuing_organization,
            cli::or_dash(issued.as_deref())
        );
    }
}
