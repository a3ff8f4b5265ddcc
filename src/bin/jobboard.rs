use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use jobboard::{
    auth::{self, RegisterForm},
    cli::{self, SessionArgs},
    dashboard::{format_salary, Notice},
    jobs::{self, JobFilter},
    models::{Job, Role},
    state::AppState,
};

#[derive(Debug, Parser)]
#[command(name = "jobboard", version, about = "Accounts and the public job list")]
struct Cli {
    /// Print views as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an HRD or Pelamar account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        /// `HRD` or `Pelamar`.
        #[arg(long)]
        role: Role,
        #[arg(long)]
        username: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: Option<String>,
        /// Required for HRD accounts.
        #[arg(long)]
        company_name: Option<String>,
    },
    /// Sign in and print an access token for the other commands.
    Login(SessionArgs),
    /// End the session behind the given credentials.
    Logout(SessionArgs),
    /// Active job listings.
    Jobs {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// One active listing.
    Job { id: Uuid },
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
    let state = cli::bootstrap("jobboard")?;
    let json = cli.json;

    match cli.command {
        Command::Register {
            email,
            password,
            role,
            username,
            full_name,
            phone,
            company_name,
        } => {
            let form = RegisterForm {
                email,
                password,
                role,
                username,
                full_name,
                phone,
                company_name,
            };
            let registration = auth::register(&state, form).await?;
            cli::emit(json, &registration.profile, |profile| {
                println!("{}", Notice::success("Registration successful."));
                if profile.role == Role::Hrd {
                    println!("{}", Notice::warning("Your HRD account must be verified before you can post jobs."));
                }
                match &registration.session {
                    Some(current) => {
                        println!("-> continue at {}", profile.role.dashboard().path());
                        println!("export JOBBOARD_ACCESS_TOKEN={}", current.user.token().as_str());
                    }
                    None => println!("Confirm your email address, then run `jobboard login`."),
                }
            })?;
        }
        Command::Login(session) => {
            let current = session.sign_in(&state).await?;
            cli::emit(json, &current.profile, |profile| {
                println!(
                    "{}",
                    Notice::success(format!("Signed in as {} ({}).", profile.display_name(), profile.role))
                );
                println!("-> continue at {}", profile.role.dashboard().path());
                println!("export JOBBOARD_ACCESS_TOKEN={}", current.user.token().as_str());
            })?;
        }
        Command::Logout(session) => {
            let current = session.sign_in(&state).await?;
            auth::logout(&state, &current.user).await?;
            println!("{}", Notice::success("Signed out."));
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
            let listings = jobs::list_active(&state, None, &filter).await?;
            cli::emit(json, &listings, |listings| print_listings(listings))?;
        }
        Command::Job { id } => show_job(&state, json, id).await?,
    }
    Ok(())
}

async fn show_job(state: &AppState, json: bool, id: Uuid) -> Result<()> {
    let job = jobs::get_active(state, None, id).await?;
    cli::emit(json, &job, |job| {
        println!("{} @ {}", job.title, cli::or_dash(job.company.as_deref()));
        println!("location:   {}", cli::or_dash(job.location.as_deref()));
        println!("category:   {}", cli::or_dash(job.category.as_deref()));
        println!("type:       {}", cli::or_dash(job.employment_type.as_deref()));
        println!(
            "salary:     {}",
            cli::or_dash(format_salary(job.salary_min, job.salary_max).as_deref())
        );
        println!("\n{}", job.description.as_deref().unwrap_or_default());
        println!("\nRequirements:\n{}", job.requirements.as_deref().unwrap_or_default());
    })
}

fn print_listings(listings: &[Job]) {
    if listings.is_empty() {
        println!("No jobs found.");
        return;
    }
    for job in listings {
        println!(
            "{}  {}  {}  {}",
            job.id,
            job.title,
            cli::or_dash(job.company.as_deref()),
            cli::or_dash(job.location.as_deref())
        );
    }
}
