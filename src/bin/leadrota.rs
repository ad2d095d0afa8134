//! leadrota CLI — operator interface to the assignment engine.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use leadrota::config::Config;
use leadrota::engine::Engine;
use leadrota::model::{EmployeeId, LeadId, LeadTemperature, NewEmployee, NewLead};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leadrota", about = "Capacity-bounded lead assignment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Employee operations
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },
    /// Lead operations
    Lead {
        #[command(subcommand)]
        action: LeadAction,
    },
    /// Drain the unassigned backlog of one partition
    Sweep {
        /// Partition key (language)
        language: String,
    },
    /// Tail the engine's event stream
    Events {
        /// Only events after this sequence number
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

#[derive(Subcommand)]
enum EmployeeAction {
    /// Onboard an employee (sweeps their partition)
    Add {
        /// Unique employee code (e.g. EMP-0042)
        code: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Partition key; empty keeps them out of automatic assignment
        #[arg(long, default_value = "")]
        language: String,
    },
    /// Offboard an employee; their ongoing leads return to the pool
    Remove {
        /// Employee ID (full UUID)
        id: String,
    },
    /// Move an employee to a different partition (sweeps the new one)
    SetLanguage {
        id: String,
        language: String,
    },
    /// List all employees with their current load
    List,
}

#[derive(Subcommand)]
enum LeadAction {
    /// Submit a lead; it is assigned immediately if capacity exists
    Add {
        name: String,
        email: String,
        #[arg(long, default_value = "")]
        source: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        language: String,
        /// hot | warm | cold
        #[arg(long, default_value = "warm")]
        temperature: String,
    },
    /// Close a lead on behalf of its owner (frees capacity, sweeps)
    Close {
        id: String,
        /// Owning employee ID
        employee: String,
    },
    /// Show a lead
    Show {
        id: String,
    },
    /// List the unassigned backlog of a partition, oldest first
    Backlog {
        language: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let engine = Engine::with_config(&config.database_path, config.engine)?;

    match cli.command {
        Command::Employee { action } => match action {
            EmployeeAction::Add {
                code,
                first_name,
                last_name,
                email,
                location,
                language,
            } => {
                let employee = engine.add_employee(
                    NewEmployee::new(code)
                        .name(first_name, last_name)
                        .email(email)
                        .location(location)
                        .language(language),
                )?;
                println!(
                    "added {} ({}) language={:?} load={}",
                    employee.employee_code,
                    employee.id.0,
                    employee.language,
                    employee.load()
                );
            }
            EmployeeAction::Remove { id } => {
                let orphaned = engine.remove_employee(parse_employee_id(&id)?)?;
                println!("removed; {} lead(s) returned to the pool", orphaned.len());
                for lead_id in orphaned {
                    println!("  {}", lead_id.0);
                }
            }
            EmployeeAction::SetLanguage { id, language } => {
                engine.set_employee_language(parse_employee_id(&id)?, &language)?;
                println!("ok");
            }
            EmployeeAction::List => {
                for e in engine.employees()? {
                    println!(
                        "{}  {:24} lang={:8} load={} closed={}",
                        e.id.0,
                        e.employee_code,
                        if e.language.is_empty() { "-" } else { e.language.as_str() },
                        e.load(),
                        e.closed_leads_count
                    );
                }
            }
        },
        Command::Lead { action } => match action {
            LeadAction::Add {
                name,
                email,
                source,
                location,
                language,
                temperature,
            } => {
                let (lead, chosen) = engine.add_lead(
                    NewLead::new(name, email)
                        .source(source)
                        .location(location)
                        .language(language)
                        .temperature(parse_temperature(&temperature)?),
                )?;
                match chosen {
                    Some(e) => println!("created {} -> assigned to {}", lead.id.0, e.employee_code),
                    None => println!("created {} (unassigned)", lead.id.0),
                }
            }
            LeadAction::Close { id, employee } => {
                engine.close_lead(parse_lead_id(&id)?, parse_employee_id(&employee)?)?;
                println!("ok");
            }
            LeadAction::Show { id } => {
                let lead = engine.lead(parse_lead_id(&id)?)?;
                println!("{}", serde_json::to_string_pretty(&lead)?);
            }
            LeadAction::Backlog { language } => {
                for lead in engine.unassigned_leads(&language)? {
                    println!("{}  {:24} created={}", lead.id.0, lead.name, lead.created_at);
                }
            }
        },
        Command::Sweep { language } => {
            let assigned = engine.sweep(&language)?;
            println!("assigned {assigned} lead(s) in {language:?}");
        }
        Command::Events { since } => {
            for event in engine.events_since(since)? {
                println!(
                    "{:>6}  {}  {}",
                    event.seq,
                    event.timestamp,
                    serde_json::to_string(&event.kind)?
                );
            }
        }
    }

    Ok(())
}

fn parse_employee_id(raw: &str) -> anyhow::Result<EmployeeId> {
    Ok(EmployeeId(
        raw.parse().with_context(|| format!("bad employee id {raw:?}"))?,
    ))
}

fn parse_lead_id(raw: &str) -> anyhow::Result<LeadId> {
    Ok(LeadId(
        raw.parse().with_context(|| format!("bad lead id {raw:?}"))?,
    ))
}

fn parse_temperature(raw: &str) -> anyhow::Result<LeadTemperature> {
    match raw.to_ascii_lowercase().as_str() {
        "hot" => Ok(LeadTemperature::Hot),
        "warm" => Ok(LeadTemperature::Warm),
        "cold" => Ok(LeadTemperature::Cold),
        other => bail!("unknown temperature {other:?} (expected hot|warm|cold)"),
    }
}
