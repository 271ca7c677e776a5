use std::{error::Error, io::Write};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::identities;
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "lumbung_admin")]
#[command(about = "Admin utilities for Lumbung (bootstrap identities, inspect families)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./lumbung.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Identity(Identity),
    Family(Family),
}

#[derive(Args, Debug)]
struct Identity {
    #[command(subcommand)]
    command: IdentityCommand,
}

#[derive(Subcommand, Debug)]
enum IdentityCommand {
    Create(IdentityCreateArgs),
}

#[derive(Args, Debug)]
struct IdentityCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    /// Role hint used when the profile is provisioned ("ayah" or "ibu").
    #[arg(long)]
    role: Option<String>,
}

#[derive(Args, Debug)]
struct Family {
    #[command(subcommand)]
    command: FamilyCommand,
}

#[derive(Subcommand, Debug)]
enum FamilyCommand {
    Show(FamilyShowArgs),
}

#[derive(Args, Debug)]
struct FamilyShowArgs {
    #[arg(long)]
    id: Uuid,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::Identity(Identity {
            command: IdentityCommand::Create(args),
        }) => {
            if let Some(role) = args.role.as_deref()
                && engine::Role::try_from(role).is_err()
            {
                eprintln!("invalid role: {role} (expected \"ayah\" or \"ibu\")");
                std::process::exit(2);
            }

            let email = args.email.trim().to_lowercase();
            if identities::Entity::find()
                .filter(identities::Column::Email.eq(email.clone()))
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("identity already exists: {email}");
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;

            let identity = identities::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email.clone()),
                password: Set(password),
                name: Set(args.name),
                role: Set(args.role),
                created_at: Set(Utc::now()),
            };
            identities::Entity::insert(identity).exec(&db).await?;

            println!("created identity: {email}");
        }
        Command::Family(Family {
            command: FamilyCommand::Show(args),
        }) => {
            let engine = engine::Engine::builder().database(db.clone()).build().await?;
            let family = engine.family_by_id(args.id).await?;

            println!("family: {} ({})", family.name, family.id);
            for member in &family.members {
                println!("  {} <{}> [{}]", member.name, member.email, member.role);
            }
        }
    }

    Ok(())
}
