//! Command dispatch layer.
//!
//! Maps each parsed command onto locator lookups and repository writes.
//! Results go to `out`, human-facing diagnostics to `diag`; every remote
//! failure is returned to the caller instead of being printed here.

use crate::args::{Command, Delete, Generate, Get, GetUser, Set};
use crate::generator;
use crate::locator::{self, EntryOptions, Located};
use crate::remote::{Password, RemoteError, Repository};

use anyhow::Result;
use log::{info, trace};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("missing arguments! at least label and password is required")]
    MissingPassword,
}

pub fn dispatch<R: Repository + ?Sized>(
    command: Command,
    repo: &R,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> Result<()> {
    trace!("Dispatching {}", command_name(&command));

    match command {
        Command::Set(args) => set(repo, &args),
        Command::Get(args) => get(repo, &args, out),
        Command::Getuser(args) => get_user(repo, &args, out),
        Command::Generate(args) => generate(repo, &args, out),
        Command::Delete(args) => delete(repo, &args, diag),
        Command::List => list(repo, out),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Set(_) => "set",
        Command::Get(_) => "get",
        Command::Getuser(_) => "getuser",
        Command::Generate(_) => "generate",
        Command::Delete(_) => "delete",
        Command::List => "list",
    }
}

/// Creates the entry when it was never stored, updates it otherwise.
pub fn persist<R: Repository + ?Sized>(repo: &R, located: Located) -> Result<Password, RemoteError> {
    match located {
        Located::Found(entry) if entry.is_persisted() => {
            let saved = repo.update(&entry)?;
            info!("Updated: {} {}", saved.label, saved.username);
            Ok(saved)
        }
        Located::Found(entry) | Located::NotFound(entry) => {
            let saved = repo.create(&entry)?;
            info!("Created: {} {}", saved.label, saved.username);
            Ok(saved)
        }
    }
}

fn set<R: Repository + ?Sized>(repo: &R, args: &Set) -> Result<()> {
    let (username, password) = args.credentials();
    let mut located = locator::find_existing(repo, &args.label, username, &args.flags.to_options())?;

    if let Some(password) = password {
        located.entry_mut().password = password.to_string();
    } else if !located.is_found() && located.entry().password.is_empty() {
        return Err(CommandError::MissingPassword.into());
    }

    persist(repo, located)?;
    Ok(())
}

fn get<R: Repository + ?Sized>(repo: &R, args: &Get, out: &mut dyn Write) -> Result<()> {
    let password = locator::find_password(repo, &args.label, args.username.as_deref())?;
    writeln!(out, "{}", password)?;
    Ok(())
}

fn get_user<R: Repository + ?Sized>(repo: &R, args: &GetUser, out: &mut dyn Write) -> Result<()> {
    let username = locator::find_user(repo, &args.label)?;
    writeln!(out, "{}", username)?;
    Ok(())
}

fn generate<R: Repository + ?Sized>(repo: &R, args: &Generate, out: &mut dyn Write) -> Result<()> {
    let new_password = generator::generate_password();
    let mut located = locator::find_existing(repo, &args.label, args.username.as_deref(), &args.flags.to_options())?;
    located.entry_mut().password = new_password;

    let saved = persist(repo, located)?;
    writeln!(out, "{}", saved.password)?;
    Ok(())
}

fn delete<R: Repository + ?Sized>(repo: &R, args: &Delete, diag: &mut dyn Write) -> Result<()> {
    let located = locator::find_existing(repo, &args.label, args.username.as_deref(), &EntryOptions::default())?;

    match located {
        Located::Found(entry) if entry.is_persisted() => {
            repo.delete(&entry)?;
            info!("Deleted {:?}", entry.id);
            writeln!(diag, "Deleted: {} {}", entry.label, entry.username)?;
        }
        Located::Found(entry) | Located::NotFound(entry) => {
            writeln!(diag, "Password not found: {} {}", entry.label, entry.username)?;
        }
    }
    Ok(())
}

fn list<R: Repository + ?Sized>(repo: &R, out: &mut dyn Write) -> Result<()> {
    for (label, username) in locator::list_all(repo)? {
        writeln!(out, "{} {}", label, username)?;
    }
    Ok(())
}
