//! Finding entries in the remote collection by label and username.
//!
//! Every lookup fetches the whole collection and scans it front to back, so
//! the first entry in remote order wins when labels repeat.

use crate::remote::{Password, RemoteError, Repository, ROOT_FOLDER};

use log::{debug, warn};

// Folder name that always means the root folder
pub const HOME_FOLDER: &str = "Home";

/// Field overrides given as `--option value` on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOptions {
    pub url: Option<String>,
    pub notes: Option<String>,
    pub folder: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Outcome of [`find_existing`]: the stored entry, or a fresh template for
/// the requested label and username.
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    Found(Password),
    NotFound(Password),
}

impl Located {
    pub fn entry(&self) -> &Password {
        match self {
            Located::Found(entry) | Located::NotFound(entry) => entry,
        }
    }

    pub fn entry_mut(&mut self) -> &mut Password {
        match self {
            Located::Found(entry) | Located::NotFound(entry) => entry,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Located::Found(_))
    }
}

fn username_filter(username: Option<&str>) -> Option<&str> {
    username.filter(|username| !username.is_empty())
}

fn matches(password: &Password, label: &str, username: Option<&str>) -> bool {
    password.label == label && username.map_or(true, |username| password.username == username)
}

fn first_match<R: Repository + ?Sized>(
    repo: &R,
    label: &str,
    username: Option<&str>,
) -> Result<Option<Password>, RemoteError> {
    let username = username_filter(username);
    Ok(repo
        .passwords()?
        .into_iter()
        .find(|password| matches(password, label, username)))
}

pub fn find_existing<R: Repository + ?Sized>(
    repo: &R,
    label: &str,
    username: Option<&str>,
    options: &EntryOptions,
) -> Result<Located, RemoteError> {
    let mut located = match first_match(repo, label, username)? {
        Some(password) => Located::Found(password),
        None => Located::NotFound(Password::template(label, username_filter(username))),
    };
    debug!("Lookup of '{}' found an existing entry: {}", label, located.is_found());

    apply_options(repo, located.entry_mut(), options)?;
    Ok(located)
}

pub fn apply_options<R: Repository + ?Sized>(
    repo: &R,
    entry: &mut Password,
    options: &EntryOptions,
) -> Result<(), RemoteError> {
    if let Some(url) = &options.url {
        entry.url = url.clone();
    }
    if let Some(notes) = &options.notes {
        entry.notes = notes.clone();
    }
    if let Some(username) = &options.username {
        entry.username = username.clone();
    }
    if let Some(password) = &options.password {
        entry.password = password.clone();
    }
    if let Some(name) = &options.folder {
        match resolve_folder(repo, name)? {
            Some(id) => entry.folder = id,
            None => warn!("Folder not found: {}", name),
        }
    }
    Ok(())
}

pub fn find_password<R: Repository + ?Sized>(
    repo: &R,
    label: &str,
    username: Option<&str>,
) -> Result<String, RemoteError> {
    Ok(first_match(repo, label, username)?
        .map(|password| password.password)
        .unwrap_or_default())
}

pub fn find_user<R: Repository + ?Sized>(repo: &R, label: &str) -> Result<String, RemoteError> {
    Ok(first_match(repo, label, None)?
        .map(|password| password.username)
        .unwrap_or_default())
}

pub fn list_all<R: Repository + ?Sized>(repo: &R) -> Result<Vec<(String, String)>, RemoteError> {
    Ok(repo
        .passwords()?
        .into_iter()
        .map(|password| (password.label, password.username))
        .collect())
}

pub fn resolve_folder<R: Repository + ?Sized>(repo: &R, name: &str) -> Result<Option<String>, RemoteError> {
    if name == HOME_FOLDER {
        return Ok(Some(ROOT_FOLDER.to_string()));
    }
    Ok(repo
        .folders()?
        .into_iter()
        .find(|folder| folder.label == name)
        .map(|folder| folder.id))
}
