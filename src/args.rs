use clap::{Args, Parser, Subcommand};

use crate::locator::EntryOptions;

const EXAMPLES: &str = "\
Examples:

Generate a pass and store it:
ncpass generate my_pass_name

Generate a pass and store it with username and url:
ncpass generate my_pass_name username --url my_url

Get password by label (optionally also by username)
ncpass get my_pass_name
ncpass get my_pass_name username

Set a password (optionally with username)
ncpass set my_pass_name password
ncpass set my_pass_name username password

Set parameters for an existing password (url, notes, folder)
ncpass set my_pass_name --url my_url --notes my_notes --folder my_folder

Credentials are read from NEXTCLOUD_URL, NEXTCLOUD_USER and NEXTCLOUD_TOKEN.";

#[derive(Debug, Parser)]
#[command(author, version, about, arg_required_else_help = true, after_help = EXAMPLES)]
pub struct NcpassParse {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// create or update the password stored under a label
    Set(Set),

    /// print the password stored under a label
    #[command(alias = "getpass")]
    Get(Get),

    /// print the username stored under a label
    Getuser(GetUser),

    /// generate a new password, store it and print it
    #[command(alias = "gen")]
    Generate(Generate),

    /// remove the password stored under a label
    #[command(alias = "del")]
    Delete(Delete),

    /// list the label and username of every stored password
    List,
}

#[derive(Debug, Args)]
pub struct Set {
    /// The label of the password entry
    #[arg(allow_hyphen_values = true)]
    pub label: String,

    /// The username, or the password when it is the only value given
    #[arg(allow_hyphen_values = true)]
    pub user_or_password: Option<String>,

    /// The password, when a username is given before it
    #[arg(allow_hyphen_values = true)]
    pub password: Option<String>,

    #[command(flatten)]
    pub flags: EntryFlags,
}

impl Set {
    /// Splits the positionals into (username, password) by how many were given.
    pub fn credentials(&self) -> (Option<&str>, Option<&str>) {
        match (self.user_or_password.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => (Some(user), Some(password)),
            (Some(password), None) => (None, Some(password)),
            _ => (None, None),
        }
    }
}

#[derive(Debug, Args)]
pub struct Get {
    /// The label of the password entry
    #[arg(allow_hyphen_values = true)]
    pub label: String,

    /// Only match the entry stored for this username
    #[arg(allow_hyphen_values = true)]
    pub username: Option<String>,
}

#[derive(Debug, Args)]
pub struct GetUser {
    /// The label of the password entry
    #[arg(allow_hyphen_values = true)]
    pub label: String,
}

#[derive(Debug, Args)]
pub struct Generate {
    /// The label of the password entry
    #[arg(allow_hyphen_values = true)]
    pub label: String,

    /// The username to store alongside the generated password
    #[arg(allow_hyphen_values = true)]
    pub username: Option<String>,

    #[command(flatten)]
    pub flags: EntryFlags,
}

#[derive(Debug, Args)]
pub struct Delete {
    /// The label of the password entry to remove
    #[arg(allow_hyphen_values = true)]
    pub label: String,

    /// Only remove the entry stored for this username
    #[arg(allow_hyphen_values = true)]
    pub username: Option<String>,
}

// Each flag takes at most one value so a dangling `--url` counts as unset.
// The ids of --username and --password differ from the positionals they shadow.
#[derive(Debug, Default, Args)]
pub struct EntryFlags {
    /// Set the url of the entry
    #[arg(long, num_args = 0..=1, value_name = "URL")]
    pub url: Option<Option<String>>,

    /// Set the notes of the entry
    #[arg(long, num_args = 0..=1, value_name = "NOTES")]
    pub notes: Option<Option<String>>,

    /// Move the entry into the folder with this name ("Home" is the root folder)
    #[arg(long, num_args = 0..=1, value_name = "FOLDER")]
    pub folder: Option<Option<String>>,

    /// Override the username of the entry
    #[arg(id = "username_flag", long = "username", num_args = 0..=1, value_name = "USERNAME")]
    pub username: Option<Option<String>>,

    /// Override the password of the entry
    #[arg(id = "password_flag", long = "password", num_args = 0..=1, value_name = "PASSWORD")]
    pub password: Option<Option<String>>,
}

impl EntryFlags {
    pub fn to_options(&self) -> EntryOptions {
        EntryOptions {
            url: flag_value(&self.url),
            notes: flag_value(&self.notes),
            folder: flag_value(&self.folder),
            username: flag_value(&self.username),
            password: flag_value(&self.password),
        }
    }
}

fn flag_value(flag: &Option<Option<String>>) -> Option<String> {
    flag.clone().flatten().filter(|value| !value.is_empty())
}
