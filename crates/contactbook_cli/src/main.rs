//! Command-line front end for the contact book.
//!
//! # Responsibility
//! - Parse arguments into core calls and print results.
//! - Record every failed command in the error log before exiting non-zero.

use clap::{Args, Parser, Subcommand};
use contactbook_core::{
    default_vcard_file_name, init_logging, BookConfig, Clock, ConfigError, Contact, ContactBook,
    ContactId, ContactPatch, DuplicateCandidate, ErrorSink, Fault, FileErrorSink, ListOrder,
    StoreError, SystemClock,
};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "contactbook.toml";
const DEFAULT_VCARD_FILE: &str = "contacts.vcf";

#[derive(Parser, Debug)]
#[command(name = "contactbook", version, about = "Flat-file contact book")]
struct Cli {
    /// Directory holding the store, backups and logs
    #[arg(long, env = "CONTACTBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML config file (defaults to <data-dir>/contactbook.toml when present)
    #[arg(long, env = "CONTACTBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Diagnostic log level: trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a contact
    Add {
        name: String,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// List contacts by name
    List {
        /// Show favorites first
        #[arg(long)]
        favorites_first: bool,
    },
    /// Search by name, phone, tag, or /regex/ on the name
    Search { query: String },
    /// Update a contact identified by id or exact name
    Update {
        target: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ContactFields,
        /// Remove the email address
        #[arg(long, conflicts_with = "email")]
        clear_email: bool,
        /// Remove all tags
        #[arg(long, conflicts_with = "tag")]
        clear_tags: bool,
        /// Unmark as favorite
        #[arg(long, conflicts_with = "favorite")]
        unfavorite: bool,
    },
    /// Delete a contact identified by id or exact name
    Delete { target: String },
    /// Revert the most recent change
    Undo,
    /// Show likely duplicate pairs
    Duplicates,
    /// Merge SECONDARY into PRIMARY, or walk all duplicates with --auto
    Merge {
        #[arg(required_unless_present = "auto")]
        primary: Option<String>,
        #[arg(required_unless_present = "auto")]
        secondary: Option<String>,
        #[arg(long, conflicts_with_all = ["primary", "secondary"])]
        auto: bool,
        /// Accept every pair without prompting
        #[arg(long, requires = "auto")]
        yes: bool,
    },
    /// Write all contacts to a JSON file
    ExportJson { path: PathBuf },
    /// Replace all contacts with a JSON file's contents
    ImportJson { path: PathBuf },
    /// Append contacts from a CSV file, skipping invalid rows
    ImportCsv { path: PathBuf },
    /// Write contacts as vCards
    ExportVcard {
        /// Output file (default: <name>.vcf for one contact, contacts.vcf otherwise)
        path: Option<PathBuf>,
        /// Contact id or name; repeat to select several (default: all)
        #[arg(long = "contact")]
        contacts: Vec<String>,
    },
    /// Copy the store file to a timestamped manual backup
    Backup,
    /// List backup files
    Backups,
    /// Replace all contacts with a backup's contents
    Restore { name: String },
}

impl Command {
    /// Commands that stay usable when the store file is corrupt.
    fn recovers_store(&self) -> bool {
        matches!(self, Self::Backups | Self::Restore { .. } | Self::Undo)
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::List { .. } => "list",
            Self::Search { .. } => "search",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Undo => "undo",
            Self::Duplicates => "duplicates",
            Self::Merge { .. } => "merge",
            Self::ExportJson { .. } => "export_json",
            Self::ImportJson { .. } => "import_json",
            Self::ImportCsv { .. } => "import_csv",
            Self::ExportVcard { .. } => "export_vcard",
            Self::Backup => "backup",
            Self::Backups => "backups",
            Self::Restore { .. } => "restore",
        }
    }
}

#[derive(Args, Debug, Default)]
struct ContactFields {
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Repeat to set several tags
    #[arg(long)]
    tag: Vec<String>,
    #[arg(long)]
    favorite: bool,
}

#[derive(Debug)]
enum CliError {
    Store(StoreError),
    Io(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "console i/o failed: {err}"),
        }
    }
}

impl Error for CliError {}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let log_dir = absolute(&config.log_path());
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    if let Err(err) = init_logging(level, &log_dir) {
        eprintln!("warning: diagnostic logging disabled: {err}");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sink = Arc::new(FileErrorSink::new(config.error_log_path(), Arc::clone(&clock)));
    let operation = cli.command.operation();

    match run(cli.command, &config, clock, Arc::clone(&sink) as Arc<dyn ErrorSink>) {
        Ok(()) => {
            info!("event=command module=cli status=ok operation={operation}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=command module=cli status=error operation={operation}");
            let mut fault = Fault::new(operation, &err);
            if let CliError::Store(store_err) = &err {
                if let Some(id) = store_err.record_id() {
                    fault = fault.for_record(id);
                }
            }
            sink.record(&fault);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<BookConfig, ConfigError> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_path = cli
        .config
        .clone()
        .or_else(|| Some(data_dir.join(DEFAULT_CONFIG_FILE)).filter(|path| path.is_file()));

    let mut config = match config_path {
        Some(path) => BookConfig::load(&path)?,
        None => BookConfig::in_dir(&data_dir),
    };
    if cli.data_dir.is_some() {
        config.data_dir = data_dir;
    }
    Ok(config)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn run(
    command: Command,
    config: &BookConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
) -> Result<(), CliError> {
    let mut book = if command.recovers_store() {
        let (book, corruption) = ContactBook::open_recovering(config, clock, sink)?;
        if let Some(err) = corruption {
            eprintln!("warning: {err}; starting from an empty book");
        }
        book
    } else {
        ContactBook::open(config, clock, sink)?
    };

    match command {
        Command::Add { name, fields } => {
            let mut contact = Contact::new(name).with_favorite(fields.favorite);
            if let Some(phone) = fields.phone.as_deref() {
                contact = contact.with_phone(phone);
            }
            if let Some(email) = fields.email {
                contact = contact.with_email(email);
            }
            if !fields.tag.is_empty() {
                contact = contact.with_tags(fields.tag);
            }
            let id = book.add_contact(contact)?;
            println!("added {id}");
        }
        Command::List { favorites_first } => {
            let order = if favorites_first {
                ListOrder::FavoritesFirst
            } else {
                ListOrder::Name
            };
            print_contacts(&book.list(order));
        }
        Command::Search { query } => print_contacts(&book.find(&query)?),
        Command::Update {
            target,
            name,
            fields,
            clear_email,
            clear_tags,
            unfavorite,
        } => {
            let id = book.resolve(&target)?;
            let patch = ContactPatch {
                name,
                phone: fields.phone,
                email: if clear_email {
                    Some(None)
                } else {
                    fields.email.map(Some)
                },
                tags: if clear_tags {
                    Some(Vec::new())
                } else {
                    Some(fields.tag).filter(|tags| !tags.is_empty())
                },
                favorite: if unfavorite {
                    Some(false)
                } else {
                    fields.favorite.then_some(true)
                },
            };
            let updated = book.update_contact(id, &patch)?;
            println!("updated {}", updated.id);
        }
        Command::Delete { target } => {
            let id = book.resolve(&target)?;
            let removed = book.delete_contact(id)?;
            println!("deleted {} ({})", removed.id, removed.name);
        }
        Command::Undo => {
            book.undo()?;
            println!("reverted last change; {} contacts", book.store().len());
        }
        Command::Duplicates => {
            let candidates = book.find_duplicates();
            if candidates.is_empty() {
                println!("no duplicates found");
            }
            for candidate in &candidates {
                print_candidate(&book, candidate);
            }
        }
        Command::Merge {
            primary,
            secondary,
            auto,
            yes,
        } => {
            if auto {
                let stdin = std::io::stdin();
                let mut input = stdin.lock();
                let mut prompt_error = None;
                let report = book.auto_merge(|candidate, primary, secondary| {
                    if yes || prompt_error.is_some() {
                        return yes;
                    }
                    match confirm_merge(&mut input, candidate, primary, secondary) {
                        Ok(answer) => answer,
                        Err(err) => {
                            prompt_error = Some(err);
                            false
                        }
                    }
                })?;
                if let Some(err) = prompt_error {
                    return Err(err.into());
                }
                println!(
                    "merged {} pairs, declined {}, skipped {}, conflicts {}",
                    report.merged.len(),
                    report.declined,
                    report.skipped,
                    report.conflicts
                );
            } else if let (Some(primary), Some(secondary)) = (primary, secondary) {
                let primary = book.resolve(&primary)?;
                let secondary = book.resolve(&secondary)?;
                let merged = book.merge_pair(primary, secondary)?;
                println!("merged into {} ({})", merged.id, merged.name);
            }
        }
        Command::ExportJson { path } => {
            let count = book.export_json(&path)?;
            println!("exported {count} contacts to {}", path.display());
        }
        Command::ImportJson { path } => {
            let count = book.import_json(&path)?;
            println!("imported {count} contacts from {}", path.display());
        }
        Command::ImportCsv { path } => {
            let report = book.import_csv(&path)?;
            for rejection in &report.rejected {
                eprintln!("skipped line {}: {}", rejection.line, rejection.reason);
            }
            println!(
                "imported {} contacts, rejected {}",
                report.imported,
                report.rejected.len()
            );
        }
        Command::ExportVcard { path, contacts } => {
            let ids = contacts
                .iter()
                .map(|target| book.resolve(target))
                .collect::<Result<Vec<ContactId>, _>>()?;
            let path = match (path, ids.as_slice()) {
                (Some(path), _) => path,
                (None, [id]) => PathBuf::from(default_vcard_file_name(book.get(*id)?)),
                (None, _) => PathBuf::from(DEFAULT_VCARD_FILE),
            };
            let count = book.export_vcard(&ids, &path)?;
            println!("exported {count} vCards to {}", path.display());
        }
        Command::Backup => {
            let path = book.manual_backup()?;
            println!("backup written to {}", path.display());
        }
        Command::Backups => {
            for name in book.list_backups()? {
                println!("{name}");
            }
        }
        Command::Restore { name } => {
            let count = book.restore_backup(&name)?;
            println!("restored {count} contacts from {name}");
        }
    }
    Ok(())
}

fn print_contacts(contacts: &[&Contact]) {
    if contacts.is_empty() {
        println!("no contacts");
        return;
    }
    for contact in contacts {
        println!(
            "{}{}  {}  {}  {}  [{}]",
            if contact.favorite { "* " } else { "  " },
            contact.name,
            contact.phone,
            contact.email.as_deref().unwrap_or("-"),
            contact.id,
            contact.tags.join(", ")
        );
    }
}

fn print_candidate(book: &ContactBook, candidate: &DuplicateCandidate) {
    let name = |id: ContactId| {
        book.get(id)
            .map(|contact| contact.name.clone())
            .unwrap_or_default()
    };
    println!(
        "{:.2}  {} ({})  <->  {} ({})",
        candidate.score,
        name(candidate.first),
        candidate.first,
        name(candidate.second),
        candidate.second
    );
}

fn confirm_merge(
    input: &mut impl BufRead,
    candidate: &DuplicateCandidate,
    primary: &Contact,
    secondary: &Contact,
) -> std::io::Result<bool> {
    let mut stdout = std::io::stdout();
    write!(
        stdout,
        "merge '{}' into '{}' (score {:.2})? [y/N] ",
        secondary.name, primary.name, candidate.score
    )?;
    stdout.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
