use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

use contactdesk::config::{self, Config};
use contactdesk::form::{AvatarFile, Draft};
use contactdesk::logging;
use contactdesk::model::ContactId;
use contactdesk::mutation::{MutationCoordinator, Saved};
use contactdesk::preview::PreviewStore;
use contactdesk::remote::{HttpRemote, Remote};
use contactdesk::session::Notice;
use contactdesk::ui::app::DirectoryApp;
use contactdesk::ui::draw;
use contactdesk::Error;

#[derive(Parser, Debug)]
#[command(name = "contactdesk", about = "Browse and edit a remote contact directory")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the contact service, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of contacts
    List(ListArgs),
    /// Print a single contact
    Show(IdArgs),
    /// Create a contact
    Add(AddArgs),
    /// Change a contact
    Edit(EditArgs),
    /// Delete a contact
    Delete(DeleteArgs),
    /// Interactive session reading commands from stdin
    Browse,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, short, default_value = "")]
    query: String,

    /// 1-based page number
    #[arg(long, short, default_value_t = 1)]
    page: usize,

    /// Contacts per page
    #[arg(long, short)]
    size: Option<usize>,
}

#[derive(Args, Debug)]
struct IdArgs {
    id: String,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    /// Image file (JPG, PNG or WebP)
    #[arg(long, value_name = "PATH")]
    avatar: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, value_name = "PATH", conflicts_with = "remove_avatar")]
    avatar: Option<PathBuf>,
    /// Clear the stored avatar
    #[arg(long, default_value_t = false)]
    remove_avatar: bool,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    id: String,
    /// Skip the confirmation prompt
    #[arg(long, short, default_value_t = false)]
    yes: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    let page_size = match &cli.command {
        Command::List(args) => args.size,
        _ => None,
    };
    config.apply_overrides(cli.base_url.as_deref(), page_size)?;

    logging::init(config.log_level);
    config.report_warnings();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let local = LocalSet::new();
    let result = local.block_on(&runtime, run(cli.command, config));
    // A pending stdin read must not keep the process alive.
    runtime.shutdown_background();
    result
}

async fn run(command: Command, config: Config) -> Result<()> {
    let remote = HttpRemote::new(config.remote.base_url.clone(), config.remote.timeout)?;

    match command {
        Command::List(args) => handle_list(args, remote, &config).await,
        Command::Show(args) => handle_show(args, &remote).await,
        Command::Add(args) => handle_add(args, &remote, &config).await,
        Command::Edit(args) => handle_edit(args, &remote, &config).await,
        Command::Delete(args) => handle_delete(args, &remote, &config).await,
        Command::Browse => handle_browse(remote, &config).await,
    }
}

async fn handle_list(args: ListArgs, remote: HttpRemote, config: &Config) -> Result<()> {
    let mut app = DirectoryApp::new(remote, config);
    app.session_mut().start_at(&args.query, args.page);
    app.sync();
    app.settle().await;

    let session = app.session_mut();
    if let Some(Notice::Error(message)) = session.take_notice() {
        bail!(message);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    draw::draw_list(&mut out, session, &config.list.page_sizes)?;
    Ok(())
}

async fn handle_show(args: IdArgs, remote: &HttpRemote) -> Result<()> {
    let contact = remote
        .get_contact(&ContactId::new(args.id))
        .await
        .map_err(Error::from)?;
    let stdout = io::stdout();
    draw::draw_contact(&mut stdout.lock(), &contact)?;
    Ok(())
}

async fn handle_add(args: AddArgs, remote: &HttpRemote, config: &Config) -> Result<()> {
    let mut draft = Draft::new();
    draft.name = args.name;
    draft.email = args.email;
    draft.phone = args.phone;
    if let Some(path) = &args.avatar {
        attach(&mut draft, path, config)?;
    }

    let coordinator = MutationCoordinator::new(remote, &config.avatar);
    let saved = coordinator.submit(&mut draft).await.map_err(report)?;
    println!("{}", saved.notice());
    if let Saved::Created(Some(contact)) = &saved {
        println!("id: {}", contact.id);
    }
    Ok(())
}

async fn handle_edit(args: EditArgs, remote: &HttpRemote, config: &Config) -> Result<()> {
    let coordinator = MutationCoordinator::new(remote, &config.avatar);
    let mut draft = coordinator
        .load_draft(&ContactId::new(args.id))
        .await
        .map_err(report)?;

    if let Some(name) = args.name {
        draft.name = name;
    }
    if let Some(email) = args.email {
        draft.email = email;
    }
    if let Some(phone) = args.phone {
        draft.phone = phone;
    }
    if let Some(path) = &args.avatar {
        attach(&mut draft, path, config)?;
    } else if args.remove_avatar {
        draft.remove_avatar();
    }

    let saved = coordinator.submit(&mut draft).await.map_err(report)?;
    println!("{}", saved.notice());
    Ok(())
}

async fn handle_delete(args: DeleteArgs, remote: &HttpRemote, config: &Config) -> Result<()> {
    let id = ContactId::new(args.id);
    if !args.yes && !confirm(&format!("Delete contact {id}? This cannot be undone. [y/N] ")).await? {
        println!("Cancelled");
        return Ok(());
    }

    let coordinator = MutationCoordinator::new(remote, &config.avatar);
    coordinator.delete_by_id(&id).await?;
    println!("Contact deleted");
    Ok(())
}

async fn handle_browse(remote: HttpRemote, config: &Config) -> Result<()> {
    let mut app = DirectoryApp::new(remote, config);
    match PreviewStore::in_cache_dir() {
        Ok(store) => app = app.with_previews(store),
        Err(err) => tracing::warn!(error = %err, "avatar previews disabled"),
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Type to search, :h for commands, :q to quit")?;
    app.run(stdin, &mut out).await
}

fn attach(draft: &mut Draft, path: &Path, config: &Config) -> Result<()> {
    let file = AvatarFile::from_path(path)
        .with_context(|| format!("failed to read avatar {}", path.display()))?;
    draft.attach_avatar(file, &config.avatar).map_err(report)?;
    Ok(())
}

/// Print field errors one per line before failing.
fn report(err: Error) -> anyhow::Error {
    if let Error::Validation(errors) = &err {
        for (field, message) in errors.iter() {
            eprintln!("{field}: {message}");
        }
        return anyhow!("contact not saved");
    }
    anyhow!(err)
}

async fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
