use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiAction};
use palaver::auth::{token_store, AuthError, FileTokenStore};
use palaver::chat::{ChatEvent, ChatSession, MessageDispatcher};
use palaver::config::{Config, ReplyMode, DEFAULT_API_URL};
use palaver::{AuthGateway, User};

/// Command line arguments for palaver
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "palaver: a terminal chat client with simulated delivery and assistant replies.",
    long_about = "palaver is a terminal chat client. Messages go through a simulated \
    send/deliver cycle and are answered by canned replies or by a chat backend.\n\n\
    Credentials are read from PALAVER_EMAIL, PALAVER_PASSWORD and PALAVER_NAME when set, \
    otherwise they are prompted for."
)]
struct Args {
    /// Base URL of the backend
    #[arg(long, env = "PALAVER_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Chat endpoint, defaults to <api-url>/api/chat
    #[arg(long, env = "PALAVER_CHAT_URL")]
    chat_url: Option<String>,

    /// Ask the chat endpoint for replies instead of using canned ones
    #[arg(long)]
    remote_replies: bool,

    /// Directory for the session token and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Create an account instead of logging in
    #[arg(long)]
    register: bool,

    /// Forget the stored session and exit
    #[arg(long)]
    logout: bool,

    /// Skip authentication and chat with canned replies only
    #[arg(long)]
    offline: bool,

    /// Log file path, defaults to palaver.log in the data directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// Prompts for credentials unless they are set in the environment
fn prompt_credentials(register: bool) -> (Option<String>, String, String) {
    let name = if register {
        Some(std::env::var("PALAVER_NAME").unwrap_or_else(|_| {
            eprintln!("Enter your name:");
            utils::read_line().unwrap_or_default()
        }))
    } else {
        None
    };

    let email = std::env::var("PALAVER_EMAIL").unwrap_or_else(|_| {
        eprintln!("Enter email:");
        utils::read_line().unwrap_or_default()
    });

    let password = std::env::var("PALAVER_PASSWORD").unwrap_or_else(|_| {
        eprintln!("Enter password:");
        utils::read_line().unwrap_or_default()
    });

    (name, email, password)
}

fn log_file_path(args: &Args) -> PathBuf {
    if let Some(path) = &args.log_file {
        return path.clone();
    }
    match &args.data_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: Failed to create data directory {}: {}", dir.display(), e);
                PathBuf::from("palaver.log")
            } else {
                dir.join("palaver.log")
            }
        }
        None => token_store::get_data_dir()
            .map(|dir| dir.join("palaver.log"))
            .unwrap_or_else(|_| PathBuf::from("palaver.log")),
    }
}

/// Restore a stored session or log in. `None` means the user continues offline.
async fn authenticate(gateway: &mut AuthGateway, args: &Args) -> Result<Option<User>> {
    match gateway.restore().await {
        Ok(Some(user)) => return Ok(Some(user)),
        Ok(None) => {}
        Err(e) => warn!("Could not restore session: {}", e),
    }

    println!("Connecting to {}...", args.api_url);
    let (name, email, password) = prompt_credentials(args.register);
    let result = match name {
        Some(name) => gateway.register(&name, &email, &password).await,
        None => gateway.login(&email, &password).await,
    };

    match result {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            error!("Authentication failed: {}", e);
            let hint = match &e {
                AuthError::Connection(_) => {
                    "Check that the backend is running, or start with --offline."
                }
                AuthError::Rejected(_) => "Check your email and password.",
                AuthError::Storage(_) => "Check that the data directory is writable.",
            };
            eprintln!("Authentication failed: {}\n{}", e, hint);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Must happen before anything asks for the data directory
    if let Some(dir) = &args.data_dir {
        token_store::set_data_dir_override(dir.clone());
    }

    let log_path = log_file_path(&args);
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    utils::setup_logging(Some(log_path.as_path()), level)?;
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_path.display());

    let config = Config {
        api_url: args.api_url.clone(),
        chat_url: args.chat_url.clone(),
        reply_mode: if args.remote_replies && !args.offline {
            ReplyMode::Remote
        } else {
            ReplyMode::Canned
        },
        offline: args.offline,
        ..Config::default()
    };
    debug!("Using configuration: {:?}", config);

    let store = FileTokenStore::new_default()?;
    let mut gateway = AuthGateway::new(config.api_client()?, Box::new(store));

    if args.logout {
        gateway.logout()?;
        println!("Logged out.");
        return Ok(());
    }

    let user = if config.offline {
        info!("Starting offline, skipping authentication");
        None
    } else {
        authenticate(&mut gateway, &args).await?
    };

    let mut session = ChatSession::with_fixtures();
    session.set_user_id(user.as_ref().map(|u| u.id.clone()));
    if let Some(first) = session.contacts().all().first().map(|c| c.id) {
        // Fixture ids are known to exist
        let _ = session.select_contact(first);
    }

    let (dispatcher, mut event_rx) = MessageDispatcher::new(
        config.reply_source(gateway.api().clone()),
        config.timing.clone(),
        session.ids(),
    );

    let user_label = match &user {
        Some(user) if !user.name.is_empty() => user.name.clone(),
        Some(user) => user.email.clone(),
        None => "offline".to_string(),
    };

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new(&user_label);
    chat_ui.sync_contact_index(&session);

    let result = run_main_loop(
        &mut chat_ui,
        &mut terminal,
        &mut session,
        &dispatcher,
        &mut event_rx,
    )
    .await;

    ui::restore_terminal(terminal)?;
    if let Err(e) = &result {
        error!("Main loop failed: {}", e);
    }

    println!("Chat session ended.");
    result
}

async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    session: &mut ChatSession,
    dispatcher: &MessageDispatcher,
    event_rx: &mut mpsc::Receiver<ChatEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| chat_ui.draw(f, session))?;
        chat_ui.clean_notice(5);

        match chat_ui.handle_input(session)? {
            Some(UiAction::Quit) => break,
            Some(UiAction::Send(text)) => match session.send_message(&text) {
                Ok(outgoing) => {
                    dispatcher.dispatch(outgoing);
                }
                Err(e) => {
                    warn!("Message not sent: {}", e);
                    chat_ui.set_notice(&format!("Message not sent: {}", e));
                }
            },
            Some(UiAction::Select(contact_id)) => {
                if let Err(e) = session.select_contact(contact_id) {
                    error!("Failed to select contact: {}", e);
                }
            }
            Some(UiAction::Search(term)) => {
                session.set_search_term(&term);
            }
            Some(UiAction::AddContact { name, phone }) => match session.add_contact(&name, &phone) {
                Ok(id) => {
                    info!("Added contact {} ({})", name, id);
                    chat_ui.set_notice(&format!("Contact {} added", name));
                    if session.select_contact(id).is_ok() {
                        chat_ui.sync_contact_index(session);
                    }
                }
                Err(e) => chat_ui.set_notice(&format!("Failed to add contact: {}", e)),
            },
            None => {}
        }

        // Apply everything the dispatcher reported since the last frame
        while let Ok(event) = event_rx.try_recv() {
            debug!("Applying chat event: {:?}", event);
            session.apply(event);
        }
    }

    Ok(())
}
