//! Line-oriented terminal chat client.
//!
//! Streams replies from the configured chat endpoint (normally the proxy's
//! `/api/chat`). Visible text goes to stdout, reasoning to stderr.

use std::io::Write;
use std::sync::Arc;

use m4rc1l::client::{abort_pair, ChatClient, ClientSettings, HttpChatTransport, TurnPhase};
use m4rc1l::config::{load_config_or_default, AppConfig};
use m4rc1l::error::ChatError;
use m4rc1l::observability::init_tracing;
use m4rc1l::render::render_message;
use m4rc1l::session::{Role, SessionStore, SharedStore, StoreMutation};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const PREVIEW_CHARS: usize = 32;

const HELP: &str = "\
commands:
  /new          start a new thread
  /threads      list threads
  /switch N     make thread N active
  /delete       delete the active thread
  /clear        delete every thread
  /show         re-print the active thread
  /think        toggle the thinking model
  /wiki         toggle factual grounding
  /model ID     pick an allowed model
  /stop         abort the reply in flight
  /quit         exit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Help,
    New,
    Threads,
    Switch(Option<usize>),
    Delete,
    Clear,
    Show,
    Think,
    Wiki,
    Model(&'a str),
    Stop,
    Quit,
    Unknown(&'a str),
    Send(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Command::Send(line);
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));
        match name {
            "help" => Command::Help,
            "new" => Command::New,
            "threads" => Command::Threads,
            "switch" => Command::Switch(arg.parse().ok()),
            "delete" => Command::Delete,
            "clear" => Command::Clear,
            "show" => Command::Show,
            "think" => Command::Think,
            "wiki" => Command::Wiki,
            "model" => Command::Model(arg),
            "stop" => Command::Stop,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other),
        }
    }
}

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = load_config_or_default(&path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    init_tracing(&config.features.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    if let Err(err) = runtime.block_on(run(config)) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct Session {
    client: ChatClient<HttpChatTransport>,
    model: String,
    think: bool,
    wiki: bool,
}

async fn run(config: AppConfig) -> Result<(), ChatError> {
    let transport =
        HttpChatTransport::new(config.client.endpoint.clone(), config.client.api_key.clone())?;
    let store = SharedStore::new(
        SessionStore::new(config.client.max_threads)
            .with_title_max_chars(config.client.title_max_chars),
    )
    .with_observer(Arc::new(print_mutation));
    let settings = ClientSettings::from_config(&config);
    let mut session = Session {
        model: settings.catalog.default_model().to_string(),
        client: ChatClient::new(transport, store, settings),
        think: false,
        wiki: false,
    };

    println!("m4rc1l chat on {} (/help for commands)", config.client.endpoint);
    print_model(&session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| ChatError::Internal(format!("Failed to read stdin: {err}")))?
    {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Send(text) => send(&session, &mut lines, text).await,
            command => handle_command(&mut session, command),
        }
    }
    Ok(())
}

fn handle_command(session: &mut Session, command: Command<'_>) {
    let store = session.client.store();
    match command {
        Command::Help => println!("{HELP}"),
        Command::New => {
            let id = store.update(SessionStore::new_thread);
            println!("started {id}");
        }
        Command::Threads => store.read(|store| {
            for (index, thread) in store.threads().iter().enumerate() {
                let marker = if index == store.active_index() { '*' } else { ' ' };
                println!(
                    "{marker} {}. {} ({})",
                    index + 1,
                    thread.title,
                    store.preview(thread.id, PREVIEW_CHARS)
                );
            }
        }),
        Command::Switch(Some(n)) if n > 0 => {
            if store.update(|store| store.select_index(n - 1)) {
                show_active(session);
            } else {
                println!("no thread {n}");
            }
        }
        Command::Switch(_) => println!("usage: /switch N"),
        Command::Delete => {
            let id = store.active_id();
            store.update(|store| store.delete_thread(id));
            println!("deleted {id}");
        }
        Command::Clear => {
            store.update(SessionStore::clear_all);
            println!("cleared all threads");
        }
        Command::Show => show_active(session),
        Command::Think => {
            session.think = !session.think;
            session.model = session
                .client
                .settings()
                .catalog
                .toggle_think(session.think, &session.model);
            print_model(session);
        }
        Command::Wiki => {
            session.wiki = !session.wiki;
            println!("wiki grounding {}", if session.wiki { "on" } else { "off" });
        }
        Command::Model(id) => {
            if session.client.settings().catalog.is_allowed(id) {
                session.model = id.to_string();
                print_model(session);
            } else {
                println!("model not allowed: {id}");
            }
        }
        Command::Stop => println!("nothing to stop"),
        Command::Unknown(name) => println!("unknown command /{name}"),
        Command::Empty | Command::Quit | Command::Send(_) => {}
    }
}

/// Run one turn. Lines typed meanwhile are read so `/stop` can abort it.
async fn send(session: &Session, lines: &mut Lines<BufReader<Stdin>>, text: &str) {
    let (handle, signal) = abort_pair();
    let turn = session
        .client
        .send(&session.model, text, session.wiki, signal);
    tokio::pin!(turn);

    let mut stdin_open = true;
    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if Command::parse(&line) == Command::Stop => handle.abort(),
                Ok(Some(_)) => eprintln!("\n(reply in progress, /stop to abort)"),
                Ok(None) | Err(_) => {
                    stdin_open = false;
                    handle.abort();
                }
            },
        }
    };
    println!();

    if outcome.aborted {
        println!("(stopped)");
    }
    if let Some(banner) = &outcome.banner {
        println!("!! {banner}");
    }
    if outcome.phase == TurnPhase::Error {
        tracing::debug!(thread = %outcome.thread, "turn ended with error");
    }
}

fn show_active(session: &Session) {
    let markers = &session.client.settings().markers;
    session.client.store().read(|store| {
        let thread = store.active_thread();
        println!("== {} ({})", thread.title, thread.id);
        for message in &thread.messages {
            let rendered = render_message(message, markers);
            match rendered.role {
                Role::User => println!("> {}", rendered.visible),
                Role::Assistant => {
                    if let Some(reasoning) = &rendered.reasoning {
                        eprintln!("[thinking] {reasoning}");
                    }
                    println!("{}", rendered.visible);
                    for image in &rendered.images {
                        println!("  [image] {image}");
                    }
                }
            }
        }
    });
}

fn print_model(session: &Session) {
    let catalog = &session.client.settings().catalog;
    let label = catalog.label(&session.model).unwrap_or(&session.model);
    println!("model: {label}");
}

fn print_mutation(mutation: &StoreMutation) {
    match mutation {
        StoreMutation::AppendContent { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        StoreMutation::AppendReasoning { text, .. } => {
            eprint!("{text}");
        }
        StoreMutation::PushAssistant { text, .. } => {
            println!("\n{text}");
        }
    }
}
