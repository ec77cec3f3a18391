use std::borrow::Cow;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::*;
use rustyline::{
    Cmd, CompletionType, Config, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers,
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::HistoryHinter,
};
use rustyline_derive::{Helper, Hinter, Validator};
use spinners::{Spinner, Spinners};
use tracing::debug;

use crate::client::RelayClient;
use crate::commands::{COMMANDS, Command, Input, parse_input};
use crate::session::{Message, Role, Session};

#[derive(Helper, Hinter, Validator)]
struct TabchatHelper {
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    colored_prompt: String,
}

impl Completer for TabchatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        if !typed.starts_with('/') || typed.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let candidates = COMMANDS
            .iter()
            .map(|&(usage, description)| (usage.split(' ').next().unwrap_or(usage), description))
            .filter(|(name, _)| name.starts_with(typed))
            .map(|(name, description)| Pair {
                display: format!("{name}  {description}"),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for TabchatHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Cow::Borrowed(&self.colored_prompt)
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned("\x1b[1m".to_owned() + hint + "\x1b[m")
    }
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    Answered,
    Failed,
    Interrupted,
}

/// Runs one question through the relay and records both sides in `session`.
///
/// The turn moves from awaiting the answer to either an answer or a failure
/// message. Only an answer flagged `has_plot` triggers the single plot fetch,
/// and a failed fetch just leaves the answer without an image. Nothing is
/// retried.
pub async fn run_turn(client: &RelayClient, session: &mut Session, question: &str) -> TurnEnd {
    session.push_user(question);

    let (content, image, end) = match client.ask(question).await {
        Ok(resp) if resp.success => {
            let image = if resp.has_plot() {
                match client.plot().await {
                    Ok(image) => image,
                    Err(e) => {
                        debug!(error = %e, "plot fetch failed, keeping text answer");
                        None
                    }
                }
            } else {
                None
            };
            (resp.answer.unwrap_or_default(), image, TurnEnd::Answered)
        }
        Ok(resp) => {
            let error = resp.error.unwrap_or_else(|| "unknown error".to_string());
            (format!("Error: {error}"), None, TurnEnd::Failed)
        }
        Err(e) => (e.to_string(), None, TurnEnd::Failed),
    };

    session.push_assistant(content, image);
    end
}

pub fn print_separator() {
    println!("{}", "─".repeat(50).bright_black());
}

fn print_message(msg: &Message, saved: Option<&Path>) {
    match msg.role {
        Role::User => println!("{} {}", "> You:".bright_blue(), msg.content),
        Role::Assistant => {
            println!("{} {}", "> Assistant:".bright_green(), msg.content);
            if let Some(path) = saved {
                println!("{} {}", "  plot:".bright_cyan(), path.display());
            } else if msg.has_image() {
                println!("{}", "  (plot attached)".bright_cyan());
            }
        }
    }
}

/// Writes `bytes` to `dir/name`, creating `dir` if needed.
pub async fn save_image(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Prints the last assistant message, saving its plot as `turn-<turn>.png`
/// under `plot_dir`.
async fn render_reply(session: &Session, plot_dir: &Path, turn: usize) -> Option<PathBuf> {
    let msg = session.last()?;
    let mut saved = None;
    if let Some(image) = msg.image.as_deref().filter(|img| !img.is_empty()) {
        match save_image(plot_dir, &format!("turn-{turn}.png"), image).await {
            Ok(path) => saved = Some(path),
            Err(e) => eprintln!("{} could not save plot: {}", "Warning:".bright_yellow(), e),
        }
    }
    print_message(msg, saved.as_deref());
    saved
}

fn stop_spinner(sp: &mut Spinner) {
    sp.stop();
    print!("\r\x1B[K");
    io::stdout().flush().ok();
}

/// Runs a turn behind a spinner until it ends or `interrupt` fires.
///
/// An interrupted turn still gets an assistant entry so the history keeps
/// alternating. The request itself is abandoned, not cancelled server-side.
async fn interruptible_turn<I>(
    client: &RelayClient,
    session: &mut Session,
    question: &str,
    interrupt: I,
) -> TurnEnd
where
    I: Future,
{
    let mut sp = Spinner::new(Spinners::Dots12, "Thinking...".bright_magenta().to_string());
    tokio::select! {
        biased;
        end = run_turn(client, session, question) => {
            stop_spinner(&mut sp);
            end
        }
        _ = interrupt => {
            stop_spinner(&mut sp);
            println!();
            if session.last().is_some_and(|m| m.role == Role::User) {
                session.push_assistant("Interrupted.", None);
            }
            println!("{}", "Interrupted.".bright_yellow());
            TurnEnd::Interrupted
        }
    }
}

/// Single question from the command line.
pub async fn ask_once(client: &RelayClient, plot_dir: &Path, question: &str) -> TurnEnd {
    let mut session = Session::new();
    let end = interruptible_turn(client, &mut session, question, tokio::signal::ctrl_c()).await;
    if end != TurnEnd::Interrupted {
        render_reply(&session, plot_dir, 1).await;
    }
    end
}

fn print_help() {
    println!("{}", "Commands:".bright_blue());
    for (usage, description) in COMMANDS {
        println!("  {:<14} {}", usage.bright_green(), description);
    }
}

fn print_plots(session: &Session) {
    let plots = session.plots();
    if plots.is_empty() {
        println!("{}", "No plots in this session yet.".bright_black());
        return;
    }
    for (n, entry) in plots.iter().enumerate() {
        println!(
            "{} {} ({} bytes)",
            format!("[{}]", n + 1).bright_cyan(),
            entry.question.unwrap_or("(no question)"),
            entry.image.len()
        );
        println!("    {}", entry.answer.bright_black());
    }
}

async fn save_plots(session: &Session, dir: &Path) {
    let plots = session.plots();
    if plots.is_empty() {
        println!("{}", "No plots to save.".bright_black());
        return;
    }
    for (n, entry) in plots.iter().enumerate() {
        match save_image(dir, &format!("plot-{}.png", n + 1), entry.image).await {
            Ok(path) => println!("{} {}", "saved".bright_green(), path.display()),
            Err(e) => eprintln!("{} {}", "Error:".bright_red(), e),
        }
    }
}

/// Runs a slash command. Returns `false` when the loop should end.
async fn handle_command(command: Command, session: &mut Session, client: &RelayClient) -> bool {
    match command {
        Command::Help => print_help(),
        Command::History => {
            if session.is_empty() {
                println!("{}", "Nothing said yet.".bright_black());
            }
            for msg in session.messages() {
                print_message(msg, None);
            }
        }
        Command::Plots => print_plots(session),
        Command::Save(dir) => save_plots(session, &dir).await,
        Command::Clear => {
            session.clear();
            println!("{}", "Conversation cleared.".bright_yellow());
        }
        Command::Health => match client.health().await {
            Ok(()) => println!("{} {}", "Relay is up at".bright_green(), client.base_url()),
            Err(e) => eprintln!("{} {}", "Error:".bright_red(), e),
        },
        Command::Exit => return false,
    }
    true
}

/// Interactive REPL loop
pub async fn interactive_loop(client: &RelayClient, plot_dir: &Path) -> anyhow::Result<()> {
    println!("{}", "tabchat - ask questions about your dataset".bright_blue());
    println!("Relay: {}", client.base_url().bright_green());
    println!("{}", "Type /help for commands, 'exit' to quit".bright_black());
    print_separator();

    let prompt_prefix = ":: ".bold().red().to_string();
    let helper = TabchatHelper {
        hinter: HistoryHinter::new(),
        colored_prompt: prompt_prefix.clone(),
    };
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Enter, Modifiers::ALT),
        EventHandler::Simple(Cmd::Newline),
    );

    let mut session = Session::new();
    // Keeps counting across /clear so saved plots are never overwritten.
    let mut turns = 0usize;
    loop {
        io::stdout().flush()?;
        let line = match rl.readline(&prompt_prefix) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".bright_red(), err);
                break;
            }
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Invalid(msg) => eprintln!("{} {}", "Error:".bright_red(), msg),
            Input::Command(command) => {
                let _ = rl.add_history_entry(line.trim());
                if !handle_command(command, &mut session, client).await {
                    break;
                }
            }
            Input::Question(question) => {
                let _ = rl.add_history_entry(question.as_str());
                turns += 1;
                let end =
                    interruptible_turn(client, &mut session, &question, tokio::signal::ctrl_c())
                        .await;
                if end != TurnEnd::Interrupted {
                    render_reply(&session, plot_dir, turns).await;
                }
            }
        }
        print_separator();
    }

    println!("{}", "Goodbye!".bright_blue());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client, refused_url, serve};
    use axum::{
        Json, Router,
        http::{StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Relay stub: questions containing "plot" report a fresh plot.
    fn relay_stub(plot: Router) -> Router {
        Router::new()
            .route(
                "/ask",
                post(|Json(body): Json<Value>| async move {
                    let q = body["question"].as_str().unwrap_or_default().to_string();
                    Json(json!({
                        "success": true,
                        "answer": format!("answer to {q}"),
                        "has_plot": q.contains("plot"),
                    }))
                }),
            )
            .merge(plot)
    }

    fn image_plot() -> Router {
        Router::new().route(
            "/plot",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], b"\x89PNG".to_vec()).into_response() }),
        )
    }

    #[tokio::test]
    async fn fresh_plot_is_attached() {
        let base = serve(relay_stub(image_plot())).await;
        let mut session = Session::new();

        let end = run_turn(&client(&base), &mut session, "plot ages").await;
        assert_eq!(end, TurnEnd::Answered);
        let reply = session.last().unwrap();
        assert_eq!(reply.content, "answer to plot ages");
        assert_eq!(reply.image.as_deref(), Some(&b"\x89PNG"[..]));
    }

    #[tokio::test]
    async fn plot_is_fetched_only_when_flagged() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let plot = Router::new().route(
            "/plot",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "image/png")], b"stale".to_vec()).into_response()
                }
            }),
        );
        let base = serve(relay_stub(plot)).await;
        let mut session = Session::new();

        run_turn(&client(&base), &mut session, "mean age?").await;
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(session.last().unwrap().image, None);

        run_turn(&client(&base), &mut session, "plot fares").await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_plot_fetch_keeps_text_answer() {
        let plot = Router::new().route(
            "/plot",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "disk on fire") }),
        );
        let base = serve(relay_stub(plot)).await;
        let mut session = Session::new();

        let end = run_turn(&client(&base), &mut session, "plot survival").await;
        assert_eq!(end, TurnEnd::Answered);
        let reply = session.last().unwrap();
        assert_eq!(reply.content, "answer to plot survival");
        assert_eq!(reply.image, None);
    }

    #[tokio::test]
    async fn server_reported_error_becomes_reply() {
        let app = Router::new().route(
            "/ask",
            post(|| async { Json(json!({ "success": false, "error": "no such column" })) }),
        );
        let base = serve(app).await;
        let mut session = Session::new();

        let end = run_turn(&client(&base), &mut session, "cabin?").await;
        assert_eq!(end, TurnEnd::Failed);
        assert_eq!(session.last().unwrap().content, "Error: no such column");
    }

    #[tokio::test]
    async fn transport_failures_have_distinct_replies() {
        let refused = refused_url().await;
        let slow = serve(Router::new().route(
            "/ask",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({ "success": true, "answer": "late" }))
            }),
        ))
        .await;
        let broken = serve(Router::new().route(
            "/ask",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Traceback (most recent call last)") }),
        ))
        .await;

        let mut replies = Vec::new();
        for (base, timeout) in [
            (&refused, Duration::from_secs(5)),
            (&slow, Duration::from_millis(200)),
            (&broken, Duration::from_secs(5)),
        ] {
            let client = RelayClient::new(base, timeout, None).unwrap();
            let mut session = Session::new();
            assert_eq!(run_turn(&client, &mut session, "q").await, TurnEnd::Failed);
            replies.push(session.last().unwrap().content.clone());
        }

        assert!(replies[0].starts_with("Could not connect"));
        assert!(replies[1].starts_with("The backend did not respond"));
        assert_eq!(replies[2], "Backend returned HTTP 500.");
        assert!(replies.iter().all(|r| !r.contains("Traceback")));
    }

    #[tokio::test]
    async fn history_alternates_and_plots_pair_with_questions() {
        let base = serve(relay_stub(image_plot())).await;
        let client = client(&base);
        let mut session = Session::new();
        let questions = ["mean age?", "plot ages", "median fare?", "plot fares"];

        for q in questions {
            run_turn(&client, &mut session, q).await;
        }

        assert_eq!(session.len(), 2 * questions.len());
        for (i, msg) in session.messages().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(msg.role, expected);
        }
        let plots: Vec<_> = session.plots().iter().map(|p| p.question).collect();
        assert_eq!(plots, [Some("plot ages"), Some("plot fares")]);
    }

    #[tokio::test]
    async fn interrupt_ends_turn_and_keeps_history_alternating() {
        let slow = serve(Router::new().route(
            "/ask",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({ "success": true, "answer": "late" }))
            }),
        ))
        .await;
        let mut session = Session::new();

        let end = interruptible_turn(&client(&slow), &mut session, "q", std::future::ready(())).await;
        assert_eq!(end, TurnEnd::Interrupted);
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().role, Role::Assistant);
        assert_eq!(session.last().unwrap().content, "Interrupted.");
    }

    #[tokio::test]
    async fn plot_names_survive_clear() {
        let base = serve(relay_stub(image_plot())).await;
        let client = client(&base);
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new();

        run_turn(&client, &mut session, "plot ages").await;
        let first = render_reply(&session, dir.path(), 1).await.unwrap();
        std::fs::write(&first, b"first").unwrap();

        session.clear();
        run_turn(&client, &mut session, "plot fares").await;
        let second = render_reply(&session, dir.path(), 2).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn save_image_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/plots");

        let path = save_image(&target, "turn-1.png", b"png").await.unwrap();
        assert_eq!(path, target.join("turn-1.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"png");
    }
}
