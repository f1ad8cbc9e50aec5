//! `labeler label` — Interactive labeling session on stdin/stdout.

use labeler_config::AppConfig;
use labeler_engine::{Catalog, SessionController, browse_url};
use std::fmt::Write as _;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::runtime::Runtime;

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Login(String),
    Logout,
    Classify(String),
    /// 1-based index into the category list
    Pick(usize),
    Skip,
    History,
    Clear,
    Stats,
    Categories,
    Add(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word, rest) {
        ("login", id) if !id.is_empty() => Input::Login(id.to_string()),
        ("logout", "") => Input::Logout,
        ("c", category) if !category.is_empty() => Input::Classify(category.to_string()),
        ("add", category) if !category.is_empty() => Input::Add(category.to_string()),
        ("skip", "") => Input::Skip,
        ("history", "") => Input::History,
        ("clear", "") => Input::Clear,
        ("stats", "") => Input::Stats,
        ("categories", "") => Input::Categories,
        ("help" | "?", "") => Input::Help,
        ("quit" | "exit" | ":q", "") => Input::Quit,
        (number, "") if number.parse::<usize>().is_ok_and(|n| n > 0) => {
            Input::Pick(number.parse().unwrap_or_default())
        }
        _ => Input::Unknown(line.to_string()),
    }
}

const HELP: &str = "\
  login <id>      start a session
  logout          end the session
  c <category>    classify the current domain
  <number>        classify using a category from `categories`
  skip            show another domain without classifying
  history         your recent classifications
  clear           empty your recent history
  stats           your progress
  categories      list categories
  add <category>  register a new category
  quit            save and exit";

/// Apply one input to the session and return what to show the operator.
pub fn execute(session: &mut SessionController, input: Input) -> String {
    let mut out = String::new();
    match input {
        Input::Login(id) => match session.login(&id) {
            Ok(()) => {
                let _ = writeln!(out, "  ✅ Logged in as {id}");
                show_staged(session, &mut out);
            }
            Err(e) => {
                let _ = writeln!(out, "  [Error] {e}");
            }
        },
        Input::Logout => {
            session.logout();
            let _ = writeln!(out, "  👋 Logged out");
        }
        Input::Classify(category) => classify(session, &category, &mut out),
        Input::Pick(n) => match n.checked_sub(1).and_then(|i| session.categories().get(i)).cloned() {
            Some(category) => classify(session, &category, &mut out),
            None => {
                let _ = writeln!(out, "  [Error] No category #{n}, see `categories`");
            }
        },
        Input::Skip => match session.skip() {
            Ok(_) => show_staged(session, &mut out),
            Err(e) => {
                let _ = writeln!(out, "  [Error] {e}");
            }
        },
        Input::History => {
            let history = session.recent_history();
            if session.active_user().is_none() {
                let _ = writeln!(out, "  [Error] No active session");
            } else if history.is_empty() {
                let _ = writeln!(out, "  (no recent classifications)");
            } else {
                for event in history {
                    let _ = writeln!(
                        out,
                        "  {}  {} → {}",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        event.domain,
                        event.category
                    );
                }
            }
        }
        Input::Clear => match session.clear_history() {
            Ok(dropped) => {
                let _ = writeln!(out, "  🧹 Cleared {dropped} entries");
            }
            Err(e) => {
                let _ = writeln!(out, "  [Error] {e}");
            }
        },
        Input::Stats => match session.stats() {
            Some(stats) => {
                let _ = writeln!(out, "  Labeled:   {}", stats.total);
                let _ = writeln!(out, "  Remaining: {}", stats.remaining);
                let _ = writeln!(out, "  Queued:    {}", stats.queued);
            }
            None => {
                let _ = writeln!(out, "  [Error] No active session");
            }
        },
        Input::Categories => {
            for (i, name) in session.categories().iter().enumerate() {
                let _ = writeln!(out, "  {:>2}. {name}", i + 1);
            }
        }
        Input::Add(name) => match session.add_category(&name) {
            Ok(true) => {
                let _ = writeln!(out, "  ✅ Added category {}", name.trim());
            }
            Ok(false) => {
                let _ = writeln!(out, "  Category {} already exists", name.trim());
            }
            Err(e) => {
                let _ = writeln!(out, "  [Error] {e}");
            }
        },
        Input::Help => {
            let _ = writeln!(out, "{HELP}");
        }
        Input::Quit => {}
        Input::Unknown(line) => {
            let _ = writeln!(out, "  Unknown command: {line} (type `help`)");
        }
    }
    out
}

fn classify(session: &mut SessionController, category: &str, out: &mut String) {
    match session.classify(category) {
        Ok(result) => {
            let marker = if result.newly_labeled { "✅" } else { "🔁" };
            let _ = writeln!(
                out,
                "  {marker} {} → {}",
                result.event.domain, result.event.category
            );
            show_staged(session, out);
        }
        Err(e) => {
            let _ = writeln!(out, "  [Error] {e}");
        }
    }
}

fn show_staged(session: &SessionController, out: &mut String) {
    match session.staged() {
        Some(domain) => {
            let _ = writeln!(out, "\n  🌐 {domain}");
            let _ = writeln!(out, "     {}", browse_url(domain));
        }
        None => {
            let _ = writeln!(out, "\n  (the domain list is empty)");
        }
    }
}

pub async fn run(user: Option<String>, ephemeral: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let catalog = Catalog::load_or_empty(&config.catalog.source).await;
    let domain_count = catalog.len();
    let mut runtime = Runtime::open(&config, catalog, ephemeral).await?;

    println!();
    println!("  🏷️  Labeler — Interactive Session");
    println!();
    println!("  Domains:     {domain_count}");
    println!("  Persistence: {}", runtime.backend());
    println!("  Categories:  {}", runtime.session.categories().join(", "));
    println!();
    println!("  Type `help` for commands, `quit` to save and exit.");
    println!();

    if let Some(id) = user {
        print!("{}", execute(&mut runtime.session, Input::Login(id)));
    }

    print!("  > ");
    std::io::stdout().flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            print!("  > ");
            std::io::stdout().flush()?;
            continue;
        }

        let input = parse(&line);
        if input == Input::Quit {
            break;
        }
        print!("{}", execute(&mut runtime.session, input));

        print!("  > ");
        std::io::stdout().flush()?;
    }

    if runtime.session.active_user().is_some() {
        runtime.session.logout();
    }
    let stats = runtime.shutdown().await;
    if stats.failed > 0 {
        eprintln!("  ⚠️  {} saves failed, see the log", stats.failed);
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
