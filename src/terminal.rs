//! Line-oriented front end: plain text is sent to the active chat, lines
//! starting with `/` are commands.

use crate::commands::{chat, knowledge, settings};
use crate::dispatcher::{Rejection, SendOutcome};
use crate::state::AppState;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub const HELP: &str = "\
Commands:
  /new               start a new chat
  /list              list chats
  /select <n>        switch to chat number n
  /clear             remove all messages from the active chat
  /delete            delete the active chat
  /rename <title>    rename the active chat
  /lang <ru|kk|en>   set the answer language
  /theme <light|dark>
  /key <api key>     set the API key (/key alone clears it)
  /settings          show settings
  /files             list knowledge base files
  /search <query>    search knowledge base files
  /help              show this help
  /quit              exit
Anything else is sent as a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction {
    Send(String),
    New,
    List,
    Select(usize),
    Clear,
    Delete,
    Rename(String),
    Language(String),
    Theme(String),
    Key(Option<String>),
    Settings,
    Files,
    Search(String),
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ReplAction {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return ReplAction::Send(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let required = |action: fn(String) -> ReplAction| {
        if arg.is_empty() {
            ReplAction::Invalid(format!("/{} needs an argument", name))
        } else {
            action(arg.to_string())
        }
    };

    match name {
        "new" => ReplAction::New,
        "list" => ReplAction::List,
        "select" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ReplAction::Select(n),
            _ => ReplAction::Invalid("usage: /select <n>".into()),
        },
        "clear" => ReplAction::Clear,
        "delete" => ReplAction::Delete,
        "rename" => required(ReplAction::Rename),
        "lang" => required(ReplAction::Language),
        "theme" => required(ReplAction::Theme),
        "key" => ReplAction::Key(Some(arg.to_string()).filter(|k| !k.is_empty())),
        "settings" => ReplAction::Settings,
        "files" => ReplAction::Files,
        "search" => required(ReplAction::Search),
        "help" => ReplAction::Help,
        "quit" | "exit" => ReplAction::Quit,
        other => ReplAction::Invalid(format!("unknown command /{}, try /help", other)),
    }
}

/// Run one action and return the text to show. `None` means quit.
pub async fn execute(state: &AppState, action: ReplAction) -> Option<String> {
    let output = match action {
        ReplAction::Quit => return None,
        ReplAction::Send(text) => match chat::send_message(state, &text).await {
            Ok(outcome) => render_outcome(&outcome),
            Err(e) => e,
        },
        ReplAction::New => {
            chat::new_chat(state);
            "Started a new chat".into()
        }
        ReplAction::List => render_chats(state),
        ReplAction::Select(n) => {
            let chats = chat::list_chats(state);
            match n.checked_sub(1).and_then(|i| chats.get(i)) {
                Some(summary) => match chat::select_chat(state, &summary.id) {
                    Ok(()) => format!("Switched to \"{}\"", summary.title),
                    Err(e) => e,
                },
                None => format!("No chat number {}", n),
            }
        }
        ReplAction::Clear => with_active(state, |id| chat::clear_chat(state, id), "Chat cleared"),
        ReplAction::Delete => with_active(state, |id| chat::delete_chat(state, id), "Chat deleted"),
        ReplAction::Rename(title) => with_active(
            state,
            |id| chat::rename_chat(state, id, &title),
            "Chat renamed",
        ),
        ReplAction::Language(value) => match settings::set_language(state, &value) {
            Ok(language) => format!("Language set to {}", language),
            Err(e) => e,
        },
        ReplAction::Theme(value) => match settings::set_theme(state, &value) {
            Ok(theme) => format!("Theme set to {}", theme),
            Err(e) => e,
        },
        ReplAction::Key(Some(key)) => match settings::set_api_key(state, &key) {
            Ok(()) => "API key saved".into(),
            Err(e) => e,
        },
        ReplAction::Key(None) => {
            settings::clear_api_key(state);
            "API key cleared".into()
        }
        ReplAction::Settings => {
            let mut entries: Vec<_> = settings::get_settings(state).into_iter().collect();
            entries.sort();
            entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("\n")
        }
        ReplAction::Files => match knowledge::list_documents(state).await {
            Ok(files) if files.is_empty() => "No files".into(),
            Ok(files) => files
                .into_iter()
                .map(|f| f.name)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => e,
        },
        ReplAction::Search(query) => match knowledge::search_knowledge_base(state, &query).await {
            Ok(hits) if hits.is_empty() => "Nothing found".into(),
            Ok(hits) => hits
                .into_iter()
                .map(|h| format!("[{}]\n{}", h.file_name, h.excerpt))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => e,
        },
        ReplAction::Help => HELP.into(),
        ReplAction::Invalid(message) => message,
    };
    Some(output)
}

fn with_active(
    state: &AppState,
    op: impl FnOnce(&str) -> Result<(), String>,
    done: &str,
) -> String {
    let active = state.session.lock().active_id().map(str::to_string);
    let Some(id) = active else {
        return "No active chat, use /new".into();
    };
    match op(&id) {
        Ok(()) => done.to_string(),
        Err(e) => e,
    }
}

fn render_chats(state: &AppState) -> String {
    let chats = chat::list_chats(state);
    if chats.is_empty() {
        return "No chats, use /new".into();
    }
    chats
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if c.active { '*' } else { ' ' };
            format!("{} {}. {} ({})", marker, i + 1, c.title, c.message_count)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_outcome(outcome: &SendOutcome) -> String {
    match outcome {
        SendOutcome::Rejected(Rejection::Empty) => String::new(),
        SendOutcome::Rejected(Rejection::Busy) => "Still waiting for the previous answer".into(),
        SendOutcome::Rejected(Rejection::UnknownChat) => "No active chat, use /new".into(),
        SendOutcome::Answered(reply) => reply.content.clone(),
        SendOutcome::Failed { reply, .. } => format!("! {}", reply.content),
    }
}

/// Read lines until EOF or `/quit`.
pub async fn run_repl<R, W>(state: &AppState, input: R, mut output: W) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    output.write_all(b"TOU assistant. Type /help for commands.\n> ").await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match execute(state, parse_line(&line)).await {
            Some(text) => {
                if !text.is_empty() {
                    output.write_all(text.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
            }
            None => break,
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }
    output.flush().await
}
