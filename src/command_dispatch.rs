//! Purpose: Hold top-level CLI command dispatch for `localpost`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Commands that need state open exactly one session.
//! Invariants: `reset` and `fetch` never read stored state, so corrupt files cannot block them.
//! Invariants: Output envelopes are single JSON objects on stdout.

use clap::CommandFactory;

use super::*;
use localpost::api::{BoxedSession, Outcome};

pub(super) fn dispatch_command(
    command: Command,
    config: SessionConfig,
    render: bool,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "localpost", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Create { title, body } => {
            let mut session = open_session(&config, render)?;
            let outcome = session.create(&title, &body)?;
            emit_json(outcome_json("created", &outcome));
            Ok(RunOutcome::ok())
        }
        Command::Update { id, title, body } => {
            let mut session = open_session(&config, render)?;
            let outcome = session.update(id, &title, &body)?;
            emit_json(outcome_json("updated", &outcome));
            Ok(RunOutcome::ok())
        }
        Command::Delete { id } => {
            let mut session = open_session(&config, render)?;
            let outcome = session.delete(id)?;
            emit_json(json!({
                "deleted": id,
                "route": outcome.route.as_str(),
                "was_cached": outcome.post.is_some(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Fetch { id } => {
            let session = with_render(config.open_unrestored()?, render);
            let post = session.fetch(id)?;
            emit_json(json!({ "post": post_json(&post) }));
            Ok(RunOutcome::ok())
        }
        Command::Lookup { id } => {
            let session = open_session(&config, render)?;
            let post = session.lookup(id).ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("no cached post with id {id}"))
                    .with_hint("Only posts created or updated through this client are cached.")
                    .with_id(id)
            })?;
            emit_json(json!({ "post": post_json(post) }));
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let session = open_session(&config, render)?;
            let posts = session.posts().iter().map(post_json).collect::<Vec<_>>();
            emit_json(json!({ "posts": posts }));
            Ok(RunOutcome::ok())
        }
        Command::Limits => {
            let session = open_session(&config, render)?;
            let limits = session.limits();
            let (low, high) = limits.valid_range();
            emit_json(json!({
                "boundary": limits.boundary,
                "next": limits.next,
                "valid_range": [low, high],
            }));
            Ok(RunOutcome::ok())
        }
        Command::Reset => {
            let mut session = with_render(config.open_unrestored()?, render);
            session.reset();
            emit_json(json!({
                "reset": true,
                "next": session.limits().next,
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn open_session(config: &SessionConfig, render: bool) -> Result<BoxedSession, Error> {
    Ok(with_render(config.open()?, render))
}

fn with_render(session: BoxedSession, render: bool) -> BoxedSession {
    if render {
        return session.with_renderer(TerminalRenderer);
    }
    session
}

fn outcome_json(label: &str, outcome: &Outcome) -> Value {
    let mut map = Map::new();
    if let Some(post) = &outcome.post {
        map.insert(label.to_string(), post_json(post));
    }
    map.insert("route".to_string(), json!(outcome.route.as_str()));
    Value::Object(map)
}
