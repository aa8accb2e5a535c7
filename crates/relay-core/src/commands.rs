//! Private-message commands.
//!
//! One static, ordered table drives both dispatch and the help listing.

use tracing::{debug, info};

use crate::{
    domain::UserId,
    engine::RelayEngine,
    errors::Error,
    messaging::types::BroadcastColor,
    relay::BroadcastOutcome,
    session::SessionState,
    tokenizer::tokenize,
    Result,
};

/// Longest bot name `makebot` accepts, in characters.
pub const MAX_BOT_NAME_CHARS: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Say,
    Broadcast,
    BotCode,
    EditBot,
    MakeBot,
    KillBot,
    ListBots,
    Man,
}

#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub detail: &'static str,
    pub kind: CommandKind,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        usage: "[command]",
        summary: "show help. if command is specified, show detailed help",
        detail: "",
        kind: CommandKind::Help,
    },
    CommandSpec {
        name: "say",
        usage: "message",
        summary: "say something in the chat",
        detail: "",
        kind: CommandKind::Say,
    },
    CommandSpec {
        name: "broadcast",
        usage: "from message [color]",
        summary: "broadcast a message to the chat",
        detail: "from:    name from which the broadcast will be sent\n\
                 message: the message to broadcast\n\
                 color:   can be yellow (default), red, green, purple, or random",
        kind: CommandKind::Broadcast,
    },
    CommandSpec {
        name: "botcode",
        usage: "name",
        summary: "view the code for the bot with the given name",
        detail: "to view documentation on the language, type man",
        kind: CommandKind::BotCode,
    },
    CommandSpec {
        name: "editbot",
        usage: "name",
        summary: "edit the bot with the given name",
        detail: "to view documentation on the language, type man",
        kind: CommandKind::EditBot,
    },
    CommandSpec {
        name: "makebot",
        usage: "name",
        summary: "create a bot with the given name",
        detail: "to view documentation on the language, type man",
        kind: CommandKind::MakeBot,
    },
    CommandSpec {
        name: "killbot",
        usage: "name",
        summary: "delete the bot and all its data",
        detail: "",
        kind: CommandKind::KillBot,
    },
    CommandSpec {
        name: "listbots",
        usage: "",
        summary: "list all the bots",
        detail: "",
        kind: CommandKind::ListBots,
    },
    CommandSpec {
        name: "man",
        usage: "[function_name]",
        summary: "show documentation about the language and environment",
        detail: "To view detailed documentation for a function, type `man function_name`",
        kind: CommandKind::Man,
    },
];

pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Full command listing, usage column padded so summaries line up.
pub fn help_listing() -> String {
    let width = |c: &CommandSpec| c.name.chars().count() + c.usage.chars().count() + 1;
    let longest = COMMANDS.iter().map(width).max().unwrap_or(0);

    let mut out = String::from("Available Commands:\n");
    for c in COMMANDS {
        let pad = longest - width(c) + 4;
        out.push_str(&format!(
            "{} {}{}{}\n",
            c.name,
            c.usage,
            " ".repeat(pad),
            c.summary
        ));
    }
    out
}

/// Detailed help for one command.
pub fn command_help(spec: &CommandSpec) -> String {
    format!(
        "{} {}\n{}\n\n{}",
        spec.name, spec.usage, spec.summary, spec.detail
    )
}

/// Tokenize a private message and run the command it names.
///
/// Command failures are answered to the user here; only the caller's own
/// plumbing errors are returned.
pub async fn dispatch(engine: &RelayEngine, user: &UserId, text: &str) -> Result<()> {
    let args = tokenize(text);
    let name = args.first().map(String::as_str).unwrap_or_default();

    let Some(spec) = find(name) else {
        debug!(user = %user, command = name, "unknown command");
        engine
            .reply(
                user,
                &format!("ERROR: invalid command `{name}`\n{}", help_listing()),
            )
            .await;
        return Ok(());
    };

    let rest = args.get(1..).unwrap_or_default();
    debug!(user = %user, command = spec.name, args = rest.len(), "dispatching command");
    if let Err(e) = run(engine, user, spec.kind, rest).await {
        engine.reply_error(user, &e).await;
    }
    Ok(())
}

async fn run(
    engine: &RelayEngine,
    user: &UserId,
    kind: CommandKind,
    args: &[String],
) -> Result<()> {
    match kind {
        CommandKind::Help => help(engine, user, args).await,
        CommandKind::Say => say(engine, args).await,
        CommandKind::Broadcast => broadcast(engine, user, args).await,
        CommandKind::BotCode => bot_code(engine, user, args).await,
        CommandKind::EditBot => edit_bot(engine, user, args).await,
        CommandKind::MakeBot => make_bot(engine, user, args).await,
        CommandKind::KillBot => kill_bot(engine, user, args).await,
        CommandKind::ListBots => {
            let listing = engine.backend.list_bots().await?;
            engine.reply(user, &listing).await;
            Ok(())
        }
        CommandKind::Man => {
            let doc = engine.backend.man(arg(args, 0)).await?;
            engine.reply(user, &doc).await;
            Ok(())
        }
    }
}

fn arg(args: &[String], idx: usize) -> Option<&str> {
    args.get(idx).map(String::as_str).filter(|s| !s.is_empty())
}

fn bot_name<'a>(args: &'a [String], verb: &str) -> Result<&'a str> {
    arg(args, 0).ok_or_else(|| {
        Error::Validation(format!(
            "please supply a name for the bot you want to {verb}"
        ))
    })
}

async fn help(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let text = match arg(args, 0) {
        None => help_listing(),
        Some(name) => match find(name) {
            Some(spec) => command_help(spec),
            None => format!("ERROR: unknown command `{name}`\n{}", help_listing()),
        },
    };
    engine.reply(user, &text).await;
    Ok(())
}

async fn say(engine: &RelayEngine, args: &[String]) -> Result<()> {
    let text = args.join(" ");
    if text.is_empty() {
        return Err(Error::Validation("`say` requires a message".to_string()));
    }
    engine.say(&text).await;
    Ok(())
}

async fn broadcast(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let (Some(from), Some(message)) = (arg(args, 0), arg(args, 1)) else {
        return Err(Error::Validation(
            "`broadcast` requires a `from` and a `message` argument".to_string(),
        ));
    };
    let color = match arg(args, 2) {
        Some(raw) => raw.parse::<BroadcastColor>()?,
        None => BroadcastColor::default(),
    };

    match engine.send_broadcast(user, from, message, color).await {
        BroadcastOutcome::Sent | BroadcastOutcome::Dropped => Ok(()),
        BroadcastOutcome::Rejected(reason) => {
            engine.reply(user, &format!("ERROR: {reason}")).await;
            Ok(())
        }
        BroadcastOutcome::Failed => {
            engine
                .reply(user, "ERROR: the broadcast could not be delivered")
                .await;
            Ok(())
        }
    }
}

async fn bot_code(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let name = bot_name(args, "view")?;
    let data = engine.backend.bot_data(name).await?;
    engine.reply(user, &data.code).await;
    Ok(())
}

async fn edit_bot(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let name = bot_name(args, "edit")?;
    let data = engine.backend.bot_data(name).await?;

    // The session only starts once the user has actually seen the prompt.
    engine
        .chat
        .send_private(
            user,
            &format!(
                "Here is the current script:\n{}\n-------------------------\n\
                 To abort, type `abort` below:\n\
                 To edit, send the new script (as a single message) below:",
                data.code
            ),
        )
        .await?;
    engine
        .sessions
        .begin(user, SessionState::AwaitingEditedScript, name)
        .await;
    info!(user = %user, bot = name, "editing bot");
    Ok(())
}

async fn make_bot(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let name = bot_name(args, "make")?;
    let len = name.chars().count();
    if len > MAX_BOT_NAME_CHARS {
        return Err(Error::Validation(format!(
            "bot name must be <= {MAX_BOT_NAME_CHARS} characters in length (yours was {len})"
        )));
    }

    if engine.backend.bot_exists(name).await? {
        engine
            .reply(user, &format!("A bot named {name} already exists!"))
            .await;
        return Ok(());
    }

    engine
        .chat
        .send_private(user, "Send your script (as a single message) below:")
        .await?;
    engine
        .sessions
        .begin(user, SessionState::AwaitingNewScript, name)
        .await;
    info!(user = %user, bot = name, "making bot");
    Ok(())
}

async fn kill_bot(engine: &RelayEngine, user: &UserId, args: &[String]) -> Result<()> {
    let name = bot_name(args, "kill")?;
    let reply = engine.backend.kill_bot(name).await?;
    info!(user = %user, bot = name, "killed bot");
    engine.reply(user, &reply).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::BackendRequest;
    use crate::messaging::types::{BroadcastReceipt, BroadcastRequest};
    use crate::testing::{private, Harness};
    use serde_json::json;

    #[test]
    fn table_order_and_lookup() {
        let names: Vec<_> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "help",
                "say",
                "broadcast",
                "botcode",
                "editbot",
                "makebot",
                "killbot",
                "listbots",
                "man"
            ]
        );
        assert_eq!(find("man").unwrap().kind, CommandKind::Man);
        assert!(find("HELP").is_none());
    }

    #[test]
    fn listing_aligns_summaries() {
        let listing = help_listing();
        let mut lines = listing.lines();
        assert_eq!(lines.next(), Some("Available Commands:"));

        // Longest entry is `broadcast from message [color]` (30 chars).
        let first = format!(
            "help [command]{}show help. if command is specified, show detailed help",
            " ".repeat(20)
        );
        assert_eq!(lines.next(), Some(first.as_str()));
        let columns: Vec<_> = listing
            .lines()
            .skip(1)
            .map(|l| {
                let spec = COMMANDS.iter().find(|c| l.starts_with(c.name)).unwrap();
                l.find(spec.summary).unwrap()
            })
            .collect();
        assert!(columns.iter().all(|&c| c == 34), "{columns:?}");
        assert!(listing.contains("listbots     "));
    }

    #[test]
    fn detailed_help_format() {
        assert_eq!(
            command_help(find("say").unwrap()),
            "say message\nsay something in the chat\n\n"
        );
        assert_eq!(
            command_help(find("editbot").unwrap()),
            "editbot name\nedit the bot with the given name\n\nto view documentation on the language, type man"
        );
        assert_eq!(
            command_help(find("makebot").unwrap()),
            "makebot name\ncreate a bot with the given name\n\nto view documentation on the language, type man"
        );
        assert!(command_help(find("broadcast").unwrap())
            .starts_with("broadcast from message [color]\nbroadcast a message to the chat\n\nfrom:"));
    }

    #[tokio::test]
    async fn help_with_and_without_topic() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));

        h.engine
            .handle_private_message(private("u1", "help"))
            .await
            .unwrap();
        h.engine
            .handle_private_message(private("u1", "help say"))
            .await
            .unwrap();
        h.engine
            .handle_private_message(private("u1", "help nope"))
            .await
            .unwrap();

        let replies = h.chat.private_to("u1");
        assert_eq!(replies[0], help_listing());
        assert_eq!(replies[1], "say message\nsay something in the chat\n\n");
        assert!(replies[2].starts_with("ERROR: unknown command `nope`\nAvailable Commands:"));
    }

    #[tokio::test]
    async fn unknown_command_replies_with_listing() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.engine
            .handle_private_message(private("u1", "frobnicate now"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec![format!(
                "ERROR: invalid command `frobnicate`\n{}",
                help_listing()
            )]
        );
    }

    #[tokio::test]
    async fn say_posts_to_room() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.engine
            .handle_private_message(private("u1", "say \"hello room\""))
            .await
            .unwrap();
        h.engine
            .handle_private_message(private("u1", "say"))
            .await
            .unwrap();
        assert_eq!(h.chat.room(), vec!["hello room"]);
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["ERROR: `say` requires a message"]
        );
    }

    #[tokio::test]
    async fn broadcast_requires_from_and_message() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.engine
            .handle_private_message(private("u1", "broadcast Bob"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["ERROR: `broadcast` requires a `from` and a `message` argument"]
        );
        assert!(h.broadcaster.requests().is_empty());
    }

    #[tokio::test]
    async fn broadcast_sends_and_suppresses_its_echo() {
        let h = Harness::new(|req| match req {
            BackendRequest::Message { .. } => Ok(json!({"messages": ["reacted"]})),
            other => panic!("unexpected request {other:?}"),
        });

        h.engine
            .handle_private_message(private("u1", "broadcast Bob \"hi all\" red"))
            .await
            .unwrap();
        assert_eq!(
            h.broadcaster.requests(),
            vec![BroadcastRequest {
                from: "Bob".to_string(),
                message: "hi all".to_string(),
                color: BroadcastColor::Red,
            }]
        );

        h.engine
            .handle_room_message(crate::domain::RoomMessage {
                sender_name: "Bob".to_string(),
                text: "hi all".to_string(),
            })
            .await
            .unwrap();
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn broadcast_rejects_unknown_color() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.engine
            .handle_private_message(private("u1", "broadcast Bob hi blue"))
            .await
            .unwrap();
        assert!(h.broadcaster.requests().is_empty());
        assert!(h.chat.private_to("u1")[0].starts_with("ERROR: unknown color `blue`"));
    }

    #[tokio::test]
    async fn broadcast_api_rejection_is_reported() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.broadcaster
            .set_receipt(BroadcastReceipt::Rejected("From name may not exceed 15 characters".into()));
        h.engine
            .handle_private_message(private("u1", "broadcast Bob hi"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["ERROR: From name may not exceed 15 characters"]
        );
        assert_eq!(h.engine.echoes.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn makebot_validates_name() {
        let h = Harness::new(|req| panic!("unexpected request {req:?}"));
        h.engine
            .handle_private_message(private("u1", "makebot"))
            .await
            .unwrap();
        h.engine
            .handle_private_message(private("u1", "makebot abcdefghijklmnop"))
            .await
            .unwrap();

        assert_eq!(
            h.chat.private_to("u1"),
            vec![
                "ERROR: please supply a name for the bot you want to make",
                "ERROR: bot name must be <= 15 characters in length (yours was 16)",
            ]
        );
        assert_eq!(
            h.engine.session_state(&UserId::from("u1")).await,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn makebot_existing_name_stays_idle() {
        let h = Harness::new(|req| match req {
            BackendRequest::BotExists { .. } => Ok(json!(true)),
            other => panic!("unexpected request {other:?}"),
        });
        h.engine
            .handle_private_message(private("u1", "makebot foo"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["A bot named foo already exists!"]
        );
        assert_eq!(
            h.engine.session_state(&UserId::from("u1")).await,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn editbot_shows_current_code() {
        let h = Harness::new(|req| match req {
            BackendRequest::BotData { name } => {
                Ok(json!({"name": name, "user": "u1", "code": "say('x')", "lastsaid": ""}))
            }
            other => panic!("unexpected request {other:?}"),
        });
        h.engine
            .handle_private_message(private("u1", "editbot foo"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["Here is the current script:\nsay('x')\n-------------------------\nTo abort, type `abort` below:\nTo edit, send the new script (as a single message) below:"]
        );
        assert_eq!(
            h.engine.session_state(&UserId::from("u1")).await,
            SessionState::AwaitingEditedScript
        );
    }

    #[tokio::test]
    async fn undelivered_edit_prompt_leaves_user_idle() {
        let h = Harness::new(|req| match req {
            BackendRequest::BotData { .. } => Ok(json!({"code": "x".repeat(5000)})),
            other => panic!("unexpected request {other:?}"),
        });
        h.chat.refuse_longer_than(4096);

        h.engine
            .handle_private_message(private("u1", "editbot foo"))
            .await
            .unwrap();
        assert_eq!(
            h.engine.session_state(&UserId::from("u1")).await,
            SessionState::Idle
        );

        // The next message is a command again, not the bot's new code.
        h.engine
            .handle_private_message(private("u1", "say hi"))
            .await
            .unwrap();
        assert_eq!(h.chat.room(), vec!["hi"]);
        assert_eq!(
            h.backend.calls(),
            vec![BackendRequest::BotData {
                name: "foo".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn editbot_missing_bot_reports_backend_error() {
        let h = Harness::new(|req| match req {
            BackendRequest::BotData { .. } => Err(Error::backend("Bot `foo` does not exist!", None)),
            other => panic!("unexpected request {other:?}"),
        });
        h.engine
            .handle_private_message(private("u1", "editbot foo"))
            .await
            .unwrap();
        assert_eq!(
            h.chat.private_to("u1"),
            vec!["ERROR: Bot `foo` does not exist!"]
        );
        assert_eq!(
            h.engine.session_state(&UserId::from("u1")).await,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn botcode_killbot_listbots_and_man_reply_with_backend_text() {
        let h = Harness::new(|req| match req {
            BackendRequest::BotData { .. } => Ok(json!({"code": "pass"})),
            BackendRequest::KillBot { name } => Ok(json!(format!("Bot `{name}` killed"))),
            BackendRequest::ListBots => Ok(json!("foo")),
            BackendRequest::Man { func } => Ok(json!(format!("docs for {func:?}"))),
            other => panic!("unexpected request {other:?}"),
        });
        for cmd in ["botcode foo", "killbot foo", "listbots", "man", "man say"] {
            h.engine
                .handle_private_message(private("u1", cmd))
                .await
                .unwrap();
        }
        assert_eq!(
            h.chat.private_to("u1"),
            vec![
                "pass",
                "Bot `foo` killed",
                "foo",
                "docs for None",
                "docs for Some(\"say\")",
            ]
        );
    }
}
