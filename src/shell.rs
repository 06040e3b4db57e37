//! Terminal presentation for the chat transcript

use crate::models::{format_usd, Account, Speaker, Turn};

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Say(String),
    Clear,
    Mic,
    Quit,
    Empty,
}

/// Interpret a prompt line. A bare number picks one of the visible
/// suggestions; anything else is sent as typed.
pub fn parse_input(line: &str, suggestions: Option<&[String]>) -> ShellCommand {
    let text = line.trim();
    match text {
        "" => return ShellCommand::Empty,
        "/quit" | "/exit" => return ShellCommand::Quit,
        "/clear" => return ShellCommand::Clear,
        "/mic" => return ShellCommand::Mic,
        _ => {}
    }

    if let (Ok(choice), Some(options)) = (text.parse::<usize>(), suggestions) {
        if let Some(suggestion) = choice.checked_sub(1).and_then(|i| options.get(i)) {
            return ShellCommand::Say(suggestion.clone());
        }
    }

    ShellCommand::Say(text.to_string())
}

pub fn render_account(account: &Account) -> String {
    format!(
        "{:?} ({})  {}",
        account.kind,
        account.masked_number,
        format_usd(account.balance)
    )
}

pub fn render_turn(turn: &Turn) -> String {
    let label = match turn.speaker {
        Speaker::User => "You",
        Speaker::Assistant => "Assistant",
    };

    let mut out = format!("{}: {}", label, turn.text);
    for account in turn.accounts.iter().flatten() {
        out.push_str("\n    ");
        out.push_str(&render_account(account));
    }
    out
}

pub fn render_suggestions(suggestions: &[String]) -> String {
    let mut out = String::from("  You might also ask:");
    for (i, suggestion) in suggestions.iter().enumerate() {
        out.push_str(&format!("\n    {}. {}", i + 1, suggestion));
    }
    out
}

pub const HELP_TEXT: &str =
    "Type a question, a suggestion number, /mic to speak, /clear to start over, or /quit.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountKind;

    fn suggestions() -> Vec<String> {
        vec![
            "Where are you located?".to_string(),
            "What is the customer care number?".to_string(),
        ]
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_input("  /quit ", None), ShellCommand::Quit);
        assert_eq!(parse_input("/clear", None), ShellCommand::Clear);
        assert_eq!(parse_input("/mic", None), ShellCommand::Mic);
        assert_eq!(parse_input("   ", None), ShellCommand::Empty);
        assert_eq!(
            parse_input("  block my card ", None),
            ShellCommand::Say("block my card".to_string())
        );
    }

    #[test]
    fn test_number_picks_suggestion() {
        let options = suggestions();
        assert_eq!(
            parse_input("2", Some(&options)),
            ShellCommand::Say("What is the customer care number?".to_string())
        );
        // out of range or no suggestions shown: sent as typed
        assert_eq!(parse_input("0", Some(&options)), ShellCommand::Say("0".to_string()));
        assert_eq!(parse_input("3", Some(&options)), ShellCommand::Say("3".to_string()));
        assert_eq!(parse_input("1", None), ShellCommand::Say("1".to_string()));
    }

    #[test]
    fn test_render_turn_with_accounts() {
        let turn = Turn::assistant("Here are your balances.").with_accounts(Some(vec![
            Account {
                kind: AccountKind::Checking,
                masked_number: "...1234".to_string(),
                balance: 5432.10,
            },
        ]));

        assert_eq!(
            render_turn(&turn),
            "Assistant: Here are your balances.\n    Checking (...1234)  $5,432.10"
        );
        assert_eq!(render_turn(&Turn::user("hi")), "You: hi");
    }

    #[test]
    fn test_render_suggestions_numbered() {
        assert_eq!(
            render_suggestions(&suggestions()),
            "  You might also ask:\n    1. Where are you located?\n    2. What is the customer care number?"
        );
    }
}
