use regex::Regex;

use crate::types::{Response, UndoOutcome};

/// A request addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `react <term> <response>`; the term is a bare word or a quoted phrase.
    Teach { term: String, response: String },
    /// `ignore that`
    Undo,
}

/// How an inbound chat line should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// Addressed to the bot but not a known command.
    Directed,
    /// Ordinary chatter, eligible for passive matching.
    Heard,
}

/// Recognises lines addressed to the bot (`@name: ...`, `name, ...`,
/// `name ...`) and parses the commands inside them.
pub struct CommandParser {
    mention: Regex,
    teach: Regex,
    undo: Regex,
}

impl CommandParser {
    pub fn new(bot_name: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            mention: Regex::new(&format!(r"(?i)^@?{}[:,]?\s+", regex::escape(bot_name)))?,
            teach: Regex::new(r#"(?is)^react\s+(?:"([^"]*)"|(\w+))\s+(.*)$"#)?,
            undo: Regex::new(r"(?i)^ignore\s+that\b")?,
        })
    }

    pub fn is_directed(&self, text: &str) -> bool {
        self.mention.is_match(text)
    }

    pub fn classify(&self, text: &str) -> Inbound {
        let Some(mention) = self.mention.find(text) else {
            return Inbound::Heard;
        };
        let body = text[mention.end()..].trim();

        if let Some(caps) = self.teach.captures(body) {
            let term = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let response = caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            return Inbound::Command(Command::Teach { term, response });
        }

        if self.undo.is_match(body) {
            return Inbound::Command(Command::Undo);
        }

        Inbound::Directed
    }
}

pub fn teach_reply(record: &Response) -> String {
    format!("Reacting to {} with {}", record.term, record.response)
}

pub fn undo_reply(outcome: &UndoOutcome) -> String {
    match outcome {
        UndoOutcome::Forgotten(record) => {
            format!("No longer reacting to {} with {}", record.term, record.response)
        }
        UndoOutcome::AlreadyGone(_) => "Wat.".to_string(),
        UndoOutcome::NothingToUndo => "Nothing to ignore.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new("reflex").unwrap()
    }

    #[test]
    fn mention_prefix_variants() {
        let parser = parser();
        assert!(parser.is_directed("reflex ignore that"));
        assert!(parser.is_directed("@reflex: ignore that"));
        assert!(parser.is_directed("REFLEX, ignore that"));
        assert!(!parser.is_directed("reflexes are fast"));
        assert!(!parser.is_directed("hey reflex ignore that"));
        assert!(!parser.is_directed("reflex"));
    }

    #[test]
    fn teach_with_bare_term() {
        assert_eq!(
            parser().classify("reflex react pizza I love pizza!"),
            Inbound::Command(Command::Teach {
                term: "pizza".into(),
                response: "I love pizza!".into(),
            })
        );
    }

    #[test]
    fn teach_with_quoted_phrase() {
        assert_eq!(
            parser().classify(r#"@reflex: react "good morning" Good morning!"#),
            Inbound::Command(Command::Teach {
                term: "good morning".into(),
                response: "Good morning!".into(),
            })
        );
    }

    #[test]
    fn undo_and_unknown_commands() {
        let parser = parser();
        assert_eq!(
            parser.classify("reflex: Ignore that"),
            Inbound::Command(Command::Undo)
        );
        assert_eq!(parser.classify("reflex what's up"), Inbound::Directed);
        assert_eq!(parser.classify("react pizza yum"), Inbound::Heard);
    }

    #[test]
    fn bot_name_is_escaped() {
        let parser = CommandParser::new("r.bot").unwrap();
        assert!(parser.is_directed("r.bot ignore that"));
        assert!(!parser.is_directed("rxbot ignore that"));
    }

    #[test]
    fn replies() {
        let record = Response {
            term: "pizza".into(),
            stems: vec!["pizza".into()],
            key: "pizza".into(),
            response: "yum".into(),
        };
        assert_eq!(teach_reply(&record), "Reacting to pizza with yum");
        assert_eq!(
            undo_reply(&UndoOutcome::Forgotten(record.clone())),
            "No longer reacting to pizza with yum"
        );
        assert_eq!(undo_reply(&UndoOutcome::AlreadyGone(record)), "Wat.");
        assert_eq!(
            undo_reply(&UndoOutcome::NothingToUndo),
            "Nothing to ignore."
        );
    }
}
