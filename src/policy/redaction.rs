//! Ordered regex redaction for audit snapshots.
//!
//! Rules compile once at startup; a bad pattern is a startup error, never a
//! per-request one. Rules apply in configured order, each seeing the output
//! of the previous, so ordering is semantically significant.

use regex::Regex;

use crate::config::RedactionConfig;
use crate::providers::types::ChatMessage;

struct CompiledRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

pub struct Redactor {
    enabled: bool,
    rules: Vec<CompiledRule>,
}

impl Redactor {
    pub fn from_config(config: &RedactionConfig) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(config.patterns.len());
        for pattern in &config.patterns {
            rules.push(CompiledRule {
                name: pattern.name.clone(),
                pattern: Regex::new(&pattern.regex)?,
                replacement: pattern.replacement.clone(),
            });
        }
        Ok(Self {
            enabled: config.enabled,
            rules,
        })
    }

    /// Run every rule, in order, over `text`.
    pub fn apply(&self, text: &str) -> String {
        if !self.enabled || self.rules.is_empty() {
            return text.to_string();
        }
        let mut output = text.to_string();
        for rule in &self.rules {
            let redacted = rule.pattern.replace_all(&output, rule.replacement.as_str());
            if let std::borrow::Cow::Owned(changed) = redacted {
                tracing::debug!(rule = %rule.name, "Redaction rule matched");
                output = changed;
            }
        }
        output
    }

    /// Redact the content of every message, preserving roles.
    pub fn apply_messages(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: self.apply(&m.content),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionPattern;
    use crate::providers::types::Role;

    fn redactor(enabled: bool, patterns: &[(&str, &str, &str)]) -> Redactor {
        let config = RedactionConfig {
            enabled,
            patterns: patterns
                .iter()
                .map(|(name, regex, replacement)| RedactionPattern {
                    name: (*name).into(),
                    regex: (*regex).into(),
                    replacement: (*replacement).into(),
                })
                .collect(),
        };
        Redactor::from_config(&config).unwrap()
    }

    #[test]
    fn test_basic_replacement() {
        let r = redactor(true, &[("email", r"[a-z]+@[a-z]+\.[a-z]+", "[EMAIL]")]);
        assert_eq!(r.apply("mail me at bob@example.com now"), "mail me at [EMAIL] now");
    }

    #[test]
    fn test_rule_order_matters() {
        // Rule 2 sees rule 1's output: "ab" -> "XX" -> "YY".
        let forward = redactor(true, &[("dots", ".", "X"), ("xs", "X", "Y")]);
        assert_eq!(forward.apply("ab"), "YY");

        // Reversed, the X rule fires first on text with no X, then the dot
        // rule rewrites everything, so the result differs.
        let reversed = redactor(true, &[("xs", "X", "Y"), ("dots", ".", "X")]);
        assert_eq!(reversed.apply("ab"), "XX");
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let r = redactor(false, &[("all", ".", "X")]);
        assert_eq!(r.apply("secret"), "secret");
    }

    #[test]
    fn test_invalid_pattern_rejected_at_build() {
        let config = RedactionConfig {
            enabled: true,
            patterns: vec![RedactionPattern {
                name: "broken".into(),
                regex: "(unclosed".into(),
                replacement: "X".into(),
            }],
        };
        assert!(Redactor::from_config(&config).is_err());
    }

    #[test]
    fn test_apply_messages_preserves_roles() {
        let r = redactor(true, &[("digits", r"\d+", "[N]")]);
        let messages = vec![
            ChatMessage::new(Role::System, "no digits here"),
            ChatMessage::new(Role::User, "card 4242424242424242"),
        ];
        let redacted = r.apply_messages(&messages);
        assert_eq!(redacted[0].role, Role::System);
        assert_eq!(redacted[0].content, "no digits here");
        assert_eq!(redacted[1].content, "card [N]");
    }
}
