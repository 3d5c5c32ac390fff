use anyhow::{bail, Context, Result};
use tracing::debug;

pub const ENV_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const ENV_TARGET_CHANNEL: &str = "TARGET_DISCORD_CHANNEL_ID";
pub const ENV_KEYWORDS: &str = "SEARCH_KEYWORDS";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_bot_token: String,
    pub slack_webhook_url: String,
    /// Only this channel is monitored when set
    pub target_channel_id: Option<u64>,
    /// Empty means forward everything
    pub keywords: Vec<String>,
}

impl Config {
    /// Load `.env` from the working directory (if any), then read the environment.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(discord_bot_token) = non_blank(ENV_BOT_TOKEN) else {
            bail!("{ENV_BOT_TOKEN} is not set");
        };
        let Some(slack_webhook_url) = non_blank(ENV_WEBHOOK_URL) else {
            bail!("{ENV_WEBHOOK_URL} is not set");
        };

        let target_channel_id = non_blank(ENV_TARGET_CHANNEL)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{ENV_TARGET_CHANNEL} is not a channel id: {raw}"))
            })
            .transpose()?;

        let keywords = parse_keywords(&lookup(ENV_KEYWORDS).unwrap_or_default());

        Ok(Self {
            discord_bot_token,
            slack_webhook_url,
            target_channel_id,
            keywords,
        })
    }
}

/// Parse `SEARCH_KEYWORDS`: a list literal (`["a", "b"]` or `['a', 'b']`)
/// or a comma separated string (`a, b`).
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(items) = parse_list_literal(trimmed) {
        return clean(items);
    }

    clean(trimmed.split(',').map(str::to_string).collect())
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_list_literal(s: &str) -> Option<Vec<String>> {
    if !(s.starts_with('[') && s.ends_with(']')) {
        return None;
    }

    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(s) {
        return Some(
            values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        );
    }

    parse_quoted_list(&s[1..s.len() - 1])
}

/// Items of a bracketed list with single or double quoted strings and bare scalars.
/// Returns `None` on unbalanced quotes or junk between items.
fn parse_quoted_list(inner: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let item = if first == '\'' || first == '"' {
            chars.next();
            let mut buf = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => buf.push(chars.next()?),
                    c if c == first => {
                        closed = true;
                        break;
                    }
                    c => buf.push(c),
                }
            }
            if !closed {
                return None;
            }
            buf
        } else {
            let mut buf = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                buf.push(c);
                chars.next();
            }
            let token = buf.trim();
            if token.is_empty() || token.contains(['\'', '"', '[', ']']) {
                return None;
            }
            token.to_string()
        };
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') | None => {}
            Some(_) => return None,
        }
    }

    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_required_vars() {
        let err = Config::from_lookup(lookup(&[(ENV_WEBHOOK_URL, "https://hooks")])).unwrap_err();
        assert!(err.to_string().contains(ENV_BOT_TOKEN));

        let err = Config::from_lookup(lookup(&[(ENV_BOT_TOKEN, "tok")])).unwrap_err();
        assert!(err.to_string().contains(ENV_WEBHOOK_URL));

        let err = Config::from_lookup(lookup(&[
            (ENV_BOT_TOKEN, "  "),
            (ENV_WEBHOOK_URL, "https://hooks"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_BOT_TOKEN));
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_lookup(lookup(&[
            (ENV_BOT_TOKEN, "tok"),
            (ENV_WEBHOOK_URL, "https://hooks.slack.com/services/X"),
        ]))
        .unwrap();
        assert_eq!(config.discord_bot_token, "tok");
        assert_eq!(config.slack_webhook_url, "https://hooks.slack.com/services/X");
        assert_eq!(config.target_channel_id, None);
        assert!(config.keywords.is_empty());
    }

    #[test]
    fn test_target_channel() {
        let config = Config::from_lookup(lookup(&[
            (ENV_BOT_TOKEN, "tok"),
            (ENV_WEBHOOK_URL, "https://hooks"),
            (ENV_TARGET_CHANNEL, " 123456789012345678 "),
        ]))
        .unwrap();
        assert_eq!(config.target_channel_id, Some(123456789012345678));

        let err = Config::from_lookup(lookup(&[
            (ENV_BOT_TOKEN, "tok"),
            (ENV_WEBHOOK_URL, "https://hooks"),
            (ENV_TARGET_CHANNEL, "general"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TARGET_CHANNEL));
    }

    #[test]
    fn test_keywords_json_list() {
        assert_eq!(parse_keywords(r#"["foo bar", " baz ", ""]"#), vec!["foo bar", "baz"]);
        assert_eq!(parse_keywords("[1, true]"), vec!["1", "true"]);
    }

    #[test]
    fn test_keywords_single_quoted_list() {
        assert_eq!(
            parse_keywords("['foo', \"bar, baz\", 'it\\'s']"),
            vec!["foo", "bar, baz", "it's"]
        );
        assert_eq!(parse_keywords("['a', 42,]"), vec!["a", "42"]);
        assert!(parse_keywords("[]").is_empty());
    }

    #[test]
    fn test_keywords_comma_separated() {
        assert_eq!(parse_keywords("foo, bar ,,baz"), vec!["foo", "bar", "baz"]);
        assert_eq!(parse_keywords("single"), vec!["single"]);
    }

    #[test]
    fn test_keywords_broken_literal_falls_back() {
        assert_eq!(parse_keywords("['foo, bar]"), vec!["['foo", "bar]"]);
    }

    #[test]
    fn test_keywords_blank() {
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords("   ").is_empty());
        assert!(parse_keywords(" , , ").is_empty());
    }
}
