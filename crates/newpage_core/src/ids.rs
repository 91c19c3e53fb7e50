/// A unit of an ID being cleaned. `Opaque` stands for content that the cleaner
/// must carry through untouched (the pending-input slot of a namespace path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Char(char),
    Opaque,
}

const SEPARATORS: &[char] = &['.', '_', '-'];

/// Normalize a raw page or namespace ID the way the wiki does before
/// touching storage.
pub fn clean_id(raw: &str) -> String {
    clean_tokens(raw.chars().map(Token::Char))
        .into_iter()
        .filter_map(|token| match token {
            Token::Char(ch) => Some(ch),
            Token::Opaque => None,
        })
        .collect()
}

pub(crate) fn clean_tokens<I>(tokens: I) -> Vec<Token>
where
    I: IntoIterator<Item = Token>,
{
    let tokens: Vec<Token> = tokens.into_iter().collect();
    let trimmed = trim_tokens(&tokens, |ch| ch.is_whitespace());

    let mut mapped = Vec::with_capacity(trimmed.len());
    for token in trimmed {
        match *token {
            Token::Opaque => mapped.push(Token::Opaque),
            Token::Char(ch) => {
                for lower in ch.to_lowercase() {
                    mapped.push(Token::Char(map_special(lower)));
                }
            }
        }
    }

    let mut collapsed: Vec<Token> = Vec::with_capacity(mapped.len());
    for token in mapped {
        if let (Token::Char(ch), Some(Token::Char(previous))) = (token, collapsed.last())
            && ch == *previous
            && (ch == '_' || ch == ':')
        {
            continue;
        }
        collapsed.push(token);
    }

    let trimmed = trim_tokens(&collapsed, |ch| ch == ':' || SEPARATORS.contains(&ch));

    let mut out: Vec<Token> = Vec::with_capacity(trimmed.len());
    let mut after_colon = false;
    for token in trimmed {
        match *token {
            Token::Char(':') => {
                while matches!(out.last(), Some(Token::Char(ch)) if *ch == ':' || SEPARATORS.contains(ch))
                {
                    out.pop();
                }
                out.push(Token::Char(':'));
                after_colon = true;
            }
            Token::Char(ch) if after_colon && SEPARATORS.contains(&ch) => {}
            other => {
                out.push(other);
                after_colon = false;
            }
        }
    }
    out
}

fn map_special(ch: char) -> char {
    match ch {
        ';' | '/' => ':',
        ch if ch.is_alphanumeric() || ch == ':' || SEPARATORS.contains(&ch) => ch,
        _ => '_',
    }
}

fn trim_tokens<F>(tokens: &[Token], strip: F) -> &[Token]
where
    F: Fn(char) -> bool,
{
    let is_strippable = |token: &Token| matches!(token, Token::Char(ch) if strip(*ch));
    let start = tokens
        .iter()
        .position(|token| !is_strippable(token))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|token| !is_strippable(token))
        .map_or(start, |index| index + 1);
    &tokens[start..end]
}

/// Namespace part of an ID, empty for IDs in the root namespace.
pub fn get_ns(id: &str) -> &str {
    match id.rfind(':') {
        Some(index) => &id[..index],
        None => "",
    }
}

/// Last segment of an ID.
pub fn no_ns(id: &str) -> &str {
    match id.rfind(':') {
        Some(index) => &id[index + 1..],
        None => id,
    }
}

/// Resolve a possibly relative page reference against the page it appears on.
///
/// - `~name` is relative to the context page, which acts as a namespace.
/// - `.name`, `..name`, `.:name` and `..:name` walk from the context namespace.
/// - a name without any colon lives in the context namespace.
/// - a leading colon or any inner colon makes the reference absolute.
/// - a trailing colon points at the namespace's start page.
pub fn resolve_id(id: &str, context_page: &str, start_page: &str) -> String {
    let context_ns = get_ns(context_page);
    let id = id.trim();
    if id.is_empty() {
        return clean_id(context_page);
    }

    let mut expanded = if let Some(rest) = id.strip_prefix('~') {
        format!("{context_page}:{rest}")
    } else if id.starts_with('.') {
        format!("{context_ns}:{}", separate_leading_dots(id))
    } else if !id.contains(':') {
        format!("{context_ns}:{id}")
    } else {
        id.to_string()
    };

    if expanded.ends_with(':') {
        expanded.push_str(start_page);
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in expanded.split(':') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    clean_id(&parts.join(":"))
}

fn separate_leading_dots(id: &str) -> String {
    let dots = id.chars().take_while(|ch| *ch == '.').count();
    let rest = &id[dots..];
    if rest.is_empty() || rest.starts_with(':') {
        id.to_string()
    } else {
        format!("{}:{rest}", &id[..dots])
    }
}
