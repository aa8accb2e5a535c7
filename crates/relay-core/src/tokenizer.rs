/// Split a private message into command arguments.
///
/// Whitespace separates arguments unless quoted. `"` and `'` toggle the same
/// quoted mode and are dropped. A backslash makes the next character literal.
/// Unterminated quotes and a dangling backslash are tolerated. An empty input
/// yields a single empty argument so `args[0]` always exists.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = vec![String::new()];
    let mut quoted = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    push_char(&mut tokens, next);
                }
            }
            '"' | '\'' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if tokens.last().is_some_and(|t| !t.is_empty()) {
                    tokens.push(String::new());
                }
            }
            c => push_char(&mut tokens, c),
        }
    }

    if tokens.len() > 1 && tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

fn push_char(tokens: &mut Vec<String>, c: char) {
    match tokens.last_mut() {
        Some(t) => t.push(c),
        None => tokens.push(c.to_string()),
    }
}
