//! Read-only guard over model-generated SQL.
//!
//! The warehouse endpoint runs whatever survives this check, so the rules
//! are strict: exactly one statement, starting with SELECT or WITH, with
//! no write or DDL keyword anywhere outside string literals. Keywords are
//! matched as whole words, so columns like UPDATE_DATE pass.

const FORBIDDEN: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "grant", "revoke",
    "copy", "call", "execute", "merge", "vacuum", "do", "set", "lock",
];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("the model returned no SQL")]
    Empty,

    #[error("only SELECT (or WITH ... SELECT) queries may run against the warehouse")]
    NotSelect,

    #[error("multiple SQL statements are not allowed")]
    MultipleStatements,

    #[error("forbidden keyword in query: {0}")]
    Forbidden(String),
}

/// Validate one model-generated query. Returns the statement trimmed of
/// whitespace and its trailing semicolon.
pub fn guard_sql(raw: &str) -> Result<String, GuardError> {
    let sql = raw.trim().trim_end_matches(';').trim();
    if sql.is_empty() {
        return Err(GuardError::Empty);
    }

    let masked = mask(sql);

    if masked.contains(';') {
        return Err(GuardError::MultipleStatements);
    }

    let mut words = masked
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase);

    match words.next().as_deref() {
        Some("select") | Some("with") => {}
        _ => return Err(GuardError::NotSelect),
    }

    for word in words {
        if FORBIDDEN.contains(&word.as_str()) {
            return Err(GuardError::Forbidden(word));
        }
    }

    Ok(sql.to_string())
}

/// Blank out string literal contents and comments so the scans above only
/// see structural SQL.
fn mask(sql: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        InString,
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::InString;
                    out.push('\'');
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    out.push(' ');
                }
                _ => out.push(c),
            },
            State::InString => match c {
                '\'' => {
                    // A doubled quote is an escaped quote, still inside.
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        state = State::Normal;
                        out.push('\'');
                    }
                }
                _ => out.push(' '),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                    out.push('\n');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_selects_pass() {
        let sql = "SELECT policy_no, premium FROM policies WHERE is_cancelled = false;";
        assert_eq!(guard_sql(sql).unwrap(), sql.trim_end_matches(';'));
    }

    #[test]
    fn ctes_pass() {
        let sql = "WITH open AS (SELECT * FROM claims WHERE claim_status <> 'Closed') SELECT count(*) FROM open";
        assert!(guard_sql(sql).is_ok());
    }

    #[test]
    fn writes_are_rejected() {
        assert_eq!(
            guard_sql("UPDATE policies SET premium = 0"),
            Err(GuardError::NotSelect)
        );
        assert_eq!(
            guard_sql("SELECT 1 UNION SELECT premium FROM delete_me; DROP TABLE policies"),
            Err(GuardError::MultipleStatements)
        );
    }

    #[test]
    fn forbidden_keywords_inside_a_select_are_caught() {
        let err = guard_sql("SELECT * FROM policies WHERE id IN (DELETE FROM x RETURNING id)");
        assert_eq!(err, Err(GuardError::Forbidden("delete".into())));
    }

    #[test]
    fn identifiers_containing_keywords_pass() {
        let sql = "SELECT update_date, created_at FROM policies";
        assert!(guard_sql(sql).is_ok());
    }

    #[test]
    fn string_literals_never_trip_the_guard() {
        let sql = "SELECT * FROM claims WHERE remarks LIKE '%drop table%' AND description <> ';'";
        assert!(guard_sql(sql).is_ok());
    }

    #[test]
    fn comments_cannot_smuggle_statements() {
        let sql = "SELECT 1 -- ; DROP TABLE policies\nFROM policies";
        assert!(guard_sql(sql).is_ok());
        let smuggled = "SELECT 1 /* x */; DELETE FROM policies";
        assert_eq!(guard_sql(smuggled), Err(GuardError::MultipleStatements));
    }

    #[test]
    fn empty_and_prose_responses_are_rejected() {
        assert_eq!(guard_sql("   ;  "), Err(GuardError::Empty));
        assert_eq!(
            guard_sql("I cannot answer that question"),
            Err(GuardError::NotSelect)
        );
    }
}
