//! Top-level statement scanning
//!
//! Splits SQL text into statements without parsing it. Quoted strings,
//! quoted identifiers, comments and PostgreSQL dollar-quoted bodies are
//! skipped, and the `BEGIN ... END` body of a `CREATE TRIGGER` or
//! `CREATE FUNCTION ... BEGIN ATOMIC` statement stays inside its statement.

use std::fmt;

/// Leading keywords of one top-level statement, upper-cased
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatementHead {
    words: Vec<String>,
}

impl StatementHead {
    const MAX_WORDS: usize = 2;

    pub fn first(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or_default()
    }

    fn second(&self) -> &str {
        self.words.get(1).map(String::as_str).unwrap_or_default()
    }

    /// Whether the statement opens, ends, or abandons a transaction
    ///
    /// Savepoints (`SAVEPOINT`, `RELEASE`, `ROLLBACK TO`) nest inside the
    /// enclosing transaction and are not counted.
    pub fn is_transaction_control(&self) -> bool {
        match self.first() {
            "BEGIN" | "COMMIT" | "END" | "ABORT" => true,
            "START" | "PREPARE" => self.second() == "TRANSACTION",
            "ROLLBACK" => self.second() != "TO",
            _ => false,
        }
    }
}

impl fmt::Display for StatementHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}

/// One head per non-empty top-level statement, in order
///
/// Statements holding only whitespace or comments are not counted.
pub fn statement_heads(sql: &str) -> Vec<StatementHead> {
    Scanner::new(sql).run()
}

/// The first top-level statement that controls the transaction, if any
pub fn find_transaction_control(sql: &str) -> Option<StatementHead> {
    statement_heads(sql)
        .into_iter()
        .find(StatementHead::is_transaction_control)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Default)]
struct Statement {
    head: StatementHead,
    has_content: bool,
    // Open BEGIN/CASE blocks inside a CREATE statement's body
    block_depth: usize,
}

impl Statement {
    fn push_word(&mut self, word: &str) {
        self.has_content = true;
        if !word.starts_with(|c: char| c.is_alphabetic() || c == '_') {
            return;
        }
        let upper = word.to_ascii_uppercase();

        if self.head.first() == "CREATE" {
            match upper.as_str() {
                "BEGIN" => self.block_depth += 1,
                "CASE" if self.block_depth > 0 => self.block_depth += 1,
                "END" if self.block_depth > 0 => self.block_depth -= 1,
                _ => {}
            }
        }

        if self.head.words.len() < StatementHead::MAX_WORDS {
            self.head.words.push(upper);
        }
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    word: String,
    current: Statement,
    heads: Vec<StatementHead>,
}

impl Scanner {
    fn new(sql: &str) -> Self {
        Self {
            chars: sql.chars().collect(),
            pos: 0,
            word: String::new(),
            current: Statement::default(),
            heads: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Vec<StatementHead> {
        while let Some(c) = self.peek(0) {
            if is_word_char(c) {
                self.word.push(c);
                self.pos += 1;
                continue;
            }

            let escape_string = self.word.eq_ignore_ascii_case("e");
            let after_word = !self.word.is_empty();
            self.flush_word();

            match c {
                '\'' => self.skip_quoted('\'', escape_string),
                '"' | '`' => self.skip_quoted(c, false),
                '-' if self.peek(1) == Some('-') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(),
                '$' if !after_word => self.skip_dollar_quoted(),
                ';' => {
                    self.pos += 1;
                    if self.current.block_depth == 0 {
                        self.finish_statement();
                    }
                }
                c if c.is_whitespace() => self.pos += 1,
                _ => {
                    self.current.has_content = true;
                    self.pos += 1;
                }
            }
        }

        self.flush_word();
        self.finish_statement();
        self.heads
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            let word = std::mem::take(&mut self.word);
            self.current.push_word(&word);
        }
    }

    fn finish_statement(&mut self) {
        let statement = std::mem::take(&mut self.current);
        if statement.has_content {
            self.heads.push(statement.head);
        }
    }

    /// Skip a quoted run; a doubled quote is an escaped quote
    fn skip_quoted(&mut self, quote: char, backslash_escapes: bool) {
        self.current.has_content = true;
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if backslash_escapes && c == '\\' {
                self.pos += 1;
            } else if c == quote {
                if self.peek(0) == Some(quote) {
                    self.pos += 1;
                } else {
                    return;
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == '\n' {
                return;
            }
        }
    }

    /// PostgreSQL block comments nest
    fn skip_block_comment(&mut self) {
        self.pos += 2;
        let mut depth = 1;
        while depth > 0 && self.pos < self.chars.len() {
            match (self.peek(0), self.peek(1)) {
                (Some('/'), Some('*')) => {
                    depth += 1;
                    self.pos += 2;
                }
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// `$$ ... $$` or `$tag$ ... $tag$`; a lone `$` (e.g. `$1`) is content
    fn skip_dollar_quoted(&mut self) {
        self.current.has_content = true;

        let mut end = self.pos + 1;
        while let Some(&c) = self.chars.get(end) {
            if c == '$' {
                break;
            }
            let valid = if end == self.pos + 1 {
                c.is_alphabetic() || c == '_'
            } else {
                is_word_char(c)
            };
            if !valid {
                self.pos += 1;
                return;
            }
            end += 1;
        }
        if self.chars.get(end) != Some(&'$') {
            self.pos += 1;
            return;
        }

        let tag: Vec<char> = self.chars[self.pos..=end].to_vec();
        self.pos = end + 1;
        while self.pos < self.chars.len() {
            if self.chars[self.pos..].starts_with(&tag) {
                self.pos += tag.len();
                return;
            }
            self.pos += 1;
        }
    }
}
