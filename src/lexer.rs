/// Token types for chord-chart text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `|`, `||`, `|:`, `:|` and friends
    BarLine,
    /// `%` or a lone `x`
    Repeat,
    /// Any other whitespace-delimited word
    Chord(String),
    Newline,
}

/// A token with its position in the source
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Lexer for tokenizing chord charts
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            position: 0,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn check_comment(&self) -> bool {
        self.input[self.position..].starts_with("//")
    }

    fn is_bar_char(c: char) -> bool {
        c == '|' || c == ':'
    }

    pub fn tokenize(&mut self) -> Vec<LocatedToken> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.peek() {
            let line = self.line;
            let column = self.column;

            // Comments run to the end of the line
            if self.check_comment() {
                while let Some(&c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            let token = if c == '\n' {
                self.advance();
                Token::Newline
            } else if c.is_whitespace() {
                self.advance();
                continue;
            } else if Self::is_bar_char(c) {
                while let Some(&c) = self.peek() {
                    if !Self::is_bar_char(c) {
                        break;
                    }
                    self.advance();
                }
                Token::BarLine
            } else {
                let start = self.position;
                while let Some(&c) = self.peek() {
                    if c.is_whitespace() || Self::is_bar_char(c) {
                        break;
                    }
                    self.advance();
                }
                match &self.input[start..self.position] {
                    "%" | "x" => Token::Repeat,
                    word => Token::Chord(word.to_string()),
                }
            };

            tokens.push(LocatedToken {
                token,
                line,
                column,
            });
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_bars_and_chords() {
        assert_eq!(
            token_types("| C Am | % |"),
            vec![
                Token::BarLine,
                Token::Chord("C".to_string()),
                Token::Chord("Am".to_string()),
                Token::BarLine,
                Token::Repeat,
                Token::BarLine,
            ]
        );
    }

    #[test]
    fn test_repeat_barlines_collapse() {
        assert_eq!(
            token_types("|: C :||"),
            vec![Token::BarLine, Token::Chord("C".to_string()), Token::BarLine]
        );
    }

    #[test]
    fn test_lone_x_is_a_repeat() {
        assert_eq!(
            token_types("C x Cmaj7"),
            vec![
                Token::Chord("C".to_string()),
                Token::Repeat,
                Token::Chord("Cmaj7".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(
            token_types("| C | // intro\n| G |"),
            vec![
                Token::BarLine,
                Token::Chord("C".to_string()),
                Token::BarLine,
                Token::Newline,
                Token::BarLine,
                Token::Chord("G".to_string()),
                Token::BarLine,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("| C |\n| Gm7 |").tokenize();
        let gm7 = tokens
            .iter()
            .find(|t| t.token == Token::Chord("Gm7".to_string()))
            .unwrap();
        assert_eq!(gm7.line, 2);
        assert_eq!(gm7.column, 3);
    }
}
