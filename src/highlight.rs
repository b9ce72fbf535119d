use regex::Regex;

/// Semantic class of a highlighted span. The UI maps classes to colors;
/// the highlighter itself never deals in colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Keyword,
    Type,
    Comment,
    Str,
    Number,
    Operator,
    Method,
}

/// One span of a line, classified or plain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub class: Option<TokenClass>,
}

impl Token {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }
}

/// Splits single lines into classified spans.
pub trait Highlighter: Send + Sync {
    fn highlight_line(&self, line: &str) -> Vec<Token>;
}

struct CompiledGroup {
    class: TokenClass,
    regexes: Vec<Regex>,
}

/// Regex-driven highlighter built from per-language pattern tables.
///
/// Groups apply in a fixed priority order (strings, then comments, numbers,
/// keywords, types, methods, operators); a byte claimed by an earlier group
/// is never recolored by a later one, so a keyword inside a string literal
/// stays string-colored. Patterns that fail to compile are skipped.
pub struct RegexHighlighter {
    groups: Vec<CompiledGroup>,
}

struct LanguageSpec {
    keywords: &'static [&'static str],
    types: &'static [&'static str],
    comments: &'static [&'static str],
    strings: &'static [&'static str],
    methods: &'static [&'static str],
    operators: &'static [&'static str],
}

const NUMBER_PATTERNS: &[&str] = &[r"\b\d+(\.\d+)?\b", r"\b0x[0-9a-fA-F]+\b"];

const RUST: LanguageSpec = LanguageSpec {
    keywords: &[
        "fn", "let", "mut", "pub", "use", "mod", "struct", "enum", "impl", "trait", "match",
        "if", "else", "for", "while", "loop", "return", "break", "continue", "where", "move",
        "async", "await", "const", "static", "ref", "self", "Self", "super", "crate", "dyn",
        "in", "as", "unsafe", "type",
    ],
    types: &[
        "u8", "u16", "u32", "u64", "usize", "i8", "i16", "i32", "i64", "isize", "f32", "f64",
        "bool", "char", "str", "String", "Vec", "Option", "Result", "Box", "Some", "None",
        "Ok", "Err",
    ],
    comments: &["//.*$"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'([^'\\]|\\.)'"],
    methods: &[r"\b[a-z_][a-z0-9_]*\s*\("],
    operators: &["->", "=>", "::", "&&", "||"],
};

const JAVASCRIPT: LanguageSpec = LanguageSpec {
    keywords: &[
        "function", "const", "let", "var", "return", "if", "else", "for", "while", "switch",
        "case", "break", "continue", "new", "class", "extends", "import", "export", "from",
        "default", "async", "await", "try", "catch", "finally", "throw", "typeof", "of", "in",
        "this", "yield",
    ],
    types: &["undefined", "null", "true", "false", "NaN"],
    comments: &["//.*$", r"/\*.*?\*/"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'([^'\\]|\\.)*'", r"`([^`\\]|\\.)*`"],
    methods: &[r"\b[a-zA-Z_$][a-zA-Z0-9_$]*\s*\("],
    operators: &["=>", "===", "!==", "&&", "||", "??"],
};

const TYPESCRIPT: LanguageSpec = LanguageSpec {
    keywords: &[
        "function", "const", "let", "var", "return", "if", "else", "for", "while", "switch",
        "case", "break", "continue", "new", "class", "extends", "implements", "interface",
        "import", "export", "from", "default", "async", "await", "try", "catch", "finally",
        "throw", "typeof", "keyof", "of", "in", "this", "readonly", "enum", "declare", "type",
        "namespace", "as", "satisfies",
    ],
    types: &[
        "string", "number", "boolean", "object", "unknown", "any", "never", "void",
        "undefined", "null", "true", "false",
    ],
    comments: &["//.*$", r"/\*.*?\*/"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'([^'\\]|\\.)*'", r"`([^`\\]|\\.)*`"],
    methods: &[r"\b[a-zA-Z_$][a-zA-Z0-9_$]*\s*\("],
    operators: &["=>", "===", "!==", "&&", "||", "??"],
};

const PYTHON: LanguageSpec = LanguageSpec {
    keywords: &[
        "def", "class", "return", "if", "elif", "else", "for", "while", "break", "continue",
        "import", "from", "as", "with", "try", "except", "finally", "raise", "pass", "lambda",
        "yield", "global", "nonlocal", "assert", "del", "async", "await", "not", "and", "or",
        "is", "in",
    ],
    types: &["int", "float", "str", "bool", "list", "dict", "set", "tuple", "None", "True", "False"],
    comments: &["#.*$"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'([^'\\]|\\.)*'"],
    methods: &[r"\b[a-z_][a-z0-9_]*\s*\("],
    operators: &["->", "==", "!=", "**"],
};

const SHELL: LanguageSpec = LanguageSpec {
    keywords: &[
        "if", "then", "else", "elif", "fi", "for", "while", "do", "done", "case", "esac",
        "function", "return", "local", "export", "source", "exit",
    ],
    types: &[],
    comments: &["#.*$"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'[^']*'"],
    methods: &[],
    operators: &["&&", "||", "|"],
};

const TOML_LANG: LanguageSpec = LanguageSpec {
    keywords: &[],
    types: &["true", "false"],
    comments: &["#.*$"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'[^']*'"],
    methods: &[],
    operators: &["="],
};

const JSON_LANG: LanguageSpec = LanguageSpec {
    keywords: &[],
    types: &["true", "false", "null"],
    comments: &[],
    strings: &[r#""([^"\\]|\\.)*""#],
    methods: &[],
    operators: &[],
};

const YAML_LANG: LanguageSpec = LanguageSpec {
    keywords: &[],
    types: &["true", "false", "null", "yes", "no"],
    comments: &["#.*$"],
    strings: &[r#""([^"\\]|\\.)*""#, r"'[^']*'"],
    methods: &[],
    operators: &[": ", "- "],
};

impl RegexHighlighter {
    /// Builds the highlighter for a language identifier from
    /// [`crate::render::language_for_path`]. Unknown languages get no
    /// highlighter, which the viewer treats as plain text.
    pub fn for_language(language: &str) -> Option<Self> {
        let spec = match language {
            "rust" => RUST,
            "javascript" | "jsx" => JAVASCRIPT,
            "typescript" | "tsx" => TYPESCRIPT,
            "python" => PYTHON,
            "bash" => SHELL,
            "toml" => TOML_LANG,
            "json" => JSON_LANG,
            "yaml" => YAML_LANG,
            _ => return None,
        };
        Some(Self::from_spec(&spec))
    }

    fn from_spec(spec: &LanguageSpec) -> Self {
        let word = |w: &str| format!(r"\b{}\b", regex::escape(w));
        let literal = |w: &str| regex::escape(w);

        let compile = |patterns: Vec<String>| -> Vec<Regex> {
            patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect()
        };

        let groups = vec![
            CompiledGroup {
                class: TokenClass::Str,
                regexes: compile(spec.strings.iter().map(|p| p.to_string()).collect()),
            },
            CompiledGroup {
                class: TokenClass::Comment,
                regexes: compile(spec.comments.iter().map(|p| p.to_string()).collect()),
            },
            CompiledGroup {
                class: TokenClass::Number,
                regexes: compile(NUMBER_PATTERNS.iter().map(|p| p.to_string()).collect()),
            },
            CompiledGroup {
                class: TokenClass::Keyword,
                regexes: compile(spec.keywords.iter().map(|w| word(w)).collect()),
            },
            CompiledGroup {
                class: TokenClass::Type,
                regexes: compile(spec.types.iter().map(|w| word(w)).collect()),
            },
            CompiledGroup {
                class: TokenClass::Method,
                regexes: compile(spec.methods.iter().map(|p| p.to_string()).collect()),
            },
            CompiledGroup {
                class: TokenClass::Operator,
                regexes: compile(spec.operators.iter().map(|p| literal(p)).collect()),
            },
        ];

        Self { groups }
    }
}

impl Highlighter for RegexHighlighter {
    fn highlight_line(&self, line: &str) -> Vec<Token> {
        if line.is_empty() {
            return Vec::new();
        }

        let mut byte_classes: Vec<Option<TokenClass>> = vec![None; line.len()];
        for group in &self.groups {
            for regex in &group.regexes {
                for mat in regex.find_iter(line) {
                    for slot in &mut byte_classes[mat.start()..mat.end()] {
                        if slot.is_none() {
                            *slot = Some(group.class);
                        }
                    }
                }
            }
        }

        // Coalesce runs of equal class into tokens; run boundaries always
        // fall on match boundaries, which are char boundaries.
        let mut tokens = Vec::new();
        let mut run_start = 0;
        let mut run_class = byte_classes[0];
        for (i, class) in byte_classes.iter().enumerate().skip(1) {
            if *class != run_class {
                tokens.push(Token {
                    text: line[run_start..i].to_string(),
                    class: run_class,
                });
                run_start = i;
                run_class = *class;
            }
        }
        tokens.push(Token {
            text: line[run_start..].to_string(),
            class: run_class,
        });

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rust() -> RegexHighlighter {
        RegexHighlighter::for_language("rust").expect("rust is supported")
    }

    fn classes(tokens: &[Token]) -> Vec<(String, Option<TokenClass>)> {
        tokens
            .iter()
            .map(|t| (t.text.clone(), t.class))
            .collect()
    }

    #[test]
    fn tokens_reassemble_to_the_input_line() {
        let line = r#"let name = "value"; // note"#;
        let joined: String = rust()
            .highlight_line(line)
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(joined, line);
    }

    #[test]
    fn keywords_and_strings_are_classified() {
        let tokens = rust().highlight_line(r#"let x = "hi";"#);
        assert_eq!(
            classes(&tokens),
            vec![
                ("let".to_string(), Some(TokenClass::Keyword)),
                (" x = ".to_string(), None),
                (r#""hi""#.to_string(), Some(TokenClass::Str)),
                (";".to_string(), None),
            ]
        );
    }

    #[test]
    fn string_contents_shadow_keywords() {
        let tokens = rust().highlight_line(r#""let inside""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].class, Some(TokenClass::Str));
    }

    #[test]
    fn line_comments_run_to_end_of_line() {
        let tokens = rust().highlight_line("x // let y = 1");
        let comment = tokens.last().expect("comment token");
        assert_eq!(comment.text, "// let y = 1");
        assert_eq!(comment.class, Some(TokenClass::Comment));
    }

    #[test]
    fn numbers_are_classified_outside_identifiers() {
        let tokens = rust().highlight_line("abc123 42");
        assert!(tokens.iter().any(|t| t.text == "42" && t.class == Some(TokenClass::Number)));
        assert!(!tokens.iter().any(|t| t.text.contains("123") && t.class == Some(TokenClass::Number)));
    }

    #[test]
    fn empty_line_yields_no_tokens() {
        assert!(rust().highlight_line("").is_empty());
    }

    #[test]
    fn unknown_language_has_no_highlighter() {
        assert!(RegexHighlighter::for_language("cobol").is_none());
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let tokens = rust().highlight_line("let título = 1;");
        let joined: String = tokens.into_iter().map(|t| t.text).collect();
        assert_eq!(joined, "let título = 1;");
    }
}
