//! Lexical syntax table for every supported language.
//!
//! Each entry says how comments and string literals are delimited (so they
//! can be masked before counting), which keywords and operators are decision
//! points, and which line patterns introduce a named function.
//!
//! Catch-all branches are not decision points: `default:` is never counted,
//! and neither are Rust `_ =>` arms or Python `case _:`.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Braces,
    Indentation,
}

/// A string/char literal delimiter
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub ch: u8,
    /// Backslash escapes the next byte
    pub escapes: bool,
    /// Literal may contain newlines
    pub multiline: bool,
}

const fn quote(ch: u8, escapes: bool, multiline: bool) -> Quote {
    Quote {
        ch,
        escapes,
        multiline,
    }
}

const C_QUOTES: &[Quote] = &[quote(b'"', true, false), quote(b'\'', true, false)];
const JS_QUOTES: &[Quote] = &[
    quote(b'"', true, false),
    quote(b'\'', true, false),
    quote(b'`', true, true),
];
const GO_QUOTES: &[Quote] = &[
    quote(b'"', true, false),
    quote(b'\'', true, false),
    quote(b'`', false, true),
];
const RUST_QUOTES: &[Quote] = &[quote(b'"', true, true)];

#[derive(Debug)]
pub struct LanguageSyntax {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    /// Test-file globs excluded by default
    pub test_patterns: &'static [&'static str],
    pub style: BlockStyle,
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    pub nested_comments: bool,
    pub quotes: &'static [Quote],
    /// `"""` / `'''` literals (Python strings, Java text blocks)
    pub triple_quotes: bool,
    /// Prefix byte introducing a verbatim string where `""` escapes a quote
    pub verbatim_prefix: Option<u8>,
    /// Char literals vs lifetimes, raw strings `r#"..."#`, closure pipes
    pub rust_rules: bool,
    pub keywords: &'static [&'static str],
    pub operators: &'static [&'static str],
    /// Patterns whose first capture group is the name of a function being
    /// declared on that line
    pub headers: &'static [&'static str],
}

const C_FAMILY_HEADER: &str =
    r"^\s*(?:[A-Za-z_][\w:<>,\*&\[\]]*\s+)+[\*&]*([A-Za-z_~][\w:~]*)\s*\(";
const JAVA_HEADER: &str = r"^\s*(?:@\w+\s+)*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|native|default|virtual|override|async|sealed|extern|unsafe|partial)\s+)*(?:<[^>]+>\s+)?[\w<>\[\],.?]+\s+([A-Za-z_]\w*)\s*\(";
const CTOR_HEADER: &str = r"^\s*(?:public|private|protected|internal)\s+([A-Z]\w*)\s*\(";
const JS_FUNCTION: &str = r"\bfunction\b\s*\*?\s*([A-Za-z_$][\w$]*)\s*[<(]";
const JS_ARROW: &str = r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^()]*\)\s*(?::\s*[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)";
const JS_METHOD: &str = r"^\s*(?:(?:public|private|protected|static|async|readonly|override|get|set)\s+)*\*?([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\([^)]*\)\s*(?::\s*[^{;]+)?\{";

pub static LANGUAGES: &[LanguageSyntax] = &[
    LanguageSyntax {
        id: "rust",
        extensions: &["rs"],
        test_patterns: &["**/tests/**", "**/*_test.rs", "**/benches/**"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: true,
        quotes: RUST_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: true,
        keywords: &["if", "for", "while"],
        operators: &["&&", "||", "=>"],
        headers: &[r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)"],
    },
    LanguageSyntax {
        id: "go",
        extensions: &["go"],
        test_patterns: &["**/*_test.go", "**/testdata/**"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: GO_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "case"],
        operators: &["&&", "||"],
        headers: &[r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*[\[(]"],
    },
    LanguageSyntax {
        id: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
        test_patterns: &[
            "**/*.test.js",
            "**/*.spec.js",
            "**/*.test.jsx",
            "**/*.spec.jsx",
            "**/__tests__/**",
        ],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: JS_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "while", "case", "catch"],
        operators: &["&&", "||"],
        headers: &[JS_FUNCTION, JS_ARROW, JS_METHOD],
    },
    LanguageSyntax {
        id: "typescript",
        extensions: &["ts", "tsx", "mts", "cts"],
        test_patterns: &[
            "**/*.test.ts",
            "**/*.spec.ts",
            "**/*.test.tsx",
            "**/*.spec.tsx",
            "**/__tests__/**",
        ],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: JS_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "while", "case", "catch"],
        operators: &["&&", "||"],
        headers: &[JS_FUNCTION, JS_ARROW, JS_METHOD],
    },
    LanguageSyntax {
        id: "java",
        extensions: &["java"],
        test_patterns: &["**/src/test/**", "**/*Test.java", "**/*Tests.java"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: C_QUOTES,
        triple_quotes: true,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "while", "case", "catch"],
        operators: &["&&", "||"],
        headers: &[JAVA_HEADER, CTOR_HEADER],
    },
    LanguageSyntax {
        id: "csharp",
        extensions: &["cs"],
        test_patterns: &["**/*Tests.cs", "**/*Test.cs", "**/*.Tests/**"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: C_QUOTES,
        triple_quotes: false,
        verbatim_prefix: Some(b'@'),
        rust_rules: false,
        keywords: &["if", "for", "foreach", "while", "case", "catch"],
        operators: &["&&", "||"],
        headers: &[JAVA_HEADER, CTOR_HEADER],
    },
    LanguageSyntax {
        id: "c",
        extensions: &["c", "h"],
        test_patterns: &["**/test/**", "**/tests/**", "**/*_test.c"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: C_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "while", "case"],
        operators: &["&&", "||"],
        headers: &[C_FAMILY_HEADER],
    },
    LanguageSyntax {
        id: "cpp",
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        test_patterns: &["**/test/**", "**/tests/**", "**/*_test.cpp", "**/*_test.cc"],
        style: BlockStyle::Braces,
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_comments: false,
        quotes: C_QUOTES,
        triple_quotes: false,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "for", "while", "case", "catch"],
        operators: &["&&", "||"],
        headers: &[C_FAMILY_HEADER],
    },
    LanguageSyntax {
        id: "python",
        extensions: &["py", "pyw"],
        test_patterns: &["**/test_*.py", "**/*_test.py", "**/tests/**", "**/conftest.py"],
        style: BlockStyle::Indentation,
        line_comments: &["#"],
        block_comment: None,
        nested_comments: false,
        quotes: C_QUOTES,
        triple_quotes: true,
        verbatim_prefix: None,
        rust_rules: false,
        keywords: &["if", "elif", "for", "while", "except", "and", "or"],
        operators: &[],
        headers: &[r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\("],
    },
];

/// Words that can precede `(` without declaring a function
const NOT_FUNCTIONS: &[&str] = &[
    "if", "for", "foreach", "while", "switch", "catch", "return", "new", "else", "throw", "case",
    "do", "using", "lock", "await", "yield", "goto", "delete", "sizeof", "typeof", "function",
    "fixed", "when",
];

/// Syntax plus its compiled patterns
#[derive(Debug)]
pub struct CompiledLanguage {
    pub syntax: &'static LanguageSyntax,
    decisions: Option<Regex>,
    headers: Vec<Regex>,
    python_case: Option<Regex>,
}

static COMPILED: OnceLock<Vec<CompiledLanguage>> = OnceLock::new();

fn compile(syntax: &'static LanguageSyntax) -> CompiledLanguage {
    let mut alternatives: Vec<String> = syntax
        .keywords
        .iter()
        .map(|k| format!(r"\b{}\b", regex::escape(k)))
        .collect();
    alternatives.extend(syntax.operators.iter().map(|op| regex::escape(op)));
    let decisions = if alternatives.is_empty() {
        None
    } else {
        Regex::new(&alternatives.join("|")).ok()
    };
    let headers = syntax
        .headers
        .iter()
        .filter_map(|h| Regex::new(h).ok())
        .collect();
    let python_case = (syntax.style == BlockStyle::Indentation)
        .then(|| Regex::new(r"^\s*case\b.*:\s*$").ok())
        .flatten();
    CompiledLanguage {
        syntax,
        decisions,
        headers,
        python_case,
    }
}

/// Compiled language for an id
pub fn language(id: &str) -> Option<&'static CompiledLanguage> {
    COMPILED
        .get_or_init(|| LANGUAGES.iter().map(compile).collect())
        .iter()
        .find(|l| l.syntax.id == id)
}

pub fn syntax(id: &str) -> Option<&'static LanguageSyntax> {
    LANGUAGES.iter().find(|l| l.id == id)
}

pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|l| l.id)
}

impl CompiledLanguage {
    /// Decision points in a masked code fragment
    pub fn count_decisions(&self, fragment: &str) -> u32 {
        let mut count = 0;
        if let Some(re) = &self.decisions {
            for m in re.find_iter(fragment) {
                if self.syntax.rust_rules
                    && matches!(m.as_str(), "&&" | "||")
                    && !rust_operator_is_boolean(fragment, m.start())
                {
                    continue;
                }
                if self.syntax.rust_rules && m.as_str() == "=>" && is_wildcard_arm(fragment, m.start()) {
                    continue;
                }
                count += 1;
            }
        }
        if let Some(re) = &self.python_case {
            if re.is_match(fragment) && !is_python_wildcard_case(fragment) {
                count += 1;
            }
        }
        count
    }

    /// Functions declared on a masked line: (byte offset of the name, name)
    pub fn function_headers(&self, line: &str) -> Vec<(usize, String)> {
        let mut found: Vec<(usize, String)> = Vec::new();
        for re in &self.headers {
            for caps in re.captures_iter(line) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if NOT_FUNCTIONS.contains(&name.as_str()) {
                    continue;
                }
                let prefix = &line[whole.start()..name.start()];
                if prefix
                    .split(|c: char| !c.is_alphanumeric() && c != '_')
                    .any(|w| NOT_FUNCTIONS.contains(&w))
                {
                    continue;
                }
                if found.iter().any(|(pos, _)| *pos == name.start()) {
                    continue;
                }
                found.push((name.start(), name.as_str().to_string()));
            }
        }
        found.sort_by_key(|(pos, _)| *pos);
        found
    }
}

/// `_ =>` is the catch-all arm, like `default:` in a switch
fn is_wildcard_arm(fragment: &str, arrow: usize) -> bool {
    let before = fragment[..arrow].trim_end();
    let Some(rest) = before.strip_suffix('_') else {
        return false;
    };
    !rest
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// `case _:`
fn is_python_wildcard_case(fragment: &str) -> bool {
    fragment
        .trim()
        .strip_prefix("case")
        .and_then(|rest| rest.trim().strip_suffix(':'))
        .is_some_and(|pattern| pattern.trim() == "_")
}

/// `&&` doubles as a reference-of-reference and `||` as an empty closure in
/// Rust; they count only when they follow an operand.
fn rust_operator_is_boolean(fragment: &str, start: usize) -> bool {
    let before = fragment[..start].trim_end();
    if before.ends_with("move") {
        return false;
    }
    match before.chars().last() {
        Some(c) => c.is_alphanumeric() || matches!(c, '_' | ')' | ']' | '?' | '"' | '\'' | '}'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        for syntax in LANGUAGES {
            let compiled = language(syntax.id).unwrap();
            assert_eq!(compiled.headers.len(), syntax.headers.len(), "{}", syntax.id);
            assert!(compiled.decisions.is_some(), "{}", syntax.id);
        }
    }

    #[test]
    fn test_rust_operator_context() {
        let rust = language("rust").unwrap();
        assert_eq!(rust.count_decisions("if a && b || c {"), 3);
        assert_eq!(rust.count_decisions("let f = || x;"), 0);
        assert_eq!(rust.count_decisions("spawn(move || run())"), 0);
        assert_eq!(rust.count_decisions("fn f(x: &&str)"), 0);
        assert_eq!(rust.count_decisions("Some(x) => 1,"), 1);
    }

    #[test]
    fn test_catch_all_arms_are_not_decisions() {
        let rust = language("rust").unwrap();
        assert_eq!(rust.count_decisions(" 1 => a, 2 => b, _ => c "), 2);
        assert_eq!(rust.count_decisions("    _ => {}"), 0);
        assert_eq!(rust.count_decisions("    x_ => y,"), 1);
        assert_eq!(rust.count_decisions("    _ if ready => y,"), 1);

        let py = language("python").unwrap();
        assert_eq!(py.count_decisions("    case _:"), 0);
        assert_eq!(py.count_decisions("    case _x:"), 1);
    }

    #[test]
    fn test_keywords_need_word_boundaries() {
        let py = language("python").unwrap();
        assert_eq!(py.count_decisions("    if ready and not notify_all:"), 2);
        assert_eq!(py.count_decisions("    case Point(x=0):"), 1);
        let js = language("javascript").unwrap();
        assert_eq!(js.count_decisions("const verify = form || elseif;"), 1);
    }

    #[test]
    fn test_function_headers() {
        let java = language("java").unwrap();
        assert_eq!(
            java.function_headers("    public static int parse(String s) {"),
            vec![(22, "parse".to_string())]
        );
        assert!(java.function_headers("        return compute(x);").is_empty());
        assert!(java.function_headers("    } else if (x) {").is_empty());

        let c = language("c").unwrap();
        assert_eq!(c.function_headers("static int *lookup(const char *k)")[0].1, "lookup");

        let js = language("javascript").unwrap();
        let names: Vec<_> = js
            .function_headers("const handler = async (req, res) => {")
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["handler"]);
        assert!(js.function_headers("  if (a) {").is_empty());
    }
}
