//! Function boundary tracking over masked source.
//!
//! Brace languages keep a stack of open `{`; a `{` that follows a function
//! header (at the same parenthesis depth) opens that function's body.
//! Indentation languages keep a stack of `def` frames closed by dedent.
//! Decision points always go to the innermost open function, so a nested
//! named function is scored on its own while anonymous closures add to the
//! function whose body contains them.

use crate::complexity::languages::CompiledLanguage;
use crate::complexity::scanner::{MaskedSource, ScanAnomaly};
use crate::complexity::FunctionComplexity;

struct Pending {
    name: String,
    line: u32,
    paren_depth: i32,
    decisions: u32,
}

#[derive(Default)]
struct BraceState {
    functions: Vec<FunctionComplexity>,
    /// One entry per open `{`: the function it opened, if any
    stack: Vec<Option<usize>>,
    pending: Option<Pending>,
    paren_depth: i32,
}

impl BraceState {
    fn innermost(&self) -> Option<usize> {
        self.stack.iter().rev().find_map(|f| *f)
    }

    fn attribute(&mut self, decisions: u32) {
        if decisions == 0 {
            return;
        }
        if let Some(p) = self.pending.as_mut() {
            p.decisions += decisions;
        } else if let Some(i) = self.innermost() {
            self.functions[i].complexity += decisions;
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(p) = self.pending.take() {
            self.attribute(p.decisions);
        }
    }
}

/// Scan a masked brace-language file
pub fn scan_braces(
    masked: &str,
    language: &CompiledLanguage,
) -> Result<Vec<FunctionComplexity>, ScanAnomaly> {
    let mut state = BraceState::default();

    for (idx, line) in masked.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let mut headers = language.function_headers(line).into_iter().peekable();
        let mut seg_start = 0;

        for (pos, b) in line.bytes().enumerate() {
            while let Some((hpos, _)) = headers.peek() {
                if *hpos > pos {
                    break;
                }
                state.attribute(language.count_decisions(&line[seg_start..pos]));
                seg_start = pos;
                if let Some((_, name)) = headers.next() {
                    state.cancel_pending();
                    state.pending = Some(Pending {
                        name,
                        line: line_no,
                        paren_depth: state.paren_depth,
                        decisions: 0,
                    });
                }
            }

            match b {
                b'(' | b'[' => state.paren_depth += 1,
                b')' | b']' => state.paren_depth -= 1,
                b'{' | b'}' | b';' => {
                    state.attribute(language.count_decisions(&line[seg_start..pos]));
                    seg_start = pos + 1;
                    let at_header_depth = state
                        .pending
                        .as_ref()
                        .is_some_and(|p| p.paren_depth >= state.paren_depth);
                    match b {
                        b'{' if at_header_depth => {
                            if let Some(p) = state.pending.take() {
                                state.functions.push(FunctionComplexity {
                                    name: p.name,
                                    line: p.line,
                                    complexity: 1 + p.decisions,
                                });
                                state.stack.push(Some(state.functions.len() - 1));
                            }
                        }
                        b'{' => state.stack.push(None),
                        b'}' => {
                            if state.stack.pop().is_none() {
                                return Err(ScanAnomaly::new(line_no, "unbalanced '}'"));
                            }
                        }
                        _ if at_header_depth => state.cancel_pending(),
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        state.attribute(language.count_decisions(&line[seg_start..]));
    }

    if !state.stack.is_empty() {
        return Err(ScanAnomaly::new(
            masked.lines().count() as u32,
            format!("{} unclosed '{{' at end of file", state.stack.len()),
        ));
    }
    Ok(state.functions)
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

/// Scan a masked indentation-language file.
///
/// Lines that begin inside a multi-line string never open or close a
/// function, wherever their closing delimiter sits.
pub fn scan_indentation(
    masked: &MaskedSource,
    language: &CompiledLanguage,
) -> Result<Vec<FunctionComplexity>, ScanAnomaly> {
    let mut functions: Vec<FunctionComplexity> = Vec::new();
    // (indent of the def line, function index)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut bracket_depth: i32 = 0;
    let mut continued = false;

    for (idx, line) in masked.text.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let trimmed = line.trim();

        if !trimmed.is_empty() && bracket_depth == 0 && !continued && !masked.is_continued(line_no) {
            let indent = indent_width(line);
            while stack.last().is_some_and(|(i, _)| *i >= indent) {
                stack.pop();
            }
            if let Some((_, name)) = language.function_headers(line).into_iter().next() {
                functions.push(FunctionComplexity {
                    name,
                    line: line_no,
                    complexity: 1,
                });
                stack.push((indent, functions.len() - 1));
            }
        }

        let decisions = language.count_decisions(line);
        if let Some((_, i)) = stack.last() {
            functions[*i].complexity += decisions;
        }

        for b in line.bytes() {
            match b {
                b'(' | b'[' | b'{' => bracket_depth += 1,
                b')' | b']' | b'}' => bracket_depth -= 1,
                _ => {}
            }
        }
        if bracket_depth < 0 {
            return Err(ScanAnomaly::new(line_no, "unbalanced closing bracket"));
        }
        continued = trimmed.ends_with('\\');
    }

    if bracket_depth != 0 {
        return Err(ScanAnomaly::new(
            masked.text.lines().count() as u32,
            "unclosed bracket at end of file",
        ));
    }
    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::languages::language;
    use crate::complexity::scanner::mask_non_code;

    fn scan(lang: &str, src: &str) -> Vec<(String, u32, u32)> {
        let compiled = language(lang).unwrap();
        let masked = mask_non_code(src, compiled.syntax).unwrap();
        let result = match compiled.syntax.style {
            crate::complexity::languages::BlockStyle::Braces => scan_braces(&masked.text, compiled),
            crate::complexity::languages::BlockStyle::Indentation => {
                scan_indentation(&masked, compiled)
            }
        };
        result
            .unwrap()
            .into_iter()
            .map(|f| (f.name, f.line, f.complexity))
            .collect()
    }

    #[test]
    fn test_three_ifs_and_one_and() {
        let src = r#"
fn check(a: bool, b: bool, c: i32) -> i32 {
    if a && b {
        return 1;
    }
    if c > 3 {
        return 2;
    }
    if c < 0 {
        return 3;
    }
    0
}
"#;
        assert_eq!(scan("rust", src), vec![("check".to_string(), 2, 5)]);
    }

    #[test]
    fn test_no_decisions_is_one() {
        assert_eq!(
            scan("go", "package x\n\nfunc Plain() int {\n\treturn 1\n}\n"),
            vec![("Plain".to_string(), 3, 1)]
        );
    }

    #[test]
    fn test_nested_functions_are_independent() {
        let src = "function outer(a) {\n  function inner(b) {\n    if (b) { return 1; }\n    return 0;\n  }\n  if (a || !a) { return inner(a); }\n  return 2;\n}\n";
        assert_eq!(
            scan("javascript", src),
            vec![("outer".to_string(), 1, 3), ("inner".to_string(), 2, 2)]
        );
    }

    #[test]
    fn test_closures_count_toward_enclosing_function() {
        let src = "function run(items) {\n  items.forEach(function (x) {\n    if (x) { log(x); }\n  });\n  return items.filter(x => x && x.ok);\n}\n";
        assert_eq!(scan("javascript", src), vec![("run".to_string(), 1, 3)]);
    }

    #[test]
    fn test_declarations_without_body_are_ignored() {
        let src = "trait T {\n    fn a(&self) -> [u8; 4];\n    fn b(&self) -> bool {\n        self.x() || self.y()\n    }\n}\n";
        assert_eq!(scan("rust", src), vec![("b".to_string(), 3, 2)]);
    }

    #[test]
    fn test_java_methods_and_switch() {
        let src = r#"
public class Router {
    public String route(int code) {
        switch (code) {
            case 1: return "a";
            case 2: return "b";
            default: return "c";
        }
    }

    private boolean ok(String s) {
        try {
            return s != null && !s.isEmpty();
        } catch (Exception e) {
            return false;
        }
    }
}
"#;
        assert_eq!(
            scan("java", src),
            vec![("route".to_string(), 3, 3), ("ok".to_string(), 11, 3)]
        );
    }

    #[test]
    fn test_python_nested_defs_and_dedent() {
        let src = "def outer(x):\n    def inner(y):\n        if y and x:\n            return 1\n        return 0\n    for i in range(x):\n        pass\n    return inner(x)\n\ndef other():\n    return [\n        1,\n    ]\n";
        assert_eq!(
            scan("python", src),
            vec![
                ("outer".to_string(), 1, 2),
                ("inner".to_string(), 2, 3),
                ("other".to_string(), 10, 1),
            ]
        );
    }

    #[test]
    fn test_python_string_closing_at_column_zero() {
        let src = "def f(x):\n    q = \"\"\"\nSELECT 1\n\"\"\"\n    if x:\n        return 1\n    if x > 2:\n        return 2\n    return q\n";
        assert_eq!(scan("python", src), vec![("f".to_string(), 1, 3)]);
    }

    #[test]
    fn test_unbalanced_braces_are_anomalies() {
        let compiled = language("c").unwrap();
        assert!(scan_braces("int f() {\n  if (x) {\n", compiled).is_err());
        assert!(scan_braces("}\n", compiled).is_err());
    }
}
