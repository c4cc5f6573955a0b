//! Inline trace and exclude markers
//!
//! A trace marker is a `//` comment whose body starts with the marker literal
//! (`lobster-trace:` by default), e.g.
//!
//! ```text
//! void buyBanana(Basket<double>& basket) {
//!     // lobster-trace: fruits.Buy_Banana1, fruits.Buy_Banana2
//! }
//! ```
//!
//! The tags are whatever follows the marker on that one physical line. A
//! following comment line is never treated as a continuation.
//!
//! `// lobster-exclude: <justification>` marks code as deliberately untraced;
//! the rest of the line is kept as one justification string.
//!
//! Each marker also records the function it sits in, resolved from a
//! tree-sitter C++ parse of the file. Test bodies are located by the macro
//! scanner instead and name their enclosing symbol `Suite.Name`.

use crate::lexer::{CommentKind, Lexed};
use crate::macros::MacroInvocation;
use crate::text::SourceText;
use crate::vocabulary::Vocabulary;
use arborium::tree_sitter::{Node, Parser, Tree};

/// An inline trace marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMarker {
    /// Tags in written order (duplicates kept)
    pub tags: Vec<String>,
    /// Line of the comment (1-indexed)
    pub line: usize,
    /// Function the marker sits in; `None` at file scope.
    /// Markers inside a test body get `Suite.Name`.
    pub enclosing: Option<String>,
}

/// An inline exclude marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeMarker {
    /// Text after the marker, trimmed; may be empty
    pub justification: String,
    pub line: usize,
    pub enclosing: Option<String>,
}

/// Markers found in one file, each list in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerScan {
    pub traces: Vec<TraceMarker>,
    pub excludes: Vec<ExcludeMarker>,
}

impl MarkerScan {
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty() && self.excludes.is_empty()
    }
}

enum Found {
    Trace(Vec<String>),
    Exclude(String),
}

/// Scan all `//` comments of a file for trace and exclude markers.
///
/// `tests` are the test macro invocations of the same file.
pub fn scan_markers(
    text: &SourceText<'_>,
    lexed: &Lexed,
    tests: &[MacroInvocation],
    vocab: &Vocabulary,
) -> MarkerScan {
    let source = text.as_str();
    let found: Vec<(usize, usize, Found)> = lexed
        .comments
        .iter()
        .filter(|c| c.kind == CommentKind::Line)
        .filter_map(|c| {
            let body = c.body(source);
            if let Some(rest) = marker_rest(body, vocab.trace_marker()) {
                Some((c.start, c.line, Found::Trace(split_tags(rest))))
            } else {
                marker_rest(body, vocab.exclude_marker())
                    .map(|rest| (c.start, c.line, Found::Exclude(rest.trim().to_string())))
            }
        })
        .collect();

    let mut scan = MarkerScan::default();
    if found.is_empty() {
        return scan;
    }

    let tree = parse_cpp(source);
    for (offset, line, found) in found {
        let enclosing = enclosing_symbol(source, tree.as_ref(), tests, offset);
        match found {
            Found::Trace(tags) => scan.traces.push(TraceMarker {
                tags,
                line,
                enclosing,
            }),
            Found::Exclude(justification) => scan.excludes.push(ExcludeMarker {
                justification,
                line,
                enclosing,
            }),
        }
    }
    scan
}

/// Text after `marker` if the comment body starts with it
fn marker_rest<'a>(body: &'a str, marker: &str) -> Option<&'a str> {
    let body = body
        .strip_prefix('/')
        .or_else(|| body.strip_prefix('!'))
        .unwrap_or(body);
    body.trim().strip_prefix(marker)
}

fn split_tags(rest: &str) -> Vec<String> {
    rest.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_cpp(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&arborium_cpp::language().into()) {
        tracing::warn!("C++ grammar failed to load, markers get no enclosing symbol: {e:?}");
        return None;
    }
    parser.parse(source, None)
}

/// Innermost of the enclosing function definition and enclosing test body
fn enclosing_symbol(
    source: &str,
    tree: Option<&Tree>,
    tests: &[MacroInvocation],
    offset: usize,
) -> Option<String> {
    let function = tree.and_then(|tree| enclosing_function(source, tree.root_node(), offset));
    let test = tests
        .iter()
        .filter_map(|inv| {
            let (open, close) = inv.body?;
            (open < offset && offset < close)
                .then(|| (open, format!("{}.{}", inv.suite, inv.name)))
        })
        .max_by_key(|(start, _)| *start);

    match (function, test) {
        (Some((fn_start, name)), Some((test_start, _))) if fn_start > test_start => Some(name),
        (_, Some((_, name))) => Some(name),
        (function, None) => function.map(|(_, name)| name),
    }
}

/// Start offset and name of the innermost `function_definition` around `offset`
fn enclosing_function(source: &str, root: Node, offset: usize) -> Option<(usize, String)> {
    let mut node = root.descendant_for_byte_range(offset, offset + 1)?;
    loop {
        if node.kind() == "function_definition"
            && let Some(name) = function_name(source, node)
        {
            return Some((node.start_byte(), name));
        }
        node = node.parent()?;
    }
}

fn function_name(source: &str, node: Node) -> Option<String> {
    let name = node
        .child_by_field_name("declarator")
        .and_then(find_declarator_name)?;
    let text = &source[name.byte_range()];
    // `operator bool() const` carries its parameter list inside the name node
    let text = if ends_in_operator_cast(name) {
        text.split('(').next().unwrap_or(text)
    } else {
        text
    };
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Unwrap the declarator chain of a function definition down to its name:
/// `function_definition` -> `reference_declarator` -> `function_declarator`
/// -> `qualified_identifier`
fn find_declarator_name(node: Node) -> Option<Node> {
    match node.kind() {
        "identifier"
        | "field_identifier"
        | "qualified_identifier"
        | "operator_name"
        | "destructor_name"
        | "template_function"
        | "operator_cast" => Some(node),
        "function_declarator"
        | "pointer_declarator"
        | "parenthesized_declarator"
        | "reference_declarator" => node
            .child_by_field_name("declarator")
            // `&` declarators carry their inner declarator unlabelled
            .or_else(|| node.named_child(0))
            .and_then(find_declarator_name),
        _ => None,
    }
}

fn ends_in_operator_cast(node: Node) -> bool {
    match node.kind() {
        "operator_cast" => true,
        "qualified_identifier" => node
            .child_by_field_name("name")
            .is_some_and(ends_in_operator_cast),
        _ => false,
    }
}
