//! Property test: any program rendered in both surface syntaxes scans to
//! the same element tree.

use bumpalo::Bump;
use latte_core::ScannerMode;
use latte_scanner::scan;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Node {
    Simple(Vec<String>),
    Call(String, Vec<String>),
    Block(Vec<String>, Vec<Node>),
}

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        prop::collection::vec(word(), 1..4).prop_map(Node::Simple),
        (word(), prop::collection::vec(word(), 0..4)).prop_map(|(f, args)| Node::Call(f, args)),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        (prop::collection::vec(word(), 1..3), prop::collection::vec(inner, 1..4))
            .prop_map(|(header, body)| Node::Block(header, body))
    })
}

fn render_line(node: &Node) -> String {
    match node {
        Node::Simple(words) => words.join(" "),
        Node::Call(f, args) => format!("{f}({})", args.join(", ")),
        Node::Block(header, _) => header.join(" "),
    }
}

fn render_brace(nodes: &[Node], out: &mut String) {
    for node in nodes {
        out.push_str(&render_line(node));
        if let Node::Block(_, body) = node {
            out.push_str(" {\n");
            render_brace(body, out);
            out.push('}');
        }
        out.push('\n');
    }
}

fn render_indent(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        out.push_str(&"    ".repeat(depth));
        out.push_str(&render_line(node));
        out.push('\n');
        if let Node::Block(_, body) = node {
            render_indent(body, depth + 1, out);
        }
    }
}

proptest! {
    #[test]
    fn brace_and_indent_layouts_scan_identically(program in prop::collection::vec(node(), 1..5)) {
        let mut brace = String::new();
        render_brace(&program, &mut brace);
        let mut indent = String::new();
        render_indent(&program, 0, &mut indent);

        let arena = Bump::new();
        let a = scan(&brace, ScannerMode::Brace, &arena).unwrap();
        let b = scan(&indent, ScannerMode::Indentation, &arena).unwrap();
        prop_assert!(a.equals_ignore_layout(&b), "\nbrace:  {a}\nindent: {b}");
    }

    #[test]
    fn semicolons_match_newlines(words in prop::collection::vec(prop::collection::vec(word(), 1..3), 1..6)) {
        let lines: Vec<String> = words.iter().map(|w| w.join(" ")).collect();
        let arena = Bump::new();
        let joined = scan(&lines.join("; "), ScannerMode::Brace, &arena).unwrap();
        let split = scan(&lines.join("\n"), ScannerMode::Brace, &arena).unwrap();
        prop_assert_eq!(joined, split);
    }
}
