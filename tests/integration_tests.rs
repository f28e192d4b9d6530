//! End-to-end tests: source units in, class files out, read back with the
//! disassembler.

use latte::bytecode::{CodeDump, Opcode, Operand};
use latte::{
    Bump, ClassDump, CompilerConfig, Diagnostics, ErrorCode, ScannerMode, compile_sources, compile_sources_with,
    disassemble, scan,
};
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn compile(units: &[(&str, &str)]) -> Vec<ClassDump> {
    let classes = compile_sources(units).unwrap_or_else(|d| panic!("compilation failed:\n{}", render(&d)));
    classes.iter().map(|c| disassemble(&c.bytes).unwrap()).collect()
}

fn compile_unit(source: &str) -> Vec<ClassDump> {
    compile(&[("Test.lt", source)])
}

fn class<'a>(classes: &'a [ClassDump], name: &str) -> &'a ClassDump {
    classes
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no class {name}"))
}

fn code<'a>(class: &'a ClassDump, method: &str) -> &'a CodeDump {
    class.method(method).and_then(|m| m.code.as_ref()).unwrap()
}

fn render(diagnostics: &Diagnostics) -> String {
    let mut out = Vec::new();
    diagnostics.emit(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn member_names(code: &CodeDump) -> Vec<String> {
    code.invocations()
        .filter_map(|i| i.member())
        .map(|(_, name, _)| name.to_string())
        .collect()
}

// ============================================================================
// Layout scanner
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Line(&'static str),
    Block(&'static str, Vec<Node>),
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        Just("x = 1"),
        Just("y = x + 2 * 3"),
        Just("return x"),
        Just("System.out.println(\"hi\")"),
        Just("z = [1, 2]"),
        Just("f = (a) -> a"),
    ]
    .prop_map(Node::Line);
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop_oneof![Just("if x > 1"), Just("while y < 10"), Just("def g(a, b)"), Just("synchronized(a)")],
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(header, children)| Node::Block(header, children))
    })
}

fn indented(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        let pad = "    ".repeat(depth);
        match node {
            Node::Line(text) => out.push_str(&format!("{pad}{text}\n")),
            Node::Block(header, children) => {
                out.push_str(&format!("{pad}{header}\n"));
                indented(children, depth + 1, out);
            }
        }
    }
}

fn braced(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        let pad = "  ".repeat(depth);
        match node {
            Node::Line(text) => out.push_str(&format!("{pad}{text}\n")),
            Node::Block(header, children) => {
                out.push_str(&format!("{pad}{header} {{\n"));
                braced(children, depth + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
        }
    }
}

proptest! {
    #[test]
    fn both_syntaxes_scan_to_the_same_tree(body in prop::collection::vec(node(), 1..5)) {
        let program = vec![Node::Block("class A", vec![Node::Block("def f(a)", body)])];
        let mut indent_src = String::new();
        indented(&program, 0, &mut indent_src);
        let mut brace_src = String::new();
        braced(&program, 0, &mut brace_src);

        let arena = Bump::new();
        let indent = scan(&indent_src, ScannerMode::Indentation, &arena).unwrap();
        let brace = scan(&brace_src, ScannerMode::Brace, &arena).unwrap();
        prop_assert!(
            indent.equals_ignore_layout(&brace),
            "\nindent: {}\nbrace:  {}",
            indent,
            brace
        );
    }
}

#[test]
fn map_literal_layouts_are_equivalent() {
    let arena = Bump::new();
    let one_per_line = scan(
        "m = [\n    \"a\": 1\n    \"b\": 2\n    \"c\": 3\n    \"d\": 4\n]",
        ScannerMode::Indentation,
        &arena,
    )
    .unwrap();
    let commas = scan("m = [\"a\": 1, \"b\": 2,\n    \"c\": 3, \"d\": 4]", ScannerMode::Indentation, &arena).unwrap();
    assert!(one_per_line.equals_ignore_layout(&commas), "{one_per_line}\n{commas}");
}

#[test]
fn both_syntaxes_compile_to_the_same_bytes() {
    let indent = "class A\n  def f(x:int):int\n    if x > 1\n      return x * 2\n    return 0\n";
    let brace = "/// :scanner-brace\nclass A {\n  def f(x:int):int {\n    if x > 1 {\n      return x * 2\n    }\n    return 0\n  }\n}\n";
    let a = compile_sources(&[("A.lt", indent)]).unwrap();
    let b = compile_sources(&[("A.lt", brace)]).unwrap();
    assert_eq!(a.get("A"), b.get("A"));
}

#[test]
fn default_mode_is_configurable() {
    let config = CompilerConfig::new().with_default_mode(ScannerMode::Brace);
    let classes = compile_sources_with(config, &[("A.lt", "class A {\n  def f():int {\n    return 1\n  }\n}\n")]);
    assert!(classes.is_ok());
}

#[test]
fn misplaced_directives_fail_the_batch_when_warnings_are_fatal() {
    let units = [("A.lt", "class A\n/// :scanner-brace\n")];

    let classes = compile_sources(&units).unwrap();
    assert_eq!(classes.warnings().warnings().count(), 1);

    let config = CompilerConfig::new().with_warnings_fatal(true);
    let diagnostics = compile_sources_with(config, &units).unwrap_err();
    assert_eq!(diagnostics.error_count(), 0);
    let warning = diagnostics.warnings().next().unwrap();
    assert_eq!(warning.code, ErrorCode::Syntax);
    assert!(render(&diagnostics).contains("A.lt:2:1"));
}

// ============================================================================
// Imports and names
// ============================================================================

const THINGS: [(&str, &str); 2] = [
    ("p1/Thing.lt", "package p1\nclass Thing\n"),
    ("p2/Thing.lt", "package p2\nclass Thing\n"),
];

#[test]
fn static_wildcard_import_exposes_members() {
    let classes = compile_unit("import java::lang::Math::_\nclass A\n  def f(x:int):int = abs(x)\n");
    let f = code(&classes[0], "f");
    let call = f.invocations().next().unwrap();
    assert_eq!(call.opcode, Opcode::Invokestatic);
    assert_eq!(call.member(), Some(("java/lang/Math", "abs", "(I)I")));
}

#[test]
fn exact_import_beats_package_wildcard() {
    let main = ("Main.lt", "import p1::_\nimport p2::Thing\nclass Main\n  def f():Object = Thing()\n");
    let classes = compile(&[THINGS[0], THINGS[1], main]);
    let f = code(class(&classes, "Main"), "f");
    let new = f.instructions.iter().find(|i| i.opcode == Opcode::New).unwrap();
    assert_eq!(new.operand, Operand::Class("p2/Thing".into()));
}

#[test]
fn package_wildcard_beats_same_package() {
    let mine = ("mine/Thing.lt", "package mine\nclass Thing\n");
    let main = (
        "mine/Main.lt",
        "package mine\nimport p1::_\nclass Main\n  def f():Object = Thing()\n",
    );
    let classes = compile(&[THINGS[0], mine, main]);
    let f = code(class(&classes, "mine/Main"), "f");
    let new = f.instructions.iter().find(|i| i.opcode == Opcode::New).unwrap();
    assert_eq!(new.operand, Operand::Class("p1/Thing".into()));
}

#[test]
fn two_package_wildcards_are_ambiguous() {
    let main = ("Main.lt", "import p1::_\nimport p2::_\nclass Main\n  def f():Object = Thing()\n");
    let diagnostics = compile_sources(&[THINGS[0], THINGS[1], main]).unwrap_err();
    let ambiguous: Vec<_> = diagnostics.with_code(ErrorCode::AmbiguousSymbol).collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].unit.as_deref(), Some("Main.lt"));
    assert_eq!(ambiguous[0].line, 4);
}

#[test]
fn dotted_and_scoped_paths_name_the_same_type() {
    let main = (
        "Main.lt",
        "class Main\n  def f(t:p1.Thing):p1::Thing = t\n  def g(t:p1::Thing):p1.Thing = t\n",
    );
    let classes = compile(&[THINGS[0], main]);
    let main = class(&classes, "Main");
    assert_eq!(main.method("f").unwrap().descriptor, "(Lp1/Thing;)Lp1/Thing;");
    assert_eq!(main.method("f").unwrap().descriptor, main.method("g").unwrap().descriptor);
}

#[test]
fn unresolved_names_are_reported_with_their_position() {
    let diagnostics = compile_sources(&[("A.lt", "class A\n  def f() = Nowhere()\n")]).unwrap_err();
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::UnresolvedSymbol);
    assert_eq!(error.line, 2);
    assert!(error.message.contains("Nowhere"));
}

// ============================================================================
// Primitive specialization
// ============================================================================

#[test]
fn primitive_descriptors_round_trip() {
    let classes = compile_unit("class A\n  def f_short(s:short):short = s\n");
    let method = classes[0].method("f_short").unwrap();
    assert_eq!(method.descriptor, "(S)S");
    let code = method.code.as_ref().unwrap();
    assert_eq!(code.opcodes().collect::<Vec<_>>(), vec![Opcode::Iload1, Opcode::Ireturn]);
}

#[test]
fn pure_primitive_methods_never_box() {
    let source = "class A\n  def a(x:int):int = x + 1\n  def b(x:long, y:int):long = x * y\n  def c(x:double):bool = x > 0.5\n  def d(x:byte, y:char):int = x + y\n  def e(x:float):double = x / 2\n";
    let classes = compile_unit(source);
    assert_eq!(classes.len(), 1);
    let methods: Vec<_> = classes[0].methods.iter().filter(|m| !m.name.starts_with('<')).collect();
    assert_eq!(methods.len(), 5);
    for method in methods {
        let code = method.code.as_ref().unwrap();
        assert_eq!(code.invocations().count(), 0, "{} calls something", method.name);
    }
}

#[test]
fn one_synthetic_per_inner_function_and_lambda() {
    let source = "class A\n  def f(k:int):int\n    def g(x:int):int = x + k\n    def h():int = 2\n    r = () -> k\n    s = () -> k + 1\n    return g(1)\n";
    let classes = compile_unit(source);
    let a = class(&classes, "A");
    let inner: Vec<_> = a.methods.iter().filter(|m| m.name.contains("$Latte$Inner$")).collect();
    assert_eq!(inner.len(), 2);
    assert!(inner.iter().all(|m| m.is_static()));
    let lambdas: Vec<_> = classes.iter().filter(|c| c.name.contains("$Latte$Lambda$")).collect();
    assert_eq!(lambdas.len(), 2);
}

// ============================================================================
// Lambda shapes
// ============================================================================

/// `interface <name>` with one method, and a method of `Shapes` returning
/// a lambda for it.
struct Shape {
    interface: &'static str,
    method: &'static str,
    descriptor: &'static str,
    lambda: &'static str,
}

const PRIMITIVES: [(&str, &str); 8] = [
    ("bool", "Z"),
    ("byte", "B"),
    ("char", "C"),
    ("short", "S"),
    ("int", "I"),
    ("long", "J"),
    ("float", "F"),
    ("double", "D"),
];

fn shapes() -> Vec<Shape> {
    let mut shapes = vec![
        Shape {
            interface: "Runnable",
            method: "run",
            descriptor: "()V",
            lambda: "() -> base",
        },
        Shape {
            interface: "java::util::function::Supplier",
            method: "get",
            descriptor: "()Ljava/lang/Object;",
            lambda: "() -> base",
        },
        Shape {
            interface: "java::util::concurrent::Callable",
            method: "call",
            descriptor: "()Ljava/lang/Object;",
            lambda: "() -> \"s\"",
        },
        Shape {
            interface: "java::util::function::IntUnaryOperator",
            method: "applyAsInt",
            descriptor: "(I)I",
            lambda: "(x) -> x + base",
        },
        Shape {
            interface: "java::util::function::ToIntFunction",
            method: "applyAsInt",
            descriptor: "(Ljava/lang/Object;)I",
            lambda: "(x) -> base",
        },
        Shape {
            interface: "MakeString",
            method: "make",
            descriptor: "()Ljava/lang/String;",
            lambda: "() -> \"s\"",
        },
    ];
    for (i, _) in PRIMITIVES.iter().enumerate() {
        shapes.push(Shape {
            interface: ["RetZ", "RetB", "RetC", "RetS", "RetI", "RetJ", "RetF", "RetD"][i],
            method: "get",
            descriptor: ["()Z", "()B", "()C", "()S", "()I", "()J", "()F", "()D"][i],
            lambda: "() -> base",
        });
        shapes.push(Shape {
            interface: ["ArgZ", "ArgB", "ArgC", "ArgS", "ArgI", "ArgJ", "ArgF", "ArgD"][i],
            method: "take",
            descriptor: ["(Z)V", "(B)V", "(C)V", "(S)V", "(I)V", "(J)V", "(F)V", "(D)V"][i],
            lambda: "(x) -> System.out.println(x)",
        });
    }
    shapes
}

fn shapes_source(shapes: &[Shape]) -> String {
    let mut source = String::new();
    for (kind, letter) in PRIMITIVES {
        source.push_str(&format!("interface Ret{letter}\n  def get():{kind}\n"));
        source.push_str(&format!("interface Arg{letter}\n  def take(x:{kind}):Unit\n"));
    }
    source.push_str("interface MakeString\n  def make():String\n");
    source.push_str("class Shapes(base:int)\n");
    for (i, shape) in shapes.iter().enumerate() {
        source.push_str(&format!("  def s{i}():{} = {}\n", shape.interface, shape.lambda));
    }
    source
}

#[test]
fn every_lambda_shape_gets_an_exact_adapter() {
    let shapes = shapes();
    assert!(shapes.len() >= 18);
    let classes = compile_unit(&shapes_source(&shapes));
    let owner = class(&classes, "Shapes");

    for (i, shape) in shapes.iter().enumerate() {
        // The factory method builds the i-th lambda class.
        let factory = code(owner, &format!("s{i}"));
        let lambda_name = factory
            .instructions
            .iter()
            .find_map(|ins| match (&ins.opcode, &ins.operand) {
                (Opcode::New, Operand::Class(name)) => Some(name.clone()),
                _ => None,
            })
            .unwrap();
        let lambda = class(&classes, &lambda_name);
        let target = lambda.method(shape.method).unwrap_or_else(|| panic!("{lambda_name} lacks {}", shape.method));
        assert_eq!(target.descriptor, shape.descriptor, "shape {}", shape.interface);

        let adapter = target.code.as_ref().unwrap();
        let calls = member_names(adapter);
        let primitive_param = shape.descriptor.as_bytes()[1] != b')' && shape.descriptor.as_bytes()[1] != b'L';
        if primitive_param {
            assert_eq!(calls[0], "valueOf", "shape {}", shape.interface);
        }
        assert!(calls.iter().any(|c| c == "lambda$body"));
        let ret = shape.descriptor.rsplit(')').next().unwrap();
        match ret {
            "V" => assert_eq!(adapter.count(Opcode::Pop), 1),
            "Ljava/lang/Object;" => assert_eq!(adapter.count(Opcode::Checkcast), 0),
            r if r.starts_with('L') => assert_eq!(adapter.count(Opcode::Checkcast), 1),
            _ => assert!(calls.last().unwrap().starts_with("castTo"), "shape {}", shape.interface),
        }
    }
}

#[test]
fn lambdas_see_the_enclosing_instance_as_self() {
    let classes = compile_unit("class A(base:int)\n  def f():Runnable = () -> base\n");
    let lambda = class(&classes, "A$Latte$Lambda$0");
    assert_eq!(lambda.field("self").unwrap().descriptor, "LA;");
    let body = code(lambda, "lambda$body");
    let fields: Vec<_> = body
        .instructions
        .iter()
        .filter(|i| i.opcode == Opcode::Getfield)
        .filter_map(|i| i.member())
        .map(|(owner, name, _)| (owner.to_string(), name.to_string()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("A$Latte$Lambda$0".to_string(), "self".to_string()),
            ("A".to_string(), "base".to_string())
        ]
    );
}

#[test]
fn lambdas_extend_abstract_classes_with_a_default_constructor() {
    let source = "abstract class Task\n  abstract def run():int\nclass A\n  def f():Task = () -> 7\n";
    let classes = compile_unit(source);
    let lambda = class(&classes, "A$Latte$Lambda$0");
    assert_eq!(lambda.super_name.as_deref(), Some("Task"));
    assert!(lambda.interfaces.is_empty());
    assert_eq!(lambda.method("run").unwrap().descriptor, "()I");
}

#[test]
fn lambda_arity_mismatch_is_a_codegen_error() {
    let diagnostics = compile_sources(&[("A.lt", "class A\n  def f():Runnable = (a, b) -> a\n")]).unwrap_err();
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::CodeGen);
    assert!(error.message.contains("takes 2 parameter"));
}

// ============================================================================
// synchronized
// ============================================================================

const TWO_LOCKS: &str = "class A\n  def f(a, b):int\n    synchronized(a, b)\n      return 1\n";

#[test]
fn synchronized_acquires_in_order_and_releases_before_return() {
    let classes = compile_unit(TWO_LOCKS);
    let f = code(&classes[0], "f");
    let ops: Vec<Opcode> = f.opcodes().collect();
    let enters: Vec<usize> = positions(&ops, Opcode::Monitorenter);
    let exits: Vec<usize> = positions(&ops, Opcode::Monitorexit);
    let ret = positions(&ops, Opcode::Ireturn)[0];
    assert_eq!(enters.len(), 2);
    // Return path plus one per handler.
    assert_eq!(exits.len(), 4);
    assert!(exits[0] < ret && exits[1] < ret);
    assert!(exits[2] > ret && exits[3] > ret);
}

fn positions(ops: &[Opcode], op: Opcode) -> Vec<usize> {
    ops.iter().enumerate().filter(|(_, o)| **o == op).map(|(i, _)| i).collect()
}

#[test]
fn a_throw_mid_block_releases_every_held_lock() {
    let classes = compile_unit("class A\n  def f(a, b)\n    synchronized(a, b)\n      throw RuntimeException()\n");
    let f = code(&classes[0], "f");
    let throw_site = f
        .instructions
        .iter()
        .find(|i| i.member().is_some_and(|m| m.0 == "java/lang/RuntimeException"))
        .unwrap()
        .offset;
    // Both regions protect the body.
    let covering: Vec<_> = f.exception_table.iter().filter(|e| e.covers(throw_site)).collect();
    assert_eq!(covering.len(), 2);
    // Each handler rethrows after one monitorexit.
    for entry in covering {
        let handler: Vec<Opcode> = f
            .instructions
            .iter()
            .skip_while(|i| i.offset != entry.handler_pc)
            .take(5)
            .map(|i| i.opcode)
            .collect();
        assert_eq!(handler[2], Opcode::Monitorexit);
        assert_eq!(handler[4], Opcode::Athrow);
    }
}

#[test]
fn partial_acquisition_releases_only_taken_locks() {
    let classes = compile_unit("class A\n  def g():Object = Object()\n  def f(a)\n    synchronized(a, g())\n      System.out.println(1)\n");
    let f = code(&classes[0], "f");
    let second_lock = f
        .invocations()
        .find(|i| i.member().is_some_and(|m| m.1 == "g"))
        .unwrap()
        .offset;
    // Evaluating the second lock is protected by the first lock's handler
    // only.
    let covering = f.exception_table.iter().filter(|e| e.covers(second_lock)).count();
    assert_eq!(covering, 1);
}

#[test]
fn locking_a_primitive_is_rejected() {
    let diagnostics = compile_sources(&[("A.lt", "class A\n  def f(x:int)\n    synchronized(x)\n      x = 1\n")]).unwrap_err();
    assert!(diagnostics.errors().any(|d| d.message.contains("cannot lock")));
}

// ============================================================================
// for and try
// ============================================================================

#[test]
fn for_and_try_read_the_same_in_both_syntaxes() {
    let indent = "class A\n  def f(xs:[]int):int\n    total = 0\n    for x in xs\n      try\n        total = total + x\n      catch e\n        return 0\n      finally\n        System.out.println(x)\n    return total\n";
    let brace = "/// :scanner-brace\nclass A {\n  def f(xs:[]int):int {\n    total = 0\n    for x in xs {\n      try {\n        total = total + x\n      }\n      catch e {\n        return 0\n      }\n      finally {\n        System.out.println(x)\n      }\n    }\n    return total\n  }\n}\n";
    let a = compile_sources(&[("A.lt", indent)]).unwrap();
    let b = compile_sources(&[("A.lt", brace)]).unwrap();
    assert_eq!(a.get("A"), b.get("A"));
}

#[test]
fn finally_runs_after_held_locks_are_released() {
    let source = "class A\n  def f(a, b):int\n    try\n      synchronized(a, b)\n        return 1\n    finally\n      System.out.println(2)\n";
    let classes = compile_unit(source);
    let f = code(&classes[0], "f");
    let ops: Vec<Opcode> = f.opcodes().collect();
    let exits = positions(&ops, Opcode::Monitorexit);
    let ret = positions(&ops, Opcode::Ireturn)[0];
    let printed = f
        .instructions
        .iter()
        .position(|i| i.member().is_some_and(|m| m.1 == "println"))
        .unwrap();
    // Both monitors come off, inner first, then the finally body, then the
    // return.
    assert!(exits[0] < exits[1] && exits[1] < printed && printed < ret);
    // The copy on the return path is covered by no handler.
    let printed_at = f.instructions[printed].offset;
    assert!(f.exception_table.iter().all(|e| !e.covers(printed_at)));
}

#[test]
fn catch_without_try_is_a_syntax_error() {
    let diagnostics = compile_sources(&[("A.lt", "class A\n  def f()\n    catch e\n      ...\n")]).unwrap_err();
    assert_eq!(diagnostics.errors().next().unwrap().code, ErrorCode::Syntax);
}

// ============================================================================
// Diagnostics and batches
// ============================================================================

#[test]
fn impossible_conversions_are_reported() {
    let diagnostics = compile_sources(&[("A.lt", "class A\n  def f(b:bool):int = b\n")]).unwrap_err();
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::CodeGen);
    assert_eq!(error.unit.as_deref(), Some("A.lt"));
}

#[test]
fn string_constants_past_the_class_file_limit_are_reported() {
    let source = format!("class Big\n  def f():String = \"{}\"\n", "a".repeat(70_000));
    let diagnostics = compile_sources(&[("Big.lt", source.as_str())]).unwrap_err();
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::CodeGen);
    assert!(error.message.contains("65535"), "{}", error.message);

    let fits = format!("class Big\n  def f():String = \"{}\"\n", "a".repeat(60_000));
    let classes = compile_unit(&fits);
    assert_eq!(classes[0].name, "Big");
}

#[test]
fn sibling_units_are_still_checked_after_a_failure() {
    let diagnostics = compile_sources(&[
        ("bad.lt", "class Bad\n  def f() = Missing()\n"),
        ("worse.lt", "class Worse\n  def f():int = true\n"),
    ])
    .unwrap_err();
    assert_eq!(diagnostics.error_count(), 2);
    let rendered = render(&diagnostics);
    assert!(rendered.contains("bad.lt:2:"));
    assert!(rendered.contains("worse.lt:2:"));
}

#[test]
fn classes_carry_their_source_file_unless_disabled() {
    let classes = compile_unit("class A\n");
    assert_eq!(classes[0].source_file.as_deref(), Some("Test.lt"));
    assert_eq!(classes[0].major_version, 49);

    let config = CompilerConfig::new().with_source_file_attribute(false);
    let bytes = compile_sources_with(config, &[("Test.lt", "class A\n")]).unwrap();
    let dump = disassemble(bytes.get("A").unwrap()).unwrap();
    assert_eq!(dump.source_file, None);
}
