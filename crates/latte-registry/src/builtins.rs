//! JDK and runtime classes known without reading class files.
//!
//! Only the members the compiler binds statically are listed. Anything else
//! is reached through the `lt.runtime.Dynamic` helpers at run time.

use latte_core::{DescriptorError, JvmType, MethodDescriptor, PrimitiveKind, QualifiedName};

use crate::{AccessFlags, ClassEntry, ClassRegistry, FieldEntry, MethodEntry};

/// Register every built-in class. Classes already present are kept.
pub fn register_builtins(registry: &mut ClassRegistry) {
    let classes = match builtin_classes() {
        Ok(classes) => classes,
        Err(error) => {
            tracing::error!(%error, "malformed built-in descriptor");
            return;
        }
    };
    let count = classes.len();
    for entry in classes {
        if let Err(error) = registry.register(entry) {
            tracing::debug!(%error, "skipped built-in");
        }
    }
    tracing::debug!(count, "registered built-in classes");
}

// ============================================================================
// Member helpers
// ============================================================================

fn name(path: &str) -> QualifiedName {
    QualifiedName::parse(path)
}

fn class(path: &str) -> ClassEntry {
    ClassEntry::class(name(path))
}

fn interface(path: &str) -> ClassEntry {
    ClassEntry::interface(name(path))
}

fn method(method: &str, desc: &str, access: AccessFlags) -> Result<MethodEntry, DescriptorError> {
    Ok(MethodEntry::new(method, MethodDescriptor::parse(desc)?, access))
}

fn virt(name: &str, desc: &str) -> Result<MethodEntry, DescriptorError> {
    method(name, desc, AccessFlags::PUBLIC)
}

fn stat(name: &str, desc: &str) -> Result<MethodEntry, DescriptorError> {
    method(name, desc, AccessFlags::PUBLIC | AccessFlags::STATIC)
}

fn abs(name: &str, desc: &str) -> Result<MethodEntry, DescriptorError> {
    method(name, desc, AccessFlags::PUBLIC | AccessFlags::ABSTRACT)
}

fn ctor(desc: &str) -> Result<MethodEntry, DescriptorError> {
    method("<init>", desc, AccessFlags::PUBLIC)
}

fn static_field(name: &str, desc: &str) -> Result<FieldEntry, DescriptorError> {
    Ok(FieldEntry::new(
        name,
        JvmType::parse_field(desc)?,
        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
    ))
}

fn with_methods(
    mut entry: ClassEntry,
    methods: impl IntoIterator<Item = Result<MethodEntry, DescriptorError>>,
) -> Result<ClassEntry, DescriptorError> {
    for m in methods {
        entry = entry.with_method(m?);
    }
    Ok(entry)
}

/// A functional interface with one abstract method.
fn functional(path: &str, sam: &str, desc: &str) -> Result<ClassEntry, DescriptorError> {
    with_methods(interface(path), [abs(sam, desc)])
}

/// `Throwable` subclasses with the two usual constructors.
fn throwable(path: &str, parent: &str) -> Result<ClassEntry, DescriptorError> {
    with_methods(
        class(path).with_super(Some(name(parent))),
        [ctor("()V"), ctor("(Ljava/lang/String;)V")],
    )
}

// ============================================================================
// Class tables
// ============================================================================

pub(crate) fn builtin_classes() -> Result<Vec<ClassEntry>, DescriptorError> {
    let mut classes = Vec::new();
    java_lang(&mut classes)?;
    boxes(&mut classes)?;
    java_io(&mut classes)?;
    java_util(&mut classes)?;
    java_util_function(&mut classes)?;
    latte_runtime(&mut classes)?;
    Ok(classes)
}

fn java_lang(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    out.push(with_methods(
        class("java.lang.Object").with_super(None),
        [
            ctor("()V"),
            virt("toString", "()Ljava/lang/String;"),
            virt("equals", "(Ljava/lang/Object;)Z"),
            virt("hashCode", "()I"),
            virt("getClass", "()Ljava/lang/Class;"),
            virt("notify", "()V"),
            virt("notifyAll", "()V"),
            virt("wait", "()V"),
        ],
    )?);
    out.push(with_methods(
        class("java.lang.Class"),
        [virt("getName", "()Ljava/lang/String;"), virt("getSimpleName", "()Ljava/lang/String;")],
    )?);
    out.push(functional("java.lang.Runnable", "run", "()V")?);
    out.push(functional("java.lang.Comparable", "compareTo", "(Ljava/lang/Object;)I")?);
    out.push(functional("java.lang.Iterable", "iterator", "()Ljava/util/Iterator;")?);
    out.push(with_methods(
        interface("java.lang.CharSequence"),
        [abs("length", "()I"), abs("charAt", "(I)C")],
    )?);
    out.push(functional("java.lang.AutoCloseable", "close", "()V")?);

    let mut string = with_methods(
        class("java.lang.String")
            .with_access(AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SUPER)
            .with_interface(name("java.io.Serializable"))
            .with_interface(name("java.lang.Comparable"))
            .with_interface(name("java.lang.CharSequence")),
        [
            ctor("()V"),
            ctor("(Ljava/lang/String;)V"),
            virt("length", "()I"),
            virt("charAt", "(I)C"),
            virt("isEmpty", "()Z"),
            virt("compareTo", "(Ljava/lang/Object;)I"),
            virt("concat", "(Ljava/lang/String;)Ljava/lang/String;"),
            virt("substring", "(I)Ljava/lang/String;"),
            virt("substring", "(II)Ljava/lang/String;"),
            virt("indexOf", "(Ljava/lang/String;)I"),
            virt("contains", "(Ljava/lang/CharSequence;)Z"),
            virt("startsWith", "(Ljava/lang/String;)Z"),
            virt("toUpperCase", "()Ljava/lang/String;"),
            virt("toLowerCase", "()Ljava/lang/String;"),
            virt("trim", "()Ljava/lang/String;"),
            stat("valueOf", "(Ljava/lang/Object;)Ljava/lang/String;"),
        ],
    )?;
    for kind in PrimitiveKind::ALL {
        if matches!(kind, PrimitiveKind::Byte | PrimitiveKind::Short) {
            continue;
        }
        let desc = format!("({})Ljava/lang/String;", kind.descriptor());
        string = string.with_method(stat("valueOf", &desc)?);
    }
    out.push(string);

    let mut builder = with_methods(
        class("java.lang.StringBuilder").with_interface(name("java.lang.CharSequence")),
        [
            ctor("()V"),
            ctor("(Ljava/lang/String;)V"),
            virt("append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;"),
            virt("append", "(Ljava/lang/String;)Ljava/lang/StringBuilder;"),
            virt("length", "()I"),
            virt("charAt", "(I)C"),
            virt("toString", "()Ljava/lang/String;"),
        ],
    )?;
    for kind in PrimitiveKind::ALL {
        if matches!(kind, PrimitiveKind::Byte | PrimitiveKind::Short) {
            continue;
        }
        let desc = format!("({})Ljava/lang/StringBuilder;", kind.descriptor());
        builder = builder.with_method(virt("append", &desc)?);
    }
    out.push(builder);

    let mut math = class("java.lang.Math")
        .with_field(static_field("PI", "D")?)
        .with_field(static_field("E", "D")?);
    for p in ["I", "J", "F", "D"] {
        math = with_methods(
            math,
            [
                stat("abs", &format!("({p}){p}")),
                stat("max", &format!("({p}{p}){p}")),
                stat("min", &format!("({p}{p}){p}")),
            ],
        )?;
    }
    out.push(with_methods(
        math,
        [stat("sqrt", "(D)D"), stat("pow", "(DD)D"), stat("random", "()D")],
    )?);

    out.push(with_methods(
        class("java.lang.System")
            .with_field(static_field("out", "Ljava/io/PrintStream;")?)
            .with_field(static_field("err", "Ljava/io/PrintStream;")?),
        [
            stat("currentTimeMillis", "()J"),
            stat("nanoTime", "()J"),
            stat("identityHashCode", "(Ljava/lang/Object;)I"),
            stat("getProperty", "(Ljava/lang/String;)Ljava/lang/String;"),
        ],
    )?);

    out.push(with_methods(
        class("java.lang.Thread").with_interface(name("java.lang.Runnable")),
        [
            ctor("()V"),
            ctor("(Ljava/lang/Runnable;)V"),
            virt("start", "()V"),
            virt("run", "()V"),
            virt("join", "()V"),
            virt("getName", "()Ljava/lang/String;"),
            stat("sleep", "(J)V"),
            stat("currentThread", "()Ljava/lang/Thread;"),
        ],
    )?);

    out.push(with_methods(
        class("java.lang.Throwable").with_interface(name("java.io.Serializable")),
        [
            ctor("()V"),
            ctor("(Ljava/lang/String;)V"),
            virt("getMessage", "()Ljava/lang/String;"),
            virt("printStackTrace", "()V"),
        ],
    )?);
    out.push(throwable("java.lang.Exception", "java.lang.Throwable")?);
    out.push(throwable("java.lang.Error", "java.lang.Throwable")?);
    out.push(throwable("java.lang.RuntimeException", "java.lang.Exception")?);
    for path in [
        "java.lang.IllegalArgumentException",
        "java.lang.IllegalStateException",
        "java.lang.UnsupportedOperationException",
        "java.lang.NullPointerException",
        "java.lang.ClassCastException",
    ] {
        out.push(throwable(path, "java.lang.RuntimeException")?);
    }
    Ok(())
}

/// `Integer`, `Long`, ... with `valueOf` and the unboxing accessor.
fn boxes(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    out.push(with_methods(
        class("java.lang.Number")
            .with_access(AccessFlags::PUBLIC | AccessFlags::ABSTRACT | AccessFlags::SUPER)
            .with_interface(name("java.io.Serializable")),
        [
            ctor("()V"),
            abs("intValue", "()I"),
            abs("longValue", "()J"),
            abs("floatValue", "()F"),
            abs("doubleValue", "()D"),
            virt("byteValue", "()B"),
            virt("shortValue", "()S"),
        ],
    )?);

    for kind in PrimitiveKind::ALL {
        let boxed = kind.box_class();
        let parent = if kind.is_numeric() { "java.lang.Number" } else { "java.lang.Object" };
        let d = kind.descriptor();
        let mut entry = with_methods(
            ClassEntry::class(name(boxed))
                .with_access(AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SUPER)
                .with_super(Some(name(parent)))
                .with_interface(name("java.lang.Comparable")),
            [
                stat("valueOf", &format!("({d})L{boxed};")),
                virt(kind.unbox_method(), &format!("(){d}")),
                virt("compareTo", "(Ljava/lang/Object;)I"),
            ],
        )?;
        if kind == PrimitiveKind::Int {
            entry = with_methods(
                entry
                    .with_field(static_field("MAX_VALUE", "I")?)
                    .with_field(static_field("MIN_VALUE", "I")?),
                [stat("parseInt", "(Ljava/lang/String;)I"), stat("toString", "(I)Ljava/lang/String;")],
            )?;
        }
        out.push(entry);
    }
    Ok(())
}

fn java_io(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    out.push(interface("java.io.Serializable"));

    let mut print = with_methods(
        class("java.io.PrintStream"),
        [
            virt("println", "()V"),
            virt("println", "(Ljava/lang/Object;)V"),
            virt("println", "(Ljava/lang/String;)V"),
            virt("print", "(Ljava/lang/Object;)V"),
            virt("print", "(Ljava/lang/String;)V"),
            virt("flush", "()V"),
        ],
    )?;
    for kind in PrimitiveKind::ALL {
        if matches!(kind, PrimitiveKind::Byte | PrimitiveKind::Short) {
            continue;
        }
        print = print.with_method(virt("println", &format!("({})V", kind.descriptor()))?);
        print = print.with_method(virt("print", &format!("({})V", kind.descriptor()))?);
    }
    out.push(print);
    Ok(())
}

fn java_util(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    const COLLECTION: [(&str, &str); 5] = [
        ("size", "()I"),
        ("isEmpty", "()Z"),
        ("add", "(Ljava/lang/Object;)Z"),
        ("contains", "(Ljava/lang/Object;)Z"),
        ("iterator", "()Ljava/util/Iterator;"),
    ];
    const LIST: [(&str, &str); 3] = [
        ("get", "(I)Ljava/lang/Object;"),
        ("set", "(ILjava/lang/Object;)Ljava/lang/Object;"),
        ("remove", "(I)Ljava/lang/Object;"),
    ];
    const MAP: [(&str, &str); 6] = [
        ("put", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"),
        ("get", "(Ljava/lang/Object;)Ljava/lang/Object;"),
        ("remove", "(Ljava/lang/Object;)Ljava/lang/Object;"),
        ("containsKey", "(Ljava/lang/Object;)Z"),
        ("size", "()I"),
        ("isEmpty", "()Z"),
    ];

    out.push(with_methods(
        interface("java.util.Iterator"),
        [abs("hasNext", "()Z"), abs("next", "()Ljava/lang/Object;")],
    )?);
    out.push(with_methods(
        interface("java.util.Collection").with_interface(name("java.lang.Iterable")),
        COLLECTION.iter().map(|(n, d)| abs(n, d)),
    )?);
    out.push(with_methods(
        interface("java.util.List").with_interface(name("java.util.Collection")),
        LIST.iter().map(|(n, d)| abs(n, d)),
    )?);
    out.push(with_methods(interface("java.util.Map"), MAP.iter().map(|(n, d)| abs(n, d)))?);

    for path in ["java.util.ArrayList", "java.util.LinkedList"] {
        let list = class(path)
            .with_interface(name("java.util.List"))
            .with_interface(name("java.io.Serializable"));
        let methods = [ctor("()V")]
            .into_iter()
            .chain(COLLECTION.iter().chain(&LIST).map(|(n, d)| virt(n, d)));
        out.push(with_methods(list, methods)?);
    }
    let hash_map = class("java.util.HashMap")
        .with_interface(name("java.util.Map"))
        .with_interface(name("java.io.Serializable"));
    out.push(with_methods(
        hash_map,
        [ctor("()V")].into_iter().chain(MAP.iter().map(|(n, d)| virt(n, d))),
    )?);
    out.push(with_methods(
        class("java.util.LinkedHashMap").with_super(Some(name("java.util.HashMap"))),
        [ctor("()V")],
    )?);

    out.push(with_methods(
        class("java.util.Collections").with_field(static_field("EMPTY_LIST", "Ljava/util/List;")?),
        [
            stat("emptyList", "()Ljava/util/List;"),
            stat("singletonList", "(Ljava/lang/Object;)Ljava/util/List;"),
            stat("unmodifiableList", "(Ljava/util/List;)Ljava/util/List;"),
            stat("reverse", "(Ljava/util/List;)V"),
        ],
    )?);
    Ok(())
}

fn java_util_function(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    const SHAPES: [(&str, &str, &str); 15] = [
        ("java.util.function.Supplier", "get", "()Ljava/lang/Object;"),
        ("java.util.function.Consumer", "accept", "(Ljava/lang/Object;)V"),
        ("java.util.function.Function", "apply", "(Ljava/lang/Object;)Ljava/lang/Object;"),
        ("java.util.function.Predicate", "test", "(Ljava/lang/Object;)Z"),
        ("java.util.function.BiFunction", "apply", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"),
        ("java.util.function.IntSupplier", "getAsInt", "()I"),
        ("java.util.function.LongSupplier", "getAsLong", "()J"),
        ("java.util.function.DoubleSupplier", "getAsDouble", "()D"),
        ("java.util.function.BooleanSupplier", "getAsBoolean", "()Z"),
        ("java.util.function.IntUnaryOperator", "applyAsInt", "(I)I"),
        ("java.util.function.IntPredicate", "test", "(I)Z"),
        ("java.util.function.IntConsumer", "accept", "(I)V"),
        ("java.util.function.IntFunction", "apply", "(I)Ljava/lang/Object;"),
        ("java.util.function.ToIntFunction", "applyAsInt", "(Ljava/lang/Object;)I"),
        ("java.util.concurrent.Callable", "call", "()Ljava/lang/Object;"),
    ];
    for (path, sam, desc) in SHAPES {
        out.push(functional(path, sam, desc)?);
    }
    Ok(())
}

/// The runtime ABI the generated code calls into.
fn latte_runtime(out: &mut Vec<ClassEntry>) -> Result<(), DescriptorError> {
    out.push(functional("lt.lang.function.Function0", "apply", "()Ljava/lang/Object;")?);
    out.push(functional("lt.lang.function.Function1", "apply", "(Ljava/lang/Object;)Ljava/lang/Object;")?);
    out.push(functional(
        "lt.lang.function.Function2",
        "apply",
        "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
    )?);

    let mut runtime = with_methods(
        class("lt.runtime.LtRuntime"),
        [
            stat("castToThrowable", "(Ljava/lang/Object;)Ljava/lang/Throwable;"),
            stat(
                "binary",
                "(Ljava/lang/String;Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            ),
            stat("unary", "(Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/Object;"),
        ],
    )?;
    for kind in PrimitiveKind::ALL {
        let desc = format!("(Ljava/lang/Object;){}", kind.descriptor());
        runtime = runtime.with_method(stat(kind.runtime_cast(), &desc)?);
    }
    out.push(runtime);

    out.push(with_methods(
        class("lt.runtime.Dynamic"),
        [
            stat("getField", "(Ljava/lang/Object;Ljava/lang/String;)Ljava/lang/Object;"),
            stat("putField", "(Ljava/lang/Object;Ljava/lang/String;Ljava/lang/Object;)V"),
            stat(
                "invoke",
                "(Ljava/lang/Object;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;",
            ),
            stat(
                "invokeStatic",
                "(Ljava/lang/Class;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;",
            ),
        ],
    )?);
    Ok(())
}
