//! Batch compilation.
//!
//! A [`Compiler`] turns a batch of source units into class files in four
//! steps:
//!
//! 1. **Parse** every unit (scanner mode from its directive or the config).
//! 2. **Register** a skeleton of every declared type, so imports and
//!    headers can refer to classes of any unit in the batch.
//! 3. **Headers**: classify imports per unit and replace each skeleton with
//!    the full header (parents, fields, method descriptors).
//! 4. **Bodies**: resolve and generate every unit against the now frozen
//!    registry.
//!
//! Errors are reported per unit; a unit that fails a step is skipped by the
//! later ones while its siblings carry on.

use latte_core::{ClassHash, CompilerConfig, Diagnostic, Diagnostics, ErrorCode, QualifiedName, ResolveError};
use latte_parser::{CompilationUnit, ParsedSource, TypeDecl};
use latte_registry::{ClassEntry, ClassRegistry, RegistryError};

use crate::codegen::{AdapterCache, GenOptions, GeneratedClass, generate};
use crate::resolve::{ImportTable, NameResolver, headers, resolve};

/// The classes produced by a successful batch.
#[derive(Debug, Clone, Default)]
pub struct CompiledClasses {
    classes: Vec<GeneratedClass>,
    warnings: Diagnostics,
}

impl CompiledClasses {
    /// Bytes of the class with dotted binary name `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.classes.iter().find(|c| c.name == name).map(|c| c.bytes.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Non-fatal diagnostics of the batch.
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    pub fn into_classes(self) -> Vec<GeneratedClass> {
        self.classes
    }
}

/// One parsed unit on its way through the batch.
struct ParsedUnit<'s> {
    name: &'s str,
    package: Vec<String>,
    ast: CompilationUnit,
    failed: bool,
}

/// Compiles batches of Latte units.
///
/// Library classes registered on the compiler are visible to every batch;
/// the classes of a batch are only visible within it. The lambda adapter
/// cache lives as long as the compiler.
///
/// ```
/// use latte_compiler::Compiler;
///
/// let mut compiler = Compiler::default();
/// let classes = compiler
///     .compile(&[("Point.lt", "class Point(x:int, y:int)\n  def sum():int = x + y\n")])
///     .unwrap();
/// assert!(classes.get("Point").is_some());
/// ```
pub struct Compiler {
    config: CompilerConfig,
    library: ClassRegistry,
    adapters: AdapterCache,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    /// A compiler knowing the built-in JDK and runtime classes.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            library: ClassRegistry::with_builtins(),
            adapters: AdapterCache::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Make a library class visible to later batches.
    pub fn register_class_file(&mut self, bytes: &[u8]) -> Result<ClassHash, RegistryError> {
        self.library.register_class_file(bytes)
    }

    pub fn register_class(&mut self, entry: ClassEntry) -> Result<ClassHash, RegistryError> {
        self.library.register(entry)
    }

    pub fn adapters(&self) -> &AdapterCache {
        &self.adapters
    }

    /// Compile `units`, given as `(logical name, source)` pairs.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile<N, S>(&mut self, units: &[(N, S)]) -> Result<CompiledClasses, Diagnostics>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let _span = tracing::debug_span!("compile", units = units.len()).entered();
        let mut diagnostics = Diagnostics::new();

        let mut parsed = self.parse(units, &mut diagnostics);
        let mut registry = self.library.clone();
        register_skeletons(&mut parsed, &mut registry, &mut diagnostics);
        let tables = self.import_tables(&mut parsed, &registry, &mut diagnostics);
        register_headers(&mut parsed, &tables, &mut registry, &mut diagnostics);
        validate_static_imports(&mut parsed, &tables, &registry, &mut diagnostics);

        let mut classes = Vec::new();
        for (unit, table) in parsed.iter().zip(&tables) {
            let (false, Some(table)) = (unit.failed, table) else {
                continue;
            };
            let names = NameResolver::new(&registry, table, &unit.package);
            let resolved = match resolve(unit.name, &unit.ast, &names) {
                Ok(resolved) => resolved,
                Err(errors) => {
                    for error in errors {
                        diagnostics.push_error(error, unit.name);
                    }
                    continue;
                }
            };
            let options = GenOptions {
                source_file: self.config.emit_source_file().then(|| unit.name.to_string()),
            };
            match generate(&resolved, &registry, &mut self.adapters, &options) {
                Ok(generated) => classes.extend(generated),
                Err(errors) => {
                    for error in errors {
                        diagnostics.push_error(error, unit.name);
                    }
                }
            }
        }

        tracing::debug!(
            classes = classes.len(),
            errors = diagnostics.error_count(),
            adapters = self.adapters.len(),
            "batch finished"
        );
        if diagnostics.is_fatal(self.config.warnings_fatal()) {
            Err(diagnostics)
        } else {
            Ok(CompiledClasses {
                classes,
                warnings: diagnostics,
            })
        }
    }

    fn parse<'s, N, S>(&self, units: &'s [(N, S)], diagnostics: &mut Diagnostics) -> Vec<ParsedUnit<'s>>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::with_capacity(units.len());
        for (name, source) in units {
            let name = name.as_ref();
            match latte_parser::parse_source_unit(source.as_ref(), self.config.default_mode()) {
                Ok(ParsedSource { unit: ast, selection }) => {
                    for span in selection.ignored {
                        diagnostics.push(Diagnostic::warning(
                            ErrorCode::Syntax,
                            "scanner directive ignored: only the first non-blank line selects the mode",
                            Some(name),
                            span,
                        ));
                    }
                    parsed.push(ParsedUnit {
                        name,
                        package: ast.package.as_ref().map(|p| p.segments.clone()).unwrap_or_default(),
                        ast,
                        failed: false,
                    });
                }
                Err(errors) => {
                    tracing::debug!(unit = name, errors = errors.len(), "parse failed");
                    for error in errors {
                        diagnostics.push_error(error, name);
                    }
                }
            }
        }
        parsed
    }

    fn import_tables(
        &self,
        parsed: &mut [ParsedUnit<'_>],
        registry: &ClassRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Option<ImportTable>> {
        parsed
            .iter_mut()
            .map(|unit| {
                if unit.failed {
                    return None;
                }
                match ImportTable::build(&unit.ast.imports, self.config.implicit_imports(), registry) {
                    Ok(table) => Some(table),
                    Err(errors) => {
                        for error in errors {
                            diagnostics.push_error(error, unit.name);
                        }
                        unit.failed = true;
                        None
                    }
                }
            })
            .collect()
    }
}

fn register_skeletons(parsed: &mut [ParsedUnit<'_>], registry: &mut ClassRegistry, diagnostics: &mut Diagnostics) {
    for unit in parsed.iter_mut() {
        for decl in &unit.ast.types {
            let skeleton = headers::skeleton(&unit.package, decl);
            if registry.register(skeleton).is_err() {
                let name = QualifiedName::new(unit.package.clone(), decl.name()).dotted();
                diagnostics.push_error(ResolveError::DuplicateClass { name, span: decl.span() }, unit.name);
                unit.failed = true;
            }
        }
    }
}

/// Build every header against the skeleton registry, then swap them in.
fn register_headers(
    parsed: &mut [ParsedUnit<'_>],
    tables: &[Option<ImportTable>],
    registry: &mut ClassRegistry,
    diagnostics: &mut Diagnostics,
) {
    let mut built = Vec::new();
    for (unit, table) in parsed.iter_mut().zip(tables) {
        let (false, Some(table)) = (unit.failed, table) else {
            continue;
        };
        let names = NameResolver::new(registry, table, &unit.package);
        for decl in &unit.ast.types {
            let name = QualifiedName::new(unit.package.clone(), decl.name());
            let header = match decl {
                TypeDecl::Class(class) => headers::class_header(name, class, &names),
                TypeDecl::Interface(iface) => headers::interface_header(name, iface, &names),
            };
            match header {
                Ok(entry) => built.push(entry),
                Err(error) => {
                    diagnostics.push_error(error, unit.name);
                    unit.failed = true;
                }
            }
        }
    }
    for entry in built {
        registry.replace(entry);
    }
}

/// Exact static-member imports can only be checked once every header is in.
fn validate_static_imports(
    parsed: &mut [ParsedUnit<'_>],
    tables: &[Option<ImportTable>],
    registry: &ClassRegistry,
    diagnostics: &mut Diagnostics,
) {
    for (unit, table) in parsed.iter_mut().zip(tables) {
        let (false, Some(table)) = (unit.failed, table) else {
            continue;
        };
        if let Err(errors) = table.validate_members(registry) {
            for error in errors {
                diagnostics.push_error(error, unit.name);
            }
            unit.failed = true;
        }
    }
}
