//! Module registry backing the sandbox `require` shim.
//!
//! The sandbox has no filesystem or package resolution; the only modules
//! `require` can reach are the ones registered here for the current run —
//! utility modules authored inside the workflow plus organization packages
//! resolved ahead of execution.

/// A JavaScript module made available to sandboxed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxModule {
    /// Name used with `require(name)`.
    pub name: String,
    /// CommonJS-style source; assigns to `exports`/`module.exports`.
    pub code: String,
    /// Also bind `module.exports` to a global of the same name.
    pub bind_global: bool,
}

impl SandboxModule {
    /// Creates a module reachable via `require` only.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { name: name.into(), code: code.into(), bind_global: false }
    }

    /// Creates a module also bound as a global variable, for workflow
    /// utility nodes exposed by label.
    pub fn global(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { name: name.into(), code: code.into(), bind_global: true }
    }
}

/// The set of modules reachable from one sandbox execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRegistry {
    modules: Vec<SandboxModule>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, replacing any module with the same name.
    pub fn register(&mut self, module: SandboxModule) {
        self.modules.retain(|m| m.name != module.name);
        self.modules.push(module);
    }

    /// Returns whether a module name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Returns the registered modules in registration order.
    pub fn modules(&self) -> &[SandboxModule] {
        &self.modules
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true when no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Sanitizes an arbitrary label into a JavaScript identifier.
///
/// Non-identifier characters become underscores; a leading digit gets an
/// underscore prefix; names that would shadow sandbox machinery are
/// prefixed as well.
pub fn sanitize_identifier(label: &str) -> String {
    const RESERVED: &[&str] = &["require", "console", "exports", "module"];

    let mut ident: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();

    if ident.is_empty() {
        ident.push('_');
    }
    if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED.contains(&ident.as_str()) {
        ident.insert(0, '_');
    }
    ident
}
