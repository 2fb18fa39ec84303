//! Import-statement rewriting.
//!
//! Sandboxed code may use ES `import` syntax, but the context has no module
//! loader; each import line is rewritten to an equivalent `require` form
//! against the per-run module registry. Default, named (including `as`
//! renames), namespace, and bare imports are each handled. Module names are
//! collected so callers can resolve them up front.

use std::sync::LazyLock;

use regex::Regex;

/// Result of rewriting `import` statements to `require` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenCode {
    /// Source with import lines replaced.
    pub code: String,
    /// Module names referenced by the original imports, in order.
    pub modules: Vec<String>,
}

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+\*\s+as\s+([A-Za-z_$][\w$]*)\s+from\s+['"]([^'"]+)['"];?\s*$"#)
        .expect("valid regex")
});

static DEFAULT_AND_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*import\s+([A-Za-z_$][\w$]*)\s*,\s*\{([^}]*)\}\s+from\s+['"]([^'"]+)['"];?\s*$"#,
    )
    .expect("valid regex")
});

static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+\{([^}]*)\}\s+from\s+['"]([^'"]+)['"];?\s*$"#)
        .expect("valid regex")
});

static DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+([A-Za-z_$][\w$]*)\s+from\s+['"]([^'"]+)['"];?\s*$"#)
        .expect("valid regex")
});

static BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"];?\s*$"#).expect("valid regex"));

/// Rewrites each `import` line to a `require` statement and collects the
/// referenced module names. Non-import lines pass through unchanged; the
/// line count of the source is preserved.
pub fn rewrite_imports(source: &str) -> RewrittenCode {
    let mut modules = Vec::new();
    let mut out = Vec::new();

    for line in source.lines() {
        if let Some(captures) = NAMESPACE.captures(line) {
            let (name, module) = (&captures[1], &captures[2]);
            modules.push(module.to_string());
            out.push(format!("var {name} = require(\"{module}\");"));
        } else if let Some(captures) = DEFAULT_AND_NAMED.captures(line) {
            let (name, specs, module) = (&captures[1], &captures[2], &captures[3]);
            modules.push(module.to_string());
            out.push(format!(
                "var {name} = require(\"{module}\"); var {{ {} }} = require(\"{module}\");",
                destructure_specs(specs),
            ));
        } else if let Some(captures) = NAMED.captures(line) {
            let (specs, module) = (&captures[1], &captures[2]);
            modules.push(module.to_string());
            out.push(format!(
                "var {{ {} }} = require(\"{module}\");",
                destructure_specs(specs),
            ));
        } else if let Some(captures) = DEFAULT.captures(line) {
            let (name, module) = (&captures[1], &captures[2]);
            modules.push(module.to_string());
            out.push(format!("var {name} = require(\"{module}\");"));
        } else if let Some(captures) = BARE.captures(line) {
            let module = &captures[1];
            modules.push(module.to_string());
            out.push(format!("require(\"{module}\");"));
        } else {
            out.push(line.to_string());
        }
    }

    RewrittenCode { code: out.join("\n"), modules }
}

/// Converts import specifiers (`a, b as c`) to destructuring form (`a, b: c`).
fn destructure_specs(specs: &str) -> String {
    specs
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|spec| match spec.split_once(" as ") {
            Some((from, to)) => format!("{}: {}", from.trim(), to.trim()),
            None => spec.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
