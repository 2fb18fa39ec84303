//! Sandboxed code execution on top of `boa_engine`.
//!
//! Execution pipeline: rewrite import lines to `require` form, parse the
//! wrapped unit for diagnostics (nothing runs on a syntax error), build an
//! isolated context (input bindings, capturing console, module registry,
//! pruned globals), evaluate the user code inside an async IIFE, drain the
//! job queue, and settle the resulting promise. The wall-clock budget is
//! enforced by racing a blocking task against a timer; engine loop and
//! recursion limits bound runaway code inside the interpreter itself.

use std::time::{Duration, Instant};

use boa_engine::object::builtins::JsPromise;
use boa_engine::builtins::promise::PromiseState;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsString, JsValue, Script, Source};
use serde_json::Value;

use crate::config::SandboxConfig;
use crate::error::{Diagnostic, SandboxError, SandboxResult, source_position};
use crate::imports::rewrite_imports;
use crate::modules::ModuleRegistry;
use crate::TRACING_TARGET;

/// Lines the async wrapper inserts before the user's source.
const WRAPPER_PRELUDE_LINES: u32 = 1;

/// One sandbox execution request.
#[derive(Debug, Clone, Default)]
pub struct SandboxRequest {
    /// User source; `import` lines and a top-level `return` are allowed.
    pub code: String,
    /// Named globals bound before execution (inputs, upstream outputs).
    pub bindings: Vec<(String, Value)>,
    /// Modules reachable through `require`.
    pub modules: ModuleRegistry,
    /// Per-request budget override.
    pub timeout: Option<Duration>,
    /// Prefix applied to captured console lines.
    pub log_prefix: Option<String>,
}

/// Outcome of a successful sandbox execution.
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    /// The value the code returned, JSON-serialized; `Null` for undefined.
    pub value: Value,
    /// Captured console output, one entry per call.
    pub logs: Vec<String>,
    /// Interpreter wall-clock time.
    pub duration: Duration,
}

/// Executes user JavaScript inside a bounded, isolated context.
#[derive(Debug, Clone, Default)]
pub struct CodeRunner {
    config: SandboxConfig,
}

impl CodeRunner {
    /// Creates a runner with the given configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Returns the runner configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Parses code without executing it, reporting syntax diagnostics.
    ///
    /// Used to validate utility modules before a run starts; the code is
    /// parsed standalone, so positions need no adjustment.
    pub fn check(&self, code: &str) -> SandboxResult<()> {
        if code.len() > self.config.max_code_length {
            return Err(SandboxError::CodeTooLarge {
                max: self.config.max_code_length,
                actual: code.len(),
            });
        }

        let mut context = Context::default();
        match Script::parse(Source::from_bytes(code), None, &mut context) {
            Ok(_) => Ok(()),
            Err(error) => Err(compile_error(&error.to_string(), 0)),
        }
    }

    /// Executes a request under the wall-clock budget.
    pub async fn run(&self, request: SandboxRequest) -> SandboxResult<SandboxOutcome> {
        let budget = request.timeout.unwrap_or(self.config.timeout);
        let config = self.config.clone();

        tracing::debug!(
            target: TRACING_TARGET,
            code_len = request.code.len(),
            bindings = request.bindings.len(),
            modules = request.modules.len(),
            budget_ms = budget.as_millis() as u64,
            "Executing sandboxed code"
        );

        let handle = tokio::task::spawn_blocking(move || execute_sync(&request, &config));

        match tokio::time::timeout(budget, handle).await {
            Err(_) => Err(SandboxError::Timeout),
            Ok(Err(join)) => Err(SandboxError::Internal(format!("task join error: {join}"))),
            Ok(Ok(result)) => result,
        }
    }
}

/// Synchronous execution body; runs on a blocking thread.
fn execute_sync(request: &SandboxRequest, config: &SandboxConfig) -> SandboxResult<SandboxOutcome> {
    if request.code.len() > config.max_code_length {
        return Err(SandboxError::CodeTooLarge {
            max: config.max_code_length,
            actual: request.code.len(),
        });
    }

    let started = Instant::now();
    let rewritten = rewrite_imports(&request.code);
    let wrapper = format!("(async function() {{\n{}\n}})()", rewritten.code);

    let mut context = Context::default();
    context.runtime_limits_mut().set_loop_iteration_limit(config.loop_iteration_limit);
    context.runtime_limits_mut().set_recursion_limit(config.recursion_limit);

    // Syntax check before anything executes; positions map back to the
    // user's source by subtracting the wrapper prelude.
    if let Err(error) = Script::parse(Source::from_bytes(&wrapper), None, &mut context) {
        return Err(compile_error(&error.to_string(), WRAPPER_PRELUDE_LINES));
    }

    let mut allowed = config.allowed_globals.clone();
    allowed.extend(["console", "__console_logs", "__modules", "require", "globalThis"]
        .map(String::from));

    for (name, value) in &request.bindings {
        let js_value = JsValue::from_json(value, &mut context)
            .map_err(|e| SandboxError::Internal(format!("binding {name}: {e}")))?;
        context
            .register_global_property(JsString::from(name.as_str()), js_value, Attribute::all())
            .map_err(|e| SandboxError::Internal(format!("binding {name}: {e}")))?;
        allowed.push(name.clone());
    }
    for module in request.modules.modules() {
        if module.bind_global {
            allowed.push(module.name.clone());
        }
    }

    eval_internal(&mut context, CONSOLE_PRELUDE)?;
    eval_internal(&mut context, &modules_prelude(&request.modules))?;
    if config.freeze_globals {
        eval_internal(&mut context, &pruning_prelude(&allowed))?;
    }

    let result = context.eval(Source::from_bytes(&wrapper));
    let _ = context.run_jobs();

    let value = settle(result, &mut context)?;
    let value = match value {
        v if v.is_undefined() => Value::Null,
        v => v
            .to_json(&mut context)
            .map_err(|e| SandboxError::Execution(format!("result is not serializable: {e}")))?,
    };

    let serialized = serde_json::to_vec(&value)
        .map_err(|e| SandboxError::Internal(e.to_string()))?;
    if serialized.len() > config.max_output_bytes {
        return Err(SandboxError::OutputTooLarge {
            max: config.max_output_bytes,
            actual: serialized.len(),
        });
    }

    let logs = collect_logs(&mut context, request.log_prefix.as_deref());

    Ok(SandboxOutcome { value, logs, duration: started.elapsed() })
}

/// Settles the wrapper's promise into its fulfilled value.
fn settle(
    result: Result<JsValue, boa_engine::JsError>,
    context: &mut Context,
) -> SandboxResult<JsValue> {
    let value = match result {
        Ok(value) => value,
        Err(error) => return Err(execution_error(&error.to_string())),
    };

    let Some(object) = value.as_object() else {
        // The async wrapper always yields a promise; anything else is ours.
        return Ok(value);
    };

    let promise = JsPromise::from_object(object.clone())
        .map_err(|e| SandboxError::Internal(e.to_string()))?;

    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(value),
        PromiseState::Rejected(reason) => {
            let message = reason
                .to_string(context)
                .map(|s| s.to_std_string_escaped())
                .unwrap_or_else(|_| reason.display().to_string());
            Err(execution_error(&message))
        }
        PromiseState::Pending => Err(SandboxError::Execution(
            "code returned a promise that never settled".into(),
        )),
    }
}

/// Maps an engine error message to the sandbox error taxonomy.
fn execution_error(message: &str) -> SandboxError {
    if message.contains("iteration limit") || message.contains("recursion limit") {
        SandboxError::Timeout
    } else {
        SandboxError::Execution(message.to_string())
    }
}

/// Builds a compile error from a parser message, shifting reported lines
/// past the synthetic wrapper back into user coordinates.
fn compile_error(message: &str, prelude_lines: u32) -> SandboxError {
    let (line, column) = source_position(message)
        .map(|(line, column)| (line.saturating_sub(prelude_lines).max(1), column))
        .unwrap_or((1, 1));

    SandboxError::Compile(vec![Diagnostic {
        line,
        column,
        message: strip_position(message),
    }])
}

/// Removes the trailing position suffix from a parser message, if present.
fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(index) => message[..index].trim_end().to_string(),
        None => message.to_string(),
    }
}

fn eval_internal(context: &mut Context, source: &str) -> SandboxResult<()> {
    context
        .eval(Source::from_bytes(source))
        .map(|_| ())
        .map_err(|e| SandboxError::Internal(format!("sandbox prelude failed: {e}")))
}

/// Console shim capturing log lines into a context-local array.
const CONSOLE_PRELUDE: &str = r#"
var __console_logs = [];
var console = {
    log: function() {
        var parts = [];
        for (var i = 0; i < arguments.length; i++) {
            var arg = arguments[i];
            if (typeof arg === 'object' && arg !== null) {
                parts.push(JSON.stringify(arg));
            } else {
                parts.push(String(arg));
            }
        }
        __console_logs.push(parts.join(' '));
    },
    info: function() { console.log.apply(null, arguments); },
    warn: function() { console.log.apply(null, arguments); },
    error: function() { console.log.apply(null, arguments); }
};
"#;

/// Builds the module table and `require` shim for the registry.
fn modules_prelude(registry: &ModuleRegistry) -> String {
    let mut prelude = String::from("var __modules = {};\n");

    for module in registry.modules() {
        prelude.push_str(&format!(
            "__modules[{name}] = (function() {{ var exports = {{}}; var module = {{ exports: exports }};\n{code}\nreturn module.exports; }})();\n",
            name = serde_json::to_string(&module.name).unwrap_or_default(),
            code = module.code,
        ));
        if module.bind_global {
            prelude.push_str(&format!(
                "var {ident} = __modules[{name}];\n",
                ident = module.name,
                name = serde_json::to_string(&module.name).unwrap_or_default(),
            ));
        }
    }

    prelude.push_str(
        "function require(name) {\n\
         \x20   if (Object.prototype.hasOwnProperty.call(__modules, name)) { return __modules[name]; }\n\
         \x20   throw new Error(\"Cannot find module '\" + name + \"'\");\n\
         }\n",
    );
    prelude
}

/// Deletes non-allow-listed globals and freezes core prototypes.
fn pruning_prelude(allowed: &[String]) -> String {
    let list = allowed
        .iter()
        .map(|name| serde_json::to_string(name).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"
var __allowed = new Set([{list}]);
var __global = (typeof globalThis !== 'undefined') ? globalThis : this;
Object.getOwnPropertyNames(__global).forEach(function(key) {{
    if (!__allowed.has(key)) {{
        try {{ delete __global[key]; }} catch (e) {{ try {{ __global[key] = undefined; }} catch (e2) {{}} }}
    }}
}});
Object.freeze(Object.prototype);
Object.freeze(Array.prototype);
"#
    )
}

/// Drains the captured console array, applying the optional prefix.
fn collect_logs(context: &mut Context, prefix: Option<&str>) -> Vec<String> {
    let Ok(value) = context.eval(Source::from_bytes("__console_logs")) else {
        return Vec::new();
    };
    let Ok(json) = value.to_json(context) else {
        return Vec::new();
    };

    let lines = json
        .as_array()
        .map(|array| {
            array
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    match prefix {
        Some(prefix) => lines.into_iter().map(|line| format!("{prefix}{line}")).collect(),
        None => lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::SandboxModule;
    use serde_json::json;

    fn runner() -> CodeRunner {
        CodeRunner::new(SandboxConfig::default())
    }

    fn request(code: &str) -> SandboxRequest {
        SandboxRequest { code: code.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn returns_primitive() {
        let outcome = runner().run(request("return 42;")).await.unwrap();
        assert_eq!(outcome.value, json!(42));
    }

    #[tokio::test]
    async fn returns_object() {
        let outcome = runner()
            .run(request("return { name: 'flow', count: 2 };"))
            .await
            .unwrap();
        assert_eq!(outcome.value, json!({ "name": "flow", "count": 2 }));
    }

    #[tokio::test]
    async fn undefined_becomes_null() {
        let outcome = runner().run(request("var x = 1;")).await.unwrap();
        assert_eq!(outcome.value, Value::Null);
    }

    #[tokio::test]
    async fn binds_input_globals() {
        let outcome = runner()
            .run(SandboxRequest {
                code: "return $json.a + $json.b;".into(),
                bindings: vec![("$json".into(), json!({ "a": 40, "b": 2 }))],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(42));
    }

    #[tokio::test]
    async fn binds_upstream_variables() {
        let outcome = runner()
            .run(SandboxRequest {
                code: "return fetch_users[0].json.id;".into(),
                bindings: vec![(
                    "fetch_users".into(),
                    json!([{ "json": { "id": 7 } }]),
                )],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(7));
    }

    #[tokio::test]
    async fn captures_console_with_prefix() {
        let outcome = runner()
            .run(SandboxRequest {
                code: "console.log('hello', { a: 1 }); return null;".into(),
                log_prefix: Some("[Code] ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.logs, vec!["[Code] hello {\"a\":1}"]);
    }

    #[tokio::test]
    async fn awaits_resolved_promises() {
        let outcome = runner()
            .run(request("return await Promise.resolve(5);"))
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(5));
    }

    #[tokio::test]
    async fn requires_registered_module() {
        let mut modules = ModuleRegistry::new();
        modules.register(SandboxModule::new(
            "helpers",
            "exports.double = function(x) { return x * 2; };",
        ));
        let outcome = runner()
            .run(SandboxRequest {
                code: "var helpers = require('helpers'); return helpers.double(21);".into(),
                modules,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(42));
    }

    #[tokio::test]
    async fn utility_module_is_bound_as_global() {
        let mut modules = ModuleRegistry::new();
        modules.register(SandboxModule::global(
            "my_utils",
            "exports.greet = function(name) { return 'hi ' + name; };",
        ));
        let outcome = runner()
            .run(SandboxRequest {
                code: "return my_utils.greet('flow');".into(),
                modules,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.value, json!("hi flow"));
    }

    #[tokio::test]
    async fn import_lines_resolve_through_registry() {
        let mut modules = ModuleRegistry::new();
        modules.register(SandboxModule::new(
            "mathlib",
            "exports.add = function(a, b) { return a + b; };",
        ));
        let outcome = runner()
            .run(SandboxRequest {
                code: "import { add } from 'mathlib';\nreturn add(20, 22);".into(),
                modules,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(42));
    }

    #[tokio::test]
    async fn unknown_module_fails_execution() {
        let error = runner()
            .run(request("var x = require('nope'); return x;"))
            .await
            .unwrap_err();
        match error {
            SandboxError::Execution(message) => {
                assert!(message.contains("Cannot find module 'nope'"), "{message}");
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn syntax_error_reports_user_line() {
        let error = runner()
            .run(request("var ok = 1;\nreturn ok +;"))
            .await
            .unwrap_err();
        match error {
            SandboxError::Compile(diagnostics) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].line, 2);
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn runtime_error_propagates_message() {
        let error = runner()
            .run(request("throw new Error('boom');"))
            .await
            .unwrap_err();
        match error {
            SandboxError::Execution(message) => assert!(message.contains("boom"), "{message}"),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn infinite_loop_times_out() {
        let started = Instant::now();
        let error = runner()
            .run(SandboxRequest {
                code: "while (true) {}".into(),
                timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(error, SandboxError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn code_size_cap_is_enforced() {
        let small = CodeRunner::new(SandboxConfig {
            max_code_length: 16,
            ..SandboxConfig::default()
        });
        let error = small
            .run(request("return 'aaaaaaaaaaaaaaaaaaaaaaaa';"))
            .await
            .unwrap_err();
        assert!(matches!(error, SandboxError::CodeTooLarge { max: 16, .. }));
    }

    #[tokio::test]
    async fn output_size_cap_is_enforced() {
        let small = CodeRunner::new(SandboxConfig {
            max_output_bytes: 8,
            ..SandboxConfig::default()
        });
        let error = small
            .run(request("return 'aaaaaaaaaaaaaaaa';"))
            .await
            .unwrap_err();
        assert!(matches!(error, SandboxError::OutputTooLarge { max: 8, .. }));
    }

    #[test]
    fn check_accepts_valid_module_code() {
        assert!(runner().check("exports.x = function() { return 1; };").is_ok());
    }

    #[test]
    fn check_rejects_syntax_errors() {
        let error = runner().check("function broken( {").unwrap_err();
        assert!(matches!(error, SandboxError::Compile(_)));
    }
}
