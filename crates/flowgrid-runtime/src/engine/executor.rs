//! Workflow execution engine.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use flowgrid_sandbox::{CodeRunner, SandboxConfig, SandboxModule, SandboxRequest,
    rewrite_imports, sanitize_identifier};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;

use super::config::EngineConfig;
use super::context::RunContext;
use super::result::{DebugExecutionResult, WorkflowExecutionResult};
use crate::debug::{DebugOptions, DebugStackFrame, DebugState, source_location_from_error};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowGraph;
use crate::item::{ExecutionItem, PairedItem, normalize_output};
use crate::node::{
    CodeConfig, DatabaseConfig, HttpRequestConfig, Node, NodeId, NodeKind, OrganizationId,
    RoutedItems, SubworkflowConfig, WorkflowId, DEFAULT_PORT,
};
use crate::provider::{
    CredentialsService, EmptyNodeRegistry, NoPackages, NodeRegistry, PackageProvider,
    WorkflowStore,
};

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "flowgrid_runtime::engine";

/// Collaborators the engine is constructed with.
///
/// Persistence, credentials, package resolution, and external node
/// packages all live behind these traits; the engine holds no ambient
/// singletons.
#[derive(Clone)]
pub struct EngineServices {
    /// Workflow definition store.
    pub store: Arc<dyn WorkflowStore>,
    /// Per-organization credential source.
    pub credentials: Arc<dyn CredentialsService>,
    /// Organization package resolver for sandbox modules.
    pub packages: Arc<dyn PackageProvider>,
    /// External node type registry.
    pub nodes: Arc<dyn NodeRegistry>,
}

impl EngineServices {
    /// Creates services with no packages and no external node types.
    pub fn new(store: Arc<dyn WorkflowStore>, credentials: Arc<dyn CredentialsService>) -> Self {
        Self {
            store,
            credentials,
            packages: Arc::new(NoPackages),
            nodes: Arc::new(EmptyNodeRegistry),
        }
    }

    /// Sets the package resolver.
    pub fn with_packages(mut self, packages: Arc<dyn PackageProvider>) -> Self {
        self.packages = packages;
        self
    }

    /// Sets the external node registry.
    pub fn with_node_registry(mut self, nodes: Arc<dyn NodeRegistry>) -> Self {
        self.nodes = nodes;
        self
    }
}

/// The workflow execution engine.
///
/// Constructed once per process with its collaborators injected;
/// stateless across calls. Executes one queued node at a time and
/// memoizes per-node outputs, so result accumulation is deterministic.
pub struct Engine {
    config: EngineConfig,
    services: EngineServices,
    runner: CodeRunner,
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig, services: EngineServices) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));
        let runner = CodeRunner::new(SandboxConfig {
            timeout: config.code_timeout,
            ..SandboxConfig::default()
        });

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            code_timeout_ms = config.code_timeout.as_millis() as u64,
            "Workflow engine initialized"
        );

        Self { config, services, runner, http: reqwest::Client::new(), semaphore }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults(services: EngineServices) -> Self {
        Self::new(EngineConfig::default(), services)
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates a workflow graph without executing it.
    pub fn validate(&self, workflow: &WorkflowGraph) -> WorkflowResult<()> {
        workflow.validate()
    }

    /// Returns the number of available execution slots.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Executes a workflow from its trigger node.
    ///
    /// The first node failure halts the entire run; the final output is
    /// the output of the last node executed.
    pub async fn execute_workflow(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        trigger_data: Value,
    ) -> WorkflowResult<WorkflowExecutionResult> {
        let mode = RunMode::default();
        let (ctx, outcome) = self
            .run(workflow_id, organization_id, trigger_data, mode, None, 0)
            .await?;
        Ok(build_result(ctx, outcome, None))
    }

    /// Executes only the nodes the target depends on, halting right after
    /// the target completes. The final output is the target's output.
    pub async fn execute_until_node(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        target: NodeId,
        trigger_data: Value,
    ) -> WorkflowResult<WorkflowExecutionResult> {
        let mode = RunMode { until: Some(target), debug: None };
        let (ctx, outcome) = self
            .run(workflow_id, organization_id, trigger_data, mode, None, 0)
            .await?;
        Ok(build_result(ctx, outcome, Some(target)))
    }

    /// Executes a workflow with breakpoints, pausing and resuming through
    /// caller-held state snapshots.
    pub async fn execute_with_debug(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        options: DebugOptions,
        trigger_data: Value,
    ) -> WorkflowResult<DebugExecutionResult> {
        let DebugOptions { breakpoints, stop_at_node, capture_stack_traces, previous_state } =
            options;
        let mode = RunMode {
            until: None,
            debug: Some(DebugControl { breakpoints, stop_at_node, capture_stack_traces }),
        };
        let (ctx, outcome) = self
            .run(workflow_id, organization_id, trigger_data, mode, previous_state, 0)
            .await?;

        let final_output = ctx.last_executed().and_then(|id| ctx.output_of(id));
        let result = match outcome {
            RunOutcome::Finished => DebugExecutionResult {
                success: true,
                final_output,
                call_stack: ctx.call_stack.clone(),
                node_results: ctx.results,
                ..Default::default()
            },
            RunOutcome::Failed { message } => DebugExecutionResult {
                success: false,
                error: Some(message),
                call_stack: ctx.call_stack.clone(),
                node_results: ctx.results,
                ..Default::default()
            },
            RunOutcome::Paused { node_id, next_node_ids } => DebugExecutionResult {
                success: true,
                final_output,
                is_paused: true,
                paused_at_node_id: Some(node_id),
                next_node_ids,
                call_stack: ctx.call_stack.clone(),
                state: Some(ctx.snapshot()),
                node_results: ctx.results,
                ..Default::default()
            },
        };
        Ok(result)
    }

    /// Loads, validates, and traverses one workflow run.
    async fn run(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        trigger_data: Value,
        mode: RunMode,
        previous_state: Option<DebugState>,
        depth: usize,
    ) -> WorkflowResult<(RunContext, RunOutcome)> {
        // Subworkflow runs execute within the parent's slot.
        let _permit = if depth == 0 {
            Some(self.semaphore.acquire().await.map_err(|e| {
                WorkflowError::Internal(format!("semaphore closed: {e}"))
            })?)
        } else {
            None
        };

        let definition = self.services.store.load(workflow_id, organization_id).await?;
        let graph = WorkflowGraph::from_definition(definition)?;
        graph.validate()?;

        let credentials = self.services.credentials.credentials(organization_id).await?;
        let mut ctx = RunContext::new(credentials, trigger_data);
        if let Some(state) = previous_state {
            ctx.resume(state);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            node_count = graph.node_count(),
            resumed = !ctx.executed.is_empty(),
            "Starting workflow run"
        );

        // Utilities compile before anything else runs; a broken helper
        // module fails the run with no other node executed.
        if let Some((node, message)) = self.prepare_modules(&graph, organization_id, &mut ctx).await?
        {
            ctx.record_failure(&node, message.clone(), 0);
            return Ok((ctx, RunOutcome::Failed { message }));
        }

        let outcome = self.traverse(&graph, &mut ctx, &mode, organization_id, depth).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            executed = ctx.executed.len(),
            outcome = outcome.name(),
            "Workflow run finished"
        );

        Ok((ctx, outcome))
    }

    /// Compiles utility nodes and resolves imported organization packages
    /// into the run's module registry.
    async fn prepare_modules(
        &self,
        graph: &WorkflowGraph,
        organization_id: OrganizationId,
        ctx: &mut RunContext,
    ) -> WorkflowResult<Option<(Node, String)>> {
        for node in graph.nodes() {
            if let NodeKind::Utilities(config) = &node.kind {
                if let Err(error) = self.runner.check(&config.source) {
                    return Ok(Some((node.clone(), error.to_string())));
                }
                ctx.modules.register(SandboxModule::global(
                    sanitize_identifier(&node.label),
                    config.source.clone(),
                ));
            }
        }

        for node in graph.nodes() {
            if let NodeKind::Code(config) = &node.kind {
                for module in rewrite_imports(&config.source).modules {
                    if ctx.modules.contains(&module) {
                        continue;
                    }
                    if let Some(source) =
                        self.services.packages.resolve(organization_id, &module).await?
                    {
                        ctx.modules.register(SandboxModule::new(module, source));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Dependency-gated traversal shared by all execution modes.
    ///
    /// A node is dispatched only once every in-scope direct predecessor
    /// has completed; completing a node releases its successors. Ready
    /// nodes execute one at a time, in a deterministic order.
    async fn traverse(
        &self,
        graph: &WorkflowGraph,
        ctx: &mut RunContext,
        mode: &RunMode,
        organization_id: OrganizationId,
        depth: usize,
    ) -> WorkflowResult<RunOutcome> {
        let trigger = graph.trigger_node()?;
        let scope = match mode.until {
            Some(target) => {
                if !graph.contains_node(target) {
                    return Err(WorkflowError::InvalidDefinition(
                        "target node does not exist in workflow".into(),
                    ));
                }
                let mut scope = graph.transitive_predecessors(target);
                scope.insert(target);
                Some(scope)
            }
            None => None,
        };

        let reachable = graph.reachable_from(trigger);
        let in_scope = |id: NodeId| {
            reachable.contains(&id) && scope.as_ref().is_none_or(|scope| scope.contains(&id))
        };

        // Remaining-predecessor sets per node (Kahn-style gating).
        let mut pending: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        for id in graph.node_ids() {
            if !in_scope(id) || ctx.is_executed(id) {
                continue;
            }
            let waiting: HashSet<NodeId> = graph
                .direct_predecessors(id)
                .into_iter()
                .filter(|&pred| in_scope(pred) && !ctx.is_executed(pred))
                .collect();
            pending.insert(id, waiting);
        }

        let mut queued: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for id in graph.topological_order()? {
            if pending.get(&id).is_some_and(HashSet::is_empty) && queued.insert(id) {
                queue.push_back(id);
            }
        }

        while let Some(node_id) = queue.pop_front() {
            if ctx.is_executed(node_id) {
                continue;
            }
            let node = graph
                .get_node(node_id)
                .ok_or_else(|| WorkflowError::Internal("queued node missing".into()))?
                .clone();

            if let Some(debug) = &mode.debug {
                if debug.stop_at_node.is_none() && debug.breakpoints.contains(&node_id) {
                    return Ok(self.paused(graph, ctx, node_id, &in_scope));
                }
            }

            tracing::debug!(
                target: TRACING_TARGET,
                node_id = %node_id,
                kind = node.kind.name(),
                "Executing node"
            );

            let input = ctx.gather_input(graph, &node);
            let started = Instant::now();
            let dispatched = self
                .dispatch(graph, &node, &input, ctx, organization_id, depth)
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match dispatched {
                Ok(routed) => {
                    ctx.record_success(&node, routed, duration_ms);
                    if mode.debug.is_some() {
                        ctx.call_stack.push(DebugStackFrame {
                            node_id,
                            node_label: node.label.clone(),
                            node_kind: node.kind.name().into(),
                            timestamp: jiff::Timestamp::now(),
                            input: Some(input),
                            output: ctx.output_of(node_id),
                            error: None,
                            source_location: None,
                        });
                    }
                }
                Err(error) => {
                    let message = match error {
                        WorkflowError::NodeFailed { message, .. } => message,
                        other => other.to_string(),
                    };
                    if let Some(debug) = &mode.debug {
                        let source_location = (debug.capture_stack_traces
                            && matches!(node.kind, NodeKind::Code(_)))
                        .then(|| source_location_from_error(&message))
                        .flatten();
                        ctx.call_stack.push(DebugStackFrame {
                            node_id,
                            node_label: node.label.clone(),
                            node_kind: node.kind.name().into(),
                            timestamp: jiff::Timestamp::now(),
                            input: Some(input),
                            output: None,
                            error: Some(message.clone()),
                            source_location,
                        });
                    }
                    tracing::warn!(
                        target: TRACING_TARGET,
                        node_id = %node_id,
                        error = %message,
                        "Node failed; halting run"
                    );
                    ctx.record_failure(&node, message.clone(), duration_ms);
                    return Ok(RunOutcome::Failed { message });
                }
            }

            if mode.until == Some(node_id) {
                return Ok(RunOutcome::Finished);
            }
            if let Some(debug) = &mode.debug {
                if debug.stop_at_node == Some(node_id) {
                    return Ok(self.paused(graph, ctx, node_id, &in_scope));
                }
            }

            for edge in graph.outgoing_edges(node_id) {
                let successor = edge.to;
                if !in_scope(successor) || ctx.is_executed(successor) {
                    continue;
                }
                if let Some(waiting) = pending.get_mut(&successor) {
                    waiting.remove(&node_id);
                    if waiting.is_empty() && queued.insert(successor) {
                        queue.push_back(successor);
                    }
                }
            }
        }

        Ok(RunOutcome::Finished)
    }

    /// Builds a paused outcome with the reachable next nodes.
    fn paused(
        &self,
        graph: &WorkflowGraph,
        ctx: &RunContext,
        node_id: NodeId,
        in_scope: &dyn Fn(NodeId) -> bool,
    ) -> RunOutcome {
        let next_node_ids = graph
            .direct_successors(node_id)
            .into_iter()
            .filter(|&id| in_scope(id) && !ctx.is_executed(id))
            .collect();
        RunOutcome::Paused { node_id, next_node_ids }
    }

    /// Per-node-kind dispatch; identical across execution modes.
    async fn dispatch(
        &self,
        graph: &WorkflowGraph,
        node: &Node,
        input: &[ExecutionItem],
        ctx: &RunContext,
        organization_id: OrganizationId,
        depth: usize,
    ) -> WorkflowResult<RoutedItems> {
        match &node.kind {
            NodeKind::Trigger | NodeKind::Webhook | NodeKind::NoOp | NodeKind::Utilities(_) => {
                Ok(main_port(input.to_vec()))
            }
            NodeKind::Wait(config) => {
                tokio::time::sleep(config.capped_duration()).await;
                Ok(main_port(input.to_vec()))
            }
            NodeKind::Filter(config) => Ok(main_port(config.apply(input)?)),
            NodeKind::Limit(config) => Ok(main_port(config.apply(input))),
            NodeKind::RemoveDuplicates(config) => Ok(main_port(config.apply(input))),
            NodeKind::SplitOut(config) => Ok(main_port(config.apply(input))),
            NodeKind::Aggregate(config) => Ok(main_port(config.apply(input))),
            NodeKind::Summarize(config) => Ok(main_port(config.apply(input))),
            NodeKind::DateTime(config) => Ok(main_port(config.apply(input)?)),
            NodeKind::EditFields(config) => Ok(main_port(config.apply(input)?)),
            NodeKind::Merge(config) => {
                Ok(main_port(config.apply(&ctx.branch_inputs(graph, node.id))))
            }
            NodeKind::If(config) => config.route(input),
            NodeKind::Switch(config) => config.route(input),
            NodeKind::ThrowError(config) => Err(WorkflowError::NodeFailed {
                node_id: node.id,
                message: config.render(),
            }),
            NodeKind::Code(config) => self.run_code(graph, node, config, input, ctx).await,
            NodeKind::HttpRequest(config) => self.run_http(config, input).await,
            NodeKind::Database(config) => self.run_database(config, input, ctx).await,
            NodeKind::ExecuteWorkflow(config) => {
                self.run_subworkflow(node, config, input, organization_id, depth).await
            }
            NodeKind::External(config) => {
                let executor = self.services.nodes.get(&config.type_name).ok_or_else(|| {
                    WorkflowError::InvalidNodeConfig {
                        node_id: node.id,
                        message: format!("unknown node type '{}'", config.type_name),
                    }
                })?;
                let items = executor.execute(node.id, &config.config, input).await?;
                Ok(main_port(items))
            }
        }
    }

    /// Runs a code node inside the sandbox and normalizes its return
    /// value into items.
    async fn run_code(
        &self,
        graph: &WorkflowGraph,
        node: &Node,
        config: &CodeConfig,
        input: &[ExecutionItem],
        ctx: &RunContext,
    ) -> WorkflowResult<RoutedItems> {
        let input_all = serde_json::to_value(input)?;
        let first_item = input
            .first()
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or(Value::Null);
        let first_json = input
            .first()
            .map(ExecutionItem::to_value)
            .unwrap_or(Value::Object(Map::new()));

        let mut bindings = vec![
            ("$input".to_string(), input_all.clone()),
            ("$inputAll".to_string(), input_all),
            ("$inputItem".to_string(), first_item),
            ("$json".to_string(), first_json),
        ];

        // Every ancestor's output is exposed by label, not just direct
        // parents.
        for predecessor in graph.transitive_predecessors(node.id) {
            let Some(predecessor_node) = graph.get_node(predecessor) else {
                continue;
            };
            let Some(output) = ctx.output_of(predecessor) else {
                continue;
            };
            bindings.push((
                sanitize_identifier(&predecessor_node.label),
                serde_json::to_value(output)?,
            ));
        }

        let request = SandboxRequest {
            code: config.source.clone(),
            bindings,
            modules: ctx.modules.clone(),
            timeout: config.timeout().or(Some(self.config.code_timeout)),
            log_prefix: Some(format!("[{}] ", node.label)),
        };

        let outcome = self.runner.run(request).await?;
        for line in &outcome.logs {
            tracing::debug!(target: TRACING_TARGET, "{line}");
        }
        Ok(main_port(normalize_output(outcome.value)))
    }

    /// Runs one HTTP request per input item; failures become error-shaped
    /// items instead of failing the node.
    async fn run_http(
        &self,
        config: &HttpRequestConfig,
        input: &[ExecutionItem],
    ) -> WorkflowResult<RoutedItems> {
        let mut out = Vec::with_capacity(input.len());
        for (index, item) in input.iter().enumerate() {
            let mut result = match self.request_one(config, item).await {
                Ok(item) => item,
                Err((message, status_code)) => {
                    let mut json = Map::new();
                    json.insert("error".into(), Value::from(message));
                    if let Some(status_code) = status_code {
                        json.insert("status_code".into(), Value::from(status_code));
                    }
                    ExecutionItem::from_object(json)
                }
            };
            result.paired_item = Some(PairedItem { item: index });
            out.push(result);
        }
        Ok(main_port(out))
    }

    async fn request_one(
        &self,
        config: &HttpRequestConfig,
        item: &ExecutionItem,
    ) -> Result<ExecutionItem, (String, Option<u16>)> {
        use crate::node::template::interpolate_placeholders;

        let url = interpolate_placeholders(&config.url, Some(item));
        let mut request = self.http.request(config.method.into(), url);
        if let Some(timeout) = config.timeout() {
            request = request.timeout(timeout);
        }
        for (name, template) in &config.headers {
            request = request.header(name.as_str(), interpolate_placeholders(template, Some(item)));
        }
        if let Some(body) = &config.body {
            let body = interpolate_placeholders(body, Some(item));
            request = match serde_json::from_str::<Value>(&body) {
                Ok(json) => request.json(&json),
                Err(_) => request.body(body),
            };
        }

        let response = request
            .send()
            .await
            .map_err(|e| (e.to_string(), e.status().map(|s| s.as_u16())))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|e| (e.to_string(), Some(status.as_u16())))?;

        if !status.is_success() {
            return Err((format!("HTTP {status}"), Some(status.as_u16())));
        }

        if content_type.contains("application/json") {
            if let Ok(json) = serde_json::from_str::<Value>(&text) {
                return Ok(ExecutionItem::from_value(json));
            }
        }
        let mut json = Map::new();
        json.insert("data".into(), Value::from(text));
        json.insert("status_code".into(), Value::from(status.as_u16()));
        Ok(ExecutionItem::from_object(json))
    }

    /// Executes a database statement through a credential connector; the
    /// connector is released whether or not the statement succeeds.
    async fn run_database(
        &self,
        config: &DatabaseConfig,
        input: &[ExecutionItem],
        ctx: &RunContext,
    ) -> WorkflowResult<RoutedItems> {
        let statement = config.statement(input.first())?;
        let connector = ctx.credentials.resolve(&config.credential, config.flavor)?;

        let result = connector.execute(&statement).await;
        connector.disconnect().await;

        let rows = result?;
        Ok(main_port(rows.into_iter().map(ExecutionItem::from_value).collect()))
    }

    /// Runs a referenced workflow with this node's input as its trigger
    /// data.
    async fn run_subworkflow(
        &self,
        node: &Node,
        config: &SubworkflowConfig,
        input: &[ExecutionItem],
        organization_id: OrganizationId,
        depth: usize,
    ) -> WorkflowResult<RoutedItems> {
        if depth + 1 >= self.config.max_subworkflow_depth {
            return Err(WorkflowError::NodeFailed {
                node_id: node.id,
                message: format!(
                    "subworkflow nesting exceeds {} levels",
                    self.config.max_subworkflow_depth
                ),
            });
        }

        let trigger_data = serde_json::to_value(input)?;
        let (child_ctx, outcome) = Box::pin(self.run(
            config.workflow_id,
            organization_id,
            trigger_data,
            RunMode::default(),
            None,
            depth + 1,
        ))
        .await?;

        match outcome {
            RunOutcome::Finished => {
                let output = child_ctx
                    .last_executed()
                    .and_then(|id| child_ctx.output_of(id))
                    .unwrap_or_default();
                Ok(main_port(output))
            }
            RunOutcome::Failed { message } => Err(WorkflowError::NodeFailed {
                node_id: node.id,
                message: format!("subworkflow failed: {message}"),
            }),
            RunOutcome::Paused { .. } => {
                Err(WorkflowError::Internal("subworkflow paused unexpectedly".into()))
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("available_slots", &self.available_slots())
            .finish()
    }
}

/// Per-call execution mode.
#[derive(Debug, Clone, Default)]
struct RunMode {
    /// Halt right after this node completes; traversal is restricted to
    /// its predecessor closure.
    until: Option<NodeId>,
    /// Breakpoint/stepping controls.
    debug: Option<DebugControl>,
}

#[derive(Debug, Clone, Default)]
struct DebugControl {
    breakpoints: HashSet<NodeId>,
    stop_at_node: Option<NodeId>,
    capture_stack_traces: bool,
}

/// How a traversal ended.
#[derive(Debug, Clone)]
enum RunOutcome {
    Finished,
    Failed { message: String },
    Paused { node_id: NodeId, next_node_ids: Vec<NodeId> },
}

impl RunOutcome {
    fn name(&self) -> &'static str {
        match self {
            RunOutcome::Finished => "finished",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::Paused { .. } => "paused",
        }
    }
}

fn main_port(items: Vec<ExecutionItem>) -> RoutedItems {
    RoutedItems::from([(DEFAULT_PORT.to_string(), items)])
}

/// Builds the caller-facing result for full and targeted runs.
fn build_result(
    ctx: RunContext,
    outcome: RunOutcome,
    final_node: Option<NodeId>,
) -> WorkflowExecutionResult {
    match outcome {
        RunOutcome::Finished => {
            let final_output = final_node
                .or(ctx.last_executed())
                .and_then(|id| ctx.output_of(id));
            WorkflowExecutionResult {
                success: true,
                node_results: ctx.results,
                final_output,
                error: None,
            }
        }
        RunOutcome::Failed { message } => WorkflowExecutionResult {
            success: false,
            node_results: ctx.results,
            final_output: None,
            error: Some(message),
        },
        // Pauses only arise in debug mode, which returns through the
        // debug result path.
        RunOutcome::Paused { .. } => WorkflowExecutionResult {
            success: false,
            node_results: ctx.results,
            final_output: None,
            error: Some("run paused unexpectedly".into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::engine::result::NodeStatus;
    use crate::graph::{Edge, WorkflowDefinition, WorkflowMetadata};
    use crate::node::{
        CombineMode, Condition, ConditionOperator, DataFlavor, DataStatement, EditFieldsConfig,
        EditOperation, IfConfig, SplitOutConfig, ThrowErrorConfig, UtilitiesConfig, WaitConfig,
    };
    use crate::provider::{
        CredentialsRegistry, DataConnector, ExternalNodeExecutor, InMemoryWorkflowStore,
        StaticCredentials,
    };

    struct Fixture {
        engine: Engine,
        store: Arc<InMemoryWorkflowStore>,
        organization_id: OrganizationId,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_credentials(CredentialsRegistry::new())
        }

        fn with_credentials(credentials: CredentialsRegistry) -> Self {
            let store = Arc::new(InMemoryWorkflowStore::new());
            let services = EngineServices::new(
                store.clone(),
                Arc::new(StaticCredentials::new(credentials)),
            );
            Self {
                engine: Engine::with_defaults(services),
                store,
                organization_id: OrganizationId::new(),
            }
        }

        async fn save(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowId {
            let workflow_id = WorkflowId::new();
            self.store
                .insert(workflow_id, self.organization_id, WorkflowDefinition {
                    nodes,
                    edges,
                    metadata: WorkflowMetadata::default(),
                })
                .await;
            workflow_id
        }
    }

    fn trigger() -> Node {
        Node::new("Start", NodeKind::Trigger)
    }

    fn noop(label: &str) -> Node {
        Node::new(label, NodeKind::NoOp)
    }

    fn set_field(label: &str, field: &str, value: Value) -> Node {
        Node::new(
            label,
            NodeKind::EditFields(EditFieldsConfig {
                operations: vec![EditOperation::Set { field: field.into(), value, coerce: None }],
                keep_only_set: true,
            }),
        )
    }

    fn code(label: &str, source: &str) -> Node {
        Node::new(
            label,
            NodeKind::Code(CodeConfig { source: source.into(), timeout_ms: None }),
        )
    }

    fn split(field: &str) -> Node {
        Node::new(
            "Split",
            NodeKind::SplitOut(SplitOutConfig { field: field.into(), include_other_fields: false }),
        )
    }

    #[tokio::test]
    async fn full_run_executes_linear_graph() {
        let fixture = Fixture::new();
        let start = trigger();
        let expand = split("items");
        let keep = Node::new(
            "Keep big",
            NodeKind::Filter(crate::node::FilterConfig {
                conditions: vec![Condition::new(
                    "items.v",
                    ConditionOperator::GreaterThan,
                    json!(1),
                )],
                combine: CombineMode::And,
            }),
        );
        let edges = vec![Edge::new(start.id, expand.id), Edge::new(expand.id, keep.id)];
        let keep_id = keep.id;
        let workflow_id = fixture.save(vec![start, expand, keep], edges).await;

        let result = fixture
            .engine
            .execute_workflow(
                workflow_id,
                fixture.organization_id,
                json!({ "items": [ { "v": 1 }, { "v": 2 }, { "v": 3 } ] }),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.node_results.len(), 3);
        assert!(result
            .node_results
            .values()
            .all(|node| node.status == NodeStatus::Completed));
        let final_output = result.final_output.unwrap();
        assert_eq!(final_output.len(), 2);
        assert_eq!(result.node_results[&keep_id].output.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fan_in_concatenates_in_connection_order() {
        let fixture = Fixture::new();
        let start = trigger();
        let p1 = set_field("P1", "a", json!(1));
        let p2 = set_field("P2", "a", json!(2));
        let sink = noop("Sink");
        let sink_id = sink.id;
        let edges = vec![
            Edge::new(start.id, p1.id),
            Edge::new(start.id, p2.id),
            Edge::new(p1.id, sink.id),
            Edge::new(p2.id, sink.id),
        ];
        let workflow_id = fixture.save(vec![start, p1, p2, sink], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(result.success);
        let output = result.node_results[&sink_id].output.clone().unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].to_value(), json!({ "a": 1 }));
        assert_eq!(output[1].to_value(), json!({ "a": 2 }));
    }

    #[tokio::test]
    async fn until_node_halts_exactly_at_target() {
        let fixture = Fixture::new();
        let start = trigger();
        let a = set_field("A", "step", json!("a"));
        let b = set_field("B", "step", json!("b"));
        let c = set_field("C", "step", json!("c"));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let edges = vec![
            Edge::new(start.id, a.id),
            Edge::new(a.id, b.id),
            Edge::new(b.id, c.id),
        ];
        let workflow_id = fixture.save(vec![start, a, b, c], edges).await;

        let result = fixture
            .engine
            .execute_until_node(workflow_id, fixture.organization_id, b_id, json!({}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.node_results.len(), 3);
        assert!(result.node_results.contains_key(&a_id));
        assert!(result.node_results.contains_key(&b_id));
        assert!(!result.node_results.contains_key(&c_id));
        let final_output = result.final_output.unwrap();
        assert_eq!(final_output[0].to_value(), json!({ "step": "b" }));
    }

    #[tokio::test]
    async fn node_failure_aborts_the_run() {
        let fixture = Fixture::new();
        let start = trigger();
        let boom = Node::new(
            "Boom",
            NodeKind::ThrowError(ThrowErrorConfig { message: "stop here".into(), error_type: None }),
        );
        let after = noop("After");
        let (start_id, boom_id, after_id) = (start.id, boom.id, after.id);
        let edges = vec![Edge::new(start.id, boom.id), Edge::new(boom.id, after.id)];
        let workflow_id = fixture.save(vec![start, boom, after], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("stop here"));
        assert_eq!(result.node_results[&start_id].status, NodeStatus::Completed);
        assert_eq!(result.node_results[&boom_id].status, NodeStatus::Failed);
        assert!(!result.node_results.contains_key(&after_id));
    }

    #[tokio::test]
    async fn breakpoint_pauses_then_resumes() {
        let fixture = Fixture::new();
        let start = trigger();
        let a = set_field("A", "step", json!("a"));
        let b = set_field("B", "step", json!("b"));
        let (a_id, b_id) = (a.id, b.id);
        let edges = vec![Edge::new(start.id, a.id), Edge::new(a.id, b.id)];
        let workflow_id = fixture.save(vec![start, a, b], edges).await;

        let paused = fixture
            .engine
            .execute_with_debug(
                workflow_id,
                fixture.organization_id,
                DebugOptions { breakpoints: HashSet::from([b_id]), ..Default::default() },
                json!({}),
            )
            .await
            .unwrap();

        assert!(paused.is_paused);
        assert_eq!(paused.paused_at_node_id, Some(b_id));
        assert!(paused.next_node_ids.is_empty());
        assert!(!paused.node_results.contains_key(&b_id));
        let state = paused.state.unwrap();
        assert_eq!(state.last_executed_node_id, Some(a_id));

        let resumed = fixture
            .engine
            .execute_with_debug(
                workflow_id,
                fixture.organization_id,
                DebugOptions { previous_state: Some(state), ..Default::default() },
                Value::Null,
            )
            .await
            .unwrap();

        assert!(!resumed.is_paused);
        assert!(resumed.success);
        assert_eq!(resumed.node_results[&b_id].status, NodeStatus::Completed);
        assert_eq!(
            resumed.final_output.unwrap()[0].to_value(),
            json!({ "step": "b" })
        );
    }

    #[tokio::test]
    async fn stop_at_node_single_steps() {
        let fixture = Fixture::new();
        let start = trigger();
        let a = noop("A");
        let (start_id, a_id) = (start.id, a.id);
        let edges = vec![Edge::new(start.id, a.id)];
        let workflow_id = fixture.save(vec![start, a], edges).await;

        let stepped = fixture
            .engine
            .execute_with_debug(
                workflow_id,
                fixture.organization_id,
                DebugOptions { stop_at_node: Some(start_id), ..Default::default() },
                json!({ "k": 1 }),
            )
            .await
            .unwrap();

        assert!(stepped.is_paused);
        assert_eq!(stepped.paused_at_node_id, Some(start_id));
        assert_eq!(stepped.next_node_ids, vec![a_id]);
        assert_eq!(stepped.node_results[&start_id].status, NodeStatus::Completed);
        assert_eq!(stepped.call_stack.len(), 1);
        assert_eq!(stepped.call_stack[0].node_kind, "trigger");
    }

    #[tokio::test]
    async fn code_return_values_normalize() {
        let fixture = Fixture::new();
        let start = trigger();
        let compute = code("Compute", "return 42;");
        let edges = vec![Edge::new(start.id, compute.id)];
        let workflow_id = fixture.save(vec![start, compute], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.final_output.unwrap()[0].to_value(), json!({ "value": 42 }));

        let start = trigger();
        let listing = code("List", "return [{ x: 1 }, { x: 2 }];");
        let edges = vec![Edge::new(start.id, listing.id)];
        let workflow_id = fixture.save(vec![start, listing], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();
        let output = result.final_output.unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].to_value(), json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn code_sees_ancestor_outputs_by_label() {
        let fixture = Fixture::new();
        let start = trigger();
        let users = set_field("Fetch Users", "a", json!(41));
        let compute = code("Compute", "return Fetch_Users[0].json.a + 1;");
        let edges = vec![Edge::new(start.id, users.id), Edge::new(users.id, compute.id)];
        let workflow_id = fixture.save(vec![start, users, compute], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.final_output.unwrap()[0].to_value(), json!({ "value": 42 }));
    }

    #[tokio::test]
    async fn infinite_code_times_out_within_bounds() {
        let fixture = Fixture::new();
        let start = trigger();
        let spin = Node::new(
            "Spin",
            NodeKind::Code(CodeConfig { source: "while (true) {}".into(), timeout_ms: Some(50) }),
        );
        let spin_id = spin.id;
        let edges = vec![Edge::new(start.id, spin.id)];
        let workflow_id = fixture.save(vec![start, spin], edges).await;

        let started = Instant::now();
        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        let error = result.node_results[&spin_id].error.clone().unwrap();
        assert!(error.contains("Execution timeout"), "{error}");
    }

    #[tokio::test]
    async fn cyclic_graph_fails_before_executing() {
        let fixture = Fixture::new();
        let start = trigger();
        let a = noop("A");
        let b = noop("B");
        let edges = vec![
            Edge::new(start.id, a.id),
            Edge::new(a.id, b.id),
            Edge::new(b.id, a.id),
        ];
        let workflow_id = fixture.save(vec![start, a, b], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await;
        assert!(matches!(result, Err(WorkflowError::CyclicGraph)));
    }

    #[tokio::test]
    async fn missing_workflow_is_a_hard_error() {
        let fixture = Fixture::new();
        let result = fixture
            .engine
            .execute_workflow(WorkflowId::new(), fixture.organization_id, json!({}))
            .await;
        assert!(matches!(result, Err(WorkflowError::WorkflowNotFound)));
    }

    #[tokio::test]
    async fn missing_trigger_is_a_hard_error() {
        let fixture = Fixture::new();
        let workflow_id = fixture.save(vec![noop("A")], vec![]).await;
        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await;
        assert!(matches!(result, Err(WorkflowError::MissingTrigger)));
    }

    #[tokio::test]
    async fn broken_utilities_abort_before_any_node() {
        let fixture = Fixture::new();
        let start = trigger();
        let helpers = Node::new(
            "Helpers",
            NodeKind::Utilities(UtilitiesConfig { source: "function broken( {".into() }),
        );
        let (start_id, helpers_id) = (start.id, helpers.id);
        let workflow_id = fixture.save(vec![start, helpers], vec![]).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.node_results.len(), 1);
        assert_eq!(result.node_results[&helpers_id].status, NodeStatus::Failed);
        assert!(!result.node_results.contains_key(&start_id));
    }

    #[tokio::test]
    async fn utilities_module_reaches_code_nodes() {
        let fixture = Fixture::new();
        let start = trigger();
        let helpers = Node::new(
            "helpers",
            NodeKind::Utilities(UtilitiesConfig {
                source: "exports.double = function(x) { return x * 2; };".into(),
            }),
        );
        let compute = code("Compute", "return helpers.double(21);");
        let edges = vec![Edge::new(start.id, compute.id)];
        let workflow_id = fixture.save(vec![start, helpers, compute], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.final_output.unwrap()[0].to_value(), json!({ "value": 42 }));
    }

    #[tokio::test]
    async fn conditional_ports_route_downstream() {
        let fixture = Fixture::new();
        let start = trigger();
        let expand = split("items");
        let branch = Node::new(
            "Branch",
            NodeKind::If(IfConfig {
                conditions: vec![Condition::new(
                    "items.v",
                    ConditionOperator::GreaterThan,
                    json!(1),
                )],
                combine: CombineMode::And,
            }),
        );
        let matched = noop("Matched");
        let rest = noop("Rest");
        let (matched_id, rest_id) = (matched.id, rest.id);
        let edges = vec![
            Edge::new(start.id, expand.id),
            Edge::new(expand.id, branch.id),
            Edge::new(branch.id, matched.id).from_port("true"),
            Edge::new(branch.id, rest.id).from_port("false"),
        ];
        let workflow_id = fixture.save(vec![start, expand, branch, matched, rest], edges).await;

        let result = fixture
            .engine
            .execute_workflow(
                workflow_id,
                fixture.organization_id,
                json!({ "items": [ { "v": 1 }, { "v": 2 }, { "v": 3 } ] }),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.node_results[&matched_id].output.as_ref().unwrap().len(), 2);
        assert_eq!(result.node_results[&rest_id].output.as_ref().unwrap().len(), 1);
    }

    struct RecordingConnector {
        rows: Vec<Value>,
        statement: StdMutex<Option<DataStatement>>,
        disconnected: AtomicBool,
    }

    impl RecordingConnector {
        fn new(rows: Vec<Value>) -> Self {
            Self { rows, statement: StdMutex::new(None), disconnected: AtomicBool::new(false) }
        }
    }

    #[async_trait]
    impl DataConnector for RecordingConnector {
        fn flavor(&self) -> DataFlavor {
            DataFlavor::Postgres
        }

        async fn execute(&self, statement: &DataStatement) -> WorkflowResult<Vec<Value>> {
            *self.statement.lock().unwrap() = Some(statement.clone());
            Ok(self.rows.clone())
        }

        async fn disconnect(&self) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn database_node_queries_and_releases_connector() {
        let connector = Arc::new(RecordingConnector::new(vec![json!({ "id": 1, "name": "ada" })]));
        let mut credentials = CredentialsRegistry::new();
        credentials.register("main-db", connector.clone());
        let fixture = Fixture::with_credentials(credentials);

        let start = trigger();
        let query = Node::new(
            "Load user",
            NodeKind::Database(DatabaseConfig {
                flavor: DataFlavor::Postgres,
                credential: "main-db".into(),
                query: Some("SELECT * FROM users WHERE id = {{ $json.id }}".into()),
                collection: None,
                operation: None,
                command: None,
                key: None,
                value: None,
            }),
        );
        let edges = vec![Edge::new(start.id, query.id)];
        let workflow_id = fixture.save(vec![start, query], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({ "id": 7 }))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(
            result.final_output.unwrap()[0].to_value(),
            json!({ "id": 1, "name": "ada" })
        );
        assert_eq!(
            *connector.statement.lock().unwrap(),
            Some(DataStatement::Query { text: "SELECT * FROM users WHERE id = 7".into() })
        );
        assert!(connector.disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_credential_fails_the_node() {
        let fixture = Fixture::new();
        let start = trigger();
        let query = Node::new(
            "Load",
            NodeKind::Database(DatabaseConfig {
                flavor: DataFlavor::Redis,
                credential: "cache".into(),
                query: None,
                collection: None,
                operation: None,
                command: Some("get".into()),
                key: Some("k".into()),
                value: None,
            }),
        );
        let query_id = query.id;
        let edges = vec![Edge::new(start.id, query.id)];
        let workflow_id = fixture.save(vec![start, query], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(!result.success);
        let error = result.node_results[&query_id].error.clone().unwrap();
        assert!(error.contains("cache"), "{error}");
    }

    #[tokio::test]
    async fn subworkflow_feeds_input_as_trigger_data() {
        let fixture = Fixture::new();

        let child_start = trigger();
        let child_mark = code("Mark", "return { from_child: $json.value.length };");
        let child_edges = vec![Edge::new(child_start.id, child_mark.id)];
        let child_id = fixture.save(vec![child_start, child_mark], child_edges).await;

        let start = trigger();
        let expand = split("items");
        let call = Node::new(
            "Call child",
            NodeKind::ExecuteWorkflow(SubworkflowConfig { workflow_id: child_id }),
        );
        let edges = vec![Edge::new(start.id, expand.id), Edge::new(expand.id, call.id)];
        let workflow_id = fixture.save(vec![start, expand, call], edges).await;

        let result = fixture
            .engine
            .execute_workflow(
                workflow_id,
                fixture.organization_id,
                json!({ "items": [1, 2, 3] }),
            )
            .await
            .unwrap();

        // The child's trigger data is the parent node's input item list,
        // wrapped under `value` by the trigger item.
        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.final_output.unwrap()[0].to_value(),
            json!({ "from_child": 3 })
        );
    }

    struct UppercaseExecutor;

    #[async_trait]
    impl ExternalNodeExecutor for UppercaseExecutor {
        async fn execute(
            &self,
            _node_id: NodeId,
            config: &Value,
            items: &[ExecutionItem],
        ) -> WorkflowResult<Vec<ExecutionItem>> {
            let field = config["field"].as_str().unwrap_or("value");
            Ok(items
                .iter()
                .map(|item| {
                    let mut out = item.clone();
                    if let Some(Value::String(text)) = item.get_path(field).cloned() {
                        out.set_path(field, Value::from(text.to_uppercase()));
                    }
                    out
                })
                .collect())
        }
    }

    struct SingleNodeRegistry(Arc<dyn ExternalNodeExecutor>);

    impl NodeRegistry for SingleNodeRegistry {
        fn contains(&self, type_name: &str) -> bool {
            type_name == "uppercase"
        }

        fn get(&self, type_name: &str) -> Option<Arc<dyn ExternalNodeExecutor>> {
            self.contains(type_name).then(|| self.0.clone())
        }
    }

    #[tokio::test]
    async fn external_nodes_dispatch_through_registry() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let services = EngineServices::new(
            store.clone(),
            Arc::new(StaticCredentials::new(CredentialsRegistry::new())),
        )
        .with_node_registry(Arc::new(SingleNodeRegistry(Arc::new(UppercaseExecutor))));
        let engine = Engine::with_defaults(services);
        let organization_id = OrganizationId::new();

        let start = trigger();
        let custom = Node::new(
            "Shout",
            NodeKind::External(crate::node::ExternalConfig {
                type_name: "uppercase".into(),
                config: json!({ "field": "name" }),
            }),
        );
        let edges = vec![Edge::new(start.id, custom.id)];
        let workflow_id = WorkflowId::new();
        store
            .insert(workflow_id, organization_id, WorkflowDefinition {
                nodes: vec![start, custom],
                edges,
                metadata: WorkflowMetadata::default(),
            })
            .await;

        let result = engine
            .execute_workflow(workflow_id, organization_id, json!({ "name": "ada" }))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(
            result.final_output.unwrap()[0].get_path("name"),
            Some(&json!("ADA"))
        );
    }

    #[tokio::test]
    async fn unknown_external_type_fails_the_node() {
        let fixture = Fixture::new();
        let start = trigger();
        let custom = Node::new(
            "Mystery",
            NodeKind::External(crate::node::ExternalConfig {
                type_name: "mystery".into(),
                config: json!({}),
            }),
        );
        let custom_id = custom.id;
        let edges = vec![Edge::new(start.id, custom.id)];
        let workflow_id = fixture.save(vec![start, custom], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.node_results[&custom_id]
            .error
            .as_ref()
            .unwrap()
            .contains("mystery"));
    }

    #[tokio::test]
    async fn wait_node_passes_input_through() {
        let fixture = Fixture::new();
        let start = trigger();
        let pause = Node::new("Pause", NodeKind::Wait(WaitConfig { duration_ms: 10 }));
        let edges = vec![Edge::new(start.id, pause.id)];
        let workflow_id = fixture.save(vec![start, pause], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({ "k": 1 }))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.final_output.unwrap()[0].to_value(), json!({ "k": 1 }));
    }

    #[tokio::test]
    async fn http_failures_become_error_items() {
        let fixture = Fixture::new();
        let start = trigger();
        // Nothing listens here; the request fails per item and the node
        // still completes.
        let fetch = Node::new(
            "Fetch",
            NodeKind::HttpRequest(HttpRequestConfig {
                method: crate::node::HttpMethod::Get,
                url: "http://127.0.0.1:1/unreachable".into(),
                headers: Default::default(),
                body: None,
                timeout_ms: Some(2_000),
            }),
        );
        let fetch_id = fetch.id;
        let edges = vec![Edge::new(start.id, fetch.id)];
        let workflow_id = fixture.save(vec![start, fetch], edges).await;

        let result = fixture
            .engine
            .execute_workflow(workflow_id, fixture.organization_id, json!({}))
            .await
            .unwrap();

        assert!(result.success);
        let output = result.node_results[&fetch_id].output.clone().unwrap();
        assert_eq!(output.len(), 1);
        assert!(output[0].get_path("error").is_some());
        assert_eq!(output[0].paired_item, Some(PairedItem { item: 0 }));
    }
}
