//! Dataflow graph pipelines with branching, routing, and merging.
//!
//! A [`GraphPipeline`] is a named set of nodes wired by [`PortRef`]
//! references. The reserved name `input` refers to the payload handed to
//! [`GraphExecutor::exec`]. Switch nodes route their input down exactly
//! one output port; merge nodes combine branches; any nodes reconcile
//! mutually exclusive branches back into one stream.

use crate::data::Data;
use crate::step::{PipelineError, PipelineStepRunner, StepConfig, StepRegistry};
use crate::switch::{SwitchConfig, SwitchFn, SwitchRegistry};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Name of the implicit source node carrying the executor's input payload.
pub const INPUT_NODE: &str = "input";

/// Errors raised while building or executing graph pipelines.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node {0:?} is not defined")]
    UnknownNode(String),

    #[error("node {0:?} is already defined")]
    DuplicateNode(String),

    #[error("invalid node name {0:?}")]
    InvalidNodeName(String),

    #[error("invalid port reference {0:?}")]
    InvalidPort(String),

    #[error("graph contains a cycle")]
    Cycle,

    #[error("merge node {node:?}: branches disagree on key {key:?}")]
    KeyCollision { node: String, key: String },

    #[error("any node {node:?}: more than one branch produced data")]
    AmbiguousAny { node: String },

    #[error("no data reached the graph output")]
    NoOutput,

    #[error("switch node {node:?} selected port {selected} but has {outputs} outputs")]
    SwitchOutOfRange {
        node: String,
        selected: usize,
        outputs: usize,
    },

    #[error("unknown switch type {0:?}")]
    UnknownSwitchType(String),

    #[error("switch evaluation failed: {0}")]
    Switch(String),
}

/// Reference to a node's output, optionally naming one port of a switch.
///
/// The text form is `name` for whole-node outputs and `name/2` for port 2
/// of a switch node, which is why node names must not contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: String,
    pub port: Option<usize>,
}

impl PortRef {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: None,
        }
    }

    pub fn port(node: impl Into<String>, port: usize) -> Self {
        Self {
            node: node.into(),
            port: Some(port),
        }
    }

    /// The executor input.
    pub fn input() -> Self {
        Self::new(INPUT_NODE)
    }
}

impl From<&str> for PortRef {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            None => f.write_str(&self.node),
            Some(port) => write!(f, "{}/{}", self.node, port),
        }
    }
}

impl FromStr for PortRef {
    type Err = GraphError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.split_once('/') {
            None => Ok(Self::new(text)),
            Some((node, port)) => {
                if node.is_empty() || port.contains('/') {
                    return Err(GraphError::InvalidPort(text.to_string()));
                }
                let port = port
                    .parse()
                    .map_err(|_| GraphError::InvalidPort(text.to_string()))?;
                Ok(Self::port(node, port))
            }
        }
    }
}

impl Serialize for PortRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(|e: GraphError| D::Error::custom(e))
    }
}

/// One node of a graph pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphNode {
    /// Run a step on one upstream output.
    Step { input: PortRef, step: StepConfig },
    /// Combine several branches into one payload.
    Merge { inputs: Vec<PortRef> },
    /// Route the input down exactly one output port.
    Switch { input: PortRef, switch: SwitchConfig },
    /// Pass through whichever single branch produced data.
    Any { inputs: Vec<PortRef> },
}

impl GraphNode {
    fn inputs(&self) -> Vec<&PortRef> {
        match self {
            GraphNode::Step { input, .. } | GraphNode::Switch { input, .. } => vec![input],
            GraphNode::Merge { inputs } | GraphNode::Any { inputs } => inputs.iter().collect(),
        }
    }
}

/// Declarative dataflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPipeline {
    pub nodes: IndexMap<String, GraphNode>,
    pub output: PortRef,
}

impl GraphPipeline {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            output: PortRef::input(),
        }
    }

    fn add(mut self, name: impl Into<String>, node: GraphNode) -> Result<Self, GraphError> {
        let name = name.into();
        if name == INPUT_NODE || name.contains('/') || name.is_empty() {
            return Err(GraphError::InvalidNodeName(name));
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        self.nodes.insert(name, node);
        Ok(self)
    }

    /// Add a step node reading from `input`.
    pub fn then(
        self,
        name: impl Into<String>,
        input: impl Into<PortRef>,
        step: StepConfig,
    ) -> Result<Self, GraphError> {
        self.add(
            name,
            GraphNode::Step {
                input: input.into(),
                step,
            },
        )
    }

    /// Add a merge node combining several branches.
    pub fn merge(
        self,
        name: impl Into<String>,
        inputs: Vec<PortRef>,
    ) -> Result<Self, GraphError> {
        self.add(name, GraphNode::Merge { inputs })
    }

    /// Add a switch node routing `input` down one port.
    pub fn switch(
        self,
        name: impl Into<String>,
        input: impl Into<PortRef>,
        switch: SwitchConfig,
    ) -> Result<Self, GraphError> {
        self.add(
            name,
            GraphNode::Switch {
                input: input.into(),
                switch,
            },
        )
    }

    /// Add an any node reconciling mutually exclusive branches.
    pub fn any(self, name: impl Into<String>, inputs: Vec<PortRef>) -> Result<Self, GraphError> {
        self.add(name, GraphNode::Any { inputs })
    }

    /// Declare which node output the executor returns.
    pub fn output(mut self, output: impl Into<PortRef>) -> Self {
        self.output = output.into();
        self
    }

    /// Validate the graph and instantiate every runner and switch
    /// function up front. Nodes that cannot reach the output are logged
    /// and excluded rather than instantiated.
    pub fn executor(
        &self,
        steps: &StepRegistry,
        switches: &SwitchRegistry,
    ) -> Result<GraphExecutor, PipelineError> {
        self.validate_refs()?;
        let reachable = self.reachable_nodes();
        let order = self.topological_order(&reachable)?;

        // Switch fan-out counts are only known once the functions exist,
        // so port bounds are checked after instantiation.
        let mut nodes: IndexMap<String, ExecNode> = IndexMap::new();
        for name in &order {
            let node = &self.nodes[name];
            let exec_node = match node {
                GraphNode::Step { input, step } => ExecNode::Step {
                    input: input.clone(),
                    config: step.clone(),
                    runner: steps.runner(step)?,
                },
                GraphNode::Merge { inputs } => ExecNode::Merge {
                    inputs: inputs.clone(),
                },
                GraphNode::Switch { input, switch } => ExecNode::Switch {
                    input: input.clone(),
                    switch: switches.switch_fn(switch)?,
                },
                GraphNode::Any { inputs } => ExecNode::Any {
                    inputs: inputs.clone(),
                },
            };
            nodes.insert(name.clone(), exec_node);
        }
        self.validate_ports(&nodes)?;

        Ok(GraphExecutor {
            order,
            nodes,
            output: self.output.clone(),
            closed: false,
        })
    }

    /// Every reference must name the input node or a defined node.
    fn validate_refs(&self) -> Result<(), GraphError> {
        let check = |port: &PortRef| {
            if port.node != INPUT_NODE && !self.nodes.contains_key(&port.node) {
                return Err(GraphError::UnknownNode(port.node.clone()));
            }
            Ok(())
        };
        for node in self.nodes.values() {
            for input in node.inputs() {
                check(input)?;
            }
        }
        check(&self.output)
    }

    /// Port-qualified references are only valid on switch nodes and must
    /// stay below the switch's fan-out.
    fn validate_ports(&self, nodes: &IndexMap<String, ExecNode>) -> Result<(), GraphError> {
        let check = |port: &PortRef| {
            let Some(selected) = port.port else {
                return Ok(());
            };
            match nodes.get(&port.node) {
                Some(ExecNode::Switch { switch, .. }) => {
                    let outputs = switch.num_outputs();
                    if selected >= outputs {
                        return Err(GraphError::InvalidPort(port.to_string()));
                    }
                    Ok(())
                }
                // Unreachable switches were never instantiated; their
                // ports are not used either, so nothing to check.
                None => Ok(()),
                Some(_) => Err(GraphError::InvalidPort(port.to_string())),
            }
        };
        for node in self.nodes.values() {
            for input in node.inputs() {
                check(input)?;
            }
        }
        check(&self.output)
    }

    /// Walk backwards from the output and keep only contributing nodes.
    fn reachable_nodes(&self) -> HashMap<String, bool> {
        let mut reachable: HashMap<String, bool> =
            self.nodes.keys().map(|k| (k.clone(), false)).collect();
        let mut queue = VecDeque::new();
        if self.output.node != INPUT_NODE {
            queue.push_back(self.output.node.clone());
        }
        while let Some(name) = queue.pop_front() {
            match reachable.get_mut(&name) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            if let Some(node) = self.nodes.get(&name) {
                for input in node.inputs() {
                    if input.node != INPUT_NODE {
                        queue.push_back(input.node.clone());
                    }
                }
            }
        }
        for (name, seen) in &reachable {
            if !*seen {
                warn!(node = %name, "graph node does not reach the output, excluding it");
            }
        }
        reachable
    }

    /// Kahn's algorithm over the reachable subgraph.
    fn topological_order(
        &self,
        reachable: &HashMap<String, bool>,
    ) -> Result<Vec<String>, GraphError> {
        let live = |name: &str| reachable.get(name).copied().unwrap_or(false);

        let mut indegree: IndexMap<&str, usize> = IndexMap::new();
        let mut downstream: HashMap<&str, Vec<&str>> = HashMap::new();
        for (name, node) in &self.nodes {
            if !live(name) {
                continue;
            }
            let mut degree = 0;
            for input in node.inputs() {
                if input.node != INPUT_NODE {
                    degree += 1;
                    downstream.entry(&input.node).or_default().push(name);
                }
            }
            indegree.insert(name, degree);
        }

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut order = Vec::with_capacity(indegree.len());
        while let Some(name) = queue.pop_front() {
            order.push(name.to_string());
            for &next in downstream.get(name).into_iter().flatten() {
                if let Some(degree) = indegree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }
        if order.len() != indegree.len() {
            return Err(GraphError::Cycle);
        }
        Ok(order)
    }
}

impl Default for GraphPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
enum ExecNode {
    Step {
        input: PortRef,
        config: StepConfig,
        runner: Box<dyn PipelineStepRunner>,
    },
    Merge {
        inputs: Vec<PortRef>,
    },
    Switch {
        input: PortRef,
        switch: Box<dyn SwitchFn>,
    },
    Any {
        inputs: Vec<PortRef>,
    },
}

/// A live graph pipeline.
#[derive(Debug)]
pub struct GraphExecutor {
    order: Vec<String>,
    nodes: IndexMap<String, ExecNode>,
    output: PortRef,
    closed: bool,
}

impl GraphExecutor {
    /// Run the payload through the graph and return whatever reaches the
    /// declared output.
    pub fn exec(&mut self, input: Data) -> Result<Data, PipelineError> {
        if self.closed {
            return Err(PipelineError::ClosedRunner);
        }

        // One result slot per node; None means the node was skipped
        // because its branch was not taken this run.
        let mut results: HashMap<String, Option<Data>> = HashMap::new();
        let mut choices: HashMap<String, usize> = HashMap::new();
        results.insert(INPUT_NODE.to_string(), Some(input));

        for name in &self.order {
            let node = self.nodes.get_mut(name).ok_or_else(|| {
                PipelineError::Graph(GraphError::UnknownNode(name.clone()))
            })?;
            let result = match node {
                ExecNode::Step {
                    input,
                    config,
                    runner,
                } => match resolve(&results, &choices, input) {
                    None => None,
                    Some(data) => {
                        config.validate_inputs(&data)?;
                        Some(runner.exec(data)?)
                    }
                },
                ExecNode::Switch { input, switch } => match resolve(&results, &choices, input) {
                    None => None,
                    Some(data) => {
                        let selected = switch.select(&data)?;
                        let outputs = switch.num_outputs();
                        if selected >= outputs {
                            return Err(PipelineError::Graph(GraphError::SwitchOutOfRange {
                                node: name.clone(),
                                selected,
                                outputs,
                            }));
                        }
                        choices.insert(name.clone(), selected);
                        Some(data)
                    }
                },
                ExecNode::Merge { inputs } => {
                    let mut branches = Vec::with_capacity(inputs.len());
                    let mut complete = true;
                    for input in inputs.iter() {
                        match resolve(&results, &choices, input) {
                            Some(data) => branches.push(data),
                            None => complete = false,
                        }
                    }
                    if complete {
                        Some(merge_branches(name, branches)?)
                    } else {
                        None
                    }
                }
                ExecNode::Any { inputs } => {
                    let mut produced = Vec::new();
                    for input in inputs.iter() {
                        if let Some(data) = resolve(&results, &choices, input) {
                            produced.push(data);
                        }
                    }
                    match produced.len() {
                        0 => None,
                        1 => produced.pop(),
                        _ => {
                            return Err(PipelineError::Graph(GraphError::AmbiguousAny {
                                node: name.clone(),
                            }));
                        }
                    }
                }
            };
            results.insert(name.clone(), result);
        }

        resolve(&results, &choices, &self.output)
            .ok_or(PipelineError::Graph(GraphError::NoOutput))
    }

    /// Close every runner. Idempotent; further [`exec`](Self::exec) calls
    /// fail with [`PipelineError::ClosedRunner`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for node in self.nodes.values_mut() {
            if let ExecNode::Step { runner, .. } = node {
                runner.close();
            }
        }
    }
}

impl Drop for GraphExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Look up the data available at a port, if that branch was taken.
fn resolve(
    results: &HashMap<String, Option<Data>>,
    choices: &HashMap<String, usize>,
    port: &PortRef,
) -> Option<Data> {
    let value = results.get(&port.node)?.clone()?;
    match port.port {
        None => Some(value),
        Some(selected) => (choices.get(&port.node) == Some(&selected)).then_some(value),
    }
}

/// Union of all branch payloads. Keys shared with equal values collapse
/// silently (pass-through makes shared upstream keys routine); keys with
/// differing values are a collision.
fn merge_branches(node: &str, branches: Vec<Data>) -> Result<Data, PipelineError> {
    let mut branches = branches.into_iter();
    let mut merged = branches.next().unwrap_or_default();
    for branch in branches {
        for (key, value) in branch.iter() {
            match merged.get(key) {
                None => merged.insert(key, value.clone())?,
                Some(existing) if existing == value => {}
                Some(_) => {
                    return Err(PipelineError::Graph(GraphError::KeyCollision {
                        node: node.to_string(),
                        key: key.to_string(),
                    }));
                }
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tags the payload and counts invocations, to prove untaken branches
    /// never run.
    struct Tag {
        key: String,
        value: i64,
        calls: Arc<AtomicUsize>,
    }

    impl PipelineStepRunner for Tag {
        fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            input.insert(self.key.clone(), self.value)?;
            Ok(input)
        }
    }

    struct RouteOnFlag;

    impl SwitchFn for RouteOnFlag {
        fn num_outputs(&self) -> usize {
            2
        }

        fn select(&self, data: &Data) -> Result<usize, GraphError> {
            match data.get_bool("flag") {
                Some(true) => Ok(0),
                Some(false) => Ok(1),
                None => Err(GraphError::Switch("missing flag key".to_string())),
            }
        }
    }

    fn registries(calls: &[Arc<AtomicUsize>]) -> (StepRegistry, SwitchRegistry) {
        let mut steps = StepRegistry::new();
        let calls: Vec<_> = calls.to_vec();
        steps.register("tag", move |config| {
            let index = config.option_i64("counter").unwrap_or(0) as usize;
            Ok(Box::new(Tag {
                key: config.option_str("key").unwrap_or("tag").to_string(),
                value: config.option_i64("value").unwrap_or(0),
                calls: calls[index].clone(),
            }))
        });
        let mut switches = SwitchRegistry::new();
        switches.register("route_on_flag", |_| Ok(Box::new(RouteOnFlag)));
        (steps, switches)
    }

    fn counters(n: usize) -> Vec<Arc<AtomicUsize>> {
        (0..n).map(|_| Arc::new(AtomicUsize::new(0))).collect()
    }

    #[test]
    fn test_port_ref_text_form() {
        assert_eq!(PortRef::port("route", 1).to_string(), "route/1");
        assert_eq!("route/1".parse::<PortRef>().unwrap(), PortRef::port("route", 1));
        assert_eq!("plain".parse::<PortRef>().unwrap(), PortRef::new("plain"));
        assert!("a/b/2".parse::<PortRef>().is_err());
    }

    #[test]
    fn test_switch_routes_single_branch() {
        let calls = counters(2);
        let (steps, switches) = registries(&calls);
        let pipeline = GraphPipeline::new()
            .switch("route", PortRef::input(), SwitchConfig::new("route_on_flag"))
            .unwrap()
            .then(
                "left",
                PortRef::port("route", 0),
                StepConfig::new("tag").option("key", "branch").option("value", 0).option("counter", 0),
            )
            .unwrap()
            .then(
                "right",
                PortRef::port("route", 1),
                StepConfig::new("tag").option("key", "branch").option("value", 1).option("counter", 1),
            )
            .unwrap()
            .any("either", vec![PortRef::new("left"), PortRef::new("right")])
            .unwrap()
            .output("either");
        let mut executor = pipeline.executor(&steps, &switches).unwrap();

        let out = executor.exec(Data::new().with("flag", true).unwrap()).unwrap();

        assert_eq!(out.get_i64("branch"), Some(0));
        assert_eq!(calls[0].load(Ordering::SeqCst), 1);
        // The untaken branch is skipped, not executed
        assert_eq!(calls[1].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_merge_combines_branches() {
        let calls = counters(2);
        let (steps, switches) = registries(&calls);
        let pipeline = GraphPipeline::new()
            .then(
                "a",
                PortRef::input(),
                StepConfig::new("tag").option("key", "a").option("value", 1),
            )
            .unwrap()
            .then(
                "b",
                PortRef::input(),
                StepConfig::new("tag").option("key", "b").option("value", 2).option("counter", 1),
            )
            .unwrap()
            .merge("both", vec![PortRef::new("a"), PortRef::new("b")])
            .unwrap()
            .output("both");
        let mut executor = pipeline.executor(&steps, &switches).unwrap();

        let out = executor.exec(Data::new().with("x", 9i64).unwrap()).unwrap();

        // Shared upstream key dedupes, branch keys union
        assert_eq!(out.get_i64("x"), Some(9));
        assert_eq!(out.get_i64("a"), Some(1));
        assert_eq!(out.get_i64("b"), Some(2));
    }

    #[test]
    fn test_merge_key_collision() {
        let calls = counters(2);
        let (steps, switches) = registries(&calls);
        let pipeline = GraphPipeline::new()
            .then(
                "a",
                PortRef::input(),
                StepConfig::new("tag").option("key", "t").option("value", 1),
            )
            .unwrap()
            .then(
                "b",
                PortRef::input(),
                StepConfig::new("tag").option("key", "t").option("value", 2).option("counter", 1),
            )
            .unwrap()
            .merge("both", vec![PortRef::new("a"), PortRef::new("b")])
            .unwrap()
            .output("both");
        let mut executor = pipeline.executor(&steps, &switches).unwrap();

        let err = executor.exec(Data::new()).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Graph(GraphError::KeyCollision { key, .. }) if key == "t"
        ));
    }

    #[test]
    fn test_unreachable_node_is_excluded() {
        let calls = counters(2);
        let (steps, switches) = registries(&calls);
        let pipeline = GraphPipeline::new()
            .then(
                "used",
                PortRef::input(),
                StepConfig::new("tag").option("key", "a").option("value", 1),
            )
            .unwrap()
            .then(
                "orphan",
                PortRef::input(),
                StepConfig::new("tag").option("key", "b").option("value", 2).option("counter", 1),
            )
            .unwrap()
            .output("used");
        let mut executor = pipeline.executor(&steps, &switches).unwrap();

        let out = executor.exec(Data::new()).unwrap();

        assert_eq!(out.get_i64("a"), Some(1));
        assert!(!out.has("b"));
        assert_eq!(calls[1].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dangling_reference() {
        let (steps, switches) = registries(&counters(1));
        let pipeline = GraphPipeline::new()
            .then("a", "missing", StepConfig::new("tag"))
            .unwrap()
            .output("a");

        let err = pipeline.executor(&steps, &switches).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Graph(GraphError::UnknownNode(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_cycle_detection() {
        let (steps, switches) = registries(&counters(1));
        let pipeline = GraphPipeline::new()
            .then("a", "b", StepConfig::new("tag"))
            .unwrap()
            .then("b", "a", StepConfig::new("tag"))
            .unwrap()
            .output("a");

        let err = pipeline.executor(&steps, &switches).unwrap_err();

        assert!(matches!(err, PipelineError::Graph(GraphError::Cycle)));
    }

    #[test]
    fn test_duplicate_and_reserved_names() {
        let pipeline = GraphPipeline::new()
            .then("a", PortRef::input(), StepConfig::new("tag"))
            .unwrap();

        assert!(matches!(
            pipeline.clone().then("a", PortRef::input(), StepConfig::new("tag")),
            Err(GraphError::DuplicateNode(_))
        ));
        assert!(matches!(
            pipeline.then("input", PortRef::input(), StepConfig::new("tag")),
            Err(GraphError::InvalidNodeName(_))
        ));
    }

    #[test]
    fn test_port_out_of_range() {
        let (steps, switches) = registries(&counters(1));
        let pipeline = GraphPipeline::new()
            .switch("route", PortRef::input(), SwitchConfig::new("route_on_flag"))
            .unwrap()
            .then("a", PortRef::port("route", 5), StepConfig::new("tag"))
            .unwrap()
            .output("a");

        let err = pipeline.executor(&steps, &switches).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Graph(GraphError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_graph_node_serde() {
        let node = GraphNode::Switch {
            input: PortRef::input(),
            switch: SwitchConfig::new("route_on_flag"),
        };
        let json = serde_json::to_string(&node).unwrap();

        assert!(json.contains("\"kind\":\"switch\""));
        assert_eq!(serde_json::from_str::<GraphNode>(&json).unwrap(), node);
    }
}
