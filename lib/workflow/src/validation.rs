//! Structural validation of workflow graphs.
//!
//! [`validate`] is a pure function over a node list and an edge list. It
//! never stops at the first problem: every finding is collected so the
//! editor can highlight all of them at once. Errors block submission,
//! warnings do not.
//!
//! Rules run in a fixed order and iterate nodes and edges in the order they
//! were given, so an unchanged snapshot always produces the same result.

use crate::catalog::{NodeCatalog, NodeDefinition, is_blank};
use crate::edge::WorkflowEdge;
use crate::id::{EdgeId, NodeId};
use crate::node::{NodeCategory, WorkflowNode};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which triggers a node must be reachable from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// Reachable from at least one trigger.
    #[default]
    AnyTrigger,
    /// Reachable from each trigger in the workflow.
    EveryTrigger,
}

/// Tunable validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationPolicy {
    #[serde(default)]
    pub reachability: Reachability,
}

/// Machine-readable kind of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingTrigger,
    DuplicateNodeId,
    UnknownNodeType,
    DanglingEdge,
    SelfLoop,
    TriggerHasInput,
    InvalidPort,
    DuplicateEdge,
    UnreachableNode,
    Cycle,
    RequiredFieldMissing,
    InvalidFieldValue,
    UnknownConfigKey,
    NodeNotConfigured,
    UnconnectedBranch,
    IsolatedTrigger,
}

/// A single validation finding, optionally anchored to a node or edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<EdgeId>,
    /// Config field the finding is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationIssue {
    fn workflow(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            node_id: None,
            edge_id: None,
            field: None,
        }
    }

    fn node(code: IssueCode, node_id: &NodeId, message: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.clone()),
            ..Self::workflow(code, message)
        }
    }

    fn edge(code: IssueCode, edge_id: &EdgeId, message: impl Into<String>) -> Self {
        Self {
            edge_id: Some(edge_id.clone()),
            ..Self::workflow(code, message)
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

/// Outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Iterates over errors and warnings anchored to a node.
    pub fn issues_for<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a ValidationIssue> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(move |issue| issue.node_id.as_ref() == Some(node_id))
    }

    /// Whether any error has the given code.
    #[must_use]
    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }

    /// Whether any warning has the given code.
    #[must_use]
    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|issue| issue.code == code)
    }
}

/// Node and edge tallies for the submission summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub triggers: usize,
    pub actions: usize,
    pub logic: usize,
    pub ai: usize,
    pub integrations: usize,
}

/// Tallies nodes per category. Independent of validity.
#[must_use]
pub fn get_stats(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> WorkflowStats {
    let mut stats = WorkflowStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        ..WorkflowStats::default()
    };
    for node in nodes {
        match node.category() {
            NodeCategory::Trigger => stats.triggers += 1,
            NodeCategory::Action => stats.actions += 1,
            NodeCategory::Logic => stats.logic += 1,
            NodeCategory::Ai => stats.ai += 1,
            NodeCategory::Integration => stats.integrations += 1,
        }
    }
    stats
}

/// Validates a workflow with the default policy.
#[must_use]
pub fn validate(
    catalog: &NodeCatalog,
    nodes: &[WorkflowNode],
    edges: &[WorkflowEdge],
) -> ValidationResult {
    validate_with(catalog, nodes, edges, &ValidationPolicy::default())
}

/// Validates a workflow.
#[must_use]
pub fn validate_with(
    catalog: &NodeCatalog,
    nodes: &[WorkflowNode],
    edges: &[WorkflowEdge],
    policy: &ValidationPolicy,
) -> ValidationResult {
    let mut run = ValidationRun::new(catalog, nodes, edges);
    run.check_triggers_present();
    run.check_node_ids_and_types();
    run.check_edges();
    run.check_reachability(policy.reachability);
    run.check_cycles();
    run.check_configs();
    run.check_branches();
    run.check_isolated_triggers();
    run.finish()
}

/// State shared by the rules of one validation.
struct ValidationRun<'a> {
    catalog: &'a NodeCatalog,
    nodes: &'a [WorkflowNode],
    edges: &'a [WorkflowEdge],
    /// First position of each node id.
    positions: HashMap<&'a NodeId, usize>,
    /// Edges whose endpoints both exist, as node positions.
    flow: DiGraph<usize, ()>,
    triggers: Vec<usize>,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl<'a> ValidationRun<'a> {
    fn new(catalog: &'a NodeCatalog, nodes: &'a [WorkflowNode], edges: &'a [WorkflowEdge]) -> Self {
        let mut positions = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            positions.entry(&node.id).or_insert(i);
        }

        let mut flow = DiGraph::with_capacity(nodes.len(), edges.len());
        for i in 0..nodes.len() {
            flow.add_node(i);
        }
        for edge in edges {
            if let (Some(&source), Some(&target)) =
                (positions.get(&edge.source), positions.get(&edge.target))
            {
                flow.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
            }
        }

        let triggers = nodes
            .iter()
            .enumerate()
            .filter(|(i, node)| positions[&node.id] == *i && node.category().is_entry_point())
            .map(|(i, _)| i)
            .collect();

        Self {
            catalog,
            nodes,
            edges,
            positions,
            flow,
            triggers,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    fn definition(&self, node: &WorkflowNode) -> Option<&'a NodeDefinition> {
        self.catalog.get(&node.node_type)
    }

    fn node_at(&self, id: &NodeId) -> Option<&'a WorkflowNode> {
        self.positions.get(id).map(|&i| &self.nodes[i])
    }

    fn check_triggers_present(&mut self) {
        if self.triggers.is_empty() {
            self.errors.push(ValidationIssue::workflow(
                IssueCode::MissingTrigger,
                "Workflow needs at least one trigger node",
            ));
        }
    }

    fn check_node_ids_and_types(&mut self) {
        for (i, node) in self.nodes.iter().enumerate() {
            if self.positions[&node.id] != i {
                self.errors.push(ValidationIssue::node(
                    IssueCode::DuplicateNodeId,
                    &node.id,
                    format!("Node id '{}' is used more than once", node.id),
                ));
                continue;
            }
            if self.definition(node).is_none() {
                self.errors.push(ValidationIssue::node(
                    IssueCode::UnknownNodeType,
                    &node.id,
                    format!("'{}' has unknown node type '{}'", node.label(), node.node_type),
                ));
            }
        }
    }

    fn check_edges(&mut self) {
        let mut seen: Vec<&WorkflowEdge> = Vec::with_capacity(self.edges.len());
        for edge in self.edges {
            let (Some(source), Some(target)) = (self.node_at(&edge.source), self.node_at(&edge.target))
            else {
                self.errors.push(ValidationIssue::edge(
                    IssueCode::DanglingEdge,
                    &edge.id,
                    format!(
                        "Connection {} -> {} references a node that does not exist",
                        edge.source, edge.target
                    ),
                ));
                continue;
            };

            if edge.is_self_loop() {
                self.errors.push(ValidationIssue::edge(
                    IssueCode::SelfLoop,
                    &edge.id,
                    format!("'{}' is connected to itself", source.label()),
                ));
            }

            if target.category().is_entry_point() {
                self.errors.push(ValidationIssue::edge(
                    IssueCode::TriggerHasInput,
                    &edge.id,
                    format!("Trigger '{}' cannot have incoming connections", target.label()),
                ));
            } else if let Some(definition) = self.definition(target)
                && definition.ports.input(edge.target_handle.as_deref()).is_none()
            {
                self.errors.push(ValidationIssue::edge(
                    IssueCode::InvalidPort,
                    &edge.id,
                    format!("'{}' has no input '{}'", target.label(), edge.target_port()),
                ));
            }

            if let Some(definition) = self.definition(source)
                && definition.ports.output(edge.source_handle.as_deref()).is_none()
            {
                self.errors.push(ValidationIssue::edge(
                    IssueCode::InvalidPort,
                    &edge.id,
                    format!("'{}' has no output '{}'", source.label(), edge.source_port()),
                ));
            }

            if seen.iter().any(|earlier| earlier.is_parallel_to(edge)) {
                self.warnings.push(ValidationIssue::edge(
                    IssueCode::DuplicateEdge,
                    &edge.id,
                    format!(
                        "'{}' is connected to '{}' more than once",
                        source.label(),
                        target.label()
                    ),
                ));
            }
            seen.push(edge);
        }
    }

    fn reach_from(&self, start: usize) -> Vec<bool> {
        let mut reached = vec![false; self.nodes.len()];
        let mut bfs = Bfs::new(&self.flow, NodeIndex::new(start));
        while let Some(index) = bfs.next(&self.flow) {
            reached[index.index()] = true;
        }
        reached
    }

    fn check_reachability(&mut self, reachability: Reachability) {
        // With no trigger every node is unreachable; the missing trigger
        // error already covers that.
        if self.triggers.is_empty() {
            return;
        }
        let per_trigger: Vec<(usize, Vec<bool>)> = self
            .triggers
            .iter()
            .map(|&t| (t, self.reach_from(t)))
            .collect();

        for (i, node) in self.nodes.iter().enumerate() {
            if self.positions[&node.id] != i || node.category().is_entry_point() {
                continue;
            }
            let issue = match reachability {
                Reachability::AnyTrigger => (!per_trigger.iter().any(|(_, r)| r[i])).then(|| {
                    format!("'{}' is not connected to any trigger", node.label())
                }),
                Reachability::EveryTrigger => per_trigger
                    .iter()
                    .find(|(_, r)| !r[i])
                    .map(|(t, _)| {
                        format!(
                            "'{}' is not reachable from trigger '{}'",
                            node.label(),
                            self.nodes[*t].label()
                        )
                    }),
            };
            if let Some(message) = issue {
                self.errors.push(ValidationIssue::node(
                    IssueCode::UnreachableNode,
                    &node.id,
                    message,
                ));
            }
        }
    }

    fn check_cycles(&mut self) {
        let mut components: Vec<Vec<usize>> = tarjan_scc(&self.flow)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<usize> = component.iter().map(|i| i.index()).collect();
                members.sort_unstable();
                members
            })
            .collect();
        components.sort();

        for members in components {
            let allowed = members.iter().any(|&i| {
                self.definition(&self.nodes[i])
                    .is_some_and(|definition| definition.allows_cycles)
            });
            if allowed {
                continue;
            }
            let labels: Vec<&str> = members.iter().map(|&i| self.nodes[i].label()).collect();
            self.errors.push(ValidationIssue::node(
                IssueCode::Cycle,
                &self.nodes[members[0]].id,
                format!("Steps form a loop without a Loop node: {}", labels.join(" -> ")),
            ));
        }
    }

    fn check_configs(&mut self) {
        for (i, node) in self.nodes.iter().enumerate() {
            if self.positions[&node.id] != i {
                continue;
            }
            let Some(definition) = self.definition(node) else {
                continue;
            };
            for field in &definition.fields {
                let value = node.data.config.get(&field.name);
                if is_blank(value) {
                    if field.required {
                        self.errors.push(
                            ValidationIssue::node(
                                IssueCode::RequiredFieldMissing,
                                &node.id,
                                format!("'{}' is missing required field '{}'", node.label(), field.label),
                            )
                            .with_field(&field.name),
                        );
                    }
                    continue;
                }
                if let Some(problem) = value.and_then(|v| field.value_problem(v)) {
                    self.errors.push(
                        ValidationIssue::node(
                            IssueCode::InvalidFieldValue,
                            &node.id,
                            format!("'{}' field '{}' {problem}", node.label(), field.label),
                        )
                        .with_field(&field.name),
                    );
                }
            }
            for key in node.data.config.keys() {
                if definition.get_field(key).is_none() {
                    self.warnings.push(
                        ValidationIssue::node(
                            IssueCode::UnknownConfigKey,
                            &node.id,
                            format!("'{}' has unused setting '{key}'", node.label()),
                        )
                        .with_field(key),
                    );
                }
            }
            if !node.data.is_configured && !definition.fields.is_empty() {
                self.warnings.push(ValidationIssue::node(
                    IssueCode::NodeNotConfigured,
                    &node.id,
                    format!("'{}' has not been configured yet", node.label()),
                ));
            }
        }
    }

    fn check_branches(&mut self) {
        for (i, node) in self.nodes.iter().enumerate() {
            if self.positions[&node.id] != i {
                continue;
            }
            let Some(definition) = self.definition(node) else {
                continue;
            };
            if !definition.ports.is_branching() {
                continue;
            }
            for branch in &definition.ports.outputs {
                let connected = self
                    .edges
                    .iter()
                    .any(|edge| edge.source == node.id && edge.source_port() == branch.name);
                if !connected {
                    self.warnings.push(ValidationIssue::node(
                        IssueCode::UnconnectedBranch,
                        &node.id,
                        format!("'{}' has nothing on its '{}' branch", node.label(), branch.label),
                    ));
                }
            }
        }
    }

    fn check_isolated_triggers(&mut self) {
        for &t in &self.triggers {
            let trigger = &self.nodes[t];
            let has_outgoing = self.edges.iter().any(|edge| {
                edge.source == trigger.id && self.positions.contains_key(&edge.target)
            });
            if !has_outgoing {
                self.warnings.push(ValidationIssue::node(
                    IssueCode::IsolatedTrigger,
                    &trigger.id,
                    format!("Trigger '{}' is not connected to any step", trigger.label()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeType, Position};
    use serde_json::json;

    fn node(catalog: &NodeCatalog, token: &str, id: &str) -> WorkflowNode {
        let definition = catalog.resolve_token(token).expect("registered");
        WorkflowNode::with_id(
            NodeId::new(id),
            definition.node_type.clone(),
            Position::default(),
            definition.default_payload(),
        )
    }

    fn edge(id: &str, source: &str, target: &str) -> WorkflowEdge {
        WorkflowEdge::new(NodeId::new(source), NodeId::new(target)).with_id(EdgeId::new(id))
    }

    fn branch(id: &str, source: &str, handle: &str, target: &str) -> WorkflowEdge {
        edge(id, source, target).with_handles(Some(handle.to_string()), None)
    }

    fn email_to(catalog: &NodeCatalog, id: &str, to: &str) -> WorkflowNode {
        let mut email = node(catalog, "action/send_email", id);
        email.data.config.insert("to".to_string(), json!(to));
        email
    }

    #[test]
    fn empty_graph_is_missing_trigger() {
        let catalog = NodeCatalog::builtin();
        let result = validate(&catalog, &[], &[]);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, IssueCode::MissingTrigger);
        assert!(result.errors[0].message.contains("trigger"));
    }

    #[test]
    fn graph_without_trigger_is_invalid() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            email_to(&catalog, "a", "a@example.com"),
            email_to(&catalog, "b", "b@example.com"),
        ];
        let edges = vec![edge("e1", "a", "b")];
        let result = validate(&catalog, &nodes, &edges);
        assert!(!result.is_valid);
        assert!(result.has_error(IssueCode::MissingTrigger));
    }

    #[test]
    fn trigger_to_configured_action_is_valid() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            email_to(&catalog, "a", "{{lead.email}}"),
        ];
        let edges = vec![edge("e1", "t", "a")];
        let result = validate(&catalog, &nodes, &edges);
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_required_field_is_reported_per_node_and_field() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            node(&catalog, "action/send_email", "a"),
        ];
        let edges = vec![edge("e1", "t", "a")];
        let result = validate(&catalog, &nodes, &edges);

        assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
        let error = &result.errors[0];
        assert_eq!(error.code, IssueCode::RequiredFieldMissing);
        assert_eq!(error.node_id, Some(NodeId::new("a")));
        assert_eq!(error.field.as_deref(), Some("to"));
    }

    #[test]
    fn validation_is_deterministic() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            node(&catalog, "logic/condition", "c"),
            node(&catalog, "action/send_email", "a"),
            node(&catalog, "ai/gpt_processing", "orphan"),
            node(&catalog, "action/create_task", "x"),
            node(&catalog, "action/create_task", "y"),
        ];
        let edges = vec![
            edge("e1", "t", "c"),
            branch("e2", "c", "true", "a"),
            edge("e3", "x", "y"),
            edge("e4", "y", "x"),
            edge("e5", "a", "ghost"),
        ];
        let first = validate(&catalog, &nodes, &edges);
        let second = validate(&catalog, &nodes, &edges);
        assert_eq!(first, second);
        assert!(!first.is_valid);
    }

    #[test]
    fn unreachable_node_is_an_error() {
        let catalog = NodeCatalog::builtin();
        let mut orphan = node(&catalog, "ai/gpt_processing", "orphan");
        orphan
            .data
            .config
            .insert("prompt".to_string(), json!("Summarise"));
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            email_to(&catalog, "a", "x@example.com"),
            orphan,
        ];
        let edges = vec![edge("e1", "t", "a")];
        let result = validate(&catalog, &nodes, &edges);
        let unreachable: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::UnreachableNode)
            .collect();
        assert_eq!(unreachable.len(), 1);
        assert_eq!(unreachable[0].node_id, Some(NodeId::new("orphan")));
    }

    #[test]
    fn every_trigger_policy_is_stricter() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t1"),
            node(&catalog, "trigger/lead_created", "t2"),
            email_to(&catalog, "a", "x@example.com"),
            email_to(&catalog, "b", "y@example.com"),
        ];
        let edges = vec![edge("e1", "t1", "a"), edge("e2", "t2", "b")];

        let any = validate(&catalog, &nodes, &edges);
        assert!(any.is_valid, "{:?}", any.errors);

        let every = validate_with(
            &catalog,
            &nodes,
            &edges,
            &ValidationPolicy {
                reachability: Reachability::EveryTrigger,
            },
        );
        assert!(!every.is_valid);
        let flagged: Vec<_> = every
            .errors
            .iter()
            .filter_map(|e| e.node_id.as_ref().map(NodeId::as_str))
            .collect();
        assert_eq!(flagged, vec!["a", "b"]);
    }

    #[test]
    fn unconnected_condition_branch_is_a_warning() {
        let catalog = NodeCatalog::builtin();
        let mut condition = node(&catalog, "logic/condition", "c");
        condition
            .data
            .config
            .insert("field".to_string(), json!("{{lead.score}}"));
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            condition,
            email_to(&catalog, "a", "x@example.com"),
        ];
        let edges = vec![edge("e1", "t", "c"), branch("e2", "c", "true", "a")];
        let result = validate(&catalog, &nodes, &edges);

        assert!(result.is_valid, "{:?}", result.errors);
        let branches: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.code == IssueCode::UnconnectedBranch)
            .collect();
        assert_eq!(branches.len(), 1);
        assert!(branches[0].message.contains("False"));
    }

    #[test]
    fn isolated_trigger_is_a_warning() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![node(&catalog, "trigger/lead_created", "t")];
        let result = validate(&catalog, &nodes, &[]);
        assert!(result.is_valid);
        assert!(result.has_warning(IssueCode::IsolatedTrigger));
    }

    #[test]
    fn structural_edge_problems_are_errors() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            node(&catalog, "trigger/schedule", "s"),
            email_to(&catalog, "a", "x@example.com"),
        ];
        let edges = vec![
            edge("e1", "t", "a"),
            edge("e2", "a", "a"),
            edge("e3", "a", "s"),
            edge("e4", "t", "nowhere"),
            edge("e5", "t", "a"),
        ];
        let result = validate(&catalog, &nodes, &edges);

        assert!(result.has_error(IssueCode::SelfLoop));
        assert!(result.has_error(IssueCode::TriggerHasInput));
        assert!(result.has_error(IssueCode::DanglingEdge));
        assert!(result.has_warning(IssueCode::DuplicateEdge));
        let dangling = result
            .errors
            .iter()
            .find(|e| e.code == IssueCode::DanglingEdge)
            .expect("dangling");
        assert_eq!(dangling.edge_id, Some(EdgeId::new("e4")));
    }

    #[test]
    fn cycles_need_a_loop_node() {
        let catalog = NodeCatalog::builtin();
        let mut nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            email_to(&catalog, "a", "x@example.com"),
            email_to(&catalog, "b", "y@example.com"),
        ];
        let edges = vec![edge("e1", "t", "a"), edge("e2", "a", "b"), edge("e3", "b", "a")];
        let result = validate(&catalog, &nodes, &edges);
        assert!(result.has_error(IssueCode::Cycle));

        let mut looping = node(&catalog, "logic/loop", "b");
        looping
            .data
            .config
            .insert("items".to_string(), json!("{{lead.contacts}}"));
        nodes[2] = looping;
        let result = validate(&catalog, &nodes, &edges);
        assert!(!result.has_error(IssueCode::Cycle), "{:?}", result.errors);
    }

    #[test]
    fn field_values_are_type_checked() {
        let catalog = NodeCatalog::builtin();
        let mut task = node(&catalog, "action/create_task", "task");
        task.data.config.insert("title".to_string(), json!("Call"));
        task.data.config.insert("priority".to_string(), json!("whenever"));
        task.data.config.insert("due_in_days".to_string(), json!("soon"));
        task.data.config.insert("legacy".to_string(), json!(true));
        let nodes = vec![node(&catalog, "trigger/lead_created", "t"), task];
        let edges = vec![edge("e1", "t", "task")];
        let result = validate(&catalog, &nodes, &edges);

        let invalid: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::InvalidFieldValue)
            .filter_map(|e| e.field.as_deref())
            .collect();
        assert_eq!(invalid, vec!["due_in_days", "priority"]);
        assert!(result.has_warning(IssueCode::UnknownConfigKey));
    }

    #[test]
    fn unknown_node_type_is_an_error() {
        let catalog = NodeCatalog::builtin();
        let mystery = WorkflowNode::with_id(
            NodeId::new("m"),
            NodeType::new(NodeCategory::Action, "teleport"),
            Position::default(),
            crate::node::NodeData::new("Teleport"),
        );
        let nodes = vec![node(&catalog, "trigger/lead_created", "t"), mystery];
        let edges = vec![edge("e1", "t", "m")];
        let result = validate(&catalog, &nodes, &edges);
        assert!(result.has_error(IssueCode::UnknownNodeType));
    }

    #[test]
    fn stats_count_categories_even_when_invalid() {
        let catalog = NodeCatalog::builtin();
        let nodes = vec![
            node(&catalog, "trigger/lead_created", "t"),
            node(&catalog, "action/send_email", "a"),
            node(&catalog, "logic/delay", "d"),
            node(&catalog, "ai/lead_scoring", "s"),
            node(&catalog, "integration/zapier", "z"),
        ];
        let edges = vec![edge("e1", "t", "a")];
        assert!(!validate(&catalog, &nodes, &edges).is_valid);

        let stats = get_stats(&nodes, &edges);
        assert_eq!(
            stats,
            WorkflowStats {
                total_nodes: 5,
                total_edges: 1,
                triggers: 1,
                actions: 1,
                logic: 1,
                ai: 1,
                integrations: 1,
            }
        );
    }
}
