// src/definition/activity.rs

use crate::definition::mode::ExecutionModeDefinition;
use crate::definition::tailoring::TailoringRule;
use crate::definition::work::WorkDefinition;
use crate::types::{Criticality, ExecutionMode};

/// Activity identifier, unique among the children of one parent.
pub type ActivityId = String;

/// Declarative description of one activity: work + mode + tailoring.
///
/// Definitions are plain values. Cloning one (e.g. when tailoring) deep-copies
/// the work and mode definitions and the whole declared subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDefinition {
    identifier: ActivityId,
    work: WorkDefinition,
    mode: ExecutionModeDefinition,
    /// `true` when the mode was taken from the parent rather than declared.
    mode_inherited: bool,
    criticality: Option<Criticality>,
    children: Vec<ActivityDefinition>,
    tailoring: Vec<TailoringRule>,
}

impl ActivityDefinition {
    /// New definition running in the default mode (full, production).
    pub fn new(identifier: impl Into<ActivityId>, work: WorkDefinition) -> Self {
        Self {
            identifier: identifier.into(),
            work,
            mode: ExecutionModeDefinition::default(),
            mode_inherited: false,
            criticality: None,
            children: Vec::new(),
            tailoring: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionModeDefinition) -> Self {
        self.mode = mode;
        self.mode_inherited = false;
        self.propagate_mode();
        self
    }

    /// Take the parent's mode. Later mode changes on the parent (tailoring)
    /// flow down to this definition.
    pub fn with_inherited_mode(mut self, parent: &ExecutionModeDefinition) -> Self {
        self.mode = parent.clone();
        self.mode_inherited = true;
        self
    }

    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = Some(criticality);
        self
    }

    pub fn with_child(mut self, child: ActivityDefinition) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ActivityDefinition>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_tailoring(mut self, rule: TailoringRule) -> Self {
        self.tailoring.push(rule);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn work(&self) -> &WorkDefinition {
        &self.work
    }

    pub fn mode(&self) -> &ExecutionModeDefinition {
        &self.mode
    }

    pub fn is_mode_inherited(&self) -> bool {
        self.mode_inherited
    }

    pub fn criticality(&self) -> Option<Criticality> {
        self.criticality
    }

    /// Declared child definitions, in declaration order.
    pub fn children(&self) -> &[ActivityDefinition] {
        &self.children
    }

    /// Tailoring rules applied to this activity's children.
    pub fn tailoring(&self) -> &[TailoringRule] {
        &self.tailoring
    }

    pub(crate) fn replace_work(&mut self, work: WorkDefinition) {
        self.work = work;
    }

    pub(crate) fn replace_criticality(&mut self, criticality: Criticality) {
        self.criticality = Some(criticality);
    }

    /// Override the execution mode of this activity and of every descendant
    /// that inherited it.
    pub(crate) fn override_mode(&mut self, mode: ExecutionMode) {
        self.mode.set_mode(mode);
        self.mode_inherited = false;
        self.propagate_mode();
    }

    fn propagate_mode(&mut self) {
        let mode = self.mode.clone();
        for child in self.children.iter_mut() {
            child.inherit_from(&mode);
        }
        for rule in self.tailoring.iter_mut() {
            if let Some(inserted) = rule.inserted_activity_mut() {
                inserted.inherit_from(&mode);
            }
        }
    }

    fn inherit_from(&mut self, parent: &ExecutionModeDefinition) {
        if self.mode_inherited {
            self.mode = parent.clone();
            self.propagate_mode();
        }
    }
}
