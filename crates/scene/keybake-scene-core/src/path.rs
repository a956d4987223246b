//! NodePath: owner-relative addressing of a node (and optionally one of its
//! properties or skeleton bones) inside the scene tree.
//!
//! A path is built from two absolute document paths (owner and target) and
//! rendered relative, the way the target format stores track paths:
//! `"../Cube:blend_shapes/Key"`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePath {
    base: Vec<String>,
    target: Vec<String>,
    subnames: Vec<String>,
}

fn split_abs(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|s| s.to_string())
        .collect()
}

impl NodePath {
    /// Build a path pointing from the node at absolute path `base` to the
    /// node at absolute path `target`.
    pub fn new(base: &str, target: &str) -> Self {
        Self {
            base: split_abs(base),
            target: split_abs(target),
            subnames: Vec::new(),
        }
    }

    /// Copy of this path with one more trailing subname (property or bone).
    pub fn with_subname(&self, subname: &str) -> Self {
        let mut copied = self.clone();
        copied.subnames.push(subname.to_string());
        copied
    }

    /// Relative path string without the `NodePath(…)` wrapper.
    pub fn relative(&self) -> String {
        let common = self
            .base
            .iter()
            .zip(self.target.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<String> = Vec::new();
        for _ in common..self.base.len() {
            segments.push("..".to_string());
        }
        for seg in &self.target[common..] {
            segments.push(seg.clone());
        }

        let mut out = if segments.is_empty() {
            ".".to_string()
        } else {
            segments.join("/")
        };
        if !self.subnames.is_empty() {
            out.push(':');
            out.push_str(&self.subnames.join(":"));
        }
        out
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath(\"{}\")", self.relative())
    }
}
