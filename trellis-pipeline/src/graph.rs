//! Dependency ordering for fragments.
//!
//! Ordering is a stable Kahn topological sort: among helpers whose
//! dependencies are satisfied, the lowest registration index goes first. When
//! the sort stalls, the strongly-connected components of the remaining graph
//! name every helper that takes part in a cycle.

use std::collections::BTreeSet;

use crate::{
    diagnostic::PipelineDiagnostic,
    error::PipelineError,
    helper::{Described, HelperKind},
    registry::Registered,
};

/// A resolved execution order plus the dependencies nobody provides.
pub(crate) struct Resolution<'a, T> {
    pub(crate) order: Vec<&'a Registered<T>>,
    pub(crate) missing: Vec<PipelineDiagnostic>,
}

pub(crate) fn resolve<T: Described>(
    kind: HelperKind,
    entries: &[Registered<T>],
) -> Result<Resolution<'_, T>, PipelineError> {
    let count = entries.len();
    // dependants[i] holds every helper that must run after helper i.
    let mut dependants: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
    let mut missing = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        for dependency in &entry.descriptor().depends_on {
            let providers: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, candidate)| candidate.key() == dependency)
                .map(|(provider, _)| provider)
                .collect();
            if providers.is_empty() {
                missing.push(PipelineDiagnostic::missing_dependency(
                    kind,
                    entry.key(),
                    dependency,
                ));
            }
            for provider in providers {
                dependants[provider].insert(position);
            }
        }
    }

    let mut in_degree = vec![0usize; count];
    for targets in &dependants {
        for &target in targets {
            in_degree[target] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(current) = ready.pop_first() {
        order.push(&entries[current]);
        for &target in &dependants[current] {
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.insert(target);
            }
        }
    }

    if order.len() < count {
        let members = cycle_members(&dependants);
        let mut keys: Vec<String> = Vec::new();
        for member in members {
            let key = entries[member].key();
            if !keys.iter().any(|existing| existing == key) {
                keys.push(key.to_string());
            }
        }
        return Err(PipelineError::DependencyCycle { kind, keys });
    }

    Ok(Resolution { order, missing })
}

/// Nodes that belong to a strongly-connected component of size > 1 or carry
/// a self-loop, in ascending node order.
fn cycle_members(edges: &[BTreeSet<usize>]) -> BTreeSet<usize> {
    let mut tarjan = Tarjan {
        edges,
        index: vec![None; edges.len()],
        lowlink: vec![0; edges.len()],
        on_stack: vec![false; edges.len()],
        stack: Vec::new(),
        counter: 0,
        members: BTreeSet::new(),
    };
    for node in 0..edges.len() {
        if tarjan.index[node].is_none() {
            tarjan.visit(node);
        }
    }
    tarjan.members
}

struct Tarjan<'g> {
    edges: &'g [BTreeSet<usize>],
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    counter: usize,
    members: BTreeSet<usize>,
}

impl Tarjan<'_> {
    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.counter);
        self.lowlink[node] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let edges = self.edges;
        for &next in &edges[node] {
            match self.index[next] {
                None => {
                    self.visit(next);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(next_index) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(next_index);
                }
                Some(_) => {}
            }
        }

        if self.index[node] != Some(self.lowlink[node]) {
            return;
        }

        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack[member] = false;
            component.push(member);
            if member == node {
                break;
            }
        }
        if component.len() > 1 || edges[node].contains(&node) {
            self.members.extend(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::HelperDescriptor;

    struct Stub(HelperDescriptor);

    impl Described for Stub {
        fn descriptor(&self) -> &HelperDescriptor {
            &self.0
        }
    }

    fn entries(specs: &[(&str, &[&str])]) -> Vec<Registered<Stub>> {
        specs
            .iter()
            .enumerate()
            .map(|(index, (key, deps))| {
                let mut descriptor = HelperDescriptor::new(*key, HelperKind::Fragment);
                descriptor.depends_on = deps.iter().map(|d| d.to_string()).collect();
                Registered {
                    helper: Stub(descriptor),
                    index,
                }
            })
            .collect()
    }

    fn keys<'a>(resolution: &Resolution<'a, Stub>) -> Vec<&'a str> {
        resolution.order.iter().map(|entry| entry.key()).collect()
    }

    #[test]
    fn test_independent_helpers_keep_registration_order() {
        let entries = entries(&[("c", &[]), ("a", &[]), ("b", &[])]);
        let resolution = resolve(HelperKind::Fragment, &entries).unwrap();
        assert_eq!(keys(&resolution), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dependencies_run_first() {
        let entries = entries(&[
            ("validation", &["capability"]),
            ("capability", &["collection"]),
            ("meta", &[]),
            ("collection", &["meta"]),
        ]);
        let resolution = resolve(HelperKind::Fragment, &entries).unwrap();
        assert_eq!(
            keys(&resolution),
            vec!["meta", "collection", "capability", "validation"]
        );
    }

    #[test]
    fn test_depending_on_duplicated_key_waits_for_all() {
        let entries = entries(&[("after", &["dup"]), ("dup", &[]), ("dup", &[])]);
        let resolution = resolve(HelperKind::Fragment, &entries).unwrap();
        assert_eq!(keys(&resolution), vec!["dup", "dup", "after"]);
    }

    #[test]
    fn test_missing_dependency_is_reported_not_fatal() {
        let entries = entries(&[("a", &["ghost"]), ("b", &[])]);
        let resolution = resolve(HelperKind::Fragment, &entries).unwrap();
        assert_eq!(keys(&resolution), vec!["a", "b"]);
        assert_eq!(resolution.missing.len(), 1);
        assert!(matches!(
            &resolution.missing[0],
            PipelineDiagnostic::MissingDependency { dependency, .. } if dependency == "ghost"
        ));
    }

    #[test]
    fn test_cycle_names_only_participants() {
        let entries = entries(&[
            ("free", &[]),
            ("b", &["a"]),
            ("a", &["c"]),
            ("c", &["b"]),
            ("tail", &["a"]),
        ]);
        let Err(PipelineError::DependencyCycle { keys, .. }) = resolve(HelperKind::Fragment, &entries)
        else {
            panic!("expected a cycle");
        };
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let entries = entries(&[("loop", &["loop"])]);
        let result = resolve(HelperKind::Fragment, &entries);
        assert!(matches!(
            result,
            Err(PipelineError::DependencyCycle { ref keys, .. }) if keys == &["loop"]
        ));
    }
}
