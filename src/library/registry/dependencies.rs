//! Library dependency analysis
//!
//! Checks the registered import graph and computes a load order without
//! running any loader routine.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::library::registry::LibraryRegistry;
use crate::library::traits::LibraryError;

/// Dependency resolution result
#[derive(Debug, Clone)]
pub struct DependencyResolution {
    /// Libraries in load order (dependencies first)
    pub load_order: Vec<String>,
    /// Library imports, in registration order
    pub dependencies: IndexMap<String, Vec<String>>,
}

/// Dependency resolver
pub struct LibraryDependencies;

impl LibraryDependencies {
    /// Resolve library dependencies and determine load order
    ///
    /// Fails with `LibraryNotFound` naming the first unregistered import, or
    /// with `CircularDependency` naming a library on a cycle. Every missing
    /// import is logged.
    pub fn resolve(registry: &LibraryRegistry) -> Result<DependencyResolution, LibraryError> {
        let dependencies: IndexMap<String, Vec<String>> = registry
            .loaders()
            .iter()
            .map(|loader| (loader.name().to_string(), loader.imports().to_vec()))
            .collect();

        let missing: IndexSet<&String> = dependencies
            .values()
            .flatten()
            .filter(|dep| !dependencies.contains_key(dep.as_str()))
            .collect();
        if let Some(first) = missing.first() {
            for name in &missing {
                warn!("Library not registered: {}", name);
            }
            return Err(LibraryError::LibraryNotFound(first.to_string()));
        }

        let load_order = Self::topological_sort(&dependencies)?;
        debug!("Dependency resolution complete: {:?}", load_order);

        Ok(DependencyResolution {
            load_order,
            dependencies,
        })
    }

    /// Topological sort of dependencies, ties broken by registration order
    fn topological_sort(
        dependencies: &IndexMap<String, Vec<String>>,
    ) -> Result<Vec<String>, LibraryError> {
        // Remaining (distinct) imports per library
        let mut in_degree: IndexMap<&str, usize> = IndexMap::new();
        // Reverse graph: library -> libraries importing it
        let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();

        for (library, deps) in dependencies {
            let distinct: IndexSet<&str> = deps.iter().map(String::as_str).collect();
            in_degree.insert(library.as_str(), distinct.len());
            for dep in distinct {
                dependents.entry(dep).or_default().push(library.as_str());
            }
        }

        // Kahn's algorithm
        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&library, _)| library)
            .collect();
        let mut result = Vec::with_capacity(dependencies.len());

        while let Some(library) = queue.pop_front() {
            result.push(library.to_string());
            for &dependent in dependents.get(library).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if result.len() != dependencies.len() {
            let on_cycle = Self::find_cycle_member(dependencies, &in_degree);
            return Err(LibraryError::CircularDependency(on_cycle));
        }

        Ok(result)
    }

    /// Find a library that lies on a cycle among the unsorted libraries
    ///
    /// Every unsorted library still has an unsorted import, so following
    /// unsorted imports from any of them must eventually revisit a library.
    fn find_cycle_member(
        dependencies: &IndexMap<String, Vec<String>>,
        in_degree: &IndexMap<&str, usize>,
    ) -> String {
        let unsorted = |name: &str| in_degree.get(name).is_some_and(|&degree| degree > 0);

        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut current = match in_degree.iter().find(|(_, &degree)| degree > 0) {
            Some((&library, _)) => library,
            None => return String::new(),
        };
        while seen.insert(current) {
            let next = dependencies
                .get(current)
                .and_then(|deps| deps.iter().map(String::as_str).find(|dep| unsorted(*dep)));
            match next {
                Some(dep) => current = dep,
                None => break,
            }
        }
        current.to_string()
    }
}
