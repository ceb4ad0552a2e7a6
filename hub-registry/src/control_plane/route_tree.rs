//! Route-tree storage owner: the hierarchical namespace of routes.

use crate::control_plane::address;
use crate::error::RegistryError;
use crate::route::Route;
use crate::transport::ChannelFactory;
use std::collections::HashMap;
use std::sync::Arc;

/// One node of the namespace: a route payload plus its children by name.
///
/// Nodes are owned exclusively by their parent; the tree is a strict
/// hierarchy with no back-pointers.
pub(crate) struct RouteNode {
    route: Arc<Route>,
    children: HashMap<String, RouteNode>,
}

impl RouteNode {
    fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            children: HashMap::new(),
        }
    }

    pub(crate) fn route(&self) -> &Arc<Route> {
        &self.route
    }
}

pub(crate) struct RouteTree {
    root: RouteNode,
    group: String,
}

impl RouteTree {
    /// Builds the tree with a default root route named after the reserved
    /// root token.
    pub(crate) async fn new(
        factory: &Arc<dyn ChannelFactory>,
        group: &str,
    ) -> Result<Self, RegistryError> {
        let root_route = Route::build_default("", address::ROOT_TOKEN, factory, group).await?;
        Ok(Self {
            root: RouteNode::new(Arc::new(root_route)),
            group: group.to_string(),
        })
    }

    /// Walks to the node at `path` without creating anything.
    pub(crate) fn resolve(&self, path: &str) -> Result<&RouteNode, RegistryError> {
        let segments = address::normalize(path)?;
        let mut node = &self.root;
        let mut walked = segments[0].clone();
        for segment in &segments[1..] {
            walked = format!("{walked}/{segment}");
            node = node
                .children
                .get(segment)
                .ok_or_else(|| RegistryError::RouteNotFound(walked.clone()))?;
        }
        Ok(node)
    }

    fn resolve_mut(&mut self, path: &str) -> Result<&mut RouteNode, RegistryError> {
        let segments = address::normalize(path)?;
        let mut node = &mut self.root;
        let mut walked = segments[0].clone();
        for segment in &segments[1..] {
            walked = format!("{walked}/{segment}");
            node = node
                .children
                .get_mut(segment)
                .ok_or_else(|| RegistryError::RouteNotFound(walked.clone()))?;
        }
        Ok(node)
    }

    /// Walks to the node at `path`, synthesizing default routes for missing
    /// segments along the way.
    async fn resolve_or_create(
        &mut self,
        path: &str,
        factory: &Arc<dyn ChannelFactory>,
    ) -> Result<&mut RouteNode, RegistryError> {
        let segments = address::normalize(path)?;
        let group = self.group.clone();
        let mut node = &mut self.root;
        let mut parent = segments[0].clone();
        for segment in &segments[1..] {
            if !node.children.contains_key(segment) {
                let route = Route::build_default(&parent, segment, factory, &group).await?;
                node.children
                    .insert(segment.clone(), RouteNode::new(Arc::new(route)));
            }
            parent = format!("{parent}/{segment}");
            node = node
                .children
                .get_mut(segment)
                .ok_or_else(|| RegistryError::RouteNotFound(parent.clone()))?;
        }
        Ok(node)
    }

    /// Attaches `route` as a childless leaf under `parent_path`, creating
    /// missing ancestors. Fails when a sibling with the same name exists.
    pub(crate) async fn insert(
        &mut self,
        parent_path: &str,
        route: Arc<Route>,
        factory: &Arc<dyn ChannelFactory>,
    ) -> Result<(), RegistryError> {
        let parent = self.resolve_or_create(parent_path, factory).await?;
        let name = route.name().to_string();
        if parent.children.contains_key(&name) {
            return Err(RegistryError::DuplicateRoute(
                route.full_address().to_string(),
            ));
        }
        parent.children.insert(name, RouteNode::new(route));
        Ok(())
    }

    /// Swaps the route payload of `parent_path`/`name` in place. The node's
    /// children map is untouched, so descendants survive the redefinition.
    /// Never creates missing ancestors.
    pub(crate) fn replace(
        &mut self,
        parent_path: &str,
        name: &str,
        new_route: Arc<Route>,
    ) -> Result<(), RegistryError> {
        let name = name.to_lowercase();
        let parent = self.resolve_mut(parent_path)?;
        let node = parent
            .children
            .get_mut(&name)
            .ok_or_else(|| RegistryError::RouteNotFound(new_route.full_address().to_string()))?;
        node.route = new_route;
        Ok(())
    }

    /// Depth-first pre-order walk yielding every route with its full
    /// address. Consumers treat the result as a mapping; the order carries
    /// no contract.
    pub(crate) fn flatten(&self) -> Vec<(String, Arc<Route>)> {
        let mut entries = Vec::new();
        Self::flatten_node(&self.root, &mut entries);
        entries
    }

    fn flatten_node(node: &RouteNode, entries: &mut Vec<(String, Arc<Route>)>) {
        entries.push((node.route.full_address().to_string(), node.route.clone()));
        for child in node.children.values() {
            Self::flatten_node(child, entries);
        }
    }
}
