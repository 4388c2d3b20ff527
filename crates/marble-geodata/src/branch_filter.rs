//! Restricts a [`GeoDataTreeModel`] view to one branch
//!
//! The branch is remembered by feature uid rather than by row path, so inserting or removing
//! siblings anywhere in the tree keeps the filter pointed at the same container.

use crate::tree_model::{GeoDataTreeModel, ModelIndex};
use crate::{GeoFeature, GeoNode, NodeRef, ObjectUid};

#[derive(Debug, Clone, Default)]
pub struct BranchFilterProxyModel {
    branch: Option<ObjectUid>,
}

impl BranchFilterProxyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show only the branch rooted at `index`; `None` shows everything
    pub fn set_branch_index(&mut self, model: &GeoDataTreeModel, index: Option<&ModelIndex>) {
        self.branch = index.and_then(|i| model.feature(i)).map(GeoFeature::uid);
        tracing::debug!(branch = ?self.branch, "Branch filter changed");
    }

    pub fn set_branch(&mut self, uid: Option<ObjectUid>) {
        self.branch = uid;
    }

    pub fn branch(&self) -> Option<ObjectUid> {
        self.branch
    }

    /// Current location of the branch, if it is still in the model
    pub fn branch_index(&self, model: &GeoDataTreeModel) -> Option<ModelIndex> {
        model.index_of(self.branch?)
    }

    /// Whether source row `row` below `parent` is visible through the filter
    ///
    /// Accepts the direct non-container children of the branch, and the branch itself
    /// together with all of its ancestors. A branch that left the model rejects everything.
    pub fn filter_accepts_row(&self, model: &GeoDataTreeModel, row: usize, parent: &ModelIndex) -> bool {
        let Some(uid) = self.branch else {
            return true;
        };
        let Some(branch) = model.index_of(uid) else {
            return false;
        };

        let index = parent.child(row);
        if *parent == branch {
            return model
                .object(&index)
                .is_some_and(|node| !node.node_type().is_container());
        }
        branch.path().starts_with(index.path())
    }

    /// Source rows below `parent` that pass the filter, in source order
    pub fn accepted_rows(&self, model: &GeoDataTreeModel, parent: &ModelIndex) -> Vec<usize> {
        (0..model.row_count(parent))
            .filter(|&row| self.filter_accepts_row(model, row, parent))
            .collect()
    }

    /// Names of every accepted feature, depth-first
    pub fn visible_names(&self, model: &GeoDataTreeModel) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(model, &ModelIndex::root(), &mut names);
        names
    }

    fn collect_names(&self, model: &GeoDataTreeModel, parent: &ModelIndex, names: &mut Vec<String>) {
        for row in self.accepted_rows(model, parent) {
            let index = parent.child(row);
            if let Some(NodeRef::Feature(feature)) = model.object(&index) {
                names.push(feature.name().to_string());
            }
            self.collect_names(model, &index, names);
        }
    }
}
