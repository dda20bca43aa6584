//! Editing commands for variant trees
//!
//! [`apply`] is a pure reducer: it takes a tree and one [`EditCommand`] and
//! returns the next tree. Commands address nodes by [`ListPath`], so a UI can
//! drive any nesting level without threading callbacks through its widgets.
//! Depth is the length of the path; it is never stored on the nodes.

use std::collections::BTreeSet;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use crate::domain::aggregates::variant::{self, Variant, VariantValue};
use crate::domain::value_objects::{ListPath, MaxDepth, ValueAddress};

const HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditCommand {
    AddVariant { #[serde(default)] list: ListPath },
    RemoveVariant { #[serde(default)] list: ListPath, variant: usize },
    UpdateVariant { #[serde(default)] list: ListPath, variant: usize, field: VariantField },
    AddValue { #[serde(default)] list: ListPath, variant: usize },
    RemoveValue { #[serde(default)] list: ListPath, variant: usize, value: usize },
    UpdateValue { #[serde(default)] list: ListPath, variant: usize, value: usize, update: ValueUpdate },
    AddSubVariant { #[serde(default)] list: ListPath, variant: usize, value: usize },
    RemoveSubVariant {
        #[serde(default)]
        list: ListPath,
        variant: usize,
        value: usize,
        #[serde(rename = "subVariant")]
        sub_variant: usize,
    },
}

impl EditCommand {
    /// The variant list the command operates in.
    pub fn list(&self) -> &ListPath {
        match self {
            Self::AddVariant { list }
            | Self::RemoveVariant { list, .. }
            | Self::UpdateVariant { list, .. }
            | Self::AddValue { list, .. }
            | Self::RemoveValue { list, .. }
            | Self::UpdateValue { list, .. }
            | Self::AddSubVariant { list, .. }
            | Self::RemoveSubVariant { list, .. } => list,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum VariantField {
    Attribute(String),
    Sku(Option<String>),
}

/// Partial update merged into one value. `Some(None)` clears an optional field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub minimum_quantity: Option<Option<u32>>,
}

impl ValueUpdate {
    pub fn label(value: impl Into<String>) -> Self { Self { value: Some(value.into()), ..Self::default() } }
    pub fn quantity(quantity: u32) -> Self { Self { quantity: Some(quantity), ..Self::default() } }
    fn touches_stock(&self) -> bool { self.quantity.is_some() || self.minimum_quantity.is_some() }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no variant list at {0}")]
    ListNotFound(ListPath),
    #[error("no variant {variant} in list {list}")]
    VariantNotFound { list: ListPath, variant: usize },
    #[error("no value {value} in variant {variant} of list {list}")]
    ValueNotFound { list: ListPath, variant: usize, value: usize },
    #[error("no sub-variant {0}")]
    SubVariantNotFound(usize),
    #[error("sub-variants cannot be added at depth {depth} (max depth {max})")]
    DepthExceeded { depth: usize, max: usize },
    #[error("a variant must keep at least one value")]
    LastValue,
    #[error("quantities live on leaf values; remove the sub-variants first")]
    NotALeaf,
}

fn variant_mut<'a>(list: &'a mut [Variant], path: &ListPath, variant: usize) -> Result<&'a mut Variant, EditError> {
    list.get_mut(variant).ok_or_else(|| EditError::VariantNotFound { list: path.clone(), variant })
}

fn value_mut<'a>(list: &'a mut [Variant], path: &ListPath, variant: usize, value: usize) -> Result<&'a mut VariantValue, EditError> {
    variant_mut(list, path, variant)?
        .values
        .get_mut(value)
        .ok_or_else(|| EditError::ValueNotFound { list: path.clone(), variant, value })
}

/// Applies one command, returning the next tree. The input is never modified.
pub fn apply(variants: &[Variant], command: &EditCommand, max_depth: MaxDepth) -> Result<Vec<Variant>, EditError> {
    let mut tree = variants.to_vec();
    let path = command.list();
    let depth = path.depth();
    if let (EditCommand::AddVariant { .. }, Some(parent)) = (command, path.parent_value()) {
        // Growing a value's sub-variant list turns it into a branch.
        if let Some(value) = variant::value_at_mut(&mut tree, &parent) {
            value.quantity = 0;
            value.minimum_quantity = None;
        }
    }
    let list = variant::list_at_mut(&mut tree, path).ok_or_else(|| EditError::ListNotFound(path.clone()))?;

    match command {
        EditCommand::AddVariant { .. } => {
            if depth >= max_depth.value() {
                return Err(EditError::DepthExceeded { depth, max: max_depth.value() });
            }
            list.push(Variant::empty());
        }
        EditCommand::RemoveVariant { variant, .. } => {
            variant_mut(list, path, *variant)?;
            list.remove(*variant);
        }
        EditCommand::UpdateVariant { variant, field, .. } => {
            let target = variant_mut(list, path, *variant)?;
            match field {
                VariantField::Attribute(attribute) => target.attribute = attribute.clone(),
                VariantField::Sku(sku) => target.sku = sku.clone(),
            }
        }
        EditCommand::AddValue { variant, .. } => {
            variant_mut(list, path, *variant)?.values.push(VariantValue::empty());
        }
        EditCommand::RemoveValue { variant, value, .. } => {
            value_mut(list, path, *variant, *value)?;
            let target = variant_mut(list, path, *variant)?;
            if target.values.len() <= 1 { return Err(EditError::LastValue); }
            target.values.remove(*value);
        }
        EditCommand::UpdateValue { variant, value, update, .. } => {
            let target = value_mut(list, path, *variant, *value)?;
            if update.touches_stock() && !target.is_leaf() { return Err(EditError::NotALeaf); }
            if let Some(label) = &update.value { target.value = label.clone(); }
            if let Some(quantity) = update.quantity { target.quantity = quantity; }
            if let Some(sku) = &update.sku { target.sku = sku.clone(); }
            if let Some(minimum) = update.minimum_quantity { target.minimum_quantity = minimum; }
        }
        EditCommand::AddSubVariant { variant, value, .. } => {
            if !max_depth.allows_sub_variants(depth) {
                return Err(EditError::DepthExceeded { depth, max: max_depth.value() });
            }
            let target = value_mut(list, path, *variant, *value)?;
            target.quantity = 0;
            target.minimum_quantity = None;
            target.sub_variants.push(Variant::empty());
        }
        EditCommand::RemoveSubVariant { variant, value, sub_variant, .. } => {
            let target = value_mut(list, path, *variant, *value)?;
            if *sub_variant >= target.sub_variants.len() {
                return Err(EditError::SubVariantNotFound(*sub_variant));
            }
            target.sub_variants.remove(*sub_variant);
        }
    }
    Ok(tree)
}

/// Editing session over one product's tree: the reducer plus the UI state a
/// nested editor keeps (collapsed branches, undo/redo).
#[derive(Clone, Debug, Default)]
pub struct VariantEditor {
    variants: Vec<Variant>,
    max_depth: MaxDepth,
    collapsed: BTreeSet<ValueAddress>,
    undo: Vec<Vec<Variant>>,
    redo: Vec<Vec<Variant>>,
}

impl VariantEditor {
    pub fn new(variants: Vec<Variant>, max_depth: MaxDepth) -> Self {
        Self { variants, max_depth, ..Self::default() }
    }

    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn into_variants(self) -> Vec<Variant> { self.variants }
    pub fn max_depth(&self) -> MaxDepth { self.max_depth }

    /// Whether values in a list at `depth` may branch. UIs hide the
    /// "add sub-variant" control when this is false.
    pub fn can_add_sub_variant(&self, depth: usize) -> bool { self.max_depth.allows_sub_variants(depth) }

    pub fn apply(&mut self, command: &EditCommand) -> Result<(), EditError> {
        let next = apply(&self.variants, command, self.max_depth).inspect_err(|err| {
            tracing::debug!(%err, list = %command.list(), "edit refused");
        })?;
        self.commit(next);
        Ok(())
    }

    /// Bulk replace, e.g. after an import. Undoable like any edit.
    pub fn replace(&mut self, variants: Vec<Variant>) { self.commit(variants); }

    pub fn can_undo(&self) -> bool { !self.undo.is_empty() }
    pub fn can_redo(&self) -> bool { !self.redo.is_empty() }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else { return false };
        self.redo.push(std::mem::replace(&mut self.variants, previous));
        self.prune_collapsed();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else { return false };
        self.undo.push(std::mem::replace(&mut self.variants, next));
        self.prune_collapsed();
        true
    }

    /// Flips whether a value's sub-variants are shown. Returns the new state.
    pub fn toggle_collapse(&mut self, address: &ValueAddress) -> bool {
        if self.collapsed.remove(address) { return false; }
        self.collapsed.insert(address.clone());
        true
    }

    pub fn is_collapsed(&self, address: &ValueAddress) -> bool { self.collapsed.contains(address) }

    fn commit(&mut self, next: Vec<Variant>) {
        self.undo.push(std::mem::replace(&mut self.variants, next));
        if self.undo.len() > HISTORY_LIMIT { self.undo.remove(0); }
        self.redo.clear();
        self.prune_collapsed();
    }

    fn prune_collapsed(&mut self) {
        let tree = &self.variants;
        self.collapsed.retain(|addr| variant::value_at(tree, addr).is_some_and(|v| !v.is_leaf()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::aggregator::total_quantity;

    fn flat() -> Vec<Variant> {
        vec![Variant::new("Color", vec![VariantValue::leaf("Red", 5), VariantValue::leaf("Blue", 3)])]
    }

    fn add_sub(list: ListPath, variant: usize, value: usize) -> EditCommand {
        EditCommand::AddSubVariant { list, variant, value }
    }

    #[test]
    fn test_add_sub_variant_resets_quantity() {
        let tree = apply(&flat(), &add_sub(ListPath::root(), 0, 0), MaxDepth::default()).unwrap();
        assert_eq!(tree[0].values[0].quantity, 0);
        assert_eq!(tree[0].values[0].sub_variants, vec![Variant::empty()]);
        assert_eq!(total_quantity(&tree), 3);
        assert_eq!(flat()[0].values[0].quantity, 5);
    }

    #[test]
    fn test_depth_ceiling() {
        let max = MaxDepth::default();
        let tree = apply(&flat(), &add_sub(ListPath::root(), 0, 0), max).unwrap();
        let depth1 = ListPath::root().child(0, 0);
        let tree = apply(&tree, &add_sub(depth1.clone(), 0, 0), max).unwrap();
        let depth2 = depth1.child(0, 0);
        assert!(variant::list_at(&tree, &depth2).is_some());
        assert_eq!(apply(&tree, &add_sub(depth2.clone(), 0, 0), max), Err(EditError::DepthExceeded { depth: 2, max: 3 }));
        assert_eq!(
            apply(&tree, &EditCommand::AddVariant { list: depth2.clone() }, max).map(|t| variant::list_at(&t, &depth2).map_or(0, <[Variant]>::len)),
            Ok(2)
        );
    }

    #[test]
    fn test_last_value_cannot_be_removed() {
        let tree = vec![Variant::new("Color", vec![VariantValue::leaf("Red", 1)])];
        let cmd = EditCommand::RemoveValue { list: ListPath::root(), variant: 0, value: 0 };
        assert_eq!(apply(&tree, &cmd, MaxDepth::default()), Err(EditError::LastValue));
        let tree = apply(&flat(), &cmd, MaxDepth::default()).unwrap();
        assert_eq!(tree[0].values[0].value, "Blue");
    }

    #[test]
    fn test_update_value_merges() {
        let update = ValueUpdate { quantity: Some(11), sku: Some(Some("RED-1".into())), ..ValueUpdate::default() };
        let cmd = EditCommand::UpdateValue { list: ListPath::root(), variant: 0, value: 0, update };
        let tree = apply(&flat(), &cmd, MaxDepth::default()).unwrap();
        assert_eq!(tree[0].values[0].value, "Red");
        assert_eq!(tree[0].values[0].quantity, 11);
        assert_eq!(tree[0].values[0].sku.as_deref(), Some("RED-1"));
    }

    #[test]
    fn test_quantity_refused_on_branch() {
        let tree = apply(&flat(), &add_sub(ListPath::root(), 0, 0), MaxDepth::default()).unwrap();
        let cmd = EditCommand::UpdateValue { list: ListPath::root(), variant: 0, value: 0, update: ValueUpdate::quantity(4) };
        assert_eq!(apply(&tree, &cmd, MaxDepth::default()), Err(EditError::NotALeaf));
        let rename = EditCommand::UpdateValue { list: ListPath::root(), variant: 0, value: 0, update: ValueUpdate::label("Crimson") };
        assert_eq!(apply(&tree, &rename, MaxDepth::default()).unwrap()[0].values[0].value, "Crimson");
    }

    #[test]
    fn test_remove_sub_variant_restores_leaf() {
        let tree = apply(&flat(), &add_sub(ListPath::root(), 0, 0), MaxDepth::default()).unwrap();
        let cmd = EditCommand::RemoveSubVariant { list: ListPath::root(), variant: 0, value: 0, sub_variant: 0 };
        let tree = apply(&tree, &cmd, MaxDepth::default()).unwrap();
        assert!(tree[0].values[0].is_leaf());
        assert_eq!(tree[0].values[0].quantity, 0);
        assert_eq!(apply(&tree, &cmd, MaxDepth::default()), Err(EditError::SubVariantNotFound(0)));
    }

    #[test]
    fn test_bad_paths() {
        let missing = ListPath::root().child(4, 0);
        assert_eq!(apply(&flat(), &EditCommand::AddVariant { list: missing.clone() }, MaxDepth::default()), Err(EditError::ListNotFound(missing)));
        let cmd = EditCommand::RemoveVariant { list: ListPath::root(), variant: 2 };
        assert!(matches!(apply(&flat(), &cmd, MaxDepth::default()), Err(EditError::VariantNotFound { variant: 2, .. })));
    }

    #[test]
    fn test_command_wire_format() {
        let cmd: EditCommand = serde_json::from_value(serde_json::json!({
            "type": "removeSubVariant", "list": [{"variant": 0, "value": 1}], "variant": 0, "value": 0, "subVariant": 2
        })).unwrap();
        assert_eq!(cmd, EditCommand::RemoveSubVariant { list: ListPath::root().child(0, 1), variant: 0, value: 0, sub_variant: 2 });
        let cmd: EditCommand = serde_json::from_value(serde_json::json!({
            "type": "updateValue", "variant": 0, "value": 0, "update": {"sku": null, "minimumQuantity": 3}
        })).unwrap();
        let EditCommand::UpdateValue { update, .. } = cmd else { panic!("wrong command") };
        assert_eq!(update.sku, Some(None));
        assert_eq!(update.minimum_quantity, Some(Some(3)));
        assert_eq!(update.value, None);
    }

    #[test]
    fn test_editor_undo_redo_and_collapse() {
        let mut editor = VariantEditor::new(flat(), MaxDepth::default());
        editor.apply(&add_sub(ListPath::root(), 0, 1)).unwrap();
        let blue = ValueAddress::top(0, 1);
        assert!(editor.toggle_collapse(&blue));
        assert!(editor.is_collapsed(&blue));
        assert!(editor.apply(&add_sub(ListPath::root().child(0, 1).child(0, 0), 0, 0)).is_err());
        assert!(editor.undo());
        assert_eq!(editor.variants(), flat().as_slice());
        assert!(!editor.is_collapsed(&blue));
        assert!(editor.redo());
        assert!(!editor.can_redo());
        assert!(editor.can_add_sub_variant(1));
        assert!(!editor.can_add_sub_variant(2));
    }
}
