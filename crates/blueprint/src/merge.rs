//! Layering one blueprint onto another
//!
//! Platform templates, active feature fragments and per-context overrides
//! are combined by merging each later document onto the result so far.

use crate::types::{Blueprint, Kustomization, Reference, Repository, Source, TerraformComponent};
use features::Value;

impl Blueprint {
    /// Merge `overlay` into `self`; the overlay wins on conflicts.
    ///
    /// Sources and kustomizations are matched by name, terraform components
    /// by path. Unmatched entries append in overlay order.
    pub fn merge(&mut self, overlay: Self) {
        if !overlay.metadata.name.is_empty() {
            self.metadata.name = overlay.metadata.name;
        }
        if !overlay.metadata.description.is_empty() {
            self.metadata.description = overlay.metadata.description;
        }
        if !overlay.metadata.authors.is_empty() {
            self.metadata.authors = overlay.metadata.authors;
        }

        merge_repository(&mut self.repository, overlay.repository);

        for source in overlay.sources {
            match self.sources.iter_mut().find(|s| s.name == source.name) {
                Some(existing) => merge_source(existing, source),
                None => self.sources.push(source),
            }
        }

        for component in overlay.terraform {
            match self.terraform.iter_mut().find(|c| c.path == component.path) {
                Some(existing) => merge_component(existing, component),
                None => self.terraform.push(component),
            }
        }

        for kustomization in overlay.kustomizations {
            match self
                .kustomizations
                .iter_mut()
                .find(|k| k.name == kustomization.name)
            {
                Some(existing) => merge_kustomization(existing, kustomization),
                None => self.kustomizations.push(kustomization),
            }
        }
    }
}

fn merge_reference(base: &mut Reference, overlay: Reference) {
    if !overlay.is_empty() {
        *base = overlay;
    }
}

fn merge_repository(base: &mut Repository, overlay: Repository) {
    if !overlay.url.is_empty() {
        base.url = overlay.url;
    }
    merge_reference(&mut base.reference, overlay.reference);
    if overlay.secret_name.is_some() {
        base.secret_name = overlay.secret_name;
    }
}

fn merge_source(base: &mut Source, overlay: Source) {
    if !overlay.url.is_empty() {
        base.url = overlay.url;
    }
    merge_reference(&mut base.reference, overlay.reference);
    if overlay.path_prefix.is_some() {
        base.path_prefix = overlay.path_prefix;
    }
    if overlay.secret_name.is_some() {
        base.secret_name = overlay.secret_name;
    }
}

fn merge_component(base: &mut TerraformComponent, overlay: TerraformComponent) {
    if overlay.source.is_some() {
        base.source = overlay.source;
    }
    if overlay.destroy.is_some() {
        base.destroy = overlay.destroy;
    }
    let mut inputs = Value::Mapping(std::mem::take(&mut base.inputs));
    inputs.merge(Value::Mapping(overlay.inputs));
    if let Value::Mapping(merged) = inputs {
        base.inputs = merged;
    }
}

fn merge_kustomization(base: &mut Kustomization, overlay: Kustomization) {
    fn take_some<T>(slot: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *slot = value;
        }
    }

    if !overlay.path.is_empty() {
        base.path = overlay.path;
    }
    take_some(&mut base.source, overlay.source);
    take_some(&mut base.timeout, overlay.timeout);
    take_some(&mut base.interval, overlay.interval);
    take_some(&mut base.retry_interval, overlay.retry_interval);
    take_some(&mut base.wait, overlay.wait);
    take_some(&mut base.force, overlay.force);
    take_some(&mut base.prune, overlay.prune);

    if !overlay.depends_on.is_empty() {
        base.depends_on = overlay.depends_on;
    }
    if !overlay.patches.is_empty() {
        base.patches = overlay.patches;
    }
    if !overlay.components.is_empty() {
        base.components = overlay.components;
    }
    base.substitutions.extend(overlay.substitutions);
}
