//! Lifecycle orchestrator - drives install and teardown of a blueprint

use crate::cancel::CancelToken;
use crate::context::{Collaborators, NoProgress, ProgressCallback, Step};
use crate::error::{Error, Result};
use crate::templates::{PlatformTemplates, TemplateDocument};
use crate::types::{ExecuteSummary, OrchestratorOptions};
use crate::waiter;
use blueprint::{Blueprint, DependencyGraph, KustomizationManifest, manifest_encoder};
use features::{Value, evaluate_defaults, resolve_value};

/// Owns a blueprint and applies it through the injected collaborators.
///
/// Methods that change the blueprint take `&mut self`, so loading cannot
/// overlap with an install or teardown of the same instance.
pub struct Orchestrator {
    context: String,
    blueprint: Blueprint,
    values: Value,
    collaborators: Collaborators,
    templates: PlatformTemplates,
    options: OrchestratorOptions,
    progress: Box<dyn ProgressCallback>,
    cancel: CancelToken,
}

impl Orchestrator {
    /// Create an orchestrator for `context` with an empty blueprint
    pub fn new(
        context: impl Into<String>,
        collaborators: Collaborators,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            context: context.into(),
            blueprint: Blueprint::default(),
            values: Value::mapping(),
            collaborators,
            templates: PlatformTemplates::builtin(),
            options,
            progress: Box::new(NoProgress),
            cancel: CancelToken::new(),
        }
    }

    /// Use a different template catalog
    pub fn with_templates(mut self, templates: PlatformTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Token that cancels any wait this orchestrator performs
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Context values with resolved defaults, from the last template pass
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Replace the blueprint wholesale
    pub fn set_blueprint(&mut self, blueprint: Blueprint) {
        self.blueprint = blueprint;
    }

    /// Reload the blueprint: platform template, then the context's overrides.
    ///
    /// With `reset`, previously merged state is discarded first.
    pub fn load_config(&mut self, reset: bool) -> Result<()> {
        let context = self.context.clone();
        self.process_context_templates(&context, reset)?;

        let overrides = self
            .collaborators
            .store
            .blueprint_overrides(&context)
            .map_err(|e| Error::config(format!("{e:#}")))?;
        for (i, document) in overrides.iter().enumerate() {
            let resolved = resolve_value(document, &self.values)?;
            let layer = Blueprint::from_value(&resolved)?;
            log::debug!("merging blueprint override {} for '{context}'", i + 1);
            self.blueprint.merge(layer);
        }

        log::info!(
            "loaded blueprint '{}': {} component(s), {} kustomization(s)",
            self.blueprint.metadata.name,
            self.blueprint.terraform.len(),
            self.blueprint.kustomizations.len()
        );
        Ok(())
    }

    /// Render the platform template for `context_name` and merge it in.
    ///
    /// The platform comes from the context's `platform` value. Defaults from
    /// the template's `values` are resolved against the context, and the
    /// context wins where both set a key. Returns the resolved values.
    pub fn process_context_templates(&mut self, context_name: &str, reset: bool) -> Result<Value> {
        let context = self
            .collaborators
            .store
            .context_values(context_name)
            .map_err(|e| Error::config(format!("{e:#}")))?;
        if !(context.is_null() || context.as_mapping().is_some()) {
            return Err(Error::config(format!(
                "values for context '{context_name}' must be a mapping, got {}",
                context.kind()
            )));
        }

        let platform = context
            .get("platform")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let template = self.templates.select(platform);

        let document = if template.is_empty() {
            TemplateDocument::default()
        } else {
            let rendered = self
                .collaborators
                .templates
                .render(&template.name, &template.text, &context)
                .map_err(|e| Error::Template {
                    name: template.name.clone(),
                    message: format!("{e:#}"),
                })?;
            TemplateDocument::from_value(&rendered)?
        };

        let mut values = Value::Mapping(evaluate_defaults(&document.values, &context)?);
        if !context.is_null() {
            values.merge(context);
        }

        let mut layer = Blueprint::from_value(&resolve_value(&document.blueprint, &values)?)?;
        for feature in &document.features {
            if feature.is_active(&values)? {
                log::info!("feature '{}' active", feature.name);
                layer.merge(feature.fragment(&values)?);
            } else {
                log::debug!("feature '{}' inactive", feature.name);
            }
        }

        if reset {
            self.blueprint = layer;
        } else {
            self.blueprint.merge(layer);
        }
        self.context = context_name.to_string();
        self.values = values.clone();
        Ok(values)
    }

    /// Apply components, then kustomizations in dependency order, then wait.
    ///
    /// Stops at the first failure. Every reported step start is followed by
    /// its completion; skipped steps report neither.
    pub fn install(&mut self) -> Result<ExecuteSummary> {
        let mut summary = ExecuteSummary::default();
        let dry_run = self.options.dry_run;

        for component in &self.blueprint.terraform {
            if dry_run {
                log::info!("would apply component '{}'", component.path);
                summary.skipped += 1;
                continue;
            }
            self.progress
                .on_step_start(Step::ApplyComponent, &component.path);
            let result = self
                .collaborators
                .infrastructure
                .apply(component, &component.inputs);
            self.progress
                .on_step_complete(Step::ApplyComponent, &component.path, result.is_ok());
            result.map_err(|e| Error::executor(&component.path, format!("{e:#}")))?;
            summary.components_applied += 1;
        }

        let graph = self.analyze();
        let encoder = manifest_encoder();
        for name in graph.install_order() {
            let Some(kustomization) = self.blueprint.find_kustomization(&name) else {
                continue;
            };
            let manifest =
                KustomizationManifest::new(&self.blueprint, kustomization, &self.options.namespace);
            let document = encoder.encode(&manifest)?;
            if dry_run {
                log::info!("would apply kustomization '{name}'");
                summary.skipped += 1;
                continue;
            }
            self.progress
                .on_step_start(Step::ApplyKustomization, &name);
            let result = self
                .collaborators
                .reconciler
                .apply(kustomization, &document);
            self.progress
                .on_step_complete(Step::ApplyKustomization, &name, result.is_ok());
            result.map_err(|e| Error::executor(&name, format!("{e:#}")))?;
            summary.kustomizations_applied += 1;
        }

        if !dry_run {
            summary.waited = self.wait_for_kustomizations("Waiting for kustomizations", &[])?;
        }

        log::info!("install complete: {} change(s)", summary.total_changes());
        Ok(summary)
    }

    /// Delete kustomizations dependents-first, then destroy components in
    /// reverse declaration order.
    pub fn down(&mut self) -> Result<ExecuteSummary> {
        let mut summary = ExecuteSummary::default();
        let dry_run = self.options.dry_run;

        let graph = self.analyze();
        for name in graph.teardown_order() {
            let Some(kustomization) = self.blueprint.find_kustomization(&name) else {
                continue;
            };
            if dry_run {
                log::info!("would delete kustomization '{name}'");
                summary.skipped += 1;
                continue;
            }
            self.progress
                .on_step_start(Step::DeleteKustomization, &name);
            let result = self.collaborators.reconciler.delete(kustomization);
            self.progress
                .on_step_complete(Step::DeleteKustomization, &name, result.is_ok());
            result.map_err(|e| Error::executor(&name, format!("{e:#}")))?;
            summary.kustomizations_deleted += 1;
        }

        for component in self.blueprint.terraform.iter().rev() {
            if !component.should_destroy() {
                log::info!("keeping component '{}'", component.path);
                summary.skipped += 1;
                continue;
            }
            if dry_run {
                log::info!("would destroy component '{}'", component.path);
                summary.skipped += 1;
                continue;
            }
            self.progress
                .on_step_start(Step::DestroyComponent, &component.path);
            let result = self
                .collaborators
                .infrastructure
                .destroy(component, &component.inputs);
            self.progress
                .on_step_complete(Step::DestroyComponent, &component.path, result.is_ok());
            result.map_err(|e| Error::executor(&component.path, format!("{e:#}")))?;
            summary.components_destroyed += 1;
        }

        log::info!("teardown complete: {} change(s)", summary.total_changes());
        Ok(summary)
    }

    /// Block until the named kustomizations are ready.
    ///
    /// With no names, waits on every kustomization whose `wait` flag is set.
    /// Returns how many were confirmed ready.
    pub fn wait_for_kustomizations(&mut self, message: &str, names: &[String]) -> Result<usize> {
        waiter::wait_for_kustomizations(
            self.collaborators.status.as_ref(),
            &self.blueprint.kustomizations,
            message,
            names,
            &self.options.wait,
            self.cancel.clone(),
            self.progress.as_mut(),
        )
    }

    /// Fresh dependency graph for the current kustomizations, with
    /// diagnostics logged
    fn analyze(&self) -> DependencyGraph {
        let graph = DependencyGraph::from_kustomizations(&self.blueprint.kustomizations);
        for (name, missing) in graph.dangling_references() {
            log::warn!("kustomization '{name}' depends on unknown '{missing}'");
        }
        if graph.has_cycle() {
            log::warn!("kustomization dependencies contain a cycle; order is best-effort");
        }
        graph
    }
}
