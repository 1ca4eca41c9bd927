//! Kernel module: the tables and text buffers a kernel is emitted into.
//!
//! Emission is memoized per scope. Each scope holds the set of node ids
//! already written in it; entering a scope starts from a copy of the
//! parent's set, so values computed outside are reused inside while
//! values first computed inside a branch are written again after it.
//!
//! ```text
//! root {1, 2}
//!  └─ if   {1, 2, 7}      7 visible only here
//!  └─ else {1, 2, 9}
//! ```

mod finalize;
mod manifest;

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::expr::{Divergence, ExprRef};
use crate::resource::Resource;
use crate::span::Span;
use crate::types::{Access, Ty, TypeData};

pub use manifest::{Manifest, ManifestEntry};

/// What a `break` would leave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakTarget {
    Loop,
    Switch,
}

/// Saved emission state of the enclosing body while a free function is
/// being written.
struct FunctionFrame {
    text: String,
    emitted: Vec<Rc<HashSet<u32>>>,
    conditions: Vec<Option<ExprRef>>,
    break_targets: Vec<BreakTarget>,
}

pub struct Module {
    config: KernelConfig,
    resources: BTreeMap<String, Arc<Resource>>,
    types: BTreeMap<String, Ty>,
    /// Structs in registration order; dependencies come first.
    struct_order: Vec<Ty>,
    lds: BTreeMap<String, Ty>,
    header: String,
    functions: String,
    body: String,
    frames: Vec<FunctionFrame>,
    emitted: Vec<Rc<HashSet<u32>>>,
    conditions: Vec<Option<ExprRef>>,
    group_size: [u32; 3],
    wave32: bool,
    masks: Vec<ExprRef>,
    break_targets: Vec<BreakTarget>,
    synced: bool,
}

fn module_error(message: String) -> Diagnostic {
    Diagnostic::error(message, Span::dummy())
}

impl Module {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            config: config.clone(),
            resources: BTreeMap::new(),
            types: BTreeMap::new(),
            struct_order: Vec::new(),
            lds: BTreeMap::new(),
            header: String::new(),
            functions: String::new(),
            body: String::new(),
            frames: Vec::new(),
            emitted: vec![Rc::new(HashSet::new())],
            conditions: Vec::new(),
            group_size: [8, 8, 1],
            wave32: false,
            masks: Vec::new(),
            break_targets: Vec::new(),
            synced: false,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ── Writers ──

    /// Append to the current body: the innermost function being defined,
    /// or the entry point.
    pub fn write(&mut self, text: &str) {
        self.body_mut().push_str(text);
    }

    fn body_mut(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.text,
            None => &mut self.body,
        }
    }

    /// Text of the body currently being written.
    pub fn current_text(&self) -> &str {
        match self.frames.last() {
            Some(frame) => &frame.text,
            None => &self.body,
        }
    }

    /// Append free-form declarations emitted before the free functions.
    pub fn write_header(&mut self, text: &str) {
        self.header.push_str(text);
    }

    /// Redirect emission into a fresh free-function body. Nothing emitted in
    /// the enclosing body is visible inside.
    pub fn enter_function(&mut self) {
        let frame = FunctionFrame {
            text: String::new(),
            emitted: std::mem::replace(&mut self.emitted, vec![Rc::new(HashSet::new())]),
            conditions: std::mem::take(&mut self.conditions),
            break_targets: std::mem::take(&mut self.break_targets),
        };
        self.frames.push(frame);
    }

    /// Finish the innermost free function and append its text to the
    /// function section.
    pub fn exit_function(&mut self) -> Result<(), Diagnostic> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| module_error("exit_function without a matching enter_function".to_string()))?;
        if self.emitted.len() != 1 {
            return Err(module_error("function body left a scope open".to_string()));
        }
        self.emitted = frame.emitted;
        self.conditions = frame.conditions;
        self.break_targets = frame.break_targets;
        self.functions.push_str(&frame.text);
        Ok(())
    }

    pub fn in_function(&self) -> bool {
        !self.frames.is_empty()
    }

    // ── Scopes ──

    /// Open a nested scope guarded by `cond` (absent for unconditional
    /// blocks such as loop bodies).
    pub fn enter_scope(&mut self, cond: Option<ExprRef>) {
        let current = self
            .emitted
            .last()
            .cloned()
            .unwrap_or_else(|| Rc::new(HashSet::new()));
        self.emitted.push(current);
        self.conditions.push(cond);
    }

    pub fn exit_scope(&mut self) -> Result<(), Diagnostic> {
        if self.emitted.len() <= 1 || self.conditions.pop().is_none() {
            return Err(module_error("scope stack underflow".to_string()));
        }
        self.emitted.pop();
        Ok(())
    }

    pub fn scope_depth(&self) -> usize {
        self.emitted.len() - 1
    }

    pub fn is_emitted(&self, id: u32) -> bool {
        self.emitted.last().is_some_and(|set| set.contains(&id))
    }

    pub fn mark_emitted(&mut self, id: u32) {
        if let Some(set) = self.emitted.last_mut() {
            Rc::make_mut(set).insert(id);
        }
    }

    /// Whether any enclosing condition differs per lane.
    pub fn in_divergent_region(&self) -> bool {
        self.conditions
            .iter()
            .flatten()
            .any(|cond| cond.divergence() == Divergence::Divergent)
    }

    // ── Break targets ──

    pub fn push_break_target(&mut self, target: BreakTarget) {
        self.break_targets.push(target);
    }

    pub fn pop_break_target(&mut self) -> Result<BreakTarget, Diagnostic> {
        self.break_targets
            .pop()
            .ok_or_else(|| module_error("break target stack underflow".to_string()))
    }

    /// A `break` must leave a loop; inside a switch it would only leave
    /// the case.
    pub fn check_break(&self, what: &str) -> Result<(), Diagnostic> {
        match self.break_targets.last() {
            Some(BreakTarget::Loop) => Ok(()),
            Some(BreakTarget::Switch) => Err(module_error(format!(
                "`{}` inside a switch case would not leave the loop",
                what
            ))
            .with_help("restructure the loop so the switch sets a flag and break after it".to_string())),
            None => Err(module_error(format!("`{}` outside of a loop", what))),
        }
    }

    /// `continue` may sit inside a switch as long as a loop encloses it.
    pub fn check_continue(&self) -> Result<(), Diagnostic> {
        if self.break_targets.contains(&BreakTarget::Loop) {
            Ok(())
        } else {
            Err(module_error("`continue` outside of a loop".to_string()))
        }
    }

    // ── Group size / wave32 ──

    pub fn group_size(&self) -> [u32; 3] {
        self.group_size
    }

    /// Each axis at least 1 and a whole number of 32-lane waves.
    pub fn set_group_size(&mut self, x: u32, y: u32, z: u32) -> Result<(), Diagnostic> {
        if x == 0 || y == 0 || z == 0 {
            return Err(module_error(format!(
                "group size ({}, {}, {}) has an empty axis",
                x, y, z
            )));
        }
        let threads = x as u64 * y as u64 * z as u64;
        if threads % 32 != 0 {
            return Err(module_error(format!(
                "group size ({}, {}, {}) is {} threads, not a multiple of 32",
                x, y, z, threads
            ))
            .with_note("groups are dispatched in whole 32-lane waves".to_string()));
        }
        self.group_size = [x, y, z];
        Ok(())
    }

    pub fn is_wave32(&self) -> bool {
        self.wave32
    }

    /// Switch to wave32 lowering with `seed` as the outermost lane mask.
    pub fn enable_wave32(&mut self, seed: ExprRef) {
        self.wave32 = true;
        self.masks.clear();
        self.masks.push(seed);
    }

    pub fn push_mask(&mut self, mask: ExprRef) {
        self.masks.push(mask);
    }

    pub fn pop_mask(&mut self) -> Result<ExprRef, Diagnostic> {
        if self.masks.len() <= 1 {
            return Err(module_error("lane mask stack underflow".to_string()));
        }
        self.masks
            .pop()
            .ok_or_else(|| module_error("lane mask stack underflow".to_string()))
    }

    pub fn current_mask(&self) -> Result<ExprRef, Diagnostic> {
        self.masks.last().cloned().ok_or_else(|| {
            module_error("no lane mask: wave32 mode is not enabled".to_string())
        })
    }

    pub(crate) fn note_group_sync(&mut self) {
        self.synced = true;
    }

    // ── Tables ──

    /// Record the named types `ty` depends on.
    pub fn register_type(&mut self, ty: &Ty) -> Result<(), Diagnostic> {
        match ty.data() {
            TypeData::Struct { name, fields, .. } => {
                if let Some(existing) = self.types.get(name) {
                    if existing != ty {
                        return Err(module_error(format!(
                            "conflicting definitions of struct `{}`",
                            name
                        )));
                    }
                    return Ok(());
                }
                for (_, field) in fields {
                    self.register_type(field)?;
                }
                self.types.insert(name.clone(), ty.clone());
                self.struct_order.push(ty.clone());
                Ok(())
            }
            TypeData::Array { elem, .. } => self.register_type(elem),
            TypeData::Resource { elem: Some(elem), .. } => self.register_type(elem),
            _ => Ok(()),
        }
    }

    pub fn register_resource(&mut self, res: &Arc<Resource>) -> Result<(), Diagnostic> {
        if let Some(existing) = self.resources.get(&res.name) {
            if existing.ty != res.ty || existing.binding != res.binding {
                return Err(module_error(format!(
                    "resource `{}` registered twice with different shapes ({} vs {})",
                    res.name, existing.ty, res.ty
                )));
            }
            return Ok(());
        }
        self.register_type(&res.ty)?;
        self.resources.insert(res.name.clone(), res.clone());
        Ok(())
    }

    /// Declare group-shared storage `name` of type `ty`.
    pub fn add_lds(&mut self, name: &str, ty: &Ty) -> Result<(), Diagnostic> {
        if let Some(existing) = self.lds.get(name) {
            if existing != ty {
                return Err(module_error(format!(
                    "shared memory `{}` redeclared as {} (was {})",
                    name, ty, existing
                )));
            }
            return Ok(());
        }
        self.register_type(ty)?;
        self.lds.insert(name.to_string(), ty.clone());
        Ok(())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// Registered structs, each after the structs its fields use.
    pub fn structs(&self) -> impl Iterator<Item = &Ty> {
        self.struct_order.iter()
    }

    /// Non-fatal findings about the kernel as emitted so far.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let writes_something = self
            .resources
            .values()
            .any(|r| r.shape().access() == Some(Access::ReadWrite));
        if !writes_something {
            out.push(Diagnostic::warning(
                "kernel declares no writable resource; it has no visible effect".to_string(),
                Span::dummy(),
            ));
        }
        if !self.lds.is_empty() && !self.synced {
            out.push(
                Diagnostic::warning(
                    "shared memory is used without a group barrier".to_string(),
                    Span::dummy(),
                )
                .with_help("call group_sync() between writes and reads of shared memory".to_string()),
            );
        }
        out
    }
}
