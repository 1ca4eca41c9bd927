//! Callable operations: built-in intrinsics and user-defined functions.
//!
//! A prototype pairs a signature with a [`CallRule`] that decides the
//! return type from the argument types and prints the call:
//!
//! ```text
//! FnPrototype ─→ Rule::Fixed(ty)     default `name(a, b)`, fixed return
//!             ├→ Rule::Builtin(b)    per-intrinsic typing and call form
//!             └→ Rule::Custom(rule)  host-supplied CallRule
//! ```

mod builtins;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::types::{BasicKind, Ty, TypeData};

pub use builtins::{Builtin, MathFn};

/// One argument at a call site: its current display name and type.
#[derive(Clone, Debug)]
pub struct CallArg {
    pub name: String,
    pub ty: Ty,
}

/// Typing and call-printing rule of a callable.
pub trait CallRule {
    fn resolve_return_type(&self, args: &[Ty]) -> Result<Ty, Diagnostic>;

    /// Text of the call expression (no trailing `;`).
    fn emit_call(&self, name: &str, args: &[CallArg]) -> Result<String, Diagnostic> {
        Ok(default_call(name, args))
    }
}

/// `name(a, b, c)` using each argument's display name.
pub fn default_call(name: &str, args: &[CallArg]) -> String {
    let names: Vec<&str> = args.iter().map(|a| a.name.as_str()).collect();
    format!("{}({})", name, names.join(", "))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    In,
    InOut,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub mode: ParamMode,
}

impl Param {
    pub fn input(name: &str, ty: Ty) -> Self {
        Self {
            name: name.to_string(),
            ty,
            mode: ParamMode::In,
        }
    }

    pub fn inout(name: &str, ty: Ty) -> Self {
        Self {
            name: name.to_string(),
            ty,
            mode: ParamMode::InOut,
        }
    }
}

#[derive(Clone)]
pub enum Rule {
    Fixed(Ty),
    Builtin(Builtin),
    Custom(Arc<dyn CallRule + Send + Sync>),
}

/// Immutable descriptor of a callable operation.
#[derive(Clone)]
pub struct FnPrototype {
    pub name: String,
    pub params: Vec<Param>,
    pub rule: Rule,
    /// Result differs per lane regardless of the arguments.
    pub divergent: bool,
}

impl FnPrototype {
    /// A callable with a fixed return type and the default call form.
    pub fn new(name: &str, ret: Ty, params: Vec<Param>) -> Self {
        Self {
            name: name.to_string(),
            params,
            rule: Rule::Fixed(ret),
            divergent: false,
        }
    }

    pub fn with_rule(name: &str, params: Vec<Param>, rule: Arc<dyn CallRule + Send + Sync>) -> Self {
        Self {
            name: name.to_string(),
            params,
            rule: Rule::Custom(rule),
            divergent: false,
        }
    }

    pub fn builtin(b: Builtin) -> Self {
        let params = (0..b.arity())
            .map(|i| Param::input(&format!("a{}", i), Ty::wildcard(i as u32)))
            .collect();
        let divergent = b.is_divergent();
        Self {
            name: b.name(),
            params,
            rule: Rule::Builtin(b),
            divergent,
        }
    }

    pub fn divergent(mut self) -> Self {
        self.divergent = true;
        self
    }

    pub fn fixed_return(&self) -> Option<&Ty> {
        match &self.rule {
            Rule::Fixed(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn resolve_return_type(&self, args: &[Ty]) -> Result<Ty, Diagnostic> {
        match &self.rule {
            Rule::Fixed(ret) => {
                self.check_params(args)?;
                Ok(ret.clone())
            }
            Rule::Builtin(b) => b.resolve_return_type(args),
            Rule::Custom(rule) => rule.resolve_return_type(args),
        }
    }

    pub fn emit_call(&self, args: &[CallArg]) -> Result<String, Diagnostic> {
        match &self.rule {
            Rule::Fixed(_) => Ok(default_call(&self.name, args)),
            Rule::Builtin(b) => b.emit_call(&self.name, args),
            Rule::Custom(rule) => rule.emit_call(&self.name, args),
        }
    }

    /// Arity and concrete parameter types; wildcards accept anything.
    fn check_params(&self, args: &[Ty]) -> Result<(), Diagnostic> {
        if args.len() != self.params.len() {
            return Err(Diagnostic::error(
                format!(
                    "`{}` expects {} arguments, got {}",
                    self.name,
                    self.params.len(),
                    args.len()
                ),
                Span::dummy(),
            ));
        }
        for (param, arg) in self.params.iter().zip(args) {
            let wildcard = matches!(param.ty.data(), TypeData::Wildcard(_));
            if !wildcard && param.ty != *arg {
                return Err(Diagnostic::error(
                    format!(
                        "`{}` parameter `{}` expects {}, got {}",
                        self.name, param.name, param.ty, arg
                    ),
                    Span::dummy(),
                ));
            }
        }
        Ok(())
    }

    /// Declaration header: `ret name(in T a, inout T b)`.
    pub fn definition(&self) -> Result<String, Diagnostic> {
        let ret = self.fixed_return().ok_or_else(|| {
            Diagnostic::error(
                format!("`{}` has no fixed return type to define", self.name),
                Span::dummy(),
            )
        })?;
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let mode = match p.mode {
                    ParamMode::In => "in",
                    ParamMode::InOut => "inout",
                };
                format!("{} {} {}", mode, p.ty, p.name)
            })
            .collect();
        Ok(format!("{} {}({})", ret, self.name, params.join(", ")))
    }
}

impl fmt::Display for FnPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        write!(f, "{}({})", self.name, params.join(", "))?;
        if let Some(ret) = self.fixed_return() {
            write!(f, " -> {}", ret)?;
        }
        if self.divergent {
            write!(f, " [divergent]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FnPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnPrototype({})", self)
    }
}

/// Name → prototype registry of callables available to a kernel.
#[derive(Clone, Debug, Default)]
pub struct IntrinsicTable {
    entries: BTreeMap<String, Arc<FnPrototype>>,
}

impl IntrinsicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with every built-in intrinsic.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for b in Builtin::catalog() {
            table.register(FnPrototype::builtin(b));
        }
        table
    }

    pub fn register(&mut self, proto: FnPrototype) -> Arc<FnPrototype> {
        let proto = Arc::new(proto);
        self.entries.insert(proto.name.clone(), proto.clone());
        proto
    }

    pub fn get(&self, name: &str) -> Option<Arc<FnPrototype>> {
        self.entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FnPrototype>> {
        self.entries.values()
    }
}

pub(crate) fn type_error(name: &str, message: String) -> Diagnostic {
    Diagnostic::error(format!("`{}`: {}", name, message), Span::dummy())
}

pub(crate) fn describe(args: &[Ty]) -> String {
    let names: Vec<String> = args.iter().map(Ty::name).collect();
    format!("({})", names.join(", "))
}

pub(crate) fn is_kind_family(ty: &Ty, pred: fn(BasicKind) -> bool) -> bool {
    ty.kind().is_some_and(pred)
}
