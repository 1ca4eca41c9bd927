//! Per-node emission into a [`Module`].

use std::rc::Rc;

use super::{Expr, ExprKind, Index, Op};
use crate::diagnostic::Diagnostic;
use crate::intrinsic::CallArg;
use crate::module::Module;

impl Expr {
    /// Write the statements computing this node, operands first. A node
    /// already emitted in the current scope (or an enclosing one) is not
    /// written again.
    pub fn emit(self: &Rc<Self>, module: &mut Module) -> Result<(), Diagnostic> {
        if module.is_emitted(self.id) {
            return Ok(());
        }
        let ty = self.infer_type()?;
        match &self.kind {
            ExprKind::Literal(lit) => self.set_name(&lit.text()?),
            ExprKind::Op { op, lhs, rhs } => {
                if let Some(lhs) = lhs {
                    lhs.emit(module)?;
                }
                rhs.emit(module)?;
                let r = rhs.name();
                match (lhs, *op) {
                    (Some(lhs), op) if op.is_assign() => {
                        let target = lhs.name();
                        module.write(&format!("{} {} {};\n", target, op, r));
                        self.set_name(&target);
                        if module.in_divergent_region() {
                            lhs.force_divergent();
                            lhs.lvalue_root().force_divergent();
                        }
                    }
                    (Some(lhs), op) => {
                        module.write(&format!("{} {} = {}{}{};\n", ty, self.name(), lhs.name(), op, r));
                    }
                    (None, Op::Assign) => {
                        module.write(&format!("{} {} = {};\n", ty, self.name(), r));
                    }
                    (None, op) => {
                        module.write(&format!("{} {} = {}{};\n", ty, self.name(), op, r));
                    }
                }
            }
            ExprKind::Call { proto, args } => {
                let mut call_args = Vec::with_capacity(args.len());
                for arg in args {
                    arg.emit(module)?;
                    call_args.push(CallArg {
                        name: arg.name(),
                        ty: arg.infer_type()?,
                    });
                }
                let call = proto.emit_call(&call_args)?;
                if ty.is_void() {
                    module.write(&format!("{};\n", call));
                } else {
                    module.write(&format!("{} {} = {};\n", ty, self.name(), call));
                }
            }
            ExprKind::Resource(res) => {
                module.register_resource(res)?;
                self.set_name(&res.name);
            }
            ExprKind::Input(input) => self.set_name(input.name()),
            ExprKind::Array { elem, len, init } => {
                module.register_type(elem)?;
                if init.is_empty() {
                    module.write(&format!("{} {}[{}];\n", elem, self.name(), len));
                } else {
                    let mut text = format!("{} {}[{}] = {{\n", elem, self.name(), len);
                    for value in init {
                        text.push_str(&value.text()?);
                        text.push_str(",\n");
                    }
                    text.push_str("};\n");
                    module.write(&text);
                }
            }
            ExprKind::Swizzle { base, lanes } => {
                base.emit(module)?;
                self.set_name(&format!("{}.{}", base.name(), lanes));
            }
            ExprKind::Field { base, field } => {
                base.emit(module)?;
                self.set_name(&format!("{}.{}", base.name(), field));
            }
            ExprKind::Index { base, index } => {
                base.emit(module)?;
                let index = match index {
                    Index::Const(i) => i.to_string(),
                    Index::Expr(i) => {
                        i.emit(module)?;
                        i.name()
                    }
                };
                self.set_name(&format!("{}[{}]", base.name(), index));
            }
            ExprKind::Ref(ty) => module.register_type(ty)?,
            ExprKind::Zeroed(ty) => {
                module.register_type(ty)?;
                module.write(&format!("{} {} = ({})0;\n", ty, self.name(), ty));
            }
            ExprKind::Select {
                cond,
                then,
                otherwise,
            } => {
                cond.emit(module)?;
                module.write(&format!("{} {};\nif ({}) {{\n", ty, self.name(), cond.name()));
                module.enter_scope(Some(cond.clone()));
                then.emit(module)?;
                module.write(&format!("{} = {};\n", self.name(), then.name()));
                module.exit_scope()?;
                module.write("} else {\n");
                module.enter_scope(Some(cond.clone()));
                otherwise.emit(module)?;
                module.write(&format!("{} = {};\n", self.name(), otherwise.name()));
                module.exit_scope()?;
                module.write("}\n");
            }
        }
        module.mark_emitted(self.id);
        Ok(())
    }
}
