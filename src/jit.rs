//! Native compilation of expressions with Cranelift.
//!
//! Each expression becomes one function `extern "C" fn(*const f64) -> f64` that loads its
//! variables from the input pointer. `sqrt` maps to the native instruction while `sin`,
//! `cos` and `tan` call back into Rust through imported symbols.

use std::sync::Arc;

use crate::{
    errors::BuilderError,
    expr::{Expr, Func},
    types::EvalFn,
};
use cranelift::prelude::*;
use cranelift_codegen::{
    ir::{immediates::Offset32, FuncRef},
    Context,
};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use isa::TargetIsa;

type RawFn = extern "C" fn(*const f64) -> f64;

extern "C" fn host_sin(x: f64) -> f64 {
    x.sin()
}

extern "C" fn host_cos(x: f64) -> f64 {
    x.cos()
}

extern "C" fn host_tan(x: f64) -> f64 {
    x.tan()
}

const SIN_SYMBOL: &str = "exprfit_sin";
const COS_SYMBOL: &str = "exprfit_cos";
const TAN_SYMBOL: &str = "exprfit_tan";

struct ImportIds {
    sin: FuncId,
    cos: FuncId,
    tan: FuncId,
}

struct Imports {
    sin: FuncRef,
    cos: FuncRef,
    tan: FuncRef,
}

/// Compiles an expression to native code.
pub(crate) fn compile(expr: &Expr) -> Result<EvalFn, BuilderError> {
    let isa = create_isa()?;
    let (mut module, mut ctx) = create_module_and_context(isa);
    let ids = declare_imports(&mut module)?;
    build_function_body(&mut ctx, expr, &mut module, &ids)?;
    let raw_fn = compile_and_finalize(&mut module, &mut ctx)?;

    // The code pages belong to the module and must stay mapped for as long as the
    // returned closure can be called.
    std::mem::forget(module);

    let arity = expr.arity();
    Ok(Arc::new(move |input: &[f64]| {
        // Compiled loads are unchecked, the slice must cover every variable slot
        assert!(
            input.len() >= arity,
            "compiled expression needs {} inputs, got {}",
            arity,
            input.len()
        );
        raw_fn(input.as_ptr())
    }))
}

/// Creates a target ISA for the host machine.
fn create_isa() -> Result<Arc<dyn TargetIsa>, BuilderError> {
    let mut flag_builder = settings::builder();

    let target_triple = target_lexicon::Triple::host();
    let is_x86 = matches!(
        target_triple.architecture,
        target_lexicon::Architecture::X86_64
    );
    let colocated = if is_x86 { "true" } else { "false" };

    // cranelift-jit refuses position-independent code on every target
    for (name, value) in [
        ("use_colocated_libcalls", colocated),
        ("is_pic", "false"),
        ("opt_level", "speed"),
    ] {
        flag_builder
            .set(name, value)
            .map_err(|e| BuilderError::Codegen(e.to_string()))?;
    }

    let isa_builder = cranelift_native::builder()
        .map_err(|msg| BuilderError::HostMachineNotSupported(msg.to_string()))?;

    isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| BuilderError::Codegen(e.to_string()))
}

/// Creates the JIT module with the trigonometric host functions linked in, and a context
/// whose signature takes the input pointer and returns an f64.
fn create_module_and_context(isa: Arc<dyn TargetIsa>) -> (JITModule, Context) {
    let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());

    builder.symbol(SIN_SYMBOL, host_sin as *const u8);
    builder.symbol(COS_SYMBOL, host_cos as *const u8);
    builder.symbol(TAN_SYMBOL, host_tan as *const u8);

    let module = JITModule::new(builder);
    let mut ctx = module.make_context();

    let mut sig = module.make_signature();
    sig.params
        .push(AbiParam::new(module.target_config().pointer_type()));
    sig.returns.push(AbiParam::new(types::F64));
    ctx.func.signature = sig;

    (module, ctx)
}

fn declare_imports(module: &mut JITModule) -> Result<ImportIds, BuilderError> {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(types::F64));
    sig.returns.push(AbiParam::new(types::F64));

    let mut declare = |name: &str| {
        module
            .declare_function(name, Linkage::Import, &sig)
            .map_err(|e| BuilderError::Module(e.to_string()))
    };

    Ok(ImportIds {
        sin: declare(SIN_SYMBOL)?,
        cos: declare(COS_SYMBOL)?,
        tan: declare(TAN_SYMBOL)?,
    })
}

fn build_function_body(
    ctx: &mut Context,
    expr: &Expr,
    module: &mut JITModule,
    ids: &ImportIds,
) -> Result<(), BuilderError> {
    let mut builder_ctx = FunctionBuilderContext::new();
    let mut builder = FunctionBuilder::new(&mut ctx.func, &mut builder_ctx);

    let imports = Imports {
        sin: module.declare_func_in_func(ids.sin, builder.func),
        cos: module.declare_func_in_func(ids.cos, builder.func),
        tan: module.declare_func_in_func(ids.tan, builder.func),
    };

    let entry_block = builder.create_block();
    builder.append_block_params_for_function_params(entry_block);
    builder.switch_to_block(entry_block);
    builder.seal_block(entry_block);

    let input = builder.block_params(entry_block)[0];
    let result = codegen(expr, &mut builder, &imports, input)?;
    builder.ins().return_(&[result]);
    builder.finalize();

    Ok(())
}

/// Emits the instructions computing `expr` and returns the value holding the result.
fn codegen(
    expr: &Expr,
    builder: &mut FunctionBuilder,
    imports: &Imports,
    input: Value,
) -> Result<Value, BuilderError> {
    let value = match expr {
        Expr::Int(v) => builder.ins().f64const(*v as f64),
        Expr::Const(v) => builder.ins().f64const(*v),
        Expr::Var(var) => {
            let offset = i32::try_from(var.index)
                .ok()
                .and_then(|index| index.checked_mul(8))
                .ok_or_else(|| {
                    BuilderError::Codegen(format!("variable index {} out of range", var.index))
                })?;
            builder
                .ins()
                .load(types::F64, MemFlags::trusted(), input, Offset32::new(offset))
        }
        Expr::Neg(inner) => {
            let v = codegen(inner, builder, imports, input)?;
            builder.ins().fneg(v)
        }
        Expr::Add(l, r) => {
            let l = codegen(l, builder, imports, input)?;
            let r = codegen(r, builder, imports, input)?;
            builder.ins().fadd(l, r)
        }
        Expr::Sub(l, r) => {
            let l = codegen(l, builder, imports, input)?;
            let r = codegen(r, builder, imports, input)?;
            builder.ins().fsub(l, r)
        }
        Expr::Mul(l, r) => {
            let l = codegen(l, builder, imports, input)?;
            let r = codegen(r, builder, imports, input)?;
            builder.ins().fmul(l, r)
        }
        Expr::Div(l, r) => {
            let l = codegen(l, builder, imports, input)?;
            let r = codegen(r, builder, imports, input)?;
            builder.ins().fdiv(l, r)
        }
        Expr::Call(func, arg) => {
            let v = codegen(arg, builder, imports, input)?;
            let callee = match func {
                Func::Sqrt => return Ok(builder.ins().sqrt(v)),
                Func::Sin => imports.sin,
                Func::Cos => imports.cos,
                Func::Tan => imports.tan,
            };
            let call = builder.ins().call(callee, &[v]);
            builder.inst_results(call)[0]
        }
    };
    Ok(value)
}

/// Defines the function in the module and returns a pointer to the finalized code.
fn compile_and_finalize(module: &mut JITModule, ctx: &mut Context) -> Result<RawFn, BuilderError> {
    let func_id = module
        .declare_function("exprfit_eval", Linkage::Local, &ctx.func.signature)
        .map_err(|msg| BuilderError::Function(msg.to_string()))?;

    module
        .define_function(func_id, ctx)
        .map_err(|msg| BuilderError::Function(msg.to_string()))?;

    module.clear_context(ctx);
    module
        .finalize_definitions()
        .map_err(|e| BuilderError::Module(e.to_string()))?;

    // SAFETY: the function was compiled with the signature (pointer) -> f64 using the
    // module's default calling convention, which is the platform C convention.
    let func = unsafe {
        std::mem::transmute::<*const u8, RawFn>(module.get_finalized_function(func_id))
    };
    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{cos, sin, sqrt, tan};
    use approx::assert_relative_eq;

    #[test]
    fn test_compiled_matches_interpreter() -> Result<(), Box<dyn std::error::Error>> {
        let x = Expr::var(0, "x");
        let y = Expr::var(1, "y");
        let z = Expr::var(2, "z");
        let e = sin(&x) * &y + sqrt(&z) / tan(&y) - -cos(&x * &z) + Expr::Int(3) / 2.0;

        let f = compile(&e)?;
        for input in [[0.3, 1.1, 2.0], [-1.0, 0.5, 9.0], [2.5, -0.7, 0.01]] {
            assert_relative_eq!(f(&input), e.eval(&input)?, max_relative = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_host_isa_is_not_position_independent() -> Result<(), Box<dyn std::error::Error>> {
        let isa = create_isa()?;
        assert!(!isa.flags().is_pic());
        Ok(())
    }

    #[test]
    fn test_compiles_far_variable_index() -> Result<(), Box<dyn std::error::Error>> {
        let e = Expr::placeholder(1000) * 2;
        let f = compile(&e)?;
        let mut input = vec![0.0; 1001];
        input[1000] = 1.5;
        assert_eq!(f(&input), 3.0);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "compiled expression needs 4 inputs")]
    fn test_short_input_panics_instead_of_reading_past_the_slice() {
        let f = compile(&Expr::placeholder(3)).unwrap();
        f(&[1.0]);
    }

    #[test]
    fn test_compiled_function_is_shareable() -> Result<(), Box<dyn std::error::Error>> {
        let x = Expr::var(0, "x");
        let f = compile(&(&x * &x))?;
        let handle = std::thread::spawn(move || f(&[3.0]));
        assert_eq!(handle.join().map_err(|_| "thread panicked")?, 9.0);
        Ok(())
    }
}
