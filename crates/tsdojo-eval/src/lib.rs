//! tsdojo tree-walking interpreter.
//!
//! Executes a parsed submission directly from the AST. Each [`Interpreter`]
//! carries its own realm (global scope and built-in objects), a step budget,
//! a microtask queue and a virtual-time timer queue. Values cross the host
//! boundary through [`Interpreter::import_value`] and
//! [`Interpreter::export_value`].

mod activation;
mod builtins;
mod call;
mod convert;
mod env;
mod error;
mod eval_expr;
mod exec;
mod interpreter;
mod ops;
mod promise;
pub mod value;

pub use error::{EvalError, EvalResult};
pub use interpreter::{ConsoleLevel, ConsoleLine, Interpreter, Limits, Settled};
pub use value::{JsValue, Obj};
