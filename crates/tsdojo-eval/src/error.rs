//! Abrupt completions of the interpreter.
//!
//! Only [`EvalError::Throw`] is visible to learner code (`try`/`catch`
//! intercepts it). The step budget and suspension abort evaluation outright,
//! and the remaining variants carry statement-level control flow up to the
//! construct that consumes it.

use crate::value::JsValue;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// A thrown JavaScript value.
    #[error("uncaught exception")]
    Throw(JsValue),
    /// The step budget ran out.
    #[error("step limit exhausted")]
    GasExhausted,
    /// Top-level `await` on a promise that no queued job or timer can settle.
    #[error("await can never resume")]
    Suspended,
    /// An async body suspended at an `await`; unwinds to the call that
    /// started or resumed it.
    #[error("await outside of an async function")]
    Await,
    /// `return` unwinding to the enclosing function.
    #[error("return outside of a function")]
    Return(JsValue),
    #[error("break outside of a loop")]
    Break(Option<String>),
    #[error("continue outside of a loop")]
    Continue(Option<String>),
    /// `a?.b` met a nullish base; the enclosing chain yields `undefined`.
    #[error("optional chain short-circuited")]
    ShortCircuit,
}

impl EvalError {
    /// Whether `catch` may intercept this completion.
    pub fn is_catchable(&self) -> bool {
        matches!(self, EvalError::Throw(_))
    }

    /// Whether this completion aborts evaluation regardless of handlers.
    /// `finally` blocks do not run for it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EvalError::GasExhausted | EvalError::Suspended | EvalError::Await
        )
    }
}

/// Result alias for interpreter operations.
pub type EvalResult<T> = Result<T, EvalError>;
