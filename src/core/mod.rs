//! Core building blocks of the machine runtime.
//!
//! This module contains the leaf types every other layer is built from:
//! - Events and the mutable context record
//! - Guard expressions and their evaluator
//! - Action references and the dispatcher
//! - The transition history log

pub mod action;
pub mod context;
pub mod event;
pub mod guard;
pub mod history;

pub use action::{ActionFn, ActionMap, ActionRef};
pub use context::Context;
pub use event::{Event, INIT_EVENT};
pub use guard::{GuardExpr, GuardFn, GuardMap};
pub use history::{TransitionHistory, TransitionRecord};
