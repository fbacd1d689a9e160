#[macro_use]
extern crate log;

mod optimizer;
pub mod plan_util;
mod rule_stack;
pub mod rules;

pub use optimizer::{Optimizer, RuleBasedOptimizer};
pub use rule_stack::RuleStack;
pub use rules::Rule;
