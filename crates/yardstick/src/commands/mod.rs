pub mod probe;
pub mod typecheck;
