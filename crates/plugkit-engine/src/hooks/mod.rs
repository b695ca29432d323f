//! Hook system: specifications, implementations, callers, and the dispatcher.

pub mod caller;
pub mod definitions;
pub mod dispatcher;
pub mod implementation;
pub mod markers;
pub mod relay;
pub mod spec;

pub use caller::{HookCaller, ResultCallback};
pub use definitions::{HookArgs, HookReturn, Priority};
pub use dispatcher::{HookOutcome, multicall};
pub use implementation::{Handler, HookFn, HookFunction, HookImpl, HookImplementation, HookWrapper};
pub use markers::{HookImplMarker, HookSpecMarker, ImplBuilder, SpecBuilder};
pub use relay::HookRelay;
pub use spec::{HookSpecification, HookSpecs, SpecNamespace, SpecOptions};
