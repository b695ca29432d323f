//! Convenience macros for hosts and plugins.

/// Builds [`HookArgs`](crate::hooks::HookArgs) from `key => value` pairs.
///
/// Values go through `serde_json::json!`, so literals, arrays and objects
/// all work.
///
/// # Example
/// ```rust,ignore
/// let args = hook_args! {
///     "arg" => 3,
///     "tags" => ["a", "b"],
/// };
/// ```
#[macro_export]
macro_rules! hook_args {
    () => {
        $crate::hooks::HookArgs::new()
    };
    ($($key:expr => $value:tt),* $(,)?) => {{
        let mut args = $crate::hooks::HookArgs::new();
        $(
            args.data.insert($key.to_string(), $crate::serde_json::json!($value));
        )*
        args
    }};
}
