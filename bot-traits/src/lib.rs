use std::fmt::Debug;

/// Forwards the error side of a `Result` into tracing.
///
/// Event handlers must never bubble failures back into the dispatcher, so most
/// call sites end their chains with one of the `_ok` variants.
pub trait ForwardRefToTracing<T, E> {
    fn trace_err(self) -> Result<T, E>;
    fn trace_err_ok(self) -> Option<T>;
    /// Same as [`ForwardRefToTracing::trace_err_ok`], but at warning level.
    /// For failures that are expected to happen every now and then.
    fn trace_warn_ok(self) -> Option<T>;
}

impl<T, E> ForwardRefToTracing<T, E> for Result<T, E>
where
    E: Debug,
{
    fn trace_err(self) -> Result<T, E> {
        self.inspect_err(|e| tracing::error!(error = ?e, "operation failed"))
    }

    fn trace_err_ok(self) -> Option<T> {
        self.trace_err().ok()
    }

    fn trace_warn_ok(self) -> Option<T> {
        self.inspect_err(|e| tracing::warn!(error = ?e, "operation failed"))
            .ok()
    }
}

#[cfg(test)]
mod test {
    use super::ForwardRefToTracing;

    #[test]
    fn ok_values_pass_through() {
        let value: Result<u8, &str> = Ok(3);

        assert_eq!(value.trace_err(), Ok(3));
        assert_eq!(value.trace_warn_ok(), Some(3));
    }

    #[test]
    fn errors_are_swallowed_by_ok_variants() {
        let value: Result<u8, &str> = Err("nope");

        assert_eq!(value.trace_err(), Err("nope"));
        assert_eq!(value.trace_err_ok(), None);
        assert_eq!(value.trace_warn_ok(), None);
    }
}
