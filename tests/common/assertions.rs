//! Domain-specific assertion macros for iqe harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! show the raw transport output next to the value that did not match.

/// Assert that an `InferenceResult` has a parsed key with an expected value.
///
/// ```rust
/// assert_parsed!(result, "generated_text", "74 degrees F");
/// ```
#[macro_export]
macro_rules! assert_parsed {
    ($result:expr, $key:expr, $value:expr) => {{
        let result: &iqe::InferenceResult = &$result;
        let key: &str = $key;
        let expected = serde_json::json!($value);
        match result.parsed.get(key) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_parsed! failed:\n  parsed[{:?}]\n  expected: {}\n  actual:   {}\n  raw: {:?}",
                key, expected, actual, result.raw_output
            ),
            None => panic!(
                "assert_parsed! failed: key {:?} not found.\n  Available keys: {:?}\n  raw: {:?}",
                key,
                result.parsed.keys().collect::<Vec<_>>(),
                result.raw_output
            ),
        }
    }};
}

/// Assert that a result is `Err(Error::InferenceExecution { .. })` whose
/// stderr contains `needle`.
#[macro_export]
macro_rules! assert_execution_error {
    ($result:expr, $needle:expr) => {{
        match $result {
            Err(iqe_core::Error::InferenceExecution {
                stderr, command, ..
            }) => {
                let needle: &str = $needle;
                assert!(
                    stderr.contains(needle),
                    "assert_execution_error! failed: stderr {:?} does not contain {:?} (command: {})",
                    stderr,
                    needle,
                    command
                );
            }
            Err(other) => panic!("assert_execution_error! failed: unexpected error {other:?}"),
            Ok(value) => panic!("assert_execution_error! failed: call succeeded with {value:?}"),
        }
    }};
}

/// Assert that a verification passed, printing the error on failure.
#[macro_export]
macro_rules! assert_verified {
    ($verification:expr) => {{
        if let Err(err) = $verification {
            panic!("assert_verified! failed: {err}\n  {err:?}");
        }
    }};
}
