// Error handling macros
// Log-and-continue helpers for best-effort code paths

/// Log an error and continue the enclosing loop
#[macro_export]
macro_rules! log_error {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(err) => {
                $crate::tracing::error!("Error: {}", err);
                continue;
            }
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(val) => val,
            Err(err) => {
                $crate::tracing::error!("{}: {}", $message, err);
                continue;
            }
        }
    };
}

/// Convert a Result to an Option, logging the error if it exists
#[macro_export]
macro_rules! result_to_option {
    ($result:expr) => {
        match $result {
            Ok(val) => Some(val),
            Err(err) => {
                $crate::tracing::error!("Error: {}", err);
                None
            }
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(val) => Some(val),
            Err(err) => {
                $crate::tracing::error!("{}: {}", $message, err);
                None
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::StoreError;

    #[test]
    fn test_result_to_option_swallows_error() {
        let failed: Result<u32, StoreError> = Err(StoreError::Destroyed("disk".to_string()));
        assert_eq!(crate::result_to_option!(failed, "read failed"), None);

        let ok: Result<u32, StoreError> = Ok(4);
        assert_eq!(crate::result_to_option!(ok), Some(4));
    }

    #[test]
    fn test_log_error_skips_failed_items() {
        let items: Vec<Result<u32, StoreError>> = vec![
            Ok(1),
            Err(StoreError::SyncError("x".to_string())),
            Ok(3),
        ];
        let mut kept = Vec::new();
        for item in items {
            let value = crate::log_error!(item, "skipping");
            kept.push(value);
        }
        assert_eq!(kept, vec![1, 3]);
    }
}
