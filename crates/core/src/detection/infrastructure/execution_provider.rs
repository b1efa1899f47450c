/// Return the preferred ONNX execution providers for the current platform,
/// in priority order.
///
/// ort registers the first provider that works and falls back to CPU when
/// none can be registered.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Human-readable name of the accelerated backend tried first.
pub fn preferred_device_name() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "CoreML"
    }
    #[cfg(target_os = "windows")]
    {
        "DirectML"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_platforms_register_no_accelerator() {
        let providers = preferred_execution_providers();
        if preferred_device_name() == "CPU" {
            assert!(providers.is_empty());
        } else {
            assert_eq!(providers.len(), 1);
        }
    }
}
