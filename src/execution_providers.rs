//! Execution provider availability.

use crate::types::ExecutionProviderInfo;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider, ROCmExecutionProvider,
    TensorRTExecutionProvider,
};

/// Execution providers the linked ONNX Runtime can use. CPU is always first.
///
/// ```
/// use pharmnn_onnx::{ExecutionProviderInfo, available_execution_providers};
///
/// let providers = available_execution_providers();
/// assert_eq!(providers[0], ExecutionProviderInfo::Cpu);
/// ```
#[must_use]
pub fn available_execution_providers() -> Vec<ExecutionProviderInfo> {
    let mut providers = vec![ExecutionProviderInfo::Cpu];

    macro_rules! check_provider {
        ($provider:ty, $variant:expr) => {
            if <$provider>::default().is_available().unwrap_or(false) {
                providers.push($variant);
            }
        };
    }

    check_provider!(CUDAExecutionProvider, ExecutionProviderInfo::Cuda);
    check_provider!(TensorRTExecutionProvider, ExecutionProviderInfo::TensorRt);
    check_provider!(CoreMLExecutionProvider, ExecutionProviderInfo::CoreMl);
    check_provider!(ROCmExecutionProvider, ExecutionProviderInfo::Rocm);

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_first_and_unique() {
        let providers = available_execution_providers();
        assert_eq!(providers[0], ExecutionProviderInfo::Cpu);
        let cpu_count = providers
            .iter()
            .filter(|p| **p == ExecutionProviderInfo::Cpu)
            .count();
        assert_eq!(cpu_count, 1);
    }

    #[test]
    fn test_no_duplicates() {
        let providers = available_execution_providers();
        let unique: std::collections::HashSet<_> = providers.iter().collect();
        assert_eq!(unique.len(), providers.len());
    }
}
