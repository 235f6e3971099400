use muninn::{MuninnError, Result};

#[test]
fn test_error_display() {
    let err = MuninnError::Store("disk full".to_string());
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn test_loader_error_display() {
    let err = MuninnError::Loader("connection refused".to_string());
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_flush_diverged_reports_passes() {
    let err = MuninnError::FlushDiverged { passes: 64 };
    assert!(err.to_string().contains("64 render passes"));
}

#[test]
fn test_json_error_from() {
    let json_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
    let err: MuninnError = json_err.into();
    assert!(matches!(err, MuninnError::Json(_)));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(MuninnError::Configuration("bad".to_string()))
    }
    assert!(returns_error().is_err());
}
