use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        HoldframeError::timeout(Duration::from_millis(50))
            .to_string()
            .contains("timeout:")
    );
    assert!(
        HoldframeError::backend_unavailable("x")
            .to_string()
            .contains("backend unavailable:")
    );
    assert!(
        HoldframeError::encode_write("x")
            .to_string()
            .contains("encode write failed:")
    );
    assert!(
        HoldframeError::encode_open("x")
            .to_string()
            .contains("encode open failed:")
    );
    assert!(
        HoldframeError::invalid_geometry("x")
            .to_string()
            .contains("invalid geometry:")
    );
    assert!(
        HoldframeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        HoldframeError::state("x")
            .to_string()
            .contains("invalid state:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = HoldframeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_timeout_reports_is_timeout() {
    assert!(HoldframeError::timeout(Duration::ZERO).is_timeout());
    assert!(!HoldframeError::state("closed").is_timeout());
}
