//! Environment expansion tests.

use drover_protocol::utils::expand_env_vars;

#[test]
fn expands_set_and_unset_vars() {
    unsafe { std::env::set_var("TEST_DROVER_UTILS_HOST", "10.0.0.1") };
    assert_eq!(
        expand_env_vars("bind = \"${TEST_DROVER_UTILS_HOST}:${TEST_DROVER_UTILS_UNSET}5000\""),
        "bind = \"10.0.0.1:5000\""
    );
    unsafe { std::env::remove_var("TEST_DROVER_UTILS_HOST") };
}

#[test]
fn unterminated_reference_is_kept() {
    assert_eq!(expand_env_vars("a ${b"), "a ${b");
    assert_eq!(expand_env_vars("no refs"), "no refs");
}
