//! Helpers shared by the coordinator and worker binaries.

/// Replace `${VAR}` with the value of environment variable `VAR`.
///
/// Unset variables expand to an empty string. An unterminated `${` is left
/// as is.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        if let Ok(value) = std::env::var(&after[..end]) {
            out.push_str(&value);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
