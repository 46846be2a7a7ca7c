/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders.
///
/// Unset variables without a fallback are left as-is so a missing secret
/// shows up verbatim in validation errors instead of as an empty string.
pub fn substitute_env(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), std::env::var(name), fallback) {
            (false, Ok(val), _) => result.push_str(&val),
            (false, Err(_), Some(fallback)) => result.push_str(fallback),
            _ => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let Ok(path) = std::env::var("PATH") else {
            return;
        };
        assert_eq!(substitute_env("bin=${PATH};"), format!("bin={path};"));
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${LANSITE_NONEXISTENT_XYZ}"),
            "${LANSITE_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn uses_fallback_for_unset_var() {
        assert_eq!(
            substitute_env("port = ${LANSITE_NONEXISTENT_PORT:-3000}"),
            "port = 3000"
        );
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        assert_eq!(substitute_env("key=${OPEN"), "key=${OPEN");
        assert_eq!(substitute_env("a ${} b"), "a ${} b");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
