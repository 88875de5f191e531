//! Engine type names.

/// Separates an engine type name from a method discriminator.
pub const METHOD_SEPARATOR: &str = "::";

/// Derive the engine type name of an interface.
///
/// An explicit override wins. Otherwise the full path is used with a
/// leading `I` stripped from the last segment (`IGreeter` becomes `Greeter`,
/// a lone `I` is kept) and with `::` and `+` separators normalized to `.`.
pub fn engine_type_name(full_name: &str, name_override: Option<&str>) -> String {
    if let Some(name) = name_override.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let normalized = full_name.trim().replace(METHOD_SEPARATOR, ".").replace('+', ".");
    let (prefix, last) = match normalized.rfind('.') {
        Some(pos) => normalized.split_at(pos + 1),
        None => ("", normalized.as_str()),
    };

    let last = match last.strip_prefix('I') {
        Some(rest) if !rest.is_empty() => rest,
        _ => last,
    };
    format!("{prefix}{last}")
}

/// Append a method discriminator; an empty discriminator leaves the name as is.
pub fn qualify(type_name: &str, discriminator: &str) -> String {
    if discriminator.is_empty() {
        type_name.to_string()
    } else {
        format!("{type_name}{METHOD_SEPARATOR}{discriminator}")
    }
}

/// Split a qualified name back into type name and discriminator.
pub fn split(qualified: &str) -> (&str, &str) {
    qualified
        .split_once(METHOD_SEPARATOR)
        .unwrap_or((qualified, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_interface_prefix() {
        assert_eq!(engine_type_name("app::greeting::IGreeter", None), "app.greeting.Greeter");
        assert_eq!(engine_type_name("IGreeter", None), "Greeter");
        assert_eq!(engine_type_name("app::I", None), "app.I");
    }

    #[test]
    fn test_nested_separator() {
        assert_eq!(engine_type_name("app::Outer+IInner", None), "app.Outer.Inner");
    }

    #[test]
    fn test_override_wins() {
        assert_eq!(engine_type_name("app::IGreeter", Some("hello")), "hello");
        assert_eq!(engine_type_name("app::IGreeter", Some("  ")), "app.Greeter");
    }

    #[test]
    fn test_qualify_and_split() {
        assert_eq!(qualify("Greeter", ""), "Greeter");
        assert_eq!(qualify("Greeter", "fast"), "Greeter::fast");
        assert_eq!(split("Greeter::fast"), ("Greeter", "fast"));
        assert_eq!(split("Greeter"), ("Greeter", ""));
    }
}
