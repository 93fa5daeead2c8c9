//! Accessor method naming conventions
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

/// Logical member name of a getter method (`GetName`, `get_name`)
pub fn getter_name(method: &str) -> Option<&str> {
    accessor_name(method, "Get", "get_")
}

/// Logical member name of a setter method (`SetName`, `set_name`)
pub fn setter_name(method: &str) -> Option<&str> {
    accessor_name(method, "Set", "set_")
}

fn accessor_name<'a>(method: &'a str, pascal: &str, snake: &str) -> Option<&'a str> {
    if let Some(rest) = method.strip_prefix(snake) {
        return (!rest.is_empty()).then_some(rest);
    }
    let rest = method.strip_prefix(pascal)?;
    rest.chars()
        .next()
        .filter(|c| c.is_uppercase())
        .map(|_| rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getter_conventions() {
        assert_eq!(getter_name("GetName"), Some("Name"));
        assert_eq!(getter_name("get_name"), Some("name"));
        assert_eq!(getter_name("Getaway"), None);
        assert_eq!(getter_name("Get"), None);
        assert_eq!(getter_name("get_"), None);
        assert_eq!(getter_name("Name"), None);
    }

    #[test]
    fn test_setter_conventions() {
        assert_eq!(setter_name("SetTotal"), Some("Total"));
        assert_eq!(setter_name("set_total"), Some("total"));
        assert_eq!(setter_name("Settle"), None);
        assert_eq!(setter_name("GetTotal"), None);
    }
}
