//! Naming strategies for tables and columns.

use std::fmt;

/// Maps model and field names to database identifiers.
pub trait Namer: Send + Sync + fmt::Debug {
    /// Table name for a model name, e.g. `UserLanguage` -> `user_languages`.
    fn table_name(&self, model: &str) -> String;

    /// Column name for a field of `table`.
    fn column_name(&self, table: &str, field: &str) -> String;

    /// Table name for a many-to-many join table declared as `name`.
    fn join_table_name(&self, name: &str) -> String;
}

/// Default naming strategy: snake_case identifiers, plural table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingStrategy {
    /// Prepended to every table name.
    pub table_prefix: String,
    /// Keep table names singular.
    pub singular_table: bool,
}

impl NamingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn singular_table(mut self, singular: bool) -> Self {
        self.singular_table = singular;
        self
    }
}

impl Namer for NamingStrategy {
    fn table_name(&self, model: &str) -> String {
        let snake = to_snake_case(model);
        if self.singular_table {
            format!("{}{}", self.table_prefix, snake)
        } else {
            format!("{}{}", self.table_prefix, pluralize(&snake))
        }
    }

    fn column_name(&self, _table: &str, field: &str) -> String {
        to_snake_case(field)
    }

    fn join_table_name(&self, name: &str) -> String {
        // Already a database identifier; use as declared.
        if name.to_lowercase() == name {
            return format!("{}{}", self.table_prefix, name);
        }
        self.table_name(name)
    }
}

/// Convert PascalCase/camelCase to snake_case.
///
/// Examples:
/// - `Hero` -> `hero`
/// - `TeamMember` -> `team_member`
/// - `HTTPServer` -> `http_server`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();

                // New word after lowercase, or the last capital of an acronym
                // followed by lowercase.
                let should_underscore = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()));

                if should_underscore {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Simple English pluralization of a snake_case name (only the last word changes).
pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };

    let plural = match last {
        "" => return word.to_string(),
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        "man" => "men".to_string(),
        "woman" => "women".to_string(),
        "datum" => "data".to_string(),
        "index" => "indices".to_string(),
        _ if last.ends_with('s')
            || last.ends_with('x')
            || last.ends_with('z')
            || last.ends_with("ch")
            || last.ends_with("sh") =>
        {
            format!("{last}es")
        }
        _ if last.ends_with('y') && !ends_with_vowel_y(last) => {
            format!("{}ies", &last[..last.len() - 1])
        }
        _ => format!("{last}s"),
    };

    format!("{head}{plural}")
}

fn ends_with_vowel_y(word: &str) -> bool {
    let mut chars = word.chars().rev();
    chars.next();
    chars.next().is_some_and(|c| "aeiou".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("Hero"), "hero");
        assert_eq!(to_snake_case("TeamMember"), "team_member");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn pluralization() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("user_language"), "user_languages");
    }

    #[test]
    fn default_strategy_names() {
        let ns = NamingStrategy::default();
        assert_eq!(ns.table_name("UserLanguage"), "user_languages");
        assert_eq!(ns.column_name("users", "LanguageCode"), "language_code");
        assert_eq!(ns.join_table_name("user_languages"), "user_languages");
        assert_eq!(ns.join_table_name("UserLanguage"), "user_languages");
    }

    #[test]
    fn prefix_and_singular_tables() {
        let ns = NamingStrategy::new().table_prefix("app_").singular_table(true);
        assert_eq!(ns.table_name("User"), "app_user");
        assert_eq!(ns.join_table_name("user_languages"), "app_user_languages");
    }
}
