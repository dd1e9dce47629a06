//! SQL type definitions.

/// SQL data types a schema field can carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SqlType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,

    // Boolean
    Boolean,

    // String types
    VarChar(u32),
    #[default]
    Text,

    // Binary types
    Blob,

    // Date/time types
    Date,
    Time,
    Timestamp,

    // UUID
    Uuid,

    // JSON
    Json,

    // Custom type name
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_default_and_lengths_distinguish_varchars() {
        assert_eq!(SqlType::default(), SqlType::Text);
        assert_ne!(SqlType::VarChar(8), SqlType::VarChar(64));
        assert_eq!(SqlType::Custom("CITEXT".to_string()), SqlType::Custom("CITEXT".to_string()));
    }
}
