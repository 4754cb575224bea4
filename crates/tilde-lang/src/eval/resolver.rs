use std::fmt::Debug;

use crate::{MaybeSync, value::Value};

/// Looks up one path segment in a parameter container.
///
/// Returning `None` signals that the key is missing, which fails the render with a
/// resolution error naming the segment.
pub trait Resolver: Debug + MaybeSync {
    fn resolve(&self, container: &Value, key: &str) -> Option<Value>;
}

/// Walks map entries and host object fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(&self, container: &Value, key: &str) -> Option<Value> {
        match container {
            Value::Map(map) => map.get(key).cloned(),
            Value::Object(object) => object.field(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::HostObject;
    use rstest::rstest;

    #[derive(Debug)]
    struct Point;

    impl HostObject for Point {
        fn field(&self, key: &str) -> Option<Value> {
            match key {
                "x" => Some(1.into()),
                "y" => Some(2.into()),
                _ => None,
            }
        }
    }

    #[rstest]
    #[case::map_hit(Value::from_iter([("a", "1")]), "a", Some(Value::from("1")))]
    #[case::map_miss(Value::from_iter([("a", "1")]), "b", None)]
    #[case::object_field(Value::object(Point), "y", Some(Value::from(2)))]
    #[case::object_miss(Value::object(Point), "z", None)]
    #[case::string_has_no_fields(Value::from("abc"), "len", None)]
    #[case::none_has_no_fields(Value::None, "a", None)]
    fn test_default_resolver(
        #[case] container: Value,
        #[case] key: &str,
        #[case] expected: Option<Value>,
    ) {
        assert_eq!(DefaultResolver.resolve(&container, key), expected);
    }
}
