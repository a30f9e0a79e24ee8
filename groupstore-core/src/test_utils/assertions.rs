//! Custom assertions for membership tests

use crate::core_members::Authorizable;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that a Result is Err and return the error
pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(e) => e,
    }
}

/// IDs of a member set, sorted
pub fn member_ids(members: &HashSet<Authorizable>) -> BTreeSet<String> {
    members.iter().map(|a| a.id().to_string()).collect()
}

/// Assert that a member set holds exactly the given IDs
pub fn assert_member_ids(members: &HashSet<Authorizable>, expected: &[&str]) {
    let actual = member_ids(members);
    let expected: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
    assert_eq!(actual, expected, "member sets differ");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_ok() {
        let result: Result<i32, String> = Ok(42);
        assert_eq!(assert_ok(result), 42);
    }

    #[test]
    #[should_panic(expected = "Expected Ok")]
    fn test_assert_ok_panics() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_ok(result);
    }

    #[test]
    fn test_assert_err() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_eq!(assert_err(result), "error");
    }
}
