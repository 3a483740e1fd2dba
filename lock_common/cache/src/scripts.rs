//! Lua scripts executed server side

/// Deletes the lock key only when it still holds the caller's token.
/// Returns 1 when the key was deleted, 0 otherwise.
pub const COMPARE_AND_DELETE: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;
