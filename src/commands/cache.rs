use crate::cache::CacheManager;
use crate::cli::CacheCommand;

pub fn run(cache: &CacheManager, command: CacheCommand) -> String {
    match command {
        CacheCommand::Clear { pattern } => clear(cache, pattern.as_deref()),
    }
}

fn clear(cache: &CacheManager, pattern: Option<&str>) -> String {
    cache.invalidate(pattern);
    match pattern {
        Some(pattern) => format!("Cleared cached entries matching '{}'", pattern),
        None => "Cleared all cached entries".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_with_pattern_keeps_other_entries() {
        let cache = CacheManager::in_memory();
        cache.set("packages", &1, 60_000);
        cache.set("dashboard", &2, 60_000);

        let message = run(
            &cache,
            CacheCommand::Clear {
                pattern: Some("pack".to_string()),
            },
        );

        assert_eq!(message, "Cleared cached entries matching 'pack'");
        assert_eq!(cache.get::<i32>("packages"), None);
        assert_eq!(cache.get::<i32>("dashboard"), Some(2));
    }

    #[test]
    fn test_clear_all() {
        let cache = CacheManager::in_memory();
        cache.set("packages", &1, 60_000);
        cache.set("availability", &2, 60_000);

        assert_eq!(
            run(&cache, CacheCommand::Clear { pattern: None }),
            "Cleared all cached entries"
        );
        assert_eq!(cache.get::<i32>("packages"), None);
        assert_eq!(cache.get::<i32>("availability"), None);
    }
}
