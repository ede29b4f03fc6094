//! Identity (User-Agent) pool and proxy route cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

/// Browser User-Agent strings used when no pool is configured.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Pool of declared client identities.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    user_agents: Vec<String>,
}

impl IdentityPool {
    /// Creates a pool, falling back to [`DEFAULT_USER_AGENTS`] when `user_agents`
    /// has no non-blank entry.
    #[must_use]
    pub fn new(user_agents: &[String]) -> Self {
        let mut user_agents: Vec<String> = user_agents
            .iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();
        if user_agents.is_empty() {
            user_agents = DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect();
        }
        Self { user_agents }
    }

    /// Picks one identity uniformly at random.
    #[must_use]
    pub fn pick(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map_or(DEFAULT_USER_AGENTS[0], String::as_str)
    }
}

/// Round-robin cursor over proxy routes.
///
/// Atomic so [`PageSource::fetch`](super::PageSource::fetch) can take `&self`.
#[derive(Debug)]
pub(crate) struct RouteCursor {
    len: usize,
    position: AtomicUsize,
}

impl RouteCursor {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            len: len.max(1),
            position: AtomicUsize::new(0),
        }
    }

    /// Returns the current route index and advances one position, wrapping.
    pub(crate) fn advance(&self) -> usize {
        self.position.fetch_add(1, Ordering::Relaxed) % self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_returns_pool_member() {
        let pool = IdentityPool::new(&["agent-a".to_string(), "agent-b".to_string()]);
        for _ in 0..20 {
            let ua = pool.pick();
            assert!(ua == "agent-a" || ua == "agent-b", "unexpected UA {ua}");
        }
    }

    #[test]
    fn test_blank_pool_falls_back_to_defaults() {
        let pool = IdentityPool::new(&[String::new(), "  ".to_string()]);
        assert_eq!(pool.user_agents.len(), DEFAULT_USER_AGENTS.len());
        assert!(pool.pick().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_pick_eventually_varies() {
        let pool = IdentityPool::new(&[]);
        let first = pool.pick().to_string();
        let varied = (0..200).any(|_| pool.pick() != first);
        assert!(varied, "identity never rotated across 200 picks");
    }

    #[test]
    fn test_route_cursor_wraps() {
        let cursor = RouteCursor::new(3);
        let seen: Vec<usize> = (0..7).map(|_| cursor.advance()).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_route_cursor_single_route() {
        let cursor = RouteCursor::new(0);
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 0);
    }
}
