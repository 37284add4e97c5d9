//! # Threading Configuration
//!
//! ## Role
//! Build the rayon pool used by batch evaluation. Queries share nothing but
//! read-only inputs, so each worker runs the ordinary serial recursions.

use crate::error::Result;

/// Create a pool with `n_threads` workers, or rayon's default when `None`.
pub fn build_thread_pool(n_threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("listephens-worker-{}", i));
    if let Some(n) = n_threads {
        builder = builder.num_threads(n);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size() {
        let pool = build_thread_pool(Some(2)).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        let name = pool.install(|| std::thread::current().name().map(str::to_owned));
        assert!(name.unwrap_or_default().starts_with("listephens-worker-"));
    }
}
